//! Template rewriter.
//!
//! Walks the markup tree of a legacy `static get template()` and produces the
//! body of a tagged-template render method:
//!
//! - `<style>` / `<custom-style>` blocks move to the static styles list
//! - `dom-if` becomes `${(cond) ? html`...` : html``}`
//! - `dom-repeat` becomes `${(items).map((item, index) => html`...`)}`
//! - grid column `<template>` children become renderer directives
//! - attribute and text bindings become `${...}` interpolations
//!
//! The qualification context is passed down explicitly; nested scopes derive
//! their own context and never leak into siblings.

use crate::binding::{
    directive_expression, has_binding, single_binding, split_bindings, split_two_way_event,
    SegmentKind,
};
use crate::diagnostics::{
    Diagnostic, PL_WARN_DIRECTIVE_CONDITION, PL_WARN_DIRECTIVE_ITEMS, PL_WARN_DIRECTIVE_TEMPLATE,
};
use crate::markup::{parse_fragment, serialize_nodes, AttrValue, MarkupAttr, MarkupElement, MarkupNode};
use crate::resolve::{ExpressionResolver, QualificationContext, EMPTY_ARRAY, UNDEFINED};
use crate::state::UsageFlags;

pub const EVENT_PREFIX: &str = "on-";
pub const ATTRIBUTE_BINDING_SUFFIX: char = '$';

/// Attributes bound with `?name` when used as `name$="[[...]]"`.
pub const BOOLEAN_ATTRIBUTES: &[&str] = &["hidden", "checked", "disabled", "selected", "readonly", "required"];

/// Grid column elements whose `<template>` children are renderers.
pub const COLUMN_ELEMENTS: &[&str] = &[
    "vaadin-grid-column",
    "vaadin-grid-sort-column",
    "vaadin-grid-filter-column",
    "vaadin-grid-tree-column",
    "vaadin-grid-selection-column",
];

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TemplateOutput {
    /// Markup for `html`...`` in the render method.
    pub html: String,
    /// CSS text of each collected style block.
    pub styles: Vec<String>,
    /// Shared style module names from `include="..."`.
    pub style_includes: Vec<String>,
}

impl TemplateOutput {
    pub fn has_styles(&self) -> bool {
        !self.styles.is_empty() || !self.style_includes.is_empty()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIRECTIVES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DirectiveKind {
    Conditional,
    Repeat,
    ColumnRenderer,
    Style,
}

fn directive_kind(el: &MarkupElement) -> Option<DirectiveKind> {
    if el.is("template") {
        return match el.attr("is") {
            Some("dom-if") => Some(DirectiveKind::Conditional),
            Some("dom-repeat") => Some(DirectiveKind::Repeat),
            _ => None,
        };
    }
    if el.is("dom-if") {
        Some(DirectiveKind::Conditional)
    } else if el.is("dom-repeat") {
        Some(DirectiveKind::Repeat)
    } else if el.is("style") || el.is("custom-style") {
        Some(DirectiveKind::Style)
    } else if COLUMN_ELEMENTS.iter().any(|c| el.is(c)) {
        Some(DirectiveKind::ColumnRenderer)
    } else {
        None
    }
}

/// Control-flow directive extracted from the markup, ready to render.
#[derive(Debug)]
enum ControlDirective {
    Conditional {
        condition: String,
        body: Vec<MarkupNode>,
    },
    Repeat {
        items: String,
        body: Vec<MarkupNode>,
    },
}

/// Take the content of a directive: the element itself when it is the
/// `<template>`, otherwise its first `<template>` child.
fn take_directive_body(el: &mut MarkupElement) -> Option<Vec<MarkupNode>> {
    if el.is("template") {
        return Some(std::mem::take(&mut el.children));
    }
    el.children.iter_mut().find_map(|child| match child {
        MarkupNode::Element(t) if t.is("template") => Some(std::mem::take(&mut t.children)),
        _ => None,
    })
}

fn dash_to_camel(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '-' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

// ═══════════════════════════════════════════════════════════════════════════════
// REWRITER
// ═══════════════════════════════════════════════════════════════════════════════

pub struct TemplateRewriter<'a> {
    resolver: &'a mut ExpressionResolver,
    usage: &'a mut UsageFlags,
    repeat_directive: bool,
    styles: Vec<String>,
    style_includes: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> TemplateRewriter<'a> {
    pub fn new(resolver: &'a mut ExpressionResolver, usage: &'a mut UsageFlags, repeat_directive: bool) -> Self {
        TemplateRewriter {
            resolver,
            usage,
            repeat_directive,
            styles: Vec::new(),
            style_includes: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    /// Rewrite a full template string.
    pub fn rewrite(&mut self, html: &str) -> std::io::Result<TemplateOutput> {
        let nodes = parse_fragment(html)?;
        let rewritten = self.rewrite_nodes(nodes, &QualificationContext::root());
        if !self.style_includes.is_empty() {
            self.usage.uses_unsafe_style_include = true;
        }
        Ok(TemplateOutput {
            html: serialize_nodes(&rewritten),
            styles: std::mem::take(&mut self.styles),
            style_includes: std::mem::take(&mut self.style_includes),
        })
    }

    pub fn rewrite_nodes(&mut self, nodes: Vec<MarkupNode>, ctx: &QualificationContext) -> Vec<MarkupNode> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                MarkupNode::Element(el) => out.extend(self.rewrite_element(el, ctx)),
                MarkupNode::Text(text) => out.extend(self.rewrite_text(text, ctx)),
                other => out.push(other),
            }
        }
        out
    }

    fn rewrite_element(&mut self, el: MarkupElement, ctx: &QualificationContext) -> Vec<MarkupNode> {
        match directive_kind(&el) {
            Some(DirectiveKind::Style) => {
                self.collect_style(&el);
                vec![]
            }
            Some(DirectiveKind::Conditional) => self.rewrite_conditional(el, ctx),
            Some(DirectiveKind::Repeat) => self.rewrite_repeat(el, ctx),
            Some(DirectiveKind::ColumnRenderer) => {
                vec![MarkupNode::Element(self.rewrite_column(el, ctx))]
            }
            None => vec![MarkupNode::Element(self.rewrite_generic(el, ctx))],
        }
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Styles
    // ───────────────────────────────────────────────────────────────────────────

    fn collect_style(&mut self, el: &MarkupElement) {
        let style = if el.is("custom-style") {
            el.child_elements().find(|c| c.is("style"))
        } else {
            Some(el)
        };
        let Some(style) = style else {
            tracing::debug!("<custom-style> without <style> dropped");
            return;
        };
        if let Some(include) = style.attr("include") {
            for name in include.split_whitespace() {
                if !self.style_includes.iter().any(|n| n == name) {
                    self.style_includes.push(name.to_string());
                }
            }
        }
        let css = style.text_content();
        if !css.trim().is_empty() {
            self.styles.push(css);
        }
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Control flow
    // ───────────────────────────────────────────────────────────────────────────

    fn extract_directive(
        &mut self,
        el: &mut MarkupElement,
        kind: DirectiveKind,
        ctx: &QualificationContext,
    ) -> Option<ControlDirective> {
        let (attr, code) = match kind {
            DirectiveKind::Repeat => ("items", PL_WARN_DIRECTIVE_ITEMS),
            _ => ("if", PL_WARN_DIRECTIVE_CONDITION),
        };
        let raw = el.attr(attr).map(str::to_string).filter(|v| !v.trim().is_empty());
        let Some(raw) = raw else {
            self.diagnostics.push(Diagnostic::new(
                code,
                format!("<{}> without `{}` attribute left unconverted", el.tag, attr),
            ));
            return None;
        };
        let Some(body) = take_directive_body(el) else {
            self.diagnostics.push(Diagnostic::new(
                PL_WARN_DIRECTIVE_TEMPLATE,
                format!("<{}> has no nested <template>", el.tag),
            ));
            return None;
        };

        let expression = directive_expression(&raw);
        Some(match kind {
            DirectiveKind::Repeat => ControlDirective::Repeat {
                items: self.resolver.resolve(&expression, true, ctx, EMPTY_ARRAY),
                body,
            },
            _ => ControlDirective::Conditional {
                condition: self.resolver.resolve(&expression, true, ctx, UNDEFINED),
                body,
            },
        })
    }

    fn rewrite_conditional(&mut self, mut el: MarkupElement, ctx: &QualificationContext) -> Vec<MarkupNode> {
        let Some(ControlDirective::Conditional { condition, body }) =
            self.extract_directive(&mut el, DirectiveKind::Conditional, ctx)
        else {
            return vec![MarkupNode::Element(el)];
        };

        let inner = serialize_nodes(&self.rewrite_nodes(body, ctx));
        if inner.trim().is_empty() {
            tracing::debug!("empty dom-if replaced with empty string");
            return vec![MarkupNode::Raw(String::new())];
        }
        vec![MarkupNode::Raw(format!(
            "${{({}) ? html`{}` : html``}}",
            condition, inner
        ))]
    }

    fn rewrite_repeat(&mut self, mut el: MarkupElement, ctx: &QualificationContext) -> Vec<MarkupNode> {
        let Some(ControlDirective::Repeat { items, body }) =
            self.extract_directive(&mut el, DirectiveKind::Repeat, ctx)
        else {
            return vec![MarkupNode::Element(el)];
        };

        let item_ctx = ctx.with(&["item", "index"]);
        let inner = serialize_nodes(&self.rewrite_nodes(body, &item_ctx));
        let rendered = if self.repeat_directive {
            self.usage.uses_repeat = true;
            format!("${{repeat({}, (item, index) => html`{}`)}}", items, inner)
        } else {
            format!("${{({}).map((item, index) => html`{}`)}}", items, inner)
        };
        vec![MarkupNode::Raw(rendered)]
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Grid column renderers
    // ───────────────────────────────────────────────────────────────────────────

    fn rewrite_column(&mut self, mut el: MarkupElement, ctx: &QualificationContext) -> MarkupElement {
        let mut header = None;
        let mut body = None;
        let mut footer = None;
        let mut rest = Vec::new();

        for child in std::mem::take(&mut el.children) {
            match child {
                MarkupNode::Element(t) if t.is("template") => {
                    let class = t.attr("class").map(str::to_string);
                    match class.as_deref() {
                        Some("header") if header.is_none() => header = Some(t),
                        Some("footer") if footer.is_none() => footer = Some(t),
                        None if body.is_none() => body = Some(t),
                        _ => rest.push(MarkupNode::Element(t)),
                    }
                }
                other => rest.push(other),
            }
        }
        el.children = rest;

        let mut directives = Vec::new();
        if let Some(t) = header {
            self.usage.uses_header_renderer = true;
            let inner = serialize_nodes(&self.rewrite_nodes(t.children, ctx));
            directives.push(format!("${{columnHeaderRenderer((column) => html`{}`)}}", inner));
        }
        if let Some(t) = body {
            self.usage.uses_body_renderer = true;
            let item_ctx = ctx.with(&["item"]);
            let inner = serialize_nodes(&self.rewrite_nodes(t.children, &item_ctx));
            directives.push(format!("${{columnBodyRenderer((item) => html`{}`)}}", inner));
        }
        if let Some(t) = footer {
            self.usage.uses_footer_renderer = true;
            let inner = serialize_nodes(&self.rewrite_nodes(t.children, ctx));
            directives.push(format!("${{columnFooterRenderer((column) => html`{}`)}}", inner));
        }

        let mut el = self.rewrite_generic(el, ctx);
        for directive in directives {
            el.push_directive(directive);
        }
        el
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Attributes and text
    // ───────────────────────────────────────────────────────────────────────────

    fn rewrite_generic(&mut self, mut el: MarkupElement, ctx: &QualificationContext) -> MarkupElement {
        let mut attrs = Vec::with_capacity(el.attrs.len());
        for attr in std::mem::take(&mut el.attrs) {
            match attr.value {
                AttrValue::Static(value) => self.rewrite_attribute(&mut attrs, attr.name, value, ctx),
                value => attrs.push(MarkupAttr { name: attr.name, value }),
            }
        }
        el.attrs = attrs;
        el.children = self.rewrite_nodes(std::mem::take(&mut el.children), ctx);
        el
    }

    fn rewrite_attribute(
        &mut self,
        out: &mut Vec<MarkupAttr>,
        name: String,
        value: String,
        ctx: &QualificationContext,
    ) {
        if let Some(event) = name.strip_prefix(EVENT_PREFIX) {
            out.push(MarkupAttr {
                name: format!("@{}", event),
                value: AttrValue::Interpolated(format!("${{this.{}}}", value.trim())),
            });
            return;
        }
        if !has_binding(&value) {
            out.push(MarkupAttr {
                name,
                value: AttrValue::Static(value),
            });
            return;
        }

        let segments = split_bindings(&value);
        let resolved = self.resolver.resolve_segments(&segments, true, ctx);

        let (base_name, target_name) = match name.strip_suffix(ATTRIBUTE_BINDING_SUFFIX) {
            Some(stripped) => {
                let attribute = stripped.strip_suffix('\\').unwrap_or(stripped);
                let target = if BOOLEAN_ATTRIBUTES.contains(&attribute) {
                    format!("?{}", attribute)
                } else {
                    attribute.to_string()
                };
                (attribute.to_string(), target)
            }
            None => (name.clone(), format!(".{}", dash_to_camel(&name))),
        };

        out.push(MarkupAttr {
            name: target_name,
            value: AttrValue::Interpolated(format!("${{{}}}", resolved)),
        });

        if let Some(binding) = single_binding(&segments) {
            if binding.kind == SegmentKind::TwoWay {
                let (target, event) = split_two_way_event(&binding.value);
                let target_expr = self.resolver.resolve(target, false, ctx, UNDEFINED);
                let event_name = match event {
                    Some(event) => event.to_string(),
                    None => format!("{}-changed", base_name),
                };
                out.push(MarkupAttr {
                    name: format!("@{}", event_name),
                    value: AttrValue::Interpolated(format!(
                        "${{(e) => ({} = e.target.{})}}",
                        target_expr,
                        dash_to_camel(&base_name)
                    )),
                });
            }
        }
    }

    fn rewrite_text(&mut self, text: String, ctx: &QualificationContext) -> Vec<MarkupNode> {
        if !has_binding(&text) {
            return vec![MarkupNode::Text(text)];
        }
        split_bindings(&text)
            .into_iter()
            .map(|segment| match segment.kind {
                SegmentKind::Text => MarkupNode::Text(segment.value),
                SegmentKind::OneWay | SegmentKind::TwoWay => {
                    let (expression, _) = split_two_way_event(&segment.value);
                    let resolved = self.resolver.resolve(expression, true, ctx, UNDEFINED);
                    MarkupNode::Raw(format!("${{{}}}", resolved))
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn rewrite_with(html: &str, repeat_directive: bool) -> (TemplateOutput, UsageFlags, Vec<Diagnostic>) {
        let mut resolver = ExpressionResolver::new(false);
        let mut usage = UsageFlags::default();
        let mut rewriter = TemplateRewriter::new(&mut resolver, &mut usage, repeat_directive);
        let output = rewriter.rewrite(html).unwrap();
        let diagnostics = std::mem::take(&mut rewriter.diagnostics);
        (output, usage, diagnostics)
    }

    fn rewrite(html: &str) -> String {
        rewrite_with(html, false).0.html
    }

    #[test]
    fn test_text_binding() {
        assert_eq!(
            rewrite("<h1>Hello [[name]]!</h1>"),
            "<h1>Hello ${this.name}!</h1>"
        );
    }

    #[test]
    fn test_event_handler() {
        assert_eq!(
            rewrite("<button on-click=\"_save\">Save</button>"),
            "<button @click=\"${this._save}\">Save</button>"
        );
    }

    #[test]
    fn test_property_binding_camel_cases() {
        assert_eq!(
            rewrite("<my-list selected-item=\"[[current]]\"></my-list>"),
            "<my-list .selectedItem=\"${this.current}\"></my-list>"
        );
    }

    #[test]
    fn test_attribute_binding_and_boolean() {
        assert_eq!(
            rewrite("<a href$=\"[[url]]\" hidden$=\"[[!visible]]\"></a>"),
            "<a href=\"${this.url}\" ?hidden=\"${!(this.visible)}\"></a>"
        );
    }

    #[test]
    fn test_compound_attribute_concatenates() {
        assert_eq!(
            rewrite("<div class$=\"item [[kind]]\"></div>"),
            "<div class=\"${'item '+((this.kind) ? this.kind : '')}\"></div>"
        );
    }

    #[test]
    fn test_two_way_binding_adds_change_listener() {
        assert_eq!(
            rewrite("<paper-input value=\"{{user.name}}\"></paper-input>"),
            "<paper-input .value=\"${(this.user) ? this.user.name : undefined}\" @value-changed=\"${(e) => (this.user.name = e.target.value)}\"></paper-input>"
        );
    }

    #[test]
    fn test_two_way_binding_with_explicit_event() {
        assert_eq!(
            rewrite("<input checked=\"{{done::change}}\">"),
            "<input .checked=\"${this.done}\" @change=\"${(e) => (this.done = e.target.checked)}\">"
        );
    }

    #[test]
    fn test_conditional_template() {
        assert_eq!(
            rewrite("<template is=\"dom-if\" if=\"[[loggedIn]]\"><span>[[user.name]]</span></template>"),
            "${(this.loggedIn) ? html`<span>${(this.user) ? this.user.name : undefined}</span>` : html``}"
        );
    }

    #[test]
    fn test_conditional_wrapper_element() {
        assert_eq!(
            rewrite("<dom-if if=\"[[!isLoggedIn]]\"><template><p>Login</p></template></dom-if>"),
            "${(!(this.isLoggedIn)) ? html`<p>Login</p>` : html``}"
        );
    }

    #[test]
    fn test_guarded_condition_is_parenthesized() {
        assert_eq!(
            rewrite("<template is=\"dom-if\" if=\"[[user.active]]\"><b>on</b></template>"),
            "${((this.user) ? this.user.active : undefined) ? html`<b>on</b>` : html``}"
        );
    }

    #[test]
    fn test_empty_conditional_is_empty_string() {
        assert_eq!(
            rewrite("<div><template is=\"dom-if\" if=\"[[!loggedIn]]\">  \n </template></div>"),
            "<div></div>"
        );
    }

    #[test]
    fn test_conditional_without_condition_is_left() {
        let (output, _, diagnostics) =
            rewrite_with("<template is=\"dom-if\"><b>x</b></template>", false);
        assert_eq!(output.html, "<template is=\"dom-if\"><b>x</b></template>");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].code, PL_WARN_DIRECTIVE_CONDITION);
    }

    #[test]
    fn test_repeat_qualifies_item() {
        assert_eq!(
            rewrite("<ul><template is=\"dom-repeat\" items=\"[[items]]\"><li>[[item.name]] [[index]] [[label]]</li></template></ul>"),
            "<ul>${((this.items) ? this.items : []).map((item, index) => html`<li>${item.name} ${index} ${this.label}</li>`)}</ul>"
        );
    }

    #[test]
    fn test_repeat_wrapper_and_directive_option() {
        let (output, usage, _) = rewrite_with(
            "<dom-repeat items=\"{{rows}}\"><template><i>[[item]]</i></template></dom-repeat>",
            true,
        );
        assert_eq!(
            output.html,
            "${repeat((this.rows) ? this.rows : [], (item, index) => html`<i>${item}</i>`)}"
        );
        assert!(usage.uses_repeat);
    }

    #[test]
    fn test_repeat_without_items_is_left() {
        let (output, _, diagnostics) =
            rewrite_with("<dom-repeat><template>x</template></dom-repeat>", false);
        assert_eq!(output.html, "<dom-repeat><template>x</template></dom-repeat>");
        assert_eq!(diagnostics[0].code, PL_WARN_DIRECTIVE_ITEMS);
    }

    #[test]
    fn test_nested_scopes_do_not_leak() {
        let html = "<template is=\"dom-repeat\" items=\"[[groups]]\"><b>[[item.title]]</b></template><i>[[item]]</i>";
        assert_eq!(
            rewrite(html),
            "${((this.groups) ? this.groups : []).map((item, index) => html`<b>${item.title}</b>`)}<i>${this.item}</i>"
        );
    }

    #[test]
    fn test_grid_column_renderers() {
        let html = "<vaadin-grid-column width=\"5em\">\
            <template class=\"header\">Name</template>\
            <template>[[item.name]] [[suffix]]</template>\
            <template class=\"footer\">[[count]]</template>\
            </vaadin-grid-column>";
        let (output, usage, _) = rewrite_with(html, false);
        assert_eq!(
            output.html,
            "<vaadin-grid-column width=\"5em\" \
            ${columnHeaderRenderer((column) => html`Name`)} \
            ${columnBodyRenderer((item) => html`${item.name} ${this.suffix}`)} \
            ${columnFooterRenderer((column) => html`${this.count}`)}></vaadin-grid-column>"
        );
        assert!(usage.uses_header_renderer && usage.uses_body_renderer && usage.uses_footer_renderer);
        assert_eq!(usage.renderers().len(), 3);
    }

    #[test]
    fn test_styles_are_collected() {
        let html = "<style include=\"shared-styles lumo\">:host { display: block; }</style>\
            <custom-style><style>.a { color: red; }</style></custom-style><div></div>";
        let (output, usage, _) = rewrite_with(html, false);
        assert_eq!(output.html, "<div></div>");
        assert_eq!(output.styles, vec![":host { display: block; }", ".a { color: red; }"]);
        assert_eq!(output.style_includes, vec!["shared-styles", "lumo"]);
        assert!(usage.uses_unsafe_style_include);
        assert!(output.has_styles());
    }

    #[test]
    fn test_dash_to_camel() {
        assert_eq!(dash_to_camel("selected-item-id"), "selectedItemId");
        assert_eq!(dash_to_camel("value"), "value");
    }
}
