//! # Class Transformer
//!
//! Rewrites one legacy element class declaration in place through the
//! [`SourceDocument`] edit buffer.
//!
//! ## Member Handling
//!
//! | Member                     | Result                                         |
//! |----------------------------|------------------------------------------------|
//! | superclass                 | innermost legacy identifier becomes LitElement |
//! | `static get template()`    | styles getter + `render()`                     |
//! | `static get properties()`  | descriptors trimmed, plan filled               |
//! | `constructor`              | receives property initializers                 |
//! | `ready()`                  | becomes `firstUpdated(_changedProperties)`     |
//! | `_attachDom()`             | becomes a light-DOM `createRenderRoot()`       |
//! | `static get observers()`   | left as is, reported                           |
//!
//! Computed getters, observed accessor pairs and a synthesized constructor
//! are appended at the end of the class body, in that order.

use crate::diagnostics::{
    Diagnostic, SourceLocation, PL_WARN_COMPLEX_OBSERVER, PL_WARN_OBSERVERS_ACCESSOR,
    PL_WARN_PROPERTY_SHAPE, PL_WARN_SUPERCLASS, PL_WARN_TEMPLATE_SHAPE,
};
use crate::config::ConvertOptions;
use crate::document::SourceDocument;
use crate::resolve::{ExpressionResolver, QualificationContext, UNDEFINED};
use crate::state::{ClassReport, ConversionState};
use crate::template::{TemplateOutput, TemplateRewriter};
use oxc_ast::ast::{
    Argument, CallExpression, Class, ClassElement, Expression, Function, FunctionBody,
    MethodDefinition, MethodDefinitionKind, ObjectExpression, ObjectProperty, ObjectPropertyKind,
    PropertyKey, Statement, TemplateLiteral,
};
use oxc_ast_visit::{walk, Visit};
use oxc_span::{GetSpan, Span};

pub const LEGACY_BASE_CLASS: &str = "PolymerElement";
pub const TARGET_BASE_CLASS: &str = "LitElement";

const COMPLEX_OBSERVER_MARKER: &str = "/* TODO: Convert this complex observer manually */\n";
const LIGHT_DOM_RENDER_ROOT: &str =
    "createRenderRoot() {\n    // Do not use a shadow root\n    return this;\n  }";

// ═══════════════════════════════════════════════════════════════════════════════
// CLASSIFICATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Shape of a class `extends` clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SuperClass {
    /// `extends Name`
    Identifier { name: String, span: Span },
    /// `extends A(B(Name))`; `name`/`span` describe the innermost identifier.
    MixinCall { name: String, span: Span },
    Other,
}

impl SuperClass {
    pub fn classify(expr: &Expression<'_>) -> SuperClass {
        match expr {
            Expression::Identifier(id) => SuperClass::Identifier {
                name: id.name.as_str().to_string(),
                span: id.span,
            },
            Expression::CallExpression(call) => match innermost_base(call) {
                Some((name, span)) => SuperClass::MixinCall {
                    name: name.to_string(),
                    span,
                },
                None => SuperClass::Other,
            },
            _ => SuperClass::Other,
        }
    }

    /// Span of the legacy base identifier, when this clause extends it.
    pub fn legacy_base(&self) -> Option<Span> {
        match self {
            SuperClass::Identifier { name, span } | SuperClass::MixinCall { name, span }
                if name == LEGACY_BASE_CLASS =>
            {
                Some(*span)
            }
            _ => None,
        }
    }
}

/// Innermost identifier argument of a mixin application chain. A legacy base
/// argument wins over any other identifier argument.
fn innermost_base<'b>(call: &'b CallExpression<'_>) -> Option<(&'b str, Span)> {
    let mut fallback = None;
    for argument in &call.arguments {
        let found = match argument {
            Argument::Identifier(id) => Some((id.name.as_str(), id.span)),
            Argument::CallExpression(inner) => innermost_base(inner),
            _ => None,
        };
        match found {
            Some((name, span)) if name == LEGACY_BASE_CLASS => return Some((name, span)),
            Some(other) if fallback.is_none() => fallback = Some(other),
            _ => {}
        }
    }
    fallback
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberKind {
    Template,
    IsAccessor,
    PropertiesAccessor,
    ObserversAccessor,
    Constructor,
    Ready,
    LightDom,
    Other,
}

pub fn member_kind(method: &MethodDefinition<'_>) -> MemberKind {
    if method.kind == MethodDefinitionKind::Constructor {
        return MemberKind::Constructor;
    }
    if method.computed {
        return MemberKind::Other;
    }
    match (key_name(&method.key), method.r#static) {
        (Some("template"), true) => MemberKind::Template,
        (Some("is"), true) => MemberKind::IsAccessor,
        (Some("properties"), true) => MemberKind::PropertiesAccessor,
        (Some("observers"), true) => MemberKind::ObserversAccessor,
        (Some("ready"), false) if method.kind == MethodDefinitionKind::Method => MemberKind::Ready,
        (Some("_attachDom"), false) if method.kind == MethodDefinitionKind::Method => {
            MemberKind::LightDom
        }
        _ => MemberKind::Other,
    }
}

fn key_name<'b>(key: &'b PropertyKey<'_>) -> Option<&'b str> {
    match key {
        PropertyKey::StaticIdentifier(id) => Some(id.name.as_str()),
        PropertyKey::StringLiteral(s) => Some(s.value.as_str()),
        _ => None,
    }
}

/// Argument of the first `return` directly in `body`.
fn returned_expression<'b, 'a>(body: &'b FunctionBody<'a>) -> Option<&'b Expression<'a>> {
    body.statements.iter().find_map(|stmt| match stmt {
        Statement::ReturnStatement(ret) => ret.argument.as_ref(),
        _ => None,
    })
}

fn method_return<'b, 'a>(method: &'b MethodDefinition<'a>) -> Option<&'b Expression<'a>> {
    method.value.body.as_deref().and_then(returned_expression)
}

/// The `html` tagged literal returned by a template getter, if it carries no
/// substitutions.
fn template_literal<'b, 'a>(method: &'b MethodDefinition<'a>) -> Option<&'b TemplateLiteral<'a>> {
    match method_return(method)? {
        Expression::TaggedTemplateExpression(tagged) => match &tagged.tag {
            Expression::Identifier(tag) if tag.name.as_str() == "html" => {
                if tagged.quasi.expressions.is_empty() {
                    Some(&tagged.quasi)
                } else {
                    None
                }
            }
            _ => None,
        },
        _ => None,
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// GENERATED MEMBERS
// ═══════════════════════════════════════════════════════════════════════════════

fn render_method(html: &str) -> String {
    format!("render() {{\n    return html`{}`;\n  }}", html)
}

fn shared_style_lookup(resolver: &ExpressionResolver, name: &str) -> String {
    let chain = format!(
        "document.querySelector(\"dom-module[id='{}']\").firstElementChild.content.firstElementChild.innerText",
        name
    );
    resolver.null_safe(&chain, &QualificationContext::empty().with(&["document"]), "\"\"")
}

fn styles_getter(resolver: &ExpressionResolver, output: &TemplateOutput) -> String {
    let mut body = String::new();
    let mut entries = Vec::new();
    if !output.style_includes.is_empty() {
        body.push_str("    const includedStyles = {};\n");
        for name in &output.style_includes {
            body.push_str(&format!(
                "    includedStyles[\"{}\"] = {};\n",
                name,
                shared_style_lookup(resolver, name)
            ));
            entries.push(format!("unsafeCSS(includedStyles[\"{}\"])", name));
        }
    }
    for css in &output.styles {
        entries.push(format!("css`{}`", css));
    }
    format!(
        "static get styles() {{\n{}    return [{}];\n  }}",
        body,
        entries.join(", ")
    )
}

fn computed_getter(name: &str, expression: &str) -> String {
    format!("get {}() {{\n    return {};\n  }}", name, expression)
}

fn observed_accessors(name: &str, observer: &str, legacy_imports: bool) -> String {
    let notify = if legacy_imports {
        format!(
            "this.requestUpdateInternal(\"{0}\", oldValue, this.constructor.properties.{0});",
            name
        )
    } else {
        format!("this.requestUpdate(\"{}\", oldValue);", name)
    };
    format!(
        "set {name}(newValue) {{\n    const oldValue = this.{name};\n    this._{name} = newValue;\n    \
         if (oldValue !== newValue) {{\n      this.{observer}(newValue, oldValue);\n      {notify}\n    }}\n  }}\n\n  \
         get {name}() {{\n    return this._{name};\n  }}",
        name = name,
        observer = observer,
        notify = notify
    )
}

fn initializer_lines(init: &[(String, String)]) -> String {
    init.iter()
        .map(|(name, value)| format!("    this.{} = {};\n", name, value))
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRANSFORMER
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-class lists filled while walking the members.
#[derive(Debug, Default)]
struct PropertyPlan {
    init: Vec<(String, String)>,
    computed: Vec<(String, String)>,
    observed: Vec<(String, String)>,
}

/// Collects `super.ready(...)` calls inside a `ready()` body.
#[derive(Default)]
struct SuperReadyCollector {
    /// (call span, callee span, has arguments)
    calls: Vec<(Span, Span, bool)>,
}

impl<'a> Visit<'a> for SuperReadyCollector {
    fn visit_call_expression(&mut self, call: &CallExpression<'a>) {
        if let Expression::StaticMemberExpression(member) = &call.callee {
            if matches!(member.object, Expression::Super(_)) && member.property.name.as_str() == "ready" {
                self.calls.push((call.span, member.span, !call.arguments.is_empty()));
            }
        }
        walk::walk_call_expression(self, call);
    }
}

pub struct ClassTransformer<'s> {
    doc: &'s mut SourceDocument,
    state: &'s mut ConversionState,
    options: &'s ConvertOptions,
    resolver: ExpressionResolver,
    plan: PropertyPlan,
    report: ClassReport,
}

impl<'s> ClassTransformer<'s> {
    pub fn new(doc: &'s mut SourceDocument, state: &'s mut ConversionState, options: &'s ConvertOptions) -> Self {
        ClassTransformer {
            doc,
            state,
            options,
            resolver: ExpressionResolver::new(options.optional_chaining),
            plan: PropertyPlan::default(),
            report: ClassReport {
                name: String::new(),
                tag: None,
                initialized: Vec::new(),
                computed: Vec::new(),
                observed: Vec::new(),
            },
        }
    }

    fn warn_at(&mut self, offset: u32, diagnostic: Diagnostic) {
        let location = SourceLocation::from_offset(self.doc.original(), offset);
        self.state.warn(diagnostic.at(location));
    }

    fn flush_resolver(&mut self, offset: u32) {
        for diagnostic in self.resolver.take_diagnostics() {
            self.warn_at(offset, diagnostic);
        }
    }

    /// Convert `class` if it extends the legacy base. Returns whether it did.
    pub fn transform(mut self, class: &Class<'_>) -> bool {
        let name = class
            .id
            .as_ref()
            .map(|id| id.name.as_str().to_string())
            .unwrap_or_else(|| "default".to_string());

        let Some(super_class) = &class.super_class else {
            tracing::debug!("class {} has no superclass, skipping", name);
            return false;
        };
        let shape = SuperClass::classify(super_class);
        let Some(base) = shape.legacy_base() else {
            if shape == SuperClass::Other {
                let text = self.doc.slice(super_class.span().start, super_class.span().end).to_string();
                self.warn_at(
                    super_class.span().start,
                    Diagnostic::new(
                        PL_WARN_SUPERCLASS,
                        format!("class {} extends unrecognized `{}`; left unchanged", name, text),
                    ),
                );
            } else {
                tracing::debug!("class {} does not extend {}, skipping", name, LEGACY_BASE_CLASS);
            }
            return false;
        };

        tracing::debug!("converting class {}", name);
        self.report.name = name;
        self.doc.overwrite(base.start, base.end, TARGET_BASE_CLASS);

        let mut constructor_end = None;
        for element in &class.body.body {
            let ClassElement::MethodDefinition(method) = element else {
                continue;
            };
            match member_kind(method) {
                MemberKind::Template => self.transform_template(method),
                MemberKind::IsAccessor => self.capture_tag(method),
                MemberKind::PropertiesAccessor => self.transform_properties(method),
                MemberKind::ObserversAccessor => self.warn_at(
                    method.span.start,
                    Diagnostic::new(
                        PL_WARN_OBSERVERS_ACCESSOR,
                        "multi-property observers are not converted",
                    )
                    .with_hint("call the observer from updated() when its dependencies change"),
                ),
                MemberKind::Constructor => {
                    constructor_end = method.value.body.as_ref().map(|body| body.span.end - 1);
                }
                MemberKind::Ready => self.transform_ready(method),
                MemberKind::LightDom => {
                    self.doc.overwrite(method.span.start, method.span.end, LIGHT_DOM_RENDER_ROOT)
                }
                MemberKind::Other => {}
            }
        }

        self.finish(class.body.span.end - 1, constructor_end);
        true
    }

    fn finish(mut self, body_end: u32, constructor_end: Option<u32>) {
        let plan = std::mem::take(&mut self.plan);
        let mut members = Vec::new();

        for (name, expression) in &plan.computed {
            members.push(computed_getter(name, expression));
        }
        for (name, observer) in &plan.observed {
            members.push(observed_accessors(name, observer, self.options.legacy_imports));
        }
        if !plan.init.is_empty() {
            let lines = initializer_lines(&plan.init);
            match constructor_end {
                Some(pos) => self.doc.insert_before(pos, format!("\n{}  ", lines)),
                None => members.push(format!("constructor() {{\n    super();\n{}  }}", lines)),
            }
        }
        if !members.is_empty() {
            self.doc
                .insert_before(body_end, format!("\n  {}\n", members.join("\n\n  ")));
        }

        self.report.initialized = plan.init.into_iter().map(|(name, _)| name).collect();
        self.report.computed = plan.computed.into_iter().map(|(name, _)| name).collect();
        self.report.observed = plan.observed.into_iter().map(|(name, _)| name).collect();
        self.state.classes.push(self.report);
    }

    fn capture_tag(&mut self, method: &MethodDefinition<'_>) {
        if let Some(Expression::StringLiteral(tag)) = method_return(method) {
            self.report.tag = Some(tag.value.as_str().to_string());
        }
    }

    // ───────────────────────────────────────────────────────────────────────────
    // template
    // ───────────────────────────────────────────────────────────────────────────

    fn transform_template(&mut self, method: &MethodDefinition<'_>) {
        let Some(literal) = template_literal(method) else {
            self.warn_at(
                method.span.start,
                Diagnostic::new(
                    PL_WARN_TEMPLATE_SHAPE,
                    "template getter does not return a plain html`...` literal",
                ),
            );
            return;
        };
        let raw = self
            .doc
            .slice(literal.span.start + 1, literal.span.end - 1)
            .to_string();

        let mut rewriter =
            TemplateRewriter::new(&mut self.resolver, &mut self.state.usage, self.options.repeat_directive);
        let rewritten = rewriter.rewrite(&raw);
        let template_diagnostics = std::mem::take(&mut rewriter.diagnostics);

        let output = match rewritten {
            Ok(output) => output,
            Err(err) => {
                self.warn_at(
                    method.span.start,
                    Diagnostic::new(PL_WARN_TEMPLATE_SHAPE, format!("cannot read template markup: {}", err)),
                );
                return;
            }
        };
        for diagnostic in template_diagnostics {
            self.warn_at(literal.span.start, diagnostic);
        }
        self.flush_resolver(literal.span.start);

        let mut replacement = String::new();
        if output.has_styles() {
            replacement.push_str(&styles_getter(&self.resolver, &output));
            replacement.push_str("\n\n  ");
        }
        replacement.push_str(&render_method(&output.html));
        self.doc.overwrite(method.span.start, method.span.end, replacement);
    }

    // ───────────────────────────────────────────────────────────────────────────
    // ready
    // ───────────────────────────────────────────────────────────────────────────

    fn transform_ready(&mut self, method: &MethodDefinition<'_>) {
        let Some(body) = method.value.body.as_deref() else {
            return;
        };
        self.doc
            .overwrite(method.key.span().start, body.span.start, "firstUpdated(_changedProperties) ");

        let mut collector = SuperReadyCollector::default();
        collector.visit_function_body(body);
        for (call, callee, has_arguments) in collector.calls {
            if has_arguments {
                self.doc.overwrite(callee.start, callee.end, "super.firstUpdated");
            } else {
                self.doc
                    .overwrite(call.start, call.end, "super.firstUpdated(_changedProperties)");
            }
        }
    }

    // ───────────────────────────────────────────────────────────────────────────
    // properties
    // ───────────────────────────────────────────────────────────────────────────

    fn transform_properties(&mut self, method: &MethodDefinition<'_>) {
        let Some(Expression::ObjectExpression(object)) = method_return(method) else {
            self.warn_at(
                method.span.start,
                Diagnostic::new(PL_WARN_PROPERTY_SHAPE, "properties getter does not return an object literal"),
            );
            return;
        };
        for property in &object.properties {
            let ObjectPropertyKind::ObjectProperty(property) = property else {
                continue;
            };
            let PropertyKey::StaticIdentifier(id) = &property.key else {
                continue;
            };
            match &property.value {
                Expression::ObjectExpression(descriptor) => {
                    self.transform_descriptor(id.name.as_str(), descriptor)
                }
                // `name: String` shorthand
                Expression::Identifier(_) => {}
                other => self.warn_at(
                    other.span().start,
                    Diagnostic::new(
                        PL_WARN_PROPERTY_SHAPE,
                        format!("declaration of `{}` is not an object; left unchanged", id.name.as_str()),
                    ),
                ),
            }
        }
    }

    fn transform_descriptor(&mut self, name: &str, descriptor: &ObjectExpression<'_>) {
        for entry in &descriptor.properties {
            let ObjectPropertyKind::ObjectProperty(entry) = entry else {
                continue;
            };
            match key_name(&entry.key) {
                Some("value") => self.capture_initializer(name, entry),
                Some("computed") => self.capture_computed(name, entry),
                Some("observer") => self.capture_observer(name, entry),
                Some("reflectToAttribute") => self.convert_reflect(entry),
                _ => {}
            }
        }
    }

    fn capture_initializer(&mut self, name: &str, entry: &ObjectProperty<'_>) {
        let value = match &entry.value {
            Expression::FunctionExpression(func) => self.factory_result(func),
            Expression::ArrowFunctionExpression(arrow) => {
                if !arrow.params.items.is_empty() {
                    None
                } else if arrow.expression {
                    arrow.body.statements.first().and_then(|stmt| match stmt {
                        Statement::ExpressionStatement(expr) => Some(expr.expression.span()),
                        _ => None,
                    })
                } else {
                    returned_expression(&arrow.body).map(GetSpan::span)
                }
            }
            other => Some(other.span()),
        };
        let Some(span) = value else {
            self.warn_at(
                entry.span.start,
                Diagnostic::new(
                    PL_WARN_PROPERTY_SHAPE,
                    format!("default value of `{}` is not a single-return factory; left unchanged", name),
                ),
            );
            return;
        };
        let text = self.doc.slice(span.start, span.end).to_string();
        self.plan.init.push((name.to_string(), text));
        self.doc.remove_with_trailing_comma(entry.span.start, entry.span.end);
    }

    fn factory_result(&self, func: &Function<'_>) -> Option<Span> {
        if !func.params.items.is_empty() {
            return None;
        }
        let body = func.body.as_deref()?;
        match &body.statements[..] {
            [Statement::ReturnStatement(ret)] => ret.argument.as_ref().map(GetSpan::span),
            _ => None,
        }
    }

    fn capture_computed(&mut self, name: &str, entry: &ObjectProperty<'_>) {
        let Expression::StringLiteral(signature) = &entry.value else {
            self.warn_at(
                entry.span.start,
                Diagnostic::new(PL_WARN_PROPERTY_SHAPE, format!("computed `{}` is not a string", name)),
            );
            return;
        };
        let expression =
            self.resolver
                .resolve(signature.value.as_str(), true, &QualificationContext::root(), UNDEFINED);
        self.flush_resolver(entry.span.start);
        self.plan.computed.push((name.to_string(), expression));
        self.doc.remove_with_trailing_comma(entry.span.start, entry.span.end);
    }

    fn capture_observer(&mut self, name: &str, entry: &ObjectProperty<'_>) {
        let Expression::StringLiteral(observer) = &entry.value else {
            self.warn_at(
                entry.span.start,
                Diagnostic::new(PL_WARN_PROPERTY_SHAPE, format!("observer of `{}` is not a method name", name)),
            );
            return;
        };
        let observer = observer.value.as_str().trim();
        if observer.contains('(') {
            self.doc.insert_before(entry.value.span().start, COMPLEX_OBSERVER_MARKER);
            self.warn_at(
                entry.span.start,
                Diagnostic::new(
                    PL_WARN_COMPLEX_OBSERVER,
                    format!("observer `{}` of `{}` needs manual conversion", observer, name),
                ),
            );
            return;
        }
        self.plan.observed.push((name.to_string(), observer.to_string()));
        self.doc.remove_with_trailing_comma(entry.span.start, entry.span.end);
    }

    fn convert_reflect(&mut self, entry: &ObjectProperty<'_>) {
        let had_comma = self.doc.remove_with_trailing_comma(entry.span.start, entry.span.end);
        if matches!(&entry.value, Expression::BooleanLiteral(flag) if flag.value) {
            let text = if had_comma { "reflect: true," } else { "reflect: true" };
            self.doc.insert_before(entry.span.start, text);
        }
    }
}

/// Convert `class` when it extends the legacy base; see [`ClassTransformer`].
pub fn transform_class(
    class: &Class<'_>,
    doc: &mut SourceDocument,
    state: &mut ConversionState,
    options: &ConvertOptions,
) -> bool {
    ClassTransformer::new(doc, state, options).transform(class)
}
