//! Markup tree for legacy component templates.
//!
//! Templates are parsed with html5ever into an owned, mutable tree that the
//! rewriter edits in place. Serialization escapes static text and attribute
//! values but writes [`MarkupNode::Raw`] and [`AttrValue::Interpolated`]
//! content verbatim, so `${...}` interpolations survive untouched.

use html5ever::parse_document;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use std::cell::RefCell;
use tendril::TendrilSink;

// ═══════════════════════════════════════════════════════════════════════════════
// TREE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    /// Literal value, escaped on output. Empty renders as a bare attribute.
    Static(String),
    /// Interpolation source such as `${this.name}`, written as-is inside quotes.
    Interpolated(String),
    /// Element-level directive such as `${columnBodyRenderer(...)}`, written bare.
    Directive,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkupAttr {
    pub name: String,
    pub value: AttrValue,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MarkupElement {
    pub tag: String,
    pub attrs: Vec<MarkupAttr>,
    pub children: Vec<MarkupNode>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkupNode {
    Element(MarkupElement),
    Text(String),
    Comment(String),
    /// Already-rendered template source (interpolations, directive output).
    Raw(String),
}

impl MarkupElement {
    pub fn is(&self, tag: &str) -> bool {
        self.tag.eq_ignore_ascii_case(tag)
    }

    /// Static value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.iter().find(|a| a.name == name).and_then(|a| match &a.value {
            AttrValue::Static(v) => Some(v.as_str()),
            _ => None,
        })
    }

    /// Append a bare element-level directive (`<el ${directive}>`).
    pub fn push_directive(&mut self, source: String) {
        self.attrs.push(MarkupAttr {
            name: source,
            value: AttrValue::Directive,
        });
    }

    pub fn child_elements(&self) -> impl Iterator<Item = &MarkupElement> {
        self.children.iter().filter_map(|c| match c {
            MarkupNode::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn inner_html(&self) -> String {
        serialize_children(&self.children, is_raw_text_element(&self.tag))
    }

    /// Concatenated text content of direct text children.
    pub fn text_content(&self) -> String {
        self.children
            .iter()
            .filter_map(|c| match c {
                MarkupNode::Text(t) | MarkupNode::Raw(t) => Some(t.as_str()),
                _ => None,
            })
            .collect()
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Read access to `<template>` contents regardless of how the DOM stores them.
trait TemplateContents {
    fn contents(&self) -> Option<Handle>;
}

impl TemplateContents for RefCell<Option<Handle>> {
    fn contents(&self) -> Option<Handle> {
        self.borrow().clone()
    }
}

impl TemplateContents for Option<Handle> {
    fn contents(&self) -> Option<Handle> {
        self.clone()
    }
}

/// Parse a template fragment into owned nodes.
///
/// The fragment is parsed in body context so leading `<style>` blocks stay in
/// document order; the synthetic html/head/body wrappers are flattened away.
pub fn parse_fragment(html: &str) -> std::io::Result<Vec<MarkupNode>> {
    let source = format!("<body>{}", html);
    let dom = parse_document(RcDom::default(), Default::default())
        .from_utf8()
        .read_from(&mut source.as_bytes())?;

    let mut nodes = Vec::new();
    collect_body_content(&dom.document, &mut nodes);
    Ok(nodes)
}

fn collect_body_content(handle: &Handle, nodes: &mut Vec<MarkupNode>) {
    match &handle.data {
        NodeData::Document => {
            for child in handle.children.borrow().iter() {
                collect_body_content(child, nodes);
            }
        }
        NodeData::Element { name, .. } => {
            let tag = name.local.to_string();
            if tag == "html" || tag == "head" || tag == "body" {
                for child in handle.children.borrow().iter() {
                    collect_body_content(child, nodes);
                }
            } else {
                nodes.extend(convert_dom_node(handle));
            }
        }
        NodeData::Text { .. } | NodeData::Comment { .. } => {
            nodes.extend(convert_dom_node(handle));
        }
        NodeData::Doctype { .. } | NodeData::ProcessingInstruction { .. } => {}
    }
}

fn convert_dom_node(handle: &Handle) -> Option<MarkupNode> {
    match &handle.data {
        NodeData::Text { contents } => Some(MarkupNode::Text(contents.borrow().to_string())),
        NodeData::Comment { contents } => Some(MarkupNode::Comment(contents.to_string())),
        NodeData::Element {
            name,
            attrs,
            template_contents,
            ..
        } => {
            let tag = name.local.to_string();
            let attrs = attrs
                .borrow()
                .iter()
                .map(|attr| {
                    let local = attr.name.local.to_string();
                    let name = match &attr.name.prefix {
                        Some(prefix) => format!("{}:{}", prefix, local),
                        None => local,
                    };
                    MarkupAttr {
                        name,
                        value: AttrValue::Static(attr.value.to_string()),
                    }
                })
                .collect();

            let content_root = template_contents.contents();
            let children_of = content_root.as_ref().unwrap_or(handle);
            let children = children_of
                .children
                .borrow()
                .iter()
                .filter_map(convert_dom_node)
                .collect();

            Some(MarkupNode::Element(MarkupElement {
                tag,
                attrs,
                children,
            }))
        }
        NodeData::Document | NodeData::Doctype { .. } | NodeData::ProcessingInstruction { .. } => {
            None
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERIALIZATION
// ═══════════════════════════════════════════════════════════════════════════════

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta",
    "param", "source", "track", "wbr",
];

const RAW_TEXT_ELEMENTS: &[&str] = &[
    "style", "script", "xmp", "iframe", "noembed", "noframes", "plaintext",
];

fn is_void_element(tag: &str) -> bool {
    VOID_ELEMENTS.iter().any(|v| tag.eq_ignore_ascii_case(v))
}

fn is_raw_text_element(tag: &str) -> bool {
    RAW_TEXT_ELEMENTS.iter().any(|v| tag.eq_ignore_ascii_case(v))
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            '\u{a0}' => out.push_str("&nbsp;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn serialize_nodes(nodes: &[MarkupNode]) -> String {
    serialize_children(nodes, false)
}

fn serialize_children(nodes: &[MarkupNode], raw_text: bool) -> String {
    let mut out = String::new();
    for node in nodes {
        match node {
            MarkupNode::Element(el) => write_element(&mut out, el),
            MarkupNode::Text(text) if raw_text => out.push_str(text),
            MarkupNode::Text(text) => out.push_str(&escape_text(text)),
            MarkupNode::Comment(text) => {
                out.push_str("<!--");
                out.push_str(text);
                out.push_str("-->");
            }
            MarkupNode::Raw(source) => out.push_str(source),
        }
    }
    out
}

fn write_element(out: &mut String, el: &MarkupElement) {
    out.push('<');
    out.push_str(&el.tag);
    for attr in &el.attrs {
        out.push(' ');
        out.push_str(&attr.name);
        match &attr.value {
            AttrValue::Static(v) if v.is_empty() => {}
            AttrValue::Static(v) => {
                out.push_str("=\"");
                out.push_str(&escape_attr(v));
                out.push('"');
            }
            AttrValue::Interpolated(source) => {
                out.push_str("=\"");
                out.push_str(source);
                out.push('"');
            }
            AttrValue::Directive => {}
        }
    }
    out.push('>');
    if is_void_element(&el.tag) {
        return;
    }
    out.push_str(&el.inner_html());
    out.push_str("</");
    out.push_str(&el.tag);
    out.push('>');
}
