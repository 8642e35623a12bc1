//! Import rewriter: drops legacy imports and prepends the helpers the
//! converted classes reference.

use crate::config::ConvertOptions;
use crate::document::SourceDocument;
use crate::state::UsageFlags;
use oxc_ast::ast::{ImportDeclaration, ImportDeclarationSpecifier};

/// Specifiers that have no counterpart after conversion.
pub const LEGACY_SPECIFIERS: &[&str] = &["html", "PolymerElement"];

/// Side-effect imports registering the legacy control-flow elements.
pub const LEGACY_SIDE_EFFECT_IMPORTS: &[&str] = &[
    "@polymer/polymer/lib/elements/dom-if.js",
    "@polymer/polymer/lib/elements/dom-repeat.js",
];

pub const GRID_RENDERER_MODULE: &str = "@vaadin/grid/lit.js";

fn local_name<'b>(specifier: &'b ImportDeclarationSpecifier<'_>) -> &'b str {
    match specifier {
        ImportDeclarationSpecifier::ImportSpecifier(s) => s.local.name.as_str(),
        ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => s.local.name.as_str(),
        ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => s.local.name.as_str(),
    }
}

fn remove_statement(doc: &mut SourceDocument, import: &ImportDeclaration<'_>) {
    let end = import.span.end;
    let end = if doc.original()[end as usize..].starts_with('\n') {
        end + 1
    } else {
        end
    };
    doc.remove(import.span.start, end);
}

/// Drop legacy specifiers from one import; the whole statement goes when
/// nothing else remains. Returns whether anything was removed.
pub fn rewrite_import(import: &ImportDeclaration<'_>, doc: &mut SourceDocument) -> bool {
    let source = import.source.value.as_str();
    let Some(specifiers) = &import.specifiers else {
        if LEGACY_SIDE_EFFECT_IMPORTS.contains(&source) {
            tracing::debug!("removing side-effect import {}", source);
            remove_statement(doc, import);
            return true;
        }
        return false;
    };
    if specifiers.is_empty() {
        return false;
    }

    let legacy: Vec<_> = specifiers
        .iter()
        .filter(|s| LEGACY_SPECIFIERS.contains(&local_name(s)))
        .collect();
    if legacy.is_empty() {
        return false;
    }
    if legacy.len() == specifiers.len() {
        tracing::debug!("removing import of {}", source);
        remove_statement(doc, import);
    } else {
        for specifier in legacy {
            tracing::debug!("removing `{}` from import of {}", local_name(specifier), source);
            let span = match specifier {
                ImportDeclarationSpecifier::ImportSpecifier(s) => s.span,
                ImportDeclarationSpecifier::ImportDefaultSpecifier(s) => s.span,
                ImportDeclarationSpecifier::ImportNamespaceSpecifier(s) => s.span,
            };
            doc.remove_with_trailing_comma(span.start, span.end);
        }
    }
    true
}

/// Import statements for the helpers used by the converted module.
pub fn helper_imports(usage: &UsageFlags, options: &ConvertOptions) -> Vec<String> {
    let lit = options.lit_module();
    let mut lines = vec![format!("import {{ html, LitElement, css }} from \"{}\";", lit)];
    if usage.uses_repeat {
        lines.push(format!("import {{ repeat }} from \"{}\";", options.repeat_module()));
    }
    if usage.uses_unsafe_style_include {
        lines.push(format!("import {{ unsafeCSS }} from \"{}\";", lit));
    }
    let renderers = usage.renderers();
    if !renderers.is_empty() {
        lines.push(format!(
            "import {{ {} }} from \"{}\";",
            renderers.join(", "),
            GRID_RENDERER_MODULE
        ));
    }
    lines
}

/// Prepend the helper imports at the top of the module.
pub fn prepend_imports(doc: &mut SourceDocument, usage: &UsageFlags, options: &ConvertOptions) {
    let mut text = helper_imports(usage, options).join("\n");
    text.push('\n');
    doc.insert_before(0, text);
}
