//! # Conversion Driver
//!
//! One file, one pass: parse → transform (accumulating edits) → materialize →
//! format → write. Every piece of state is built fresh per file.

use crate::class::{transform_class, LEGACY_BASE_CLASS};
use crate::config::ConvertOptions;
use crate::diagnostics::{ConvertError, Diagnostic, SourceLocation, PL_WARN_EXPORT_SHAPE};
use crate::document::SourceDocument;
use crate::format::format_module;
use crate::imports::{prepend_imports, rewrite_import};
use crate::state::{ClassReport, ConversionState, UsageFlags};
use lazy_static::lazy_static;
use oxc_allocator::Allocator;
use oxc_ast::ast::{Declaration, ExportDefaultDeclarationKind, Program, Statement};
use oxc_parser::Parser;
use oxc_span::{GetSpan, SourceType};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

lazy_static! {
    /// `this.$.id`, `this.$['id']`, `this.$["id"]`
    static ref ELEMENT_LOOKUP_RE: Regex =
        Regex::new(r#"this\.\$(?:\[\s*['"]([^'"\]]+)['"]\s*\]|\.([A-Za-z_$][A-Za-z0-9_$]*))"#).unwrap();
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionOutput {
    pub code: String,
    pub diagnostics: Vec<Diagnostic>,
    pub classes: Vec<ClassReport>,
    pub usage: UsageFlags,
}

impl ConversionOutput {
    /// Whether any legacy class was rewritten.
    pub fn converted(&self) -> bool {
        !self.classes.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    /// The legacy base class name does not occur in the file.
    NotLegacy,
    /// No output suffix: the result would overwrite the input.
    OutputCollision,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NotLegacy => write!(f, "no {} reference", LEGACY_BASE_CLASS),
            SkipReason::OutputCollision => write!(f, "output would overwrite the input"),
        }
    }
}

/// Result of a non-fatal run over one file.
#[derive(Debug, Clone, PartialEq)]
pub enum FileConversion {
    Converted { output: PathBuf, result: ConversionOutput },
    Skipped(SkipReason),
}

// ═══════════════════════════════════════════════════════════════════════════════
// MODULE WALK
// ═══════════════════════════════════════════════════════════════════════════════

fn walk_module(program: &Program<'_>, doc: &mut SourceDocument, state: &mut ConversionState, options: &ConvertOptions) {
    for stmt in &program.body {
        match stmt {
            Statement::ClassDeclaration(class) => {
                transform_class(class, doc, state, options);
            }
            Statement::ExportNamedDeclaration(export) => match &export.declaration {
                Some(Declaration::ClassDeclaration(class)) => {
                    transform_class(class, doc, state, options);
                }
                Some(other) => {
                    let location = SourceLocation::from_offset(doc.original(), other.span().start);
                    state.warn(
                        Diagnostic::new(PL_WARN_EXPORT_SHAPE, "exported declaration is not a class; left unchanged")
                            .at(location),
                    );
                }
                None => tracing::debug!("re-export without declaration left unchanged"),
            },
            Statement::ExportDefaultDeclaration(export) => match &export.declaration {
                ExportDefaultDeclarationKind::ClassDeclaration(class) => {
                    transform_class(class, doc, state, options);
                }
                ExportDefaultDeclarationKind::Identifier(_) => {}
                other => {
                    let location = SourceLocation::from_offset(doc.original(), other.span().start);
                    state.warn(
                        Diagnostic::new(PL_WARN_EXPORT_SHAPE, "default export is not a class; left unchanged")
                            .at(location),
                    );
                }
            },
            _ => {}
        }
    }
}

fn rewrite_imports(program: &Program<'_>, doc: &mut SourceDocument, state: &ConversionState, options: &ConvertOptions) {
    for stmt in &program.body {
        if let Statement::ImportDeclaration(import) = stmt {
            rewrite_import(import, doc);
        }
    }
    prepend_imports(doc, &state.usage, options);
}

/// Replace `this.$` element lookups with render-root queries.
pub fn rewrite_element_lookups(code: &str) -> String {
    ELEMENT_LOOKUP_RE
        .replace_all(code, |caps: &regex::Captures| {
            let id = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            format!("this.renderRoot.querySelector(\"#{}\")", id)
        })
        .into_owned()
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Convert module text. `path` only labels errors and diagnostics.
///
/// Imports are only rewritten when at least one class was converted, so a
/// module that merely mentions the legacy base keeps working imports.
pub fn convert_source(source: &str, path: &Path, options: &ConvertOptions) -> Result<ConversionOutput, ConvertError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::default().with_module(true)).parse();
    if ret.panicked || !ret.errors.is_empty() {
        let message = ret
            .errors
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "parser panicked".to_string());
        return Err(ConvertError::Parse {
            path: path.to_path_buf(),
            message,
        });
    }

    let mut doc = SourceDocument::new(source);
    let mut state = ConversionState::new();
    walk_module(&ret.program, &mut doc, &mut state, options);
    if !state.classes.is_empty() {
        rewrite_imports(&ret.program, &mut doc, &state, options);
    }

    let mut code = rewrite_element_lookups(&doc.materialize());
    if options.format {
        match format_module(&code) {
            Ok(formatted) => code = formatted,
            Err(err) => tracing::warn!("{}: writing unformatted output: {}", path.display(), err),
        }
    }

    let file = path.display().to_string();
    let diagnostics = state
        .diagnostics
        .into_iter()
        .map(|mut d| {
            d.file = file.clone();
            d
        })
        .collect();

    Ok(ConversionOutput {
        code,
        diagnostics,
        classes: state.classes,
        usage: state.usage,
    })
}

/// Convert one file on disk and write the result next to it.
pub fn convert_file(path: &Path, options: &ConvertOptions) -> Result<FileConversion, ConvertError> {
    let source = fs::read_to_string(path).map_err(|source| ConvertError::Unreadable {
        path: path.to_path_buf(),
        source,
    })?;
    if source.trim().is_empty() {
        return Err(ConvertError::Empty {
            path: path.to_path_buf(),
        });
    }
    if !source.contains(LEGACY_BASE_CLASS) {
        tracing::debug!("{}: skipped, {}", path.display(), SkipReason::NotLegacy);
        return Ok(FileConversion::Skipped(SkipReason::NotLegacy));
    }
    let Some(output) = options.output_path(path) else {
        tracing::error!("{}: skipped, {}", path.display(), SkipReason::OutputCollision);
        return Ok(FileConversion::Skipped(SkipReason::OutputCollision));
    };

    let result = convert_source(&source, path, options)?;
    fs::write(&output, &result.code).map_err(|source| ConvertError::Write {
        path: output.clone(),
        source,
    })?;
    tracing::info!(
        "Converted {} -> {} ({} classes, {} diagnostics)",
        path.display(),
        output.display(),
        result.classes.len(),
        result.diagnostics.len()
    );
    Ok(FileConversion::Converted { output, result })
}
