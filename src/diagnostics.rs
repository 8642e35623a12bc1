#[cfg(feature = "napi")]
use napi_derive::napi;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const PL_WARN_EXPRESSION_KIND: &str = "PL-WARN-EXPR-001";
pub const PL_WARN_EXPRESSION_PARSE: &str = "PL-WARN-EXPR-002";
pub const PL_WARN_DIRECTIVE_CONDITION: &str = "PL-WARN-DIRECTIVE-001";
pub const PL_WARN_DIRECTIVE_ITEMS: &str = "PL-WARN-DIRECTIVE-002";
pub const PL_WARN_DIRECTIVE_TEMPLATE: &str = "PL-WARN-DIRECTIVE-003";
pub const PL_WARN_SUPERCLASS: &str = "PL-WARN-CLASS-001";
pub const PL_WARN_TEMPLATE_SHAPE: &str = "PL-WARN-CLASS-002";
pub const PL_WARN_PROPERTY_SHAPE: &str = "PL-WARN-CLASS-003";
pub const PL_WARN_COMPLEX_OBSERVER: &str = "PL-WARN-CLASS-004";
pub const PL_WARN_OBSERVERS_ACCESSOR: &str = "PL-WARN-CLASS-005";
pub const PL_WARN_EXPORT_SHAPE: &str = "PL-WARN-MODULE-001";

// ═══════════════════════════════════════════════════════════════════════════════
// DESCRIPTIONS
// ═══════════════════════════════════════════════════════════════════════════════

/// One-line description of what a diagnostic code means for the converted output.
pub fn describe_code(code: &str) -> &'static str {
    match code {
        PL_WARN_EXPRESSION_KIND => {
            "Binding expression kind is not rewritten; its source text is emitted unchanged."
        }
        PL_WARN_EXPRESSION_PARSE => "Binding expression could not be parsed; emitted as written.",
        PL_WARN_DIRECTIVE_CONDITION => "dom-if without an `if` attribute is left unconverted.",
        PL_WARN_DIRECTIVE_ITEMS => "dom-repeat without an `items` attribute is left unconverted.",
        PL_WARN_DIRECTIVE_TEMPLATE => "Directive wrapper without a nested <template> is left unconverted.",
        PL_WARN_SUPERCLASS => "Superclass shape is not recognized; the class is left untouched.",
        PL_WARN_TEMPLATE_SHAPE => "Template getter does not return a plain html`` literal.",
        PL_WARN_PROPERTY_SHAPE => "Property descriptor entry is left as written.",
        PL_WARN_COMPLEX_OBSERVER => "Observer with arguments needs manual conversion.",
        PL_WARN_OBSERVERS_ACCESSOR => "Multi-property observers need manual conversion.",
        PL_WARN_EXPORT_SHAPE => "Export declaration shape is passed through unchanged.",
        _ => "Unknown diagnostic.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC
// ═══════════════════════════════════════════════════════════════════════════════

/// A finding recorded while converting one file. Never aborts the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "napi", napi(object))]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: String,
    pub message: String,
    pub description: String,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub hints: Vec<String>,
}

impl Diagnostic {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Diagnostic {
            code: code.to_string(),
            message: message.into(),
            description: describe_code(code).to_string(),
            file: String::new(),
            line: 0,
            column: 0,
            hints: vec![],
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.line = location.line;
        self.column = location.column;
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.file.is_empty() {
            write!(f, "[{}] {}", self.code, self.message)
        } else {
            write!(
                f,
                "{}:{}:{} [{}] {}",
                self.file, self.line, self.column, self.code, self.message
            )
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    /// 1-based line and column of a byte offset.
    pub fn from_offset(source: &str, offset: u32) -> Self {
        let offset = (offset as usize).min(source.len());
        let before = &source.as_bytes()[..offset];
        let line = before.iter().filter(|&&b| b == b'\n').count() as u32 + 1;
        let line_start = before
            .iter()
            .rposition(|&b| b == b'\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        SourceLocation {
            line,
            column: (offset - line_start) as u32 + 1,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// FATAL ERRORS
// ═══════════════════════════════════════════════════════════════════════════════

/// Per-file failures that abort the conversion of that file only.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path} is empty")]
    Empty { path: PathBuf },
    #[error("cannot parse {path} as an ES module: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
