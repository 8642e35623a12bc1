//! Output formatting: reparse the converted module and print it back with
//! `oxc_codegen`.

use oxc_allocator::Allocator;
use oxc_codegen::Codegen;
use oxc_parser::Parser;
use oxc_span::SourceType;

/// Comments the converter emits that must survive formatting.
const GENERATED_MARKERS: &[&str] = &["TODO: Convert this complex observer manually"];

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("converted output does not parse: {0}")]
    Parse(String),
    #[error("formatting dropped generated comment `{0}`")]
    LostComment(&'static str),
}

/// Pretty-print an ES module.
pub fn format_module(source: &str) -> Result<String, FormatError> {
    let allocator = Allocator::default();
    let ret = Parser::new(&allocator, source, SourceType::default().with_module(true)).parse();
    if ret.panicked || !ret.errors.is_empty() {
        let message = ret
            .errors
            .first()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "parser panicked".to_string());
        return Err(FormatError::Parse(message));
    }

    let code = Codegen::new().build(&ret.program).code;
    for marker in GENERATED_MARKERS {
        if source.matches(marker).count() != code.matches(marker).count() {
            return Err(FormatError::LostComment(marker));
        }
    }
    Ok(code)
}
