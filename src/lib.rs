//! # polylit
//!
//! Source-to-source conversion of `PolymerElement` components into
//! `LitElement` components with a tagged-template `render()`.
//!
//! ## Pipeline Invariants
//!
//! 1. **Original Offsets**: every rewrite is a position-keyed edit against the
//!    untouched module text ([`SourceDocument`]); nothing re-parses a partially
//!    rewritten module before materialization.
//!
//! 2. **Per-File Isolation**: [`ConversionState`], the edit buffer and every
//!    accumulator are built fresh for each file. Batch conversion runs files in
//!    parallel and nothing crosses file boundaries.
//!
//! 3. **Explicit Scoping**: template scopes (`item`, `index`, column
//!    variables) travel as a [`QualificationContext`] argument. A nested scope
//!    derives a new context and never alters its parent's.
//!
//! 4. **Conservative Failure**: shapes the converter does not understand are
//!    left exactly as written and reported as a [`Diagnostic`]. Only an
//!    unreadable, empty or unparseable file aborts, and only that file.
//!
//! ## Stages
//!
//! - [`binding`]: split attribute/text values into text and `[[...]]`/`{{...}}`
//! - [`resolve`]: qualify and null-guard binding expressions
//! - [`template`]: rewrite template markup into render-method markup
//! - [`class`]: rewrite class members
//! - [`imports`]: drop legacy imports, add helper imports
//! - [`convert`]: per-file driver; [`discovery`]: directory batch

#[cfg(feature = "napi")]
mod node;

pub mod binding;
pub mod class;
pub mod config;
pub mod convert;
pub mod diagnostics;
pub mod discovery;
pub mod document;
pub mod format;
pub mod imports;
pub mod markup;
pub mod resolve;
pub mod state;
pub mod template;

#[cfg(test)]
mod conversion_tests;

pub use config::{load_config, ConvertOptions, CONFIG_FILE_NAME};
pub use convert::{convert_file, convert_source, ConversionOutput, FileConversion, SkipReason};
pub use diagnostics::{describe_code, ConvertError, Diagnostic, SourceLocation};
pub use discovery::{convert_tree, detect_legacy_imports, discover_sources, BatchReport, FileOutcome, FileReport};
pub use document::SourceDocument;
pub use resolve::{ExpressionResolver, QualificationContext};
pub use state::{ClassReport, ConversionState, UsageFlags};

#[cfg(feature = "napi")]
pub use node::convert_source_native;
