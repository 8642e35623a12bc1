//! Discovery and batch conversion.
//!
//! Recursively scans a directory for `.js` modules and converts each one as an
//! independent translation unit on the rayon pool. A failing file never
//! affects the others; its error lands in the [`BatchReport`].

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::{needs_legacy_imports, read_vaadin_version, ConvertOptions};
use crate::convert::{convert_file, FileConversion, SkipReason};
use crate::diagnostics::Diagnostic;
use crate::state::ClassReport;

const SKIPPED_DIRS: &[&str] = &["node_modules"];

// ═══════════════════════════════════════════════════════════════════════════════
// REPORT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum FileOutcome {
    #[serde(rename_all = "camelCase")]
    Converted {
        output: String,
        classes: Vec<ClassReport>,
        diagnostics: Vec<Diagnostic>,
    },
    Skipped { reason: SkipReason },
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileReport {
    pub path: String,
    pub outcome: FileOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub diagnostics: usize,
}

impl BatchReport {
    pub fn from_files(files: Vec<FileReport>) -> Self {
        let mut report = BatchReport::default();
        for file in &files {
            match &file.outcome {
                FileOutcome::Converted { diagnostics, .. } => {
                    report.converted += 1;
                    report.diagnostics += diagnostics.len();
                }
                FileOutcome::Skipped { .. } => report.skipped += 1,
                FileOutcome::Failed { .. } => report.failed += 1,
            }
        }
        report.files = files;
        report
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0
    }

    /// Fatal errors, one per failed file.
    pub fn errors(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().filter_map(|file| match &file.outcome {
            FileOutcome::Failed { error } => Some((file.path.as_str(), error.as_str())),
            _ => None,
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DISCOVERY
// ═══════════════════════════════════════════════════════════════════════════════

/// `root` itself when it is a file, otherwise every `.js` file below it,
/// sorted. Previously written outputs (ending in `output_suffix`) are ignored.
pub fn discover_sources(root: &Path, output_suffix: Option<&str>) -> Vec<PathBuf> {
    if root.is_file() {
        return vec![root.to_path_buf()];
    }

    let mut files: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        .filter_entry(|entry| {
            !(entry.file_type().is_dir()
                && SKIPPED_DIRS
                    .iter()
                    .any(|skipped| entry.file_name() == *skipped))
        })
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                tracing::warn!("skipping unreadable entry: {}", err);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "js"))
        .filter(|path| match output_suffix {
            Some(suffix) if !suffix.is_empty() => !path.to_string_lossy().ends_with(suffix),
            _ => true,
        })
        .collect();
    files.sort();
    files
}

/// Enable the legacy import variant when the project declares a version 14
/// platform in a `pom.xml` at or above `root`.
pub fn detect_legacy_imports(root: &Path, mut options: ConvertOptions) -> ConvertOptions {
    if options.legacy_imports {
        return options;
    }
    let start = if root.is_file() { root.parent() } else { Some(root) };
    let version = start.and_then(|dir| dir.ancestors().find_map(read_vaadin_version));
    if let Some(version) = version {
        if needs_legacy_imports(&version) {
            tracing::info!("Platform version {} detected, using lit-element imports", version);
            options.legacy_imports = true;
        }
    }
    options
}

// ═══════════════════════════════════════════════════════════════════════════════
// BATCH
// ═══════════════════════════════════════════════════════════════════════════════

fn run_one(path: &Path, options: &ConvertOptions) -> FileReport {
    let outcome = match convert_file(path, options) {
        Ok(FileConversion::Converted { output, result }) => FileOutcome::Converted {
            output: output.display().to_string(),
            classes: result.classes,
            diagnostics: result.diagnostics,
        },
        Ok(FileConversion::Skipped(reason)) => FileOutcome::Skipped { reason },
        Err(err) => {
            tracing::error!("{}", err);
            FileOutcome::Failed {
                error: err.to_string(),
            }
        }
    };
    FileReport {
        path: path.display().to_string(),
        outcome,
    }
}

/// Convert every module under `root` in parallel.
pub fn convert_tree(root: &Path, options: &ConvertOptions) -> BatchReport {
    let files = discover_sources(root, options.output_suffix.as_deref());
    tracing::info!("Found {} module(s) under {}", files.len(), root.display());

    let reports: Vec<FileReport> = files.par_iter().map(|path| run_one(path, options)).collect();
    let report = BatchReport::from_files(reports);
    tracing::info!(
        "{} converted, {} skipped, {} failed",
        report.converted,
        report.skipped,
        report.failed
    );
    report
}
