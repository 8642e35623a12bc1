use crate::diagnostics::Diagnostic;
use serde::{Deserialize, Serialize};

/// Helpers referenced by generated code, accumulated over one file.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageFlags {
    pub uses_repeat: bool,
    pub uses_header_renderer: bool,
    pub uses_body_renderer: bool,
    pub uses_footer_renderer: bool,
    pub uses_unsafe_style_include: bool,
}

impl UsageFlags {
    /// Grid renderer helper names in import order.
    pub fn renderers(&self) -> Vec<&'static str> {
        let mut names = Vec::new();
        if self.uses_body_renderer {
            names.push("columnBodyRenderer");
        }
        if self.uses_footer_renderer {
            names.push("columnFooterRenderer");
        }
        if self.uses_header_renderer {
            names.push("columnHeaderRenderer");
        }
        names
    }
}

/// Bookkeeping for one converted class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassReport {
    pub name: String,
    pub tag: Option<String>,
    pub initialized: Vec<String>,
    pub computed: Vec<String>,
    pub observed: Vec<String>,
}

/// Per-file accumulation state. Built fresh for every file.
#[derive(Debug, Default)]
pub struct ConversionState {
    pub usage: UsageFlags,
    pub classes: Vec<ClassReport>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ConversionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, diagnostic: Diagnostic) {
        tracing::warn!("{}", diagnostic);
        self.diagnostics.push(diagnostic);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_renderer_import_order() {
        let usage = UsageFlags {
            uses_header_renderer: true,
            uses_body_renderer: true,
            ..Default::default()
        };
        assert_eq!(usage.renderers(), vec!["columnBodyRenderer", "columnHeaderRenderer"]);
        assert!(UsageFlags::default().renderers().is_empty());
    }
}
