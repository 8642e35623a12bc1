//! Conversion options and their sources: defaults, `polylit.toml`, project
//! version detection. CLI flags are applied on top by the binary.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "polylit.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ConvertOptions {
    /// Import from `lit-element` instead of `lit`.
    #[serde(default)]
    pub legacy_imports: bool,
    /// Guard chains with `?.` instead of conditional prefixes.
    #[serde(default)]
    pub optional_chaining: bool,
    /// Appended to the input path to form the output path.
    #[serde(default)]
    pub output_suffix: Option<String>,
    #[serde(default = "default_format")]
    pub format: bool,
    /// Emit `repeat(items, ...)` instead of `items.map(...)`.
    #[serde(default)]
    pub repeat_directive: bool,
}

fn default_format() -> bool {
    true
}

impl Default for ConvertOptions {
    fn default() -> Self {
        ConvertOptions {
            legacy_imports: false,
            optional_chaining: false,
            output_suffix: None,
            format: default_format(),
            repeat_directive: false,
        }
    }
}

impl ConvertOptions {
    /// Module specifier of the render/style helpers.
    pub fn lit_module(&self) -> &'static str {
        if self.legacy_imports {
            "lit-element"
        } else {
            "lit"
        }
    }

    pub fn repeat_module(&self) -> &'static str {
        if self.legacy_imports {
            "lit-html/directives/repeat.js"
        } else {
            "lit/directives/repeat.js"
        }
    }

    /// Output path for `input`, or `None` when it would overwrite the input.
    pub fn output_path(&self, input: &Path) -> Option<PathBuf> {
        match self.output_suffix.as_deref() {
            Some(suffix) if !suffix.is_empty() => {
                let mut name = input.as_os_str().to_owned();
                name.push(suffix);
                Some(PathBuf::from(name))
            }
            _ => None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIG FILE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    convert: Option<ConvertOptions>,
}

/// Parse the `[convert]` table of a config file body.
pub fn parse_config(content: &str, path: &Path) -> Result<ConvertOptions, ConfigError> {
    let file: ConfigFile = toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(file.convert.unwrap_or_default())
}

/// Load options from `path`. A missing file yields the defaults.
pub fn load_config(path: &Path) -> Result<ConvertOptions, ConfigError> {
    if !path.exists() {
        return Ok(ConvertOptions::default());
    }
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let options = parse_config(&content, path)?;
    tracing::info!("Loaded config from {}", path.display());
    Ok(options)
}

// ═══════════════════════════════════════════════════════════════════════════════
// VERSION DETECTION
// ═══════════════════════════════════════════════════════════════════════════════

lazy_static! {
    static ref VAADIN_VERSION_RE: Regex =
        Regex::new(r"<vaadin\.version>\s*([^<\s]+)\s*</vaadin\.version>").unwrap();
}

/// Platform version declared in `<project_dir>/pom.xml`, if any.
pub fn read_vaadin_version(project_dir: &Path) -> Option<String> {
    let pom = fs::read_to_string(project_dir.join("pom.xml")).ok()?;
    VAADIN_VERSION_RE
        .captures(&pom)
        .map(|caps| caps[1].to_string())
}

/// Version 14 projects ship the pre-2.0 render library.
pub fn needs_legacy_imports(version: &str) -> bool {
    version.trim().starts_with("14.")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_defaults() {
        let options = ConvertOptions::default();
        assert!(options.format);
        assert!(!options.legacy_imports);
        assert_eq!(options.lit_module(), "lit");
        assert_eq!(options.output_path(Path::new("a/b.js")), None);
    }

    #[test]
    fn test_output_suffix() {
        let options = ConvertOptions {
            output_suffix: Some(".out.js".into()),
            ..Default::default()
        };
        assert_eq!(
            options.output_path(Path::new("src/x.js")),
            Some(PathBuf::from("src/x.js.out.js"))
        );
    }

    #[test]
    fn test_parse_config_table() {
        let options = parse_config(
            "[convert]\nlegacy_imports = true\noutput_suffix = \".lit.js\"\n",
            Path::new("polylit.toml"),
        )
        .unwrap();
        assert!(options.legacy_imports);
        assert!(options.format);
        assert_eq!(options.output_suffix.as_deref(), Some(".lit.js"));
        assert_eq!(options.lit_module(), "lit-element");
    }

    #[test]
    fn test_parse_config_rejects_bad_toml() {
        let err = parse_config("[convert\n", Path::new("polylit.toml")).unwrap_err();
        assert!(err.to_string().contains("polylit.toml"));
    }

    #[test]
    fn test_vaadin_version_from_pom() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("pom.xml"),
            "<project><properties><vaadin.version>14.8.2</vaadin.version></properties></project>",
        )
        .unwrap();
        let version = read_vaadin_version(dir.path()).unwrap();
        assert_eq!(version, "14.8.2");
        assert!(needs_legacy_imports(&version));
        assert!(!needs_legacy_imports("24.3.0"));
        assert_eq!(read_vaadin_version(&dir.path().join("missing")), None);
    }
}
