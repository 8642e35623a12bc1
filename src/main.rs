//! polylit CLI - converts legacy template components to Lit render components.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use polylit::{convert_tree, detect_legacy_imports, load_config, CONFIG_FILE_NAME};

const OUT_SUFFIX: &str = ".out.js";

#[derive(Parser)]
#[command(name = "polylit")]
#[command(about = "Convert PolymerElement components to LitElement")]
#[command(version)]
pub struct Cli {
    /// A .js file or a directory to convert recursively
    path: PathBuf,

    /// Import from lit-element instead of lit
    #[arg(short = '1', long)]
    lit1: bool,

    /// Use optional chaining for null-safe property access
    #[arg(long)]
    chain: bool,

    /// Write results to <file>.out.js
    #[arg(long)]
    out: bool,

    /// Write results to <file><SUFFIX>
    #[arg(long, conflicts_with = "out")]
    suffix: Option<String>,

    /// Skip formatting of the converted modules
    #[arg(long)]
    no_format: bool,

    /// Path to the config file (defaults to polylit.toml in the target directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write a JSON report of the batch
    #[arg(long)]
    report: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable trace output
    #[arg(short, long)]
    debug: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        EnvFilter::new("trace")
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    fmt().with_env_filter(filter).with_target(false).init();

    if !cli.path.exists() {
        bail!("{} does not exist", cli.path.display());
    }

    let config_path = cli.config.clone().unwrap_or_else(|| {
        let dir = if cli.path.is_dir() {
            cli.path.as_path()
        } else {
            cli.path.parent().unwrap_or(cli.path.as_path())
        };
        dir.join(CONFIG_FILE_NAME)
    });
    let mut options = load_config(&config_path)
        .with_context(|| format!("loading {}", config_path.display()))?;

    options.legacy_imports |= cli.lit1;
    options.optional_chaining |= cli.chain;
    if cli.no_format {
        options.format = false;
    }
    if cli.out {
        options.output_suffix = Some(OUT_SUFFIX.to_string());
    } else if let Some(suffix) = cli.suffix {
        options.output_suffix = Some(suffix);
    }
    let options = detect_legacy_imports(&cli.path, options);

    let report = convert_tree(&cli.path, &options);

    if let Some(report_path) = &cli.report {
        let json = serde_json::to_string_pretty(&report).context("serializing batch report")?;
        fs::write(report_path, json)
            .with_context(|| format!("writing report to {}", report_path.display()))?;
    }

    if report.has_failures() {
        for (path, error) in report.errors() {
            eprintln!("{}: {}", path, error);
        }
        bail!("{} file(s) failed to convert", report.failed);
    }
    Ok(())
}
