//! Command-line driver: resolve the configuration, then read, aggregate and write.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use crate::aggregate::aggregate;
use crate::config::PivotConfig;
use crate::loader::load_table;
use crate::report::write_workbook;

#[derive(Debug, Parser)]
#[command(name = "autopivot")]
#[command(version, about = "Weekly validity pivot for AutoComplete workbooks", long_about = None)]
pub struct Cli {
    /// Input workbook (defaults to AP_08082025.xlsx)
    #[arg(value_name = "INPUT")]
    pub input: Option<PathBuf>,

    /// Output workbook (defaults to <input stem>_with_pivot.xlsx)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// TOML config file (defaults to ./autopivot.toml when present)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Sheet holding the raw records
    #[arg(long)]
    pub sheet: Option<String>,

    /// Name of the summary sheet
    #[arg(long)]
    pub pivot_sheet: Option<String>,

    /// segment3 value to report on
    #[arg(long)]
    pub category: Option<String>,

    /// segment4 value counted as valid
    #[arg(long)]
    pub valid_flag: Option<String>,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Layers the command-line flags over a config loaded from file or defaults.
    pub fn into_config(self) -> Result<PivotConfig> {
        let mut config = PivotConfig::discover(self.config.as_deref())?;
        if let Some(input) = self.input {
            config.input_path = input;
        }
        if let Some(output) = self.output {
            config.output_path = Some(output);
        }
        if let Some(sheet) = self.sheet {
            config.sheet_name = sheet;
        }
        if let Some(pivot_sheet) = self.pivot_sheet {
            config.pivot_sheet_name = pivot_sheet;
        }
        if let Some(category) = self.category {
            config.category_filter = category;
        }
        if let Some(valid_flag) = self.valid_flag {
            config.valid_flag = valid_flag;
        }
        Ok(config)
    }
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // A subscriber may already be installed when running inside tests.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

/// Runs the whole pipeline for `config` and returns the path written.
///
/// Fails before writing anything when the source sheet lacks a required column.
pub fn process_workbook(config: &PivotConfig) -> Result<PathBuf> {
    let table = load_table(&config.input_path, &config.sheet_name)?;
    let rows = table.records();
    let weeks = aggregate(&rows, &config.category_filter, &config.valid_flag);

    let output_path = config.resolved_output_path();
    write_workbook(&output_path, &table, &weeks, config)?;
    Ok(output_path)
}

fn display_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

pub fn run(args: impl IntoIterator<Item = OsString>) -> Result<()> {
    let cli = Cli::parse_from(args);
    init_tracing(cli.verbose);

    let config = cli.into_config()?;
    tracing::debug!(?config, "resolved configuration");

    let out = process_workbook(&config)?;
    println!("Done. Wrote: {}", display_path(&out).display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("autopivot").chain(args.iter().copied()))
    }

    #[test]
    fn flags_override_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pivot.toml");
        std::fs::write(&path, "category_filter = \"From File\"\nvalid_flag = \"Yes\"\n").unwrap();

        let config = cli(&[
            "weekly.xlsx",
            "--config",
            path.to_str().unwrap(),
            "--valid-flag",
            "Valid",
            "-o",
            "out.xlsx",
        ])
        .into_config()
        .unwrap();

        assert_eq!(config.input_path, PathBuf::from("weekly.xlsx"));
        assert_eq!(config.output_path, Some(PathBuf::from("out.xlsx")));
        assert_eq!(config.category_filter, "From File");
        assert_eq!(config.valid_flag, "Valid");
        assert_eq!(config.sheet_name, "AutoComplete");
    }

    #[test]
    fn verbosity_counts() {
        assert_eq!(cli(&["-vv"]).verbose, 2);
        assert_eq!(cli(&[]).verbose, 0);
        assert!(cli(&[]).input.is_none());
    }
}
