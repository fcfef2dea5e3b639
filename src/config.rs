use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Config file picked up from the working directory when `--config` is not given.
pub const DEFAULT_CONFIG_FILE: &str = "autopivot.toml";

/// Everything one run needs to know: where to read, where to write, what to count.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PivotConfig {
    /// Workbook holding the raw records.
    pub input_path: PathBuf,
    /// Output workbook; `<input stem>_with_pivot.xlsx` beside the input when unset.
    pub output_path: Option<PathBuf>,
    /// Sheet holding the raw records, also the name of the passthrough sheet.
    pub sheet_name: String,
    /// Name of the summary sheet.
    pub pivot_sheet_name: String,
    /// `segment3` value selecting the rows of interest.
    pub category_filter: String,
    /// `segment4` value counted as valid.
    pub valid_flag: String,
}

impl Default for PivotConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("AP_08082025.xlsx"),
            output_path: None,
            sheet_name: "AutoComplete".to_string(),
            pivot_sheet_name: "Pivot".to_string(),
            category_filter: "Product Not Appropriate".to_string(),
            valid_flag: "Valid".to_string(),
        }
    }
}

impl PivotConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid configuration")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("cannot read config file: {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in config file: {}", path.display()))
    }

    /// Explicit file if given, else `autopivot.toml` in the working directory, else defaults.
    pub fn discover(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let local = Path::new(DEFAULT_CONFIG_FILE);
        if local.exists() {
            tracing::debug!(path = %local.display(), "loading local config");
            Self::from_file(local)
        } else {
            Ok(Self::default())
        }
    }

    pub fn resolved_output_path(&self) -> PathBuf {
        if let Some(path) = &self.output_path {
            return path.clone();
        }
        let stem = self
            .input_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "output".to_string());
        self.input_path.with_file_name(format!("{stem}_with_pivot.xlsx"))
    }

    pub fn report_title(&self) -> String {
        format!("Text Rationale Validity of {}", self.category_filter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_weekly_workbook() {
        let config = PivotConfig::default();
        assert_eq!(config.category_filter, "Product Not Appropriate");
        assert_eq!(config.valid_flag, "Valid");
        assert_eq!(config.sheet_name, "AutoComplete");
        assert_eq!(
            config.resolved_output_path(),
            PathBuf::from("AP_08082025_with_pivot.xlsx")
        );
        assert_eq!(
            config.report_title(),
            "Text Rationale Validity of Product Not Appropriate"
        );
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = PivotConfig::from_toml_str(
            r#"
            input_path = "weekly/AP_08152025.xlsx"
            valid_flag = "OK"
            "#,
        )
        .unwrap();
        assert_eq!(config.valid_flag, "OK");
        assert_eq!(config.category_filter, "Product Not Appropriate");
        assert_eq!(
            config.resolved_output_path(),
            PathBuf::from("weekly/AP_08152025_with_pivot.xlsx")
        );
    }

    #[test]
    fn explicit_output_wins() {
        let config = PivotConfig {
            output_path: Some(PathBuf::from("out/report.xlsx")),
            ..PivotConfig::default()
        };
        assert_eq!(config.resolved_output_path(), PathBuf::from("out/report.xlsx"));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(PivotConfig::from_toml_str("categroy_filter = \"x\"").is_err());
    }

    #[test]
    fn config_file_is_read() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pivot.toml");
        fs::write(&path, "sheet_name = \"Raw\"\npivot_sheet_name = \"Summary\"\n").unwrap();
        let config = PivotConfig::discover(Some(&path)).unwrap();
        assert_eq!(config.sheet_name, "Raw");
        assert_eq!(config.pivot_sheet_name, "Summary");

        let missing = dir.path().join("nope.toml");
        assert!(PivotConfig::discover(Some(&missing)).is_err());
    }
}
