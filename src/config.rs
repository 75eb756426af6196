use std::path::Path;

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

/// Environment variable naming an optional JSON configuration file.
pub const CONFIG_ENV: &str = "FAIR_LENDING_CONFIG";

// ---------------------------------------------------------------------------
// Analysis configuration
// ---------------------------------------------------------------------------

/// Knobs shared by the engine, the chart builder and the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Outcome category counted as an approval in underwriting reports.
    pub approved_label: String,
    /// Threshold below which a p-value is reported as significant.
    pub significance_level: f64,
    /// Apply Yates' continuity correction to 2×2 contingency tables.
    pub yates_correction: bool,
    /// Decimal places for summary tables and chart value labels.
    pub decimals: usize,
    /// Category labels longer than this are flagged for wrapping.
    pub label_wrap_width: usize,
    /// Columns offered as row filters (loan type, purpose).
    pub filter_columns: Vec<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            approved_label: "Approved".to_string(),
            significance_level: 0.05,
            yates_correction: true,
            decimals: 4,
            label_wrap_width: 12,
            filter_columns: vec!["LoanType".to_string(), "Purpose".to_string()],
        }
    }
}

impl AnalysisConfig {
    /// Read a JSON config file; absent fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: AnalysisConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from the file named by `FAIR_LENDING_CONFIG`, or use defaults.
    pub fn from_env() -> Result<Self> {
        match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(Path::new(&path)),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.significance_level > 0.0 && self.significance_level < 1.0,
            "significance_level must be in (0, 1), got {}",
            self.significance_level
        );
        ensure!(
            !self.approved_label.trim().is_empty(),
            "approved_label must not be empty"
        );
        Ok(())
    }
}
