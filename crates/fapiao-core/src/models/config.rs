//! Configuration structures for the extraction pipeline.

use std::path::{Path, PathBuf};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{FapiaoError, Result};

/// Main configuration for the fapiao pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FapiaoConfig {
    /// Field resolution configuration.
    pub extraction: ExtractionConfig,

    /// Template loading configuration.
    pub templates: TemplateConfig,
}

/// Field resolution configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Allowed difference between `pretax + tax` and `total`.
    pub amount_tolerance: Decimal,

    /// Minimum length of a plausible tax ID.
    pub tax_id_min_len: usize,

    /// Maximum length of a plausible tax ID.
    pub tax_id_max_len: usize,

    /// Fill in a missing total as `pretax + tax` (flagged as derived).
    pub derive_missing_total: bool,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            // Observed rounding on printed VAT invoices.
            amount_tolerance: Decimal::new(2, 2),
            tax_id_min_len: 15,
            tax_id_max_len: 20,
            derive_missing_total: true,
        }
    }
}

/// Template loading configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TemplateConfig {
    /// Load the templates embedded in the library.
    pub use_builtin: bool,

    /// Additional template files (JSON), appended after the built-ins.
    pub paths: Vec<PathBuf>,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            use_builtin: true,
            paths: Vec::new(),
        }
    }
}

impl FapiaoConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.check()?;
        Ok(config)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Reject settings the resolver cannot work with.
    pub fn check(&self) -> Result<()> {
        let extraction = &self.extraction;
        if extraction.amount_tolerance.is_sign_negative() {
            return Err(FapiaoError::Config(
                "extraction.amount_tolerance must not be negative".to_string(),
            ));
        }
        if extraction.tax_id_min_len == 0 || extraction.tax_id_min_len > extraction.tax_id_max_len {
            return Err(FapiaoError::Config(format!(
                "invalid tax ID length bounds {}..={}",
                extraction.tax_id_min_len, extraction.tax_id_max_len
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_default_tolerance() {
        let config = FapiaoConfig::default();
        assert_eq!(
            config.extraction.amount_tolerance,
            Decimal::from_str("0.02").unwrap()
        );
        assert!(config.templates.use_builtin);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: FapiaoConfig =
            serde_json::from_str(r#"{"extraction": {"tax_id_min_len": 18}}"#).unwrap();
        assert_eq!(config.extraction.tax_id_min_len, 18);
        assert_eq!(config.extraction.tax_id_max_len, 20);
        assert!(config.extraction.derive_missing_total);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = FapiaoConfig::default();
        config.extraction.derive_missing_total = false;
        config.save(&path).unwrap();

        let loaded = FapiaoConfig::from_file(&path).unwrap();
        assert!(!loaded.extraction.derive_missing_total);
    }

    #[test]
    fn test_check_rejects_bad_bounds() {
        let mut config = FapiaoConfig::default();
        config.extraction.tax_id_min_len = 21;
        assert!(config.check().is_err());
    }
}
