//! Subcommands.

pub mod batch;
pub mod config;
pub mod process;
pub mod templates;

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::debug;

use fapiao_core::{ExtractionEngine, FapiaoConfig, TemplateStore};

/// Load the configuration from `--config`, else the default location, else
/// built-in defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<FapiaoConfig> {
    if let Some(path) = config_path {
        return FapiaoConfig::from_file(Path::new(path))
            .with_context(|| format!("Failed to load config from {}", path));
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        debug!("Using config at {}", default_path.display());
        return FapiaoConfig::from_file(&default_path)
            .with_context(|| format!("Failed to load config from {}", default_path.display()));
    }

    Ok(FapiaoConfig::default())
}

/// Template store described by the configuration.
pub fn load_store(config: &FapiaoConfig) -> anyhow::Result<TemplateStore> {
    TemplateStore::from_config(&config.templates).context("Failed to load templates")
}

/// Build an extraction engine from the configuration.
pub fn build_engine(config: &FapiaoConfig) -> anyhow::Result<ExtractionEngine> {
    let store = load_store(config)?;
    if store.is_empty() {
        anyhow::bail!("No templates loaded; enable built-in templates or add template files");
    }
    Ok(ExtractionEngine::new(Arc::new(store)).with_config(config.extraction.clone()))
}
