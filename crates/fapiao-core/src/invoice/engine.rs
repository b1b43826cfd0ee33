//! End-to-end pipeline: normalize, match, capture, resolve.

use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info};

use super::extractor::extract_fields;
use super::matcher::match_template;
use super::resolver::Resolver;
use super::rules::{PartyResolver, PositionalPartyResolver};
use crate::models::config::ExtractionConfig;
use crate::models::result::ExtractionResult;
use crate::template::TemplateStore;
use crate::text::normalize;

/// Extraction pipeline over a shared template store.
///
/// Holds no per-document state; one engine can serve any number of threads.
#[derive(Clone)]
pub struct ExtractionEngine {
    store: Arc<TemplateStore>,
    config: ExtractionConfig,
    parties: Arc<dyn PartyResolver>,
}

impl ExtractionEngine {
    /// Create an engine with the default configuration and the positional
    /// buyer/seller strategy.
    pub fn new(store: Arc<TemplateStore>) -> Self {
        Self {
            store,
            config: ExtractionConfig::default(),
            parties: Arc::new(PositionalPartyResolver),
        }
    }

    /// Set the resolution configuration.
    pub fn with_config(mut self, config: ExtractionConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the buyer/seller assignment strategy.
    pub fn with_party_resolver(mut self, parties: Arc<dyn PartyResolver>) -> Self {
        self.parties = parties;
        self
    }

    pub fn store(&self) -> &TemplateStore {
        &self.store
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract fields from raw document text.
    ///
    /// Never fails: an unrecognized document yields a result without a
    /// matched template, and data problems are reported as warnings.
    pub fn extract(&self, raw_text: &str) -> ExtractionResult {
        let start = Instant::now();
        let raw_text_length = raw_text.chars().count();

        let text = normalize(raw_text);
        debug!("Normalized {} characters", raw_text_length);

        let Some(template) = match_template(&text, self.store.templates()) else {
            info!("No template matched document of {} characters", raw_text_length);
            return ExtractionResult::unrecognized(raw_text_length);
        };

        let captures = extract_fields(&text, template);
        let mut result = Resolver::new(&self.config, self.parties.as_ref()).resolve(&captures, template, &text);
        result.raw_text_length = raw_text_length;

        info!(
            "Extracted {} fields as {} ({} warnings) in {:?}",
            result.fields.len(),
            template.issuer_id(),
            result.warnings.len(),
            start.elapsed()
        );

        result
    }

    /// Extract each document independently, preserving input order.
    pub fn extract_batch<S: AsRef<str>>(&self, texts: &[S]) -> Vec<ExtractionResult> {
        texts.iter().map(|text| self.extract(text.as_ref())).collect()
    }
}

impl std::fmt::Debug for ExtractionEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtractionEngine")
            .field("templates", &self.store.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
