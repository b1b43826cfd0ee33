//! Template collection loaded once at startup.

use std::path::Path;

use tracing::{debug, info, warn};

use super::{Template, TemplateSpec};
use crate::error::{Result, TemplateError};
use crate::models::config::TemplateConfig;

/// Templates shipped with the library.
static BUILTIN_TEMPLATES: &str = include_str!("../../templates/builtin.json");

/// Ordered, read-only collection of compiled templates.
///
/// Declaration order is preserved; it breaks priority ties during matching.
/// Share it between threads behind an `Arc`.
#[derive(Debug, Clone, Default)]
pub struct TemplateStore {
    templates: Vec<Template>,
}

impl TemplateStore {
    /// Compile templates from their specs, in declaration order.
    pub fn new(specs: &[TemplateSpec]) -> std::result::Result<Self, TemplateError> {
        let mut store = Self::default();
        for spec in specs {
            store.push(Template::compile(spec)?)?;
        }
        Ok(store)
    }

    /// Parse and compile a JSON array of templates.
    pub fn from_json(json: &str) -> Result<Self> {
        let specs: Vec<TemplateSpec> = serde_json::from_str(json)?;
        Ok(Self::new(&specs)?)
    }

    /// Load templates from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let store = Self::from_json(&content)?;
        info!("Loaded {} templates from {}", store.len(), path.display());
        Ok(store)
    }

    /// Templates embedded in the library.
    pub fn builtin() -> Result<Self> {
        Self::from_json(BUILTIN_TEMPLATES)
    }

    /// Build the store described by a configuration: built-ins first, then
    /// each configured file in order.
    pub fn from_config(config: &TemplateConfig) -> Result<Self> {
        let mut store = if config.use_builtin {
            Self::builtin()?
        } else {
            Self::default()
        };
        for path in &config.paths {
            let loaded = Self::from_file(path)?;
            if loaded.is_empty() {
                warn!("Template file {} defines no templates", path.display());
            }
            store.extend(loaded)?;
        }
        debug!("Template store ready with {} templates", store.len());
        Ok(store)
    }

    /// Append another store's templates after this one's.
    pub fn extend(&mut self, other: TemplateStore) -> std::result::Result<(), TemplateError> {
        for template in other.templates {
            self.push(template)?;
        }
        Ok(())
    }

    fn push(&mut self, template: Template) -> std::result::Result<(), TemplateError> {
        if self.get(template.issuer_id()).is_some() {
            return Err(TemplateError::DuplicateIssuer(template.issuer_id().to_string()));
        }
        self.templates.push(template);
        Ok(())
    }

    /// Templates in declaration order.
    pub fn templates(&self) -> &[Template] {
        &self.templates
    }

    pub fn get(&self, issuer_id: &str) -> Option<&Template> {
        self.templates.iter().find(|t| t.issuer_id() == issuer_id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
