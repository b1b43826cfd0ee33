//! Core library for Chinese invoice field extraction.
//!
//! This crate provides:
//! - Text normalization for OCR/PDF text (look-alike characters, label spacing)
//! - Template store with keyword triggers and prioritized regex field rules
//! - Template matching, field capture and field resolution
//! - Typed extraction results for VAT invoices and railway e-tickets

pub mod error;
pub mod invoice;
pub mod models;
pub mod template;
pub mod text;

pub use error::{FapiaoError, Result, TemplateError};
pub use invoice::{
    ExtractionEngine, PartyResolver, PositionalPartyResolver, extract_fields, match_template,
    resolve,
};
pub use models::config::{ExtractionConfig, FapiaoConfig, TemplateConfig};
pub use models::result::{ExtractionResult, FieldValue, ResolvedField, Warning, WarningKind};
pub use template::{FieldKind, FieldRule, Template, TemplateSpec, TemplateStore};
pub use text::normalize;
