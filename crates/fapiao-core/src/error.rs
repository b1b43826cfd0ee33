//! Error types for the fapiao-core library.
//!
//! Only configuration problems are errors. Data-quality problems found while
//! extracting a document are reported as warnings on the result instead.

use thiserror::Error;

/// Main error type for the fapiao library.
#[derive(Error, Debug)]
pub enum FapiaoError {
    /// Template collection could not be loaded.
    #[error("template error: {0}")]
    Template(#[from] TemplateError),

    /// JSON (de)serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Errors raised while compiling a template collection.
#[derive(Error, Debug)]
pub enum TemplateError {
    /// A field pattern is not a valid regular expression.
    #[error("invalid pattern for {template}.{field} ({pattern:?}): {source}")]
    InvalidPattern {
        template: String,
        field: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A field rule declares no patterns.
    #[error("field {template}.{field} has no patterns")]
    NoPatterns { template: String, field: String },

    /// Two templates share the same issuer id.
    #[error("duplicate template issuer id: {0}")]
    DuplicateIssuer(String),

    /// A template has an empty issuer id.
    #[error("template issuer id must not be empty")]
    EmptyIssuer,

    /// Combine-mode rule has no target fields.
    #[error("combine field {template}.{field} declares no targets")]
    MissingTargets { template: String, field: String },

    /// Candidate-only fields never appear in a result, so they cannot be required.
    #[error("candidate field {template}.{field} cannot be required")]
    RequiredCandidate { template: String, field: String },

    /// A pattern has fewer capture groups than the rule needs.
    #[error("pattern {pattern:?} of {template}.{field} has {groups} capture groups, needs {needed}")]
    GroupCount {
        template: String,
        field: String,
        pattern: String,
        groups: usize,
        needed: usize,
    },
}

/// Result type for the fapiao library.
pub type Result<T> = std::result::Result<T, FapiaoError>;
