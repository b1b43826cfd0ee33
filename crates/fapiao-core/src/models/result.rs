//! Extraction result model.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Outcome of running the pipeline on one document.
///
/// A document that matched no template is still a result: `matched_template`
/// is `None` and `fields` is empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    /// Issuer id of the template that matched.
    pub matched_template: Option<String>,

    /// Resolved fields keyed by field name.
    pub fields: BTreeMap<String, ResolvedField>,

    /// Non-fatal issues in the order they were found.
    pub warnings: Vec<Warning>,

    /// Required fields of the matched template that could not be resolved.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,

    /// Length of the raw input in characters.
    pub raw_text_length: usize,
}

impl ExtractionResult {
    /// Result for a document no template recognized.
    pub fn unrecognized(raw_text_length: usize) -> Self {
        Self {
            matched_template: None,
            fields: BTreeMap::new(),
            warnings: Vec::new(),
            missing_fields: Vec::new(),
            raw_text_length,
        }
    }

    /// Whether a template matched the document.
    pub fn is_recognized(&self) -> bool {
        self.matched_template.is_some()
    }

    /// Look up a resolved field.
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name).map(|f| &f.value)
    }

    /// Text value of a field, if it resolved to text or a tax ID.
    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            FieldValue::Text(s) | FieldValue::TaxId(s) => Some(s),
            _ => None,
        }
    }

    /// Amount value of a field.
    pub fn amount(&self, name: &str) -> Option<Decimal> {
        match self.get(name)? {
            FieldValue::Amount(d) => Some(*d),
            _ => None,
        }
    }

    /// Date value of a field.
    pub fn date(&self, name: &str) -> Option<NaiveDate> {
        match self.get(name)? {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Whether any warning of the given kind was recorded.
    pub fn has_warning(&self, kind: WarningKind) -> bool {
        self.warnings.iter().any(|w| w.kind == kind)
    }

    /// Mean confidence over resolved fields, 0 when nothing resolved.
    pub fn confidence(&self) -> f32 {
        if self.fields.is_empty() {
            return 0.0;
        }
        let total: f32 = self.fields.values().map(|f| f.confidence).sum();
        total / self.fields.len() as f32
    }
}

/// A field after resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedField {
    /// Typed value.
    pub value: FieldValue,
    /// Confidence score (0.0 - 1.0).
    pub confidence: f32,
    /// Captured text the value was derived from.
    pub source: String,
    /// Byte offset of the capture in the normalized text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub offset: Option<usize>,
    /// False when the value was kept despite failing a consistency check.
    pub reliable: bool,
}

impl ResolvedField {
    pub fn new(value: FieldValue, confidence: f32, source: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            source: source.into(),
            offset: None,
            reliable: true,
        }
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Mark the value as retained but untrusted.
    pub fn unreliable(mut self) -> Self {
        self.reliable = false;
        self.confidence = self.confidence.min(0.3);
        self
    }
}

/// Typed field value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Date(NaiveDate),
    Time(NaiveTime),
    Amount(Decimal),
    TaxId(String),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) | Self::TaxId(s) => f.write_str(s),
            Self::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Self::Time(t) => write!(f, "{}", t.format("%H:%M")),
            Self::Amount(a) => write!(f, "{:.2}", a),
        }
    }
}

/// Category of a non-fatal extraction issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarningKind {
    /// A capture could not be converted to its typed form.
    ParseFailure,
    /// A positional heuristic had to pick between candidates.
    Ambiguous,
    /// Pretax + tax does not add up to total.
    ConsistencyViolation,
    /// Several candidates existed and one was selected.
    MultipleCandidates,
    /// A required field was not resolved.
    MissingRequired,
    /// A value failed a plausibility check and was dropped.
    Implausible,
    /// A value was computed rather than read from the document.
    Derived,
    /// Two representations of the same value disagree.
    CrossCheck,
}

impl WarningKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ParseFailure => "parse-failure",
            Self::Ambiguous => "ambiguous",
            Self::ConsistencyViolation => "consistency-violation",
            Self::MultipleCandidates => "multiple-candidates",
            Self::MissingRequired => "missing-required",
            Self::Implausible => "implausible",
            Self::Derived => "derived",
            Self::CrossCheck => "cross-check",
        }
    }
}

/// A non-fatal issue found while extracting a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Warning {
    pub kind: WarningKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub message: String,
}

impl Warning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            field: None,
            message: message.into(),
        }
    }

    pub fn for_field(kind: WarningKind, field: &str, message: impl Into<String>) -> Self {
        Self {
            kind,
            field: Some(field.to_string()),
            message: message.into(),
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "[{}] {}: {}", self.kind.as_str(), field, self.message),
            None => write!(f, "[{}] {}", self.kind.as_str(), self.message),
        }
    }
}
