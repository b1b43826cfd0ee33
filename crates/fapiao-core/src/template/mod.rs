//! Extraction templates: keyword triggers plus prioritized field rules.

pub mod fields;
mod store;

pub use store::TemplateStore;

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::TemplateError;

/// Post-processing hint for a captured field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Trimmed string.
    #[default]
    Text,
    /// `YYYY年MM月DD日` or ISO date.
    Date,
    /// `HH:MM` time of day.
    Time,
    /// Decimal amount.
    Amount,
    /// Amount in Chinese uppercase numerals.
    AmountWords,
    /// Taxpayer identification number.
    TaxId,
}

/// Serialized form of a field rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldRuleSpec {
    /// Patterns tried in order; the first one that matches is used.
    pub patterns: Vec<String>,

    /// Capture group `i + 1` of each match feeds `targets[i]`.
    #[serde(default)]
    pub combine: bool,

    /// Output fields of a combine-mode rule.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub targets: Vec<String>,

    #[serde(default)]
    pub kind: FieldKind,

    /// Warn when none of the rule's fields resolve.
    #[serde(default)]
    pub required: bool,
}

/// Serialized form of a template.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateSpec {
    pub issuer_id: String,
    pub keywords: Vec<String>,
    #[serde(default)]
    pub priority: i32,
    pub fields: BTreeMap<String, FieldRuleSpec>,
}

/// A compiled field rule.
#[derive(Debug, Clone)]
pub struct FieldRule {
    name: String,
    patterns: Vec<Regex>,
    targets: Vec<String>,
    combine: bool,
    kind: FieldKind,
    required: bool,
}

impl FieldRule {
    fn compile(template: &str, name: &str, spec: &FieldRuleSpec) -> Result<Self, TemplateError> {
        if spec.patterns.is_empty() {
            return Err(TemplateError::NoPatterns {
                template: template.to_string(),
                field: name.to_string(),
            });
        }

        let targets = if spec.combine {
            if spec.targets.is_empty() {
                return Err(TemplateError::MissingTargets {
                    template: template.to_string(),
                    field: name.to_string(),
                });
            }
            spec.targets.clone()
        } else {
            vec![name.to_string()]
        };

        if spec.required {
            if let Some(target) = targets.iter().find(|t| fields::is_candidate(t)) {
                return Err(TemplateError::RequiredCandidate {
                    template: template.to_string(),
                    field: target.clone(),
                });
            }
        }

        let mut patterns = Vec::with_capacity(spec.patterns.len());
        for pattern in &spec.patterns {
            let regex = Regex::new(pattern).map_err(|source| TemplateError::InvalidPattern {
                template: template.to_string(),
                field: name.to_string(),
                pattern: pattern.clone(),
                source,
            })?;

            // Group 0 is the whole match.
            let groups = regex.captures_len() - 1;
            if spec.combine && groups < targets.len() {
                return Err(TemplateError::GroupCount {
                    template: template.to_string(),
                    field: name.to_string(),
                    pattern: pattern.clone(),
                    groups,
                    needed: targets.len(),
                });
            }
            patterns.push(regex);
        }

        Ok(Self {
            name: name.to_string(),
            patterns,
            targets,
            combine: spec.combine,
            kind: spec.kind,
            required: spec.required,
        })
    }

    /// Rule name as declared in the template.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Patterns in the order they are tried.
    pub fn patterns(&self) -> &[Regex] {
        &self.patterns
    }

    /// Fields this rule writes: its own name, or the combine targets.
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    pub fn is_combine(&self) -> bool {
        self.combine
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }
}

/// A compiled extraction template. Immutable once built.
#[derive(Debug, Clone)]
pub struct Template {
    issuer_id: String,
    keywords: Vec<String>,
    priority: i32,
    rules: Vec<FieldRule>,
}

impl Template {
    /// Compile a template, validating every pattern.
    pub fn compile(spec: &TemplateSpec) -> Result<Self, TemplateError> {
        if spec.issuer_id.trim().is_empty() {
            return Err(TemplateError::EmptyIssuer);
        }

        let mut keywords: Vec<String> = Vec::with_capacity(spec.keywords.len());
        for keyword in &spec.keywords {
            if !keyword.is_empty() && !keywords.contains(keyword) {
                keywords.push(keyword.clone());
            }
        }

        let rules = spec
            .fields
            .iter()
            .map(|(name, rule)| FieldRule::compile(&spec.issuer_id, name, rule))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            issuer_id: spec.issuer_id.clone(),
            keywords,
            priority: spec.priority,
            rules,
        })
    }

    pub fn issuer_id(&self) -> &str {
        &self.issuer_id
    }

    pub fn keywords(&self) -> &[String] {
        &self.keywords
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    pub fn rules(&self) -> &[FieldRule] {
        &self.rules
    }

    /// True when every keyword is a literal substring of `text`.
    pub fn matches(&self, text: &str) -> bool {
        self.keywords.iter().all(|k| text.contains(k.as_str()))
    }

    /// Kind of the first rule that writes `field`.
    pub fn kind_of(&self, field: &str) -> Option<FieldKind> {
        self.rules
            .iter()
            .find(|r| r.targets.iter().any(|t| t == field))
            .map(|r| r.kind)
    }

    /// Output fields the template marks as required, in rule order.
    pub fn required_fields(&self) -> Vec<&str> {
        let mut required = Vec::new();
        for rule in self.rules.iter().filter(|r| r.required) {
            for target in &rule.targets {
                if !required.contains(&target.as_str()) {
                    required.push(target.as_str());
                }
            }
        }
        required
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(patterns: &[&str]) -> FieldRuleSpec {
        FieldRuleSpec {
            patterns: patterns.iter().map(|p| p.to_string()).collect(),
            combine: false,
            targets: Vec::new(),
            kind: FieldKind::Text,
            required: false,
        }
    }

    fn spec(fields: Vec<(&str, FieldRuleSpec)>) -> TemplateSpec {
        TemplateSpec {
            issuer_id: "test".to_string(),
            keywords: vec!["发票".to_string(), "发票".to_string(), String::new()],
            priority: 1,
            fields: fields
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        }
    }

    #[test]
    fn test_keywords_deduplicated() {
        let template = Template::compile(&spec(vec![("n", rule(&["(\\d+)"]))])).unwrap();
        assert_eq!(template.keywords(), ["发票".to_string()]);
        assert!(template.matches("电子发票"));
        assert!(!template.matches("客票"));
    }

    #[test]
    fn test_invalid_regex_rejected() {
        let err = Template::compile(&spec(vec![("n", rule(&["(unclosed"]))])).unwrap_err();
        assert!(matches!(err, TemplateError::InvalidPattern { .. }));
        assert!(err.to_string().contains("test.n"));
    }

    #[test]
    fn test_empty_patterns_rejected() {
        let err = Template::compile(&spec(vec![("n", rule(&[]))])).unwrap_err();
        assert!(matches!(err, TemplateError::NoPatterns { .. }));
    }

    #[test]
    fn test_combine_needs_enough_groups() {
        let mut combine = rule(&["a(\\d)"]);
        combine.combine = true;
        combine.targets = vec!["x".to_string(), "y".to_string()];
        let err = Template::compile(&spec(vec![("xy", combine)])).unwrap_err();
        assert!(matches!(
            err,
            TemplateError::GroupCount { groups: 1, needed: 2, .. }
        ));
    }

    #[test]
    fn test_combine_needs_targets() {
        let mut combine = rule(&["(a)(b)"]);
        combine.combine = true;
        let err = Template::compile(&spec(vec![("xy", combine)])).unwrap_err();
        assert!(matches!(err, TemplateError::MissingTargets { .. }));
    }

    #[test]
    fn test_candidate_fields_cannot_be_required() {
        let mut station = rule(&["(\\S+站)"]);
        station.required = true;
        let err = Template::compile(&spec(vec![(fields::STATION, station)])).unwrap_err();
        assert!(matches!(err, TemplateError::RequiredCandidate { .. }));
    }

    #[test]
    fn test_kind_and_required_lookup() {
        let mut amounts = rule(&["(\\d+)\\s(\\d+)"]);
        amounts.combine = true;
        amounts.kind = FieldKind::Amount;
        amounts.required = true;
        amounts.targets = vec!["pretax_amount".to_string(), "tax_amount".to_string()];

        let template = Template::compile(&spec(vec![("amounts", amounts)])).unwrap();
        assert_eq!(template.kind_of("tax_amount"), Some(FieldKind::Amount));
        assert_eq!(template.kind_of("amounts"), None);
        assert_eq!(template.required_fields(), vec!["pretax_amount", "tax_amount"]);
    }
}
