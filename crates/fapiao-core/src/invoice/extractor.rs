//! Field capture: runs a template's rules over normalized text.

use std::collections::BTreeMap;

use serde::Serialize;
use tracing::{debug, trace};

use crate::template::{FieldRule, Template};

/// One captured value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Capture {
    /// Captured text, untrimmed.
    pub value: String,
    /// Byte offset of the capture in the normalized text.
    pub offset: usize,
    /// Index of the pattern that produced it within its rule.
    pub pattern_index: usize,
    /// `(rule index, match index)` shared by the captures of one
    /// combine-mode match.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_match: Option<(usize, usize)>,
}

impl Capture {
    /// Confidence of a value read directly: the primary pattern scores
    /// higher than a fallback.
    pub fn confidence(&self) -> f32 {
        if self.pattern_index == 0 { 0.95 } else { 0.85 }
    }

    /// Copy with surrounding whitespace removed and the offset moved to
    /// match. `None` when nothing but whitespace was captured.
    pub fn trimmed(&self) -> Option<Capture> {
        let value = self.value.trim();
        if value.is_empty() {
            return None;
        }
        let lead = self.value.len() - self.value.trim_start().len();
        Some(Capture {
            value: value.to_string(),
            offset: self.offset + lead,
            ..self.clone()
        })
    }
}

/// Captures per output field, every match in document order.
pub type RawCaptures = BTreeMap<String, Vec<Capture>>;

/// Run every rule of `template` over `text`.
///
/// Every output field of the template gets an entry, empty when nothing
/// matched.
pub fn extract_fields(text: &str, template: &Template) -> RawCaptures {
    let mut captures = RawCaptures::new();

    for (rule_index, rule) in template.rules().iter().enumerate() {
        for target in rule.targets() {
            captures.entry(target.clone()).or_default();
        }
        apply_rule(text, rule_index, rule, &mut captures);
    }

    debug!(
        "Captured {} values for {} fields ({})",
        captures.values().map(Vec::len).sum::<usize>(),
        captures.len(),
        template.issuer_id()
    );

    captures
}

fn apply_rule(text: &str, rule_index: usize, rule: &FieldRule, out: &mut RawCaptures) {
    for (pattern_index, regex) in rule.patterns().iter().enumerate() {
        let mut found = false;

        for (match_index, caps) in regex.captures_iter(text).enumerate() {
            found = true;

            if rule.is_combine() {
                for (i, target) in rule.targets().iter().enumerate() {
                    // Optional groups may not participate in a match.
                    let Some(group) = caps.get(i + 1) else { continue };
                    push(out, target, Capture {
                        value: group.as_str().to_string(),
                        offset: group.start(),
                        pattern_index,
                        group_match: Some((rule_index, match_index)),
                    });
                }
            } else {
                let Some(group) = caps.get(1).or_else(|| caps.get(0)) else { continue };
                push(out, rule.name(), Capture {
                    value: group.as_str().to_string(),
                    offset: group.start(),
                    pattern_index,
                    group_match: None,
                });
            }
        }

        if found {
            trace!("{}: pattern {} matched", rule.name(), pattern_index);
            return;
        }
    }

    trace!("{}: no pattern matched", rule.name());
}

fn push(out: &mut RawCaptures, field: &str, capture: Capture) {
    out.entry(field.to_string()).or_default().push(capture);
}
