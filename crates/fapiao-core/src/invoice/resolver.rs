//! Field resolution: captures to typed, disambiguated values.
//!
//! Resolution never fails. Values that cannot be parsed, do not add up or
//! had to be guessed are reported as warnings on the result.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tracing::debug;

use super::extractor::{Capture, RawCaptures};
use super::rules::{
    AmountStatus, MAX_AMOUNT_CANDIDATES, PartyCandidates, PartyResolver, PositionalPartyResolver, StationCandidate,
    assign_stations, format_amount, normalize_tax_id, parse_amount, parse_amount_words,
    parse_date, parse_time, reconcile,
};
use crate::models::config::ExtractionConfig;
use crate::models::result::{ExtractionResult, FieldValue, ResolvedField, Warning, WarningKind};
use crate::template::fields::*;
use crate::template::{FieldKind, Template};
use crate::text::line_index;

const POSITIONAL_CONFIDENCE: f32 = 0.6;
const DERIVED_CONFIDENCE: f32 = 0.5;

/// Fields resolved by a dedicated step rather than by kind.
const DEDICATED_FIELDS: &[&str] = &[
    BUYER_NAME,
    SELLER_NAME,
    PARTY_NAME,
    BUYER_TAX_ID,
    SELLER_TAX_ID,
    TAX_ID,
    PRETAX_AMOUNT,
    TAX_AMOUNT,
    TOTAL_AMOUNT,
    TOTAL_AMOUNT_WORDS,
    STATION,
    DEPARTURE_STATION,
    ARRIVAL_STATION,
];

/// Resolve captures with the default configuration and party strategy.
///
/// See [`Resolver::resolve`] for `raw_text_length`.
pub fn resolve(captures: &RawCaptures, template: &Template, text: &str) -> ExtractionResult {
    let config = ExtractionConfig::default();
    Resolver::new(&config, &PositionalPartyResolver).resolve(captures, template, text)
}

/// Turns raw captures into an [`ExtractionResult`].
pub struct Resolver<'a> {
    config: &'a ExtractionConfig,
    parties: &'a dyn PartyResolver,
}

#[derive(Default)]
struct Output {
    fields: BTreeMap<String, ResolvedField>,
    warnings: Vec<Warning>,
}

impl Output {
    fn insert(&mut self, name: &str, field: ResolvedField) {
        self.fields.insert(name.to_string(), field);
    }

    fn warn(&mut self, kind: WarningKind, field: &str, message: impl Into<String>) {
        self.warnings.push(Warning::for_field(kind, field, message));
    }
}

impl<'a> Resolver<'a> {
    pub fn new(config: &'a ExtractionConfig, parties: &'a dyn PartyResolver) -> Self {
        Self { config, parties }
    }

    /// Resolve `captures` taken from `text` with `template`.
    ///
    /// `text` must be the normalized text the captures were taken from;
    /// offsets and line positions refer to it. `raw_text_length` is set to
    /// the character count of `text`; [`ExtractionEngine::extract`]
    /// replaces it with the length of the raw input.
    ///
    /// [`ExtractionEngine::extract`]: crate::invoice::ExtractionEngine::extract
    pub fn resolve(&self, captures: &RawCaptures, template: &Template, text: &str) -> ExtractionResult {
        let mut out = Output::default();

        self.resolve_parties(captures, text, &mut out);
        self.resolve_amounts(captures, &mut out);
        self.resolve_stations(captures, text, &mut out);

        for (name, list) in captures {
            if DEDICATED_FIELDS.contains(&name.as_str()) {
                continue;
            }
            let kind = template.kind_of(name).unwrap_or_default();
            self.resolve_generic(name, kind, list, &mut out);
        }

        let mut missing_fields = Vec::new();
        for field in template.required_fields() {
            if !out.fields.contains_key(field) {
                missing_fields.push(field.to_string());
                out.warn(WarningKind::MissingRequired, field, "required field not found");
            }
        }

        debug!(
            "Resolved {} fields with {} warnings, {} required missing",
            out.fields.len(),
            out.warnings.len(),
            missing_fields.len()
        );

        ExtractionResult {
            matched_template: Some(template.issuer_id().to_string()),
            fields: out.fields,
            warnings: out.warnings,
            missing_fields,
            raw_text_length: text.chars().count(),
        }
    }

    fn resolve_parties(&self, captures: &RawCaptures, text: &str, out: &mut Output) {
        let names = |field: &str| -> Vec<Capture> {
            captures
                .get(field)
                .map(|list| list.iter().filter_map(Capture::trimmed).collect())
                .unwrap_or_default()
        };
        let buyer_names = names(BUYER_NAME);
        let seller_names = names(SELLER_NAME);
        let party_names = names(PARTY_NAME);

        let buyer_tax_ids = self.plausible_tax_ids(captures, BUYER_TAX_ID, out);
        let seller_tax_ids = self.plausible_tax_ids(captures, SELLER_TAX_ID, out);
        let tax_ids = self.plausible_tax_ids(captures, TAX_ID, out);

        let assignment = self.parties.assign(&PartyCandidates {
            text,
            buyer_names: &buyer_names,
            seller_names: &seller_names,
            party_names: &party_names,
            buyer_tax_ids: &buyer_tax_ids,
            seller_tax_ids: &seller_tax_ids,
            tax_ids: &tax_ids,
        });

        let slots = [
            (BUYER_NAME, assignment.buyer_name, false),
            (SELLER_NAME, assignment.seller_name, false),
            (BUYER_TAX_ID, assignment.buyer_tax_id, true),
            (SELLER_TAX_ID, assignment.seller_tax_id, true),
        ];
        for (field, assigned, is_tax_id) in slots {
            let Some(assigned) = assigned else { continue };
            let capture = assigned.capture;
            let value = if is_tax_id {
                FieldValue::TaxId(capture.value.clone())
            } else {
                FieldValue::Text(capture.value.clone())
            };
            out.insert(
                field,
                ResolvedField::new(value, assigned.confidence, capture.value).with_offset(capture.offset),
            );
        }
        out.warnings.extend(assignment.warnings);
    }

    /// Normalized tax IDs of `field`; implausible ones are dropped with a
    /// warning.
    fn plausible_tax_ids(&self, captures: &RawCaptures, field: &str, out: &mut Output) -> Vec<Capture> {
        let mut plausible = Vec::new();
        for capture in captures.get(field).into_iter().flatten() {
            let Some(capture) = capture.trimmed() else { continue };
            match normalize_tax_id(
                &capture.value,
                self.config.tax_id_min_len,
                self.config.tax_id_max_len,
            ) {
                Ok(value) => plausible.push(Capture { value, ..capture }),
                Err(issue) => out.warn(
                    WarningKind::Implausible,
                    field,
                    format!("dropped {:?}: {}", capture.value, issue),
                ),
            }
        }
        plausible
    }

    /// Parsed amounts of `field` in capture order; failures are warned.
    fn amounts(
        &self,
        captures: &RawCaptures,
        field: &str,
        parse: fn(&str) -> Option<Decimal>,
        out: &mut Output,
    ) -> Vec<(Decimal, Capture)> {
        let mut amounts = Vec::new();
        for capture in captures.get(field).into_iter().flatten() {
            let Some(capture) = capture.trimmed() else { continue };
            match parse(&capture.value) {
                Some(amount) => amounts.push((amount, capture)),
                None => out.warn(
                    WarningKind::ParseFailure,
                    field,
                    format!("cannot parse amount {:?}", capture.value),
                ),
            }
        }
        amounts
    }

    fn resolve_amounts(&self, captures: &RawCaptures, out: &mut Output) {
        let pretax = self.amounts(captures, PRETAX_AMOUNT, parse_amount, out);
        let tax = self.amounts(captures, TAX_AMOUNT, parse_amount, out);
        let mut total = self.amounts(captures, TOTAL_AMOUNT, parse_amount, out);
        let words = self.amounts(captures, TOTAL_AMOUNT_WORDS, parse_amount_words, out);

        let words = words.into_iter().next();
        if let Some((amount, capture)) = &words {
            out.insert(TOTAL_AMOUNT_WORDS, read(FieldValue::Amount(*amount), capture));
        }

        let mut total_from_words = false;
        if total.is_empty() {
            if let Some(words) = &words {
                total.push(words.clone());
                total_from_words = true;
                out.warn(
                    WarningKind::Derived,
                    TOTAL_AMOUNT,
                    "taken from the amount in words",
                );
            }
        }

        let chosen = reconcile(
            &values(&pretax),
            &values(&tax),
            &values(&total),
            self.config.amount_tolerance,
        );

        for (field, list) in [(PRETAX_AMOUNT, &pretax), (TAX_AMOUNT, &tax), (TOTAL_AMOUNT, &total)] {
            let mut distinct: Vec<Decimal> = Vec::new();
            for (amount, _) in list.iter() {
                if !distinct.contains(amount) {
                    distinct.push(*amount);
                }
            }
            if distinct.len() > 1 {
                out.warn(
                    WarningKind::MultipleCandidates,
                    field,
                    format!("{} different amounts found", distinct.len()),
                );
            }
            if list.len() > MAX_AMOUNT_CANDIDATES {
                out.warn(
                    WarningKind::MultipleCandidates,
                    field,
                    format!(
                        "only the first {} of {} candidates reconciled",
                        MAX_AMOUNT_CANDIDATES,
                        list.len()
                    ),
                );
            }
        }

        let pretax_pick = pick(&pretax, chosen.pretax);
        let tax_pick = pick(&tax, chosen.tax);
        let total_pick = pick(&total, chosen.total);

        match chosen.status {
            AmountStatus::Inconsistent => {
                if let (Some((p, _)), Some((x, _)), Some((t, _))) = (&pretax_pick, &tax_pick, &total_pick) {
                    out.warn(
                        WarningKind::ConsistencyViolation,
                        TOTAL_AMOUNT,
                        format!(
                            "pretax {} + tax {} does not match total {}",
                            format_amount(*p),
                            format_amount(*x),
                            format_amount(*t)
                        ),
                    );
                }
                if let Some((_, field)) = &pretax_pick {
                    out.insert(PRETAX_AMOUNT, field.clone().unreliable());
                }
                if let Some((_, field)) = &tax_pick {
                    out.insert(TAX_AMOUNT, field.clone().unreliable());
                }
            }
            AmountStatus::Consistent | AmountStatus::Incomplete => {
                if let Some((_, field)) = &pretax_pick {
                    out.insert(PRETAX_AMOUNT, field.clone());
                }
                if let Some((_, field)) = &tax_pick {
                    out.insert(TAX_AMOUNT, field.clone());
                }
            }
        }

        match total_pick {
            Some((amount, field)) => {
                if let (Some((words_amount, _)), false) = (&words, total_from_words) {
                    if *words_amount != amount {
                        out.warn(
                            WarningKind::CrossCheck,
                            TOTAL_AMOUNT,
                            format!(
                                "amount in words {} differs from total {}",
                                format_amount(*words_amount),
                                format_amount(amount)
                            ),
                        );
                    }
                }
                out.insert(TOTAL_AMOUNT, field);
            }
            None if self.config.derive_missing_total => {
                if let (Some((p, _)), Some((x, _))) = (&pretax_pick, &tax_pick) {
                    match p.checked_add(*x) {
                        Some(sum) => {
                            out.insert(
                                TOTAL_AMOUNT,
                                ResolvedField::new(
                                    FieldValue::Amount(sum),
                                    DERIVED_CONFIDENCE,
                                    format!("{} + {}", p, x),
                                ),
                            );
                            out.warn(WarningKind::Derived, TOTAL_AMOUNT, "computed as pretax + tax");
                        }
                        None => out.warn(
                            WarningKind::ParseFailure,
                            TOTAL_AMOUNT,
                            "pretax + tax is out of range, total not derived",
                        ),
                    }
                }
            }
            None => {}
        }
    }

    fn resolve_stations(&self, captures: &RawCaptures, text: &str, out: &mut Output) {
        let first = |field: &str| {
            captures
                .get(field)
                .and_then(|list| list.iter().find_map(Capture::trimmed))
        };
        let departure = first(DEPARTURE_STATION);
        let arrival = first(ARRIVAL_STATION);

        let labeled: Vec<&str> = departure
            .iter()
            .chain(arrival.iter())
            .map(|c| c.value.as_str())
            .collect();

        let candidates: Vec<StationCandidate> = captures
            .get(STATION)
            .into_iter()
            .flatten()
            .filter_map(Capture::trimmed)
            .filter(|c| !labeled.contains(&c.value.as_str()))
            .map(|c| StationCandidate {
                line: line_index(text, c.offset),
                name: c.value,
                offset: c.offset,
            })
            .collect();

        if let Some(capture) = &departure {
            out.insert(DEPARTURE_STATION, read(FieldValue::Text(capture.value.clone()), capture));
        }
        if let Some(capture) = &arrival {
            out.insert(ARRIVAL_STATION, read(FieldValue::Text(capture.value.clone()), capture));
        }
        if (departure.is_some() && arrival.is_some()) || candidates.is_empty() {
            return;
        }

        let anchor = captures
            .get(DEPARTURE_TIME)
            .and_then(|list| list.first())
            .map(|c| line_index(text, c.offset));
        let assignment = assign_stations(&candidates, anchor);

        if !assignment.anchored {
            out.warn(
                WarningKind::Ambiguous,
                DEPARTURE_STATION,
                "no departure time found, stations taken in text order",
            );
        }

        let positional = |i: usize| {
            let c = &candidates[i];
            ResolvedField::new(FieldValue::Text(c.name.clone()), POSITIONAL_CONFIDENCE, c.name.clone())
                .with_offset(c.offset)
        };

        match (departure.is_some(), arrival.is_some()) {
            (false, false) => {
                if let Some(i) = assignment.departure {
                    out.insert(DEPARTURE_STATION, positional(i));
                }
                match assignment.arrival {
                    Some(i) => out.insert(ARRIVAL_STATION, positional(i)),
                    None => out.warn(
                        WarningKind::Ambiguous,
                        ARRIVAL_STATION,
                        "only one station found",
                    ),
                }
            }
            // Labeled departure: the farthest remaining station arrives.
            (true, false) => {
                if let Some(i) = assignment.arrival.or(assignment.departure) {
                    out.insert(ARRIVAL_STATION, positional(i));
                }
            }
            (false, true) => {
                if let Some(i) = assignment.departure {
                    out.insert(DEPARTURE_STATION, positional(i));
                }
            }
            (true, true) => {}
        }
    }

    fn resolve_generic(&self, name: &str, kind: FieldKind, list: &[Capture], out: &mut Output) {
        let captures: Vec<Capture> = list.iter().filter_map(Capture::trimmed).collect();

        let mut distinct: Vec<&str> = Vec::new();
        for capture in &captures {
            if !distinct.contains(&capture.value.as_str()) {
                distinct.push(&capture.value);
            }
        }
        if distinct.len() > 1 {
            out.warn(
                WarningKind::MultipleCandidates,
                name,
                format!("{} different values found, using the first", distinct.len()),
            );
        }

        for capture in &captures {
            match self.parse(kind, &capture.value) {
                Ok(value) => {
                    out.insert(name, read(value, capture));
                    return;
                }
                Err((warning, reason)) => out.warn(warning, name, reason),
            }
        }
    }

    fn parse(&self, kind: FieldKind, raw: &str) -> Result<FieldValue, (WarningKind, String)> {
        let failure = |what: &str| (WarningKind::ParseFailure, format!("cannot parse {} {:?}", what, raw));
        match kind {
            FieldKind::Text => Ok(FieldValue::Text(raw.to_string())),
            FieldKind::Date => parse_date(raw).map(FieldValue::Date).ok_or_else(|| failure("date")),
            FieldKind::Time => parse_time(raw).map(FieldValue::Time).ok_or_else(|| failure("time")),
            FieldKind::Amount => parse_amount(raw)
                .map(FieldValue::Amount)
                .ok_or_else(|| failure("amount")),
            FieldKind::AmountWords => parse_amount_words(raw)
                .map(FieldValue::Amount)
                .ok_or_else(|| failure("amount in words")),
            FieldKind::TaxId => {
                normalize_tax_id(raw, self.config.tax_id_min_len, self.config.tax_id_max_len)
                    .map(FieldValue::TaxId)
                    .map_err(|issue| {
                        (WarningKind::Implausible, format!("dropped {:?}: {}", raw, issue))
                    })
            }
        }
    }
}

fn values(list: &[(Decimal, Capture)]) -> Vec<Decimal> {
    list.iter().map(|(amount, _)| *amount).collect()
}

/// Candidate `index` of `list` as a field read from the document.
fn pick(list: &[(Decimal, Capture)], index: Option<usize>) -> Option<(Decimal, ResolvedField)> {
    let (amount, capture) = list.get(index?)?;
    Some((*amount, read(FieldValue::Amount(*amount), capture)))
}

/// A value read directly from a capture.
fn read(value: FieldValue, capture: &Capture) -> ResolvedField {
    ResolvedField::new(value, capture.confidence(), capture.value.clone()).with_offset(capture.offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateStore;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn capture(value: &str, offset: usize) -> Capture {
        Capture {
            value: value.to_string(),
            offset,
            pattern_index: 0,
            group_match: None,
        }
    }

    fn captures(entries: &[(&str, Vec<Capture>)]) -> RawCaptures {
        entries
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    fn template(fields: &str) -> Template {
        let json = format!(
            r#"[{{"issuer_id": "t", "keywords": [], "fields": {{{}}}}}]"#,
            fields
        );
        TemplateStore::from_json(&json).unwrap().templates()[0].clone()
    }

    fn amount_template() -> Template {
        template(
            r#""pretax_amount": {"patterns": ["x"], "kind": "amount"},
               "tax_amount": {"patterns": ["x"], "kind": "amount"},
               "total_amount": {"patterns": ["x"], "kind": "amount", "required": true},
               "total_amount_words": {"patterns": ["x"], "kind": "amount_words"}"#,
        )
    }

    #[test]
    fn test_consistent_amounts() {
        let raw = captures(&[
            (PRETAX_AMOUNT, vec![capture("94.34", 0)]),
            (TAX_AMOUNT, vec![capture("5.66", 10)]),
            (TOTAL_AMOUNT, vec![capture("¥100.00", 20)]),
            (TOTAL_AMOUNT_WORDS, vec![capture("壹佰圆整", 30)]),
        ]);
        let result = resolve(&raw, &amount_template(), "");
        assert_eq!(result.amount(TOTAL_AMOUNT), Some(dec("100.00")));
        assert_eq!(result.amount(PRETAX_AMOUNT), Some(dec("94.34")));
        assert!(result.warnings.is_empty(), "{:?}", result.warnings);
        assert!(result.missing_fields.is_empty());
    }

    #[test]
    fn test_inconsistent_amounts_trust_total() {
        let raw = captures(&[
            (PRETAX_AMOUNT, vec![capture("90.00", 0)]),
            (TAX_AMOUNT, vec![capture("5.66", 10)]),
            (TOTAL_AMOUNT, vec![capture("100.00", 20)]),
        ]);
        let result = resolve(&raw, &amount_template(), "");
        assert!(result.has_warning(WarningKind::ConsistencyViolation));
        assert!(result.fields[TOTAL_AMOUNT].reliable);
        assert!(!result.fields[PRETAX_AMOUNT].reliable);
        assert!(!result.fields[TAX_AMOUNT].reliable);
        assert!(result.fields[TAX_AMOUNT].confidence <= 0.3);
    }

    #[test]
    fn test_consistent_candidate_selected() {
        let raw = captures(&[
            (PRETAX_AMOUNT, vec![capture("10.00", 0), capture("94.34", 5)]),
            (TAX_AMOUNT, vec![capture("5.66", 10)]),
            (TOTAL_AMOUNT, vec![capture("100.00", 20)]),
        ]);
        let result = resolve(&raw, &amount_template(), "");
        assert_eq!(result.amount(PRETAX_AMOUNT), Some(dec("94.34")));
        assert!(result.has_warning(WarningKind::MultipleCandidates));
        assert!(!result.has_warning(WarningKind::ConsistencyViolation));
    }

    #[test]
    fn test_total_derived_from_parts() {
        let raw = captures(&[
            (PRETAX_AMOUNT, vec![capture("94.34", 0)]),
            (TAX_AMOUNT, vec![capture("5.66", 10)]),
        ]);
        let result = resolve(&raw, &amount_template(), "");
        assert_eq!(result.amount(TOTAL_AMOUNT), Some(dec("100.00")));
        assert_eq!(result.fields[TOTAL_AMOUNT].confidence, DERIVED_CONFIDENCE);
        assert!(result.has_warning(WarningKind::Derived));
        assert!(result.missing_fields.is_empty());
    }

    #[test]
    fn test_huge_amounts_do_not_overflow() {
        let huge = "70000000000000000000000000000.00";
        let raw = captures(&[
            (PRETAX_AMOUNT, vec![capture(huge, 0)]),
            (TAX_AMOUNT, vec![capture(huge, 40)]),
            (TOTAL_AMOUNT, vec![capture("1.00", 80)]),
        ]);
        let result = resolve(&raw, &amount_template(), "");
        assert_eq!(result.amount(TOTAL_AMOUNT), Some(dec("1.00")));
        assert!(result.has_warning(WarningKind::ConsistencyViolation));
        assert!(!result.fields[PRETAX_AMOUNT].reliable);

        let raw = captures(&[
            (PRETAX_AMOUNT, vec![capture(huge, 0)]),
            (TAX_AMOUNT, vec![capture(huge, 40)]),
        ]);
        let result = resolve(&raw, &amount_template(), "");
        assert_eq!(result.amount(TOTAL_AMOUNT), None);
        assert!(result.has_warning(WarningKind::ParseFailure));
        assert!(!result.has_warning(WarningKind::Derived));
        assert_eq!(result.missing_fields, vec![TOTAL_AMOUNT.to_string()]);
    }

    #[test]
    fn test_overflowing_amount_words_warned() {
        let raw = captures(&[(TOTAL_AMOUNT_WORDS, vec![capture("玖亿亿亿圆", 0)])]);
        let result = resolve(&raw, &amount_template(), "");
        assert_eq!(result.amount(TOTAL_AMOUNT_WORDS), None);
        assert!(result.has_warning(WarningKind::ParseFailure));
        assert_eq!(result.missing_fields, vec![TOTAL_AMOUNT.to_string()]);
    }

    #[test]
    fn test_candidate_cap_warned() {
        let mut pretax: Vec<Capture> = (0..MAX_AMOUNT_CANDIDATES).map(|i| capture("1.00", i * 10)).collect();
        pretax.push(capture("94.34", 500));
        let raw = captures(&[
            (PRETAX_AMOUNT, pretax),
            (TAX_AMOUNT, vec![capture("5.66", 600)]),
            (TOTAL_AMOUNT, vec![capture("100.00", 700)]),
        ]);
        let result = resolve(&raw, &amount_template(), "");
        assert!(result.has_warning(WarningKind::ConsistencyViolation));
        assert!(
            result
                .warnings
                .iter()
                .any(|w| w.kind == WarningKind::MultipleCandidates && w.message.contains("only the first"))
        );
    }

    #[test]
    fn test_raw_text_length_counts_given_text() {
        let raw = captures(&[(TOTAL_AMOUNT, vec![capture("1.00", 0)])]);
        let result = resolve(&raw, &amount_template(), "金额:1.00");
        assert_eq!(result.raw_text_length, 7);
    }

    #[test]
    fn test_derivation_can_be_disabled() {
        let raw = captures(&[
            (PRETAX_AMOUNT, vec![capture("94.34", 0)]),
            (TAX_AMOUNT, vec![capture("5.66", 10)]),
        ]);
        let config = ExtractionConfig {
            derive_missing_total: false,
            ..ExtractionConfig::default()
        };
        let result = Resolver::new(&config, &PositionalPartyResolver).resolve(&raw, &amount_template(), "");
        assert_eq!(result.amount(TOTAL_AMOUNT), None);
        assert_eq!(result.missing_fields, vec![TOTAL_AMOUNT.to_string()]);
        assert!(result.has_warning(WarningKind::MissingRequired));
    }

    #[test]
    fn test_amount_words_cross_check() {
        let raw = captures(&[
            (TOTAL_AMOUNT, vec![capture("100.00", 0)]),
            (TOTAL_AMOUNT_WORDS, vec![capture("壹佰零壹圆整", 10)]),
        ]);
        let result = resolve(&raw, &amount_template(), "");
        assert_eq!(result.amount(TOTAL_AMOUNT), Some(dec("100.00")));
        assert!(result.has_warning(WarningKind::CrossCheck));
    }

    #[test]
    fn test_total_from_words_when_missing() {
        let raw = captures(&[(TOTAL_AMOUNT_WORDS, vec![capture("壹佰肆拾叁圆整", 10)])]);
        let result = resolve(&raw, &amount_template(), "");
        assert_eq!(result.amount(TOTAL_AMOUNT), Some(dec("143")));
        assert!(result.has_warning(WarningKind::Derived));
        assert!(!result.has_warning(WarningKind::CrossCheck));
    }

    #[test]
    fn test_amount_parse_failure_warned() {
        let raw = captures(&[(TOTAL_AMOUNT, vec![capture("12,34.5x", 0), capture("143.00", 20)])]);
        let result = resolve(&raw, &amount_template(), "");
        assert_eq!(result.amount(TOTAL_AMOUNT), Some(dec("143.00")));
        assert!(result.has_warning(WarningKind::ParseFailure));
    }

    #[test]
    fn test_generic_date_first_parseable() {
        let t = template(r#""invoice_date": {"patterns": ["x"], "kind": "date", "required": true}"#);
        let raw = captures(&[(
            INVOICE_DATE,
            vec![capture("2024年13月40日", 0), capture(" 2024年01月15日 ", 20)],
        )]);
        let result = resolve(&raw, &t, "");
        assert_eq!(result.date(INVOICE_DATE), NaiveDate::from_ymd_opt(2024, 1, 15));
        assert_eq!(result.fields[INVOICE_DATE].offset, Some(21));
        assert!(result.has_warning(WarningKind::ParseFailure));
    }

    #[test]
    fn test_generic_text_trimmed_and_blank_absent() {
        let t = template(r#""drawer": {"patterns": ["x"], "required": true}"#);
        let raw = captures(&[("drawer", vec![capture("   ", 0)])]);
        let result = resolve(&raw, &t, "");
        assert!(result.text("drawer").is_none());
        assert_eq!(result.missing_fields, vec!["drawer".to_string()]);

        let raw = captures(&[("drawer", vec![capture(" 张三 ", 0)])]);
        let result = resolve(&raw, &t, "");
        assert_eq!(result.text("drawer"), Some("张三"));
    }

    #[test]
    fn test_implausible_tax_id_dropped() {
        let t = template(r#""buyer_tax_id": {"patterns": ["x"], "kind": "tax_id"}"#);
        let raw = captures(&[(BUYER_TAX_ID, vec![capture("12345", 0)])]);
        let result = resolve(&raw, &t, "");
        assert!(result.text(BUYER_TAX_ID).is_none());
        assert!(result.has_warning(WarningKind::Implausible));
    }

    #[test]
    fn test_tax_id_bounds_configurable() {
        let t = template(r#""buyer_tax_id": {"patterns": ["x"], "kind": "tax_id"}"#);
        let raw = captures(&[(BUYER_TAX_ID, vec![capture("12345", 0)])]);
        let config = ExtractionConfig {
            tax_id_min_len: 5,
            ..ExtractionConfig::default()
        };
        let result = Resolver::new(&config, &PositionalPartyResolver).resolve(&raw, &t, "");
        assert_eq!(result.text(BUYER_TAX_ID), Some("12345"));
    }

    #[test]
    fn test_stations_by_anchor_distance() {
        let lines: Vec<String> = (0..45)
            .map(|i| match i {
                5 => "08:12开".to_string(),
                6 => "普宁站".to_string(),
                40 => "广州南站".to_string(),
                _ => String::new(),
            })
            .collect();
        let text = lines.join("\n");
        let offset = |s: &str| text.find(s).unwrap();

        let t = template(
            r#""station": {"patterns": ["x"]},
               "departure_time": {"patterns": ["x"], "kind": "time"}"#,
        );
        let raw = captures(&[
            (STATION, vec![capture("普宁站", offset("普宁站")), capture("广州南站", offset("广州南站"))]),
            (DEPARTURE_TIME, vec![capture("08:12", offset("08:12"))]),
        ]);
        let result = resolve(&raw, &t, &text);
        assert_eq!(result.text(DEPARTURE_STATION), Some("普宁站"));
        assert_eq!(result.text(ARRIVAL_STATION), Some("广州南站"));
        assert!(!result.fields.contains_key(STATION));
    }

    #[test]
    fn test_stations_without_anchor() {
        let text = "广州南站\n普宁站";
        let t = template(r#""station": {"patterns": ["x"]}"#);
        let raw = captures(&[(STATION, vec![capture("广州南站", 0), capture("普宁站", 13)])]);
        let result = resolve(&raw, &t, text);
        assert_eq!(result.text(DEPARTURE_STATION), Some("广州南站"));
        assert_eq!(result.text(ARRIVAL_STATION), Some("普宁站"));
        assert!(result.has_warning(WarningKind::Ambiguous));
    }

    #[test]
    fn test_single_station_departure_only() {
        let text = "08:12开\n普宁站";
        let t = template(r#""station": {"patterns": ["x"]}"#);
        let raw = captures(&[
            (STATION, vec![capture("普宁站", 9)]),
            (DEPARTURE_TIME, vec![capture("08:12", 0)]),
        ]);
        let result = resolve(&raw, &t, text);
        assert_eq!(result.text(DEPARTURE_STATION), Some("普宁站"));
        assert!(result.text(ARRIVAL_STATION).is_none());
        assert!(result.warnings.iter().any(|w| w.field.as_deref() == Some(ARRIVAL_STATION)));
    }

    #[test]
    fn test_labeled_stations_take_precedence() {
        let t = template(r#""station": {"patterns": ["x"]}"#);
        let raw = captures(&[
            (DEPARTURE_STATION, vec![capture("潮汕站", 0)]),
            (ARRIVAL_STATION, vec![capture("深圳北站", 20)]),
            (STATION, vec![capture("普宁站", 40)]),
        ]);
        let result = resolve(&raw, &t, "");
        assert_eq!(result.text(DEPARTURE_STATION), Some("潮汕站"));
        assert_eq!(result.text(ARRIVAL_STATION), Some("深圳北站"));
        assert_eq!(result.fields[DEPARTURE_STATION].confidence, 0.95);
    }

    #[test]
    fn test_parties_from_unlabeled_candidates() {
        let text = "名称:甲公司\n名称:乙公司";
        let t = template(r#""party_name": {"patterns": ["x"]}"#);
        let raw = captures(&[(PARTY_NAME, vec![capture("甲公司 ", 7), capture("乙公司", 24)])]);
        let result = resolve(&raw, &t, text);
        assert_eq!(result.text(BUYER_NAME), Some("甲公司"));
        assert_eq!(result.text(SELLER_NAME), Some("乙公司"));
        assert_eq!(result.fields[BUYER_NAME].confidence, POSITIONAL_CONFIDENCE);
        assert!(!result.fields.contains_key(PARTY_NAME));
    }
}
