//! Buyer/seller assignment.
//!
//! The default strategy relies on the standard layout where the buyer block
//! precedes the seller block. That is not guaranteed, so the strategy sits
//! behind [`PartyResolver`] and can be swapped for a layout-aware one.

use crate::invoice::extractor::Capture;
use crate::models::result::{Warning, WarningKind};
use crate::template::fields::{BUYER_NAME, BUYER_TAX_ID, SELLER_NAME, SELLER_TAX_ID};
use crate::text::line_index;

/// Name and tax ID captures relevant to party assignment.
///
/// Names are trimmed and non-empty; tax IDs are already normalized and
/// plausible.
#[derive(Debug, Clone, Copy)]
pub struct PartyCandidates<'a> {
    /// Normalized document text, for line positions.
    pub text: &'a str,
    pub buyer_names: &'a [Capture],
    pub seller_names: &'a [Capture],
    /// Names captured without a buyer/seller label.
    pub party_names: &'a [Capture],
    pub buyer_tax_ids: &'a [Capture],
    pub seller_tax_ids: &'a [Capture],
    /// Tax IDs captured without a buyer/seller label.
    pub tax_ids: &'a [Capture],
}

/// A capture chosen for one party slot.
#[derive(Debug, Clone, PartialEq)]
pub struct Assigned {
    pub capture: Capture,
    pub confidence: f32,
}

/// Result of party assignment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartyAssignment {
    pub buyer_name: Option<Assigned>,
    pub seller_name: Option<Assigned>,
    pub buyer_tax_id: Option<Assigned>,
    pub seller_tax_id: Option<Assigned>,
    pub warnings: Vec<Warning>,
}

/// Strategy assigning captured names and tax IDs to buyer and seller.
pub trait PartyResolver: Send + Sync {
    fn assign(&self, candidates: &PartyCandidates<'_>) -> PartyAssignment;
}

const POSITIONAL_CONFIDENCE: f32 = 0.6;

/// Default strategy: labels first, then textual order (buyer before seller),
/// then line proximity for a lone tax ID.
#[derive(Debug, Clone, Copy, Default)]
pub struct PositionalPartyResolver;

impl PartyResolver for PositionalPartyResolver {
    fn assign(&self, candidates: &PartyCandidates<'_>) -> PartyAssignment {
        let mut assignment = PartyAssignment::default();
        self.assign_names(candidates, &mut assignment);
        self.assign_tax_ids(candidates, &mut assignment);
        assignment
    }
}

impl PositionalPartyResolver {
    fn assign_names(&self, candidates: &PartyCandidates<'_>, out: &mut PartyAssignment) {
        let labeled = |c: &Capture| Assigned {
            capture: c.clone(),
            confidence: c.confidence(),
        };

        // Both names from one combine-mode match.
        let pair = candidates.buyer_names.iter().find_map(|b| {
            let group = b.group_match?;
            candidates
                .seller_names
                .iter()
                .find(|s| s.group_match == Some(group))
                .map(|s| (b, s))
        });

        match pair {
            Some((buyer, seller)) => {
                out.buyer_name = Some(labeled(buyer));
                out.seller_name = Some(labeled(seller));
            }
            None => {
                out.buyer_name = candidates.buyer_names.first().map(labeled);
                out.seller_name = candidates.seller_names.first().map(labeled);
            }
        }

        if out.buyer_name.is_some() && out.seller_name.is_some() {
            return;
        }

        let mut pool: Vec<&Capture> = candidates
            .party_names
            .iter()
            .filter(|c| {
                ![&out.buyer_name, &out.seller_name]
                    .iter()
                    .any(|a| a.as_ref().is_some_and(|a| a.capture.value == c.value))
            })
            .collect();
        pool.sort_by_key(|c| c.offset);

        if out.buyer_name.is_none() {
            // Buyer block precedes the seller block.
            let pick = match &out.seller_name {
                Some(seller) => pool
                    .iter()
                    .position(|c| c.offset < seller.capture.offset)
                    .or_else(|| (!pool.is_empty()).then_some(0)),
                None => (!pool.is_empty()).then_some(0),
            };
            if let Some(i) = pick {
                let capture = pool.remove(i);
                out.buyer_name = Some(positional(capture));
                out.warnings.push(Warning::for_field(
                    WarningKind::Ambiguous,
                    BUYER_NAME,
                    format!("assigned {:?} by textual order", capture.value),
                ));
            }
        }

        if out.seller_name.is_none() {
            let pick = match &out.buyer_name {
                Some(buyer) => pool
                    .iter()
                    .position(|c| c.offset > buyer.capture.offset)
                    .or_else(|| (!pool.is_empty()).then_some(0)),
                None => (!pool.is_empty()).then_some(0),
            };
            if let Some(i) = pick {
                let capture = pool.remove(i);
                out.seller_name = Some(positional(capture));
                out.warnings.push(Warning::for_field(
                    WarningKind::Ambiguous,
                    SELLER_NAME,
                    format!("assigned {:?} by textual order", capture.value),
                ));
            }
        }
    }

    fn assign_tax_ids(&self, candidates: &PartyCandidates<'_>, out: &mut PartyAssignment) {
        out.buyer_tax_id = candidates.buyer_tax_ids.first().map(|c| Assigned {
            capture: c.clone(),
            confidence: c.confidence(),
        });
        out.seller_tax_id = candidates.seller_tax_ids.first().map(|c| Assigned {
            capture: c.clone(),
            confidence: c.confidence(),
        });

        // Distinct unlabeled values not already taken, in textual order.
        let mut pool: Vec<&Capture> = Vec::new();
        for capture in candidates.tax_ids {
            let taken = [&out.buyer_tax_id, &out.seller_tax_id]
                .iter()
                .any(|a| a.as_ref().is_some_and(|a| a.capture.value == capture.value));
            if !taken && !pool.iter().any(|c| c.value == capture.value) {
                pool.push(capture);
            }
        }
        pool.sort_by_key(|c| c.offset);

        if pool.is_empty() {
            return;
        }

        let text = candidates.text;

        match (out.buyer_tax_id.is_none(), out.seller_tax_id.is_none()) {
            (true, true) if pool.len() >= 2 => {
                out.buyer_tax_id = Some(positional(pool[0]));
                out.seller_tax_id = Some(positional(pool[1]));
                if pool.len() > 2 {
                    out.warnings.push(Warning::new(
                        WarningKind::MultipleCandidates,
                        format!("{} tax ID candidates, used the first two", pool.len()),
                    ));
                }
            }
            (true, true) => {
                let capture = pool[0];
                let to_buyer = match (&out.buyer_name, &out.seller_name) {
                    (Some(buyer), Some(seller)) => {
                        let line = line_index(text, capture.offset);
                        let buyer_line = line_index(text, buyer.capture.offset);
                        let seller_line = line_index(text, seller.capture.offset);
                        // Ties go to the buyer.
                        line.abs_diff(buyer_line) <= line.abs_diff(seller_line)
                    }
                    (None, Some(_)) => false,
                    _ => true,
                };
                let field = if to_buyer { BUYER_TAX_ID } else { SELLER_TAX_ID };
                out.warnings.push(Warning::for_field(
                    WarningKind::Ambiguous,
                    field,
                    "single tax ID assigned by proximity to party name",
                ));
                if to_buyer {
                    out.buyer_tax_id = Some(positional(capture));
                } else {
                    out.seller_tax_id = Some(positional(capture));
                }
            }
            (true, false) => {
                let i = nearest(text, &pool, out.buyer_name.as_ref());
                out.buyer_tax_id = Some(positional(pool[i]));
            }
            (false, true) => {
                let i = nearest(text, &pool, out.seller_name.as_ref());
                out.seller_tax_id = Some(positional(pool[i]));
            }
            (false, false) => {}
        }
    }
}

/// Index of the pool entry closest to `anchor` by line, then by offset.
fn nearest(text: &str, pool: &[&Capture], anchor: Option<&Assigned>) -> usize {
    let Some(anchor) = anchor else { return 0 };
    let anchor_line = line_index(text, anchor.capture.offset);

    let mut best = 0;
    let mut best_key = (usize::MAX, usize::MAX);
    for (i, capture) in pool.iter().enumerate() {
        let key = (
            line_index(text, capture.offset).abs_diff(anchor_line),
            capture.offset.abs_diff(anchor.capture.offset),
        );
        if key < best_key {
            best = i;
            best_key = key;
        }
    }
    best
}

fn positional(capture: &Capture) -> Assigned {
    Assigned {
        capture: capture.clone(),
        confidence: POSITIONAL_CONFIDENCE,
    }
}
