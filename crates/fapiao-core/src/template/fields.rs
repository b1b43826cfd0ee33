//! Field names the resolver gives special treatment.
//!
//! Any other field name declared by a template is resolved generically from
//! its [`FieldKind`](super::FieldKind).

pub const INVOICE_NUMBER: &str = "invoice_number";
pub const INVOICE_DATE: &str = "invoice_date";

pub const BUYER_NAME: &str = "buyer_name";
pub const SELLER_NAME: &str = "seller_name";
pub const BUYER_TAX_ID: &str = "buyer_tax_id";
pub const SELLER_TAX_ID: &str = "seller_tax_id";
/// Unlabeled company name candidates, assigned to buyer/seller by position.
pub const PARTY_NAME: &str = "party_name";
/// Unlabeled tax ID candidates, paired with the resolved names.
pub const TAX_ID: &str = "tax_id";

pub const PRETAX_AMOUNT: &str = "pretax_amount";
pub const TAX_AMOUNT: &str = "tax_amount";
pub const TOTAL_AMOUNT: &str = "total_amount";
/// Total written in Chinese uppercase numerals.
pub const TOTAL_AMOUNT_WORDS: &str = "total_amount_words";

/// Unlabeled station candidates on a railway ticket.
pub const STATION: &str = "station";
pub const DEPARTURE_STATION: &str = "departure_station";
pub const ARRIVAL_STATION: &str = "arrival_station";
/// `HH:MM开` on a railway ticket; its line anchors station resolution.
pub const DEPARTURE_TIME: &str = "departure_time";

/// Fields that only feed other fields and never appear in a result.
pub const CANDIDATE_FIELDS: &[&str] = &[PARTY_NAME, TAX_ID, STATION];

/// Whether `name` is a candidate-only field.
pub fn is_candidate(name: &str) -> bool {
    CANDIDATE_FIELDS.contains(&name)
}
