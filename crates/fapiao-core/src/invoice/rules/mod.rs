//! Rules turning raw captures into typed, disambiguated values.

pub mod amounts;
pub mod dates;
pub mod parties;
pub mod patterns;
pub mod stations;
pub mod tax_id;

pub use amounts::{
    AmountStatus, MAX_AMOUNT_CANDIDATES, Reconciliation, format_amount, parse_amount, parse_amount_words,
    reconcile,
};
pub use dates::{parse_date, parse_time};
pub use parties::{Assigned, PartyAssignment, PartyCandidates, PartyResolver, PositionalPartyResolver};
pub use stations::{StationAssignment, StationCandidate, assign_stations};
pub use tax_id::{TaxIdIssue, normalize_tax_id};
