//! Invoice field extraction pipeline.

mod engine;
mod extractor;
mod matcher;
mod resolver;
pub mod rules;

pub use engine::ExtractionEngine;
pub use extractor::{Capture, RawCaptures, extract_fields};
pub use matcher::match_template;
pub use resolver::{Resolver, resolve};
pub use rules::{PartyAssignment, PartyCandidates, PartyResolver, PositionalPartyResolver};
