//! Entity extraction collaborator.
//!
//! Workers hand the text of every post to an [`EntityExtractor`] and aggregate the returned
//! counts. [`RuleBasedExtractor`] is the bundled implementation.

mod base;
mod rules;

pub use base::{EntityExtractor, EntityLabel, ExtractionError};
pub use rules::RuleBasedExtractor;
