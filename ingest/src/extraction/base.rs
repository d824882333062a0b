use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::types::EntityCounts;

/// Errors returned by an [`EntityExtractor`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    /// The text contains nothing to extract from.
    #[error("text is empty")]
    EmptyText,

    /// The text is longer than the extractor accepts.
    #[error("text of {len} characters exceeds the maximum of {max}")]
    TextTooLong { len: usize, max: usize },

    /// A configured label is not known to the extractor.
    #[error("unknown entity label `{0}`")]
    UnknownLabel(String),
}

/// Category assigned to an extracted span.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityLabel {
    /// Proper names: people, organizations, places, products.
    Named,
    Cardinal,
    Money,
    Ordinal,
    Date,
    Time,
}

impl EntityLabel {
    /// Labels skipped by default, since numbers and moments are not interesting entities.
    pub const DEFAULT_SKIPPED: [EntityLabel; 5] = [
        EntityLabel::Cardinal,
        EntityLabel::Money,
        EntityLabel::Ordinal,
        EntityLabel::Date,
        EntityLabel::Time,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityLabel::Named => "NAMED",
            EntityLabel::Cardinal => "CARDINAL",
            EntityLabel::Money => "MONEY",
            EntityLabel::Ordinal => "ORDINAL",
            EntityLabel::Date => "DATE",
            EntityLabel::Time => "TIME",
        }
    }
}

impl fmt::Display for EntityLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityLabel {
    type Err = ExtractionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "NAMED" => Ok(EntityLabel::Named),
            "CARDINAL" => Ok(EntityLabel::Cardinal),
            "MONEY" => Ok(EntityLabel::Money),
            "ORDINAL" => Ok(EntityLabel::Ordinal),
            "DATE" => Ok(EntityLabel::Date),
            "TIME" => Ok(EntityLabel::Time),
            _ => Err(ExtractionError::UnknownLabel(s.to_string())),
        }
    }
}

/// Named-entity extraction service consumed by the workers.
///
/// Implementations are shared by every worker and called from the blocking thread pool, so
/// they may perform CPU-heavy work. A failure only affects the text being processed.
pub trait EntityExtractor: Send + Sync + 'static {
    /// Extracts entities from `text`, returning how often each lower-cased entity occurs.
    fn extract(&self, text: &str) -> Result<EntityCounts, ExtractionError>;
}

impl<E> EntityExtractor for Arc<E>
where
    E: EntityExtractor + ?Sized,
{
    fn extract(&self, text: &str) -> Result<EntityCounts, ExtractionError> {
        (**self).extract(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_round_trips_through_str() {
        for label in EntityLabel::DEFAULT_SKIPPED {
            assert_eq!(label.as_str().parse::<EntityLabel>(), Ok(label));
        }
        assert_eq!("named".parse::<EntityLabel>(), Ok(EntityLabel::Named));
    }

    #[test]
    fn test_unknown_label_is_rejected() {
        assert_eq!(
            "PERSONA".parse::<EntityLabel>(),
            Err(ExtractionError::UnknownLabel("PERSONA".to_string()))
        );
    }
}
