use std::collections::HashMap;

use crate::extraction::{EntityExtractor, ExtractionError};
use crate::types::EntityCounts;

/// Text that makes [`ScriptedExtractor`] fail with [`ExtractionError::EmptyText`].
pub const FAILING_TEXT: &str = "<fail>";

/// Text that makes [`ScriptedExtractor`] panic.
pub const PANICKING_TEXT: &str = "<panic>";

/// Extractor returning scripted entity counts per text.
///
/// Texts without a script yield one occurrence of the text itself, lower-cased.
#[derive(Debug, Clone, Default)]
pub struct ScriptedExtractor {
    scripts: HashMap<String, EntityCounts>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scripts the entities returned for `text`.
    pub fn with_script(mut self, text: &str, entities: &[(&str, u64)]) -> Self {
        let counts = entities
            .iter()
            .map(|(entity, count)| (entity.to_string(), *count))
            .collect();
        self.scripts.insert(text.to_string(), counts);
        self
    }
}

impl EntityExtractor for ScriptedExtractor {
    fn extract(&self, text: &str) -> Result<EntityCounts, ExtractionError> {
        match text {
            FAILING_TEXT => Err(ExtractionError::EmptyText),
            PANICKING_TEXT => panic!("scripted extractor panic"),
            _ => Ok(self
                .scripts
                .get(text)
                .cloned()
                .unwrap_or_else(|| EntityCounts::from([(text.to_lowercase(), 1)]))),
        }
    }
}
