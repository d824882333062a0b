use serde::{Deserialize, Serialize};

/// Settings of the bundled entity extractor.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Entity labels that are not counted.
    pub skip_labels: Vec<String>,
    /// Maximum length, in characters, of a post.
    pub max_text_len: usize,
}

impl ExtractionConfig {
    pub const DEFAULT_SKIP_LABELS: &'static [&'static str] =
        &["CARDINAL", "MONEY", "ORDINAL", "DATE", "TIME"];

    pub const DEFAULT_MAX_TEXT_LEN: usize = 1_000_000;
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            skip_labels: Self::DEFAULT_SKIP_LABELS
                .iter()
                .map(|label| label.to_string())
                .collect(),
            max_text_len: Self::DEFAULT_MAX_TEXT_LEN,
        }
    }
}
