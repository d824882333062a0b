use serde::{Deserialize, Serialize};

/// Raw text submitted by a producer, tagged with the publication it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    /// The text to extract entities from.
    pub content: String,
    /// Name of the publication the text was published in.
    pub publication: String,
}

impl Post {
    pub fn new(content: impl Into<String>, publication: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            publication: publication.into(),
        }
    }
}
