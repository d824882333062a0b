use std::collections::HashMap;
use std::ops::{Add, AddAssign};

use serde::{Deserialize, Serialize};

/// Occurrences of each entity, keyed by the lower-cased entity text.
pub type EntityCounts = HashMap<String, u64>;

/// Collection that entity records are written to.
pub const ENTITIES_COLLECTION: &str = "entities";

/// Default number of entities kept per aggregate when transforming it into records.
pub const DEFAULT_TOP_K_ENTITIES: usize = 2_000;

/// Aggregated extraction results for a single publication.
///
/// `articles` is the number of posts merged into the aggregate. Merging two aggregates with
/// `+` unions their entities, summing counts per entity, and sums `articles`. The merge is
/// commutative and associative, so partial aggregates can be combined in any order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedPost {
    pub publication: String,
    #[serde(default)]
    pub entities: EntityCounts,
    #[serde(default)]
    pub articles: u64,
}

impl ProcessedPost {
    /// Creates an empty aggregate for `publication`.
    pub fn new(publication: impl Into<String>) -> Self {
        Self {
            publication: publication.into(),
            entities: EntityCounts::new(),
            articles: 0,
        }
    }

    /// Creates the aggregate of a single post.
    pub fn from_post(publication: impl Into<String>, entities: EntityCounts) -> Self {
        Self {
            publication: publication.into(),
            entities,
            articles: 1,
        }
    }

    /// Returns the key this aggregate is cached under.
    pub fn pub_key(&self) -> &str {
        &self.publication
    }

    /// Merges `other` into `self`.
    ///
    /// The publication of `self` is kept, callers only merge aggregates of the same
    /// publication.
    pub fn merge(&mut self, other: ProcessedPost) {
        for (entity, count) in other.entities {
            *self.entities.entry(entity).or_default() += count;
        }
        self.articles += other.articles;
    }

    /// Transforms the aggregate into one increment record per entity.
    ///
    /// Only the `top_k` most frequent entities are kept. Ties are broken by entity text so the
    /// selection is deterministic.
    pub fn transform_for_database(&self, top_k: usize) -> Vec<PersistenceRecord> {
        let mut entities: Vec<(&String, &u64)> = self.entities.iter().collect();
        entities.sort_by(|(a_entity, a_count), (b_entity, b_count)| {
            b_count.cmp(a_count).then_with(|| a_entity.cmp(b_entity))
        });

        entities
            .into_iter()
            .take(top_k)
            .map(|(entity, count)| PersistenceRecord {
                publication: self.publication.clone(),
                collection: ENTITIES_COLLECTION.to_string(),
                record_id: entity.clone(),
                fields: RecordFields {
                    articles: self.articles,
                    count: *count,
                },
            })
            .collect()
    }
}

impl AddAssign for ProcessedPost {
    fn add_assign(&mut self, other: ProcessedPost) {
        self.merge(other);
    }
}

impl Add for ProcessedPost {
    type Output = ProcessedPost;

    fn add(mut self, other: ProcessedPost) -> ProcessedPost {
        self.merge(other);
        self
    }
}

/// Increment record handed to a persister.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistenceRecord {
    pub publication: String,
    pub collection: String,
    pub record_id: String,
    pub fields: RecordFields,
}

/// Counters carried by a [`PersistenceRecord`]. Persisters add them to the stored values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFields {
    pub articles: u64,
    pub count: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn processed(entities: &[(&str, u64)], articles: u64) -> ProcessedPost {
        ProcessedPost {
            publication: "tech".to_string(),
            entities: entities
                .iter()
                .map(|(entity, count)| (entity.to_string(), *count))
                .collect(),
            articles,
        }
    }

    #[test]
    fn test_merge_sums_entities_and_articles() {
        let merged = processed(&[("apple", 1), ("california", 2)], 1)
            + processed(&[("apple", 3), ("google", 1)], 2);

        assert_eq!(
            merged,
            processed(&[("apple", 4), ("california", 2), ("google", 1)], 3)
        );
    }

    #[test]
    fn test_merge_is_commutative_and_associative() {
        let a = processed(&[("apple", 1), ("california", 1)], 1);
        let b = processed(&[("apple", 2)], 1);
        let c = processed(&[("google", 5), ("california", 3)], 4);

        assert_eq!(a.clone() + b.clone(), b.clone() + a.clone());
        assert_eq!(
            (a.clone() + b.clone()) + c.clone(),
            a.clone() + (b.clone() + c.clone())
        );
        assert_eq!(
            (a.clone() + c.clone()) + b.clone(),
            c + (b + a)
        );
    }

    #[test]
    fn test_merge_with_empty_aggregate_is_identity() {
        let a = processed(&[("apple", 1)], 1);

        assert_eq!(a.clone() + ProcessedPost::new("tech"), a);
    }

    #[test]
    fn test_transform_for_database_selects_top_k() {
        let post = processed(&[("apple", 3), ("california", 1), ("google", 3), ("iphone", 2)], 4);

        let records = post.transform_for_database(3);

        let ids: Vec<&str> = records.iter().map(|r| r.record_id.as_str()).collect();
        assert_eq!(ids, vec!["apple", "google", "iphone"]);
        assert!(records.iter().all(|r| r.publication == "tech"));
        assert!(records.iter().all(|r| r.collection == ENTITIES_COLLECTION));
        assert!(records.iter().all(|r| r.fields.articles == 4));
        assert_eq!(records[2].fields.count, 2);
    }

    #[test]
    fn test_transform_for_database_without_entities_is_empty() {
        let post = processed(&[], 2);

        assert!(post.transform_for_database(DEFAULT_TOP_K_ENTITIES).is_empty());
    }

    #[test]
    fn test_processed_post_json_shape() {
        let post: ProcessedPost =
            serde_json::from_str(r#"{"publication":"tech","entities":{"apple":2}}"#).unwrap();

        assert_eq!(post.pub_key(), "tech");
        assert_eq!(post.articles, 0);
        assert_eq!(post.entities.get("apple"), Some(&2));
    }
}
