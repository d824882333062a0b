use std::collections::HashMap;
use std::mem;

use crate::types::ProcessedPost;

/// Bounded publication-keyed accumulator owned by a single worker.
///
/// The cache holds one [`ProcessedPost`] per publication seen since the last flush. Once the
/// number of distinct publications reaches `max_size`, [`AggregationCache::merge`] reports that
/// the cache must be flushed. Memory is therefore bounded by the number of publications, no
/// matter how skewed their popularity is.
#[derive(Debug)]
pub struct AggregationCache {
    max_size: usize,
    entries: HashMap<String, ProcessedPost>,
}

impl AggregationCache {
    /// Creates a cache flushing at `max_size` distinct publications (at least one).
    pub fn new(max_size: usize) -> Self {
        Self {
            max_size: max_size.max(1),
            entries: HashMap::new(),
        }
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Number of publications currently cached.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Merges `post` into the entry of its publication, creating it if absent.
    ///
    /// Returns `true` when the cache reached its size and must be flushed before the next
    /// merge.
    pub fn merge(&mut self, post: ProcessedPost) -> bool {
        match self.entries.get_mut(post.pub_key()) {
            Some(entry) => *entry += post,
            None => {
                self.entries.insert(post.publication.clone(), post);
            }
        }

        self.entries.len() >= self.max_size
    }

    /// Removes and returns every cached aggregate.
    pub fn flush(&mut self) -> Vec<ProcessedPost> {
        mem::take(&mut self.entries).into_values().collect()
    }
}
