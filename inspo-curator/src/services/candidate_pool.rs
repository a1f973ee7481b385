//! Candidate pool: the clips one curation run may try, in random order

use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashSet;

use crate::types::CandidateItem;

/// Uniform in-place shuffle (Fisher–Yates), returning the vector
pub fn shuffled<T, R: Rng + ?Sized>(mut items: Vec<T>, rng: &mut R) -> Vec<T> {
    items.shuffle(rng);
    items
}

/// Ordered set of distinct candidate clips
#[derive(Debug, Clone, Default)]
pub struct CandidatePool {
    items: Vec<CandidateItem>,
}

impl CandidatePool {
    /// Build a pool, dropping repeated identifiers (first occurrence wins)
    pub fn new(items: impl IntoIterator<Item = CandidateItem>) -> Self {
        let mut seen = HashSet::new();
        let mut unique = Vec::new();
        for item in items {
            if seen.insert(item.identifier.clone()) {
                unique.push(item);
            } else {
                tracing::warn!(identifier = %item.identifier, "Duplicate clip ignored");
            }
        }
        Self { items: unique }
    }

    pub fn from_identifiers<I, S>(identifiers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(identifiers.into_iter().map(CandidateItem::new))
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[CandidateItem] {
        &self.items
    }

    /// Every item exactly once, uniformly permuted
    pub fn enumerate(&self) -> Vec<CandidateItem> {
        self.enumerate_with(&mut rand::thread_rng())
    }

    /// Same as `enumerate` with a caller-supplied RNG (stable per seed)
    pub fn enumerate_with<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<CandidateItem> {
        shuffled(self.items.clone(), rng)
    }
}
