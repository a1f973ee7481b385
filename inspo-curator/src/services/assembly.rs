//! Result assembly: merge trending and popular results, then shuffle

use rand::Rng;

use crate::services::candidate_pool::shuffled;
use crate::types::{AcceptedResult, ResultKind, ResultSet};

/// Concatenate both inputs and shuffle uniformly; no size cap
pub fn assemble(trending: Vec<AcceptedResult>, popular: Vec<AcceptedResult>) -> ResultSet {
    assemble_with(trending, popular, &mut rand::thread_rng())
}

pub fn assemble_with<R: Rng + ?Sized>(
    trending: Vec<AcceptedResult>,
    popular: Vec<AcceptedResult>,
    rng: &mut R,
) -> ResultSet {
    let mut items = trending;
    items.extend(popular);

    let trending_count = items
        .iter()
        .filter(|i| i.kind == ResultKind::Trending)
        .count();
    let popular_count = items.len() - trending_count;

    ResultSet {
        items: shuffled(items, rng),
        trending_count,
        popular_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::fallback::FallbackSupplier;

    fn sorted(set: &ResultSet) -> Vec<AcceptedResult> {
        let mut items = set.items.clone();
        items.sort_by(|a, b| a.prompt_text.cmp(&b.prompt_text));
        items
    }

    #[test]
    fn test_assembly_preserves_membership() {
        let trending = vec![
            AcceptedResult::trending("Trend one", "song1.mp3"),
            AcceptedResult::trending("Trend two", "song2.mp3"),
        ];
        let popular = FallbackSupplier::builtin().supply();

        let first = assemble(trending.clone(), popular.clone());
        let second = assemble(trending, popular);

        assert_eq!(first.len(), 5);
        assert_eq!(first.trending_count, 2);
        assert_eq!(first.popular_count, 3);
        assert_eq!(sorted(&first), sorted(&second));
    }

    #[test]
    fn test_empty_inputs() {
        let set = assemble(Vec::new(), Vec::new());
        assert!(set.is_empty());
        assert_eq!(set.trending_count, 0);
        assert_eq!(set.popular_count, 0);
    }

    #[test]
    fn test_popular_only() {
        let set = assemble(Vec::new(), FallbackSupplier::builtin().supply());
        assert_eq!(set.trending_count, 0);
        assert_eq!(set.popular_count, 3);
    }
}
