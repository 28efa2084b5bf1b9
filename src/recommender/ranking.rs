use std::cmp::Ordering;
use std::collections::HashSet;

use crate::catalog::{CatalogItem, CatalogStore};
use crate::embeddings::cosine_similarity;

/// One catalog item scored against a query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredCandidate<'a> {
    pub item: &'a CatalogItem,
    pub score: f32,
}

/// Score every catalog item and sort by descending similarity.
///
/// The sort is stable, so equal scores keep catalog order.
#[inline]
pub fn rank_candidates<'a>(store: &'a CatalogStore, query: &[f32]) -> Vec<ScoredCandidate<'a>> {
    let mut ranking: Vec<ScoredCandidate<'a>> = store
        .iter()
        .map(|(item, embedding)| ScoredCandidate {
            item,
            score: cosine_similarity(query, embedding),
        })
        .collect();

    ranking.sort_by(|a, b| descending(a.score, b.score));
    ranking
}

/// Adding 0.0 folds -0.0 into +0.0 so signed zeros compare equal under `total_cmp`
fn descending(a: f32, b: f32) -> Ordering {
    (b + 0.0).total_cmp(&(a + 0.0))
}

/// Plain top-k: the first `min(top_k, N)` entries of the ranking
#[inline]
pub fn select_top_k<'a>(ranking: &[ScoredCandidate<'a>], top_k: usize) -> Vec<ScoredCandidate<'a>> {
    ranking.iter().take(top_k).copied().collect()
}

/// Category-balanced top-k.
///
/// With both K-like and P-like candidates present, takes `desired / 2` from the
/// K-like sub-ranking followed by `desired - desired / 2` from the P-like one;
/// otherwise falls back to plain top-k. A short selection is topped off from
/// the full ranking, skipping names already selected, until `desired` entries
/// are reached or the ranking runs out.
#[inline]
pub fn select_balanced<'a>(
    ranking: &[ScoredCandidate<'a>],
    top_k: usize,
) -> Vec<ScoredCandidate<'a>> {
    let desired = top_k.min(ranking.len());

    let knowledge: Vec<ScoredCandidate<'a>> = ranking
        .iter()
        .filter(|c| c.item.is_knowledge())
        .copied()
        .collect();
    let personality: Vec<ScoredCandidate<'a>> = ranking
        .iter()
        .filter(|c| c.item.is_personality())
        .copied()
        .collect();

    let mut selected: Vec<ScoredCandidate<'a>> = if knowledge.is_empty() || personality.is_empty()
    {
        select_top_k(ranking, desired)
    } else {
        let half = desired / 2;
        knowledge
            .iter()
            .take(half)
            .chain(personality.iter().take(desired - half))
            .copied()
            .collect()
    };

    if selected.len() < desired {
        let mut names: HashSet<&str> = selected.iter().map(|c| c.item.name.as_str()).collect();
        for candidate in ranking {
            if selected.len() >= desired {
                break;
            }
            if names.insert(candidate.item.name.as_str()) {
                selected.push(*candidate);
            }
        }
    }

    selected
}
