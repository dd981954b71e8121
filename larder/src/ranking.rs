//! Coverage scoring and ranking for candidate recipes
//!
//! The score rewards ingredient coverage while penalizing recipes that
//! need many ingredients the user doesn't have: a recipe missing one
//! ingredient out of two outranks one missing eight out of ten even when
//! the coverage ratios are close. Ordering is deterministic — score
//! descending, recipe id ascending as the tie-break — so identical
//! requests paginate identically.

use crate::interface::{PageResult, Pagination};
use crate::models::StoredRecipe;

/// Penalty subtracted from the coverage ratio for every ingredient the
/// user is missing. Tunable product weight, not a derived constant.
pub const MISSING_INGREDIENT_PENALTY: f64 = 0.05;

/// Relevance score for one candidate recipe.
///
/// `matched_ings` is the count of distinct satisfied terms, never raw
/// join-row counts. A recipe with no recorded ingredients cannot be
/// ranked and scores 0.
pub fn score(total_ings: u32, matched_ings: u32) -> f64 {
    if total_ings == 0 {
        return 0.0;
    }
    let ratio = f64::from(matched_ings) / f64::from(total_ings);
    let missing = f64::from(total_ings - matched_ings);
    ratio - MISSING_INGREDIENT_PENALTY * missing
}

/// A scored candidate, consumed by the paginator. The score is an
/// internal ranking key and never leaves this module in public output.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecipe {
    pub recipe: StoredRecipe,
    pub total_ings: u32,
    pub matched_ings: Option<u32>,
    pub score: f64,
}

impl ScoredRecipe {
    /// Score a ranked candidate.
    pub fn ranked(recipe: StoredRecipe, total_ings: u32, matched_ings: u32) -> Self {
        Self {
            score: score(total_ings, matched_ings),
            recipe,
            total_ings,
            matched_ings: Some(matched_ings),
        }
    }

    /// Wrap a fallback-listing row: nothing was matched, nothing ranks.
    pub fn unranked(recipe: StoredRecipe, total_ings: u32) -> Self {
        Self {
            recipe,
            total_ings,
            matched_ings: None,
            score: 0.0,
        }
    }
}

/// Sort candidates by score descending; equal scores order by recipe id
/// ascending so repeated identical requests return identical pages.
pub fn rank(candidates: &mut [ScoredRecipe]) {
    candidates.sort_unstable_by(|a, b| {
        b.score
            .total_cmp(&a.score)
            .then_with(|| a.recipe.id.cmp(&b.recipe.id))
    });
}

/// Slice a page out of the sorted candidate list.
///
/// `page` and `per_page` must already be clamped to >= 1. Out-of-range
/// pages yield an empty item list, never an error; `total_count` always
/// reflects the full candidate count.
pub fn paginate(sorted: Vec<ScoredRecipe>, page: u32, per_page: u32) -> PageResult {
    let total_count = sorted.len();
    let offset = (page as usize - 1).saturating_mul(per_page as usize);
    let has_next_page = offset.saturating_add(per_page as usize) < total_count;

    let recipes = sorted
        .into_iter()
        .skip(offset)
        .take(per_page as usize)
        .map(|c| c.recipe.to_summary(c.total_ings, c.matched_ings))
        .collect();

    PageResult {
        recipes,
        pagination: Pagination {
            page,
            per_page,
            total_count: total_count as u64,
            has_next_page,
        },
    }
}
