//! Term normalization and ingredient resolution
//!
//! Turns raw user text into a deduplicated list of lower-cased terms, then
//! resolves each term against the ingredient vocabulary with
//! case-insensitive substring matching. Resolution produces the
//! per-request match index (`ingredient_id → term`) the scorer uses to
//! count how many distinct terms a recipe satisfies. The index never
//! outlives one search invocation.

use crate::database::{Database, DatabaseResult};
use std::collections::{HashMap, HashSet};

/// Maximum recipes returned by the unranked fallback listing.
pub(crate) const FALLBACK_LIMIT: usize = 100;

/// Per-request reverse index from matched ingredient id to the term that
/// resolved it. When an id matches several terms, the later term (in
/// normalized order) wins; the index only answers "how many distinct
/// terms does this recipe satisfy", so the choice carries no meaning but
/// must be deterministic.
pub type MatchIndex = HashMap<i64, String>;

/// Normalize raw user input into distinct lower-cased search terms.
///
/// Splits on any run of whitespace and/or commas, drops empty fragments,
/// deduplicates preserving first-seen order. Pure and total; empty or
/// whitespace-only input yields an empty list, which callers must treat
/// as "no filter" and route to the fallback listing.
pub fn normalize_terms(raw: &str) -> Vec<String> {
    let lowered = raw.to_lowercase();
    let tokens = lowered
        .split(|c: char| c.is_whitespace() || c == ',')
        .filter(|t| !t.is_empty())
        .map(str::to_string);
    dedup_preserving_order(tokens)
}

/// Deduplicate preserving first-seen order.
pub(crate) fn dedup_preserving_order(terms: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();
    for term in terms {
        if seen.insert(term.clone()) {
            out.push(term);
        }
    }
    out
}

/// Resolve terms against the ingredient vocabulary.
///
/// Returns the matched ingredient ids (ascending) and the match index.
/// Empty `terms` yields an empty result; the caller routes to the
/// fallback. A non-empty `terms` with no vocabulary hits also yields an
/// empty id set — "searched but found nothing" renders a zero-result
/// page, not the fallback.
pub fn resolve_terms(
    db: &Database,
    terms: &[String],
) -> DatabaseResult<(Vec<i64>, MatchIndex)> {
    let mut index: MatchIndex = HashMap::new();
    for term in terms {
        for ingredient_id in db.ingredient_ids_matching(term)? {
            index.insert(ingredient_id, term.clone());
        }
    }

    let mut ids: Vec<i64> = index.keys().copied().collect();
    ids.sort_unstable();
    Ok((ids, index))
}

/// Count the distinct terms satisfied by a recipe's ingredient set.
///
/// Two ingredient variants resolving to the same term ("salt", "sea
/// salt") count that term once, not twice.
pub fn distinct_matched_terms(ingredient_ids: &[i64], index: &MatchIndex) -> u32 {
    let mut terms: HashSet<&str> = HashSet::new();
    for id in ingredient_ids {
        if let Some(term) = index.get(id) {
            terms.insert(term.as_str());
        }
    }
    terms.len() as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewRecipe;

    // ── normalize_terms tests ────────────────────────────────────

    #[test]
    fn test_normalize_lowercases_splits_and_dedups() {
        assert_eq!(
            normalize_terms("Tomato, cheese  cheese"),
            vec!["tomato", "cheese"]
        );
    }

    #[test]
    fn test_normalize_splits_on_comma_runs() {
        assert_eq!(
            normalize_terms("salt,,pepper ,  ,garlic"),
            vec!["salt", "pepper", "garlic"]
        );
    }

    #[test]
    fn test_normalize_empty_and_whitespace_input() {
        assert!(normalize_terms("").is_empty());
        assert!(normalize_terms("   \t , ,, ").is_empty());
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let once = normalize_terms("Basil olive-oil  OLIVE-OIL, basil");
        let twice = normalize_terms(&once.join(" "));
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_preserves_first_seen_order() {
        assert_eq!(normalize_terms("b a b c a"), vec!["b", "a", "c"]);
    }

    // ── resolve_terms tests ──────────────────────────────────────

    fn vocab_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.insert_recipe(
            &NewRecipe::new("Eggs three ways")
                .with_ingredient("eggs", "6 eggs")
                .with_ingredient("large egg", "1 large egg")
                .with_ingredient("butter", "some butter"),
        )
        .unwrap();
        db
    }

    #[test]
    fn test_resolve_matches_substrings_across_variants() {
        let db = vocab_db();
        let (ids, index) = resolve_terms(&db, &["egg".to_string()]).unwrap();
        // "eggs" and "large egg" both contain "egg"
        assert_eq!(ids.len(), 2);
        assert!(index.values().all(|t| t == "egg"));
    }

    #[test]
    fn test_resolve_empty_terms_yields_empty_result() {
        let db = vocab_db();
        let (ids, index) = resolve_terms(&db, &[]).unwrap();
        assert!(ids.is_empty());
        assert!(index.is_empty());
    }

    #[test]
    fn test_resolve_no_hits_yields_empty_id_set() {
        let db = vocab_db();
        let (ids, _) = resolve_terms(&db, &["saffron".to_string()]).unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn test_resolve_later_term_wins_on_collision() {
        let db = vocab_db();
        // Both terms match "large egg"; the later one must own the id
        let terms = vec!["egg".to_string(), "large".to_string()];
        let (_, index) = resolve_terms(&db, &terms).unwrap();
        let large_egg_ids = db.ingredient_ids_matching("large").unwrap();
        assert_eq!(index[&large_egg_ids[0]], "large");
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let db = vocab_db();
        let terms = vec!["egg".to_string(), "butter".to_string()];
        let first = resolve_terms(&db, &terms).unwrap();
        for _ in 0..3 {
            assert_eq!(resolve_terms(&db, &terms).unwrap(), first);
        }
    }

    // ── distinct_matched_terms tests ─────────────────────────────

    #[test]
    fn test_distinct_terms_counted_once_across_variants() {
        let mut index = MatchIndex::new();
        index.insert(1, "salt".to_string());
        index.insert(2, "salt".to_string());
        index.insert(3, "pepper".to_string());

        // Recipe carries both salt variants: "salt" still counts once
        assert_eq!(distinct_matched_terms(&[1, 2], &index), 1);
        assert_eq!(distinct_matched_terms(&[1, 2, 3], &index), 2);
    }

    #[test]
    fn test_unmatched_ids_do_not_count() {
        let mut index = MatchIndex::new();
        index.insert(1, "salt".to_string());
        assert_eq!(distinct_matched_terms(&[4, 5], &index), 0);
        assert_eq!(distinct_matched_terms(&[], &index), 0);
    }
}
