//! RecipeStore - the search pipeline facade consumed by the HTTP layer
//!
//! Each search is a self-contained read-only pipeline: normalize terms,
//! resolve them against the vocabulary, load candidates in two batched
//! phases, score in memory, rank, paginate. Blocking work runs on
//! tokio::spawn_blocking threads.
//!
//! Async Cancellation Architecture:
//! When the caller drops the search future, a DropGuard triggers a
//! CancellationToken. The blocking pipeline thread checks the token at
//! its I/O boundaries and aborts mid-flight with `LarderError::Cancelled`.

use crate::database::Database;
use crate::interface::{
    LarderError, PageResult, PantryItem, RecipeDetail, RecipeStoreApi,
};
use crate::models::NewRecipe;
use crate::ranking::{self, ScoredRecipe};
use crate::search::{self, FALLBACK_LIMIT};
use once_cell::sync::Lazy;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Default page when the caller supplies a non-positive one.
pub const DEFAULT_PAGE: u32 = 1;
/// Default page size when the caller supplies a non-positive one.
pub const DEFAULT_PER_PAGE: u32 = 20;

/// Global fallback Tokio runtime for when async functions are called
/// outside any runtime context. Shared across all RecipeStore instances
/// and never dropped.
static FALLBACK_RUNTIME: Lazy<tokio::runtime::Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .expect("Failed to create fallback tokio runtime")
});

/// RAII guard that cancels a token when dropped.
/// Dropping the search future drops this guard, which triggers the
/// cancellation token.
struct DropGuard {
    token: CancellationToken,
}

impl DropGuard {
    fn new(token: CancellationToken) -> Self {
        Self { token }
    }
}

impl Drop for DropGuard {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Thread-safe recipe store backed by pooled SQLite
///
/// Concurrency Model:
/// - Database uses an r2d2 connection pool (concurrent reads, no mutex blocking)
/// - Search is async with cancellation support via CancellationToken
/// - Blocking work runs on tokio::spawn_blocking threads
/// - Uses the global FALLBACK_RUNTIME when called outside any runtime
pub struct RecipeStore {
    db: Arc<Database>,
}

impl RecipeStore {
    /// Create a new store with a database at the given path
    pub fn new(db_path: String) -> Result<Self, LarderError> {
        let db = Database::open(db_path).map_err(LarderError::from)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Create a store with an in-memory database (for testing and benches)
    pub fn new_in_memory() -> Result<Self, LarderError> {
        let db = Database::open_in_memory().map_err(LarderError::from)?;
        Ok(Self { db: Arc::new(db) })
    }

    /// Get a tokio runtime handle - uses the current runtime if
    /// available, otherwise the global fallback
    fn runtime_handle(&self) -> tokio::runtime::Handle {
        tokio::runtime::Handle::try_current()
            .unwrap_or_else(|_| FALLBACK_RUNTIME.handle().clone())
    }

    /// Non-positive pages clamp to the default; pagination is a display
    /// concern, never a request failure.
    fn clamp_page(page: i64) -> u32 {
        if page < 1 {
            DEFAULT_PAGE
        } else {
            page.min(i64::from(u32::MAX)) as u32
        }
    }

    fn clamp_per_page(per_page: i64) -> u32 {
        if per_page < 1 {
            DEFAULT_PER_PAGE
        } else {
            per_page.min(i64::from(u32::MAX)) as u32
        }
    }

    /// Ranked search pipeline: resolve → load candidates (two phases) →
    /// score → rank. The token is checked at every I/O boundary.
    fn search_ranked_sync(
        db: &Database,
        terms: &[String],
        token: &CancellationToken,
    ) -> Result<Vec<ScoredRecipe>, LarderError> {
        if token.is_cancelled() {
            return Err(LarderError::Cancelled);
        }

        #[cfg(feature = "perf-log")]
        let t0 = std::time::Instant::now();

        let (ingredient_ids, match_index) = search::resolve_terms(db, terms)?;
        tracing::debug!(
            terms = terms.len(),
            ingredients = ingredient_ids.len(),
            "resolved search terms"
        );

        // "Searched but found nothing" is a zero-result page, not the fallback
        if ingredient_ids.is_empty() {
            return Ok(Vec::new());
        }

        if token.is_cancelled() {
            return Err(LarderError::Cancelled);
        }

        let recipe_ids = db.candidate_recipe_ids(&ingredient_ids)?;
        if recipe_ids.is_empty() {
            return Ok(Vec::new());
        }

        if token.is_cancelled() {
            return Err(LarderError::Cancelled);
        }

        let ings_by_recipe = db.ingredient_ids_by_recipe(&recipe_ids)?;
        let recipes = db.fetch_recipes_by_ids(&recipe_ids)?;

        let mut scored: Vec<ScoredRecipe> = recipes
            .into_iter()
            .map(|recipe| {
                let ing_ids = ings_by_recipe
                    .get(&recipe.id)
                    .map(Vec::as_slice)
                    .unwrap_or(&[]);
                let total_ings = ing_ids.len() as u32;
                let matched_ings = search::distinct_matched_terms(ing_ids, &match_index);
                ScoredRecipe::ranked(recipe, total_ings, matched_ings)
            })
            .collect();

        ranking::rank(&mut scored);

        #[cfg(feature = "perf-log")]
        eprintln!(
            "[perf] pipeline={:.1}ms terms={} candidates={}",
            t0.elapsed().as_secs_f64() * 1000.0,
            terms.len(),
            scored.len(),
        );

        Ok(scored)
    }

    /// Unranked fallback listing for term-less searches.
    fn fallback_listing_sync(db: &Database) -> Result<Vec<ScoredRecipe>, LarderError> {
        tracing::debug!("no search terms, serving fallback listing");
        let rows = db.fallback_recipes(FALLBACK_LIMIT)?;
        Ok(rows
            .into_iter()
            .map(|(recipe, total_ings)| ScoredRecipe::unranked(recipe, total_ings))
            .collect())
    }

    /// Run the pipeline for an already-normalized term list.
    async fn run_search(
        &self,
        terms: Vec<String>,
        page: u32,
        per_page: u32,
    ) -> Result<PageResult, LarderError> {
        let token = CancellationToken::new();
        let _guard = DropGuard::new(token.clone());

        let runtime = self.runtime_handle();
        let db = Arc::clone(&self.db);
        let token_clone = token.clone();

        let handle = runtime.spawn_blocking(move || {
            let scored = if terms.is_empty() {
                Self::fallback_listing_sync(&db)?
            } else {
                Self::search_ranked_sync(&db, &terms, &token_clone)?
            };
            Ok(ranking::paginate(scored, page, per_page))
        });

        match handle.await {
            Ok(Ok(page_result)) => Ok(page_result),
            Ok(Err(e)) => Err(e),
            Err(_join_error) => Err(LarderError::Cancelled),
        }
    }
}

#[async_trait::async_trait]
impl RecipeStoreApi for RecipeStore {
    // ─────────────────────────────────────────────────────────────────────────────
    // Read Operations
    // ─────────────────────────────────────────────────────────────────────────────

    async fn search(
        &self,
        query: String,
        page: i64,
        per_page: i64,
    ) -> Result<PageResult, LarderError> {
        let terms = search::normalize_terms(&query);
        self.run_search(terms, Self::clamp_page(page), Self::clamp_per_page(per_page))
            .await
    }

    async fn search_with_pantry(
        &self,
        query: String,
        page: i64,
        per_page: i64,
    ) -> Result<PageResult, LarderError> {
        // Pantry names are stored lowercased and merge ahead of the query
        // terms as whole terms ("olive oil" stays one term)
        let mut terms = self.db.pantry_names()?;
        terms.extend(search::normalize_terms(&query));
        let terms = search::dedup_preserving_order(terms);
        self.run_search(terms, Self::clamp_page(page), Self::clamp_per_page(per_page))
            .await
    }

    fn detail(&self, recipe_id: i64) -> Result<RecipeDetail, LarderError> {
        let recipe = self
            .db
            .fetch_recipe(recipe_id)?
            .ok_or(LarderError::RecipeNotFound)?;
        let ingredients = self.db.ingredient_lines_for_recipe(recipe_id)?;

        Ok(RecipeDetail {
            id: recipe.id,
            title: recipe.title,
            total_time: recipe.total_time,
            yields: recipe.yields,
            image: recipe.image,
            url: recipe.url,
            ingredients,
        })
    }

    fn recipe_count(&self) -> Result<u64, LarderError> {
        Ok(self.db.count_recipes()?)
    }

    /// Get the database size in bytes
    fn database_size(&self) -> i64 {
        self.db.database_size().unwrap_or(0)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Write Operations
    // ─────────────────────────────────────────────────────────────────────────────

    fn save_recipe(&self, recipe: NewRecipe) -> Result<i64, LarderError> {
        if recipe.title.trim().is_empty() {
            return Err(LarderError::InvalidInput("Empty recipe title".into()));
        }
        Ok(self.db.insert_recipe(&recipe)?)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Pantry Operations
    // ─────────────────────────────────────────────────────────────────────────────

    fn pantry_items(&self) -> Result<Vec<PantryItem>, LarderError> {
        Ok(self.db.pantry_items()?)
    }

    fn add_pantry_item(&self, name: String) -> Result<PantryItem, LarderError> {
        let normalized = name.trim().to_lowercase();
        if normalized.is_empty() {
            return Err(LarderError::InvalidInput("Empty pantry item name".into()));
        }
        Ok(self.db.add_pantry_item(&normalized)?)
    }

    fn remove_pantry_item(&self, item_id: i64) -> Result<(), LarderError> {
        Ok(self.db.delete_pantry_item(item_id)?)
    }
}
