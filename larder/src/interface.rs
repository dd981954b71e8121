//! Larder public interface
//!
//! This file defines the types handed to the HTTP layer and acts as the
//! source of truth for the wire format: serde field order matches the JSON
//! consumed by existing clients exactly.

use crate::models::NewRecipe;
use serde::Serialize;
use thiserror::Error;

// ═══════════════════════════════════════════════════════════════════════════════
// RECORDS (Structs)
// ═══════════════════════════════════════════════════════════════════════════════

/// One ranked recipe in a result page. `matched_ings` is null when the
/// search ran in fallback mode (no terms supplied, nothing to match).
/// The internal ranking score is deliberately absent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeSummary {
    pub id: i64,
    pub title: String,
    pub image: Option<String>,
    pub total_time: Option<i64>,
    pub yields: Option<String>,
    pub total_ings: u32,
    pub matched_ings: Option<u32>,
}

/// Pagination envelope attached to every result page
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: u32,
    pub per_page: u32,
    pub total_count: u64,
    pub has_next_page: bool,
}

/// A page of ranked (or fallback-listed) recipes
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageResult {
    pub recipes: Vec<RecipeSummary>,
    pub pagination: Pagination,
}

/// One ingredient line of a recipe detail: normalized vocabulary name
/// plus the original wording for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngredientLine {
    pub id: i64,
    pub name: String,
    pub raw: String,
}

/// Full recipe metadata plus its ingredient list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeDetail {
    pub id: i64,
    pub title: String,
    pub total_time: Option<i64>,
    pub yields: Option<String>,
    pub image: Option<String>,
    pub url: Option<String>,
    pub ingredients: Vec<IngredientLine>,
}

/// A saved pantry entry (stored lowercased and trimmed)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PantryItem {
    pub id: i64,
    pub name: String,
}

/// Error type for Larder operations
#[derive(Debug, Error)]
pub enum LarderError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Recipe not found")]
    RecipeNotFound,
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Operation cancelled")]
    Cancelled,
}

// ═══════════════════════════════════════════════════════════════════════════════
// SERVICE INTERFACE
// ═══════════════════════════════════════════════════════════════════════════════

/// The primary interface for accessing the recipe store.
/// This matches the functionality exposed by the `RecipeStore` object.
#[async_trait::async_trait]
pub trait RecipeStoreApi: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────────
    // Read Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Search recipes ranked by ingredient coverage. An empty query
    /// returns the unranked fallback listing. Non-positive `page` /
    /// `per_page` clamp to 1 and 20.
    async fn search(&self, query: String, page: i64, per_page: i64)
        -> Result<PageResult, LarderError>;

    /// Like `search`, but the saved pantry terms are merged ahead of the
    /// query terms before resolution.
    async fn search_with_pantry(&self, query: String, page: i64, per_page: i64)
        -> Result<PageResult, LarderError>;

    /// Full metadata and ingredient lines for a single recipe.
    fn detail(&self, recipe_id: i64) -> Result<RecipeDetail, LarderError>;

    /// Number of recipes in the store.
    fn recipe_count(&self) -> Result<u64, LarderError>;

    /// Get the database size in bytes
    fn database_size(&self) -> i64;

    // ─────────────────────────────────────────────────────────────────────────────
    // Write Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// Save a recipe with its ingredient lines. Ingredient names are
    /// matched case-insensitively against the existing vocabulary and
    /// created on first use. Returns the new recipe id.
    fn save_recipe(&self, recipe: NewRecipe) -> Result<i64, LarderError>;

    // ─────────────────────────────────────────────────────────────────────────────
    // Pantry Operations
    // ─────────────────────────────────────────────────────────────────────────────

    /// All pantry entries, ordered by name.
    fn pantry_items(&self) -> Result<Vec<PantryItem>, LarderError>;

    /// Add a pantry entry (trimmed, lowercased). Re-adding an existing
    /// name returns the stored row instead of failing.
    fn add_pantry_item(&self, name: String) -> Result<PantryItem, LarderError>;

    /// Remove a pantry entry. Removing an unknown id is a no-op.
    fn remove_pantry_item(&self, item_id: i64) -> Result<(), LarderError>;
}

impl From<crate::database::DatabaseError> for LarderError {
    fn from(e: crate::database::DatabaseError) -> Self {
        LarderError::Database(e.to_string())
    }
}
