//! Core data models for Larder
//!
//! `StoredRecipe` is the internal row model read back from the database;
//! `NewRecipe`/`NewIngredient` describe a recipe on its way in. The public
//! wire types live in `interface`.

use crate::interface::RecipeSummary;

// ─────────────────────────────────────────────────────────────────────────────
// INTERNAL RECIPE (storage representation)
// ─────────────────────────────────────────────────────────────────────────────

/// Internal recipe representation for database rows
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecipe {
    pub id: i64,
    pub title: String,
    pub image: Option<String>,
    pub total_time: Option<i64>,
    pub yields: Option<String>,
    pub url: Option<String>,
}

impl StoredRecipe {
    /// Convert to a public summary. `matched_ings` is `None` on the
    /// unranked fallback path, where no term matching happened.
    pub fn to_summary(&self, total_ings: u32, matched_ings: Option<u32>) -> RecipeSummary {
        RecipeSummary {
            id: self.id,
            title: self.title.clone(),
            image: self.image.clone(),
            total_time: self.total_time,
            yields: self.yields.clone(),
            total_ings,
            matched_ings,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// WRITE-SIDE INPUT
// ─────────────────────────────────────────────────────────────────────────────

/// One ingredient line of an incoming recipe: the canonical vocabulary
/// name plus the original wording ("2 large eggs").
#[derive(Debug, Clone, PartialEq)]
pub struct NewIngredient {
    pub name: String,
    pub raw: String,
}

impl NewIngredient {
    pub fn new(name: impl Into<String>, raw: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            raw: raw.into(),
        }
    }
}

/// An incoming recipe with its ingredient lines
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NewRecipe {
    pub title: String,
    pub image: Option<String>,
    pub total_time: Option<i64>,
    pub yields: Option<String>,
    pub url: Option<String>,
    pub ingredients: Vec<NewIngredient>,
}

impl NewRecipe {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Self::default()
        }
    }

    pub fn with_ingredient(mut self, name: impl Into<String>, raw: impl Into<String>) -> Self {
        self.ingredients.push(NewIngredient::new(name, raw));
        self
    }
}
