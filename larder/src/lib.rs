//! Larder - recipe search core ranked by ingredient coverage
//!
//! This library implements the ingredient-term matching and recipe-ranking
//! engine behind a "what can I cook with what I have" search: raw user
//! text is normalized into terms, resolved against a fuzzy ingredient
//! vocabulary by substring match, and every candidate recipe is scored by
//! how much of it the user's ingredients cover.

pub mod database;
pub mod interface;
pub mod models;
pub mod ranking;
pub mod search;
mod store;

pub use interface::*;
pub use store::{RecipeStore, DEFAULT_PAGE, DEFAULT_PER_PAGE};
