//! SQLite database layer for recipe storage
//!
//! Normalized schema: `recipes` + `ingredients` vocabulary +
//! `recipe_ingredients` join rows carrying the original wording.
//! Uses r2d2 connection pooling so concurrent read-only searches take
//! independent connections without mutex blocking.

use crate::interface::{IngredientLine, PantryItem};
use crate::models::{NewRecipe, StoredRecipe};
use chrono::Utc;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension, Transaction};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
}

pub type DatabaseResult<T> = Result<T, DatabaseError>;

/// Format used for `created_at` columns.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Thread-safe database wrapper using connection pooling
///
/// WAL mode enables readers to proceed without blocking each other; the
/// search pipeline only ever reads.
pub struct Database {
    pool: Pool<SqliteConnectionManager>,
}

impl Database {
    /// Open or create a database at the given path with connection pooling
    pub fn open<P: AsRef<Path>>(path: P) -> DatabaseResult<Self> {
        let manager = SqliteConnectionManager::file(path).with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode=WAL;
                PRAGMA synchronous=NORMAL;
                PRAGMA foreign_keys=ON;
                PRAGMA mmap_size=67108864;
                PRAGMA cache_size=-32000;
            ",
            )?;
            Ok(())
        });

        let pool = Pool::builder().max_size(8).build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    /// Open an in-memory database (for testing and benches)
    pub fn open_in_memory() -> DatabaseResult<Self> {
        let manager = SqliteConnectionManager::memory().with_init(|conn| {
            conn.execute_batch(
                "
                PRAGMA journal_mode=WAL;
                PRAGMA synchronous=NORMAL;
                PRAGMA foreign_keys=ON;
            ",
            )?;
            Ok(())
        });

        // In-memory needs a single connection to maintain state
        let pool = Pool::builder().max_size(1).build(manager)?;

        let db = Self { pool };
        db.setup_schema()?;
        Ok(db)
    }

    /// Get a connection from the pool
    fn get_conn(&self) -> DatabaseResult<PooledConnection<SqliteConnectionManager>> {
        Ok(self.pool.get()?)
    }

    /// Set up the database schema
    fn setup_schema(&self) -> DatabaseResult<()> {
        let conn = self.get_conn()?;

        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS recipes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                total_time INTEGER,
                yields TEXT,
                image TEXT,
                url TEXT,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS ingredients (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_ingredients_lower_name
                ON ingredients(lower(name));

            CREATE TABLE IF NOT EXISTS recipe_ingredients (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                ingredient_id INTEGER NOT NULL REFERENCES ingredients(id),
                raw_text TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_recipe_ingredients_recipe
                ON recipe_ingredients(recipe_id);
            CREATE INDEX IF NOT EXISTS idx_recipe_ingredients_ingredient
                ON recipe_ingredients(ingredient_id);

            CREATE TABLE IF NOT EXISTS pantry_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_pantry_items_lower_name
                ON pantry_items(lower(name));
            "#,
        )?;

        Ok(())
    }

    /// Get the database size in bytes
    pub fn database_size(&self) -> DatabaseResult<i64> {
        let conn = self.get_conn()?;
        let page_count: i64 = conn.query_row("PRAGMA page_count", [], |row| row.get(0))?;
        let page_size: i64 = conn.query_row("PRAGMA page_size", [], |row| row.get(0))?;
        Ok(page_count * page_size)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Writes
    // ─────────────────────────────────────────────────────────────────────────────

    /// Insert a recipe with its ingredient lines in one transaction.
    /// Ingredients are matched case-insensitively against the vocabulary
    /// and created on first use. Returns the new recipe id.
    pub fn insert_recipe(&self, recipe: &NewRecipe) -> DatabaseResult<i64> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        let created_at = Utc::now().format(TIMESTAMP_FORMAT).to_string();

        tx.execute(
            r#"
            INSERT INTO recipes (title, total_time, yields, image, url, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                recipe.title,
                recipe.total_time,
                recipe.yields,
                recipe.image,
                recipe.url,
                created_at,
            ],
        )?;
        let recipe_id = tx.last_insert_rowid();

        for line in &recipe.ingredients {
            let ingredient_id = Self::find_or_create_ingredient(&tx, &line.name)?;
            tx.execute(
                "INSERT INTO recipe_ingredients (recipe_id, ingredient_id, raw_text) VALUES (?1, ?2, ?3)",
                params![recipe_id, ingredient_id, line.raw],
            )?;
        }

        tx.commit()?;
        Ok(recipe_id)
    }

    /// Look up an ingredient by lowercased name, creating it if absent.
    /// The stored name keeps its original casing; uniqueness is enforced
    /// by the `lower(name)` index.
    fn find_or_create_ingredient(tx: &Transaction, name: &str) -> rusqlite::Result<i64> {
        let trimmed = name.trim();
        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM ingredients WHERE lower(name) = lower(?1)",
                [trimmed],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }
        tx.execute("INSERT INTO ingredients (name) VALUES (?1)", [trimmed])?;
        Ok(tx.last_insert_rowid())
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Term resolution
    // ─────────────────────────────────────────────────────────────────────────────

    /// Ingredient ids whose name contains `term` as a case-insensitive
    /// substring, ascending. This approximates fuzzy matching against the
    /// un-normalized vocabulary ("eggs", "large egg", "1 egg" all match
    /// the term "egg").
    pub fn ingredient_ids_matching(&self, term: &str) -> DatabaseResult<Vec<i64>> {
        let conn = self.get_conn()?;
        let pattern = format!(
            "%{}%",
            term.to_lowercase().replace('%', "\\%").replace('_', "\\_")
        );
        let mut stmt = conn.prepare(
            r#"SELECT id FROM ingredients WHERE lower(name) LIKE ?1 ESCAPE '\' ORDER BY id"#,
        )?;
        let ids: Vec<i64> = stmt
            .query_map([pattern], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Candidate loading
    // ─────────────────────────────────────────────────────────────────────────────

    /// Phase 1 of the candidate load: every recipe referencing at least
    /// one of the given ingredient ids (any overlap qualifies), ascending.
    pub fn candidate_recipe_ids(&self, ingredient_ids: &[i64]) -> DatabaseResult<Vec<i64>> {
        if ingredient_ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;
        let placeholders = ingredient_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT DISTINCT recipe_id FROM recipe_ingredients
             WHERE ingredient_id IN ({}) ORDER BY recipe_id",
            placeholders
        );

        let mut stmt = conn.prepare(&sql)?;
        let params: Vec<rusqlite::types::Value> =
            ingredient_ids.iter().map(|&id| id.into()).collect();
        let ids: Vec<i64> = stmt
            .query_map(rusqlite::params_from_iter(params), |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    /// Phase 2 of the candidate load: all join rows for the given recipes
    /// in one batch, grouped by recipe with ingredient ids deduplicated.
    /// Duplicate `(recipe_id, ingredient_id)` rows collapse here so the
    /// scorer only ever sees distinct ids.
    pub fn ingredient_ids_by_recipe(
        &self,
        recipe_ids: &[i64],
    ) -> DatabaseResult<HashMap<i64, Vec<i64>>> {
        if recipe_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let conn = self.get_conn()?;
        let placeholders = recipe_ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT recipe_id, ingredient_id FROM recipe_ingredients WHERE recipe_id IN ({})",
            placeholders
        );

        let mut stmt = conn.prepare(&sql)?;
        let params: Vec<rusqlite::types::Value> = recipe_ids.iter().map(|&id| id.into()).collect();
        let rows: Vec<(i64, i64)> = stmt
            .query_map(rusqlite::params_from_iter(params), |row| {
                Ok((row.get(0)?, row.get(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut grouped: HashMap<i64, Vec<i64>> = HashMap::new();
        for (recipe_id, ingredient_id) in rows {
            grouped.entry(recipe_id).or_default().push(ingredient_id);
        }
        for ids in grouped.values_mut() {
            ids.sort_unstable();
            ids.dedup();
        }

        Ok(grouped)
    }

    /// Fetch recipes by ids, preserving the order of the input ids
    pub fn fetch_recipes_by_ids(&self, ids: &[i64]) -> DatabaseResult<Vec<StoredRecipe>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let conn = self.get_conn()?;
        let placeholders = ids.iter().map(|_| "?").collect::<Vec<_>>().join(",");
        let sql = format!(
            "SELECT id, title, total_time, yields, image, url FROM recipes WHERE id IN ({})",
            placeholders
        );

        let mut stmt = conn.prepare(&sql)?;
        let params: Vec<rusqlite::types::Value> = ids.iter().map(|&id| id.into()).collect();
        let recipes: Vec<StoredRecipe> = stmt
            .query_map(rusqlite::params_from_iter(params), Self::row_to_recipe)?
            .collect::<Result<Vec<_>, _>>()?;

        // Re-sort to match input id order
        let by_id: HashMap<i64, StoredRecipe> =
            recipes.into_iter().map(|r| (r.id, r)).collect();

        Ok(ids.iter().filter_map(|id| by_id.get(id).cloned()).collect())
    }

    /// Unranked fallback listing: the first `limit` recipes by id, each
    /// with its distinct ingredient count.
    pub fn fallback_recipes(&self, limit: usize) -> DatabaseResult<Vec<(StoredRecipe, u32)>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT r.id, r.title, r.total_time, r.yields, r.image, r.url,
                   COUNT(DISTINCT ri.ingredient_id)
            FROM recipes r
            LEFT JOIN recipe_ingredients ri ON ri.recipe_id = r.id
            GROUP BY r.id
            ORDER BY r.id
            LIMIT ?1
            "#,
        )?;
        let rows: Vec<(StoredRecipe, u32)> = stmt
            .query_map([limit as i64], |row| {
                Ok((Self::row_to_recipe(row)?, row.get::<_, i64>(6)? as u32))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Detail
    // ─────────────────────────────────────────────────────────────────────────────

    /// Fetch a single recipe row
    pub fn fetch_recipe(&self, id: i64) -> DatabaseResult<Option<StoredRecipe>> {
        let conn = self.get_conn()?;
        let recipe = conn
            .query_row(
                "SELECT id, title, total_time, yields, image, url FROM recipes WHERE id = ?1",
                [id],
                Self::row_to_recipe,
            )
            .optional()?;
        Ok(recipe)
    }

    /// All ingredient lines of a recipe in join-row order, with the
    /// normalized vocabulary name and the original wording.
    pub fn ingredient_lines_for_recipe(&self, recipe_id: i64) -> DatabaseResult<Vec<IngredientLine>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT ri.ingredient_id, i.name, ri.raw_text
            FROM recipe_ingredients ri
            JOIN ingredients i ON i.id = ri.ingredient_id
            WHERE ri.recipe_id = ?1
            ORDER BY ri.id
            "#,
        )?;
        let lines: Vec<IngredientLine> = stmt
            .query_map([recipe_id], |row| {
                Ok(IngredientLine {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    raw: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lines)
    }

    /// Number of recipes in the store
    pub fn count_recipes(&self) -> DatabaseResult<u64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM recipes", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Pantry
    // ─────────────────────────────────────────────────────────────────────────────

    /// All pantry entries ordered by name
    pub fn pantry_items(&self) -> DatabaseResult<Vec<PantryItem>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT id, name FROM pantry_items ORDER BY name")?;
        let items: Vec<PantryItem> = stmt
            .query_map([], |row| {
                Ok(PantryItem {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    /// Pantry names ordered by name, for merging into a search
    pub fn pantry_names(&self) -> DatabaseResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT name FROM pantry_items ORDER BY name")?;
        let names: Vec<String> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(names)
    }

    /// Insert a pantry entry (already trimmed and lowercased by the
    /// caller). Returns the existing row when the name is already saved.
    pub fn add_pantry_item(&self, name: &str) -> DatabaseResult<PantryItem> {
        let conn = self.get_conn()?;

        let existing: Option<PantryItem> = conn
            .query_row(
                "SELECT id, name FROM pantry_items WHERE lower(name) = lower(?1)",
                [name],
                |row| {
                    Ok(PantryItem {
                        id: row.get(0)?,
                        name: row.get(1)?,
                    })
                },
            )
            .optional()?;
        if let Some(item) = existing {
            return Ok(item);
        }

        let created_at = Utc::now().format(TIMESTAMP_FORMAT).to_string();
        conn.execute(
            "INSERT INTO pantry_items (name, created_at) VALUES (?1, ?2)",
            params![name, created_at],
        )?;
        Ok(PantryItem {
            id: conn.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    /// Delete a pantry entry by id. Unknown ids are a no-op.
    pub fn delete_pantry_item(&self, id: i64) -> DatabaseResult<()> {
        let conn = self.get_conn()?;
        conn.execute("DELETE FROM pantry_items WHERE id = ?1", [id])?;
        Ok(())
    }

    /// Convert a database row to a StoredRecipe
    fn row_to_recipe(row: &rusqlite::Row) -> rusqlite::Result<StoredRecipe> {
        Ok(StoredRecipe {
            id: row.get(0)?,
            title: row.get(1)?,
            total_time: row.get(2)?,
            yields: row.get(3)?,
            image: row.get(4)?,
            url: row.get(5)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewRecipe;

    fn seeded_db() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.insert_recipe(
            &NewRecipe::new("Omelette")
                .with_ingredient("egg", "3 eggs")
                .with_ingredient("butter", "a knob of butter"),
        )
        .unwrap();
        db.insert_recipe(
            &NewRecipe::new("Pancakes")
                .with_ingredient("egg", "2 eggs")
                .with_ingredient("flour", "200g flour")
                .with_ingredient("milk", "300ml milk"),
        )
        .unwrap();
        db
    }

    #[test]
    fn test_ingredient_vocabulary_is_case_insensitive_unique() {
        let db = Database::open_in_memory().unwrap();
        let id1 = db
            .insert_recipe(&NewRecipe::new("A").with_ingredient("Egg", "1 Egg"))
            .unwrap();
        let id2 = db
            .insert_recipe(&NewRecipe::new("B").with_ingredient("egg", "2 eggs"))
            .unwrap();
        assert_ne!(id1, id2);

        // Both recipes resolve to the same vocabulary entry
        let ids = db.ingredient_ids_matching("egg").unwrap();
        assert_eq!(ids.len(), 1);
    }

    #[test]
    fn test_substring_matching_is_case_insensitive() {
        let db = seeded_db();
        // "egg" matches the single "egg" vocabulary entry
        assert_eq!(db.ingredient_ids_matching("EGG").unwrap().len(), 1);
        // substring match: "lou" hits "flour"
        assert_eq!(db.ingredient_ids_matching("lou").unwrap().len(), 1);
        assert!(db.ingredient_ids_matching("saffron").unwrap().is_empty());
    }

    #[test]
    fn test_like_wildcards_are_escaped() {
        let db = seeded_db();
        // A literal "%" must not act as a wildcard and match everything
        assert!(db.ingredient_ids_matching("%").unwrap().is_empty());
        assert!(db.ingredient_ids_matching("e_g").unwrap().is_empty());
    }

    #[test]
    fn test_candidate_ids_require_any_overlap() {
        let db = seeded_db();
        let egg_ids = db.ingredient_ids_matching("egg").unwrap();
        let candidates = db.candidate_recipe_ids(&egg_ids).unwrap();
        assert_eq!(candidates.len(), 2);

        let milk_ids = db.ingredient_ids_matching("milk").unwrap();
        let candidates = db.candidate_recipe_ids(&milk_ids).unwrap();
        assert_eq!(candidates.len(), 1);
    }

    #[test]
    fn test_duplicate_join_rows_collapse_per_recipe() {
        let db = Database::open_in_memory().unwrap();
        // Two lines both resolving to the same "salt" vocabulary entry
        let id = db
            .insert_recipe(
                &NewRecipe::new("Brine")
                    .with_ingredient("salt", "1 tbsp salt")
                    .with_ingredient("Salt", "a pinch of salt"),
            )
            .unwrap();

        let grouped = db.ingredient_ids_by_recipe(&[id]).unwrap();
        assert_eq!(grouped[&id].len(), 1);

        // Detail still shows both original lines
        assert_eq!(db.ingredient_lines_for_recipe(id).unwrap().len(), 2);
    }

    #[test]
    fn test_fetch_preserves_input_order() {
        let db = seeded_db();
        let recipes = db.fetch_recipes_by_ids(&[2, 1]).unwrap();
        assert_eq!(recipes[0].title, "Pancakes");
        assert_eq!(recipes[1].title, "Omelette");
    }

    #[test]
    fn test_fallback_counts_distinct_ingredients() {
        let db = seeded_db();
        let rows = db.fallback_recipes(100).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].0.title, "Omelette");
        assert_eq!(rows[0].1, 2);
        assert_eq!(rows[1].1, 3);
    }

    #[test]
    fn test_pantry_add_is_idempotent_per_name() {
        let db = Database::open_in_memory().unwrap();
        let first = db.add_pantry_item("salt").unwrap();
        let second = db.add_pantry_item("salt").unwrap();
        assert_eq!(first, second);
        assert_eq!(db.pantry_items().unwrap().len(), 1);

        db.delete_pantry_item(first.id).unwrap();
        assert!(db.pantry_items().unwrap().is_empty());
        // Deleting again is a no-op
        db.delete_pantry_item(first.id).unwrap();
    }
}
