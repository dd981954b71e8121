//! Demo recipe database generator
//!
//! Seeds a SQLite database with a plausible recipe corpus through the real
//! RecipeStore, for manual testing and benches.

use anyhow::{Context, Result};
use clap::Parser;
use larder::models::NewRecipe;
use larder::{RecipeStore, RecipeStoreApi};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Number of recipes to generate
    #[arg(short, long, default_value_t = 500)]
    count: usize,

    /// Path to save the SQLite database
    #[arg(short, long, default_value = "DemoRecipes.sqlite")]
    db_path: String,

    /// RNG seed for reproducible corpora
    #[arg(short, long, default_value_t = 42)]
    seed: u64,
}

const PANTRY_STAPLES: &[&str] = &[
    "salt", "black pepper", "olive oil", "butter", "garlic", "onion",
    "flour", "sugar", "egg", "milk",
];

const FEATURE_INGREDIENTS: &[&str] = &[
    "tomato", "basil", "mozzarella", "chicken breast", "ground beef",
    "rice", "spaghetti", "potato", "carrot", "celery", "mushroom",
    "spinach", "lemon", "parmesan", "cream", "chickpeas", "cumin",
    "paprika", "ginger", "soy sauce", "tofu", "shrimp", "salmon",
    "zucchini", "eggplant", "bell pepper", "thyme", "rosemary",
];

const DISH_FORMS: &[&str] = &[
    "Soup", "Stew", "Salad", "Bake", "Curry", "Stir-fry", "Pasta",
    "Risotto", "Gratin", "Skillet", "Tacos", "Frittata",
];

fn raw_line(rng: &mut StdRng, name: &str) -> String {
    let qty = rng.gen_range(1..=4);
    let unit = ["", "g ", "tbsp ", "cups ", "cloves "][rng.gen_range(0..5)];
    format!("{} {}{}", qty, unit, name)
}

fn generate_recipe(rng: &mut StdRng, n: usize) -> NewRecipe {
    let feature = FEATURE_INGREDIENTS[rng.gen_range(0..FEATURE_INGREDIENTS.len())];
    let form = DISH_FORMS[rng.gen_range(0..DISH_FORMS.len())];

    let mut recipe = NewRecipe::new(format!("{} {} #{}", feature, form, n));
    recipe.total_time = Some(rng.gen_range(10..=120));
    recipe.yields = Some(format!("{} servings", rng.gen_range(1..=6)));
    recipe.url = Some(format!("https://demo.example/recipes/{}", n));

    recipe = recipe.with_ingredient(feature, raw_line(rng, feature));
    let staples = rng.gen_range(2..=5);
    for _ in 0..staples {
        let staple = PANTRY_STAPLES[rng.gen_range(0..PANTRY_STAPLES.len())];
        recipe = recipe.with_ingredient(staple, raw_line(rng, staple));
    }
    let extras = rng.gen_range(0..=3);
    for _ in 0..extras {
        let extra = FEATURE_INGREDIENTS[rng.gen_range(0..FEATURE_INGREDIENTS.len())];
        recipe = recipe.with_ingredient(extra, raw_line(rng, extra));
    }

    recipe
}

fn main() -> Result<()> {
    let args = Args::parse();
    let mut rng = StdRng::seed_from_u64(args.seed);

    let store = RecipeStore::new(args.db_path.clone())
        .with_context(|| format!("opening database at {}", args.db_path))?;

    for n in 1..=args.count {
        let recipe = generate_recipe(&mut rng, n);
        store
            .save_recipe(recipe)
            .with_context(|| format!("saving recipe #{}", n))?;
    }

    println!(
        "Wrote {} recipes to {} ({} bytes)",
        args.count,
        args.db_path,
        store.database_size()
    );
    Ok(())
}
