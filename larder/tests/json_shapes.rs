//! Wire-format tests: the serialized result types must stay bit-exact
//! with the JSON existing clients already parse.

use larder::models::NewRecipe;
use larder::{RecipeStore, RecipeStoreApi};
use serde_json::json;

fn seeded_store() -> RecipeStore {
    let store = RecipeStore::new_in_memory().unwrap();
    store
        .save_recipe(NewRecipe {
            title: "Pasta Carbonara".to_string(),
            image: Some("https://example.com/carbo.jpg".to_string()),
            total_time: Some(20),
            yields: Some("2 servings".to_string()),
            url: Some("https://example.com/carbonara".to_string()),
            ingredients: vec![],
        })
        .unwrap();
    store
}

#[tokio::test]
async fn page_result_shape() {
    let store = seeded_store();
    store
        .save_recipe(
            NewRecipe::new("Salted caramel")
                .with_ingredient("salt", "a pinch of salt")
                .with_ingredient("sugar", "200g sugar"),
        )
        .unwrap();

    let page = store.search("salt".to_string(), 1, 20).await.unwrap();

    assert_eq!(
        serde_json::to_value(&page).unwrap(),
        json!({
            "recipes": [
                {
                    "id": 2,
                    "title": "Salted caramel",
                    "image": null,
                    "total_time": null,
                    "yields": null,
                    "total_ings": 2,
                    "matched_ings": 1
                }
            ],
            "pagination": {
                "page": 1,
                "per_page": 20,
                "total_count": 1,
                "has_next_page": false
            }
        })
    );
}

#[tokio::test]
async fn recipe_summary_field_order_is_stable() {
    let store = seeded_store();
    store
        .save_recipe(NewRecipe::new("Brine").with_ingredient("salt", "1 tbsp salt"))
        .unwrap();

    let page = store.search("salt".to_string(), 1, 20).await.unwrap();
    let text = serde_json::to_string(&page.recipes[0]).unwrap();
    assert_eq!(
        text,
        r#"{"id":2,"title":"Brine","image":null,"total_time":null,"yields":null,"total_ings":1,"matched_ings":1}"#
    );
}

#[tokio::test]
async fn fallback_serializes_matched_ings_as_null() {
    let store = seeded_store();

    let page = store.search("".to_string(), 1, 20).await.unwrap();
    let value = serde_json::to_value(&page).unwrap();
    assert_eq!(value["recipes"][0]["matched_ings"], json!(null));
    assert_eq!(value["recipes"][0]["total_ings"], json!(0));
}

#[test]
fn recipe_detail_shape() {
    let store = RecipeStore::new_in_memory().unwrap();
    store
        .save_recipe(NewRecipe {
            title: "Shakshuka".to_string(),
            image: Some("https://example.com/shak.jpg".to_string()),
            total_time: Some(25),
            yields: Some("2 servings".to_string()),
            url: Some("https://example.com/shakshuka".to_string()),
            ingredients: vec![],
        })
        .unwrap();
    let id = store
        .save_recipe(
            NewRecipe::new("Herby eggs")
                .with_ingredient("egg", "2 eggs")
                .with_ingredient("tomato", "1 can crushed tomatoes"),
        )
        .unwrap();

    let detail = store.detail(id).unwrap();
    assert_eq!(
        serde_json::to_value(&detail).unwrap(),
        json!({
            "id": 2,
            "title": "Herby eggs",
            "total_time": null,
            "yields": null,
            "image": null,
            "url": null,
            "ingredients": [
                { "id": 1, "name": "egg", "raw": "2 eggs" },
                { "id": 2, "name": "tomato", "raw": "1 can crushed tomatoes" }
            ]
        })
    );
}

#[test]
fn pantry_item_shape() {
    let store = RecipeStore::new_in_memory().unwrap();
    let item = store.add_pantry_item("Olive Oil".to_string()).unwrap();
    assert_eq!(
        serde_json::to_value(&item).unwrap(),
        json!({ "id": 1, "name": "olive oil" })
    );
}
