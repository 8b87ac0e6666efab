use coffee_catalog::model::types::{FilterHit, IngredientMap, Recipe};
use coffee_catalog::search::{CatalogQuery, CoffeeFilters, NotFound};
use coffee_catalog::storage::MemoryStore;
use serde_json::json;

mod util;
use util::fixture_recipes;

fn filters(category: Option<&str>, name: Option<&str>, size: Option<&str>) -> CoffeeFilters {
    CoffeeFilters::from_params(
        category.map(str::to_string),
        name.map(str::to_string),
        size.map(str::to_string),
    )
}

#[test]
fn names_keep_store_order() {
    let recipes = fixture_recipes();
    let query = CatalogQuery::new(&recipes);
    insta::assert_json_snapshot!(query.list_names(), @r###"
    [
      "Espresso",
      "Iced Latte",
      "Frappuccino",
      "Irish Coffee"
    ]
    "###);
}

#[test]
fn categories_compare_as_a_set() {
    let recipes = fixture_recipes();
    let query = CatalogQuery::new(&recipes);
    let mut categories = query.list_categories();
    categories.sort();
    assert_eq!(categories, vec!["cold", "espresso", "traditional"]);
}

#[test]
fn category_lookup_is_case_insensitive() {
    let recipes = fixture_recipes();
    let query = CatalogQuery::new(&recipes);
    assert_eq!(
        query.names_in_category("COLD").unwrap(),
        vec!["Iced Latte", "Frappuccino"]
    );
    assert_eq!(query.names_in_category("tea"), Err(NotFound::Category));
}

#[test]
fn declared_sizes_do_not_drive_availability() {
    let recipes = fixture_recipes();
    let query = CatalogQuery::new(&recipes);
    // Iced Latte declares "medium" but has no ingredients for it.
    assert_eq!(query.sizes_for("iced_latte").unwrap(), vec!["small", "large"]);
    assert_eq!(
        query.ingredients_for("Iced Latte", "medium"),
        Err(NotFound::Size)
    );
}

#[test]
fn legacy_single_size_recipe_is_queryable() {
    let recipes = fixture_recipes();
    let query = CatalogQuery::new(&recipes);
    assert_eq!(query.sizes_for("IRISH COFFEE").unwrap(), vec!["medium"]);
    insta::assert_json_snapshot!(query.ingredients_for("irish coffee", "MEDIUM").unwrap(), @r###"
    {
      "coffee_ml": 120,
      "whiskey_ml": 40,
      "cream": "to top"
    }
    "###);
    assert_eq!(
        query.final_volume_for("irish_coffee", "medium"),
        Ok(&json!("200ml"))
    );
    assert!(query.steps_for("irish coffee").unwrap().is_empty());
}

#[test]
fn legacy_steps_are_numbered() {
    let recipes = fixture_recipes();
    let query = CatalogQuery::new(&recipes);
    let steps = query.steps_for("frappuccino").unwrap();
    assert_eq!(steps.len(), 1);
    assert_eq!(steps[0].step_number, 1);
    assert_eq!(steps[0].title, "Blend");
}

#[test]
fn coffee_not_found_is_reported_before_size() {
    let recipes = fixture_recipes();
    let query = CatalogQuery::new(&recipes);
    assert_eq!(
        query.ingredients_for("mocha", "gigantic"),
        Err(NotFound::Coffee)
    );
    assert_eq!(NotFound::Coffee.to_string(), "Coffee not found");
    assert_eq!(NotFound::Size.to_string(), "Size not available");
}

#[test]
fn zero_volume_is_reported_as_missing() {
    let recipes = fixture_recipes();
    let query = CatalogQuery::new(&recipes);
    assert_eq!(query.final_volume_for("iced latte", "small"), Ok(&json!(250)));
    // Stored as 0 and therefore indistinguishable from an absent size.
    assert_eq!(
        query.final_volume_for("iced latte", "large"),
        Err(NotFound::Size)
    );
}

#[test]
fn every_recipe_resolves_by_its_own_name() {
    let recipes = fixture_recipes();
    let query = CatalogQuery::new(&recipes);
    for recipe in &recipes {
        assert_eq!(query.find_by_name(&recipe.name).unwrap(), recipe);
    }
}

#[test]
fn filter_without_criteria_returns_catalog() {
    let recipes = fixture_recipes();
    let query = CatalogQuery::new(&recipes);
    let hits = query.filter(&CoffeeFilters::default()).unwrap();
    let expected: Vec<FilterHit> = recipes.iter().cloned().map(FilterHit::Full).collect();
    assert_eq!(hits, expected);
}

#[test]
fn filter_by_size_projects_every_hit() {
    let recipes = fixture_recipes();
    let query = CatalogQuery::new(&recipes);

    for size in ["small", "medium", "large", "LARGE"] {
        let hits = query.filter(&filters(None, None, Some(size))).unwrap();
        let wanted = size.to_lowercase();
        for hit in &hits {
            let FilterHit::Projected(projected) = hit else {
                panic!("size filter returned an unprojected record");
            };
            assert_eq!(projected.size_selected, wanted);
            let source = query.find_by_name(&projected.name).unwrap();
            assert_eq!(&projected.ingredients, &source.ingredients[&wanted]);
        }
    }
}

#[test]
fn sample_filters_match_expected_coffees() {
    let recipes = fixture_recipes();
    let query = CatalogQuery::new(&recipes);
    let names = |f: CoffeeFilters| -> Vec<String> {
        query
            .filter(&f)
            .unwrap()
            .iter()
            .map(|h| h.name().to_string())
            .collect()
    };

    assert_eq!(names(filters(Some("espresso"), None, None)), vec!["Espresso"]);
    assert_eq!(
        names(filters(Some("cold"), None, Some("medium"))),
        vec!["Frappuccino"]
    );
    assert_eq!(names(filters(None, Some("frappuccino"), None)), vec!["Frappuccino"]);
    assert_eq!(
        names(filters(Some("traditional"), Some("irish_coffee"), None)),
        vec!["Irish Coffee"]
    );
    assert_eq!(names(filters(None, None, Some("small"))), vec!["Iced Latte"]);
    assert_eq!(
        query.filter(&filters(Some("traditional"), None, Some("small"))),
        Err(NotFound::NoMatches)
    );
}

#[test]
fn iced_latte_example() {
    let recipe: Recipe = serde_json::from_value(json!({
        "name": "Iced Latte",
        "category": "Cold",
        "ingredients": {
            "small": {"espresso": 1, "milk": 200},
            "large": {"espresso": 2, "milk": 300}
        }
    }))
    .unwrap();
    let store = MemoryStore::new(vec![recipe]);
    let query = CatalogQuery::from_store(&store);

    let small: IngredientMap = serde_json::from_value(json!({"espresso": 1, "milk": 200})).unwrap();
    assert_eq!(query.ingredients_for("iced latte", "SMALL"), Ok(&small));
    assert_eq!(
        query.ingredients_for("iced latte", "medium"),
        Err(NotFound::Size)
    );
    assert!(query.names_in_category("cold").unwrap().contains(&"Iced Latte"));

    let hits = query.filter(&filters(Some("cold"), None, Some("large"))).unwrap();
    assert_eq!(
        serde_json::to_value(&hits).unwrap()[0],
        json!({
            "name": "Iced Latte",
            "category": "Cold",
            "sizes": [],
            "ingredients": {"espresso": 2, "milk": 300},
            "final_volume": {},
            "steps": [],
            "size_selected": "large"
        })
    );
}

#[test]
fn empty_catalog_filter_is_not_found() {
    let store = MemoryStore::default();
    let query = CatalogQuery::from_store(&store);
    let err = query.filter(&CoffeeFilters::default()).unwrap_err();
    assert_eq!(err.to_string(), "No matching coffees found");
    assert!(query.all().is_empty());
    assert!(query.list_names().is_empty());
}
