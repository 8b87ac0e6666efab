//! Lookups and the multi-criterion filter over a recipe snapshot.
//!
//! Every operation is a pure function of the snapshot and its inputs. Failures
//! surface as [`NotFound`], whose message is the reason shown to clients.

use indexmap::IndexMap;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::model::types::{FilterHit, IngredientMap, ProjectedRecipe, Recipe, RecipeStep};
use crate::search::normalize::{is_falsy, normalize_key, normalize_name};
use crate::storage::RecipeStore;

/// The single client-facing failure kind. Display text is stable.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFound {
    #[error("Coffee not found")]
    Coffee,

    #[error("Size not available")]
    Size,

    #[error("Category not found")]
    Category,

    #[error("No matching coffees found")]
    NoMatches,
}

/// Optional criteria for [`CatalogQuery::filter`]. `None` means "not supplied".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoffeeFilters {
    pub category: Option<String>,
    pub name: Option<String>,
    pub size: Option<String>,
}

impl CoffeeFilters {
    /// Build filters from raw request values, treating empty strings as absent.
    pub fn from_params(
        category: Option<String>,
        name: Option<String>,
        size: Option<String>,
    ) -> Self {
        Self {
            category: category.filter(|v| !v.is_empty()),
            name: name.filter(|v| !v.is_empty()),
            size: size.filter(|v| !v.is_empty()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.category.is_none() && self.name.is_none() && self.size.is_none()
    }
}

/// Read-only query view over a store's snapshot.
#[derive(Debug, Clone, Copy)]
pub struct CatalogQuery<'a> {
    recipes: &'a [Recipe],
}

impl<'a> CatalogQuery<'a> {
    pub fn new(recipes: &'a [Recipe]) -> Self {
        Self { recipes }
    }

    pub fn from_store<S: RecipeStore + ?Sized>(store: &'a S) -> Self {
        Self::new(store.all())
    }

    /// Full collection in store order. Never fails; an empty catalog is a valid answer.
    pub fn all(&self) -> &'a [Recipe] {
        self.recipes
    }

    pub fn list_names(&self) -> Vec<&'a str> {
        self.recipes.iter().map(|r| r.name.as_str()).collect()
    }

    /// Distinct lowercase categories in first-seen order.
    pub fn list_categories(&self) -> Vec<String> {
        let mut seen = Vec::new();
        for recipe in self.recipes {
            let category = normalize_key(&recipe.category);
            if !seen.contains(&category) {
                seen.push(category);
            }
        }
        seen
    }

    /// Unknown categories and empty ones are not distinguished.
    pub fn names_in_category(&self, category: &str) -> Result<Vec<&'a str>, NotFound> {
        let wanted = normalize_key(category);
        let names: Vec<&str> = self
            .recipes
            .iter()
            .filter(|r| normalize_key(&r.category) == wanted)
            .map(|r| r.name.as_str())
            .collect();
        if names.is_empty() {
            return Err(NotFound::Category);
        }
        Ok(names)
    }

    /// First recipe whose normalized name matches.
    pub fn find_by_name(&self, coffee_name: &str) -> Result<&'a Recipe, NotFound> {
        let wanted = normalize_name(coffee_name);
        self.recipes
            .iter()
            .find(|r| normalize_name(&r.name) == wanted)
            .ok_or(NotFound::Coffee)
    }

    /// Sizes that have ingredient data, in stored order.
    pub fn sizes_for(&self, coffee_name: &str) -> Result<Vec<&'a str>, NotFound> {
        let recipe = self.find_by_name(coffee_name)?;
        Ok(recipe.ingredients.keys().map(String::as_str).collect())
    }

    /// The coffee is resolved before the size, so an unknown coffee always
    /// reports [`NotFound::Coffee`].
    pub fn ingredients_for(
        &self,
        coffee_name: &str,
        size: &str,
    ) -> Result<&'a IngredientMap, NotFound> {
        let recipe = self.find_by_name(coffee_name)?;
        size_entry(&recipe.ingredients, &normalize_key(size)).ok_or(NotFound::Size)
    }

    pub fn steps_for(&self, coffee_name: &str) -> Result<&'a [RecipeStep], NotFound> {
        Ok(&self.find_by_name(coffee_name)?.steps)
    }

    /// A falsy stored volume (`0`, `""`, `null`) is reported as not available.
    pub fn final_volume_for(&self, coffee_name: &str, size: &str) -> Result<&'a Value, NotFound> {
        let recipe = self.find_by_name(coffee_name)?;
        size_entry(&recipe.final_volume, &normalize_key(size))
            .filter(|v| !is_falsy(v))
            .ok_or(NotFound::Size)
    }

    /// Apply category, then name, then size. The size criterion projects each
    /// survivor down to that size's ingredients and drops recipes without it.
    pub fn filter(&self, filters: &CoffeeFilters) -> Result<Vec<FilterHit>, NotFound> {
        let category = filters.category.as_deref().map(normalize_key);
        let name = filters.name.as_deref().map(normalize_name);
        let size = filters.size.as_deref().map(normalize_key);

        let survivors = self.recipes.iter().filter(|r| {
            category
                .as_ref()
                .is_none_or(|c| normalize_key(&r.category) == *c)
                && name.as_ref().is_none_or(|n| normalize_name(&r.name) == *n)
        });

        let hits: Vec<FilterHit> = match size {
            None => survivors.cloned().map(FilterHit::Full).collect(),
            Some(size) => survivors
                .filter_map(|r| {
                    size_entry(&r.ingredients, &size).map(|ingredients| {
                        FilterHit::Projected(ProjectedRecipe::new(
                            r,
                            ingredients.clone(),
                            size.clone(),
                        ))
                    })
                })
                .collect(),
        };

        debug!(?filters, matches = hits.len(), "filter");
        if hits.is_empty() {
            return Err(NotFound::NoMatches);
        }
        Ok(hits)
    }
}

fn size_entry<'m, V>(map: &'m IndexMap<String, V>, size_key: &str) -> Option<&'m V> {
    map.iter()
        .find(|(label, _)| normalize_key(label) == size_key)
        .map(|(_, value)| value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ingredients(pairs: &[(&str, Value)]) -> IngredientMap {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), v.clone()))
            .collect()
    }

    fn iced_latte() -> Recipe {
        Recipe {
            name: "Iced Latte".into(),
            category: "Cold".into(),
            notes: None,
            sizes: vec!["small".into(), "medium".into(), "large".into()],
            ingredients: [
                (
                    "small".to_string(),
                    ingredients(&[("espresso", json!(1)), ("milk", json!(200))]),
                ),
                (
                    "large".to_string(),
                    ingredients(&[("espresso", json!(2)), ("milk", json!(300))]),
                ),
            ]
            .into_iter()
            .collect(),
            final_volume: [
                ("small".to_string(), json!(250)),
                ("large".to_string(), json!(0)),
            ]
            .into_iter()
            .collect(),
            steps: vec![RecipeStep {
                step_number: 1,
                title: "Pull".into(),
                description: "Pull the shots over ice.".into(),
            }],
        }
    }

    fn espresso() -> Recipe {
        Recipe {
            name: "Espresso".into(),
            category: "espresso".into(),
            notes: Some("Short and strong".into()),
            sizes: vec!["single".into()],
            ingredients: [(
                "single".to_string(),
                ingredients(&[("coffee_grams", json!(18))]),
            )]
            .into_iter()
            .collect(),
            final_volume: [("single".to_string(), json!("30ml"))].into_iter().collect(),
            steps: Vec::new(),
        }
    }

    fn catalog() -> Vec<Recipe> {
        vec![espresso(), iced_latte()]
    }

    #[test]
    fn ingredients_resolve_case_and_space_insensitively() {
        let recipes = catalog();
        let q = CatalogQuery::new(&recipes);
        let got = q.ingredients_for("iced latte", "SMALL").unwrap();
        assert_eq!(got["espresso"], json!(1));
        assert_eq!(got["milk"], json!(200));
        assert_eq!(q.ingredients_for("iced latte", "medium"), Err(NotFound::Size));
    }

    #[test]
    fn unknown_coffee_wins_over_unknown_size() {
        let recipes = catalog();
        let q = CatalogQuery::new(&recipes);
        assert_eq!(q.ingredients_for("mocha", "huge"), Err(NotFound::Coffee));
        assert_eq!(q.final_volume_for("mocha", "huge"), Err(NotFound::Coffee));
    }

    #[test]
    fn sizes_come_from_ingredient_keys() {
        let recipes = catalog();
        let q = CatalogQuery::new(&recipes);
        assert_eq!(q.sizes_for("Iced_Latte").unwrap(), vec!["small", "large"]);
        assert_eq!(q.sizes_for("latte"), Err(NotFound::Coffee));
    }

    #[test]
    fn sizes_empty_when_no_ingredient_data() {
        let mut bare = espresso();
        bare.ingredients.clear();
        let recipes = vec![bare];
        let q = CatalogQuery::new(&recipes);
        assert!(q.sizes_for("espresso").unwrap().is_empty());
    }

    #[test]
    fn categories_collapse_case() {
        let mut hot = iced_latte();
        hot.name = "Cold Brew".into();
        hot.category = "COLD".into();
        let recipes = vec![espresso(), iced_latte(), hot];
        let q = CatalogQuery::new(&recipes);
        let mut cats = q.list_categories();
        cats.sort();
        assert_eq!(cats, vec!["cold".to_string(), "espresso".to_string()]);
        assert_eq!(
            q.names_in_category("cold").unwrap(),
            vec!["Iced Latte", "Cold Brew"]
        );
        assert_eq!(q.names_in_category("tea"), Err(NotFound::Category));
    }

    #[test]
    fn steps_empty_is_not_an_error() {
        let recipes = catalog();
        let q = CatalogQuery::new(&recipes);
        assert!(q.steps_for("espresso").unwrap().is_empty());
        assert_eq!(q.steps_for("iced latte").unwrap()[0].title, "Pull");
        assert_eq!(q.steps_for("nope"), Err(NotFound::Coffee));
    }

    #[test]
    fn zero_final_volume_reads_as_missing() {
        let recipes = catalog();
        let q = CatalogQuery::new(&recipes);
        assert_eq!(q.final_volume_for("Iced Latte", "small"), Ok(&json!(250)));
        // Stored as 0: indistinguishable from an absent entry.
        assert_eq!(q.final_volume_for("Iced Latte", "large"), Err(NotFound::Size));
        assert_eq!(q.final_volume_for("Iced Latte", "medium"), Err(NotFound::Size));
    }

    #[test]
    fn find_by_name_round_trips_every_recipe() {
        let recipes = catalog();
        let q = CatalogQuery::new(&recipes);
        for recipe in &recipes {
            assert_eq!(q.find_by_name(&recipe.name).unwrap(), recipe);
        }
    }

    #[test]
    fn duplicate_names_resolve_to_first() {
        let mut second = espresso();
        second.category = "Traditional".into();
        let recipes = vec![espresso(), second];
        let q = CatalogQuery::new(&recipes);
        assert_eq!(q.find_by_name("ESPRESSO").unwrap().category, "espresso");
    }

    #[test]
    fn filter_without_criteria_returns_everything() {
        let recipes = catalog();
        let q = CatalogQuery::new(&recipes);
        let hits = q.filter(&CoffeeFilters::default()).unwrap();
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| matches!(h, FilterHit::Full(_))));
    }

    #[test]
    fn filter_on_empty_catalog_is_not_found() {
        let q = CatalogQuery::new(&[]);
        assert_eq!(
            q.filter(&CoffeeFilters::default()),
            Err(NotFound::NoMatches)
        );
    }

    #[test]
    fn filter_size_projects_ingredients() {
        let recipes = catalog();
        let q = CatalogQuery::new(&recipes);
        let filters = CoffeeFilters {
            category: Some("cold".into()),
            size: Some("Large".into()),
            ..Default::default()
        };
        let hits = q.filter(&filters).unwrap();
        assert_eq!(hits.len(), 1);
        let FilterHit::Projected(hit) = &hits[0] else {
            panic!("expected projection");
        };
        assert_eq!(hit.size_selected, "large");
        assert_eq!(
            hit.ingredients,
            ingredients(&[("espresso", json!(2)), ("milk", json!(300))])
        );
    }

    #[test]
    fn filter_size_drops_recipes_without_that_size() {
        let recipes = catalog();
        let q = CatalogQuery::new(&recipes);
        let filters = CoffeeFilters::from_params(None, None, Some("small".into()));
        let hits = q.filter(&filters).unwrap();
        assert_eq!(hits.iter().map(FilterHit::name).collect::<Vec<_>>(), vec!["Iced Latte"]);
        assert!(hits.iter().all(|h| h.size_selected() == Some("small")));
    }

    #[test]
    fn filter_criteria_are_anded() {
        let recipes = catalog();
        let q = CatalogQuery::new(&recipes);
        let filters = CoffeeFilters::from_params(
            Some("espresso".into()),
            Some("iced latte".into()),
            None,
        );
        assert_eq!(q.filter(&filters), Err(NotFound::NoMatches));
    }

    #[test]
    fn empty_params_are_ignored() {
        let filters = CoffeeFilters::from_params(Some(String::new()), None, Some(String::new()));
        assert!(filters.is_empty());
    }
}
