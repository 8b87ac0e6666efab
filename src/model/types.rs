//! Canonical recipe records shared by every store and by the query layer.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Ingredient name to quantity. Quantities are opaque scalars (`1`, `"30ml"`, ...).
pub type IngredientMap = IndexMap<String, Value>;

/// One coffee beverage.
///
/// Map fields keep insertion order so responses are reproducible across
/// backends. `sizes`, `ingredients` and `final_volume` share a size vocabulary
/// but are not kept in lock-step: a size may appear in one and not the others.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub name: String,
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Declared size labels. Informational only; ingredient keys decide availability.
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub ingredients: IndexMap<String, IngredientMap>,
    #[serde(default)]
    pub final_volume: IndexMap<String, Value>,
    #[serde(default)]
    pub steps: Vec<RecipeStep>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeStep {
    pub step_number: u32,
    pub title: String,
    pub description: String,
}

/// A recipe narrowed to one size by the filter's size criterion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedRecipe {
    pub name: String,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    pub sizes: Vec<String>,
    /// Only the selected size's ingredients.
    pub ingredients: IngredientMap,
    pub final_volume: IndexMap<String, Value>,
    pub steps: Vec<RecipeStep>,
    pub size_selected: String,
}

impl ProjectedRecipe {
    pub fn new(recipe: &Recipe, ingredients: IngredientMap, size_selected: String) -> Self {
        Self {
            name: recipe.name.clone(),
            category: recipe.category.clone(),
            notes: recipe.notes.clone(),
            sizes: recipe.sizes.clone(),
            ingredients,
            final_volume: recipe.final_volume.clone(),
            steps: recipe.steps.clone(),
            size_selected,
        }
    }
}

/// One row of a filter result: the full record, or its single-size projection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FilterHit {
    Full(Recipe),
    Projected(ProjectedRecipe),
}

impl FilterHit {
    pub fn name(&self) -> &str {
        match self {
            Self::Full(r) => &r.name,
            Self::Projected(p) => &p.name,
        }
    }

    pub fn size_selected(&self) -> Option<&str> {
        match self {
            Self::Full(_) => None,
            Self::Projected(p) => Some(&p.size_selected),
        }
    }
}
