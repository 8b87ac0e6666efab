//! JSON document backend.
//!
//! The document is a JSON array of recipes. Besides the canonical shape, two
//! older layouts are accepted and canonicalized on load:
//!
//! ```json
//! [
//!   { "name": "Latte", "category": "Milk",
//!     "sizes": { "small": { "espresso": 1, "milk": "150ml" } },
//!     "recipe_steps": [ { "step_number": 1, "title": "Brew", "description": "..." } ] },
//!   { "name": "Ristretto", "category": "Espresso", "size": "single",
//!     "ingredients": { "coffee_grams": 18 }, "final_volume": "20ml" }
//! ]
//! ```

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::model::types::{IngredientMap, Recipe, RecipeStep};
use crate::storage::RecipeStore;

/// Recipes read once from a JSON document.
#[derive(Debug, Clone)]
pub struct DocumentStore {
    recipes: Vec<Recipe>,
}

impl DocumentStore {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            recipes: load_document(path)?,
        })
    }
}

impl RecipeStore for DocumentStore {
    fn all(&self) -> &[Recipe] {
        &self.recipes
    }
}

/// Read and canonicalize a recipe document from disk.
pub fn load_document(path: &Path) -> Result<Vec<Recipe>> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading recipe document {}", path.display()))?;
    parse_document(&content).with_context(|| format!("parsing recipe document {}", path.display()))
}

pub fn parse_document(content: &str) -> Result<Vec<Recipe>> {
    let raw: Vec<DocumentRecipe> = serde_json::from_str(content)?;
    raw.into_iter()
        .enumerate()
        .map(|(idx, doc)| {
            let name = doc.name.clone();
            doc.into_recipe()
                .with_context(|| format!("recipe #{idx} ({name})"))
        })
        .collect()
}

#[derive(Debug, Deserialize)]
struct DocumentRecipe {
    name: String,
    category: String,
    #[serde(default)]
    notes: Option<String>,
    /// Single-size layout: the only size label.
    #[serde(default)]
    size: Option<String>,
    #[serde(default)]
    sizes: Option<DocumentSizes>,
    #[serde(default)]
    ingredients: Option<Value>,
    #[serde(default)]
    final_volume: Option<Value>,
    #[serde(default, alias = "recipe_steps")]
    steps: Vec<DocumentStep>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DocumentSizes {
    Labels(Vec<String>),
    PerSize(IndexMap<String, IngredientMap>),
}

#[derive(Debug, Deserialize)]
struct DocumentStep {
    #[serde(default)]
    step_number: Option<u32>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    description: String,
}

impl DocumentRecipe {
    fn into_recipe(self) -> Result<Recipe> {
        let (declared, per_size) = match self.sizes {
            Some(DocumentSizes::Labels(labels)) => (Some(labels), None),
            Some(DocumentSizes::PerSize(map)) => (Some(map.keys().cloned().collect()), Some(map)),
            None => (None, None),
        };

        let ingredients = match (&self.size, self.ingredients) {
            (Some(size), Some(flat)) => {
                let flat: IngredientMap = serde_json::from_value(flat)
                    .context("single-size ingredients must map ingredient to quantity")?;
                IndexMap::from([(size.clone(), flat)])
            }
            (_, Some(by_size)) => serde_json::from_value(by_size)
                .context("ingredients must map size to an ingredient object")?,
            (_, None) => per_size.unwrap_or_default(),
        };

        let final_volume = match self.final_volume {
            None | Some(Value::Null) => IndexMap::new(),
            Some(Value::Object(map)) => map.into_iter().collect(),
            Some(scalar) => match &self.size {
                Some(size) => IndexMap::from([(size.clone(), scalar)]),
                None => bail!("final_volume must be keyed by size"),
            },
        };

        let mut sizes = declared
            .or_else(|| self.size.clone().map(|s| vec![s]))
            .unwrap_or_else(|| ingredients.keys().cloned().collect());
        dedup_labels(&mut sizes);

        let steps = number_steps(self.steps)?;

        Ok(Recipe {
            name: self.name,
            category: self.category,
            notes: self.notes,
            sizes,
            ingredients,
            final_volume,
            steps,
        })
    }
}

/// Keep the first occurrence of each declared size label.
fn dedup_labels(labels: &mut Vec<String>) {
    let mut seen = std::collections::HashSet::new();
    labels.retain(|label| seen.insert(label.clone()));
}

/// Fill in missing step numbers from document order; reject gaps and duplicates.
fn number_steps(steps: Vec<DocumentStep>) -> Result<Vec<RecipeStep>> {
    steps
        .into_iter()
        .enumerate()
        .map(|(idx, step)| {
            let expected = idx as u32 + 1;
            let step_number = step.step_number.unwrap_or(expected);
            if step_number != expected {
                return Err(anyhow!(
                    "step numbers must be contiguous from 1: found {step_number} at position {expected}"
                ));
            }
            Ok(RecipeStep {
                step_number,
                title: step.title,
                description: step.description,
            })
        })
        .collect()
}
