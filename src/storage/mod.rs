//! Recipe stores.
//!
//! Every backend hands the query layer the same canonical [`Recipe`] snapshot.
//! Stores are initialized once, before serving; a store that fails to load is
//! a startup error, never a per-request one.

pub mod document;
pub mod sqlite;

use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::config::{Backend, Config};
use crate::model::types::Recipe;
use document::{DocumentStore, load_document};
use sqlite::{SqliteStorage, SqliteStore};

/// Read contract shared by every backend.
pub trait RecipeStore: Send + Sync {
    /// Every recipe, in a stable order (insertion order for all shipped stores).
    fn all(&self) -> &[Recipe];
}

/// Store over recipes already in memory, for fixtures and embedding.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    recipes: Vec<Recipe>,
}

impl MemoryStore {
    pub fn new(recipes: Vec<Recipe>) -> Self {
        Self { recipes }
    }
}

impl RecipeStore for MemoryStore {
    fn all(&self) -> &[Recipe] {
        &self.recipes
    }
}

impl From<Vec<Recipe>> for MemoryStore {
    fn from(recipes: Vec<Recipe>) -> Self {
        Self::new(recipes)
    }
}

/// Initialize the configured store. Any failure here aborts startup.
pub fn open_store(config: &Config) -> Result<Arc<dyn RecipeStore>> {
    let store: Arc<dyn RecipeStore> = match config.backend {
        Backend::Document => Arc::new(DocumentStore::open(&config.recipes_path)?),
        Backend::Sqlite => {
            let mut storage = SqliteStorage::open(&config.db_path)?;
            if config.reload_on_start {
                let recipes = load_document(&config.recipes_path)?;
                storage.reload(&recipes)?;
            }
            Arc::new(SqliteStore::from_storage(&storage)?)
        }
    };

    info!(
        backend = %config.backend,
        recipes = store.all().len(),
        "catalog_load"
    );
    Ok(store)
}
