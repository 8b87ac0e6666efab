//! SQLite backend: schema, pragmas, migrations, reload and snapshot assembly.

use crate::model::types::{IngredientMap, Recipe, RecipeStep};
use crate::storage::RecipeStore;
use anyhow::{Context, Result, anyhow};
use indexmap::IndexMap;
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use serde_json::Value;
use std::fs;
use std::path::Path;
use tracing::info;

const SCHEMA_VERSION: i64 = 1;

const MIGRATION_V1: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS coffees (
    id INTEGER PRIMARY KEY,
    category TEXT NOT NULL,
    name TEXT NOT NULL,
    notes TEXT
);

-- One row per size label a coffee mentions anywhere. Each *_pos column is the
-- label's position in that list, NULL when the label is absent from it.
CREATE TABLE IF NOT EXISTS coffee_sizes (
    id INTEGER PRIMARY KEY,
    coffee_id INTEGER NOT NULL REFERENCES coffees(id) ON DELETE CASCADE,
    size TEXT NOT NULL,
    declared_pos INTEGER,
    ingredients_pos INTEGER,
    final_volume TEXT,
    volume_pos INTEGER,
    UNIQUE(coffee_id, size)
);

CREATE TABLE IF NOT EXISTS ingredients (
    id INTEGER PRIMARY KEY,
    coffee_id INTEGER NOT NULL REFERENCES coffees(id) ON DELETE CASCADE,
    size TEXT NOT NULL,
    ingredient TEXT NOT NULL,
    quantity TEXT NOT NULL,
    UNIQUE(coffee_id, size, ingredient)
);

CREATE TABLE IF NOT EXISTS steps (
    id INTEGER PRIMARY KEY,
    coffee_id INTEGER NOT NULL REFERENCES coffees(id) ON DELETE CASCADE,
    step_number INTEGER NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    UNIQUE(coffee_id, step_number)
);

CREATE INDEX IF NOT EXISTS idx_ingredients_coffee_size
    ON ingredients(coffee_id, size);
"#;

/// Row counts written by [`SqliteStorage::reload`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReloadStats {
    pub coffees: usize,
    pub sizes: usize,
    pub ingredients: usize,
    pub steps: usize,
}

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)
                .with_context(|| format!("creating db directory {}", parent.display()))?;
        }

        let mut conn = Connection::open(path)
            .with_context(|| format!("opening sqlite db at {}", path.display()))?;

        apply_pragmas(&mut conn)?;
        init_meta(&mut conn)?;
        migrate(&mut conn)?;

        Ok(Self { conn })
    }

    pub fn raw(&self) -> &Connection {
        &self.conn
    }

    /// Destructive reload: drop every coffee and repopulate from `recipes`
    /// in one transaction.
    pub fn reload(&mut self, recipes: &[Recipe]) -> Result<ReloadStats> {
        let tx = self.conn.transaction()?;
        // Sizes, ingredients and steps cascade.
        tx.execute("DELETE FROM coffees", [])?;

        let mut stats = ReloadStats::default();
        for recipe in recipes {
            let coffee_id = insert_coffee(&tx, recipe)?;
            stats.coffees += 1;
            stats.sizes += insert_sizes(&tx, coffee_id, recipe)?;
            stats.ingredients += insert_ingredients(&tx, coffee_id, recipe)?;
            stats.steps += insert_steps(&tx, coffee_id, &recipe.steps)?;
        }
        tx.commit()?;

        info!(
            coffees = stats.coffees,
            sizes = stats.sizes,
            ingredients = stats.ingredients,
            steps = stats.steps,
            "reload"
        );
        Ok(stats)
    }

    /// Assemble every coffee: coffee row, then sizes, ingredients per size, steps.
    pub fn load_recipes(&self) -> Result<Vec<Recipe>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, category, name, notes FROM coffees ORDER BY id")?;
        let coffees = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, Option<String>>(3)?,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        coffees
            .into_iter()
            .map(|(id, category, name, notes)| {
                let layout = self
                    .read_sizes(id)
                    .with_context(|| format!("reading sizes for {name}"))?;
                let ingredients = self
                    .read_ingredients(id, &layout.ingredient_sizes)
                    .with_context(|| format!("reading ingredients for {name}"))?;
                let steps = self
                    .read_steps(id)
                    .with_context(|| format!("reading steps for {name}"))?;
                Ok(Recipe {
                    name,
                    category,
                    notes,
                    sizes: layout.declared,
                    ingredients,
                    final_volume: layout.final_volume,
                    steps,
                })
            })
            .collect()
    }

    fn read_sizes(&self, coffee_id: i64) -> Result<SizeLayout> {
        let mut stmt = self.conn.prepare(
            "SELECT size, declared_pos, ingredients_pos, final_volume, volume_pos
             FROM coffee_sizes WHERE coffee_id = ? ORDER BY id",
        )?;
        let rows = stmt.query_map(params![coffee_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, Option<i64>>(1)?,
                row.get::<_, Option<i64>>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, Option<i64>>(4)?,
            ))
        })?;

        let mut declared = Vec::new();
        let mut ingredient_sizes = Vec::new();
        let mut volumes = Vec::new();
        for row in rows {
            let (size, declared_pos, ingredients_pos, volume, volume_pos) = row?;
            if let Some(pos) = declared_pos {
                declared.push((pos, size.clone()));
            }
            if let Some(pos) = ingredients_pos {
                ingredient_sizes.push((pos, size.clone()));
            }
            if let (Some(pos), Some(raw)) = (volume_pos, volume) {
                volumes.push((pos, size, decode_scalar(&raw)?));
            }
        }

        declared.sort_by_key(|(pos, _)| *pos);
        ingredient_sizes.sort_by_key(|(pos, _)| *pos);
        volumes.sort_by_key(|(pos, _, _)| *pos);
        Ok(SizeLayout {
            declared: declared.into_iter().map(|(_, size)| size).collect(),
            ingredient_sizes: ingredient_sizes.into_iter().map(|(_, size)| size).collect(),
            final_volume: volumes
                .into_iter()
                .map(|(_, size, volume)| (size, volume))
                .collect(),
        })
    }

    /// Ingredient maps keyed in `sizes` order; a size with no rows keeps an
    /// empty map.
    fn read_ingredients(
        &self,
        coffee_id: i64,
        sizes: &[String],
    ) -> Result<IndexMap<String, IngredientMap>> {
        let mut stmt = self.conn.prepare(
            "SELECT size, ingredient, quantity FROM ingredients WHERE coffee_id = ? ORDER BY id",
        )?;
        let rows = stmt.query_map(params![coffee_id], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
            ))
        })?;

        let mut by_size: IndexMap<String, IngredientMap> = sizes
            .iter()
            .map(|size| (size.clone(), IngredientMap::new()))
            .collect();
        for row in rows {
            let (size, ingredient, quantity) = row?;
            by_size
                .entry(size)
                .or_default()
                .insert(ingredient, decode_scalar(&quantity)?);
        }
        Ok(by_size)
    }

    fn read_steps(&self, coffee_id: i64) -> Result<Vec<RecipeStep>> {
        let mut stmt = self.conn.prepare(
            "SELECT step_number, title, description FROM steps WHERE coffee_id = ? ORDER BY step_number",
        )?;
        let steps = stmt
            .query_map(params![coffee_id], |row| {
                Ok(RecipeStep {
                    step_number: row.get(0)?,
                    title: row.get(1)?,
                    description: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(steps)
    }
}

/// Size lists of one coffee as read back from `coffee_sizes`.
struct SizeLayout {
    declared: Vec<String>,
    ingredient_sizes: Vec<String>,
    final_volume: IndexMap<String, Value>,
}

/// [`RecipeStore`] over a snapshot taken from the database at open time.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    recipes: Vec<Recipe>,
}

impl SqliteStore {
    pub fn from_storage(storage: &SqliteStorage) -> Result<Self> {
        Ok(Self {
            recipes: storage.load_recipes()?,
        })
    }
}

impl RecipeStore for SqliteStore {
    fn all(&self) -> &[Recipe] {
        &self.recipes
    }
}

fn apply_pragmas(conn: &mut Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA temp_store = MEMORY;
        PRAGMA foreign_keys = ON;
        "#,
    )?;
    Ok(())
}

fn init_meta(conn: &mut Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS meta (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
        [],
    )?;

    let existing: Option<i64> = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get::<_, String>(0).map(|s| s.parse().unwrap_or(0)),
        )
        .optional()?;

    if existing.is_none() {
        conn.execute(
            "INSERT INTO meta(key, value) VALUES('schema_version', '0')",
            [],
        )?;
    }

    Ok(())
}

fn migrate(conn: &mut Connection) -> Result<()> {
    let current: i64 = conn
        .query_row(
            "SELECT value FROM meta WHERE key = 'schema_version'",
            [],
            |row| row.get::<_, String>(0).map(|s| s.parse().unwrap_or(0)),
        )
        .optional()?
        .unwrap_or(0);

    match current {
        0 => {
            conn.execute_batch(MIGRATION_V1)?;
            conn.execute(
                "UPDATE meta SET value = ? WHERE key = 'schema_version'",
                params![SCHEMA_VERSION.to_string()],
            )?;
        }
        v if v == SCHEMA_VERSION => {}
        v => return Err(anyhow!("unsupported schema version {}", v)),
    }

    Ok(())
}

fn insert_coffee(tx: &Transaction<'_>, recipe: &Recipe) -> Result<i64> {
    tx.execute(
        "INSERT INTO coffees(category, name, notes) VALUES(?,?,?)",
        params![recipe.category, recipe.name, recipe.notes],
    )?;
    Ok(tx.last_insert_rowid())
}

#[derive(Default)]
struct SizeRow {
    declared_pos: Option<i64>,
    ingredients_pos: Option<i64>,
    volume: Option<(i64, String)>,
}

/// One row per distinct label across declared sizes, ingredient maps and
/// final volumes. A repeated declared label keeps its first position.
fn insert_sizes(tx: &Transaction<'_>, coffee_id: i64, recipe: &Recipe) -> Result<usize> {
    let mut rows: IndexMap<&str, SizeRow> = IndexMap::new();
    for (pos, size) in (0_i64..).zip(&recipe.sizes) {
        rows.entry(size.as_str()).or_default().declared_pos.get_or_insert(pos);
    }
    for (pos, size) in (0_i64..).zip(recipe.ingredients.keys()) {
        rows.entry(size.as_str()).or_default().ingredients_pos = Some(pos);
    }
    for (pos, (size, volume)) in (0_i64..).zip(&recipe.final_volume) {
        rows.entry(size.as_str()).or_default().volume = Some((pos, encode_scalar(volume)?));
    }

    for (size, row) in &rows {
        let (volume_pos, volume) = row.volume.clone().unzip();
        tx.execute(
            "INSERT INTO coffee_sizes(coffee_id, size, declared_pos, ingredients_pos, final_volume, volume_pos)
             VALUES(?,?,?,?,?,?)",
            params![
                coffee_id,
                size,
                row.declared_pos,
                row.ingredients_pos,
                volume,
                volume_pos
            ],
        )
        .with_context(|| format!("inserting size {size} for {}", recipe.name))?;
    }
    Ok(rows.len())
}

fn insert_ingredients(tx: &Transaction<'_>, coffee_id: i64, recipe: &Recipe) -> Result<usize> {
    let mut count = 0;
    for (size, ingredients) in &recipe.ingredients {
        for (ingredient, quantity) in ingredients {
            tx.execute(
                "INSERT INTO ingredients(coffee_id, size, ingredient, quantity) VALUES(?,?,?,?)",
                params![coffee_id, size, ingredient, encode_scalar(quantity)?],
            )?;
            count += 1;
        }
    }
    Ok(count)
}

fn insert_steps(tx: &Transaction<'_>, coffee_id: i64, steps: &[RecipeStep]) -> Result<usize> {
    for step in steps {
        tx.execute(
            "INSERT INTO steps(coffee_id, step_number, title, description) VALUES(?,?,?,?)",
            params![coffee_id, step.step_number, step.title, step.description],
        )?;
    }
    Ok(steps.len())
}

// Scalars are stored as JSON text so numbers and strings keep their type.
fn encode_scalar(value: &Value) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}

fn decode_scalar(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("decoding stored value {raw:?}"))
}
