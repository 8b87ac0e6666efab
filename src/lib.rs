pub mod config;
pub mod model;
pub mod search;
pub mod server;
pub mod storage;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use config::{Backend, Config};
use search::{CatalogQuery, CoffeeFilters, NotFound};
use server::AppState;
use storage::document::load_document;
use storage::sqlite::SqliteStorage;

/// Exit code for lookups that resolved to nothing.
pub const EXIT_NOT_FOUND: u8 = 3;

/// Command-line interface.
#[derive(Parser, Debug)]
#[command(
    name = "coffee-catalog",
    version,
    about = "Read-only coffee recipe catalog"
)]
pub struct Cli {
    /// Path to the config file (defaults to the platform config dir)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Serve the catalog over HTTP
    Serve {
        /// Listen address, e.g. 127.0.0.1:5000
        #[arg(long)]
        bind: Option<String>,

        /// Root directory of coffee and cup images
        #[arg(long)]
        images: Option<PathBuf>,

        #[command(flatten)]
        store: StoreArgs,
    },
    /// Wipe the SQLite store and repopulate it from the recipe document
    LoadDb {
        /// Recipe document to load
        #[arg(long)]
        recipes: Option<PathBuf>,

        /// SQLite database to repopulate
        #[arg(long)]
        db: Option<PathBuf>,
    },
    /// Run one catalog query and print the JSON result
    Query {
        #[command(flatten)]
        store: StoreArgs,

        #[command(subcommand)]
        query: QueryCommand,
    },
}

/// Store selection shared by `serve` and `query`.
#[derive(Args, Debug, Clone, Default)]
pub struct StoreArgs {
    /// Store backend
    #[arg(long, value_enum)]
    pub backend: Option<Backend>,

    /// Recipe document
    #[arg(long)]
    pub recipes: Option<PathBuf>,

    /// SQLite database (sqlite backend)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Read the database as-is instead of repopulating it from the document
    #[arg(long)]
    pub no_reload: bool,
}

impl StoreArgs {
    fn apply(&self, config: &mut Config) {
        if let Some(backend) = self.backend {
            config.backend = backend;
        }
        if let Some(recipes) = &self.recipes {
            config.recipes_path = recipes.clone();
        }
        if let Some(db) = &self.db {
            config.db_path = db.clone();
        }
        if self.no_reload {
            config.reload_on_start = false;
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum QueryCommand {
    /// Every recipe
    Recipes,
    /// Every coffee name
    Names,
    /// Distinct lowercase categories
    Categories,
    /// Coffee names in a category
    Category { category: String },
    /// Sizes with ingredient data
    Sizes { coffee: String },
    /// Ingredients for one size
    Ingredients { coffee: String, size: String },
    /// Preparation steps
    Steps { coffee: String },
    /// Final volume for one size
    Volume { coffee: String, size: String },
    /// Filter by category, name and size
    Filter {
        #[arg(long)]
        category: Option<String>,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        size: Option<String>,
    },
}

pub async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
    .context("loading configuration")?;

    match cli.command {
        Commands::Serve {
            bind,
            images,
            store,
        } => {
            store.apply(&mut config);
            if let Some(bind) = bind {
                config.bind = bind;
            }
            if let Some(images) = images {
                config.images_dir = images;
            }
            config.validate()?;
            run_serve(config).await?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::LoadDb { recipes, db } => {
            if let Some(recipes) = recipes {
                config.recipes_path = recipes;
            }
            if let Some(db) = db {
                config.db_path = db;
            }
            run_load_db(&config)?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Query { store, query } => {
            store.apply(&mut config);
            run_query(&config, &query)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run_serve(config: Config) -> Result<()> {
    let store = storage::open_store(&config)?;
    let state = AppState::new(store, config.images_dir.clone());
    server::serve(&config.bind, state).await
}

fn run_load_db(config: &Config) -> Result<()> {
    let recipes = load_document(&config.recipes_path)?;
    let mut storage = SqliteStorage::open(&config.db_path)?;
    let stats = storage.reload(&recipes)?;
    println!(
        "loaded {} coffees ({} sizes, {} ingredients, {} steps) into {}",
        stats.coffees,
        stats.sizes,
        stats.ingredients,
        stats.steps,
        config.db_path.display()
    );
    Ok(())
}

fn run_query(config: &Config, command: &QueryCommand) -> Result<ExitCode> {
    let store = storage::open_store(config)?;
    let query = CatalogQuery::from_store(store.as_ref());

    match execute_query(&query, command)? {
        Ok(value) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(not_found) => {
            eprintln!("{}", serde_json::json!({ "error": not_found.to_string() }));
            Ok(ExitCode::from(EXIT_NOT_FOUND))
        }
    }
}

/// Run one query command. The outer `Result` is a serialization fault; the
/// inner one carries the lookup outcome.
pub fn execute_query(
    query: &CatalogQuery<'_>,
    command: &QueryCommand,
) -> Result<Result<Value, NotFound>> {
    match command {
        QueryCommand::Recipes => to_json(Ok(query.all())),
        QueryCommand::Names => to_json(Ok(query.list_names())),
        QueryCommand::Categories => to_json(Ok(query.list_categories())),
        QueryCommand::Category { category } => to_json(query.names_in_category(category)),
        QueryCommand::Sizes { coffee } => to_json(query.sizes_for(coffee)),
        QueryCommand::Ingredients { coffee, size } => to_json(query.ingredients_for(coffee, size)),
        QueryCommand::Steps { coffee } => to_json(query.steps_for(coffee)),
        QueryCommand::Volume { coffee, size } => to_json(query.final_volume_for(coffee, size)),
        QueryCommand::Filter {
            category,
            name,
            size,
        } => {
            let filters = CoffeeFilters::from_params(category.clone(), name.clone(), size.clone());
            to_json(query.filter(&filters))
        }
    }
}

fn to_json<T: Serialize>(outcome: Result<T, NotFound>) -> Result<Result<Value, NotFound>> {
    match outcome {
        Ok(found) => Ok(Ok(serde_json::to_value(found)?)),
        Err(not_found) => Ok(Err(not_found)),
    }
}
