//! Query layer facade.
//!
//! - **[`normalize`]**: lookup-key normalization for names, categories and sizes.
//! - **[`query`]**: lookups and the multi-criterion filter over a store snapshot.

pub mod normalize;
pub mod query;

pub use query::{CatalogQuery, CoffeeFilters, NotFound};
