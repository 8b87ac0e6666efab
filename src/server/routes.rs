use axum::{
    Json,
    extract::{Path, Query, State},
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Response},
};
use serde::Deserialize;

use crate::search::{CatalogQuery, CoffeeFilters};
use crate::server::AppState;
use crate::server::error::AppError;
use crate::server::images;

#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    pub category: Option<String>,
    pub name: Option<String>,
    pub size: Option<String>,
}

pub async fn all_recipes(State(state): State<AppState>) -> Response {
    Json(state.query().all()).into_response()
}

pub async fn coffee_names(State(state): State<AppState>) -> Response {
    Json(state.query().list_names()).into_response()
}

pub async fn categories(State(state): State<AppState>) -> Response {
    Json(state.query().list_categories()).into_response()
}

pub async fn coffees_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> Result<Response, AppError> {
    let names = state.query().names_in_category(&category)?;
    Ok(Json(names).into_response())
}

pub async fn coffee_sizes(
    State(state): State<AppState>,
    Path(coffee): Path<String>,
) -> Result<Response, AppError> {
    let sizes = state.query().sizes_for(&coffee)?;
    Ok(Json(sizes).into_response())
}

pub async fn coffee_ingredients(
    State(state): State<AppState>,
    Path((coffee, size)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let ingredients = state.query().ingredients_for(&coffee, &size)?;
    Ok(Json(ingredients).into_response())
}

pub async fn coffee_final_volume(
    State(state): State<AppState>,
    Path((coffee, size)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let volume = state.query().final_volume_for(&coffee, &size)?;
    Ok(Json(volume).into_response())
}

pub async fn coffee_steps(
    State(state): State<AppState>,
    Path(coffee): Path<String>,
) -> Result<Response, AppError> {
    let steps = state.query().steps_for(&coffee)?;
    Ok(Json(steps).into_response())
}

pub async fn filter_coffees(
    State(state): State<AppState>,
    Query(params): Query<FilterParams>,
) -> Result<Response, AppError> {
    let filters = CoffeeFilters::from_params(params.category, params.name, params.size);
    let hits = state.query().filter(&filters)?;
    Ok(Json(hits).into_response())
}

pub async fn coffee_image(
    State(state): State<AppState>,
    Path(coffee): Path<String>,
) -> Result<Response, AppError> {
    let path = images::coffee_image_path(&state.images_dir, &coffee)?;
    image_response(&path).await
}

pub async fn cup_image(
    State(state): State<AppState>,
    Path((cup_type, size)): Path<(String, String)>,
) -> Result<Response, AppError> {
    let path = images::cup_image_path(&state.images_dir, &cup_type, &size)?;
    image_response(&path).await
}

pub async fn fallback() -> AppError {
    AppError::UnknownRoute
}

async fn image_response(path: &std::path::Path) -> Result<Response, AppError> {
    let bytes = images::read_image(path).await?;
    Ok(([(CONTENT_TYPE, images::content_type(path))], bytes).into_response())
}

impl AppState {
    fn query(&self) -> CatalogQuery<'_> {
        CatalogQuery::from_store(self.store.as_ref())
    }
}
