//! HTTP transport over the query layer.
//!
//! Successful lookups answer `200` with a JSON body; every [`NotFound`]
//! reason answers `404 {"error": reason}`; faults answer
//! `500 {"error": "Internal server error"}` and are only logged.
//!
//! [`NotFound`]: crate::search::NotFound

pub mod error;
pub mod images;
pub mod routes;

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    Router,
    http::{Method, header::CONTENT_TYPE},
    routing::get,
};
use tokio::net::TcpListener;
use tokio::signal::ctrl_c;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::storage::RecipeStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecipeStore>,
    pub images_dir: Arc<PathBuf>,
}

impl AppState {
    pub fn new(store: Arc<dyn RecipeStore>, images_dir: PathBuf) -> Self {
        Self {
            store,
            images_dir: Arc::new(images_dir),
        }
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    Router::new()
        .route("/coffee_recipes", get(routes::all_recipes))
        .route("/coffees", get(routes::coffee_names))
        .route("/categories", get(routes::categories))
        .route("/category/{category}", get(routes::coffees_by_category))
        .route("/coffees/filter", get(routes::filter_coffees))
        .route("/coffees/{coffee}/sizes", get(routes::coffee_sizes))
        .route(
            "/coffees/{coffee}/size/{size}/ingredients",
            get(routes::coffee_ingredients),
        )
        .route(
            "/coffees/{coffee}/size/{size}/final_volume",
            get(routes::coffee_final_volume),
        )
        .route("/coffees/{coffee}/steps", get(routes::coffee_steps))
        .route("/images/coffees/{coffee}", get(routes::coffee_image))
        .route("/images/cups/{cup_type}/{size}", get(routes::cup_image))
        .fallback(routes::fallback)
        .layer(CatchPanicLayer::custom(error::panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn serve_with_shutdown<F>(listener: TcpListener, state: AppState, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let address = listener.local_addr().context("reading listener address")?;
    info!("Server running on {address}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
        .context("serving http")?;

    info!("Server shut down");
    Ok(())
}

pub async fn serve(bind: &str, state: AppState) -> Result<()> {
    info!("Binding to {bind}");
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("binding {bind}"))?;
    serve_with_shutdown(listener, state, shutdown_signal()).await
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(err) => {
                warn!("Failed to install Ctrl+C handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(err) => {
                warn!("Failed to install terminate handler: {err}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
