//! HTTP API server for the product catalog.
//!
//! Provides REST endpoints for product management and stock movements,
//! with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, put};
use catalog_store::{CatalogStore, SeedReport, StoreError, seed};
use inventory::{Actor, InventoryService, RandomIdAllocator};
use metrics_exporter_prometheus::PrometheusHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use routes::products::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: CatalogStore + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/api/products",
            get(routes::products::list::<S>).post(routes::products::create::<S>),
        )
        .route(
            "/api/products/{id}",
            get(routes::products::get::<S>)
                .put(routes::products::update::<S>)
                .delete(routes::products::delete::<S>),
        )
        .route(
            "/api/products/decrement-stock/{id}/{quantity}",
            put(routes::products::decrement_stock::<S>),
        )
        .route(
            "/api/products/add-to-stock/{id}/{quantity}",
            put(routes::products::increment_stock::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates the application state around `store`, using the limits and system
/// actor from `config`.
pub fn create_state<S: CatalogStore>(
    store: S,
    config: &Config,
    shutdown: CancellationToken,
) -> Arc<AppState<S>> {
    let inventory =
        InventoryService::with_allocator(store, RandomIdAllocator::new(), config.inventory());

    Arc::new(AppState {
        inventory,
        system_actor: Actor::new(config.system_actor.clone()),
        shutdown,
    })
}

/// Inserts the default categories and products that are not present yet.
pub async fn seed_catalog<S: CatalogStore>(store: &S) -> Result<SeedReport, StoreError> {
    let report = store
        .seed(
            seed::default_categories(),
            seed::default_products(chrono::Utc::now()),
        )
        .await?;

    tracing::info!(
        categories = report.categories_inserted,
        products = report.products_inserted,
        "catalog seeded"
    );
    Ok(report)
}
