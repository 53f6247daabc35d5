//! HTTP API server with observability for the order service.
//!
//! Provides REST endpoints for the order lifecycle and the store/product
//! replication feeds, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::{OrderService, Storage};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Storage + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/api/orders", post(routes::orders::create::<S>))
        .route("/api/orders/products", post(routes::orders::create_product::<S>))
        .route("/api/orders/stores", post(routes::orders::create_store::<S>))
        .route(
            "/api/orders/{id}",
            get(routes::orders::list::<S>).put(routes::orders::update::<S>),
        )
        .route("/api/orders/order/{id}", get(routes::orders::get::<S>))
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

/// Creates the default application state over the given storage engine.
pub fn create_default_state<S: Storage + 'static>(storage: S) -> Arc<AppState<S>> {
    Arc::new(AppState {
        order_service: OrderService::new(storage),
    })
}
