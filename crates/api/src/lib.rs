//! HTTP API for the pet store.
//!
//! Exposes order checkout and the store/pet catalog behind HTTP Basic
//! authentication, with structured logging (tracing) and Prometheus metrics.

pub mod auth;
pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use cache::Cache;
use domain::{CredentialStore, FieldEncryptor, OrderService, PetService, StoreService};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use state::{AppState, Backend};

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<L: Backend>(state: Arc<AppState<L>>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    let protected = Router::new()
        .route("/orders", post(routes::orders::create::<L>))
        .route("/orders/{id}", get(routes::orders::get::<L>))
        .route("/orders/{id}/pets", get(routes::orders::pets::<L>))
        .route(
            "/stores",
            get(routes::stores::list::<L>).post(routes::stores::create::<L>),
        )
        .route("/stores/mine", get(routes::stores::mine::<L>))
        .route(
            "/pets",
            get(routes::pets::list::<L>).post(routes::pets::create::<L>),
        )
        .route(
            "/pets/{id}",
            get(routes::pets::get::<L>).delete(routes::pets::delete::<L>),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth::<L>,
        ));

    Router::new()
        .route("/health", get(routes::health::check::<L>))
        .merge(protected)
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

/// Wires the services over one ledger and one cache.
pub fn create_state<L: Backend>(
    ledger: L,
    cache: Arc<dyn Cache>,
    encryptor: Arc<dyn FieldEncryptor>,
    credentials: Arc<dyn CredentialStore>,
    cache_ttl: Duration,
) -> Arc<AppState<L>> {
    Arc::new(AppState {
        orders: OrderService::new(ledger.clone(), cache.clone()).with_ttl(cache_ttl),
        pets: PetService::new(ledger.clone(), cache.clone(), encryptor).with_ttl(cache_ttl),
        stores: StoreService::new(ledger, cache.clone()).with_ttl(cache_ttl),
        credentials,
        cache,
    })
}
