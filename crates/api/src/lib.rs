//! HTTP API server for the pet-shop order service.
//!
//! Exposes atomic order placement plus catalog, customer and reporting
//! endpoints, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::Request;
use axum::routing::{get, post};
use metrics_exporter_prometheus::PrometheusHandle;
use store::Store;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub use config::Config;
pub use routes::orders::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: Store + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
    config: &Config,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                tracing::info_span!(
                    "http_request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TimeoutLayer::new(config.request_timeout))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/orders/place", post(routes::orders::place::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .route("/users/{email}/history", get(routes::orders::history::<S>))
        .route(
            "/products",
            get(routes::products::list::<S>).post(routes::products::create::<S>),
        )
        .route("/products/popular", get(routes::products::popular::<S>))
        .route(
            "/products/{id}",
            get(routes::products::get::<S>)
                .put(routes::products::update::<S>)
                .delete(routes::products::delete::<S>),
        )
        .route(
            "/customers",
            get(routes::customers::list::<S>).post(routes::customers::create::<S>),
        )
        .route("/customers/{email}", get(routes::customers::get::<S>))
        .route(
            "/customers/{email}/orders",
            get(routes::customers::orders::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(middleware)
}

/// Creates the application state over `store` using the configured
/// transaction status.
pub fn create_default_state<S: Store + Clone + 'static>(
    store: S,
    config: &Config,
) -> Arc<AppState<S>> {
    Arc::new(AppState::new(store, config.transaction_status))
}
