//! Axum router construction for the mirror service.
//!
//! Assembles all routes into a single [`Router`] with CORS and request
//! tracing middleware.

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use streamcrud_core::Transport;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Build the complete Axum router for the mirror service.
///
/// The router includes:
/// - `GET /health` -- liveness probe
/// - `GET /api/items` -- current snapshot
/// - `POST /api/items` -- create an item
/// - `POST /api/items/refresh` -- re-fetch the collection
/// - `GET /api/items/{id}` -- bounded lookup
/// - `PUT /api/items/{id}` -- update an item
/// - `DELETE /api/items/{id}` -- delete an item
/// - `GET /api/failures` -- recent sync failures
pub fn build_router<X: Transport>(state: Arc<AppState<X>>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health))
        .route(
            "/api/items",
            get(handlers::list_items::<X>).post(handlers::create_item::<X>),
        )
        .route("/api/items/refresh", post(handlers::refresh::<X>))
        .route(
            "/api/items/{id}",
            get(handlers::get_item::<X>)
                .put(handlers::update_item::<X>)
                .delete(handlers::delete_item::<X>),
        )
        .route("/api/failures", get(handlers::list_failures::<X>))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
