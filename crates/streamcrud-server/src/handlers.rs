//! REST API endpoint handlers for the mirror service.
//!
//! Reads are served from the engine's current snapshot. Writes are
//! fire-and-forget: the handler spawns the sync operation and answers
//! `202 Accepted`; the outcome shows up in the snapshot or in the failure
//! log.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/health` | Liveness probe |
//! | `GET` | `/api/items` | Current snapshot |
//! | `GET` | `/api/items/{id}` | Bounded lookup of one item |
//! | `POST` | `/api/items/refresh` | Re-fetch the collection (`?append=true` merges) |
//! | `POST` | `/api/items` | Create an item |
//! | `PUT` | `/api/items/{id}` | Update an item |
//! | `DELETE` | `/api/items/{id}` | Delete an item |
//! | `GET` | `/api/failures` | Recent sync failures |

use std::collections::HashMap;
use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use streamcrud_core::{JsonItem, LookupOutcome, QueryParams, Transport};

use crate::error::ApiError;
use crate::state::{AppState, ID_PARAM};

/// Query key selecting merge instead of replace on refresh.
const APPEND_PARAM: &str = "append";

/// Turn request query parameters into remote query parameters.
fn forwarded(params: HashMap<String, String>) -> Option<QueryParams> {
    if params.is_empty() {
        None
    } else {
        Some(params.into_iter().collect())
    }
}

fn accepted(operation: &str) -> impl IntoResponse {
    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "accepted": operation })),
    )
}

/// Liveness probe.
pub async fn health() -> &'static str {
    "ok"
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Return the current snapshot.
pub async fn list_items<X: Transport>(State(state): State<Arc<AppState<X>>>) -> impl IntoResponse {
    let (snapshot, revision) = state.engine.store().versioned();
    Json(serde_json::json!({
        "count": snapshot.len(),
        "revision": revision,
        "items": snapshot,
    }))
}

/// Resolve one item, fetching it if the mirror does not have it yet.
pub async fn get_item<X: Transport>(
    State(state): State<Arc<AppState<X>>>,
    Path(params): Path<HashMap<String, String>>,
) -> Result<Json<JsonItem>, ApiError> {
    match state.lookup.resolve_params(&params).await? {
        LookupOutcome::Found(item) => Ok(Json(item)),
        LookupOutcome::NotFound(reason) => Err(ApiError::NotFound {
            id: params.get(ID_PARAM).cloned().unwrap_or_default(),
            reason,
        }),
    }
}

/// Return the retained sync failures, oldest first.
pub async fn list_failures<X: Transport>(
    State(state): State<Arc<AppState<X>>>,
) -> impl IntoResponse {
    let failures = state.failures.recent();
    Json(serde_json::json!({
        "count": failures.len(),
        "failures": failures,
    }))
}

// ---------------------------------------------------------------------------
// Writes (fire-and-forget)
// ---------------------------------------------------------------------------

/// Re-fetch the whole collection.
pub async fn refresh<X: Transport>(
    State(state): State<Arc<AppState<X>>>,
    Query(mut params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let append = params
        .remove(APPEND_PARAM)
        .is_some_and(|v| v.eq_ignore_ascii_case("true"));
    drop(state.engine.spawn_fetch_all(forwarded(params), append));
    accepted("fetch_all")
}

/// Create an item on the backend.
pub async fn create_item<X: Transport>(
    State(state): State<Arc<AppState<X>>>,
    Query(params): Query<HashMap<String, String>>,
    Json(item): Json<JsonItem>,
) -> impl IntoResponse {
    drop(state.engine.spawn_create(item, forwarded(params)));
    accepted("create")
}

/// Update an item on the backend. The body id must match the route id.
pub async fn update_item<X: Transport>(
    State(state): State<Arc<AppState<X>>>,
    Path(route): Path<HashMap<String, String>>,
    Query(params): Query<HashMap<String, String>>,
    Json(item): Json<JsonItem>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state.lookup.route().extract(&route)?;
    if item.id != id {
        return Err(ApiError::BadRequest(format!(
            "body id {} does not match route id {id}",
            item.id
        )));
    }
    drop(state.engine.spawn_update(item, forwarded(params)));
    Ok(accepted("update"))
}

/// Delete an item on the backend.
pub async fn delete_item<X: Transport>(
    State(state): State<Arc<AppState<X>>>,
    Path(route): Path<HashMap<String, String>>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, ApiError> {
    let id = state.lookup.route().extract(&route)?;
    let item = state
        .engine
        .current()
        .find(&id)
        .cloned()
        .unwrap_or_else(|| JsonItem::new(id));
    drop(state.engine.spawn_delete(item, forwarded(params)));
    Ok(accepted("delete"))
}
