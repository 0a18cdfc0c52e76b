//! HTTP service mirroring one remote collection.
//!
//! The service keeps an in-memory mirror of a REST collection through a
//! [`SyncEngine`](streamcrud_core::SyncEngine) and exposes it over Axum:
//!
//! - **Reads** (`GET /api/items`) are served from the current snapshot
//!   without touching the backend
//! - **Lookups** (`GET /api/items/{id}`) wait for the item to appear,
//!   fetching it a bounded number of times before answering `404`
//! - **Writes** (`POST`, `PUT`, `DELETE`) are forwarded to the backend in
//!   the background and answered with `202 Accepted`
//! - **Failures** (`GET /api/failures`) lists recent sync failures

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;

pub use config::{ConfigError, LogFormat, ServiceConfig};
pub use error::ApiError;
pub use router::build_router;
pub use server::{ServerConfig, ServerError, start_server};
pub use state::{AppState, ID_PARAM, MirrorEngine, MirrorResource};
