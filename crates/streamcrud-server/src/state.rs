//! Shared application state for the mirror service.
//!
//! [`AppState`] owns the sync engine for the mirrored collection, the
//! lookup that backs `GET /api/items/{id}`, and the in-memory failure log.
//! Handlers only read snapshots and trigger fire-and-forget operations, so
//! no lock is held across a request.

use std::sync::Arc;

use streamcrud_core::{
    JsonItem, JsonResource, Lookup, MemorySink, RouteKey, SyncEngine, TracingSink, Transport,
};
use tracing::info;

use crate::config::ServiceConfig;

/// Route parameter carrying the item id.
pub const ID_PARAM: &str = "id";

/// The mirrored resource: schemaless JSON items.
pub type MirrorResource = JsonResource<JsonItem>;

/// Sync engine over the mirrored resource.
pub type MirrorEngine<X> = SyncEngine<MirrorResource, X>;

/// Shared state injected via Axum's `State` extractor.
pub struct AppState<X: Transport> {
    /// Sync engine for the mirrored collection.
    pub engine: MirrorEngine<X>,
    /// Bounded lookup reading ids from [`ID_PARAM`].
    pub lookup: Lookup<MirrorResource, X>,
    /// Most recent sync failures.
    pub failures: Arc<MemorySink>,
}

impl<X: Transport> AppState<X> {
    /// Assemble state from parts.
    pub const fn new(
        engine: MirrorEngine<X>,
        lookup: Lookup<MirrorResource, X>,
        failures: Arc<MemorySink>,
    ) -> Self {
        Self {
            engine,
            lookup,
            failures,
        }
    }

    /// Build the engine and lookup described by `config` over `transport`.
    ///
    /// Failures are logged and retained in the failure log; mutation hooks
    /// log the affected id.
    pub fn from_config(config: &ServiceConfig, transport: X) -> Self {
        let failures = Arc::new(MemorySink::new(config.failure_log_capacity));
        let engine = SyncEngine::builder(
            JsonResource::new(config.resource_path.clone()),
            transport,
        )
        .config(config.engine.clone())
        .sink((TracingSink, Arc::clone(&failures)))
        .on_create(|item: &JsonItem| info!(id = %item.id, "item created"))
        .on_update(|item: &JsonItem| info!(id = %item.id, "item updated"))
        .on_delete(|item: &JsonItem| info!(id = %item.id, "item deleted"))
        .build();
        let lookup = Lookup::new(
            engine.clone(),
            RouteKey::new(ID_PARAM, config.id_is_integer),
            config.lookup.clone(),
        );
        Self::new(engine, lookup, failures)
    }
}
