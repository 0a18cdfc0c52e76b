//! Sync engine: remote CRUD merged into a local snapshot store.
//!
//! Each operation issues one remote call (retried up to
//! [`EngineConfig::retries`] extra times), decodes the response through the
//! [`Resource`], and merges the result into the [`SnapshotStore`]. Failures
//! never reach the caller; they are reported to the engine's
//! [`DiagnosticSink`] and the operation resolves normally.
//!
//! | Operation | Remote call | On success |
//! |-----------|-------------|------------|
//! | [`fetch_all`](SyncEngine::fetch_all) | `GET {endpoint}` | replace or merge |
//! | [`fetch_one`](SyncEngine::fetch_one) | `GET {endpoint}` | merge the returned item or list |
//! | [`create`](SyncEngine::create) | `POST {endpoint}` | merge, create hook |
//! | [`update`](SyncEngine::update) | `POST {endpoint}/{id}` | merge, update hook |
//! | [`delete`](SyncEngine::delete) | `DELETE {endpoint}/{id}` | remove, delete hook |
//!
//! `fetch_one` and `update` follow the established backend contract unless
//! [`EngineConfig::fetch_one_by_id`] or [`EngineConfig::update_verb`] say
//! otherwise.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::EngineConfig;
use crate::diagnostics::{DiagnosticSink, SyncFailure, TracingSink};
use crate::error::SyncError;
use crate::item::{Item, ItemId};
use crate::resource::Resource;
use crate::snapshot::{Snapshot, SnapshotStore, SnapshotStream};
use crate::transport::{Method, QueryParams, RemoteRequest, Transport};

/// Callback run after a successful mutation with the affected item.
pub type Hook<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Hooks<T> {
    on_create: Option<Hook<T>>,
    on_update: Option<Hook<T>>,
    on_delete: Option<Hook<T>>,
}

impl<T> Default for Hooks<T> {
    fn default() -> Self {
        Self {
            on_create: None,
            on_update: None,
            on_delete: None,
        }
    }
}

fn run_hook<T>(hook: Option<&Hook<T>>, item: &T) {
    if let Some(hook) = hook {
        hook(item);
    }
}

struct Inner<R: Resource, X> {
    resource: R,
    transport: X,
    store: SnapshotStore<R::Item>,
    sink: Arc<dyn DiagnosticSink>,
    hooks: Hooks<R::Item>,
    config: EngineConfig,
}

/// Keeps a local snapshot of one remote collection in sync.
///
/// Cheap to clone; clones share the same store, transport and sink.
pub struct SyncEngine<R: Resource, X> {
    inner: Arc<Inner<R, X>>,
}

impl<R: Resource, X> Clone for SyncEngine<R, X> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

/// Builder for [`SyncEngine`].
pub struct SyncEngineBuilder<R: Resource, X> {
    resource: R,
    transport: X,
    sink: Arc<dyn DiagnosticSink>,
    hooks: Hooks<R::Item>,
    config: EngineConfig,
}

impl<R: Resource, X: Transport> SyncEngineBuilder<R, X> {
    /// Replace the default configuration.
    #[must_use]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the default [`TracingSink`].
    #[must_use]
    pub fn sink(mut self, sink: impl DiagnosticSink) -> Self {
        self.sink = Arc::new(sink);
        self
    }

    /// Run `hook` after every successful create.
    #[must_use]
    pub fn on_create(mut self, hook: impl Fn(&R::Item) + Send + Sync + 'static) -> Self {
        self.hooks.on_create = Some(Arc::new(hook));
        self
    }

    /// Run `hook` after every successful update.
    #[must_use]
    pub fn on_update(mut self, hook: impl Fn(&R::Item) + Send + Sync + 'static) -> Self {
        self.hooks.on_update = Some(Arc::new(hook));
        self
    }

    /// Run `hook` after every successful delete.
    #[must_use]
    pub fn on_delete(mut self, hook: impl Fn(&R::Item) + Send + Sync + 'static) -> Self {
        self.hooks.on_delete = Some(Arc::new(hook));
        self
    }

    /// Build the engine with an empty store.
    pub fn build(self) -> SyncEngine<R, X> {
        SyncEngine {
            inner: Arc::new(Inner {
                resource: self.resource,
                transport: self.transport,
                store: SnapshotStore::new(),
                sink: self.sink,
                hooks: self.hooks,
                config: self.config,
            }),
        }
    }
}

impl<R: Resource, X: Transport> SyncEngine<R, X> {
    /// Start building an engine for `resource` over `transport`.
    pub fn builder(resource: R, transport: X) -> SyncEngineBuilder<R, X> {
        SyncEngineBuilder {
            resource,
            transport,
            sink: Arc::new(TracingSink),
            hooks: Hooks::default(),
            config: EngineConfig::default(),
        }
    }

    /// An engine with default configuration, tracing sink and no hooks.
    pub fn new(resource: R, transport: X) -> Self {
        Self::builder(resource, transport).build()
    }

    /// The snapshot store (read access only).
    pub fn store(&self) -> &SnapshotStore<R::Item> {
        &self.inner.store
    }

    /// The latest snapshot.
    pub fn current(&self) -> Snapshot<R::Item> {
        self.inner.store.current()
    }

    /// Subscribe to snapshot changes.
    pub fn subscribe(&self) -> SnapshotStream<R::Item> {
        self.inner.store.subscribe()
    }

    /// The resource this engine mirrors.
    pub fn resource(&self) -> &R {
        &self.inner.resource
    }

    /// Active configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Load the collection. With `append` false the decoded list replaces
    /// the snapshot; with `append` true it is merged.
    pub async fn fetch_all(&self, params: Option<&QueryParams>, append: bool) {
        let request =
            RemoteRequest::new(Method::Get, self.inner.resource.endpoint()).with_query(params);
        let result = self.call(&request).await.and_then(|payload| {
            self.inner
                .resource
                .decode_list(payload)
                .map_err(SyncError::from)
        });
        match result {
            Ok(items) => {
                debug!(
                    endpoint = self.inner.resource.endpoint(),
                    items = items.len(),
                    append,
                    "collection fetched"
                );
                if append {
                    self.inner.store.merge(items);
                } else {
                    self.inner.store.replace(items);
                }
            }
            Err(error) => self.report(Method::Get, error, None),
        }
    }

    /// Fetch the item `id` and merge what the backend returns.
    ///
    /// Against the collection endpoint an array payload is decoded as a
    /// list and merged whole; a single object is merged as one item. With
    /// [`EngineConfig::fetch_one_by_id`] the payload is always one item.
    pub async fn fetch_one(&self, id: &ItemId, params: Option<&QueryParams>) {
        let by_id = self.inner.config.fetch_one_by_id;
        let mut request =
            RemoteRequest::new(Method::Get, self.inner.resource.endpoint()).with_query(params);
        if by_id {
            request = request.with_id(id.clone());
        }
        let result = self.call(&request).await.and_then(|payload| {
            let resource = &self.inner.resource;
            let items = if !by_id && payload.is_array() {
                resource.decode_list(payload)
            } else {
                resource.decode(payload).map(|item| vec![item])
            };
            items.map_err(SyncError::from)
        });
        match result {
            Ok(items) => {
                let found = items.iter().any(|item| item.id() == id);
                debug!(requested = %id, items = items.len(), found, "item fetched");
                self.inner.store.merge(items);
            }
            Err(error) => self.report(Method::Get, error, Some(id.clone())),
        }
    }

    /// Create `item` remotely; merge the backend's version and run the
    /// create hook.
    pub async fn create(&self, item: &R::Item, params: Option<&QueryParams>) {
        let result = match encode(item) {
            Ok(body) => {
                let request = RemoteRequest::new(Method::Post, self.inner.resource.endpoint())
                    .with_query(params)
                    .with_body(body);
                self.call_decode(&request).await
            }
            Err(error) => Err(error),
        };
        match result {
            Ok(created) => {
                debug!(id = %created.id(), "item created");
                self.inner.store.merge(vec![created.clone()]);
                run_hook(self.inner.hooks.on_create.as_ref(), &created);
            }
            Err(error) => self.report(Method::Post, error, Some(item.id().clone())),
        }
    }

    /// Update `item` remotely; merge the backend's version and run the
    /// update hook.
    pub async fn update(&self, item: &R::Item, params: Option<&QueryParams>) {
        let method = self.inner.config.update_verb.method();
        let result = match encode(item) {
            Ok(body) => {
                let request = RemoteRequest::new(method, self.inner.resource.endpoint())
                    .with_id(item.id().clone())
                    .with_query(params)
                    .with_body(body);
                self.call_decode(&request).await
            }
            Err(error) => Err(error),
        };
        match result {
            Ok(updated) => {
                debug!(id = %updated.id(), "item updated");
                self.inner.store.merge(vec![updated.clone()]);
                run_hook(self.inner.hooks.on_update.as_ref(), &updated);
            }
            Err(error) => self.report(method, error, Some(item.id().clone())),
        }
    }

    /// Delete `item` remotely; remove it locally and run the delete hook.
    pub async fn delete(&self, item: &R::Item, params: Option<&QueryParams>) {
        let request = RemoteRequest::new(Method::Delete, self.inner.resource.endpoint())
            .with_id(item.id().clone())
            .with_query(params);
        match self.call(&request).await {
            Ok(_) => {
                let removed = self.inner.store.remove(item);
                debug!(id = %item.id(), removed, "item deleted");
                run_hook(self.inner.hooks.on_delete.as_ref(), item);
            }
            Err(error) => self.report(Method::Delete, error, Some(item.id().clone())),
        }
    }

    /// Run [`fetch_all`](Self::fetch_all) in the background.
    pub fn spawn_fetch_all(&self, params: Option<QueryParams>, append: bool) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move { engine.fetch_all(params.as_ref(), append).await })
    }

    /// Run [`fetch_one`](Self::fetch_one) in the background.
    pub fn spawn_fetch_one(&self, id: ItemId, params: Option<QueryParams>) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move { engine.fetch_one(&id, params.as_ref()).await })
    }

    /// Run [`create`](Self::create) in the background.
    pub fn spawn_create(&self, item: R::Item, params: Option<QueryParams>) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move { engine.create(&item, params.as_ref()).await })
    }

    /// Run [`update`](Self::update) in the background.
    pub fn spawn_update(&self, item: R::Item, params: Option<QueryParams>) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move { engine.update(&item, params.as_ref()).await })
    }

    /// Run [`delete`](Self::delete) in the background.
    pub fn spawn_delete(&self, item: R::Item, params: Option<QueryParams>) -> JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move { engine.delete(&item, params.as_ref()).await })
    }

    async fn call_decode(&self, request: &RemoteRequest) -> Result<R::Item, SyncError> {
        let payload = self.call(request).await?;
        Ok(self.inner.resource.decode(payload)?)
    }

    /// Execute a request, retrying until the attempt budget is spent.
    async fn call(&self, request: &RemoteRequest) -> Result<serde_json::Value, SyncError> {
        let attempts = self.inner.config.attempts();
        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            match self.inner.transport.execute(request).await {
                Ok(payload) => {
                    debug!(
                        method = %request.method,
                        path = request.path(),
                        attempt,
                        "remote call succeeded"
                    );
                    return Ok(payload);
                }
                Err(error) if attempt < attempts => {
                    warn!(
                        method = %request.method,
                        path = request.path(),
                        attempt,
                        attempts,
                        error = %error,
                        "remote call failed, retrying"
                    );
                }
                Err(error) => {
                    return Err(SyncError::Transport {
                        attempts: attempt,
                        source: error,
                    });
                }
            }
        }
    }

    fn report(&self, method: Method, error: SyncError, item_id: Option<ItemId>) {
        let failure = SyncFailure::new(method, error, self.inner.resource.endpoint(), item_id);
        self.inner.sink.report(&failure);
    }
}

fn encode<T: Item>(item: &T) -> Result<serde_json::Value, SyncError> {
    serde_json::to_value(item).map_err(|e| SyncError::Encode(e.to_string()))
}
