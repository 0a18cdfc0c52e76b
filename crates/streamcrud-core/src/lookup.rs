//! Bounded lookup: wait for a specific item to appear in the mirror.
//!
//! A lookup subscribes to the engine's snapshot stream and evaluates every
//! distinct snapshot against its target id, starting with the snapshot that
//! is current at subscription time. While the item is missing it triggers a
//! background `fetch_one` and keeps waiting, until the budget runs out:
//!
//! ```text
//! Waiting(n) --found--------------> Found(item)
//! Waiting(n) --missing, n > 0-----> Waiting(n - 1)   + fetch_one(id)
//! Waiting(0) --missing------------> Failed           + failure callback
//! ```
//!
//! Each triggered fetch is awaited. When it finishes the lookup evaluates
//! the store's current snapshot, whether or not the fetch merged anything,
//! so failing fetches still spend the budget and the lookup always ends.
//! Emissions that arrive meanwhile resolve the lookup early when they carry
//! the item and are otherwise ignored. An optional deadline
//! ([`LookupConfig::timeout`]) additionally bounds slow fetches.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::LookupConfig;
use crate::engine::SyncEngine;
use crate::error::LookupError;
use crate::item::{Item, ItemId};
use crate::resource::Resource;
use crate::snapshot::Snapshot;
use crate::transport::Transport;

/// Where the lookup protocol is in its evaluation of one target id.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupState<T> {
    /// The item has not been seen; `remaining` fetches may still be
    /// triggered.
    Waiting {
        /// Fetches left in the budget.
        remaining: u32,
    },
    /// The item was found.
    Found(T),
    /// The budget ran out without finding the item.
    Failed,
}

/// What the driver must do after an evaluation.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect<T> {
    /// Resolve the lookup with the item.
    Resolve(T),
    /// Trigger a single-item fetch and keep waiting.
    Fetch,
    /// Resolve the lookup as not found.
    GiveUp,
    /// The state is already terminal; nothing to do.
    Idle,
}

impl<T: Item> LookupState<T> {
    /// Initial state for the given budget.
    pub const fn start(budget: u32) -> Self {
        Self::Waiting { remaining: budget }
    }

    /// Evaluate one snapshot.
    pub fn observe(&mut self, id: &ItemId, snapshot: &Snapshot<T>) -> Effect<T> {
        let remaining = match self {
            Self::Waiting { remaining } => *remaining,
            Self::Found(_) | Self::Failed => return Effect::Idle,
        };
        if let Some(item) = snapshot.find(id) {
            *self = Self::Found(item.clone());
            return Effect::Resolve(item.clone());
        }
        match remaining.checked_sub(1) {
            Some(left) => {
                *self = Self::Waiting { remaining: left };
                Effect::Fetch
            }
            None => {
                *self = Self::Failed;
                Effect::GiveUp
            }
        }
    }

    /// Whether the state is `Found` or `Failed`.
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Waiting { .. })
    }
}

/// Why a lookup ended without an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotFoundReason {
    /// Every budgeted fetch was spent.
    Exhausted,
    /// The configured deadline passed first.
    TimedOut,
    /// The store was dropped while waiting.
    StoreClosed,
}

/// Terminal result of a lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum LookupOutcome<T> {
    /// The item is in the mirror.
    Found(T),
    /// The item did not show up.
    NotFound(NotFoundReason),
}

impl<T> LookupOutcome<T> {
    /// The found item, if any.
    pub fn into_item(self) -> Option<T> {
        match self {
            Self::Found(item) => Some(item),
            Self::NotFound(_) => None,
        }
    }
}

/// How to read an id out of routing parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteKey {
    /// Name of the route parameter holding the id.
    pub param_key: String,
    /// Parse the parameter as an integer id.
    pub id_is_integer: bool,
}

impl RouteKey {
    /// Route key for `param_key`.
    pub fn new(param_key: impl Into<String>, id_is_integer: bool) -> Self {
        Self {
            param_key: param_key.into(),
            id_is_integer,
        }
    }

    /// Extract the target id from routing parameters.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError::MissingParam`] when the key is absent and
    /// [`LookupError::NotAnInteger`] when an integer id does not parse.
    pub fn extract(&self, params: &HashMap<String, String>) -> Result<ItemId, LookupError> {
        let raw = params
            .get(&self.param_key)
            .ok_or_else(|| LookupError::MissingParam(self.param_key.clone()))?;
        if !self.id_is_integer {
            return Ok(ItemId::Str(raw.clone()));
        }
        match raw.trim().parse::<i64>() {
            Ok(id) => Ok(ItemId::Int(id)),
            Err(_) => Err(LookupError::NotAnInteger {
                key: self.param_key.clone(),
                value: raw.clone(),
            }),
        }
    }
}

/// Called once when a lookup ends without an item.
pub type FailureCallback = Arc<dyn Fn(&ItemId, NotFoundReason) + Send + Sync>;

/// Resolves ids against a sync engine's mirror.
pub struct Lookup<R: Resource, X> {
    engine: SyncEngine<R, X>,
    route: RouteKey,
    config: LookupConfig,
    on_failure: FailureCallback,
}

impl<R: Resource, X> Clone for Lookup<R, X> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            route: self.route.clone(),
            config: self.config.clone(),
            on_failure: Arc::clone(&self.on_failure),
        }
    }
}

impl<R: Resource, X: Transport> Lookup<R, X> {
    /// A lookup over `engine` reading ids from `route`.
    ///
    /// The default failure callback logs a warning.
    pub fn new(engine: SyncEngine<R, X>, route: RouteKey, config: LookupConfig) -> Self {
        Self {
            engine,
            route,
            config,
            on_failure: Arc::new(|id: &ItemId, reason: NotFoundReason| {
                warn!(id = %id, reason = ?reason, "lookup failed");
            }),
        }
    }

    /// Replace the failure callback.
    #[must_use]
    pub fn on_failure(
        mut self,
        callback: impl Fn(&ItemId, NotFoundReason) + Send + Sync + 'static,
    ) -> Self {
        self.on_failure = Arc::new(callback);
        self
    }

    /// The routing key this lookup reads.
    pub const fn route(&self) -> &RouteKey {
        &self.route
    }

    /// Resolve the id found in routing parameters.
    ///
    /// # Errors
    ///
    /// Returns [`LookupError`] when the parameters do not yield an id. The
    /// lookup itself never fails; a missing item is
    /// [`LookupOutcome::NotFound`].
    pub async fn resolve_params(
        &self,
        params: &HashMap<String, String>,
    ) -> Result<LookupOutcome<R::Item>, LookupError> {
        let id = self.route.extract(params)?;
        Ok(self.resolve(&id).await)
    }

    /// Wait until `id` is in the mirror or the budget is spent.
    pub async fn resolve(&self, id: &ItemId) -> LookupOutcome<R::Item> {
        let outcome = match self.config.timeout {
            Some(limit) => tokio::time::timeout(limit, self.watch(id))
                .await
                .unwrap_or(LookupOutcome::NotFound(NotFoundReason::TimedOut)),
            None => self.watch(id).await,
        };
        if let LookupOutcome::NotFound(reason) = outcome {
            (self.on_failure)(id, reason);
        }
        outcome
    }

    async fn watch(&self, id: &ItemId) -> LookupOutcome<R::Item> {
        let mut stream = self.engine.subscribe();
        let mut state = LookupState::start(self.config.budget);
        let Some(mut snapshot) = stream.next().await else {
            return LookupOutcome::NotFound(NotFoundReason::StoreClosed);
        };
        loop {
            let mut fetch = match state.observe(id, &snapshot) {
                Effect::Resolve(item) => {
                    debug!(id = %id, "lookup resolved");
                    return LookupOutcome::Found(item);
                }
                Effect::Fetch => {
                    debug!(id = %id, "item missing, fetching");
                    self.engine.spawn_fetch_one(id.clone(), None)
                }
                Effect::GiveUp | Effect::Idle => {
                    return LookupOutcome::NotFound(NotFoundReason::Exhausted);
                }
            };
            // Wait for the fetch to finish, or for an emission that already
            // carries the item. A fetch that merged nothing still counts.
            snapshot = loop {
                tokio::select! {
                    finished = &mut fetch => {
                        if let Err(error) = finished {
                            warn!(id = %id, error = %error, "lookup fetch task aborted");
                        }
                        break self.engine.current();
                    }
                    next = stream.next() => match next {
                        Some(emitted) if emitted.contains(id) => break emitted,
                        Some(_) => {}
                        None => return LookupOutcome::NotFound(NotFoundReason::StoreClosed),
                    },
                }
            };
        }
    }
}
