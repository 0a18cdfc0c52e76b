//! Reactive local mirror of a remote keyed collection.
//!
//! The crate keeps an in-process copy of a backend collection in sync
//! through create/read/update/delete calls, publishes its state as a live
//! stream of immutable snapshots, and lets callers wait (boundedly) for a
//! specific item to show up.
//!
//! # Modules
//!
//! - [`item`] -- Item trait, [`ItemId`], schemaless [`JsonItem`]
//! - [`snapshot`] -- Copy-on-write [`SnapshotStore`] and its replay-latest stream
//! - [`transport`] -- The [`Transport`] seam and [`RemoteRequest`]
//! - [`http`] -- `reqwest` transport
//! - [`resource`] -- Endpoint + decoder capability set ([`Resource`])
//! - [`engine`] -- The [`SyncEngine`] CRUD operations
//! - [`lookup`] -- Bounded lookup protocol ([`Lookup`])
//! - [`diagnostics`] -- Failure records and sinks
//! - [`config`] -- Engine and lookup tunables
//!
//! # Data flow
//!
//! ```text
//! caller --> SyncEngine --> Transport --> backend
//!                |
//!                v
//!          SnapshotStore --> SnapshotStream --> Lookup (re-evaluates, may fetch)
//! ```

pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod http;
pub mod item;
pub mod lookup;
pub mod resource;
pub mod snapshot;
pub mod transport;

// Re-export primary types for convenience.
pub use config::{EngineConfig, LookupConfig, UpdateVerb};
pub use diagnostics::{DiagnosticSink, MemorySink, NoopSink, SyncFailure, TracingSink};
pub use engine::{SyncEngine, SyncEngineBuilder};
pub use error::{DecodeError, LookupError, SyncError, TransportError};
pub use http::HttpTransport;
pub use item::{Item, ItemId, JsonItem};
pub use lookup::{Lookup, LookupOutcome, LookupState, NotFoundReason, RouteKey};
pub use resource::{JsonResource, Resource};
pub use snapshot::{Snapshot, SnapshotStore, SnapshotStream};
pub use transport::{Method, QueryParams, RemoteRequest, Transport};
