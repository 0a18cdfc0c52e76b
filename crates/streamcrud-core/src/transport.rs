//! The seam between the sync engine and the remote backend.
//!
//! A [`Transport`] executes one [`RemoteRequest`] and hands back the decoded
//! JSON payload. The engine owns retries and merging; a transport only moves
//! bytes. [`HttpTransport`](crate::http::HttpTransport) is the production
//! implementation.

use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::TransportError;
use crate::item::ItemId;

/// Extra query parameters attached to a remote call.
pub type QueryParams = BTreeMap<String, String>;

/// HTTP verb of a remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    /// Read.
    Get,
    /// Create, and update against the default backend contract.
    Post,
    /// Update, when the backend supports the conventional verb.
    Put,
    /// Delete.
    Delete,
}

impl Method {
    /// Upper-case verb name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One call against a collection endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteRequest {
    /// Verb.
    pub method: Method,
    /// Collection endpoint (URL or path relative to the transport's base).
    pub endpoint: String,
    /// Optional trailing id segment.
    pub id: Option<ItemId>,
    /// Query parameters; empty means no query string.
    pub query: QueryParams,
    /// JSON body for `POST`/`PUT`.
    pub body: Option<serde_json::Value>,
}

impl RemoteRequest {
    /// A request against the bare collection endpoint.
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            id: None,
            query: QueryParams::new(),
            body: None,
        }
    }

    /// Target `{endpoint}/{id}`.
    #[must_use]
    pub fn with_id(mut self, id: ItemId) -> Self {
        self.id = Some(id);
        self
    }

    /// Attach query parameters. `None` leaves the query empty.
    #[must_use]
    pub fn with_query(mut self, params: Option<&QueryParams>) -> Self {
        if let Some(params) = params {
            self.query.extend(params.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        self
    }

    /// Attach a JSON body.
    #[must_use]
    pub fn with_body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Endpoint plus the optional id segment, without query string.
    pub fn path(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        match &self.id {
            Some(id) => format!("{base}/{id}"),
            None => base.to_owned(),
        }
    }
}

/// Executes remote calls on behalf of the sync engine.
///
/// Implementations must be cheap to share; the engine clones its handle
/// into spawned tasks.
pub trait Transport: Send + Sync + 'static {
    /// Perform the request once and return the response payload.
    ///
    /// An empty response body is reported as [`serde_json::Value::Null`].
    fn execute(
        &self,
        request: &RemoteRequest,
    ) -> impl Future<Output = Result<serde_json::Value, TransportError>> + Send;
}
