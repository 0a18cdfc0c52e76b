//! Shared fixtures: a scripted in-memory transport and hook recorders.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use streamcrud_core::{
    JsonItem, JsonResource, Method, RemoteRequest, SyncEngine, Transport, TransportError,
};

/// Endpoint used by every fixture engine.
pub const ENDPOINT: &str = "/api/items";

#[derive(Default)]
struct Script {
    requests: Vec<RemoteRequest>,
    responses: VecDeque<Result<serde_json::Value, TransportError>>,
    fallback: Option<Result<serde_json::Value, TransportError>>,
    delay: Option<Duration>,
}

/// Transport that replays queued responses and records every request.
///
/// Once the queue is empty the fallback answers; without a fallback every
/// call fails with a connection error.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    script: Arc<Mutex<Script>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_ok(&self, payload: serde_json::Value) -> &Self {
        self.lock().responses.push_back(Ok(payload));
        self
    }

    pub fn push_err(&self, error: TransportError) -> &Self {
        self.lock().responses.push_back(Err(error));
        self
    }

    pub fn always(&self, response: Result<serde_json::Value, TransportError>) -> &Self {
        self.lock().fallback = Some(response);
        self
    }

    /// Hold every response for `delay` (on the tokio clock).
    pub fn delay(&self, delay: Duration) -> &Self {
        self.lock().delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<RemoteRequest> {
        self.lock().requests.clone()
    }

    pub fn count(&self, method: Method) -> usize {
        self.lock()
            .requests
            .iter()
            .filter(|r| r.method == method)
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Transport for ScriptedTransport {
    async fn execute(&self, request: &RemoteRequest) -> Result<serde_json::Value, TransportError> {
        let delay = {
            let mut script = self.lock();
            script.requests.push(request.clone());
            script.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut script = self.lock();
        match script.responses.pop_front() {
            Some(response) => response,
            None => script.fallback.clone().unwrap_or_else(|| {
                Err(TransportError::Request("connection refused".to_owned()))
            }),
        }
    }
}

/// Collects items passed to a hook.
#[derive(Clone, Default)]
pub struct Recorder {
    seen: Arc<Mutex<Vec<JsonItem>>>,
}

impl Recorder {
    pub fn hook(&self) -> impl Fn(&JsonItem) + Send + Sync + 'static {
        let seen = Arc::clone(&self.seen);
        move |item: &JsonItem| {
            seen.lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(item.clone());
        }
    }

    pub fn seen(&self) -> Vec<JsonItem> {
        self.seen
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

pub type TestResource = JsonResource<JsonItem>;

pub type TestEngine = SyncEngine<TestResource, ScriptedTransport>;

pub fn resource() -> TestResource {
    JsonResource::new(ENDPOINT)
}

pub fn named(id: i64, name: &str) -> JsonItem {
    JsonItem::new(id).with("name", name)
}

pub fn name_of(item: &JsonItem) -> String {
    item.get("name")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default()
        .to_owned()
}
