//! The capability set describing one remote collection.
//!
//! A [`Resource`] names where the collection lives and how to turn a raw
//! payload into a typed item. It replaces subclassing: the engine is built
//! from a resource value plus a transport.

use std::marker::PhantomData;

use serde::de::DeserializeOwned;

use crate::error::DecodeError;
use crate::item::Item;

/// Where a collection lives and how its payloads decode.
pub trait Resource: Send + Sync + 'static {
    /// The item type stored in the mirror.
    type Item: Item;

    /// Collection endpoint, e.g. `/api/books`.
    fn endpoint(&self) -> &str;

    /// Decode a single item payload.
    fn decode(&self, payload: serde_json::Value) -> Result<Self::Item, DecodeError>;

    /// Decode a list payload, item by item.
    ///
    /// Fails on the first item that does not decode, or when the payload is
    /// not a JSON array.
    fn decode_list(&self, payload: serde_json::Value) -> Result<Vec<Self::Item>, DecodeError> {
        match payload {
            serde_json::Value::Array(values) => {
                values.into_iter().map(|value| self.decode(value)).collect()
            }
            other => Err(DecodeError::Shape(format!(
                "expected an array, got {}",
                json_kind(&other)
            ))),
        }
    }
}

/// A resource whose items deserialize straight from JSON with `serde`.
pub struct JsonResource<T> {
    endpoint: String,
    _item: PhantomData<fn() -> T>,
}

impl<T> JsonResource<T> {
    /// Create a resource for the given collection endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            _item: PhantomData,
        }
    }
}

impl<T> Resource for JsonResource<T>
where
    T: Item + DeserializeOwned,
{
    type Item = T;

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn decode(&self, payload: serde_json::Value) -> Result<T, DecodeError> {
        Ok(serde_json::from_value(payload)?)
    }
}

const fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}
