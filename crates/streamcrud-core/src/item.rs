//! Item model for mirrored collections.
//!
//! Every mirrored entity carries an [`ItemId`]. The id is either an integer
//! or a string; the two never compare equal, so `1` and `"1"` are distinct
//! keys exactly as they are in the remote JSON payloads.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of an item in a mirrored collection.
///
/// Serialized untagged: JSON numbers map to [`ItemId::Int`], JSON strings
/// to [`ItemId::Str`].
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemId {
    /// Integer identifier.
    Int(i64),
    /// String identifier.
    Str(String),
}

impl ItemId {
    /// Whether this id is the integer variant.
    pub const fn is_integer(&self) -> bool {
        matches!(self, Self::Int(_))
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(n) => write!(f, "{n}"),
            Self::Str(s) => f.write_str(s),
        }
    }
}

impl From<i64> for ItemId {
    fn from(id: i64) -> Self {
        Self::Int(id)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self::Str(id.to_owned())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self::Str(id)
    }
}

/// An entity that can live in a mirrored collection.
///
/// The id must be unique and stable for the lifetime of the item. All other
/// attributes are opaque to the mirror.
pub trait Item: Clone + Serialize + Send + Sync + 'static {
    /// The item's identifier.
    fn id(&self) -> &ItemId;
}

/// A schemaless item: an id plus whatever attributes the backend sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonItem {
    /// The item's identifier.
    pub id: ItemId,
    /// All remaining attributes, preserved verbatim.
    #[serde(flatten)]
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl JsonItem {
    /// Create an item with no attributes.
    pub fn new(id: impl Into<ItemId>) -> Self {
        Self {
            id: id.into(),
            attributes: serde_json::Map::new(),
        }
    }

    /// Builder-style attribute setter.
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.attributes.insert(key.to_owned(), value.into());
        self
    }

    /// Look up a single attribute.
    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.attributes.get(key)
    }
}

impl Item for JsonItem {
    fn id(&self) -> &ItemId {
        &self.id
    }
}
