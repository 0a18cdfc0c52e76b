//! Tunables for the sync engine and the lookup protocol.
//!
//! Defaults reproduce the established backend contract: two retries per
//! call, single-item fetches against the collection endpoint, updates sent
//! as `POST {endpoint}/{id}`, and a lookup budget of two fetches.

use std::time::Duration;

use serde::Deserialize;

use crate::transport::Method;

/// Default number of additional attempts after a failed remote call.
pub const DEFAULT_RETRIES: u32 = 2;

/// Default number of fetches a lookup may trigger before giving up.
pub const DEFAULT_LOOKUP_BUDGET: u32 = 2;

/// Verb used by `update`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateVerb {
    /// `POST {endpoint}/{id}`, what existing backends accept.
    #[default]
    Post,
    /// `PUT {endpoint}/{id}`.
    Put,
}

impl UpdateVerb {
    /// The transport method for this verb.
    pub const fn method(self) -> Method {
        match self {
            Self::Post => Method::Post,
            Self::Put => Method::Put,
        }
    }
}

/// Sync engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Additional attempts after the first failed call.
    pub retries: u32,
    /// When true, `fetch_one` requests `{endpoint}/{id}` instead of the
    /// bare collection endpoint.
    pub fetch_one_by_id: bool,
    /// Verb used by `update`.
    pub update_verb: UpdateVerb,
}

impl EngineConfig {
    /// Total attempts per remote call.
    pub const fn attempts(&self) -> u32 {
        self.retries.saturating_add(1)
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            retries: DEFAULT_RETRIES,
            fetch_one_by_id: false,
            update_verb: UpdateVerb::Post,
        }
    }
}

/// Lookup protocol configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Fetches a lookup may trigger while the item is missing.
    pub budget: u32,
    /// Overall deadline; `None` waits for snapshot emissions only.
    #[serde(with = "optional_millis")]
    pub timeout: Option<Duration>,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            budget: DEFAULT_LOOKUP_BUDGET,
            timeout: None,
        }
    }
}

mod optional_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer};

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Ok(Option::<u64>::deserialize(deserializer)?.map(Duration::from_millis))
    }
}
