//! Per-client argument profiles.
//!
//! A profile is a set of argument values configured for a client id. When a
//! request names that client, the profile is merged over the caller's raw
//! arguments before binding: profile values win, and the merged map is still
//! filtered by the tool's schema.

use std::borrow::Cow;
use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::debug;

/// Argument overlays keyed by client id.
#[derive(Clone, Debug, Default)]
pub struct ClientProfiles {
    profiles: HashMap<String, Map<String, Value>>,
}

impl ClientProfiles {
    /// Creates an empty profile set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the overlay for `client_id`.
    pub fn insert(&mut self, client_id: impl Into<String>, overlay: Map<String, Value>) {
        self.profiles.insert(client_id.into(), overlay);
    }

    /// Returns the overlay for `client_id`.
    #[must_use]
    pub fn get(&self, client_id: &str) -> Option<&Map<String, Value>> {
        self.profiles.get(client_id)
    }

    /// Returns the number of configured profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Returns `true` when no profiles are configured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// Merges the overlay for `client_id` into `raw`.
    ///
    /// Returns `raw` unchanged (borrowed) when no client id is given or no
    /// profile exists for it. An unknown client id is logged at debug level.
    #[must_use]
    pub fn apply<'a>(
        &self,
        client_id: Option<&str>,
        raw: &'a Map<String, Value>,
    ) -> Cow<'a, Map<String, Value>> {
        let Some(client_id) = client_id else {
            return Cow::Borrowed(raw);
        };
        let Some(overlay) = self.profiles.get(client_id) else {
            debug!(client_id, "no profile configured for client");
            return Cow::Borrowed(raw);
        };
        let mut merged = raw.clone();
        for (key, value) in overlay {
            merged.insert(key.clone(), value.clone());
        }
        Cow::Owned(merged)
    }
}

impl FromIterator<(String, Map<String, Value>)> for ClientProfiles {
    fn from_iter<I: IntoIterator<Item = (String, Map<String, Value>)>>(iter: I) -> Self {
        Self {
            profiles: iter.into_iter().collect(),
        }
    }
}
