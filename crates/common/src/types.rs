use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of an event stream (one aggregate instance).
///
/// Orders and checkout logs use generated UUIDs, while carts are keyed by
/// the customer key they belong to, so the identifier is string-backed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AggregateId(String);

impl AggregateId {
    /// Creates a new random aggregate ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Creates an aggregate ID from a natural key.
    pub fn from_key(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Creates an aggregate ID from an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid.to_string())
    }

    /// Returns a derived ID living in a separate stream namespace.
    ///
    /// `AggregateId::from_key("42").scoped("checkout")` is `checkout-42`.
    pub fn scoped(&self, prefix: &str) -> Self {
        Self(format!("{prefix}-{}", self.0))
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for AggregateId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AggregateId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Uuid> for AggregateId {
    fn from(uuid: Uuid) -> Self {
        Self::from_uuid(uuid)
    }
}

impl From<&str> for AggregateId {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for AggregateId {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl AsRef<str> for AggregateId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
