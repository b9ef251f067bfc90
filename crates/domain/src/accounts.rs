//! Customer identity: account ids, cart keys and the account directory.
//!
//! Sessions and credentials are issued elsewhere. The core only needs to
//! resolve a bearer token to a [`Principal`] and to know whether an account
//! id refers to a real account.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use common::AggregateId;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Prefix of anonymous (not signed in) cart keys.
pub const ANONYMOUS_PREFIX: &str = "temp_";

const ACCOUNT_ID_LEN: usize = 24;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    #[error("malformed account id '{0}'")]
    MalformedAccountId(String),

    #[error("malformed cart key '{0}'")]
    MalformedCartKey(String),
}

/// A 24-character hexadecimal account identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccountId(String);

impl AccountId {
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        if raw.len() == ACCOUNT_ID_LEN && raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(raw.to_ascii_lowercase()))
        } else {
            Err(IdentityError::MalformedAccountId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for AccountId {
    type Error = IdentityError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AccountId> for String {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl std::fmt::Display for AccountId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key a cart is stored under: an account id or an anonymous `temp_` key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum CustomerKey {
    Account(AccountId),
    Anonymous(String),
}

impl CustomerKey {
    /// Parses a key from a request path segment.
    pub fn parse(raw: &str) -> Result<Self, IdentityError> {
        if let Some(suffix) = raw.strip_prefix(ANONYMOUS_PREFIX) {
            let valid = !suffix.is_empty()
                && suffix
                    .bytes()
                    .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-');
            return if valid {
                Ok(CustomerKey::Anonymous(raw.to_string()))
            } else {
                Err(IdentityError::MalformedCartKey(raw.to_string()))
            };
        }
        AccountId::parse(raw)
            .map(CustomerKey::Account)
            .map_err(|_| IdentityError::MalformedCartKey(raw.to_string()))
    }

    /// The account behind this key, if it is not anonymous.
    pub fn account_id(&self) -> Option<&AccountId> {
        match self {
            CustomerKey::Account(id) => Some(id),
            CustomerKey::Anonymous(_) => None,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            CustomerKey::Account(id) => id.as_str(),
            CustomerKey::Anonymous(key) => key,
        }
    }

    /// Event stream the cart for this key lives in.
    pub fn cart_stream(&self) -> AggregateId {
        AggregateId::from_key(self.as_str()).scoped("cart")
    }
}

impl From<AccountId> for CustomerKey {
    fn from(id: AccountId) -> Self {
        CustomerKey::Account(id)
    }
}

impl std::fmt::Display for CustomerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Customer,
    Admin,
}

/// An authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub account_id: AccountId,
    pub role: Role,
}

impl Principal {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Token and account lookup owned by the identity service.
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    /// Resolves a session token to its principal.
    async fn authenticate(&self, token: &str) -> Option<Principal>;

    /// Returns true if the account exists.
    async fn exists(&self, account_id: &AccountId) -> bool;
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryAccountDirectory {
    sessions: Arc<RwLock<HashMap<String, Principal>>>,
}

impl InMemoryAccountDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an account and a session token for it.
    pub async fn register(&self, token: impl Into<String>, principal: Principal) {
        self.sessions.write().await.insert(token.into(), principal);
    }
}

#[async_trait]
impl AccountDirectory for InMemoryAccountDirectory {
    async fn authenticate(&self, token: &str) -> Option<Principal> {
        self.sessions.read().await.get(token).cloned()
    }

    async fn exists(&self, account_id: &AccountId) -> bool {
        self.sessions
            .read()
            .await
            .values()
            .any(|p| &p.account_id == account_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ACCOUNT: &str = "507f1f77bcf86cd799439011";

    #[test]
    fn account_ids_are_24_hex_chars() {
        assert!(AccountId::parse(ACCOUNT).is_ok());
        assert!(AccountId::parse("507f1f77bcf86cd79943901").is_err());
        assert!(AccountId::parse("507f1f77bcf86cd79943901z").is_err());
    }

    #[test]
    fn cart_keys() {
        let account = CustomerKey::parse(ACCOUNT).unwrap();
        assert_eq!(account.account_id().map(AccountId::as_str), Some(ACCOUNT));
        assert_eq!(account.cart_stream().as_str(), format!("cart-{ACCOUNT}"));

        let anon = CustomerKey::parse("temp_k9x2").unwrap();
        assert!(anon.account_id().is_none());

        for bad in ["", "temp_", "guest-1", "temp_a/b"] {
            assert!(matches!(
                CustomerKey::parse(bad),
                Err(IdentityError::MalformedCartKey(_))
            ));
        }
    }

    #[tokio::test]
    async fn directory_resolves_tokens() {
        let directory = InMemoryAccountDirectory::new();
        let principal = Principal {
            account_id: AccountId::parse(ACCOUNT).unwrap(),
            role: Role::Customer,
        };
        directory.register("tok-1", principal.clone()).await;

        assert_eq!(directory.authenticate("tok-1").await, Some(principal.clone()));
        assert!(directory.authenticate("nope").await.is_none());
        assert!(directory.exists(&principal.account_id).await);
        assert!(
            !directory
                .exists(&AccountId::parse("ffffffffffffffffffffffff").unwrap())
                .await
        );
    }
}
