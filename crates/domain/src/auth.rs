//! Credential lookup for the transport layer.
//!
//! Callers receive a [`CredentialStore`] by injection; tests and the demo
//! server build an [`InMemoryCredentialStore`] with fixture users.

use std::collections::HashMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// What an authenticated caller is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Owns a store and manages its pets.
    Merchant,
    /// Buys pets.
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Merchant => "merchant",
            Role::Customer => "customer",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored credential. `password_hash` has the form `salt$hex(sha256(salt || password))`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credential {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
}

impl Credential {
    pub fn verify(&self, password: &str) -> bool {
        verify_password(password, &self.password_hash)
    }
}

/// Swappable credential lookup.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn lookup(&self, username: &str) -> Option<Credential>;

    /// Returns the credential when the password matches.
    async fn authenticate(&self, username: &str, password: &str) -> Option<Credential> {
        self.lookup(username)
            .await
            .filter(|credential| credential.verify(password))
    }
}

/// Credential store backed by a map, built once and read concurrently.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCredentialStore {
    users: HashMap<String, Credential>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a user, hashing the password with a fresh salt.
    pub fn with_user(mut self, username: impl Into<String>, password: &str, role: Role) -> Self {
        let username = username.into();
        let credential = Credential {
            username: username.clone(),
            password_hash: hash_password(password),
            role,
        };
        self.users.insert(username, credential);
        self
    }

    /// The demo accounts: one merchant and two customers.
    pub fn demo() -> Self {
        Self::new()
            .with_user("merchant1", "merchant123", Role::Merchant)
            .with_user("customer1", "customer123", Role::Customer)
            .with_user("customer2", "customer123", Role::Customer)
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn lookup(&self, username: &str) -> Option<Credential> {
        self.users.get(username).cloned()
    }
}

fn digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hashes a password with a random salt.
pub fn hash_password(password: &str) -> String {
    let salt = Uuid::new_v4().simple().to_string();
    format!("{salt}${}", digest(&salt, password))
}

/// Checks a password against a hash produced by [`hash_password`].
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once('$') else {
        return false;
    };
    let actual = digest(salt, password);

    actual.len() == expected.len()
        && actual
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_salted() {
        let a = hash_password("secret");
        let b = hash_password("secret");
        assert_ne!(a, b);
        assert!(verify_password("secret", &a));
        assert!(verify_password("secret", &b));
        assert!(!verify_password("Secret", &a));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("secret", "no-separator"));
        assert!(!verify_password("secret", "salt$short"));
    }

    #[tokio::test]
    async fn authenticate_checks_password_and_role() {
        let store = InMemoryCredentialStore::demo();

        let merchant = store.authenticate("merchant1", "merchant123").await.unwrap();
        assert_eq!(merchant.role, Role::Merchant);

        let customer = store.authenticate("customer2", "customer123").await.unwrap();
        assert_eq!(customer.role, Role::Customer);

        assert!(store.authenticate("merchant1", "wrong").await.is_none());
        assert!(store.authenticate("nobody", "merchant123").await.is_none());
    }
}
