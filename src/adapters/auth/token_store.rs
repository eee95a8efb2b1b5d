//! Token store and static endpoint.
//!
//! The login flow lives outside this crate; it hands the bearer token to a
//! [`TokenStore`] which the connection reads at connect time.

use std::sync::{PoisonError, RwLock};

use secrecy::SecretString;

use crate::ports::{CredentialProvider, EndpointResolver};

/// Holds the current bearer token, if the user is logged in.
#[derive(Debug, Default)]
pub struct TokenStore {
    token: RwLock<Option<SecretString>>,
}

impl TokenStore {
    /// Creates an empty store (logged out).
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: RwLock::new(Some(SecretString::new(token.into()))),
        }
    }

    /// Replaces the stored token. Blank tokens clear the store.
    pub fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        let value = if token.trim().is_empty() {
            None
        } else {
            Some(SecretString::new(token))
        };
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = value;
    }

    pub fn clear(&self) {
        self.token
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }

    pub fn is_present(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl CredentialProvider for TokenStore {
    fn credential(&self) -> Option<SecretString> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Endpoint resolver returning a fixed URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticEndpoint {
    url: String,
}

impl StaticEndpoint {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl EndpointResolver for StaticEndpoint {
    fn endpoint_url(&self) -> String {
        self.url.clone()
    }
}
