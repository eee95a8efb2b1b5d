//! Credential and endpoint ports.
//!
//! Token acquisition (login) and endpoint discovery belong to collaborators
//! outside the realtime core; the connection only asks for their current
//! values at connect time.

use secrecy::SecretString;

/// Source of the bearer credential obtained out-of-band (e.g. at login).
pub trait CredentialProvider: Send + Sync {
    /// Current credential, `None` when the user is not logged in.
    fn credential(&self) -> Option<SecretString>;
}

/// Resolves the realtime endpoint URL.
pub trait EndpointResolver: Send + Sync {
    fn endpoint_url(&self) -> String;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[allow(dead_code)]
    fn assert_provider_object_safe(_: &dyn CredentialProvider) {}

    #[allow(dead_code)]
    fn assert_resolver_object_safe(_: &dyn EndpointResolver) {}

    fn assert_send_sync<T: Send + Sync + ?Sized>() {}

    #[test]
    fn token_store_and_static_endpoint_serve_as_shared_ports() {
        use crate::adapters::auth::{StaticEndpoint, TokenStore};
        use secrecy::ExposeSecret;
        use std::sync::Arc;

        assert_send_sync::<TokenStore>();
        assert_send_sync::<dyn CredentialProvider>();
        let provider: Arc<dyn CredentialProvider> = Arc::new(TokenStore::with_token("jwt"));
        let resolver: Arc<dyn EndpointResolver> =
            Arc::new(StaticEndpoint::new("ws://localhost:8080/ws"));

        let credential = provider.credential().map(|token| token.expose_secret().clone());

        assert_eq!(credential.as_deref(), Some("jwt"));
        assert_eq!(resolver.endpoint_url(), "ws://localhost:8080/ws");
    }
}
