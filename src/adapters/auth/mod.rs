//! Authentication adapters.
//!
//! Implementations of the `CredentialProvider` and `EndpointResolver` ports:
//!
//! - `TokenStore` - bearer token handed over by the login flow
//! - `StaticEndpoint` - fixed realtime endpoint URL from configuration

mod token_store;

pub use token_store::{StaticEndpoint, TokenStore};
