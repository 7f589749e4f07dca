//! OAuth2 authorization-code client library
//!
//! Provides the pieces of the authorization-code grant that talk to the
//! identity provider or to disk: client-secrets loading, authorization URL
//! construction, code exchange, and the durable token store. The stateful
//! flow that sequences them lives in the `auth-flow` crate.
//!
//! Credential flow:
//! 1. Startup calls `credentials::load_client_credentials()` once
//! 2. User is redirected to `authorize::build_authorization_url()`
//! 3. Provider redirects back with a code; `token::exchange_code()` trades it
//! 4. The resulting `TokenPair` is persisted via `store::TokenStore::save()`
//! 5. After a restart, `store::TokenStore::load()` restores the pair

pub mod authorize;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod store;
pub mod token;

pub use authorize::build_authorization_url;
pub use constants::*;
pub use credentials::{ClientCredentials, load_client_credentials, parse_client_credentials};
pub use error::{Error, Result};
pub use store::{FileTokenStore, TokenStore};
pub use token::{TokenPair, TokenResponse, exchange_code};
