//! Error types for OAuth client operations

/// Errors from OAuth client operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("credential parse error: {0}")]
    CredentialParse(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// Result alias for OAuth client operations.
pub type Result<T> = std::result::Result<T, Error>;
