//! Error types for the authorization flow

/// Errors from authorization flow operations.
///
/// Every variant is recoverable at the request boundary: the dispatcher
/// turns it into a redirect or an error response.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("authorization denied: {0}")]
    AuthorizationDenied(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("no valid token available")]
    NoValidToken,

    #[error("token store error: {0}")]
    Store(String),
}

impl From<oauth_client::Error> for Error {
    fn from(err: oauth_client::Error) -> Self {
        match err {
            oauth_client::Error::Configuration(msg) => Error::Configuration(msg),
            oauth_client::Error::Http(msg) | oauth_client::Error::TokenExchange(msg) => {
                Error::TokenExchange(msg)
            }
            oauth_client::Error::CredentialParse(msg) | oauth_client::Error::Io(msg) => {
                Error::Store(msg)
            }
        }
    }
}

/// Result alias for flow operations.
pub type Result<T> = std::result::Result<T, Error>;
