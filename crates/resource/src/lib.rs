//! Protected resource access
//!
//! Defines the `ProtectedResource` trait that decouples the request flow
//! from whatever the application does with a valid access token. The flow
//! hands over a bearer token and gets back either the resource body or an
//! `Error`; it treats every error as "the token is probably no longer good"
//! and restarts authorization.

pub mod http;

pub use http::HttpResource;

use std::future::Future;
use std::pin::Pin;

/// Body returned by a successful resource call.
#[derive(Debug, Clone)]
pub struct ResourceResponse {
    pub status: u16,
    /// `Content-Type` reported by the resource server, if any
    pub content_type: Option<String>,
    pub body: String,
}

/// Errors from a protected resource call.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("upstream call failed: {0}")]
    Transport(String),

    #[error("upstream call returned {status}: {body}")]
    Status { status: u16, body: String },
}

impl Error {
    /// Whether the resource server rejected the token outright (401/403).
    ///
    /// Only used to label logs and metrics; callers react to every error
    /// the same way.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Error::Status { status: 401 | 403, .. })
    }
}

/// Result alias for resource calls.
pub type Result<T> = std::result::Result<T, Error>;

/// A resource that accepts an OAuth bearer token.
///
/// Uses `Pin<Box<dyn Future>>` return types for dyn-compatibility
/// (`Arc<dyn ProtectedResource>`).
pub trait ProtectedResource: Send + Sync {
    /// Identifier for logging (e.g. the resource URL)
    fn id(&self) -> &str;

    /// Issue one authenticated request with `access_token`.
    fn call<'a>(
        &'a self,
        access_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ResourceResponse>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unauthorized_statuses_are_flagged() {
        for status in [401, 403] {
            let err = Error::Status {
                status,
                body: String::new(),
            };
            assert!(err.is_unauthorized(), "{status} should be unauthorized");
        }
    }

    #[test]
    fn other_errors_are_not_flagged_unauthorized() {
        let server_error = Error::Status {
            status: 500,
            body: "boom".into(),
        };
        assert!(!server_error.is_unauthorized());
        assert!(!Error::Transport("connection refused".into()).is_unauthorized());
    }

    #[test]
    fn status_error_display_includes_status_and_body() {
        let err = Error::Status {
            status: 401,
            body: "invalid_token".into(),
        };
        assert_eq!(err.to_string(), "upstream call returned 401: invalid_token");
    }
}
