//! Service-specific error types
//!
//! Every per-request failure ends up as a `DispatchError` response.
//! `NoValidToken` and upstream failures are not terminal: they answer with
//! a 301 back to `/authorize-me`.

use axum::http::StatusCode;
use axum::http::header::CONTENT_TYPE;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::routes::{AUTHORIZE_ME_PATH, moved_permanently};

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Flow(#[from] auth_flow::Error),

    #[error(transparent)]
    Upstream(#[from] resource::Error),
}

impl DispatchError {
    /// HTTP status the browser sees for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::Flow(auth_flow::Error::AuthorizationDenied(_)) => {
                StatusCode::BAD_REQUEST
            }
            DispatchError::Flow(auth_flow::Error::Configuration(_))
            | DispatchError::Flow(auth_flow::Error::Store(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            DispatchError::Flow(auth_flow::Error::TokenExchange(_)) => StatusCode::BAD_GATEWAY,
            DispatchError::Flow(auth_flow::Error::NoValidToken) | DispatchError::Upstream(_) => {
                StatusCode::MOVED_PERMANENTLY
            }
        }
    }

    /// Label for `oauth_helper_reauthorizations_total`, if this error sends
    /// the browser back through authorization.
    pub fn reauthorization_reason(&self) -> Option<&'static str> {
        match self {
            DispatchError::Flow(auth_flow::Error::NoValidToken) => Some("no_token"),
            DispatchError::Upstream(e) if e.is_unauthorized() => Some("upstream_unauthorized"),
            DispatchError::Upstream(_) => Some("upstream_error"),
            DispatchError::Flow(_) => None,
        }
    }

    /// Label for the `oauth_helper_token_exchanges_total` outcome.
    pub fn exchange_outcome(&self) -> &'static str {
        match self {
            DispatchError::Flow(auth_flow::Error::AuthorizationDenied(_)) => "denied",
            DispatchError::Flow(auth_flow::Error::Configuration(_)) => "configuration",
            DispatchError::Flow(auth_flow::Error::Store(_)) => "store_failed",
            _ => "exchange_failed",
        }
    }
}

impl IntoResponse for DispatchError {
    fn into_response(self) -> Response {
        if self.reauthorization_reason().is_some() {
            return moved_permanently(AUTHORIZE_ME_PATH);
        }
        (
            self.status(),
            [(CONTENT_TYPE, "text/plain; charset=utf-8")],
            self.to_string(),
        )
            .into_response()
    }
}
