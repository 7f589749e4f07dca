//! Request dispatcher
//!
//! Routing looks only at the request path (leading slash stripped, exact,
//! case-sensitive). Method, headers and body are ignored.
//!
//! | path                 | behaviour                                      |
//! |----------------------|------------------------------------------------|
//! | `authorize-me`       | 301 to the provider's authorization URL        |
//! | `auth-code-redirect` | exchange the code, 301 to the landing path     |
//! | anything else        | call the resource, or 301 to `/authorize-me`   |

use std::sync::Arc;
use std::time::Instant;

use auth_flow::{AuthFlowController, CallbackParams};
use axum::extract::{Query, State};
use axum::http::header::{CONTENT_TYPE, LOCATION};
use axum::http::{StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use resource::ProtectedResource;
use tracing::{error, info, instrument, warn};

use crate::error::DispatchError;

pub const AUTHORIZE_ME_PATH: &str = "/authorize-me";

const DEFAULT_CONTENT_TYPE: &str = "application/json";

/// Shared state accessible from the dispatcher.
#[derive(Clone)]
pub struct AppState {
    pub controller: Arc<AuthFlowController>,
    pub resource: Arc<dyn ProtectedResource>,
    /// Where the browser goes after a successful exchange
    pub landing_path: Arc<str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    AuthorizeMe,
    AuthCodeRedirect,
    Default,
}

impl Route {
    pub fn classify(path: &str) -> Self {
        match path.strip_prefix('/').unwrap_or(path) {
            "authorize-me" => Route::AuthorizeMe,
            "auth-code-redirect" => Route::AuthCodeRedirect,
            _ => Route::Default,
        }
    }

    /// Metric and log label.
    pub fn label(&self) -> &'static str {
        match self {
            Route::AuthorizeMe => "authorize_me",
            Route::AuthCodeRedirect => "auth_code_redirect",
            Route::Default => "default",
        }
    }
}

/// Catch-all handler: every request on the helper's port lands here.
pub async fn handle_request(State(state): State<AppState>, uri: Uri) -> Response {
    let request_id = format!("req_{}", uuid::Uuid::new_v4().as_simple());
    dispatch(&state, &uri, request_id).await
}

#[instrument(skip_all, fields(request_id = %request_id, path = %uri.path()))]
async fn dispatch(state: &AppState, uri: &Uri, request_id: String) -> Response {
    let started = Instant::now();
    let route = Route::classify(uri.path());
    info!(route = route.label(), "request received");

    let response = match route {
        Route::AuthorizeMe => authorize_me(state).await,
        Route::AuthCodeRedirect => auth_code_redirect(state, uri).await,
        Route::Default => default_flow(state).await,
    };

    let status = response.status().as_u16();
    let duration = started.elapsed();
    info!(
        route = route.label(),
        status,
        duration_ms = duration.as_millis() as u64,
        "request completed"
    );
    crate::metrics::record_request(route.label(), status, duration.as_secs_f64());
    response
}

async fn authorize_me(state: &AppState) -> Response {
    match state.controller.begin_authorization().await {
        Ok(url) => moved_permanently(url.as_str()),
        Err(e) => {
            error!(error = %e, "cannot build authorization URL");
            DispatchError::from(e).into_response()
        }
    }
}

async fn auth_code_redirect(state: &AppState, uri: &Uri) -> Response {
    let params = match Query::<CallbackParams>::try_from_uri(uri) {
        Ok(Query(params)) => params,
        Err(rejection) => {
            // Treated like a provider denial: no exchange, no token change.
            warn!(error = %rejection, "unparsable callback query");
            crate::metrics::record_token_exchange("denied");
            return DispatchError::from(auth_flow::Error::AuthorizationDenied(format!(
                "malformed callback query: {rejection}"
            )))
            .into_response();
        }
    };

    match state.controller.handle_callback(params).await {
        Ok(_) => {
            crate::metrics::record_token_exchange("success");
            moved_permanently(&state.landing_path)
        }
        Err(e) => {
            let err = DispatchError::from(e);
            crate::metrics::record_token_exchange(err.exchange_outcome());
            match err.status() {
                StatusCode::BAD_REQUEST => warn!(error = %err, "authorization callback rejected"),
                _ => error!(error = %err, "authorization callback failed"),
            }
            err.into_response()
        }
    }
}

async fn default_flow(state: &AppState) -> Response {
    let tokens = match state.controller.ensure_authenticated().await {
        Ok(tokens) => tokens,
        Err(e) => {
            info!(reason = %e, "no usable token, restarting authorization");
            return reauthorize(DispatchError::from(e));
        }
    };

    match state.resource.call(tokens.access_token()).await {
        Ok(upstream) => {
            let content_type = upstream
                .content_type
                .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
            (StatusCode::OK, [(CONTENT_TYPE, content_type)], upstream.body).into_response()
        }
        Err(e) => {
            warn!(
                resource = state.resource.id(),
                error = %e,
                "resource call failed, restarting authorization"
            );
            state.controller.invalidate_if(&tokens).await;
            reauthorize(DispatchError::from(e))
        }
    }
}

fn reauthorize(err: DispatchError) -> Response {
    if let Some(reason) = err.reauthorization_reason() {
        crate::metrics::record_reauthorization(reason);
    }
    err.into_response()
}

/// 301 with a `Location` header.
pub(crate) fn moved_permanently(location: &str) -> Response {
    (StatusCode::MOVED_PERMANENTLY, [(LOCATION, location.to_string())]).into_response()
}
