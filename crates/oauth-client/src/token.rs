//! Token pair and authorization-code exchange
//!
//! The exchange POSTs the code to the provider's token endpoint as
//! form-encoded data and accepts the result only when it carries both an
//! access token and a refresh token. A partial response never produces a
//! `TokenPair`.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::constants::GRANT_TYPE_AUTHORIZATION_CODE;
use crate::credentials::ClientCredentials;
use crate::error::{Error, Result};

/// The current authenticated session: an access token and its refresh token.
///
/// Both fields are always non-empty. The constructors return `None` for a
/// partial pair so that one can never be held or persisted.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct TokenPair {
    access_token: String,
    refresh_token: String,
}

impl TokenPair {
    /// Build a pair from two token strings. Returns `None` if either is empty.
    pub fn new(access_token: impl Into<String>, refresh_token: impl Into<String>) -> Option<Self> {
        Self::from_parts(Some(access_token.into()), Some(refresh_token.into()))
    }

    /// Build a pair from optional parts as found in untrusted input.
    pub fn from_parts(access_token: Option<String>, refresh_token: Option<String>) -> Option<Self> {
        match (access_token, refresh_token) {
            (Some(access_token), Some(refresh_token))
                if !access_token.is_empty() && !refresh_token.is_empty() =>
            {
                Some(Self {
                    access_token,
                    refresh_token,
                })
            }
            _ => None,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn refresh_token(&self) -> &str {
        &self.refresh_token
    }
}

impl fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .finish()
    }
}

/// Body returned by the token endpoint.
///
/// Every field is optional so a response missing one of the tokens can be
/// reported as an incomplete exchange rather than a parse failure.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    /// Seconds until the access token expires (delta, not absolute)
    pub expires_in: Option<u64>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Convert into a usable pair, or `None` if either token is missing.
    pub fn into_pair(self) -> Option<TokenPair> {
        TokenPair::from_parts(self.access_token, self.refresh_token)
    }
}

/// Exchange an authorization code for a token pair.
///
/// Posts `client_id`, `client_secret`, `code`, `grant_type` and
/// `redirect_uri` to the token endpoint. A non-success status is rejected
/// before the body is interpreted.
pub async fn exchange_code(
    client: &reqwest::Client,
    credentials: &ClientCredentials,
    redirect_uri: &str,
    code: &str,
) -> Result<TokenPair> {
    let token_endpoint = credentials.token_endpoint.trim();
    if token_endpoint.is_empty() {
        return Err(Error::Configuration("token endpoint is not set".into()));
    }

    let response = client
        .post(token_endpoint)
        .form(&[
            ("client_id", credentials.client_id.as_str()),
            ("client_secret", credentials.client_secret.expose().as_str()),
            ("code", code),
            ("grant_type", GRANT_TYPE_AUTHORIZATION_CODE),
            ("redirect_uri", redirect_uri),
        ])
        .send()
        .await
        .map_err(|e| Error::Http(format!("token exchange request failed: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| Error::Http(format!("reading token response failed: {e}")))?;

    if !status.is_success() {
        return Err(Error::TokenExchange(format!(
            "token endpoint returned {status}: {body}"
        )));
    }

    let parsed: TokenResponse = serde_json::from_str(&body)
        .map_err(|e| Error::TokenExchange(format!("invalid token response: {e}")))?;

    debug!(
        expires_in = ?parsed.expires_in,
        token_type = ?parsed.token_type,
        "token endpoint responded"
    );

    let has_access = parsed.access_token.as_deref().is_some_and(|t| !t.is_empty());
    let has_refresh = parsed.refresh_token.as_deref().is_some_and(|t| !t.is_empty());

    parsed.into_pair().ok_or_else(|| {
        warn!(has_access, has_refresh, "token response is incomplete");
        Error::TokenExchange(format!(
            "response missing tokens (access_token present: {has_access}, refresh_token present: {has_refresh})"
        ))
    })
}
