//! Authorization flow controller
//!
//! Holds the client credentials, the token store and the in-memory session.
//! The session (token pair + flow state) sits behind one tokio Mutex:
//! `handle_callback` keeps it locked from the code exchange through the
//! durable write and the memory update, so concurrent callbacks are fully
//! serialized and a reader never sees a half-committed pair.

use std::sync::Arc;

use oauth_client::{ClientCredentials, TokenPair, TokenStore};
use reqwest::Url;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::error::{Error, Result};
use crate::state::{FlowEvent, FlowState, handle_event};

/// Request parameters fixed for the lifetime of the process.
#[derive(Debug, Clone)]
pub struct FlowSettings {
    /// Redirect URI registered with the provider; sent in both the
    /// authorization request and the code exchange
    pub redirect_uri: String,
    pub scope: String,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            redirect_uri: oauth_client::DEFAULT_REDIRECT_URI.to_string(),
            scope: oauth_client::DEFAULT_SCOPE.to_string(),
        }
    }
}

/// Query parameters the provider sends back to the redirect URI.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub error: Option<String>,
}

impl CallbackParams {
    /// The authorization code, or the reason the callback is a denial.
    ///
    /// An `error` parameter wins even when empty or accompanied by a code.
    fn authorization_code(&self) -> std::result::Result<&str, String> {
        if let Some(error) = &self.error {
            return Err(format!("provider returned error {error:?}"));
        }
        match self.code.as_deref() {
            Some(code) if !code.is_empty() => Ok(code),
            _ => Err("callback carried no authorization code".into()),
        }
    }
}

struct Session {
    tokens: Option<TokenPair>,
    state: FlowState,
}

impl Session {
    fn transition(&mut self, event: FlowEvent) {
        let (next, action) = handle_event(self.state, event);
        if next != self.state {
            debug!(
                from = self.state.label(),
                to = next.label(),
                ?event,
                ?action,
                "flow state changed"
            );
        }
        self.state = next;
    }
}

/// Owner of the single local OAuth session.
pub struct AuthFlowController {
    credentials: ClientCredentials,
    settings: FlowSettings,
    store: Arc<dyn TokenStore>,
    http_client: reqwest::Client,
    session: Mutex<Session>,
}

impl AuthFlowController {
    /// Create a controller with an empty in-memory session.
    ///
    /// Nothing is read from the store until the first
    /// `ensure_authenticated()`.
    pub fn new(
        credentials: ClientCredentials,
        settings: FlowSettings,
        store: Arc<dyn TokenStore>,
        http_client: reqwest::Client,
    ) -> Self {
        info!(
            client_id = %credentials.client_id,
            redirect_uri = %settings.redirect_uri,
            "auth flow controller initialized"
        );
        Self {
            credentials,
            settings,
            store,
            http_client,
            session: Mutex::new(Session {
                tokens: None,
                state: FlowState::NoToken,
            }),
        }
    }

    /// Build the provider authorization URL. No side effects.
    pub fn build_authorization_url(&self) -> Result<Url> {
        oauth_client::build_authorization_url(
            &self.credentials,
            &self.settings.redirect_uri,
            &self.settings.scope,
        )
        .map_err(Error::from)
    }

    /// Build the authorization URL and record that the browser is being
    /// sent to the provider.
    pub async fn begin_authorization(&self) -> Result<Url> {
        let url = self.build_authorization_url()?;
        self.session
            .lock()
            .await
            .transition(FlowEvent::AuthorizationIssued);
        Ok(url)
    }

    /// Complete the flow with the provider's redirect parameters.
    ///
    /// On success the pair is written to the store and then installed in
    /// memory. If the store write fails, memory keeps whatever pair it held
    /// before and the call fails with `Store`.
    #[instrument(skip_all)]
    pub async fn handle_callback(&self, params: CallbackParams) -> Result<TokenPair> {
        let mut session = self.session.lock().await;

        let code = match params.authorization_code() {
            Ok(code) => code,
            Err(reason) => {
                let session_retained = session.tokens.is_some();
                session.transition(FlowEvent::CallbackRejected { session_retained });
                warn!(%reason, "authorization callback rejected");
                return Err(Error::AuthorizationDenied(reason));
            }
        };

        session.transition(FlowEvent::CodeReceived);

        match self.exchange_and_persist(code).await {
            Ok(pair) => {
                session.tokens = Some(pair.clone());
                session.transition(FlowEvent::ExchangeSucceeded);
                info!("authorization code exchanged, session authenticated");
                Ok(pair)
            }
            Err(e) => {
                let session_retained = session.tokens.is_some();
                session.transition(FlowEvent::ExchangeFailed { session_retained });
                warn!(error = %e, session_retained, "authorization code exchange failed");
                Err(e)
            }
        }
    }

    async fn exchange_and_persist(&self, code: &str) -> Result<TokenPair> {
        let pair = oauth_client::exchange_code(
            &self.http_client,
            &self.credentials,
            &self.settings.redirect_uri,
            code,
        )
        .await?;

        self.store
            .save(&pair)
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        Ok(pair)
    }

    /// Return the current pair, restoring it from the store if memory is
    /// empty. Fails with `NoValidToken` when the store has nothing usable.
    pub async fn ensure_authenticated(&self) -> Result<TokenPair> {
        let mut session = self.session.lock().await;
        if let Some(tokens) = &session.tokens {
            return Ok(tokens.clone());
        }

        match self.store.load().await {
            Ok(Some(pair)) => {
                session.tokens = Some(pair.clone());
                session.transition(FlowEvent::TokensLoaded);
                info!("session restored from token store");
                Ok(pair)
            }
            Ok(None) => {
                session.transition(FlowEvent::LoadFailed);
                debug!("token store holds no usable pair");
                Err(Error::NoValidToken)
            }
            Err(e) => {
                session.transition(FlowEvent::LoadFailed);
                warn!(error = %e, "failed to read token store");
                Err(Error::NoValidToken)
            }
        }
    }

    /// Drop the in-memory pair. Storage is left as is; the next
    /// `ensure_authenticated()` reloads from it.
    pub async fn invalidate(&self) {
        let mut session = self.session.lock().await;
        session.tokens = None;
        session.transition(FlowEvent::UpstreamRejected);
        info!("in-memory session invalidated");
    }

    /// Drop the in-memory pair only if it is still `stale`.
    ///
    /// A downstream failure observed with an old token must not discard a
    /// pair installed by a callback that completed in the meantime. Returns
    /// whether the session was dropped.
    pub async fn invalidate_if(&self, stale: &TokenPair) -> bool {
        let mut session = self.session.lock().await;
        if session.tokens.as_ref() != Some(stale) {
            debug!("session already replaced, keeping current pair");
            return false;
        }
        session.tokens = None;
        session.transition(FlowEvent::UpstreamRejected);
        info!("in-memory session invalidated");
        true
    }

    /// Current flow state.
    pub async fn state(&self) -> FlowState {
        self.session.lock().await.state
    }
}
