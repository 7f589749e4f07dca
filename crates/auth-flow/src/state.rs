//! Authorization flow state machine
//!
//! Pure state machine: receives events, returns (new_state, action).
//! The controller records the resulting state next to the token pair and
//! logs the action. Actions are advisory: callers act on the `Result` each
//! controller operation returns, not on `FlowAction`.

/// Where the single local session stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// No valid pair in memory or storage
    NoToken,
    /// Authorization URL issued, waiting for the provider redirect
    AwaitingCode,
    /// Code received, token endpoint call in flight
    Exchanging,
    /// Valid pair held in memory
    Authenticated,
}

impl FlowState {
    /// Label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            FlowState::NoToken => "no_token",
            FlowState::AwaitingCode => "awaiting_code",
            FlowState::Exchanging => "exchanging",
            FlowState::Authenticated => "authenticated",
        }
    }
}

/// Events that drive state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowEvent {
    /// Browser sent to the provider's authorization URL
    AuthorizationIssued,
    /// Provider redirected back with a code
    CodeReceived,
    /// Provider redirected back with an error or without a code.
    /// `session_retained` is true when a prior pair is still held.
    CallbackRejected { session_retained: bool },
    /// Exchange succeeded and the pair was persisted
    ExchangeSucceeded,
    /// Exchange or persistence failed
    ExchangeFailed { session_retained: bool },
    /// Pair restored from storage
    TokensLoaded,
    /// Storage empty, partial, or unreadable
    LoadFailed,
    /// Downstream call with the current token failed
    UpstreamRejected,
}

/// What the caller should do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowAction {
    /// Send the browser to the provider
    RedirectToProvider,
    /// Trade the received code at the token endpoint
    ExchangeCode,
    /// Proceed with the held pair
    UseTokens,
    /// Send the browser back to the authorization entry point
    RestartAuthorization,
}

/// Handle a state transition. Pure function: no I/O.
pub fn handle_event(state: FlowState, event: FlowEvent) -> (FlowState, FlowAction) {
    match (state, event) {
        // Issuing a URL never discards a held session: the old pair stays
        // usable until a new one replaces it.
        (FlowState::Authenticated, FlowEvent::AuthorizationIssued) => {
            (FlowState::Authenticated, FlowAction::RedirectToProvider)
        }
        (_, FlowEvent::AuthorizationIssued) => {
            (FlowState::AwaitingCode, FlowAction::RedirectToProvider)
        }

        // A redirect can arrive without a prior /authorize-me in this
        // process (e.g. after a restart), so any state may start an exchange.
        (_, FlowEvent::CodeReceived) => (FlowState::Exchanging, FlowAction::ExchangeCode),

        (_, FlowEvent::CallbackRejected { session_retained })
        | (_, FlowEvent::ExchangeFailed { session_retained }) => {
            if session_retained {
                (FlowState::Authenticated, FlowAction::UseTokens)
            } else {
                (FlowState::NoToken, FlowAction::RestartAuthorization)
            }
        }

        (_, FlowEvent::ExchangeSucceeded) | (_, FlowEvent::TokensLoaded) => {
            (FlowState::Authenticated, FlowAction::UseTokens)
        }

        (_, FlowEvent::LoadFailed) | (_, FlowEvent::UpstreamRejected) => {
            (FlowState::NoToken, FlowAction::RestartAuthorization)
        }
    }
}
