//! OAuth2 authorization-code flow controller
//!
//! Owns the single local session: sequences redirect issuance, code
//! exchange, token persistence and token reuse, and decides when the user
//! has to go through authorization again. The token pair lives in one
//! mutex-guarded session inside `AuthFlowController`; nothing is kept in
//! ambient global state.
//!
//! Session lifecycle:
//! 1. No tokens in memory or storage → `NoToken`, caller restarts authorization
//! 2. Authorization URL issued → `AwaitingCode`
//! 3. Provider redirects back with a code → `Exchanging`
//! 4. Pair persisted and held → `Authenticated`
//! 5. Downstream call fails → pair dropped from memory, back to `NoToken`

pub mod controller;
pub mod error;
pub mod state;

pub use controller::{AuthFlowController, CallbackParams, FlowSettings};
pub use error::{Error, Result};
pub use state::{FlowAction, FlowEvent, FlowState, handle_event};
