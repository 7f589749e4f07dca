//! Shared types for the OAuth code helper workspace

mod secret;
mod error;

pub use secret::Secret;
pub use error::{Error, Result};
