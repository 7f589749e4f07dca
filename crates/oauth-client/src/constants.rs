//! OAuth request constants
//!
//! Defaults match a Google "web application" client registered with a
//! loopback redirect. Everything the provider identifies us by (client id,
//! secret, endpoints) comes from the client-secrets file instead.

/// Redirect URI registered with the provider for this client.
/// Must match the registration exactly in both the authorization request
/// and the code exchange.
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:3030/auth-code-redirect";

/// Scope requested during authorization
pub const DEFAULT_SCOPE: &str = "https://www.googleapis.com/auth/drive";

/// `response_type` for the authorization-code grant
pub const RESPONSE_TYPE_CODE: &str = "code";

/// Asks the provider to issue a refresh token alongside the access token
pub const ACCESS_TYPE_OFFLINE: &str = "offline";

/// `grant_type` sent to the token endpoint when trading a code
pub const GRANT_TYPE_AUTHORIZATION_CODE: &str = "authorization_code";
