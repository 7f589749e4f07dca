//! Authorization URL construction
//!
//! The authorization request is derived, never stored: the provider's
//! authorization endpoint plus the fixed query parameters of the
//! authorization-code grant. Values are percent-encoded by `Url`.

use reqwest::Url;

use crate::constants::{ACCESS_TYPE_OFFLINE, RESPONSE_TYPE_CODE};
use crate::credentials::ClientCredentials;
use crate::error::{Error, Result};

/// Parameters this module owns. Any copy already present on the endpoint is
/// dropped so each appears exactly once.
const OWNED_PARAMS: &[&str] = &[
    "redirect_uri",
    "response_type",
    "scope",
    "access_type",
    "client_id",
];

/// Build the URL the browser is sent to for user consent.
///
/// Fails with `Configuration` when the client id or authorization endpoint
/// is empty, or when the endpoint is not an absolute URL. Deterministic for
/// fixed inputs.
pub fn build_authorization_url(
    credentials: &ClientCredentials,
    redirect_uri: &str,
    scope: &str,
) -> Result<Url> {
    let client_id = credentials.client_id.trim();
    if client_id.is_empty() {
        return Err(Error::Configuration("client id is not set".into()));
    }
    let endpoint = credentials.authorization_endpoint.trim();
    if endpoint.is_empty() {
        return Err(Error::Configuration(
            "authorization endpoint is not set".into(),
        ));
    }

    let mut url = Url::parse(endpoint).map_err(|e| {
        Error::Configuration(format!("authorization endpoint {endpoint:?} is invalid: {e}"))
    })?;

    let preserved: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| !OWNED_PARAMS.iter().any(|owned| *owned == *key))
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();

    url.set_query(None);
    {
        let mut query = url.query_pairs_mut();
        for (key, value) in &preserved {
            query.append_pair(key, value);
        }
        query
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("response_type", RESPONSE_TYPE_CODE)
            .append_pair("scope", scope)
            .append_pair("access_type", ACCESS_TYPE_OFFLINE)
            .append_pair("client_id", client_id);
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{DEFAULT_REDIRECT_URI, DEFAULT_SCOPE};
    use common::Secret;

    fn credentials(client_id: &str, endpoint: &str) -> ClientCredentials {
        ClientCredentials {
            client_id: client_id.into(),
            client_secret: Secret::new("secret".into()),
            authorization_endpoint: endpoint.into(),
            token_endpoint: "https://oauth2.example.com/token".into(),
        }
    }

    fn count(url: &Url, key: &str) -> usize {
        url.query_pairs().filter(|(k, _)| k == key).count()
    }

    #[test]
    fn authorization_url_contains_each_param_once() {
        let url = build_authorization_url(
            &credentials("X", "https://accounts.example.com/o/oauth2/auth"),
            DEFAULT_REDIRECT_URI,
            DEFAULT_SCOPE,
        )
        .unwrap();

        assert!(
            url.as_str()
                .starts_with("https://accounts.example.com/o/oauth2/auth?")
        );
        for key in OWNED_PARAMS {
            assert_eq!(count(&url, key), 1, "{key} must appear exactly once: {url}");
        }
        assert!(url.as_str().contains("client_id=X"));
        assert!(url.as_str().contains("response_type=code"));
        assert!(url.as_str().contains("access_type=offline"));
    }

    #[test]
    fn values_are_percent_encoded() {
        let url = build_authorization_url(
            &credentials("X", "https://accounts.example.com/auth"),
            "http://127.0.0.1:3030/auth-code-redirect",
            "https://www.googleapis.com/auth/drive",
        )
        .unwrap();

        assert!(
            url.as_str()
                .contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A3030%2Fauth-code-redirect"),
            "got: {url}"
        );
        let scope: Vec<_> = url
            .query_pairs()
            .filter(|(k, _)| k == "scope")
            .map(|(_, v)| v.into_owned())
            .collect();
        assert_eq!(scope, vec!["https://www.googleapis.com/auth/drive"]);
    }

    #[test]
    fn existing_endpoint_params_are_kept_without_duplicates() {
        let url = build_authorization_url(
            &credentials("X", "https://auth.example.com/authorize?prompt=consent&client_id=stale"),
            DEFAULT_REDIRECT_URI,
            DEFAULT_SCOPE,
        )
        .unwrap();

        assert_eq!(count(&url, "prompt"), 1);
        assert_eq!(count(&url, "client_id"), 1);
        assert!(!url.as_str().contains("stale"));
    }

    #[test]
    fn is_deterministic() {
        let creds = credentials("X", "https://auth.example.com/authorize");
        let a = build_authorization_url(&creds, DEFAULT_REDIRECT_URI, DEFAULT_SCOPE).unwrap();
        let b = build_authorization_url(&creds, DEFAULT_REDIRECT_URI, DEFAULT_SCOPE).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_client_id_is_configuration_error() {
        let err = build_authorization_url(
            &credentials("", "https://auth.example.com/authorize"),
            DEFAULT_REDIRECT_URI,
            DEFAULT_SCOPE,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "got: {err}");
    }

    #[test]
    fn empty_endpoint_is_configuration_error() {
        let err = build_authorization_url(&credentials("X", ""), DEFAULT_REDIRECT_URI, DEFAULT_SCOPE)
            .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "got: {err}");
    }

    #[test]
    fn relative_endpoint_is_configuration_error() {
        let err = build_authorization_url(
            &credentials("X", "/o/oauth2/auth"),
            DEFAULT_REDIRECT_URI,
            DEFAULT_SCOPE,
        )
        .unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "got: {err}");
    }
}
