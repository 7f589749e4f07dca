//! Client-secrets loading
//!
//! Reads the JSON file the provider hands out when a client is registered
//! (`{"web": {...}}` for web applications, `{"installed": {...}}` for
//! desktop clients). The file is read once at startup and never written.
//! Every field is required: a helper that cannot build a complete
//! authorization request must not start.

use std::path::Path;

use common::Secret;
use serde::Deserialize;
use tracing::info;

use crate::error::{Error, Result};

/// Static client identity and provider endpoints.
///
/// Immutable for the process lifetime. `client_secret` is redacted from
/// `Debug` output.
#[derive(Debug, Clone)]
pub struct ClientCredentials {
    pub client_id: String,
    pub client_secret: Secret<String>,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    web: Option<RawClient>,
    installed: Option<RawClient>,
}

#[derive(Deserialize)]
struct RawClient {
    client_id: Option<String>,
    client_secret: Option<Secret<String>>,
    auth_uri: Option<String>,
    token_uri: Option<String>,
}

/// Load client credentials from a client-secrets JSON file.
pub async fn load_client_credentials(path: &Path) -> Result<ClientCredentials> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::Io(format!("reading client secrets {}: {e}", path.display())))?;
    let credentials = parse_client_credentials(&contents)?;
    info!(
        path = %path.display(),
        client_id = %credentials.client_id,
        "loaded client credentials"
    );
    Ok(credentials)
}

/// Parse client credentials from the contents of a client-secrets file.
///
/// `web` wins when both sections are present.
pub fn parse_client_credentials(contents: &str) -> Result<ClientCredentials> {
    let file: ClientSecretsFile = serde_json::from_str(contents)
        .map_err(|e| Error::CredentialParse(format!("parsing client secrets: {e}")))?;

    let (section, raw) = match (file.web, file.installed) {
        (Some(web), _) => ("web", web),
        (None, Some(installed)) => ("installed", installed),
        (None, None) => {
            return Err(Error::Configuration(
                "client secrets file has neither a \"web\" nor an \"installed\" section".into(),
            ));
        }
    };

    let client_id = required(section, "client_id", raw.client_id)?;
    let authorization_endpoint = required(section, "auth_uri", raw.auth_uri)?;
    let token_endpoint = required(section, "token_uri", raw.token_uri)?;
    let client_secret = match raw.client_secret {
        Some(secret) if !secret.is_blank() => secret,
        _ => {
            return Err(Error::Configuration(format!(
                "client secrets file is missing {section}.client_secret"
            )));
        }
    };

    Ok(ClientCredentials {
        client_id,
        client_secret,
        authorization_endpoint,
        token_endpoint,
    })
}

fn required(section: &str, field: &str, value: Option<String>) -> Result<String> {
    match value.map(|v| v.trim().to_owned()) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(Error::Configuration(format!(
            "client secrets file is missing {section}.{field}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WEB_CLIENT: &str = r#"{
        "web": {
            "client_id": "1234.apps.example.com",
            "project_id": "demo-project",
            "auth_uri": "https://accounts.example.com/o/oauth2/auth",
            "token_uri": "https://oauth2.example.com/token",
            "client_secret": "shh",
            "redirect_uris": ["http://127.0.0.1:3030/auth-code-redirect"]
        }
    }"#;

    #[test]
    fn parses_web_section() {
        let creds = parse_client_credentials(WEB_CLIENT).unwrap();
        assert_eq!(creds.client_id, "1234.apps.example.com");
        assert_eq!(creds.client_secret.expose(), "shh");
        assert_eq!(
            creds.authorization_endpoint,
            "https://accounts.example.com/o/oauth2/auth"
        );
        assert_eq!(creds.token_endpoint, "https://oauth2.example.com/token");
    }

    #[test]
    fn parses_installed_section() {
        let json = r#"{"installed": {
            "client_id": "desktop-id",
            "client_secret": "desktop-secret",
            "auth_uri": "https://auth.example.com",
            "token_uri": "https://token.example.com"
        }}"#;
        let creds = parse_client_credentials(json).unwrap();
        assert_eq!(creds.client_id, "desktop-id");
    }

    #[test]
    fn debug_output_redacts_client_secret() {
        let creds = parse_client_credentials(WEB_CLIENT).unwrap();
        let debug = format!("{creds:?}");
        assert!(!debug.contains("shh"), "secret leaked: {debug}");
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn missing_field_is_configuration_error() {
        let json = r#"{"web": {
            "client_id": "id",
            "client_secret": "secret",
            "auth_uri": "https://auth.example.com"
        }}"#;
        let err = parse_client_credentials(json).unwrap_err();
        assert!(
            matches!(err, Error::Configuration(ref msg) if msg.contains("web.token_uri")),
            "got: {err}"
        );
    }

    #[test]
    fn blank_client_secret_is_configuration_error() {
        let json = r#"{"web": {
            "client_id": "id",
            "client_secret": "  ",
            "auth_uri": "https://auth.example.com",
            "token_uri": "https://token.example.com"
        }}"#;
        let err = parse_client_credentials(json).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "got: {err}");
    }

    #[test]
    fn missing_section_is_configuration_error() {
        let err = parse_client_credentials(r#"{"other": {}}"#).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "got: {err}");
    }

    #[test]
    fn malformed_json_is_parse_error() {
        let err = parse_client_credentials("{not json").unwrap_err();
        assert!(matches!(err, Error::CredentialParse(_)), "got: {err}");
    }

    #[tokio::test]
    async fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cred.json");
        tokio::fs::write(&path, WEB_CLIENT).await.unwrap();

        let creds = load_client_credentials(&path).await.unwrap();
        assert_eq!(creds.client_id, "1234.apps.example.com");
    }

    #[tokio::test]
    async fn load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_client_credentials(&dir.path().join("absent.json"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Io(_)), "got: {err}");
    }
}
