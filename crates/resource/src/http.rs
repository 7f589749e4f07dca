//! HTTP resource: one bearer-authenticated GET to a fixed URL.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, instrument};

use crate::{Error, ProtectedResource, ResourceResponse, Result};

/// Protected resource reached over HTTP.
pub struct HttpResource {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl HttpResource {
    pub fn new(client: reqwest::Client, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client,
            url: url.into(),
            timeout,
        }
    }

    #[instrument(skip_all, fields(url = %self.url))]
    async fn get(&self, access_token: &str) -> Result<ResourceResponse> {
        let response = self
            .client
            .get(&self.url)
            .header(AUTHORIZATION, format!("Bearer {access_token}"))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Error::Transport(e.to_string()))?;

        let status = response.status();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_owned);
        let body = response
            .text()
            .await
            .map_err(|e| Error::Transport(format!("reading response body: {e}")))?;

        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(status = status.as_u16(), bytes = body.len(), "resource call succeeded");
        Ok(ResourceResponse {
            status: status.as_u16(),
            content_type,
            body,
        })
    }
}

impl ProtectedResource for HttpResource {
    fn id(&self) -> &str {
        &self.url
    }

    fn call<'a>(
        &'a self,
        access_token: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<ResourceResponse>> + Send + 'a>> {
        Box::pin(self.get(access_token))
    }
}
