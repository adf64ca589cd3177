//! Admin API client: live reload, adapt, current config, and PKI info.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::diagnostics::error_message;

const CADDYFILE_MIME: &str = "text/caddyfile";

#[derive(Debug, thiserror::Error)]
pub enum AdminError {
    #[error("admin API unreachable: {0}")]
    Unreachable(String),
    #[error("admin API timed out after {0:?}")]
    Timeout(Duration),
    #[error("admin request cancelled")]
    Cancelled,
    /// The live server refused a `/load`.
    #[error("reload rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    /// Any other non-success response.
    #[error("admin API returned {status}: {message}")]
    Status { status: u16, message: String },
    #[error("admin API response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("admin API request: {0}")]
    Http(#[from] reqwest::Error),
}

/// Raw answer of `POST /adapt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdaptResponse {
    pub status: u16,
    pub body: String,
}

impl AdaptResponse {
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.status >= 200 && self.status < 300
    }
}

/// Certificate authority details from `GET /pki/ca/<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CaInfo {
    pub id: String,
    pub name: String,
    pub root_common_name: String,
    pub intermediate_common_name: String,
    pub root_certificate: String,
    pub intermediate_certificate: String,
}

/// Client for one admin endpoint. Every call is bounded by the client
/// timeout and aborts when its cancellation token fires.
#[derive(Debug, Clone)]
pub struct AdminClient {
    base_url: String,
    timeout: Duration,
    client: Client,
}

impl AdminClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, AdminError> {
        let client = Client::builder().no_proxy().build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
            client,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Replace the running configuration with `text`.
    pub async fn load(&self, text: &str, cancel: &CancellationToken) -> Result<(), AdminError> {
        let request = self
            .client
            .post(self.url("/load"))
            .header(CONTENT_TYPE, CADDYFILE_MIME)
            .body(text.to_owned());
        let (status, body) = self.send(request, cancel).await?;

        if status.is_success() {
            info!(url = %self.base_url, "configuration loaded");
            Ok(())
        } else {
            let message = error_message(&String::from_utf8_lossy(&body));
            warn!(status = status.as_u16(), %message, "reload rejected");
            Err(AdminError::Rejected {
                status: status.as_u16(),
                message,
            })
        }
    }

    /// Adapt `text` to JSON without loading it. Any HTTP status is
    /// returned to the caller.
    pub async fn adapt(
        &self,
        text: &str,
        cancel: &CancellationToken,
    ) -> Result<AdaptResponse, AdminError> {
        let request = self
            .client
            .post(self.url("/adapt"))
            .header(CONTENT_TYPE, CADDYFILE_MIME)
            .body(text.to_owned());
        let (status, body) = self.send(request, cancel).await?;
        Ok(AdaptResponse {
            status: status.as_u16(),
            body: String::from_utf8_lossy(&body).into_owned(),
        })
    }

    /// Running configuration as returned by `GET /config/`.
    pub async fn current_config(&self, cancel: &CancellationToken) -> Result<Vec<u8>, AdminError> {
        let request = self.client.get(self.url("/config/"));
        let (status, body) = self.send(request, cancel).await?;
        check_status(status, &body)?;
        Ok(body)
    }

    pub async fn ca_info(&self, id: &str, cancel: &CancellationToken) -> Result<CaInfo, AdminError> {
        let request = self.client.get(self.url(&format!("/pki/ca/{id}")));
        let (status, body) = self.send(request, cancel).await?;
        check_status(status, &body)?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn send(
        &self,
        request: RequestBuilder,
        cancel: &CancellationToken,
    ) -> Result<(StatusCode, Vec<u8>), AdminError> {
        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>((status, body.to_vec()))
        };

        let result = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(AdminError::Cancelled),
            result = tokio::time::timeout(self.timeout, exchange) => result,
        };

        match result {
            Err(_) => Err(AdminError::Timeout(self.timeout)),
            Ok(Err(e)) if e.is_timeout() => Err(AdminError::Timeout(self.timeout)),
            Ok(Err(e)) if e.is_connect() => Err(AdminError::Unreachable(format!(
                "{}: {e}",
                self.base_url
            ))),
            Ok(Err(e)) => Err(AdminError::Http(e)),
            Ok(Ok((status, body))) => {
                debug!(status = status.as_u16(), bytes = body.len(), "admin response");
                Ok((status, body))
            }
        }
    }
}

fn check_status(status: StatusCode, body: &[u8]) -> Result<(), AdminError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(AdminError::Status {
            status: status.as_u16(),
            message: error_message(&String::from_utf8_lossy(body)),
        })
    }
}
