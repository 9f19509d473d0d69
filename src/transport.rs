//! Generic POST executor for protocol requests.
//!
//! The driver never touches HTTP below this seam, which is what lets the
//! state machine be exercised against scripted responses in tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;
use tokio::time::timeout;
use tracing::debug;

use crate::protocol::{AUTH_TOKEN_HEADER, ProtocolRequest, ProtocolResponse};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),
}

/// Executes one protocol request and hands back the reduced response.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn post(&self, request: &ProtocolRequest) -> Result<ProtocolResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn post(&self, request: &ProtocolRequest) -> Result<ProtocolResponse, TransportError> {
        (**self).post(request).await
    }
}

/// reqwest-backed transport POSTing form-encoded bodies to a base URL.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self {
            client: Client::new(),
            base_url,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Configures the per-call timeout. A timed-out call surfaces as a
    /// transport error with no session transition.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, request: &ProtocolRequest) -> Result<ProtocolResponse, TransportError> {
        let url = format!("{}{}", self.base_url, request.endpoint().path());
        debug!("POST {url}");

        let mut builder = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(request.encoded_body());
        if let Some(token) = request.auth_token() {
            builder = builder.header(AUTH_TOKEN_HEADER, token);
        }

        let response = match timeout(self.timeout, builder.send()).await {
            Ok(result) => result?,
            Err(_) => return Err(TransportError::Timeout(self.timeout)),
        };

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response.text().await?;

        Ok(ProtocolResponse::new(status, headers, body))
    }
}
