use crate::error::ValidatorError;
use futures::TryStreamExt;
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;

/// Upper bound on the buffer reserved from a response's Content-Length
pub const MAX_PREALLOCATION: u64 = 1 << 20;

/// Configuration for the HTTP client
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// User agent string
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            user_agent: default_user_agent(),
        }
    }
}

pub fn default_user_agent() -> String {
    format!("w3c-validators/{}", env!("CARGO_PKG_VERSION"))
}

/// Async HTTP transport for validator requests.
///
/// Requests are sent exactly once; a failed attempt surfaces to the caller.
#[derive(Debug, Clone)]
pub struct AsyncHttpClient {
    client: Client,
    config: HttpClientConfig,
}

impl AsyncHttpClient {
    /// Create a new async HTTP client with the given configuration
    pub fn new(config: HttpClientConfig) -> Result<Self, ValidatorError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(&config.user_agent)
            .pool_idle_timeout(Duration::from_secs(30))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(ValidatorError::from)?;

        Ok(Self { client, config })
    }

    pub fn get(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    pub fn post(&self, url: &str) -> RequestBuilder {
        self.client.post(url)
    }

    /// Send a request and wait for the response headers.
    ///
    /// Non-success statuses are turned into [`ValidatorError::HttpStatus`].
    pub async fn send(&self, request: RequestBuilder, url: &str) -> Result<Response, ValidatorError> {
        let response = timeout(
            Duration::from_secs(self.config.timeout_seconds),
            request.send(),
        )
        .await
        .map_err(|_| ValidatorError::Timeout {
            url: url.to_string(),
            timeout_seconds: self.config.timeout_seconds,
        })?
        .map_err(ValidatorError::from)?;

        let status = response.status();
        debug!(url, status = status.as_u16(), "validator responded");
        if !status.is_success() {
            return Err(ValidatorError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
                message: format!(
                    "HTTP {}: {}",
                    status.as_u16(),
                    status.canonical_reason().unwrap_or("Unknown")
                ),
            });
        }

        Ok(response)
    }

    /// Drain a response body into memory.
    ///
    /// The declared length only sizes the first allocation, up to
    /// [`MAX_PREALLOCATION`]; the buffer grows with the bytes actually received.
    pub async fn read_body(&self, response: Response) -> Result<Vec<u8>, ValidatorError> {
        let declared = response.content_length().unwrap_or(0);
        let mut buffer = Vec::with_capacity(declared.min(MAX_PREALLOCATION) as usize);

        let mut stream = response.bytes_stream();
        while let Some(chunk) = TryStreamExt::try_next(&mut stream)
            .await
            .map_err(ValidatorError::from)?
        {
            buffer.extend_from_slice(&chunk);
        }

        Ok(buffer)
    }

    /// Download a document with a plain GET
    pub async fn download(&self, url: &str) -> Result<Vec<u8>, ValidatorError> {
        let response = self.send(self.get(url), url).await?;
        self.read_body(response).await
    }

    /// Get the client configuration
    pub fn config(&self) -> &HttpClientConfig {
        &self.config
    }
}
