//! Markup validator client
//!
//! [`MarkupValidatorClient`] sends a document to a validator endpoint in one
//! of three shapes and parses the SOAP reply:
//! - **by reference**: `GET <endpoint>?output=soap12&...&uri=<document>`
//! - **by upload**: multipart POST with an `uploaded_file` part
//! - **by fragment**: multipart POST with a `fragment` field
//!
//! Requests to the public W3C endpoint are paced by [`crate::throttle`].

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, LazyLock};

use reqwest::header::CONTENT_TYPE;
use tracing::{debug, info};
use url::Url;

use crate::config::Config;
use crate::error::{Result, ValidatorError};
use crate::http_client::{AsyncHttpClient, HttpClientConfig};
use crate::multipart::MultipartFormData;
use crate::options::ValidatorOptions;
use crate::response::ValidationResponse;
use crate::throttle;

/// Address of the free public W3C Markup Validation Service
pub const PUBLIC_VALIDATOR: &str = "http://validator.w3.org/check";

static PUBLIC_VALIDATOR_URL: LazyLock<Url> = LazyLock::new(|| {
    Url::parse(PUBLIC_VALIDATOR).expect("PUBLIC_VALIDATOR is an absolute http URL")
});

/// Address of a validator service
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatorEndpoint {
    url: Url,
}

impl ValidatorEndpoint {
    pub fn new(url: Url) -> Self {
        Self { url }
    }

    /// The public W3C validator
    pub fn public() -> Self {
        Self::new(PUBLIC_VALIDATOR_URL.clone())
    }

    pub fn parse(url: &str) -> Result<Self> {
        let url = Url::parse(url).map_err(|e| {
            ValidatorError::InvalidArgument(format!("invalid validator address '{}': {}", url, e))
        })?;
        Ok(Self::new(url))
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Whether requests to this endpoint are subject to throttling
    pub fn is_public(&self) -> bool {
        self.url.as_str() == PUBLIC_VALIDATOR
    }
}

impl Default for ValidatorEndpoint {
    fn default() -> Self {
        Self::public()
    }
}

impl FromStr for ValidatorEndpoint {
    type Err = ValidatorError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ValidatorEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)
    }
}

/// Request lifecycle notifications
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientEvent {
    /// Fired immediately before a request is transmitted
    SendingRequest,
    /// Fired as soon as a successful response has arrived, before its body is parsed
    ResponseReceived,
}

/// Listener invoked synchronously on the requesting task
pub type EventCallback = Arc<dyn Fn(ClientEvent) + Send + Sync>;

/// Client for the markup validator SOAP interface
#[derive(Clone)]
pub struct MarkupValidatorClient {
    endpoint: ValidatorEndpoint,
    http: AsyncHttpClient,
    listeners: Vec<EventCallback>,
}

impl fmt::Debug for MarkupValidatorClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarkupValidatorClient")
            .field("endpoint", &self.endpoint)
            .field("http", &self.http)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl MarkupValidatorClient {
    /// Client for `endpoint` with default network settings
    pub fn new(endpoint: ValidatorEndpoint) -> Result<Self> {
        Self::with_http_config(endpoint, HttpClientConfig::default())
    }

    pub fn with_http_config(endpoint: ValidatorEndpoint, config: HttpClientConfig) -> Result<Self> {
        Ok(Self {
            endpoint,
            http: AsyncHttpClient::new(config)?,
            listeners: Vec::new(),
        })
    }

    /// Client for the public W3C validator
    pub fn public() -> Result<Self> {
        Self::new(ValidatorEndpoint::public())
    }

    /// Client built from the loaded configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        let endpoint = ValidatorEndpoint::new(config.validator.uri.clone());
        let http = HttpClientConfig {
            timeout_seconds: config.network.timeout_seconds,
            user_agent: config.network.user_agent.clone(),
        };
        Self::with_http_config(endpoint, http)
    }

    /// Register a lifecycle listener
    pub fn add_listener<F>(&mut self, listener: F)
    where
        F: Fn(ClientEvent) + Send + Sync + 'static,
    {
        self.listeners.push(Arc::new(listener));
    }

    pub fn endpoint(&self) -> &ValidatorEndpoint {
        &self.endpoint
    }

    /// Validate a document the service can fetch itself
    pub async fn check_by_uri(
        &self,
        document: &Url,
        options: &ValidatorOptions,
    ) -> Result<ValidationResponse> {
        let target = self.uri_request_url(document, options);
        info!(document = %document, endpoint = %self.endpoint, "checking document by URI");
        let request = self.http.get(target.as_str());
        self.dispatch(request, target.as_str()).await
    }

    /// Validate raw document bytes by uploading them as a file
    pub async fn check_by_upload(
        &self,
        document: &[u8],
        options: &ValidatorOptions,
    ) -> Result<ValidationResponse> {
        info!(bytes = document.len(), endpoint = %self.endpoint, "checking document by upload");
        let mut form = Self::option_form(options);
        form.file("uploaded_file", "document.html", "text/html", document);
        self.post_form(form).await
    }

    /// Validate inline markup text
    pub async fn check_by_fragment(
        &self,
        document: &str,
        options: &ValidatorOptions,
    ) -> Result<ValidationResponse> {
        info!(chars = document.len(), endpoint = %self.endpoint, "checking document by fragment");
        let mut form = Self::option_form(options);
        form.text("fragment", document);
        self.post_form(form).await
    }

    /// Download a document without involving the validator
    pub async fn fetch_document(&self, document: &Url) -> Result<Vec<u8>> {
        debug!(document = %document, "downloading document");
        self.http.download(document.as_str()).await
    }

    pub(crate) fn uri_request_url(&self, document: &Url, options: &ValidatorOptions) -> Url {
        let mut target = self.endpoint.url().clone();
        {
            let mut query = target.query_pairs_mut();
            for (name, value) in options.to_fields() {
                query.append_pair(name, &value);
            }
            query.append_pair("uri", document.as_str());
        }
        target
    }

    fn option_form(options: &ValidatorOptions) -> MultipartFormData {
        let mut form = MultipartFormData::new();
        for (name, value) in options.to_fields() {
            form.text(name, &value);
        }
        form
    }

    async fn post_form(&self, form: MultipartFormData) -> Result<ValidationResponse> {
        let target = self.endpoint.url().as_str();
        let content_type = form.content_type();
        let body = form.finish();
        let request = self
            .http
            .post(target)
            .header(CONTENT_TYPE, content_type)
            .body(body);
        self.dispatch(request, target).await
    }

    async fn dispatch(
        &self,
        request: reqwest::RequestBuilder,
        target: &str,
    ) -> Result<ValidationResponse> {
        let _permit = throttle::acquire(&self.endpoint).await;

        self.emit(ClientEvent::SendingRequest);
        let response = self.http.send(request, target).await?;
        self.emit(ClientEvent::ResponseReceived);

        let body = self.http.read_body(response).await?;
        debug!(bytes = body.len(), "parsing validator response");
        ValidationResponse::from_slice(&body)
    }

    fn emit(&self, event: ClientEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }
}
