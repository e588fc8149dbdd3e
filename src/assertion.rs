//! Test-assertion adapter
//!
//! Lets a test suite state "this markup is valid" about a URL, raw bytes, or
//! a string, and get a readable failure listing when it is not.

use std::fmt::Write as _;

use tracing::debug;
use url::Url;

use crate::client::MarkupValidatorClient;
use crate::error::{Result, ValidatorError};
use crate::options::ValidatorOptions;
use crate::response::ValidationResponse;

/// Something that can be handed to the validator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationInput {
    /// A document address
    Uri(Url),
    /// Raw document bytes, sent as an upload
    Bytes(Vec<u8>),
    /// Inline markup, sent as a fragment
    Text(String),
}

impl ValidationInput {
    /// Classify a string. With `convert_to_uri` set, text that parses as an
    /// absolute hierarchical URL becomes [`ValidationInput::Uri`]; everything
    /// else is markup.
    pub fn from_text(text: impl Into<String>, convert_to_uri: bool) -> Self {
        let text = text.into();
        match as_address(&text, convert_to_uri) {
            Some(url) => ValidationInput::Uri(url),
            None => ValidationInput::Text(text),
        }
    }
}

fn as_address(text: &str, convert_to_uri: bool) -> Option<Url> {
    if !convert_to_uri {
        return None;
    }
    Url::parse(text.trim())
        .ok()
        .filter(|url| !url.cannot_be_a_base())
}

impl From<Url> for ValidationInput {
    fn from(url: Url) -> Self {
        ValidationInput::Uri(url)
    }
}

impl From<Vec<u8>> for ValidationInput {
    fn from(bytes: Vec<u8>) -> Self {
        ValidationInput::Bytes(bytes)
    }
}

impl From<&[u8]> for ValidationInput {
    fn from(bytes: &[u8]) -> Self {
        ValidationInput::Bytes(bytes.to_vec())
    }
}

/// Flags that change how inputs reach the validator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssertionOptions {
    /// The validator cannot reach the document; download it locally and upload it
    pub private_document: bool,
    /// Treat strings that look like URLs as addresses rather than markup
    pub convert_strings_to_uri: bool,
}

impl Default for AssertionOptions {
    fn default() -> Self {
        Self {
            private_document: false,
            convert_strings_to_uri: true,
        }
    }
}

/// Result of checking one input
#[derive(Debug, Clone)]
pub struct AssertionOutcome {
    response: ValidationResponse,
}

impl AssertionOutcome {
    pub fn passed(&self) -> bool {
        self.response.validity()
    }

    pub fn response(&self) -> &ValidationResponse {
        &self.response
    }

    pub fn into_response(self) -> ValidationResponse {
        self.response
    }

    /// Human-readable summary; on failure, one line per reported error
    pub fn description(&self) -> String {
        if self.passed() {
            return "markup is valid".to_string();
        }

        let mut description = format!(
            "markup is not valid ({} error(s))",
            self.response.error_count()
        );
        for error in self.response.errors() {
            let _ = write!(
                description,
                "\n  line {}, column {}: {}",
                error.line(),
                error.col(),
                error.message().unwrap_or("(no message)")
            );
        }
        description
    }
}

/// Checks inputs for validity through a [`MarkupValidatorClient`]
#[derive(Debug, Clone)]
pub struct MarkupAssertion {
    client: MarkupValidatorClient,
    options: AssertionOptions,
    request: ValidatorOptions,
}

impl MarkupAssertion {
    pub fn new(client: MarkupValidatorClient, options: AssertionOptions) -> Self {
        Self {
            client,
            options,
            request: ValidatorOptions::default(),
        }
    }

    /// Options forwarded with every validator request
    pub fn with_request_options(mut self, request: ValidatorOptions) -> Self {
        self.request = request;
        self
    }

    pub fn options(&self) -> AssertionOptions {
        self.options
    }

    /// Validate `input` and report the outcome.
    ///
    /// The variant decides the request shape: [`ValidationInput::Text`] is
    /// always sent as a fragment. A missing input is rejected before any
    /// request is made.
    pub async fn matches(&self, input: Option<ValidationInput>) -> Result<AssertionOutcome> {
        let input = input.ok_or_else(|| {
            ValidatorError::InvalidArgument("no document supplied for validation".to_string())
        })?;

        let response = match input {
            ValidationInput::Uri(url) => self.check_uri(&url).await?,
            ValidationInput::Bytes(bytes) => {
                self.client.check_by_upload(&bytes, &self.request).await?
            }
            ValidationInput::Text(text) => {
                self.client.check_by_fragment(&text, &self.request).await?
            }
        };

        Ok(AssertionOutcome { response })
    }

    /// Validate a string. It is classified once with
    /// [`ValidationInput::from_text`] under the `convert_strings_to_uri` option.
    pub async fn matches_text(&self, text: &str) -> Result<AssertionOutcome> {
        let input = ValidationInput::from_text(text, self.options.convert_strings_to_uri);
        self.matches(Some(input)).await
    }

    /// Fail with [`ValidatorError::AssertionFailed`] unless `input` is valid
    pub async fn assert_valid(&self, input: impl Into<ValidationInput>) -> Result<()> {
        let outcome = self.matches(Some(input.into())).await?;
        if outcome.passed() {
            Ok(())
        } else {
            Err(ValidatorError::AssertionFailed {
                description: outcome.description(),
            })
        }
    }

    async fn check_uri(&self, url: &Url) -> Result<ValidationResponse> {
        if self.options.private_document {
            debug!(document = %url, "private document, uploading local copy");
            let document = self.client.fetch_document(url).await?;
            self.client.check_by_upload(&document, &self.request).await
        } else {
            self.client.check_by_uri(url, &self.request).await
        }
    }
}
