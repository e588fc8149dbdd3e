//! # w3c-validators Library
//!
//! An async client for the W3C Markup Validation Service SOAP interface,
//! with a typed response model, public-endpoint throttling, and a
//! test-assertion adapter.

pub mod assertion;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod http_client;
pub mod multipart;
pub mod options;
pub mod output;
pub mod response;
pub mod soap;
pub mod throttle;

pub use assertion::{AssertionOptions, AssertionOutcome, MarkupAssertion, ValidationInput};
pub use cli::{Cli, OutputFormat, VerbosityLevel};
pub use client::{
    ClientEvent, EventCallback, MarkupValidatorClient, PUBLIC_VALIDATOR, ValidatorEndpoint,
};
pub use config::{Config, ConfigManager, EnvProvider, SystemEnvProvider};
pub use error::{ConfigError, Result, ServiceFault, ValidatorError};
pub use http_client::{AsyncHttpClient, HttpClientConfig};
pub use multipart::MultipartFormData;
pub use options::ValidatorOptions;
pub use output::Output;
pub use response::{Message, MessageKind, MessageList, ValidationResponse};
pub use soap::{SoapBody, XmlElement};
