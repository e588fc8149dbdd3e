use std::fmt;

use thiserror::Error;

/// Main library error type that encompasses all possible failure modes
#[derive(Error, Debug)]
pub enum ValidatorError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP status error: {status} for {url} - {message}")]
    HttpStatus {
        url: String,
        status: u16,
        message: String,
    },

    #[error("Request timeout: {url} after {timeout_seconds} seconds")]
    Timeout { url: String, timeout_seconds: u64 },

    #[error("XML parsing error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Malformed validator response: {details}")]
    MalformedResponse { details: String },

    #[error("Validator reported a SOAP fault: {0}")]
    Fault(#[from] ServiceFault),

    #[error("Invalid value for field '{field}': {value:?} - {reason}")]
    FieldCoercion {
        field: String,
        value: Option<String>,
        reason: String,
    },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Markup is not valid:\n{description}")]
    AssertionFailed { description: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ValidatorError {
    /// The request could not be completed (network failure, timeout, non-success status)
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ValidatorError::Http(_)
                | ValidatorError::HttpStatus { .. }
                | ValidatorError::Timeout { .. }
        )
    }

    /// The response body was not a recognizable SOAP envelope
    pub fn is_structural(&self) -> bool {
        matches!(
            self,
            ValidatorError::Xml(_) | ValidatorError::MalformedResponse { .. }
        )
    }

    /// The service rejected the request with a SOAP fault
    pub fn as_fault(&self) -> Option<&ServiceFault> {
        match self {
            ValidatorError::Fault(fault) => Some(fault),
            _ => None,
        }
    }

    pub(crate) fn malformed(details: impl Into<String>) -> Self {
        ValidatorError::MalformedResponse {
            details: details.into(),
        }
    }

    pub(crate) fn coercion(
        field: &str,
        value: Option<&str>,
        reason: impl Into<String>,
    ) -> Self {
        ValidatorError::FieldCoercion {
            field: field.to_string(),
            value: value.map(str::to_string),
            reason: reason.into(),
        }
    }
}

/// A SOAP 1.2 fault returned by the validator in place of a normal result.
///
/// Every field is taken verbatim from the envelope; sub-elements that are
/// missing or empty are `None`.
#[derive(Error, Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceFault {
    reason: Option<String>,
    fault_code: Option<String>,
    message_id: Option<String>,
    error_detail: Option<String>,
}

impl ServiceFault {
    pub fn new(
        reason: Option<String>,
        fault_code: Option<String>,
        message_id: Option<String>,
        error_detail: Option<String>,
    ) -> Self {
        Self {
            reason,
            fault_code,
            message_id,
            error_detail,
        }
    }

    /// Text of `Reason/Text`
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Text of `Code/Value`, e.g. `env:Sender`
    pub fn fault_code(&self) -> Option<&str> {
        self.fault_code.as_deref()
    }

    /// Validator-internal message id from `Detail/messageid`
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// Text of `Detail/errordetail`
    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }
}

impl fmt::Display for ServiceFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Reason: {}", self.reason().unwrap_or_default())?;
        writeln!(f, "FaultCode: {}", self.fault_code().unwrap_or_default())?;
        writeln!(f, "MessageId: {}", self.message_id().unwrap_or_default())?;
        write!(f, "ErrorDetail: {}", self.error_detail().unwrap_or_default())
    }
}

/// Configuration-specific error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlParsing(#[from] toml::de::Error),

    #[error("JSON parsing error: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Configuration validation error: {0}")]
    Validation(String),

    #[error("Environment variable error: {0}")]
    Environment(String),

    #[error("Unsupported configuration file format: {0}")]
    UnsupportedFormat(String),
}

impl From<ConfigError> for ValidatorError {
    fn from(err: ConfigError) -> Self {
        ValidatorError::Config(err.to_string())
    }
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ValidatorError>;

/// Configuration result type alias
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
