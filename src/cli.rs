use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::assertion::AssertionOptions;
use crate::error::{Result, ValidatorError};
use crate::options::ValidatorOptions;

/// Verbosity levels for output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum VerbosityLevel {
    /// Only the verdict
    Quiet,
    /// Verdict and messages
    #[default]
    Normal,
    /// Everything the service returned, including explanations and debug entries
    Verbose,
}

impl VerbosityLevel {
    pub fn from_flags(verbose: bool, quiet: bool) -> Self {
        if quiet {
            VerbosityLevel::Quiet
        } else if verbose {
            VerbosityLevel::Verbose
        } else {
            VerbosityLevel::Normal
        }
    }
}

/// Rendering of a validation result
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Human,
    /// Machine-readable JSON
    Json,
    /// One line per document
    Summary,
}

/// Check markup with the W3C Markup Validation Service
#[derive(Parser, Debug, Clone)]
#[command(name = "w3c-validate")]
#[command(about = "Check HTML/XHTML markup with the W3C Markup Validation Service")]
#[command(version)]
pub struct Cli {
    /// Document address or inline markup; read from stdin when omitted
    #[arg(help = "URI or inline markup to validate", conflicts_with = "file")]
    pub input: Option<String>,

    /// Upload a local file instead
    #[arg(short = 'f', long = "file")]
    pub file: Option<PathBuf>,

    /// Never treat INPUT as a URI
    #[arg(long = "no-uri")]
    pub no_uri: bool,

    /// Download URI inputs locally and upload them
    #[arg(long = "private")]
    pub private: bool,

    /// Validator endpoint
    #[arg(long = "validator", value_name = "URI")]
    pub validator: Option<String>,

    /// Character encoding override sent to the service
    #[arg(long = "charset", value_name = "NAME")]
    pub charset: Option<String>,

    /// Document type override sent to the service
    #[arg(long = "doctype", value_name = "DOCTYPE")]
    pub doctype: Option<String>,

    /// Ask the service for debug entries
    #[arg(long = "debug")]
    pub debug: bool,

    /// Ask the service for verbose output
    #[arg(long = "verbose-report")]
    pub verbose_report: bool,

    /// Output format
    #[arg(long = "format", value_enum)]
    pub output_format: Option<OutputFormat>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose", help = "Enable verbose output")]
    pub verbose: bool,

    /// Enable quiet mode (verdict only)
    #[arg(
        short = 'q',
        long = "quiet",
        help = "Quiet mode",
        conflicts_with = "verbose"
    )]
    pub quiet: bool,

    /// HTTP request timeout in seconds
    #[arg(long = "timeout")]
    pub timeout: Option<u64>,

    /// Configuration file (TOML or JSON)
    #[arg(long = "config")]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Per-request options from the command line
    pub fn validator_options(&self) -> Result<ValidatorOptions> {
        let mut options = ValidatorOptions::new()
            .with_verbose(self.verbose_report)
            .with_debug(self.debug);
        if let Some(label) = &self.charset {
            options = options.with_charset_label(label)?;
        }
        if let Some(doctype) = &self.doctype {
            options = options.with_doctype(doctype.clone());
        }
        Ok(options)
    }

    pub fn assertion_options(&self) -> AssertionOptions {
        AssertionOptions {
            private_document: self.private,
            convert_strings_to_uri: !self.no_uri,
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(path) = &self.file
            && !path.is_file()
        {
            return Err(ValidatorError::InvalidArgument(format!(
                "File does not exist: {}",
                path.display()
            )));
        }
        if self.timeout == Some(0) {
            return Err(ValidatorError::InvalidArgument(
                "Timeout must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}
