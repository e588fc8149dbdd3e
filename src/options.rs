use encoding_rs::Encoding;

use crate::error::{Result, ValidatorError};

/// Output format requested from the validator; the client only understands SOAP 1.2
pub const OUTPUT_FORMAT: &str = "soap12";

/// Per-request options sent to the validator
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidatorOptions {
    /// Override the character encoding the validator detects
    pub charset: Option<&'static Encoding>,
    /// Override the document type the validator detects
    pub doctype: Option<String>,
    /// Ask for verbose output
    pub verbose: bool,
    /// Ask for debug entries in the response
    pub debug: bool,
}

impl ValidatorOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_charset(mut self, charset: &'static Encoding) -> Self {
        self.charset = Some(charset);
        self
    }

    /// Look up the charset override by label, e.g. `"utf-8"` or `"latin1"`
    pub fn with_charset_label(self, label: &str) -> Result<Self> {
        let charset = Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
            ValidatorError::InvalidArgument(format!("unknown character encoding: {}", label))
        })?;
        Ok(self.with_charset(charset))
    }

    pub fn with_doctype(mut self, doctype: impl Into<String>) -> Self {
        self.doctype = Some(doctype.into());
        self
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Request fields in wire order. `output` is always first; unset options
    /// are omitted rather than sent empty.
    pub fn to_fields(&self) -> Vec<(&'static str, String)> {
        let mut fields = vec![("output", OUTPUT_FORMAT.to_string())];
        if let Some(charset) = self.charset {
            fields.push(("charset", charset.name().to_string()));
        }
        if let Some(doctype) = &self.doctype {
            fields.push(("doctype", doctype.clone()));
        }
        if self.verbose {
            fields.push(("verbose", "1".to_string()));
        }
        if self.debug {
            fields.push(("debug", "1".to_string()));
        }
        fields
    }

    /// Rebuild options from request fields. Unknown field names (such as the
    /// document itself) are ignored; an `output` other than `soap12` is rejected.
    pub fn from_fields<I, K, V>(fields: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut options = Self::default();
        for (key, value) in fields {
            let value = value.as_ref();
            match key.as_ref() {
                "output" if value != OUTPUT_FORMAT => {
                    return Err(ValidatorError::InvalidArgument(format!(
                        "unsupported output format: {}",
                        value
                    )));
                }
                "charset" => options = options.with_charset_label(value)?,
                "doctype" => options.doctype = Some(value.to_string()),
                "verbose" => options.verbose = value == "1",
                "debug" => options.debug = value == "1",
                _ => {}
            }
        }
        Ok(options)
    }
}
