//! Output and Reporting
//!
//! Renders validation results as human text, a one-line summary, or JSON.

use std::collections::BTreeMap;

use atty;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::cli::{OutputFormat, VerbosityLevel};
use crate::error::ValidatorError;
use crate::response::{Message, MessageKind, ValidationResponse};

/// Output formatter for validation results
pub struct Output {
    format: OutputFormat,
    verbosity: VerbosityLevel,
    show_colors: bool,
}

/// Serializable view of one validation result
#[derive(Debug, Serialize)]
pub struct ResponseReport<'a> {
    pub source: &'a str,
    pub checked_at: DateTime<Utc>,
    pub uri: Option<&'a str>,
    pub checked_by: Option<&'a str>,
    pub doctype: Option<&'a str>,
    pub charset: Option<&'static str>,
    pub validity: bool,
    pub error_count: usize,
    pub warning_count: usize,
    pub errors: &'a [Message],
    pub warnings: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug: Option<BTreeMap<&'a str, &'a str>>,
}

impl<'a> ResponseReport<'a> {
    pub fn new(source: &'a str, response: &'a ValidationResponse) -> Self {
        Self {
            source,
            checked_at: Utc::now(),
            uri: response.uri().map(|uri| uri.as_str()),
            checked_by: response.checked_by().map(|uri| uri.as_str()),
            doctype: response.doctype(),
            charset: response.charset().map(|charset| charset.name()),
            validity: response.validity(),
            error_count: response.error_count(),
            warning_count: response.warning_count(),
            errors: response.errors().as_slice(),
            warnings: response.warnings().as_slice(),
            debug: response.debug().map(|entries| {
                entries
                    .iter()
                    .map(|(name, value)| (name.as_str(), value.as_str()))
                    .collect()
            }),
        }
    }
}

/// Serializable view of a failed check
#[derive(Debug, Serialize)]
pub struct ErrorReport<'a> {
    pub source: &'a str,
    pub checked_at: DateTime<Utc>,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fault: Option<FaultReport<'a>>,
}

#[derive(Debug, Serialize)]
pub struct FaultReport<'a> {
    pub reason: Option<&'a str>,
    pub fault_code: Option<&'a str>,
    pub message_id: Option<&'a str>,
    pub error_detail: Option<&'a str>,
}

impl Output {
    pub fn new(format: OutputFormat, verbosity: VerbosityLevel) -> Self {
        Self {
            format,
            verbosity,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    pub fn with_colors(mut self, show_colors: bool) -> Self {
        self.show_colors = show_colors;
        self
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    /// Render a completed validation of `source`
    pub fn format_response(&self, source: &str, response: &ValidationResponse) -> String {
        match self.format {
            OutputFormat::Json => {
                let report = ResponseReport::new(source, response);
                serde_json::to_string_pretty(&report)
                    .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
            }
            OutputFormat::Summary => self.format_summary_line(source, response),
            OutputFormat::Human => self.format_human(source, response),
        }
    }

    /// Render a check that could not be completed
    pub fn format_error(&self, source: &str, error: &ValidatorError) -> String {
        match self.format {
            OutputFormat::Json => {
                let report = ErrorReport {
                    source,
                    checked_at: Utc::now(),
                    error: error.to_string(),
                    fault: error.as_fault().map(|fault| FaultReport {
                        reason: fault.reason(),
                        fault_code: fault.fault_code(),
                        message_id: fault.message_id(),
                        error_detail: fault.error_detail(),
                    }),
                };
                serde_json::to_string_pretty(&report)
                    .unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
            }
            OutputFormat::Summary | OutputFormat::Human => {
                format!("{}  {} - {}", self.colorize("⚠ ERROR", "33"), source, error)
            }
        }
    }

    fn format_summary_line(&self, source: &str, response: &ValidationResponse) -> String {
        let verdict = if response.validity() {
            self.colorize("✓ VALID", "32")
        } else {
            self.colorize("✗ INVALID", "31")
        };
        format!(
            "{}  {} - {} error{}, {} warning{}",
            verdict,
            source,
            response.error_count(),
            plural(response.error_count()),
            response.warning_count(),
            plural(response.warning_count())
        )
    }

    fn format_human(&self, source: &str, response: &ValidationResponse) -> String {
        let mut output = self.format_summary_line(source, response);
        output.push('\n');

        if self.verbosity == VerbosityLevel::Quiet {
            return output;
        }

        if let Some(doctype) = response.doctype() {
            output.push_str(&format!("  Doctype: {}\n", doctype));
        }
        if let Some(charset) = response.charset() {
            output.push_str(&format!("  Charset: {}\n", charset.name()));
        }
        if self.verbosity >= VerbosityLevel::Verbose
            && let Some(checked_by) = response.checked_by()
        {
            output.push_str(&format!("  Checked by: {}\n", checked_by));
        }

        for error in response.errors() {
            output.push_str(&self.format_message(error, MessageKind::Error));
        }
        for warning in response.warnings() {
            output.push_str(&self.format_message(warning, MessageKind::Warning));
        }

        if self.verbosity >= VerbosityLevel::Verbose
            && let Some(debug) = response.debug()
        {
            output.push_str("\nDebug Information:\n");
            let sorted: BTreeMap<_, _> = debug.iter().collect();
            for (name, value) in sorted {
                output.push_str(&format!("  {}: {}\n", name, value));
            }
        }

        output
    }

    fn format_message(&self, message: &Message, kind: MessageKind) -> String {
        let label = match kind {
            MessageKind::Error => self.colorize(kind.tag(), "31"),
            MessageKind::Warning => self.colorize(kind.tag(), "33"),
        };
        let mut output = format!(
            "  {} line {}, column {}: {}",
            label,
            message.line(),
            message.col(),
            message.message().unwrap_or("(no message)")
        );
        if let Some(id) = message.message_id() {
            output.push_str(&format!(" [{}]", id));
        }
        output.push('\n');

        if self.verbosity >= VerbosityLevel::Verbose {
            if let Some(source) = message.source() {
                output.push_str(&format!("      {}\n", source.trim()));
            }
            if let Some(explanation) = message.explanation() {
                for line in explanation.lines().map(str::trim).filter(|l| !l.is_empty()) {
                    output.push_str(&format!("      {}\n", line));
                }
            }
        }
        output
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ServiceFault;

    const INVALID: &str = r#"<env:Envelope xmlns:env="http://www.w3.org/2003/05/soap-envelope"><env:Body>
        <m:markupvalidationresponse xmlns:m="http://www.w3.org/2005/10/markup-validator">
            <m:uri>http://example.org/page.html</m:uri>
            <m:checkedby>http://validator.w3.org/</m:checkedby>
            <m:doctype>-//W3C//DTD XHTML 1.1//EN</m:doctype>
            <m:charset>utf-8</m:charset>
            <m:validity>false</m:validity>
            <m:errors>
                <m:errorcount>1</m:errorcount>
                <m:errorlist>
                    <m:error>
                        <m:line>8</m:line>
                        <m:col>5</m:col>
                        <m:message>character data is not allowed here</m:message>
                        <m:messageid>63</m:messageid>
                        <m:source>&lt;strong&gt;T&lt;/strong&gt;his file</m:source>
                    </m:error>
                </m:errorlist>
            </m:errors>
            <m:debug name="Parser">SGML::Parser::OpenSP</m:debug>
        </m:markupvalidationresponse>
    </env:Body></env:Envelope>"#;

    fn invalid_response() -> ValidationResponse {
        ValidationResponse::from_slice(INVALID.as_bytes()).unwrap()
    }

    #[test]
    fn test_summary_line() {
        let output = Output::new(OutputFormat::Summary, VerbosityLevel::Normal).with_colors(false);
        let formatted = output.format_response("page.html", &invalid_response());
        assert_eq!(formatted, "✗ INVALID  page.html - 1 error, 0 warnings");
    }

    #[test]
    fn test_human_output_lists_messages() {
        let output = Output::new(OutputFormat::Human, VerbosityLevel::Normal).with_colors(false);
        let formatted = output.format_response("page.html", &invalid_response());

        assert!(formatted.contains("Doctype: -//W3C//DTD XHTML 1.1//EN"));
        assert!(formatted.contains("Charset: UTF-8"));
        assert!(formatted.contains("error line 8, column 5: character data is not allowed here [63]"));
        assert!(!formatted.contains("Debug Information"));
        assert!(!formatted.contains("\x1b["));
    }

    #[test]
    fn test_verbose_human_output_includes_debug() {
        let output = Output::new(OutputFormat::Human, VerbosityLevel::Verbose).with_colors(false);
        let formatted = output.format_response("page.html", &invalid_response());

        assert!(formatted.contains("Checked by: http://validator.w3.org/"));
        assert!(formatted.contains("<strong>T</strong>his file"));
        assert!(formatted.contains("Parser: SGML::Parser::OpenSP"));
    }

    #[test]
    fn test_quiet_human_output_is_verdict_only() {
        let output = Output::new(OutputFormat::Human, VerbosityLevel::Quiet).with_colors(false);
        let formatted = output.format_response("page.html", &invalid_response());
        assert_eq!(formatted.lines().count(), 1);
    }

    #[test]
    fn test_json_report() {
        let output = Output::new(OutputFormat::Json, VerbosityLevel::Normal);
        let formatted = output.format_response("page.html", &invalid_response());
        let value: serde_json::Value = serde_json::from_str(&formatted).unwrap();

        assert_eq!(value["source"], "page.html");
        assert_eq!(value["validity"], false);
        assert_eq!(value["error_count"], 1);
        assert_eq!(value["charset"], "UTF-8");
        assert_eq!(value["errors"][0]["line"], 8);
        assert_eq!(value["errors"][0]["message_id"], "63");
        assert_eq!(value["debug"]["Parser"], "SGML::Parser::OpenSP");
        assert!(value["checked_at"].is_string());
    }

    #[test]
    fn test_json_fault_report() {
        let output = Output::new(OutputFormat::Json, VerbosityLevel::Normal);
        let error = ValidatorError::Fault(ServiceFault::new(
            Some("Validator Error".to_string()),
            Some("env:Sender".to_string()),
            None,
            Some("could not retrieve document".to_string()),
        ));
        let formatted = output.format_error("http://example.org/", &error);
        let value: serde_json::Value = serde_json::from_str(&formatted).unwrap();

        assert_eq!(value["fault"]["reason"], "Validator Error");
        assert_eq!(value["fault"]["fault_code"], "env:Sender");
        assert!(value["fault"]["message_id"].is_null());
    }

    #[test]
    fn test_colors() {
        let output = Output::new(OutputFormat::Summary, VerbosityLevel::Normal).with_colors(true);
        let formatted = output.format_response("page.html", &invalid_response());
        assert!(formatted.starts_with("\x1b[31m"));
    }
}
