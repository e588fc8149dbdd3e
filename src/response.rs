//! Typed view of a markup validation result
//!
//! A [`ValidationResponse`] is built once, eagerly, from the
//! `markupvalidationresponse` element located by the SOAP decoder. Required
//! fields (`validity`, and `line`/`col` of every message) are coerced during
//! construction, so a response that exists is complete.

use std::collections::HashMap;
use std::io::Read;
use std::ops::Deref;

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};
use tracing::warn;
use url::Url;

use crate::error::{Result, ValidatorError};
use crate::soap::{self, FieldReader, SoapBody, XmlElement};

/// Parsed result of one validation request
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationResponse {
    uri: Option<Url>,
    checked_by: Option<Url>,
    doctype: Option<String>,
    charset: Option<&'static Encoding>,
    validity: bool,
    errors: MessageList,
    warnings: MessageList,
    debug: Option<HashMap<String, String>>,
}

impl ValidationResponse {
    /// Parse a complete SOAP response body.
    ///
    /// A SOAP fault in the body is returned as [`ValidatorError::Fault`].
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        Self::from_body(soap::parse_envelope(bytes)?)
    }

    /// Read a SOAP response stream to its end and parse it
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Self::from_body(soap::read_envelope(reader)?)
    }

    fn from_body(body: SoapBody) -> Result<Self> {
        match body {
            SoapBody::Fault(fault) => Err(ValidatorError::Fault(fault)),
            SoapBody::Response(element) => Self::from_element(&element),
        }
    }

    /// Build the response from a `markupvalidationresponse` element
    pub fn from_element(element: &XmlElement) -> Result<Self> {
        let fields = FieldReader::markup(element);

        Ok(Self {
            uri: fields.uri("uri")?,
            checked_by: fields.uri("checkedby")?,
            doctype: fields.text("doctype"),
            charset: fields.encoding("charset")?,
            validity: fields.boolean("validity")?,
            errors: MessageList::from_section(fields.child("errors"), MessageKind::Error)?,
            warnings: MessageList::from_section(fields.child("warnings"), MessageKind::Warning)?,
            debug: read_debug(&fields),
        })
    }

    /// Address of the checked document, when it was checked by reference
    pub fn uri(&self) -> Option<&Url> {
        self.uri.as_ref()
    }

    /// Address of the validator instance that produced this result
    pub fn checked_by(&self) -> Option<&Url> {
        self.checked_by.as_ref()
    }

    /// Document type detected (or forced) by the validator
    pub fn doctype(&self) -> Option<&str> {
        self.doctype.as_deref()
    }

    /// Character encoding detected (or forced) by the validator
    pub fn charset(&self) -> Option<&'static Encoding> {
        self.charset
    }

    /// The single pass/fail signal
    pub fn validity(&self) -> bool {
        self.validity
    }

    pub fn is_valid(&self) -> bool {
        self.validity
    }

    pub fn errors(&self) -> &MessageList {
        &self.errors
    }

    pub fn warnings(&self) -> &MessageList {
        &self.warnings
    }

    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings.len()
    }

    /// Debug entries; `None` unless the service returned at least one
    pub fn debug(&self) -> Option<&HashMap<String, String>> {
        self.debug.as_ref()
    }

    pub fn debug_value(&self, name: &str) -> Option<&str> {
        self.debug
            .as_ref()
            .and_then(|debug| debug.get(name))
            .map(String::as_str)
    }
}

fn read_debug(fields: &FieldReader<'_>) -> Option<HashMap<String, String>> {
    let mut entries = HashMap::new();
    for entry in fields.descendants("debug") {
        let Some(name) = entry.element().attribute("name") else {
            continue;
        };
        entries.insert(name.to_string(), entry.own_text().unwrap_or_default());
    }
    if entries.is_empty() {
        None
    } else {
        Some(entries)
    }
}

/// Whether a message list holds errors or warnings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Error,
    Warning,
}

impl MessageKind {
    /// Local name of one message element, also the stem of its siblings
    /// (`errorcount`, `errorlist`)
    pub fn tag(self) -> &'static str {
        match self {
            MessageKind::Error => "error",
            MessageKind::Warning => "warning",
        }
    }
}

/// One error or warning reported by the validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    line: i32,
    col: i32,
    message: Option<String>,
    message_id: Option<String>,
    explanation: Option<String>,
    source: Option<String>,
}

impl Message {
    fn from_fields(fields: &FieldReader<'_>) -> Result<Self> {
        Ok(Self {
            line: fields.integer("line")?,
            col: fields.integer("col")?,
            message: fields.text("message"),
            message_id: fields.text("messageid"),
            explanation: fields.text("explanation"),
            source: fields.text("source"),
        })
    }

    pub fn line(&self) -> i32 {
        self.line
    }

    pub fn col(&self) -> i32 {
        self.col
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Validator-internal message code
    pub fn message_id(&self) -> Option<&str> {
        self.message_id.as_deref()
    }

    /// HTML fragment explaining the message
    pub fn explanation(&self) -> Option<&str> {
        self.explanation.as_deref()
    }

    /// HTML fragment showing the offending source
    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }
}

/// Fixed-length, read-only list of messages in document order.
///
/// Dereferences to a slice; there is no way to add or remove entries once
/// the list has been built.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageList {
    messages: Box<[Message]>,
}

impl MessageList {
    fn from_section(section: Option<FieldReader<'_>>, kind: MessageKind) -> Result<Self> {
        let Some(section) = section else {
            return Ok(Self::default());
        };

        let tag = kind.tag();
        let count_field = format!("{}count", tag);
        let list_field = format!("{}list", tag);

        let declared = section
            .text(&count_field)
            .and_then(|count| count.trim().parse::<usize>().ok())
            .unwrap_or(0);

        let messages = match section.child(&list_field) {
            Some(list) => list
                .children(tag)
                .map(|element| Message::from_fields(&element))
                .collect::<Result<Vec<_>>>()?,
            None => Vec::new(),
        };

        if declared != messages.len() {
            warn!(
                kind = tag,
                declared,
                found = messages.len(),
                "validator message count disagrees with listed messages"
            );
        }

        Ok(Self {
            messages: messages.into_boxed_slice(),
        })
    }

    pub fn as_slice(&self) -> &[Message] {
        &self.messages
    }
}

impl Deref for MessageList {
    type Target = [Message];

    fn deref(&self) -> &Self::Target {
        &self.messages
    }
}

impl<'a> IntoIterator for &'a MessageList {
    type Item = &'a Message;
    type IntoIter = std::slice::Iter<'a, Message>;

    fn into_iter(self) -> Self::IntoIter {
        self.messages.iter()
    }
}

impl From<Vec<Message>> for MessageList {
    fn from(messages: Vec<Message>) -> Self {
        Self {
            messages: messages.into_boxed_slice(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(inner: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<env:Envelope xmlns:env="http://www.w3.org/2003/05/soap-envelope">
  <env:Body>
    <m:markupvalidationresponse env:encodingStyle="http://www.w3.org/2003/05/soap-encoding" xmlns:m="http://www.w3.org/2005/10/markup-validator">
      {}
    </m:markupvalidationresponse>
  </env:Body>
</env:Envelope>"#,
            inner
        )
    }

    #[test]
    fn test_minimal_valid_response() {
        let xml = wrap("<m:validity>true</m:validity>");
        let response = ValidationResponse::from_slice(xml.as_bytes()).unwrap();

        assert!(response.validity());
        assert!(response.uri().is_none());
        assert!(response.checked_by().is_none());
        assert!(response.doctype().is_none());
        assert!(response.charset().is_none());
        assert!(response.errors().is_empty());
        assert!(response.warnings().is_empty());
        assert!(response.debug().is_none());
    }

    #[test]
    fn test_missing_validity_is_an_error() {
        let xml = wrap("<m:doctype>HTML5</m:doctype>");
        let err = ValidationResponse::from_slice(xml.as_bytes()).unwrap_err();
        match err {
            ValidatorError::FieldCoercion { field, value, .. } => {
                assert_eq!(field, "validity");
                assert!(value.is_none());
            }
            other => panic!("Expected FieldCoercion, got {:?}", other),
        }
    }

    #[test]
    fn test_literal_count_wins_over_declared_count() {
        let xml = wrap(
            r#"<m:validity>false</m:validity>
      <m:errors>
        <m:errorcount>5</m:errorcount>
        <m:errorlist>
          <m:error><m:line>1</m:line><m:col>2</m:col><m:message>first</m:message></m:error>
          <m:error><m:line>3</m:line><m:col>4</m:col><m:message>second</m:message></m:error>
        </m:errorlist>
      </m:errors>"#,
        );
        let response = ValidationResponse::from_slice(xml.as_bytes()).unwrap();

        assert_eq!(response.error_count(), 2);
        assert_eq!(response.errors()[0].message(), Some("first"));
        assert_eq!(response.errors()[1].line(), 3);
        assert_eq!(response.errors()[1].col(), 4);
    }

    #[test]
    fn test_unparsable_count_still_lists_messages() {
        let xml = wrap(
            r#"<m:validity>true</m:validity>
      <m:warnings>
        <m:warningcount>lots</m:warningcount>
        <m:warninglist>
          <m:warning><m:line>0</m:line><m:col>0</m:col><m:messageid>W21</m:messageid></m:warning>
        </m:warninglist>
      </m:warnings>"#,
        );
        let response = ValidationResponse::from_slice(xml.as_bytes()).unwrap();

        assert_eq!(response.warning_count(), 1);
        let warning = &response.warnings()[0];
        assert_eq!(warning.message_id(), Some("W21"));
        assert!(warning.message().is_none());
        assert!(warning.explanation().is_none());
    }

    #[test]
    fn test_section_without_list_is_empty() {
        let xml = wrap(
            "<m:validity>true</m:validity><m:errors><m:errorcount>0</m:errorcount></m:errors>",
        );
        let response = ValidationResponse::from_slice(xml.as_bytes()).unwrap();
        assert!(response.errors().is_empty());
    }

    #[test]
    fn test_message_without_line_fails() {
        let xml = wrap(
            r#"<m:validity>false</m:validity>
      <m:errors><m:errorlist><m:error><m:col>1</m:col></m:error></m:errorlist></m:errors>"#,
        );
        let err = ValidationResponse::from_slice(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, ValidatorError::FieldCoercion { ref field, .. } if field == "line"));
    }

    #[test]
    fn test_debug_entries_last_one_wins() {
        let xml = wrap(
            r#"<m:validity>true</m:validity>
      <m:debug name="Parser">first</m:debug>
      <m:debug name="Parser">SGML::Parser::OpenSP</m:debug>
      <m:debug name="Empty"></m:debug>
      <m:debug>anonymous</m:debug>"#,
        );
        let response = ValidationResponse::from_slice(xml.as_bytes()).unwrap();

        let debug = response.debug().unwrap();
        assert_eq!(debug.len(), 2);
        assert_eq!(response.debug_value("Parser"), Some("SGML::Parser::OpenSP"));
        assert_eq!(response.debug_value("Empty"), Some(""));
        assert_eq!(response.debug_value("Missing"), None);
    }

    #[test]
    fn test_fault_becomes_error() {
        let xml = r#"<env:Envelope xmlns:env="http://www.w3.org/2003/05/soap-envelope">
  <env:Body><env:Fault><env:Reason><env:Text>Validator Error</env:Text></env:Reason></env:Fault></env:Body>
</env:Envelope>"#;
        let err = ValidationResponse::from_slice(xml.as_bytes()).unwrap_err();
        assert_eq!(err.as_fault().unwrap().reason(), Some("Validator Error"));
    }

    #[test]
    fn test_message_list_is_read_only_slice() {
        let list = MessageList::from(vec![]);
        assert_eq!(list.len(), 0);
        assert!(list.iter().next().is_none());
        assert!(list.as_slice().is_empty());
    }

    #[test]
    fn test_message_kind_tags() {
        assert_eq!(MessageKind::Error.tag(), "error");
        assert_eq!(MessageKind::Warning.tag(), "warning");
    }
}
