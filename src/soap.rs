//! SOAP 1.2 envelope decoding
//!
//! The validator answers every `output=soap12` request with a SOAP envelope
//! whose body holds either a `markupvalidationresponse` element or a `Fault`.
//! This module reads the envelope into a small owned element tree with
//! resolved namespaces, classifies the body, and offers [`FieldReader`], a
//! read-only accessor used by the response model to pull typed fields out
//! of an element.

use std::borrow::Cow;
use std::io::Read;

use encoding_rs::Encoding;
use quick_xml::events::Event;
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use tracing::debug;
use url::Url;

use crate::error::{Result, ServiceFault, ValidatorError};

/// Namespace of the SOAP 1.2 envelope
pub const SOAP_ENVELOPE_NS: &str = "http://www.w3.org/2003/05/soap-envelope";

/// Namespace of the markup validator payload elements
pub const MARKUP_VALIDATOR_NS: &str = "http://www.w3.org/2005/10/markup-validator";

/// Local name of the element carrying a successful validation result
pub const RESPONSE_ELEMENT: &str = "markupvalidationresponse";

/// One node of the decoded document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// An element with its namespace resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElement {
    namespace: Option<String>,
    name: String,
    attributes: Vec<(String, String)>,
    children: Vec<XmlNode>,
}

impl XmlElement {
    fn new(namespace: Option<String>, name: String, attributes: Vec<(String, String)>) -> Self {
        Self {
            namespace,
            name,
            attributes,
            children: Vec::new(),
        }
    }

    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Value of an unqualified attribute
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn is(&self, namespace: &str, name: &str) -> bool {
        self.namespace.as_deref() == Some(namespace) && self.name == name
    }

    /// Child elements in document order
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            XmlNode::Text(_) => None,
        })
    }

    /// Concatenation of every text and CDATA node below this element
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                XmlNode::Text(text) => out.push_str(text),
                XmlNode::Element(element) => element.collect_text(out),
            }
        }
    }

    fn descendants_into<'a>(&'a self, namespace: &str, name: &str, out: &mut Vec<&'a XmlElement>) {
        for element in self.elements() {
            if element.is(namespace, name) {
                out.push(element);
            }
            element.descendants_into(namespace, name, out);
        }
    }
}

/// What the envelope body turned out to hold
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SoapBody {
    /// A `markupvalidationresponse` element
    Response(XmlElement),
    /// A `Fault` element, already decoded
    Fault(ServiceFault),
}

/// Parse a complete SOAP document and classify its body.
///
/// The bytes are decoded by their byte-order mark, else by the encoding named
/// in the XML declaration, else as UTF-8.
pub fn parse_envelope(bytes: &[u8]) -> Result<SoapBody> {
    let text = decode_document(bytes)?;
    let root = parse_document(&text)?;
    classify(root)
}

fn decode_document(bytes: &[u8]) -> Result<Cow<'_, str>> {
    let (encoding, bom_length) = match Encoding::for_bom(bytes) {
        Some(found) => found,
        None => (declared_encoding(bytes)?.unwrap_or(encoding_rs::UTF_8), 0),
    };
    let body = &bytes[bom_length..];
    if encoding != encoding_rs::UTF_8 {
        debug!(encoding = encoding.name(), "decoding response");
    }
    encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or_else(|| {
            ValidatorError::malformed(format!("response is not valid {}", encoding.name()))
        })
}

/// Encoding label from an `<?xml ... encoding="..."?>` declaration
fn declared_encoding(bytes: &[u8]) -> Result<Option<&'static Encoding>> {
    let Some(rest) = bytes.strip_prefix(b"<?xml") else {
        return Ok(None);
    };
    let Some(end) = rest.windows(2).position(|pair| pair == b"?>") else {
        return Ok(None);
    };
    let declaration = String::from_utf8_lossy(&rest[..end]);
    let Some(at) = declaration.find("encoding") else {
        return Ok(None);
    };
    let value = declaration[at + "encoding".len()..].trim_start();
    let Some(value) = value.strip_prefix('=') else {
        return Ok(None);
    };
    let value = value.trim_start();
    let Some(quote) = value.chars().next().filter(|c| *c == '"' || *c == '\'') else {
        return Ok(None);
    };
    let label = value[1..].split(quote).next().unwrap_or_default();

    // A declaration readable as ASCII rules out UTF-16
    Encoding::for_label(label.trim().as_bytes())
        .map(|encoding| Some(encoding.output_encoding()))
        .ok_or_else(|| {
            ValidatorError::malformed(format!("unsupported document encoding '{}'", label))
        })
}

/// Read a stream to its end, then parse it as a SOAP document
pub fn read_envelope<R: Read>(mut reader: R) -> Result<SoapBody> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    parse_envelope(&bytes)
}

fn parse_document(text: &str) -> Result<XmlElement> {
    let mut reader = NsReader::from_str(text);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        match event {
            Event::Start(start) | Event::Empty(start) if root.is_some() => {
                let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();
                return Err(ValidatorError::malformed(format!(
                    "element '{}' after document root",
                    name
                )));
            }
            Event::Start(start) => {
                let element = open_element(&resolved, &start)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = open_element(&resolved, &start)?;
                attach(&mut stack, &mut root, element);
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| ValidatorError::malformed("unbalanced end tag"))?;
                attach(&mut stack, &mut root, element);
            }
            Event::Text(text) => {
                if let Some(parent) = stack.last_mut() {
                    let unescaped = text.unescape()?;
                    parent.children.push(XmlNode::Text(unescaped.into_owned()));
                }
            }
            Event::CData(cdata) => {
                if let Some(parent) = stack.last_mut() {
                    let raw = cdata.into_inner();
                    parent
                        .children
                        .push(XmlNode::Text(String::from_utf8_lossy(&raw).into_owned()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(ValidatorError::malformed("document ended inside an element"));
    }
    root.ok_or_else(|| ValidatorError::malformed("document has no root element"))
}

fn open_element(
    resolved: &ResolveResult<'_>,
    start: &quick_xml::events::BytesStart<'_>,
) -> Result<XmlElement> {
    let namespace = match resolved {
        ResolveResult::Bound(Namespace(ns)) => Some(String::from_utf8_lossy(ns).into_owned()),
        ResolveResult::Unbound => None,
        ResolveResult::Unknown(prefix) => {
            return Err(ValidatorError::malformed(format!(
                "undeclared namespace prefix '{}'",
                String::from_utf8_lossy(prefix)
            )));
        }
    };
    let name = String::from_utf8_lossy(start.local_name().as_ref()).into_owned();

    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(quick_xml::Error::from)?;
        // Namespace declarations are not data
        if attribute.key.as_namespace_binding().is_some() {
            continue;
        }
        let key = String::from_utf8_lossy(attribute.key.local_name().as_ref()).into_owned();
        let value = attribute.unescape_value()?.into_owned();
        attributes.push((key, value));
    }

    Ok(XmlElement::new(namespace, name, attributes))
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None => *root = Some(element),
    }
}

fn classify(root: XmlElement) -> Result<SoapBody> {
    if !root.is(SOAP_ENVELOPE_NS, "Envelope") {
        return Err(ValidatorError::malformed(format!(
            "expected SOAP Envelope, found '{}'",
            root.name()
        )));
    }

    let body = root
        .elements()
        .find(|e| e.is(SOAP_ENVELOPE_NS, "Body"))
        .ok_or_else(|| ValidatorError::malformed("SOAP Envelope has no Body"))?;

    let payload = body
        .elements()
        .next()
        .ok_or_else(|| ValidatorError::malformed("SOAP Body is empty"))?;

    if payload.is(SOAP_ENVELOPE_NS, "Fault") {
        let fault = read_fault(payload);
        debug!(
            reason = fault.reason().unwrap_or_default(),
            message_id = fault.message_id().unwrap_or_default(),
            "validator returned a SOAP fault"
        );
        return Ok(SoapBody::Fault(fault));
    }

    if payload.is(MARKUP_VALIDATOR_NS, RESPONSE_ELEMENT) {
        return Ok(SoapBody::Response(payload.clone()));
    }

    Err(ValidatorError::malformed(format!(
        "SOAP Body holds neither a Fault nor a {} element (found '{}')",
        RESPONSE_ELEMENT,
        payload.name()
    )))
}

fn read_fault(fault: &XmlElement) -> ServiceFault {
    let envelope = FieldReader::new(fault, SOAP_ENVELOPE_NS);

    let reason = envelope
        .child("Reason")
        .and_then(|reason| reason.text("Text"));
    let fault_code = envelope.child("Code").and_then(|code| code.text("Value"));

    let detail = envelope.child("Detail");
    let detail_field = |name: &str| {
        detail.as_ref().and_then(|detail| {
            detail
                .rebind(MARKUP_VALIDATOR_NS)
                .text(name)
                .or_else(|| detail.unqualified_text(name))
        })
    };

    ServiceFault::new(
        reason,
        fault_code,
        detail_field("messageid"),
        detail_field("errordetail"),
    )
}

/// Read-only field access over one element.
///
/// Lookups match child elements by local name within the bound namespace.
/// Text that is absent or empty is reported as `None`, so `Some` always
/// carries a non-empty value.
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'a> {
    element: &'a XmlElement,
    namespace: &'static str,
}

impl<'a> FieldReader<'a> {
    pub fn new(element: &'a XmlElement, namespace: &'static str) -> Self {
        Self { element, namespace }
    }

    /// Accessor over the validator payload namespace
    pub fn markup(element: &'a XmlElement) -> Self {
        Self::new(element, MARKUP_VALIDATOR_NS)
    }

    pub fn element(&self) -> &'a XmlElement {
        self.element
    }

    fn rebind(&self, namespace: &'static str) -> Self {
        Self::new(self.element, namespace)
    }

    /// First child element with the given local name
    pub fn child(&self, name: &str) -> Option<FieldReader<'a>> {
        self.element
            .elements()
            .find(|e| e.is(self.namespace, name))
            .map(|element| self.with(element))
    }

    /// Every child element with the given local name, in document order
    pub fn children(&self, name: &'a str) -> impl Iterator<Item = FieldReader<'a>> + use<'a> {
        let reader = *self;
        self.element
            .elements()
            .filter(move |e| e.is(reader.namespace, name))
            .map(move |element| reader.with(element))
    }

    /// Every descendant element with the given local name, in document order
    pub fn descendants(&self, name: &str) -> Vec<FieldReader<'a>> {
        let mut found = Vec::new();
        self.element
            .descendants_into(self.namespace, name, &mut found);
        found.into_iter().map(|element| self.with(element)).collect()
    }

    fn with(&self, element: &'a XmlElement) -> FieldReader<'a> {
        Self::new(element, self.namespace)
    }

    /// Text content of this accessor's own element
    pub fn own_text(&self) -> Option<String> {
        non_empty(self.element.text_content())
    }

    /// Text content of a child element
    pub fn text(&self, name: &str) -> Option<String> {
        self.child(name).and_then(|child| child.own_text())
    }

    fn unqualified_text(&self, name: &str) -> Option<String> {
        self.element
            .elements()
            .find(|e| e.namespace().is_none() && e.name() == name)
            .and_then(|e| non_empty(e.text_content()))
    }

    /// Optional absolute URL; present but malformed text is an error
    pub fn uri(&self, name: &str) -> Result<Option<Url>> {
        match self.text(name) {
            None => Ok(None),
            Some(value) => Url::parse(value.trim())
                .map(Some)
                .map_err(|e| ValidatorError::coercion(name, Some(&value), e.to_string())),
        }
    }

    /// Optional character encoding; an unrecognized label is an error
    pub fn encoding(&self, name: &str) -> Result<Option<&'static Encoding>> {
        match self.text(name) {
            None => Ok(None),
            Some(value) => Encoding::for_label(value.trim().as_bytes())
                .map(Some)
                .ok_or_else(|| {
                    ValidatorError::coercion(name, Some(&value), "unknown character encoding")
                }),
        }
    }

    /// Required boolean
    pub fn boolean(&self, name: &str) -> Result<bool> {
        let value = self.required(name)?;
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("true") {
            Ok(true)
        } else if trimmed.eq_ignore_ascii_case("false") {
            Ok(false)
        } else {
            Err(ValidatorError::coercion(
                name,
                Some(&value),
                "expected 'true' or 'false'",
            ))
        }
    }

    /// Required 32-bit integer
    pub fn integer(&self, name: &str) -> Result<i32> {
        let value = self.required(name)?;
        value
            .trim()
            .parse::<i32>()
            .map_err(|e| ValidatorError::coercion(name, Some(&value), e.to_string()))
    }

    fn required(&self, name: &str) -> Result<String> {
        self.text(name)
            .ok_or_else(|| ValidatorError::coercion(name, None, "required field is missing"))
    }
}

fn non_empty(text: String) -> Option<String> {
    if text.is_empty() { None } else { Some(text) }
}
