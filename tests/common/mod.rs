#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use httpmock::MockServer;
use w3c_validators::{ClientEvent, HttpClientConfig, MarkupValidatorClient, ValidatorEndpoint};

pub const VALIDATOR_PATH: &str = "/w3c-validator/check";

/// Path of a file under `tests/fixtures`
pub fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(fixture_path(name))
        .unwrap_or_else(|e| panic!("failed to read fixture {}: {}", name, e))
}

/// Wrap a `markupvalidationresponse` payload in a SOAP 1.2 envelope
pub fn envelope(payload: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<env:Envelope xmlns:env="http://www.w3.org/2003/05/soap-envelope">
<env:Body>
<m:markupvalidationresponse xmlns:m="http://www.w3.org/2005/10/markup-validator">
{}
</m:markupvalidationresponse>
</env:Body>
</env:Envelope>"#,
        payload
    )
}

/// Client pointed at the validator path of a mock server
pub fn client_for(server: &MockServer) -> MarkupValidatorClient {
    let endpoint = ValidatorEndpoint::parse(&server.url(VALIDATOR_PATH)).unwrap();
    let config = HttpClientConfig {
        timeout_seconds: 5,
        ..Default::default()
    };
    MarkupValidatorClient::with_http_config(endpoint, config).unwrap()
}

/// Events seen by a client, in order
pub fn record_events(client: &mut MarkupValidatorClient) -> Arc<Mutex<Vec<ClientEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    client.add_listener(move |event| sink.lock().unwrap().push(event));
    events
}
