mod common;

use std::time::{Duration, Instant};

use httpmock::Method::{GET, POST};
use httpmock::MockServer;
use url::Url;
use w3c_validators::{ClientEvent, ValidatorError, ValidatorOptions};

use common::{VALIDATOR_PATH, client_for, fixture, record_events};

#[tokio::test]
async fn test_check_by_uri_sends_options_and_document_address() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET)
                .path(VALIDATOR_PATH)
                .query_param("output", "soap12")
                .query_param("charset", "UTF-8")
                .query_param("debug", "1")
                .query_param(
                    "uri",
                    "http://raw-data.org/sites/default/files/invalidXhtml11.html",
                );
            then.status(200)
                .header("content-type", "application/soap+xml")
                .body(fixture("response.xml"));
        })
        .await;

    let client = client_for(&server);
    let document = Url::parse("http://raw-data.org/sites/default/files/invalidXhtml11.html").unwrap();
    let options = ValidatorOptions::new()
        .with_charset(encoding_rs::UTF_8)
        .with_debug(true);

    let response = client.check_by_uri(&document, &options).await.unwrap();

    mock.assert_async().await;
    assert!(!response.validity());
    assert_eq!(response.error_count(), 1);
    assert_eq!(response.debug_value("Parser"), Some("SGML::Parser::OpenSP"));
}

#[tokio::test]
async fn test_check_by_upload_posts_multipart_file() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(VALIDATOR_PATH)
                .header_exists("content-type")
                .body_contains("name=\"output\"\r\n\r\nsoap12\r\n")
                .body_contains("name=\"uploaded_file\"; filename=\"document.html\"")
                .body_contains("Content-Type: text/html")
                .body_contains("<p>uploaded</p>");
            then.status(200).body(fixture("valid.xml"));
        })
        .await;

    let client = client_for(&server);
    let response = client
        .check_by_upload(b"<p>uploaded</p>", &ValidatorOptions::default())
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(response.validity());
    assert_eq!(response.warning_count(), 1);
}

#[tokio::test]
async fn test_check_by_fragment_posts_fragment_field() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path(VALIDATOR_PATH)
                .body_contains("name=\"doctype\"\r\n\r\nXHTML 1.1\r\n")
                .body_contains("name=\"fragment\"\r\n\r\n<!DOCTYPE html><title>x</title>\r\n");
            then.status(200).body(fixture("valid.xml"));
        })
        .await;

    let client = client_for(&server);
    let options = ValidatorOptions::new().with_doctype("XHTML 1.1");
    let response = client
        .check_by_fragment("<!DOCTYPE html><title>x</title>", &options)
        .await
        .unwrap();

    mock.assert_async().await;
    assert!(response.validity());
}

#[tokio::test]
async fn test_events_fire_in_order_for_each_request() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.path(VALIDATOR_PATH);
            then.status(200).body(fixture("valid.xml"));
        })
        .await;

    let mut client = client_for(&server);
    let events = record_events(&mut client);

    let options = ValidatorOptions::default();
    client.check_by_fragment("<p>a</p>", &options).await.unwrap();
    client.check_by_upload(b"<p>b</p>", &options).await.unwrap();

    let events = events.lock().unwrap();
    assert_eq!(
        *events,
        vec![
            ClientEvent::SendingRequest,
            ClientEvent::ResponseReceived,
            ClientEvent::SendingRequest,
            ClientEvent::ResponseReceived,
        ]
    );
}

#[tokio::test]
async fn test_server_error_is_a_transport_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.path(VALIDATOR_PATH);
            then.status(500).body("internal error");
        })
        .await;

    let mut client = client_for(&server);
    let events = record_events(&mut client);

    let error = client
        .check_by_fragment("<p>x</p>", &ValidatorOptions::default())
        .await
        .unwrap_err();

    assert!(error.is_transport());
    assert!(matches!(error, ValidatorError::HttpStatus { status: 500, .. }));
    // No response was received, so no parse was attempted
    assert_eq!(*events.lock().unwrap(), vec![ClientEvent::SendingRequest]);
}

#[tokio::test]
async fn test_fault_is_propagated() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.path(VALIDATOR_PATH);
            then.status(200).body(fixture("fault.xml"));
        })
        .await;

    let client = client_for(&server);
    let document = Url::parse("foo://example.org/").unwrap();
    let error = client
        .check_by_uri(&document, &ValidatorOptions::default())
        .await
        .unwrap_err();

    let fault = error.as_fault().expect("expected a SOAP fault");
    assert_eq!(fault.reason(), Some("Validator Error"));
    assert_eq!(fault.fault_code(), Some("env:Sender"));
    assert_eq!(fault.message_id(), Some("fatal"));
}

#[tokio::test]
async fn test_non_soap_body_is_structural_error() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.path(VALIDATOR_PATH);
            then.status(200)
                .header("content-type", "text/html")
                .body("<html><body>Service temporarily unavailable</body></html>");
        })
        .await;

    let client = client_for(&server);
    let error = client
        .check_by_fragment("<p>x</p>", &ValidatorOptions::default())
        .await
        .unwrap_err();

    assert!(error.is_structural());
}

#[tokio::test]
async fn test_private_endpoint_is_not_throttled() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.path(VALIDATOR_PATH);
            then.status(200).body(fixture("valid.xml"));
        })
        .await;

    let client = client_for(&server);
    assert!(!client.endpoint().is_public());

    let options = ValidatorOptions::default();
    let start = Instant::now();
    for _ in 0..3 {
        client.check_by_fragment("<p>x</p>", &options).await.unwrap();
    }

    assert_eq!(mock.hits_async().await, 3);
    assert!(start.elapsed() < Duration::from_secs(1));
}

#[tokio::test]
async fn test_fetch_document_downloads_raw_bytes() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(GET).path("/pages/index.html");
            then.status(200).body("<!DOCTYPE html><title>local</title>");
        })
        .await;

    let client = client_for(&server);
    let address = Url::parse(&server.url("/pages/index.html")).unwrap();
    let bytes = client.fetch_document(&address).await.unwrap();

    mock.assert_async().await;
    assert_eq!(bytes, b"<!DOCTYPE html><title>local</title>");
}

#[tokio::test]
async fn test_clients_are_independent() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.path(VALIDATOR_PATH);
            then.status(200).body(fixture("valid.xml"));
        })
        .await;

    let client = client_for(&server);
    let options = ValidatorOptions::default();

    let (first, second) = tokio::join!(
        client.check_by_fragment("<p>1</p>", &options),
        client.check_by_fragment("<p>2</p>", &options)
    );
    assert!(first.unwrap().validity());
    assert!(second.unwrap().validity());
}
