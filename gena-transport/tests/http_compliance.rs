//! Wire-level tests for the SUBSCRIBE/UNSUBSCRIBE issuer.
//!
//! These run against a local mock HTTP server and check the headers we
//! send and the way we map response statuses and headers.

use mockito::{Matcher, Server};

use gena_transport::{GenaHttpClient, Timeout, TransportConfig, TransportError};

fn client() -> GenaHttpClient {
    GenaHttpClient::new(TransportConfig::default())
}

#[test]
fn initial_subscribe_sends_callback_and_nt() {
    let mut server = Server::new();
    let mock = server
        .mock("SUBSCRIBE", "/svc/evt")
        .match_header("NT", "upnp:event")
        .match_header("TIMEOUT", "Second-1800")
        .match_header(
            "CALLBACK",
            Matcher::Regex(r"^<http://127\.0\.0\.1:49152/>$".to_string()),
        )
        .with_status(200)
        .with_header("SID", "uuid:abcd")
        .with_header("TIMEOUT", "Second-1800")
        .create();

    let url = format!("{}/svc/evt", server.url());
    let grant = client()
        .subscribe(&url, Timeout::Seconds(1800), None)
        .unwrap();

    assert_eq!(grant.sid, "uuid:abcd");
    assert_eq!(grant.timeout, Timeout::Seconds(1800));
    mock.assert();
}

#[test]
fn renewal_sends_sid_without_callback() {
    let mut server = Server::new();
    let mock = server
        .mock("SUBSCRIBE", "/svc/evt")
        .match_header("SID", "uuid:old")
        .match_header("CALLBACK", Matcher::Missing)
        .match_header("NT", Matcher::Missing)
        .with_status(200)
        .with_header("SID", "uuid:new")
        .with_header("TIMEOUT", "Second-1800")
        .create();

    let url = format!("{}/svc/evt", server.url());
    let grant = client()
        .subscribe(&url, Timeout::Seconds(1800), Some("uuid:old"))
        .unwrap();

    assert_eq!(grant.sid, "uuid:new");
    mock.assert();
}

#[test]
fn short_timeout_is_raised_to_minimum() {
    let mut server = Server::new();
    let mock = server
        .mock("SUBSCRIBE", "/svc/evt")
        .match_header("TIMEOUT", "Second-1800")
        .with_status(200)
        .with_header("SID", "uuid:abcd")
        .with_header("TIMEOUT", "Second-1800")
        .create();

    let url = format!("{}/svc/evt", server.url());
    client().subscribe(&url, Timeout::Seconds(60), None).unwrap();
    mock.assert();
}

#[test]
fn infinite_timeout_goes_out_verbatim() {
    let mut server = Server::new();
    let mock = server
        .mock("SUBSCRIBE", "/svc/evt")
        .match_header("TIMEOUT", "Second-infinite")
        .with_status(200)
        .with_header("SID", "uuid:abcd")
        .with_header("TIMEOUT", "Second-infinite")
        .create();

    let url = format!("{}/svc/evt", server.url());
    let grant = client()
        .subscribe(&url, Timeout::from_secs(-1), None)
        .unwrap();

    assert_eq!(grant.timeout, Timeout::Infinite);
    mock.assert();
}

#[test]
fn rejection_status_maps_to_subscribe_unaccepted() {
    let mut server = Server::new();
    server
        .mock("SUBSCRIBE", "/svc/evt")
        .with_status(500)
        .create();

    let url = format!("{}/svc/evt", server.url());
    let err = client()
        .subscribe(&url, Timeout::Seconds(1800), None)
        .unwrap_err();

    assert!(matches!(err, TransportError::SubscribeUnaccepted(500)));
}

#[test]
fn missing_sid_header_is_bad_response() {
    let mut server = Server::new();
    server
        .mock("SUBSCRIBE", "/svc/evt")
        .with_status(200)
        .with_header("TIMEOUT", "Second-1800")
        .create();

    let url = format!("{}/svc/evt", server.url());
    let err = client()
        .subscribe(&url, Timeout::Seconds(1800), None)
        .unwrap_err();

    assert!(matches!(err, TransportError::BadResponse(_)));
}

#[test]
fn missing_timeout_header_is_bad_response() {
    let mut server = Server::new();
    server
        .mock("SUBSCRIBE", "/svc/evt")
        .with_status(200)
        .with_header("SID", "uuid:abcd")
        .create();

    let url = format!("{}/svc/evt", server.url());
    let err = client()
        .subscribe(&url, Timeout::Seconds(1800), None)
        .unwrap_err();

    assert!(matches!(err, TransportError::BadResponse(_)));
}

#[test]
fn unparseable_timeout_header_is_bad_response() {
    let mut server = Server::new();
    server
        .mock("SUBSCRIBE", "/svc/evt")
        .with_status(200)
        .with_header("SID", "uuid:abcd")
        .with_header("TIMEOUT", "whenever")
        .create();

    let url = format!("{}/svc/evt", server.url());
    let err = client()
        .subscribe(&url, Timeout::Seconds(1800), None)
        .unwrap_err();

    assert!(matches!(err, TransportError::BadResponse(_)));
}

#[test]
fn unsubscribe_sends_sid() {
    let mut server = Server::new();
    let mock = server
        .mock("UNSUBSCRIBE", "/svc/evt")
        .match_header("SID", "uuid:abcd")
        .with_status(200)
        .create();

    let url = format!("{}/svc/evt", server.url());
    client().unsubscribe(&url, "uuid:abcd").unwrap();
    mock.assert();
}

#[test]
fn unsubscribe_rejection_maps_to_unsubscribe_unaccepted() {
    let mut server = Server::new();
    server
        .mock("UNSUBSCRIBE", "/svc/evt")
        .with_status(412)
        .create();

    let url = format!("{}/svc/evt", server.url());
    let err = client().unsubscribe(&url, "uuid:abcd").unwrap_err();

    assert!(matches!(err, TransportError::UnsubscribeUnaccepted(412)));
}

#[test]
fn connection_refused_maps_to_socket_connect() {
    // Port 9 (discard) is almost certainly closed; ureq reports a
    // transport error rather than a status.
    let err = client()
        .subscribe("http://127.0.0.1:9/svc/evt", Timeout::Seconds(1800), None)
        .unwrap_err();

    assert!(matches!(err, TransportError::SocketConnect(_)));
}
