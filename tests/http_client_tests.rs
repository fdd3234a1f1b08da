/// HTTP data source tests.
///
/// Each test runs a throwaway `tiny_http` server on an ephemeral port that
/// answers a fixed number of requests with a canned response and reports
/// what it received.
use std::sync::mpsc::{self, Receiver};
use std::thread;
use std::time::Duration;

use loadwatch::api::{DataSource, FetchError, HttpDataSource};
use loadwatch::model::LoadStatus;
use tiny_http::{Response, Server, StatusCode};

const KEY: &str = "test_key_456";

#[derive(Debug)]
struct Seen {
    url: String,
    authorization: Option<String>,
}

fn canned(status: u16, body: &'static str) -> (HttpDataSource, Receiver<Seen>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        while let Ok(Some(request)) = server.recv_timeout(Duration::from_secs(5)) {
            let authorization = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("Authorization"))
                .map(|h| h.value.as_str().to_string());
            let _ = tx.send(Seen {
                url: request.url().to_string(),
                authorization,
            });
            let _ = request.respond(Response::from_string(body).with_status_code(StatusCode(status)));
        }
    });

    let client = HttpDataSource::new(&format!("http://{addr}/"), KEY, Duration::from_secs(2));
    (client, rx)
}

fn seen(rx: &Receiver<Seen>) -> Seen {
    rx.recv_timeout(Duration::from_secs(5)).unwrap()
}

#[test]
fn loads_request_carries_bearer_and_query() {
    let (client, rx) = canned(200, r#"{"statusCode": 200, "body": {"loads": []}}"#);
    client.fetch_loads().unwrap();

    let req = seen(&rx);
    assert!(req.url.starts_with("/api/v1/loads?"), "{}", req.url);
    assert!(req.url.contains("include_booked=true"));
    assert!(req.url.contains("t="));
    assert_eq!(req.authorization.as_deref(), Some("Bearer test_key_456"));
}

#[test]
fn metrics_request_carries_bearer() {
    let (client, rx) = canned(200, r#"{"total_calls": 12, "success_rate": 41.7}"#);
    let metrics = client.fetch_metrics().unwrap();
    assert_eq!(metrics.total_calls, 12);
    assert_eq!(metrics.success_rate, 41.7);

    let req = seen(&rx);
    assert_eq!(req.url, "/metrics");
    assert_eq!(req.authorization.as_deref(), Some("Bearer test_key_456"));
}

#[test]
fn loads_are_decoded_from_envelope() {
    let (client, _rx) = canned(
        200,
        r#"{"statusCode": 200, "body": {"loads": [
            {"load_id": "LOAD-001", "origin": "Chicago, IL", "destination": "Dallas, TX",
             "equipment_type": "Reefer", "status": "booked", "miles": 925,
             "loadboard_rate": 2450.0, "max_buy": 2570.0, "stops": []}
        ]}}"#,
    );
    let loads = client.fetch_loads().unwrap();
    assert_eq!(loads.len(), 1);
    assert_eq!(loads[0].status.as_deref(), Some("booked"));
    assert!(loads[0].extra.contains_key("stops"));
    assert_eq!(loadwatch::model::normalize(loads[0].clone()).status, LoadStatus::Booked);
}

#[test]
fn missing_loads_list_is_empty_not_error() {
    let (client, _rx) = canned(200, r#"{"statusCode": 200, "body": {}}"#);
    assert!(client.fetch_loads().unwrap().is_empty());
}

#[test]
fn server_error_is_http_status() {
    let (client, _rx) = canned(500, r#"{"detail": "boom"}"#);
    assert!(matches!(
        client.fetch_metrics(),
        Err(FetchError::HttpStatus { status: 500 })
    ));
}

#[test]
fn unauthorized_is_http_status() {
    let (client, _rx) = canned(401, r#"{"detail": "Invalid API key"}"#);
    let err = client.fetch_loads().unwrap_err();
    assert_eq!(err.kind(), "http_status");
}

#[test]
fn non_json_body_is_malformed() {
    let (client, _rx) = canned(200, "<html>gateway</html>");
    assert!(matches!(client.fetch_metrics(), Err(FetchError::Malformed(_))));
}

#[test]
fn unreachable_backend_is_transport_error() {
    let addr = {
        let server = Server::http("127.0.0.1:0").unwrap();
        server.server_addr().to_ip().unwrap()
    };
    let client = HttpDataSource::new(&format!("http://{addr}"), KEY, Duration::from_millis(500));
    assert!(matches!(client.fetch_loads(), Err(FetchError::Transport(_))));
}

#[test]
fn health_probe_is_unauthenticated() {
    let (client, rx) = canned(200, r#"{"status": "ok"}"#);
    let body = client.health().unwrap();
    assert_eq!(body["status"], "ok");

    let req = seen(&rx);
    assert_eq!(req.url, "/healthcheck");
    assert!(req.authorization.is_none());
}
