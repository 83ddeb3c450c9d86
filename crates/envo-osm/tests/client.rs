//! Overpass client retries against a local scripted HTTP server.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use envo_model::GeoPoint;
use envo_osm::{FeatureSource, FeatureTaxonomy, OsmError, OverpassClient, OverpassConfig};

/// Answers one connection per scripted `(status, body)` pair, in order.
struct ScriptedServer {
    endpoint: String,
    requests: Arc<AtomicUsize>,
}

impl ScriptedServer {
    fn start(responses: Vec<(u16, &'static str)>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let endpoint = format!("http://{}/api/interpreter", listener.local_addr().unwrap());
        let requests = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&requests);
        thread::spawn(move || {
            for (status, body) in responses {
                let Ok((stream, _)) = listener.accept() else {
                    return;
                };
                let mut reader = BufReader::new(stream);
                let mut content_length = 0;
                loop {
                    let mut line = String::new();
                    if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                        break;
                    }
                    if let Some((name, value)) = line.split_once(':')
                        && name.eq_ignore_ascii_case("content-length")
                    {
                        content_length = value.trim().parse().unwrap_or(0);
                    }
                }
                let mut request_body = vec![0; content_length];
                let _ = reader.read_exact(&mut request_body);
                counter.fetch_add(1, Ordering::SeqCst);

                let response = format!(
                    "HTTP/1.1 {status} Scripted\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let mut stream = reader.into_inner();
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.flush();
            }
        });

        Self { endpoint, requests }
    }

    fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    fn client(&self, attempts: u32) -> OverpassClient {
        let config = OverpassConfig::default()
            .with_endpoint(&self.endpoint)
            .with_timeout(Duration::from_secs(5))
            .with_max_retries(attempts)
            .with_retry_delay(Duration::from_millis(10));
        OverpassClient::new(config, FeatureTaxonomy::from_pairs([("natural", "water")])).unwrap()
    }
}

const POND: &str = r#"{"elements": [{"type": "node", "id": 5, "lat": 0.001, "lon": 0.0,
    "tags": {"natural": "water", "name": "Pond"}}]}"#;

#[tokio::test]
async fn failed_attempt_is_retried_until_success() {
    let server = ScriptedServer::start(vec![(503, "busy"), (200, POND)]);
    let features = server
        .client(3)
        .query_features(GeoPoint::new(0.0, 0.0), 500.0)
        .await
        .unwrap();

    assert_eq!(server.requests(), 2);
    assert_eq!(features.len(), 1);
    assert_eq!(features[0].feature_type, "natural:water");
}

#[tokio::test]
async fn last_error_is_returned_when_attempts_run_out() {
    let server = ScriptedServer::start(vec![(503, "busy"), (504, "gateway timeout")]);
    let result = server
        .client(2)
        .query_features(GeoPoint::new(0.0, 0.0), 500.0)
        .await;

    assert_eq!(server.requests(), 2);
    match result {
        Err(OsmError::Status { status, body }) => {
            assert_eq!(status, 504);
            assert_eq!(body, "gateway timeout");
        }
        other => panic!("expected the second status error, got {other:?}"),
    }
}

#[tokio::test]
async fn single_attempt_does_not_retry() {
    let server = ScriptedServer::start(vec![(502, "bad gateway"), (200, POND)]);
    let result = server
        .client(1)
        .query_features(GeoPoint::new(0.0, 0.0), 500.0)
        .await;

    assert!(matches!(result, Err(OsmError::Status { status: 502, .. })));
    assert_eq!(server.requests(), 1);
}
