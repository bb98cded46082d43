use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{
    extract::State,
    http::{HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::any,
    Json, Router,
};
use retry_fetch::{FailureKind, FetchError, RequestSpec, RetryPolicy, RetryingFetcher};
use serde_json::{json, Value as JsonValue};

#[derive(Clone)]
struct MockResponse {
    status: StatusCode,
    body: JsonValue,
    delay: Duration,
}

impl MockResponse {
    fn json(status: StatusCode, body: JsonValue) -> Self {
        Self {
            status,
            body,
            delay: Duration::from_millis(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

#[derive(Clone, Debug)]
struct ReceivedRequest {
    method: Method,
    authorization: Option<String>,
    content_type: Option<String>,
    body: String,
}

#[derive(Clone)]
struct MockState {
    responses: Arc<Mutex<VecDeque<MockResponse>>>,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
    hits: Arc<AtomicUsize>,
}

async fn handler(
    State(state): State<MockState>,
    method: Method,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    state.hits.fetch_add(1, Ordering::SeqCst);

    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    };
    state
        .received
        .lock()
        .expect("received log mutex must not be poisoned")
        .push(ReceivedRequest {
            method,
            authorization: header("authorization"),
            content_type: header("content-type"),
            body,
        });

    let response = {
        let mut queue = state
            .responses
            .lock()
            .expect("response queue mutex must not be poisoned");
        queue.pop_front().unwrap_or_else(|| {
            MockResponse::json(
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": "no mock response available"}),
            )
        })
    };

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }

    (response.status, Json(response.body))
}

struct TestServer {
    base_url: String,
    hits: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<ReceivedRequest>>>,
    task: tokio::task::JoinHandle<()>,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.task.abort();
    }
}

impl TestServer {
    fn status_url(&self) -> String {
        format!("{}/api/applications/42/status", self.base_url)
    }

    fn received(&self) -> Vec<ReceivedRequest> {
        self.received
            .lock()
            .expect("received log mutex must not be poisoned")
            .clone()
    }
}

async fn spawn_server(responses: Vec<MockResponse>) -> TestServer {
    let state = MockState {
        responses: Arc::new(Mutex::new(responses.into())),
        received: Arc::new(Mutex::new(Vec::new())),
        hits: Arc::new(AtomicUsize::new(0)),
    };

    let app = Router::new()
        .route("/api/applications/42/status", any(handler))
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind test listener");
    let address = listener.local_addr().expect("must have local addr");
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .await
            .expect("mock server must run");
    });

    TestServer {
        base_url: format!("http://{address}"),
        hits: state.hits,
        received: state.received,
        task,
    }
}

fn fast_policy(max_attempts: usize) -> RetryPolicy {
    RetryPolicy::new(max_attempts, 1)
}

#[tokio::test]
async fn returns_response_body_on_first_success() {
    let server = spawn_server(vec![MockResponse::json(
        StatusCode::OK,
        json!({"status": "under_review"}),
    )])
    .await;
    let fetcher = RetryingFetcher::new().with_policy(fast_policy(3));

    let response = fetcher
        .execute(&RequestSpec::get(server.status_url()))
        .await
        .expect("request must succeed");

    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: JsonValue = response.json().await.expect("body must be json");
    assert_eq!(body["status"], "under_review");
    assert_eq!(server.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn unsuccessful_status_is_not_retried() {
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::SERVICE_UNAVAILABLE, json!({"error": "busy"})),
        MockResponse::json(StatusCode::OK, json!({})),
    ])
    .await;
    let fetcher = RetryingFetcher::new().with_policy(fast_policy(3));

    let response = fetcher
        .execute(&RequestSpec::get(server.status_url()))
        .await
        .expect("a 503 response is still a response");

    assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(server.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn retries_after_attempt_timeout() {
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::OK, json!({"attempt": 1}))
            .with_delay(Duration::from_millis(300)),
        MockResponse::json(StatusCode::OK, json!({"attempt": 2})),
    ])
    .await;
    let fetcher = RetryingFetcher::new().with_policy(fast_policy(2));

    let response = fetcher
        .execute(&RequestSpec::get(server.status_url()).timeout_ms(50))
        .await
        .expect("second attempt must succeed");

    let body: JsonValue = response.json().await.expect("body must be json");
    assert_eq!(body["attempt"], 2);
    assert_eq!(server.hits.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn request_timeout_surfaces_after_exhaustion() {
    let server = spawn_server(vec![MockResponse::json(StatusCode::OK, json!({}))
        .with_delay(Duration::from_millis(200))])
    .await;
    let fetcher = RetryingFetcher::new().with_policy(fast_policy(1));

    let err = fetcher
        .execute(&RequestSpec::get(server.status_url()).timeout_ms(20))
        .await
        .expect_err("request must time out");

    assert!(err.is_timeout());
    assert!(matches!(err, FetchError::RetryExhausted { attempts: 1, .. }));
}

#[tokio::test]
async fn connection_refused_exhausts_attempts_as_network_failure() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("must bind test listener");
    let address = listener.local_addr().expect("must have local addr");
    drop(listener);

    let fetcher = RetryingFetcher::new().with_policy(fast_policy(3));
    let err = fetcher
        .execute(&RequestSpec::get(format!("http://{address}/api/status")).timeout_ms(2_000))
        .await
        .expect_err("nothing is listening");

    match err {
        FetchError::RetryExhausted { attempts, last } => {
            assert_eq!(attempts, 3);
            assert_eq!(last.kind, FailureKind::Network);
        }
        other => panic!("expected exhausted retries, got {other:?}"),
    }
}

#[tokio::test]
async fn every_attempt_resends_method_headers_and_body() {
    let server = spawn_server(vec![
        MockResponse::json(StatusCode::OK, json!({})).with_delay(Duration::from_millis(300)),
        MockResponse::json(StatusCode::CREATED, json!({"id": 7})),
    ])
    .await;
    let fetcher = RetryingFetcher::new().with_policy(fast_policy(2));

    let request = RequestSpec::post(server.status_url())
        .bearer_auth("session-token")
        .json(&json!({"program": "nursing", "term": "fall"}))
        .timeout_ms(50);
    let response = fetcher.execute(&request).await.expect("retry must succeed");

    assert_eq!(response.status(), reqwest::StatusCode::CREATED);
    let received = server.received();
    assert_eq!(received.len(), 2);
    for seen in received {
        assert_eq!(seen.method, Method::POST);
        assert_eq!(seen.authorization.as_deref(), Some("Bearer session-token"));
        assert_eq!(seen.content_type.as_deref(), Some("application/json"));
        let body: JsonValue = serde_json::from_str(&seen.body).expect("body must be json");
        assert_eq!(body["program"], "nursing");
    }
}

#[tokio::test]
async fn non_http_url_is_rejected_without_retrying() {
    let fetcher = RetryingFetcher::new().with_policy(RetryPolicy::new(3, 200));
    let started = std::time::Instant::now();

    let err = fetcher
        .execute(&RequestSpec::get("ftp://admissions.example/status"))
        .await
        .expect_err("ftp url must be rejected");

    assert!(matches!(err, FetchError::InvalidRequest(_)));
    assert!(started.elapsed() < Duration::from_millis(200));
}
