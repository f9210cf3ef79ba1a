//! Mock Secret Manager REST service for E2E tests
//!
//! Serves `GET /v1/projects/P/secrets/S/versions/latest:access` from memory,
//! checks the bearer token, and records every request. Unknown secrets get
//! the same JSON error body the real API returns.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use base64::Engine;
use bytes::Bytes;
use dashmap::DashMap;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use parking_lot::RwLock;
use tokio::net::TcpListener;

/// A recorded HTTP request for test assertions
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    /// HTTP method (GET, POST, etc.)
    pub method: String,
    /// Request URI path
    pub uri: String,
    /// Authorization header, if any
    pub authorization: Option<String>,
}

#[derive(Default)]
struct State {
    /// Payloads by secret resource name (`projects/P/secrets/S`)
    secrets: DashMap<String, Vec<u8>>,
    /// Recorded requests
    requests: RwLock<Vec<RecordedRequest>>,
    /// Status forced onto every response
    forced_status: RwLock<Option<StatusCode>>,
}

/// A mock Secret Manager service for testing
pub struct MockSecretManager {
    addr: SocketAddr,
    token: String,
    state: Arc<State>,
}

impl MockSecretManager {
    /// Start a mock service on an ephemeral port, accepting `token` as bearer
    pub async fn start(token: impl Into<String>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock Secret Manager");
        let addr = listener.local_addr().unwrap();

        let token = token.into();
        let state = Arc::new(State::default());

        let state_clone = state.clone();
        let expected_auth = format!("Bearer {}", token);

        tokio::spawn(async move {
            loop {
                let (stream, _) = match listener.accept().await {
                    Ok(conn) => conn,
                    Err(_) => break,
                };

                let state = state_clone.clone();
                let expected_auth = expected_auth.clone();

                tokio::spawn(async move {
                    let service = service_fn(move |req: Request<Incoming>| {
                        let state = state.clone();
                        let expected_auth = expected_auth.clone();
                        async move {
                            Ok::<_, Infallible>(handle(&state, &expected_auth, req))
                        }
                    });

                    let _ = http1::Builder::new()
                        .serve_connection(TokioIo::new(stream), service)
                        .await;
                });
            }
        });

        Self { addr, token, state }
    }

    /// Base URL to pass as the client endpoint (e.g., "http://127.0.0.1:12345")
    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Bearer token this service accepts
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Store a payload as the latest version of a secret
    pub fn insert(&self, project: &str, secret: &str, payload: impl Into<Vec<u8>>) {
        self.state.secrets.insert(
            format!("projects/{}/secrets/{}", project, secret),
            payload.into(),
        );
    }

    /// Force every response to the given status (None to restore normal behavior)
    pub fn set_forced_status(&self, status: Option<StatusCode>) {
        *self.state.forced_status.write() = status;
    }

    /// Get all recorded requests
    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.read().clone()
    }
}

fn handle(state: &State, expected_auth: &str, req: Request<Incoming>) -> Response<Full<Bytes>> {
    let authorization = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    state.requests.write().push(RecordedRequest {
        method: req.method().to_string(),
        uri: req.uri().to_string(),
        authorization: authorization.clone(),
    });

    if let Some(status) = *state.forced_status.read() {
        return error_response(status, "forced failure");
    }

    if authorization.as_deref() != Some(expected_auth) {
        return error_response(StatusCode::UNAUTHORIZED, "Request had invalid authentication credentials.");
    }

    let path = req.uri().path();
    let Some(resource) = path
        .strip_prefix("/v1/")
        .and_then(|p| p.strip_suffix(":access"))
    else {
        return error_response(StatusCode::NOT_FOUND, "unknown method");
    };

    let Some((secret, version)) = resource.split_once("/versions/") else {
        return error_response(StatusCode::BAD_REQUEST, "malformed resource name");
    };

    if version != "latest" {
        return error_response(StatusCode::NOT_FOUND, "only latest versions are stored");
    }

    match state.secrets.get(secret) {
        Some(payload) => {
            let body = serde_json::json!({
                "name": resource,
                "payload": {
                    "data": base64::engine::general_purpose::STANDARD.encode(payload.value()),
                }
            });
            json_response(StatusCode::OK, &body)
        }
        None => error_response(
            StatusCode::NOT_FOUND,
            &format!("Secret [{}] not found or has no versions.", secret),
        ),
    }
}

fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let body = serde_json::json!({
        "error": {
            "code": status.as_u16(),
            "message": message,
            "status": status.canonical_reason().unwrap_or("UNKNOWN").to_uppercase().replace(' ', "_"),
        }
    });
    json_response(status, &body)
}

fn json_response(status: StatusCode, body: &serde_json::Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(hyper::header::CONTENT_TYPE, "application/json")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}
