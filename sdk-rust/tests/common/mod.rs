#![allow(dead_code)]

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Map, Value};
use std::{
    collections::{HashMap, VecDeque},
    error::Error,
    sync::{Arc, Mutex},
    time::Duration,
};
use synapse_sdk::{ApiClient, ClientConfig, Endpoint};
use tokio::{net::TcpListener, sync::oneshot};

pub type BoxedError = Box<dyn Error + Send + Sync>;

/// A scripted reply for one request.
#[derive(Debug, Clone)]
pub struct StubResponse {
    pub status: u16,
    pub body: Option<Value>,
    pub delay: Duration,
}

impl StubResponse {
    pub fn ok(body: Value) -> Self {
        Self {
            status: 200,
            body: Some(body),
            delay: Duration::ZERO,
        }
    }

    pub fn empty() -> Self {
        Self {
            status: 200,
            body: None,
            delay: Duration::ZERO,
        }
    }

    pub fn error(status: u16, body: Value) -> Self {
        Self {
            status,
            body: Some(body),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// One request received by the stub, with its body flattened to JSON.
/// Multipart text fields become strings, file fields become
/// `{ "filename", "contentType", "content" }`.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub path: String,
    pub body: Value,
}

#[derive(Default)]
struct SharedState {
    scripted: Mutex<HashMap<String, VecDeque<StubResponse>>>,
    requests: Mutex<Vec<RecordedRequest>>,
    events: Mutex<Vec<String>>,
}

impl SharedState {
    fn next_response(&self, path: &str) -> StubResponse {
        self.scripted
            .lock()
            .unwrap()
            .get_mut(path)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| {
                StubResponse::error(500, json!({ "detail": format!("no scripted response for {path}") }))
            })
    }

    fn record(&self, path: &str, body: Value) {
        self.requests.lock().unwrap().push(RecordedRequest {
            path: path.to_string(),
            body,
        });
    }

    fn event(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

pub struct StubBackend {
    url: String,
    state: Arc<SharedState>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

impl StubBackend {
    pub async fn start() -> Result<Self, BoxedError> {
        let state = Arc::new(SharedState::default());
        let app = Router::new()
            .route("/", get(health))
            .route("/api/query", post(json_endpoint))
            .route("/api/sync/github", post(json_endpoint))
            .route("/api/upload", post(multipart_endpoint))
            .route("/api/sync/slack", post(multipart_endpoint))
            .route("/api/sync/cancel", post(empty_endpoint))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let url = format!("http://{addr}");

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(err) = server.await {
                eprintln!("stub backend error: {err}");
            }
        });

        Ok(Self {
            url,
            state,
            shutdown: Some(shutdown_tx),
            handle,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// A client pointed at this stub with no cosmetic delays.
    pub fn client(&self) -> ApiClient {
        ApiClient::new(self.config())
    }

    pub fn config(&self) -> ClientConfig {
        ClientConfig::default()
            .with_base_url(self.url.clone())
            .expect("stub url is valid")
            .with_progress_reset_delay(Duration::ZERO)
            .with_upload_pacing(Duration::ZERO)
    }

    pub fn enqueue(&self, endpoint: Endpoint, response: StubResponse) -> &Self {
        self.state
            .scripted
            .lock()
            .unwrap()
            .entry(endpoint.path().to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    pub fn requests_to(&self, endpoint: Endpoint) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|request| request.path == endpoint.path())
            .collect()
    }

    /// `start:<path>` / `end:<path>` markers, in the order the stub saw them.
    pub fn events(&self) -> Vec<String> {
        self.state.events.lock().unwrap().clone()
    }

    pub async fn stop(mut self) -> Result<(), BoxedError> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        self.handle.await?;
        Ok(())
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "message": "Synapse API is running", "status": "healthy" }))
}

async fn json_endpoint(
    State(state): State<Arc<SharedState>>,
    uri: axum::http::Uri,
    Json(body): Json<Value>,
) -> Response {
    respond(&state, uri.path(), body).await
}

async fn multipart_endpoint(
    State(state): State<Arc<SharedState>>,
    uri: axum::http::Uri,
    mut multipart: Multipart,
) -> Response {
    let mut fields = Map::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        let name = field.name().unwrap_or_default().to_string();
        let filename = field.file_name().map(ToString::to_string);
        let content_type = field.content_type().map(ToString::to_string);
        let text = field.text().await.unwrap_or_default();
        let value = match filename {
            Some(filename) => json!({
                "filename": filename,
                "contentType": content_type,
                "content": text,
            }),
            None => Value::String(text),
        };
        fields.insert(name, value);
    }
    respond(&state, uri.path(), Value::Object(fields)).await
}

async fn empty_endpoint(State(state): State<Arc<SharedState>>, uri: axum::http::Uri) -> Response {
    respond(&state, uri.path(), Value::Null).await
}

async fn respond(state: &SharedState, path: &str, body: Value) -> Response {
    let label = body
        .get("file")
        .and_then(|file| file.get("filename"))
        .and_then(Value::as_str)
        .map_or_else(|| path.to_string(), ToString::to_string);

    state.record(path, body);
    state.event(format!("start:{label}"));
    let scripted = state.next_response(path);
    if !scripted.delay.is_zero() {
        tokio::time::sleep(scripted.delay).await;
    }
    state.event(format!("end:{label}"));

    let status = StatusCode::from_u16(scripted.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    match scripted.body {
        Some(body) => (status, Json(body)).into_response(),
        None => status.into_response(),
    }
}
