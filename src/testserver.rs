//! Loopback object-store stub for uploader tests.
//!
//! Behavior is scripted by path: keys under `hot/` answer 307 once towards
//! `landed/`, keys under `loop/` redirect forever, keys under `boom/` fail
//! with a 500, everything else is accepted.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::Router;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::put;

#[derive(Debug, Clone)]
pub struct RecordedPut {
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

#[derive(Clone, Default)]
struct StubState {
    puts: Arc<Mutex<Vec<RecordedPut>>>,
}

pub struct StubStore {
    addr: SocketAddr,
    state: StubState,
}

impl StubStore {
    pub async fn spawn() -> Self {
        let state = StubState::default();
        let app = Router::new()
            .route("/{*key}", put(handle_put))
            .with_state(state.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Self { addr, state }
    }

    pub fn endpoint(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn puts(&self) -> Vec<RecordedPut> {
        self.state.puts.lock().unwrap().clone()
    }
}

async fn handle_put(
    State(state): State<StubState>,
    Path(key): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let path = format!("/{key}");
    let recorded_headers = headers
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                value.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect();
    state.puts.lock().unwrap().push(RecordedPut {
        path: path.clone(),
        headers: recorded_headers,
        body: body.to_vec(),
    });

    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();

    if path.contains("/hot/") {
        let landed = path.replace("/hot/", "/landed/");
        return redirect(format!("http://{host}{landed}"));
    }
    if path.contains("/loop/") {
        return redirect(format!("http://{host}{path}"));
    }
    if path.contains("/boom/") {
        return (StatusCode::INTERNAL_SERVER_ERROR, "kaboom").into_response();
    }
    StatusCode::OK.into_response()
}

fn redirect(location: String) -> Response {
    (
        StatusCode::TEMPORARY_REDIRECT,
        [(header::LOCATION, location)],
    )
        .into_response()
}
