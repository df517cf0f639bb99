//! Fake Logitech Media Server for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{json, Value};

/// What the fake server does with every request.
#[derive(Clone, Copy, Debug)]
pub enum Behaviour {
    /// Answer like a server with one "Kitchen" player that is playing.
    Kitchen,
    /// Sleep before answering.
    Stall(Duration),
    /// Answer with the given status code.
    Status(StatusCode),
    /// Answer 200 with a body that is not JSON.
    Garbage,
    /// Answer 200 with a JSON-RPC error member.
    RpcError,
}

/// A request as the fake server saw it.
#[derive(Clone, Debug)]
pub struct Seen {
    pub body: Value,
    pub authorization: Option<String>,
}

#[derive(Clone)]
struct FakeState {
    behaviour: Behaviour,
    seen: Arc<Mutex<Vec<Seen>>>,
}

pub struct FakeLms {
    pub base_url: String,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl FakeLms {
    pub async fn start(behaviour: Behaviour) -> Self {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let state = FakeState {
            behaviour,
            seen: Arc::clone(&seen),
        };
        let router = Router::new()
            .route("/jsonrpc.js", post(handle))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            seen,
        }
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().clone()
    }

    /// `(player_id, command)` pairs received so far.
    pub fn commands(&self) -> Vec<(String, Value)> {
        self.seen()
            .into_iter()
            .map(|s| {
                let params = &s.body["params"];
                (
                    params[0].as_str().unwrap_or_default().to_string(),
                    params[1].clone(),
                )
            })
            .collect()
    }
}

/// Base URL of a port nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

async fn handle(State(state): State<FakeState>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    let authorization = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.seen.lock().push(Seen {
        body: body.clone(),
        authorization,
    });

    match state.behaviour {
        Behaviour::Kitchen => Json(kitchen_reply(&body)).into_response(),
        Behaviour::Stall(delay) => {
            tokio::time::sleep(delay).await;
            Json(kitchen_reply(&body)).into_response()
        }
        Behaviour::Status(code) => code.into_response(),
        Behaviour::Garbage => (StatusCode::OK, "<html>not json</html>").into_response(),
        Behaviour::RpcError => {
            Json(json!({"id": 1, "error": {"code": -32601, "message": "Method not found"}}))
                .into_response()
        }
    }
}

fn kitchen_reply(body: &Value) -> Value {
    let params = &body["params"];
    let result = match params[1][0].as_str() {
        Some("players") => json!({
            "count": 1,
            "players_loop": [{"playerid": "AA:BB", "name": "Kitchen", "connected": 1}]
        }),
        Some("status") => json!({"mode": "play", "mixer volume": "42", "player_name": "Kitchen"}),
        Some("mode") => json!({"_mode": "play"}),
        Some("mixer") => json!({"_volume": "42"}),
        _ => json!({}),
    };
    json!({
        "id": body["id"],
        "method": "slim.request",
        "params": params,
        "result": result,
    })
}
