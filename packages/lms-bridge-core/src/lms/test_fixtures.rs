//! Shared test fixtures: canned LMS payloads and a scriptable mock server.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;

use super::rpc::{LmsRpc, RpcError, RpcResponse, RpcResult};

/// `players 0 50` reply with two usable players and one nameless entry.
pub const PLAYERS_TWO: &str = r#"{
  "id": 1,
  "method": "slim.request",
  "result": {
    "count": 3,
    "players_loop": [
      {"playerid": "AA:BB:CC:DD:EE:01", "name": "Kitchen", "model": "squeezelite"},
      {"playerid": "aa:bb:cc:dd:ee:02", "name": "Living Room", "model": "baby"},
      {"playerid": "aa:bb:cc:dd:ee:03"}
    ]
  }
}"#;

/// `players 0 50` reply with the single "Kitchen" player.
pub const PLAYERS_KITCHEN: &str =
    r#"{"result":{"count":1,"players_loop":[{"playerid":"AA:BB","name":"Kitchen"}]}}"#;

/// `status - 1` reply for a playing player with a string volume.
pub const STATUS_PLAYING: &str = r#"{"result":{"mode":"play","mixer volume":"42"}}"#;

/// `status - 1` reply for a paused player.
pub const STATUS_PAUSED: &str = r#"{"result":{"mode":"pause","mixer volume":10}}"#;

/// Parses a fixture into a response, panicking on invalid fixtures.
pub fn response(raw: &str) -> RpcResponse {
    let body: Value = serde_json::from_str(raw).expect("fixture must be valid JSON");
    RpcResponse::from_body(body).expect("fixture must be a response object")
}

type Handler = dyn Fn(&str, &[Value]) -> RpcResult<RpcResponse> + Send + Sync;

/// Mock LMS that answers from a closure and records every call.
pub struct MockLms {
    handler: Box<Handler>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MockLms {
    pub fn new(
        handler: impl Fn(&str, &[Value]) -> RpcResult<RpcResponse> + Send + Sync + 'static,
    ) -> Self {
        Self {
            handler: Box::new(handler),
            delays: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// A server that answers `players` with `players` and `status` with
    /// `status` for every player.
    pub fn serving(players: &'static str, status: &'static str) -> Self {
        Self::new(move |player_id, command| match command.first().and_then(Value::as_str) {
            Some("players") if player_id.is_empty() => Ok(response(players)),
            Some("status") => Ok(response(status)),
            _ => Ok(response(r#"{"result":{}}"#)),
        })
    }

    /// A server where every call times out.
    pub fn timing_out() -> Self {
        Self::new(|_, _| Err(RpcError::Timeout(Duration::from_secs(5))))
    }

    /// Makes every call for `player_id` take `delay` before answering.
    pub fn with_delay(mut self, player_id: &str, delay: Duration) -> Self {
        self.delays.insert(player_id.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().clone()
    }

    /// Number of calls whose command starts with `verb`, for `player_id`.
    pub fn count(&self, player_id: &str, verb: &str) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|(p, c)| p == player_id && c.first().and_then(Value::as_str) == Some(verb))
            .count()
    }

    /// Highest number of calls that were awaiting a reply at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LmsRpc for MockLms {
    async fn invoke(&self, player_id: &str, command: &[Value]) -> RpcResult<RpcResponse> {
        self.calls
            .lock()
            .push((player_id.to_string(), command.to_vec()));
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(delay) = self.delays.get(player_id) {
            tokio::time::sleep(*delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        (self.handler)(player_id, command)
    }
}
