// crates/tile-migrate-http/tests/common/mod.rs
// =============================================================================
// Module: HTTP Registry Test Helpers
// Description: In-process mock registry server built on tiny_http.
// Purpose: Exercise the HTTP adapter against scripted registry behavior.
// =============================================================================

#![allow(dead_code, reason = "Test helpers are selectively used across suites.")]

use std::collections::BTreeMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::thread;

use serde_json::Value;
use serde_json::json;
use tile_migrate_core::AccountId;
use tile_migrate_core::Record;
use tile_migrate_core::TileId;
use tiny_http::Method;
use tiny_http::Request;
use tiny_http::Response;
use tiny_http::Server;

/// Builds a record with deterministic fields derived from `id`.
pub fn record(id: u64, owner: &str) -> Record {
    Record {
        id: TileId::new(id),
        owner: AccountId::new(owner),
        metadata_ref: format!("ar://tile-{id}"),
        payment_flag: true,
        created_at: 1_650_000_000 + id,
        original_buyer: AccountId::new(owner),
    }
}

/// Mutable state behind the mock registry.
#[derive(Default)]
struct MockState {
    /// Stored records keyed by id.
    records: BTreeMap<u64, Record>,
    /// Finalize flag.
    finalized: bool,
    /// Status codes returned, in order, before normal routing resumes.
    scripted: VecDeque<u16>,
    /// Required bearer token, if any.
    token: Option<String>,
    /// `METHOD path` for every request received.
    requests: Vec<String>,
}

/// Mock registry server running on a background thread.
pub struct MockRegistry {
    /// Base URL of the server.
    url: String,
    /// Shared server handle used for shutdown.
    server: Arc<Server>,
    /// Shared registry state.
    state: Arc<Mutex<MockState>>,
    /// Serving thread.
    handle: Option<thread::JoinHandle<()>>,
}

impl MockRegistry {
    /// Starts a mock registry holding `records`.
    pub fn start(records: Vec<Record>) -> Self {
        let server = Arc::new(Server::http("127.0.0.1:0").unwrap());
        let addr = server.server_addr().to_ip().unwrap();
        let state = Arc::new(Mutex::new(MockState {
            records: records.into_iter().map(|record| (record.id.get(), record)).collect(),
            ..MockState::default()
        }));
        let handle = {
            let server = Arc::clone(&server);
            let state = Arc::clone(&state);
            thread::spawn(move || {
                while let Ok(request) = server.recv() {
                    handle_request(&state, request);
                }
            })
        };
        Self {
            url: format!("http://{addr}"),
            server,
            state,
            handle: Some(handle),
        }
    }

    /// Returns the base URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Queues status codes returned before normal routing.
    pub fn script(&self, statuses: &[u16]) {
        self.state.lock().unwrap().scripted.extend(statuses.iter().copied());
    }

    /// Sets the finalize flag.
    pub fn set_finalized(&self, finalized: bool) {
        self.state.lock().unwrap().finalized = finalized;
    }

    /// Requires a bearer token on every request.
    pub fn require_token(&self, token: &str) {
        self.state.lock().unwrap().token = Some(token.to_string());
    }

    /// Returns every request line received.
    pub fn requests(&self) -> Vec<String> {
        self.state.lock().unwrap().requests.clone()
    }

    /// Returns the stored ids.
    pub fn ids(&self) -> Vec<u64> {
        self.state.lock().unwrap().records.keys().copied().collect()
    }
}

impl Drop for MockRegistry {
    fn drop(&mut self) {
        self.server.unblock();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Routes one request against the mock state.
fn handle_request(state: &Arc<Mutex<MockState>>, mut request: Request) {
    let mut body = String::new();
    let _ = request.as_reader().read_to_string(&mut body);
    let method = request.method().clone();
    let path = request.url().to_string();
    let authorization = request
        .headers()
        .iter()
        .find(|header| header.field.equiv("Authorization"))
        .map(|header| header.value.as_str().to_string());

    let (status, payload) = {
        let mut state = state.lock().unwrap();
        state.requests.push(format!("{method} {path}"));
        if let Some(status) = state.scripted.pop_front() {
            (status, json!({"error": "scripted"}))
        } else if let Some(token) = &state.token
            && authorization.as_deref() != Some(format!("Bearer {token}").as_str())
        {
            (401, json!({"error": "unauthorized"}))
        } else {
            route(&mut state, &method, &path, &body)
        }
    };
    let response = Response::from_string(payload.to_string()).with_status_code(status);
    let _ = request.respond(response);
}

/// Handles a routed request.
fn route(state: &mut MockState, method: &Method, path: &str, body: &str) -> (u16, Value) {
    match (method, path) {
        (Method::Get, "/records/ids") => {
            (200, json!({"ids": state.records.keys().collect::<Vec<_>>()}))
        }
        (Method::Get, "/registry/status") => (
            200,
            json!({"finalized": state.finalized, "total_count": state.records.len()}),
        ),
        (Method::Post, "/records/batch") => {
            if state.finalized {
                return (409, json!({"error": "finalized"}));
            }
            let Ok(parsed) = serde_json::from_str::<Value>(body) else {
                return (400, json!({"error": "bad json"}));
            };
            let Ok(records) = serde_json::from_value::<Vec<Record>>(parsed["records"].clone())
            else {
                return (400, json!({"error": "bad records"}));
            };
            if records.iter().any(|record| state.records.contains_key(&record.id.get())) {
                return (400, json!({"error": "duplicate"}));
            }
            for record in records {
                state.records.insert(record.id.get(), record);
            }
            (200, json!({}))
        }
        (Method::Get, other) => {
            let Some(raw) = other.strip_prefix("/records/") else {
                return (404, json!({"error": "no route"}));
            };
            match raw.parse::<u64>().ok().and_then(|id| state.records.get(&id)) {
                Some(record) => (200, serde_json::to_value(record).unwrap()),
                None => (404, json!({"error": "not found"})),
            }
        }
        _ => (404, json!({"error": "no route"})),
    }
}
