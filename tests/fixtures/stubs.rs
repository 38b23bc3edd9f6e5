//! Stand-ins for the routing provider and the congestion model.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderMap, Method, StatusCode, Uri, header};
use axum::response::IntoResponse;
use chrono::NaiveDateTime;
use traffic_route::congestion::BoundingBox;
use traffic_route::error::ProviderError;
use traffic_route::traits::{CongestionModel, ProviderRoute, RouteProvider, RouteRequest};
use traffic_route::{CongestionLevel, Coordinate};

/// Always answers with an HTTP status error.
pub struct FailingProvider {
    pub status: u16,
}

impl RouteProvider for FailingProvider {
    fn routes_for(&self, _: &RouteRequest) -> Result<Vec<ProviderRoute>, ProviderError> {
        Err(ProviderError::Status(self.status))
    }
}

/// Answers every request with the same routes, after an optional delay.
#[derive(Default)]
pub struct StaticProvider {
    routes: Vec<ProviderRoute>,
    delay: Duration,
    calls: Arc<AtomicUsize>,
}

impl StaticProvider {
    pub fn new(routes: Vec<ProviderRoute>) -> Self {
        Self {
            routes,
            ..Self::default()
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Shared counter of calls made so far.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl RouteProvider for StaticProvider {
    fn routes_for(&self, _: &RouteRequest) -> Result<Vec<ProviderRoute>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        if self.routes.is_empty() {
            return Err(ProviderError::EmptyRoutes);
        }
        Ok(self.routes.clone())
    }
}

/// Builds a provider route from decoded coordinates.
pub fn provider_route(geometry: &str, distance_m: f64, duration_secs: f64) -> ProviderRoute {
    ProviderRoute {
        geometry: geometry.to_string(),
        distance_m: Some(distance_m),
        duration_secs: Some(duration_secs),
    }
}

/// Heavy traffic inside a box, free-flowing everywhere else.
pub struct ZoneModel {
    pub heavy: BoundingBox,
}

impl CongestionModel for ZoneModel {
    fn estimate(&self, coord: Coordinate, _: NaiveDateTime, _: f64) -> CongestionLevel {
        if self.heavy.contains(coord) {
            CongestionLevel::Heavy
        } else {
            CongestionLevel::Free
        }
    }
}

/// The same level everywhere.
pub struct FixedModel(pub CongestionLevel);

impl CongestionModel for FixedModel {
    fn estimate(&self, _: Coordinate, _: NaiveDateTime, _: f64) -> CongestionLevel {
        self.0
    }
}

/// A request captured by [`StubServer`].
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub request_line: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

struct StubState {
    status: StatusCode,
    body: String,
    requests: Mutex<Vec<CapturedRequest>>,
}

/// Local axum server answering every request with a fixed JSON response.
pub struct StubServer {
    pub base_url: String,
    state: Arc<StubState>,
}

impl StubServer {
    pub fn start(status: u16, body: impl Into<String>) -> Self {
        let state = Arc::new(StubState {
            status: StatusCode::from_u16(status).expect("valid status code"),
            body: body.into(),
            requests: Mutex::new(Vec::new()),
        });

        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind stub server");
        listener.set_nonblocking(true).expect("nonblocking listener");
        let addr = listener.local_addr().expect("stub server address");

        let app = Router::new().fallback(answer).with_state(Arc::clone(&state));
        thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
                .expect("stub server runtime");
            runtime.block_on(async move {
                let listener = tokio::net::TcpListener::from_std(listener).expect("tokio listener");
                axum::serve(listener, app).await.expect("stub server");
            });
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.state.requests.lock().unwrap().clone()
    }
}

async fn answer(
    State(state): State<Arc<StubState>>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    // Recorded before answering so the client never observes a gap.
    state.requests.lock().unwrap().push(CapturedRequest {
        request_line: format!("{method} {uri}"),
        headers: headers
            .iter()
            .map(|(key, value)| {
                (
                    key.as_str().to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect(),
        body,
    });

    (
        state.status,
        [(header::CONTENT_TYPE, "application/json")],
        state.body.clone(),
    )
}
