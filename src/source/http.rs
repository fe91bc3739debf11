//! HTTP event source.
//!
//! A local stand-in for a remote stream store, served with axum. Clients
//! append entries with `POST /<stream_path>`, and each append is delivered
//! to the subscribed spawner as a child-added notification.
//!
//! | Method | Path | Effect |
//! |--------|------|--------|
//! | `POST` | `/<stream_path>` | append an entry, `201 {"name": key}` |
//! | `GET` | `/<stream_path>` | all entries as `{key: value}` |
//! | `DELETE` | `/<stream_path>` | remove every entry |
//! | `GET` | `/status` | latest spawner snapshot |

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use serde_json::{Map, Value, json};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::{
    DEFAULT_CHANNEL_CAPACITY, EventSource, Result, SourceType, StreamEvent, Subscription,
};
use crate::config::schema::SourceSettings;
use crate::error::SourceError;
use crate::spawner::SpawnerSnapshot;

/// Route serving the spawner snapshot.
pub const STATUS_ROUTE: &str = "/status";

/// Configuration for the HTTP source.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Address to bind to, e.g. `"127.0.0.1:8080"`.
    pub bind_addr: String,
    /// Route of the stream, e.g. `"/jiggle/stream"`.
    pub route: String,
    /// Maximum allowed request body size in bytes.
    pub max_message_size: usize,
}

impl HttpConfig {
    /// Builds the config for `bind_addr` from the source settings.
    #[must_use]
    pub fn new(bind_addr: impl Into<String>, settings: &SourceSettings) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            route: settings.route(),
            max_message_size: settings.max_message_size,
        }
    }
}

/// Entries and subscriber shared between the handlers and the source.
#[derive(Debug, Default)]
struct Store {
    entries: Map<String, Value>,
    next_key: u64,
    subscriber: Option<mpsc::Sender<StreamEvent>>,
    status: Option<Value>,
}

#[derive(Debug)]
struct HttpSharedState {
    store: Mutex<Store>,
    max_message_size: usize,
}

impl HttpSharedState {
    fn new(max_message_size: usize) -> Self {
        Self {
            store: Mutex::new(Store::default()),
            max_message_size,
        }
    }

    fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Stream store served over HTTP.
///
/// The listener is bound on [`subscribe`](EventSource::subscribe), so a bad
/// address surfaces as a subscribe failure and the spawner stays idle.
pub struct HttpSource {
    config: HttpConfig,
    shared: Arc<HttpSharedState>,
    bound_addr: Mutex<Option<SocketAddr>>,
}

impl HttpSource {
    #[must_use]
    pub fn new(config: HttpConfig) -> Self {
        let shared = Arc::new(HttpSharedState::new(config.max_message_size));
        Self {
            config,
            shared,
            bound_addr: Mutex::new(None),
        }
    }

    /// Address the listener is bound to, once subscribed.
    #[must_use]
    pub fn bound_addr(&self) -> Option<SocketAddr> {
        *self.bound_addr.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of entries currently in the stream.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.shared.store().entries.len()
    }
}

impl std::fmt::Debug for HttpSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSource")
            .field("config", &self.config)
            .field("bound_addr", &self.bound_addr())
            .finish_non_exhaustive()
    }
}

#[async_trait::async_trait]
impl EventSource for HttpSource {
    async fn subscribe(&self, cancel: CancellationToken) -> Result<Subscription> {
        let (tx, rx) = mpsc::channel(DEFAULT_CHANNEL_CAPACITY);
        {
            let mut store = self.shared.store();
            if store.subscriber.is_some() {
                return Err(SourceError::SubscribeFailed(
                    "stream already subscribed".to_string(),
                ));
            }
            store.subscriber = Some(tx);
        }

        let listener = match TcpListener::bind(&self.config.bind_addr).await {
            Ok(listener) => listener,
            Err(e) => {
                self.shared.store().subscriber = None;
                return Err(SourceError::SubscribeFailed(format!(
                    "bind {} failed: {e}",
                    self.config.bind_addr
                )));
            }
        };
        let bound_addr = listener
            .local_addr()
            .map_err(|e| SourceError::SubscribeFailed(format!("local_addr failed: {e}")))?;
        *self
            .bound_addr
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(bound_addr);

        let router = build_router(Arc::clone(&self.shared), &self.config.route);
        let token = cancel.child_token();
        let server_token = token.clone();
        let route = self.config.route.clone();
        tokio::spawn(async move {
            info!(%bound_addr, %route, "HTTP source listening");
            axum::serve(listener, router)
                .with_graceful_shutdown(async move {
                    server_token.cancelled().await;
                })
                .await
                .ok();
            debug!("HTTP source shut down");
        });

        Ok(Subscription::new(rx, token))
    }

    async fn clear(&self) -> Result<()> {
        let removed = {
            let mut store = self.shared.store();
            let removed = store.entries.len();
            store.entries.clear();
            removed
        };
        debug!(removed, "stream cleared");
        Ok(())
    }

    fn source_type(&self) -> SourceType {
        SourceType::Http
    }

    fn publish_status(&self, snapshot: &SpawnerSnapshot) {
        if let Ok(value) = serde_json::to_value(snapshot) {
            self.shared.store().status = Some(value);
        }
    }

    async fn close(&self) -> Result<()> {
        self.shared.store().subscriber = None;
        Ok(())
    }
}

// ============================================================================
// Axum Router
// ============================================================================

/// Builds the router for the stream route and the status route.
fn build_router(shared: Arc<HttpSharedState>, route: &str) -> Router {
    let body_limit = axum::extract::DefaultBodyLimit::max(shared.max_message_size);

    Router::new()
        .route(
            route,
            get(handle_list).post(handle_append).delete(handle_delete),
        )
        .route(STATUS_ROUTE, get(handle_status))
        .layer(body_limit)
        .with_state(shared)
}

/// `POST /<stream_path>`: append one entry and notify the subscriber.
///
/// The body is read as JSON; anything else is stored as a string.
async fn handle_append(
    State(shared): State<Arc<HttpSharedState>>,
    body: axum::body::Bytes,
) -> Response {
    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, "empty request body").into_response();
    }
    if body.len() > shared.max_message_size {
        let err = SourceError::MessageTooLarge {
            size: body.len(),
            limit: shared.max_message_size,
        };
        debug!(error = %err, "rejecting append");
        return (StatusCode::PAYLOAD_TOO_LARGE, err.to_string()).into_response();
    }

    let value = serde_json::from_slice(&body)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).trim().to_string()));

    let (key, subscriber) = {
        let mut store = shared.store();
        store.next_key += 1;
        let key = format!("{:012}", store.next_key);
        store.entries.insert(key.clone(), value.clone());
        (key, store.subscriber.clone())
    };

    if let Some(tx) = subscriber {
        if tx.send(StreamEvent::keyed(key.clone(), value)).await.is_err() {
            debug!(%key, "no subscriber for appended entry");
        }
    }

    (StatusCode::CREATED, axum::Json(json!({ "name": key }))).into_response()
}

/// `GET /<stream_path>`: all entries keyed by insertion order.
async fn handle_list(State(shared): State<Arc<HttpSharedState>>) -> Response {
    let entries = shared.store().entries.clone();
    axum::Json(Value::Object(entries)).into_response()
}

/// `DELETE /<stream_path>`: remove every entry.
async fn handle_delete(State(shared): State<Arc<HttpSharedState>>) -> StatusCode {
    shared.store().entries.clear();
    StatusCode::NO_CONTENT
}

/// `GET /status`: the latest published snapshot.
async fn handle_status(State(shared): State<Arc<HttpSharedState>>) -> Response {
    let status = shared.store().status.clone();
    status.map_or_else(
        || (StatusCode::SERVICE_UNAVAILABLE, "no status published yet").into_response(),
        |value| axum::Json(value).into_response(),
    )
}

// ============================================================================
// Helpers
// ============================================================================

/// Parses a bind address string into a full `host:port` form.
///
/// Accepts:
/// - `:8080` → `127.0.0.1:8080`
/// - `8080` → `127.0.0.1:8080`
/// - `1.2.3.4:8080` → as-is
///
/// # Errors
///
/// Returns [`SourceError::SubscribeFailed`] if the result cannot be parsed
/// as a socket address.
pub fn parse_bind_addr(input: &str) -> std::result::Result<String, SourceError> {
    let addr = if input.starts_with(':') {
        format!("127.0.0.1{input}")
    } else if input.parse::<u16>().is_ok() {
        format!("127.0.0.1:{input}")
    } else {
        input.to_string()
    };
    addr.parse::<SocketAddr>().map_err(|e| {
        SourceError::SubscribeFailed(format!("invalid bind address \"{input}\": {e}"))
    })?;
    Ok(addr)
}

// ============================================================================
// Tests
// ============================================================================
