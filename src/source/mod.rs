//! Event source abstraction.
//!
//! Provides the [`EventSource`] trait through which the spawner watches an
//! append-only stream of entries ("child added" notifications) and clears
//! it after a reset. Implementations cover an in-process channel, NDJSON
//! over stdio, and a local HTTP stand-in for a remote stream path.

pub mod channel;
pub mod http;
pub mod payload;
pub mod stdio;

pub use channel::{ChannelFeed, ChannelSource};
pub use http::HttpSource;
pub use stdio::StdioSource;

use std::fmt;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::error::SourceError;
use crate::spawner::SpawnerSnapshot;

/// Result type alias for source operations.
pub type Result<T> = std::result::Result<T, SourceError>;

/// Default capacity of the channel between a source and the spawner.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// One entry added to the watched stream.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    /// Key of the entry in the stream, when the source assigns one
    pub key: Option<String>,
    /// The entry's value; converted to a signal by [`payload::to_signal`]
    pub value: Value,
}

impl StreamEvent {
    /// An entry without a key.
    #[must_use]
    pub const fn new(value: Value) -> Self {
        Self { key: None, value }
    }

    /// An entry with a stream key.
    #[must_use]
    pub fn keyed(key: impl Into<String>, value: Value) -> Self {
        Self {
            key: Some(key.into()),
            value,
        }
    }
}

/// Live subscription to a source.
///
/// Dropping the subscription unsubscribes: the source's delivery task is
/// cancelled through the guard.
#[derive(Debug)]
pub struct Subscription {
    rx: mpsc::Receiver<StreamEvent>,
    _guard: DropGuard,
}

impl Subscription {
    /// Wraps a receiver; `token` is cancelled when the subscription drops.
    #[must_use]
    pub fn new(rx: mpsc::Receiver<StreamEvent>, token: CancellationToken) -> Self {
        Self {
            rx,
            _guard: token.drop_guard(),
        }
    }

    /// Waits for the next entry. Returns `None` once the source has ended.
    pub async fn next(&mut self) -> Option<StreamEvent> {
        self.rx.recv().await
    }
}

/// Async stream of entries the spawner subscribes to.
///
/// The trait uses `&self` so a source can be shared (`Arc<dyn EventSource>`)
/// between the runtime and whoever embeds it.
#[async_trait::async_trait]
pub trait EventSource: Send + Sync {
    /// Starts delivering entries added from now on.
    ///
    /// `cancel` is the spawner's shutdown token; implementations derive a
    /// child token for their delivery task.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::SubscribeFailed`] when the stream cannot be
    /// watched (bad address, already subscribed, I/O failure).
    async fn subscribe(&self, cancel: CancellationToken) -> Result<Subscription>;

    /// Removes every entry from the upstream stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the upstream store rejects or cannot receive
    /// the request.
    async fn clear(&self) -> Result<()>;

    /// Returns the type of this source for logging.
    fn source_type(&self) -> SourceType;

    /// Receives the spawner's state after each change. Most sources ignore it.
    fn publish_status(&self, _snapshot: &SpawnerSnapshot) {}

    /// Releases the source at teardown.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing or shutting down fails.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Source type identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceType {
    /// In-process channel.
    Channel,
    /// NDJSON over stdin, acknowledgements on stdout.
    Stdio,
    /// Local HTTP stream store.
    Http,
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel => write!(f, "channel"),
            Self::Stdio => write!(f, "stdio"),
            Self::Http => write!(f, "http"),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_source_type_display() {
        assert_eq!(SourceType::Channel.to_string(), "channel");
        assert_eq!(SourceType::Stdio.to_string(), "stdio");
        assert_eq!(SourceType::Http.to_string(), "http");
    }

    #[tokio::test]
    async fn test_dropping_subscription_cancels_token() {
        let (_tx, rx) = mpsc::channel(1);
        let token = CancellationToken::new();
        let subscription = Subscription::new(rx, token.clone());
        assert!(!token.is_cancelled());
        drop(subscription);
        assert!(token.is_cancelled());
    }

    #[tokio::test]
    async fn test_subscription_ends_when_sender_drops() {
        let (tx, rx) = mpsc::channel(2);
        let mut subscription = Subscription::new(rx, CancellationToken::new());
        tx.send(StreamEvent::keyed("k1", json!(1))).await.unwrap();
        drop(tx);

        let event = subscription.next().await.unwrap();
        assert_eq!(event.key.as_deref(), Some("k1"));
        assert!(subscription.next().await.is_none());
    }
}
