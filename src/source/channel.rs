//! In-process channel source.
//!
//! Lets an embedding application (or a test) push entries directly. The
//! feed side is a plain `mpsc` sender; dropping every feed ends the stream.

use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{EventSource, Result, SourceType, StreamEvent, Subscription};
use crate::error::SourceError;

/// Sending half of a [`ChannelSource`].
#[derive(Debug, Clone)]
pub struct ChannelFeed {
    tx: mpsc::Sender<StreamEvent>,
}

impl ChannelFeed {
    /// Appends an entry to the stream.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Closed`] once the subscriber is gone.
    pub async fn push(&self, event: StreamEvent) -> Result<()> {
        self.tx
            .send(event)
            .await
            .map_err(|_| SourceError::Closed("subscriber dropped".to_string()))
    }

    /// Appends a keyless entry carrying `value`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Closed`] once the subscriber is gone.
    pub async fn push_value(&self, value: Value) -> Result<()> {
        self.push(StreamEvent::new(value)).await
    }
}

/// Single-subscriber source backed by a bounded channel.
#[derive(Debug)]
pub struct ChannelSource {
    rx: Mutex<Option<mpsc::Receiver<StreamEvent>>>,
    clears: AtomicUsize,
}

impl ChannelSource {
    /// Creates a source and the feed that writes into it.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, ChannelFeed) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                rx: Mutex::new(Some(rx)),
                clears: AtomicUsize::new(0),
            },
            ChannelFeed { tx },
        )
    }

    /// How many times the stream has been cleared.
    #[must_use]
    pub fn clear_count(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl EventSource for ChannelSource {
    async fn subscribe(&self, cancel: CancellationToken) -> Result<Subscription> {
        let rx = self
            .rx
            .lock()
            .map_err(|_| SourceError::SubscribeFailed("channel lock poisoned".to_string()))?
            .take()
            .ok_or_else(|| SourceError::SubscribeFailed("channel already subscribed".to_string()))?;
        Ok(Subscription::new(rx, cancel.child_token()))
    }

    async fn clear(&self) -> Result<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn source_type(&self) -> SourceType {
        SourceType::Channel
    }
}
