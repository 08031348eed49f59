//! Change-notification sinks.

use std::sync::Mutex;
use tokio::sync::broadcast;

/// Receives one call per externally visible change.
pub trait NotificationSink: Send + Sync {
    fn notify_change(&self, uri: &str);
}

/// Logs each change at debug level.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify_change(&self, uri: &str) {
        tracing::debug!(uri = %uri, "change notified");
    }
}

/// Fans changes out to subscribers. Lagging or absent subscribers never block the writer.
#[derive(Clone, Debug)]
pub struct BroadcastSink {
    tx: broadcast::Sender<String>,
}

impl BroadcastSink {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        BroadcastSink { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<String> {
        self.tx.subscribe()
    }
}

impl NotificationSink for BroadcastSink {
    fn notify_change(&self, uri: &str) {
        // Err only means nobody is listening.
        let _ = self.tx.send(uri.to_string());
    }
}

/// Keeps every notified URI in order; for observing the engine.
#[derive(Debug, Default)]
pub struct RecordingSink {
    uris: Mutex<Vec<String>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn uris(&self) -> Vec<String> {
        self.uris.lock().map(|u| u.clone()).unwrap_or_default()
    }

    pub fn count(&self) -> usize {
        self.uris.lock().map(|u| u.len()).unwrap_or(0)
    }
}

impl NotificationSink for RecordingSink {
    fn notify_change(&self, uri: &str) {
        if let Ok(mut uris) = self.uris.lock() {
            uris.push(uri.to_string());
        }
    }
}
