//! Per-operation transcript accumulation for live progress display.

use crate::operation::OperationKey;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use tokio::sync::broadcast;

/// One incremental transcript notification: the chunk just appended, not the
/// whole accumulated text.
#[derive(Debug, Clone)]
pub struct TranscriptUpdate {
    pub key: OperationKey,
    pub chunk: String,
}

/// Accumulates incremental tool output per operation key.
///
/// `update` always appends; observers rendering a live transcript receive
/// each chunk exactly once via the broadcast channel and can fetch the full
/// text with `details` at any point. Entries survive until `clear`, which
/// removes the key outright (freeing the memory, not just emptying it).
pub struct OperationDetails {
    entries: Mutex<HashMap<OperationKey, String>>,
    tx: broadcast::Sender<TranscriptUpdate>,
}

impl Default for OperationDetails {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationDetails {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self {
            entries: Mutex::new(HashMap::new()),
            tx,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TranscriptUpdate> {
        self.tx.subscribe()
    }

    /// Append `chunk` to the transcript for `key` and notify subscribers.
    pub fn update(&self, key: &OperationKey, chunk: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(key.clone())
            .or_default()
            .push_str(chunk);
        // No subscribers is fine; the transcript is still retained.
        let _ = self.tx.send(TranscriptUpdate {
            key: key.clone(),
            chunk: chunk.to_owned(),
        });
    }

    /// Accumulated text for `key`, or empty if nothing was recorded.
    pub fn details(&self, key: &OperationKey) -> String {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    /// Drop the entry for `key`. Clearing an absent key is a no-op.
    pub fn clear(&self, key: &OperationKey) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }
}
