// Copyright 2026 Crest Harvest Contributors
// SPDX-License-Identifier: Apache-2.0

//! Progress events for the download phase.
//!
//! The asset fetcher emits `DownloadEvent`s through a `tokio::sync::broadcast`
//! channel; the CLI turns them into a progress bar. With no subscriber the
//! events are dropped.

use crate::entity::EntityId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DownloadEvent {
    /// The phase began with this many qualifying assets.
    Started { total: usize },
    /// One unit of work finished.
    Finished {
        id: EntityId,
        name: String,
        ok: bool,
    },
    /// A request was throttled or failed and will be retried.
    Retrying {
        id: EntityId,
        attempt: u32,
        reason: String,
    },
}

pub type ProgressSender = tokio::sync::broadcast::Sender<DownloadEvent>;

pub type ProgressReceiver = tokio::sync::broadcast::Receiver<DownloadEvent>;

/// Buffer of 256 covers the ~212 municipalities plus a few retries without
/// lagging a slow subscriber.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    tokio::sync::broadcast::channel(256)
}

/// Emit an event, ignoring the error raised when nobody is listening.
pub fn emit(tx: &Option<ProgressSender>, event: DownloadEvent) {
    if let Some(sender) = tx {
        let _ = sender.send(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_receivers_is_silent() {
        let (tx, rx) = channel();
        drop(rx);
        emit(&Some(tx), DownloadEvent::Started { total: 3 });
        emit(&None, DownloadEvent::Started { total: 3 });
    }

    #[test]
    fn test_event_serializes_with_type_tag() {
        let event = DownloadEvent::Finished {
            id: EntityId(2),
            name: "Bled".into(),
            ok: true,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "Finished");
        assert_eq!(json["id"], 2);
    }
}
