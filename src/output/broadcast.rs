//! Frame broadcast hub feeding the command protocol's state updates.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tokio::sync::broadcast;

use crate::grid::PanelState;

use super::{Frame, OutputSink};

/// One published frame: the payload of a `stateUpdate` event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FrameSnapshot {
    pub panels: Vec<PanelState>,
    pub current_effect: Option<String>,
    /// Wall-clock milliseconds since the Unix epoch.
    pub timestamp: u64,
}

/// Broadcast hub fanning frame snapshots out to protocol subscribers.
///
/// Lagged receivers skip ahead to the newest frame; delivery errors are
/// ignored, a frame matters less than the next one.
#[derive(Debug, Clone)]
pub struct FrameHub {
    sender: broadcast::Sender<Arc<FrameSnapshot>>,
}

impl FrameHub {
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Arc<FrameSnapshot>> {
        self.sender.subscribe()
    }

    pub fn broadcast(&self, snapshot: FrameSnapshot) {
        let _ = self.sender.send(Arc::new(snapshot));
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// Engine sink publishing every tick onto the frame hub.
pub struct BroadcastSink {
    hub: FrameHub,
}

impl BroadcastSink {
    pub fn new(hub: FrameHub) -> Self {
        Self { hub }
    }
}

impl OutputSink for BroadcastSink {
    fn name(&self) -> &'static str {
        "broadcast"
    }

    fn render(&mut self, frame: &Frame) {
        self.hub.broadcast(FrameSnapshot {
            panels: frame.states.to_vec(),
            current_effect: frame.current_effect.map(str::to_string),
            timestamp: epoch_ms(),
        });
    }
}

fn epoch_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}
