use std::sync::Arc;
use std::time::SystemTime;

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::dao::PresetStore;
use crate::engine::EngineHandle;
use crate::output::FrameHub;

pub type SharedState = Arc<AppState>;

/// Bookkeeping for one connected protocol subscriber.
#[derive(Debug, Clone)]
pub struct SubscriberInfo {
    pub connected_at: SystemTime,
}

/// Central application state: the engine handle, the frame hub, the preset
/// store, and the live subscriber registry.
pub struct AppState {
    config: AppConfig,
    engine: EngineHandle,
    frames: FrameHub,
    presets: Mutex<PresetStore>,
    subscribers: DashMap<Uuid, SubscriberInfo>,
}

impl AppState {
    /// Construct the shared state wrapped in an [`Arc`] so it can be cloned
    /// cheaply into handlers and tasks.
    pub fn new(
        config: AppConfig,
        engine: EngineHandle,
        frames: FrameHub,
        presets: PresetStore,
    ) -> SharedState {
        Arc::new(Self {
            config,
            engine,
            frames,
            presets: Mutex::new(presets),
            subscribers: DashMap::new(),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Handle to the engine task's command channel.
    pub fn engine(&self) -> &EngineHandle {
        &self.engine
    }

    /// Hub fanning out one frame snapshot per tick.
    pub fn frames(&self) -> &FrameHub {
        &self.frames
    }

    /// Effect preset store; hold the lock only across one operation.
    pub fn presets(&self) -> &Mutex<PresetStore> {
        &self.presets
    }

    /// Registry of connected protocol subscribers keyed by connection id.
    pub fn subscribers(&self) -> &DashMap<Uuid, SubscriberInfo> {
        &self.subscribers
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
