//! WebSocket message shapes for the command protocol.
//!
//! Every frame is a JSON object `{type, payload?}`; both directions use the
//! same adjacently-tagged encoding.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::color::Rgbcct;
use crate::dao::EffectPreset;
use crate::engine::EngineStatus;
use crate::grid::TopologyMode;

/// Messages accepted from protocol clients.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ClientMessage {
    RunEffect(RunEffectPayload),
    StopEffect,
    SetTopology { mode: TopologyMode },
    /// Register a named color preset with the engine's color manager.
    AddPreset { name: String, preset: Value },
    SavePreset(SavePresetPayload),
    UpdatePreset(UpdatePresetPayload),
    DeletePreset { id: String },
    ListPresets,
    GetStatus,
    #[serde(other)]
    Unknown,
}

/// `runEffect` addresses an effect by name or a stored preset by id.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum RunEffectPayload {
    #[serde(rename_all = "camelCase")]
    ByPreset { preset_id: String },
    #[serde(rename_all = "camelCase")]
    ByName {
        effect_name: String,
        #[serde(default)]
        params: Value,
        #[serde(default)]
        topology: Option<TopologyMode>,
    },
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavePresetPayload {
    pub id: String,
    pub name: String,
    pub effect: String,
    pub topology: TopologyMode,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePresetPayload {
    pub id: String,
    pub name: Option<String>,
    pub effect: Option<String>,
    pub topology: Option<TopologyMode>,
    pub params: Option<Value>,
}

/// Messages pushed to protocol clients.
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ServerMessage {
    Connected(ConnectedPayload),
    StateUpdate(StateUpdatePayload),
    Error(ErrorPayload),
    PresetSaved(EffectPreset),
    PresetUpdated(EffectPreset),
    PresetDeleted { id: String },
    PresetsList { presets: Vec<EffectPreset> },
    Status(EngineStatus),
}

/// Handshake sent once per connection.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectedPayload {
    pub config: ConfigSnapshot,
    pub status: EngineStatus,
}

/// The slice of configuration clients care about.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigSnapshot {
    pub target_fps: u32,
    pub columns: usize,
    pub rows_per_column: usize,
    pub initial_topology: TopologyMode,
    pub artnet_enabled: bool,
}

/// One frame for subscribers: every panel state plus the active effect.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StateUpdatePayload {
    pub panels: Vec<PanelStateDto>,
    pub current_effect: Option<String>,
    pub timestamp: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelStateDto {
    pub color: Rgbcct,
    pub brightness: f64,
    pub timestamp: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorPayload {
    pub code: &'static str,
    pub message: String,
}
