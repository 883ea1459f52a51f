//! WebSocket command protocol: per-connection lifecycle and dispatch.

use std::time::SystemTime;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    color::ColorPreset,
    dao::{NewPreset, PresetPatch},
    dto::ws::{
        ClientMessage, ConfigSnapshot, ConnectedPayload, ErrorPayload, PanelStateDto,
        RunEffectPayload, SavePresetPayload, ServerMessage, StateUpdatePayload,
        UpdatePresetPayload,
    },
    effects::EffectSlot,
    error::CommandError,
    output::FrameSnapshot,
    state::{SharedState, SubscriberInfo},
};

/// Handle the full lifecycle of one protocol connection.
///
/// Commands on the same connection are dispatched serially; frame snapshots
/// from the engine are forwarded in between. A subscriber that falls behind
/// skips to the newest frame instead of stalling the engine.
pub async fn handle_socket(state: SharedState, socket: WebSocket) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps state updates flowing even while we await
    // inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let connection_id = Uuid::new_v4();
    state.subscribers().insert(
        connection_id,
        SubscriberInfo {
            connected_at: SystemTime::now(),
        },
    );
    info!(id = %connection_id, "protocol client connected");

    match connected_payload(&state).await {
        Ok(payload) => send_message(&outbound_tx, &ServerMessage::Connected(payload)),
        Err(err) => send_error(&outbound_tx, &err),
    }

    let mut frames = state.frames().subscribe();

    loop {
        tokio::select! {
            frame = frames.recv() => match frame {
                Ok(snapshot) => {
                    send_message(&outbound_tx, &state_update(&snapshot));
                }
                Err(RecvError::Lagged(skipped)) => {
                    debug!(id = %connection_id, skipped, "subscriber lagged; resuming at newest frame");
                }
                Err(RecvError::Closed) => break,
            },
            inbound = receiver.next() => match inbound {
                Some(Ok(Message::Text(text))) => {
                    dispatch(&state, &outbound_tx, text.as_str()).await;
                }
                Some(Ok(Message::Ping(payload))) => {
                    let _ = outbound_tx.send(Message::Pong(payload));
                }
                Some(Ok(Message::Close(frame))) => {
                    let _ = outbound_tx.send(Message::Close(frame));
                    break;
                }
                Some(Ok(_)) => {}
                Some(Err(err)) => {
                    warn!(id = %connection_id, error = %err, "websocket error");
                    break;
                }
                None => break,
            },
        }
    }

    state.subscribers().remove(&connection_id);
    info!(id = %connection_id, "protocol client disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Parse one inbound frame and run it; failures become `error` events on the
/// same connection, which stays open.
async fn dispatch(state: &SharedState, tx: &mpsc::UnboundedSender<Message>, text: &str) {
    let message = match serde_json::from_str::<ClientMessage>(text) {
        Ok(message) => message,
        Err(err) => {
            send_error(tx, &CommandError::InvalidCommand(err.to_string()));
            return;
        }
    };

    if let Err(err) = handle_message(state, tx, message).await {
        send_error(tx, &err);
    }
}

async fn handle_message(
    state: &SharedState,
    tx: &mpsc::UnboundedSender<Message>,
    message: ClientMessage,
) -> Result<(), CommandError> {
    match message {
        ClientMessage::RunEffect(payload) => run_effect(state, payload).await,
        ClientMessage::StopEffect => state.engine().stop_effect().await,
        ClientMessage::SetTopology { mode } => state.engine().set_topology(mode).await,
        ClientMessage::AddPreset { name, preset } => {
            let preset = serde_json::from_value::<ColorPreset>(preset)
                .map_err(|err| CommandError::InvalidParam(format!("color preset: {err}")))?;
            state.engine().add_color_preset(name, preset).await
        }
        ClientMessage::SavePreset(payload) => {
            let preset = save_preset(state, payload).await?;
            send_message(tx, &ServerMessage::PresetSaved(preset));
            Ok(())
        }
        ClientMessage::UpdatePreset(payload) => {
            let preset = update_preset(state, payload).await?;
            send_message(tx, &ServerMessage::PresetUpdated(preset));
            Ok(())
        }
        ClientMessage::DeletePreset { id } => {
            state.presets().lock().await.delete(&id)?;
            send_message(tx, &ServerMessage::PresetDeleted { id });
            Ok(())
        }
        ClientMessage::ListPresets => {
            let presets = state.presets().lock().await.get_all();
            send_message(tx, &ServerMessage::PresetsList { presets });
            Ok(())
        }
        ClientMessage::GetStatus => {
            let status = state.engine().status().await?;
            send_message(tx, &ServerMessage::Status(status));
            Ok(())
        }
        ClientMessage::Unknown => Err(CommandError::InvalidCommand(
            "unknown message type".to_string(),
        )),
    }
}

/// Resolve a `runEffect` request into a built effect and hand it to the
/// engine. Preset-backed requests load topology and params from the store.
async fn run_effect(state: &SharedState, payload: RunEffectPayload) -> Result<(), CommandError> {
    let engine_config = &state.config().engine;
    let panel_count = engine_config.columns * engine_config.rows_per_column;

    let (effect, topology) = match payload {
        RunEffectPayload::ByName {
            effect_name,
            params,
            topology,
        } => (
            EffectSlot::from_request(&effect_name, params, panel_count)?,
            topology,
        ),
        RunEffectPayload::ByPreset { preset_id } => {
            let preset = {
                let store = state.presets().lock().await;
                store.get(&preset_id).cloned()
            }
            .ok_or_else(|| CommandError::NotFound(format!("preset `{preset_id}`")))?;

            (
                EffectSlot::from_request(&preset.effect, preset.params.clone(), panel_count)?,
                Some(preset.topology),
            )
        }
    };

    state.engine().run_effect(effect, topology).await
}

async fn save_preset(
    state: &SharedState,
    payload: SavePresetPayload,
) -> Result<crate::dao::EffectPreset, CommandError> {
    let mut store = state.presets().lock().await;
    Ok(store.create(NewPreset {
        id: payload.id,
        name: payload.name,
        effect: payload.effect,
        topology: payload.topology,
        params: payload.params,
    })?)
}

async fn update_preset(
    state: &SharedState,
    payload: UpdatePresetPayload,
) -> Result<crate::dao::EffectPreset, CommandError> {
    let mut store = state.presets().lock().await;
    Ok(store.update(
        &payload.id,
        PresetPatch {
            name: payload.name,
            effect: payload.effect,
            topology: payload.topology,
            params: payload.params,
        },
    )?)
}

async fn connected_payload(state: &SharedState) -> Result<ConnectedPayload, CommandError> {
    let status = state.engine().status().await?;
    let engine = &state.config().engine;
    Ok(ConnectedPayload {
        config: ConfigSnapshot {
            target_fps: engine.target_fps,
            columns: engine.columns,
            rows_per_column: engine.rows_per_column,
            initial_topology: engine.initial_topology,
            artnet_enabled: state.config().artnet.enabled,
        },
        status,
    })
}

fn state_update(snapshot: &FrameSnapshot) -> ServerMessage {
    ServerMessage::StateUpdate(StateUpdatePayload {
        panels: snapshot
            .panels
            .iter()
            .map(|panel| PanelStateDto {
                color: panel.color,
                brightness: panel.brightness,
                timestamp: panel.timestamp,
            })
            .collect(),
        current_effect: snapshot.current_effect.clone(),
        timestamp: snapshot.timestamp,
    })
}

/// Serialize a payload and queue it on the connection's writer.
fn send_message(tx: &mpsc::UnboundedSender<Message>, message: &ServerMessage) {
    match serde_json::to_string(message) {
        Ok(payload) => {
            let _ = tx.send(Message::Text(payload.into()));
        }
        Err(err) => {
            warn!(error = %err, "failed to serialize server message");
        }
    }
}

fn send_error(tx: &mpsc::UnboundedSender<Message>, err: &CommandError) {
    warn!(error = %err, "command failed");
    send_message(
        tx,
        &ServerMessage::Error(ErrorPayload {
            code: err.code(),
            message: err.to_string(),
        }),
    );
}

/// Ensure the writer task winds down before we return from the handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};
    use tempfile::tempdir;

    use crate::{
        color::ColorManager,
        config::AppConfig,
        dao::PresetStore,
        engine::Engine,
        grid::{PanelGrid, TopologyMode},
        output::{BroadcastSink, FrameHub, OutputSink},
        state::AppState,
    };

    use super::*;

    async fn test_state() -> SharedState {
        let config = AppConfig::default();
        let frames = FrameHub::new(4);

        let grid = PanelGrid::new(2, 7, TopologyMode::Linear);
        let colors = ColorManager::with_defaults();
        let sinks: Vec<Box<dyn OutputSink>> = vec![Box::new(BroadcastSink::new(frames.clone()))];
        let (engine, _task) = Engine::new(grid, colors, 60, sinks).spawn();

        let dir = tempdir().unwrap();
        let store = PresetStore::load(dir.path().join("presets.json")).unwrap();
        // Keep the directory alive for the duration of the test process.
        std::mem::forget(dir);

        AppState::new(config, engine, frames, store)
    }

    fn client(raw: Value) -> ClientMessage {
        serde_json::from_value(raw).unwrap()
    }

    fn reply_json(rx: &mut mpsc::UnboundedReceiver<Message>) -> Value {
        let Ok(Message::Text(text)) = rx.try_recv() else {
            panic!("expected a text reply");
        };
        serde_json::from_str(text.as_str()).unwrap()
    }

    #[tokio::test]
    async fn save_list_delete_preset_round_trip() {
        let state = test_state().await;
        let (tx, mut rx) = mpsc::unbounded_channel();

        handle_message(
            &state,
            &tx,
            client(json!({
                "type": "savePreset",
                "payload": {
                    "id": "My Scene!!",
                    "name": "My scene",
                    "effect": "flow",
                    "topology": "circular",
                    "params": {"speed": 0.3}
                }
            })),
        )
        .await
        .unwrap();

        let saved = reply_json(&mut rx);
        assert_eq!(saved["type"], "presetSaved");
        assert_eq!(saved["payload"]["id"], "my-scene");
        assert_eq!(saved["payload"]["isProtected"], false);

        handle_message(&state, &tx, client(json!({"type": "listPresets"})))
            .await
            .unwrap();
        let listing = reply_json(&mut rx);
        assert_eq!(listing["type"], "presetsList");
        let ids: Vec<&str> = listing["payload"]["presets"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|preset| preset["id"].as_str())
            .collect();
        assert!(ids.contains(&"my-scene"));
        assert!(ids.contains(&"flow-slow-rainbow"));

        handle_message(
            &state,
            &tx,
            client(json!({"type": "deletePreset", "payload": {"id": "my-scene"}})),
        )
        .await
        .unwrap();
        let deleted = reply_json(&mut rx);
        assert_eq!(deleted["type"], "presetDeleted");
        assert_eq!(deleted["payload"]["id"], "my-scene");
    }

    #[tokio::test]
    async fn protected_presets_reject_mutation() {
        let state = test_state().await;
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = handle_message(
            &state,
            &tx,
            client(json!({
                "type": "updatePreset",
                "payload": {"id": "strobe-10hz", "name": "Faster"}
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "protected");

        let err = handle_message(
            &state,
            &tx,
            client(json!({"type": "deletePreset", "payload": {"id": "blackout-quick"}})),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "protected");
    }

    #[tokio::test]
    async fn unknown_effect_leaves_the_running_effect_untouched() {
        let state = test_state().await;
        let (tx, _rx) = mpsc::unbounded_channel();

        handle_message(
            &state,
            &tx,
            client(json!({
                "type": "runEffect",
                "payload": {"effectName": "flow", "params": {}}
            })),
        )
        .await
        .unwrap();

        let err = handle_message(
            &state,
            &tx,
            client(json!({
                "type": "runEffect",
                "payload": {"effectName": "sparkle", "params": {}}
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "notFound");

        let status = state.engine().status().await.unwrap();
        assert_eq!(status.current_effect.as_deref(), Some("flow"));
    }

    #[tokio::test]
    async fn run_effect_by_preset_applies_stored_topology() {
        let state = test_state().await;
        let (tx, _rx) = mpsc::unbounded_channel();

        handle_message(
            &state,
            &tx,
            client(json!({
                "type": "runEffect",
                "payload": {"presetId": "strobe-10hz"}
            })),
        )
        .await
        .unwrap();

        let status = state.engine().status().await.unwrap();
        assert_eq!(status.current_effect.as_deref(), Some("strobe"));
        assert_eq!(status.topology, TopologyMode::Circular);
    }

    #[tokio::test]
    async fn unknown_preset_id_reports_not_found() {
        let state = test_state().await;
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = handle_message(
            &state,
            &tx,
            client(json!({
                "type": "runEffect",
                "payload": {"presetId": "ghost"}
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "notFound");
    }

    #[tokio::test]
    async fn invalid_color_preset_payload_is_rejected() {
        let state = test_state().await;
        let (tx, _rx) = mpsc::unbounded_channel();

        let err = handle_message(
            &state,
            &tx,
            client(json!({
                "type": "addPreset",
                "payload": {"name": "bad", "preset": {"type": "nonsense"}}
            })),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code(), "invalidParam");
    }
}
