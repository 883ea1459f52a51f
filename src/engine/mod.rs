//! Fixed-rate frame engine owning the grid, colors, runner, and sinks.

mod runner;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Instant;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace, warn};

pub use runner::EffectRunner;

use crate::color::{ColorManager, ColorPreset};
use crate::effects::{EffectContext, EffectSlot};
use crate::error::CommandError;
use crate::grid::{PanelGrid, TopologyMode};
use crate::output::{Frame, OutputSink};

const COMMAND_QUEUE_DEPTH: usize = 64;

/// Mutations and queries applied between ticks on the engine task.
pub enum EngineCommand {
    RunEffect {
        effect: EffectSlot,
        topology: Option<TopologyMode>,
        ack: oneshot::Sender<()>,
    },
    StopEffect {
        ack: oneshot::Sender<()>,
    },
    SetTopology {
        mode: TopologyMode,
        ack: oneshot::Sender<()>,
    },
    AddColorPreset {
        name: String,
        preset: ColorPreset,
        ack: oneshot::Sender<()>,
    },
    Status {
        reply: oneshot::Sender<EngineStatus>,
    },
    Shutdown {
        ack: oneshot::Sender<()>,
    },
}

/// Point-in-time engine summary for `connected`, `getStatus`, and `/health`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub running: bool,
    pub target_fps: u32,
    pub measured_fps: f64,
    pub panel_count: usize,
    pub columns: usize,
    pub rows_per_column: usize,
    pub topology: TopologyMode,
    pub current_effect: Option<String>,
    pub effect_progress: Option<f64>,
}

/// Cheap clonable handle used by command handlers to talk to the engine task.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineCommand>,
}

impl EngineHandle {
    pub async fn run_effect(
        &self,
        effect: EffectSlot,
        topology: Option<TopologyMode>,
    ) -> Result<(), CommandError> {
        let (ack, done) = oneshot::channel();
        self.send(EngineCommand::RunEffect {
            effect,
            topology,
            ack,
        })
        .await?;
        done.await.map_err(|_| unavailable())
    }

    pub async fn stop_effect(&self) -> Result<(), CommandError> {
        let (ack, done) = oneshot::channel();
        self.send(EngineCommand::StopEffect { ack }).await?;
        done.await.map_err(|_| unavailable())
    }

    pub async fn set_topology(&self, mode: TopologyMode) -> Result<(), CommandError> {
        let (ack, done) = oneshot::channel();
        self.send(EngineCommand::SetTopology { mode, ack }).await?;
        done.await.map_err(|_| unavailable())
    }

    pub async fn add_color_preset(
        &self,
        name: String,
        preset: ColorPreset,
    ) -> Result<(), CommandError> {
        let (ack, done) = oneshot::channel();
        self.send(EngineCommand::AddColorPreset { name, preset, ack })
            .await?;
        done.await.map_err(|_| unavailable())
    }

    pub async fn status(&self) -> Result<EngineStatus, CommandError> {
        let (reply, answer) = oneshot::channel();
        self.send(EngineCommand::Status { reply }).await?;
        answer.await.map_err(|_| unavailable())
    }

    /// Drain the tick loop; resolves once sinks have shut down.
    pub async fn shutdown(&self) -> Result<(), CommandError> {
        let (ack, done) = oneshot::channel();
        self.send(EngineCommand::Shutdown { ack }).await?;
        done.await.map_err(|_| unavailable())
    }

    async fn send(&self, command: EngineCommand) -> Result<(), CommandError> {
        self.tx.send(command).await.map_err(|_| unavailable())
    }
}

fn unavailable() -> CommandError {
    CommandError::Internal("engine unavailable".to_string())
}

/// Rolling frames-per-second counter over one-second windows.
#[derive(Debug)]
struct FpsCounter {
    window_start: Instant,
    frames: u32,
    measured: f64,
}

impl FpsCounter {
    fn new() -> Self {
        Self {
            window_start: Instant::now(),
            frames: 0,
            measured: 0.0,
        }
    }

    fn record(&mut self, now: Instant) {
        self.frames += 1;
        let window = now.duration_since(self.window_start);
        if window.as_secs_f64() >= 1.0 {
            self.measured = f64::from(self.frames) / window.as_secs_f64();
            trace!(fps = self.measured, "frame rate window");
            self.window_start = now;
            self.frames = 0;
        }
    }
}

pub struct Engine {
    grid: PanelGrid,
    colors: ColorManager,
    runner: EffectRunner,
    sinks: Vec<Box<dyn OutputSink>>,
    target_fps: u32,
    fps: FpsCounter,
    epoch: Instant,
    last_tick: Instant,
}

impl Engine {
    pub fn new(
        grid: PanelGrid,
        colors: ColorManager,
        target_fps: u32,
        sinks: Vec<Box<dyn OutputSink>>,
    ) -> Self {
        let now = Instant::now();
        Self {
            grid,
            colors,
            runner: EffectRunner::default(),
            sinks,
            target_fps: target_fps.max(1),
            fps: FpsCounter::new(),
            epoch: now,
            last_tick: now,
        }
    }

    /// Move the engine onto its own task and return a command handle.
    pub fn spawn(self) -> (EngineHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let join = tokio::spawn(self.run(rx));
        (EngineHandle { tx }, join)
    }

    async fn run(mut self, mut rx: mpsc::Receiver<EngineCommand>) {
        let period = std::time::Duration::from_secs_f64(1.0 / f64::from(self.target_fps));
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            fps = self.target_fps,
            panels = self.grid.len(),
            sinks = self.sinks.len(),
            "engine started"
        );

        loop {
            tokio::select! {
                command = rx.recv() => match command {
                    Some(EngineCommand::Shutdown { ack }) => {
                        let _ = ack.send(());
                        break;
                    }
                    Some(command) => self.apply(command),
                    None => break,
                },
                _ = ticker.tick() => self.tick(),
            }
        }

        self.runner.clear();
        for sink in &mut self.sinks {
            sink.shutdown();
        }
        info!("engine stopped");
    }

    fn apply(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::RunEffect {
                effect,
                topology,
                ack,
            } => {
                if let Some(mode) = topology {
                    self.grid.set_mode(mode);
                }
                let ctx = EffectContext {
                    delta_time: 0.0,
                    elapsed_time: self.elapsed_ms(),
                    grid: &self.grid,
                    colors: &self.colors,
                };
                self.runner.set_effect(effect, &ctx);
                let _ = ack.send(());
            }
            EngineCommand::StopEffect { ack } => {
                // The last rendered frame stays on the grid.
                self.runner.clear();
                let _ = ack.send(());
            }
            EngineCommand::SetTopology { mode, ack } => {
                debug!(?mode, "topology changed");
                self.grid.set_mode(mode);
                let _ = ack.send(());
            }
            EngineCommand::AddColorPreset { name, preset, ack } => {
                self.colors.add_preset(name, preset);
                let _ = ack.send(());
            }
            EngineCommand::Status { reply } => {
                let _ = reply.send(self.status());
            }
            // Shutdown is intercepted by the run loop before reaching here.
            EngineCommand::Shutdown { ack } => {
                let _ = ack.send(());
            }
        }
    }

    fn status(&self) -> EngineStatus {
        EngineStatus {
            running: true,
            target_fps: self.target_fps,
            measured_fps: self.fps.measured,
            panel_count: self.grid.len(),
            columns: self.grid.columns(),
            rows_per_column: self.grid.rows_per_column(),
            topology: self.grid.mode(),
            current_effect: self.runner.current_name().map(str::to_string),
            effect_progress: self.runner.progress(),
        }
    }

    fn elapsed_ms(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64() * 1000.0
    }

    fn tick(&mut self) {
        let now = Instant::now();
        let delta_time = now.duration_since(self.last_tick).as_secs_f64() * 1000.0;
        self.last_tick = now;
        let elapsed_time = self.elapsed_ms();

        let computed = {
            let ctx = EffectContext {
                delta_time,
                elapsed_time,
                grid: &self.grid,
                colors: &self.colors,
            };
            let runner = &mut self.runner;
            catch_unwind(AssertUnwindSafe(|| runner.update(&ctx)))
        };

        match computed {
            Ok(Some(states)) => {
                if let Err(err) = self.grid.set_all(states) {
                    warn!(error = %err, "discarding frame with wrong panel count");
                }
            }
            Ok(None) => {}
            Err(_) => {
                // A broken effect must not wedge the loop; drop it and keep
                // rendering the last applied grid state.
                error!(
                    effect = self.runner.current_name().unwrap_or("unknown"),
                    "effect compute panicked; clearing runner"
                );
                self.runner.abort();
            }
        }

        let frame = Frame {
            states: self.grid.states(),
            topology: self.grid.mode(),
            current_effect: self.runner.current_name(),
            elapsed_ms: elapsed_time,
        };
        for sink in &mut self.sinks {
            sink.render(&frame);
        }

        self.fps.record(now);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use serde_json::{Value, json};

    use crate::color::Rgbcct;
    use crate::grid::PanelState;

    use super::*;

    #[derive(Clone, Default)]
    struct RecordingSink {
        frames: Arc<Mutex<Vec<(Vec<PanelState>, Option<String>)>>>,
    }

    impl OutputSink for RecordingSink {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn render(&mut self, frame: &Frame) {
            self.frames.lock().unwrap().push((
                frame.states.to_vec(),
                frame.current_effect.map(str::to_string),
            ));
        }
    }

    fn engine_with_sink() -> (Engine, RecordingSink) {
        let sink = RecordingSink::default();
        let engine = Engine::new(
            PanelGrid::new(2, 7, TopologyMode::Linear),
            ColorManager::with_defaults(),
            60,
            vec![Box::new(sink.clone())],
        );
        (engine, sink)
    }

    fn run_effect_command(name: &str, params: Value) -> EngineCommand {
        let (ack, _done) = oneshot::channel();
        EngineCommand::RunEffect {
            effect: EffectSlot::from_request(name, params, 14).unwrap(),
            topology: None,
            ack,
        }
    }

    #[test]
    fn instant_solid_white_fills_the_grid_in_one_tick() {
        let (mut engine, sink) = engine_with_sink();

        engine.apply(run_effect_command(
            "solid",
            json!({"colorPreset": "white", "brightness": 1.0, "transitionDuration": 0}),
        ));
        engine.tick();

        let frames = sink.frames.lock().unwrap();
        let (states, _) = frames.last().unwrap();
        assert!(states
            .iter()
            .all(|s| s.color == Rgbcct::new(255, 255, 255, 255, 0) && s.brightness == 1.0));
        // One-shot completed on that tick.
        assert!(engine.runner.is_idle());
    }

    #[test]
    fn supersession_within_one_tick_shows_only_the_newer_effect() {
        let (mut engine, sink) = engine_with_sink();

        engine.apply(run_effect_command("strobe", Value::Null));
        engine.apply(run_effect_command("flow", Value::Null));
        engine.tick();

        let frames = sink.frames.lock().unwrap();
        let (_, effect) = frames.last().unwrap();
        assert_eq!(effect.as_deref(), Some("flow"));
    }

    #[test]
    fn idle_ticks_keep_the_last_frame() {
        let (mut engine, sink) = engine_with_sink();

        engine.apply(run_effect_command(
            "solid",
            json!({"colorPreset": "warm", "transitionDuration": 0}),
        ));
        engine.tick();
        let painted = sink.frames.lock().unwrap().last().unwrap().0.clone();

        engine.tick();
        let after_idle = sink.frames.lock().unwrap().last().unwrap().0.clone();
        for (a, b) in painted.iter().zip(&after_idle) {
            assert_eq!(a.color, b.color);
            assert_eq!(a.brightness, b.brightness);
        }
    }

    #[test]
    fn stop_effect_leaves_the_grid_untouched() {
        let (mut engine, sink) = engine_with_sink();

        engine.apply(run_effect_command("strobe", json!({"frequency": 0.1})));
        engine.tick();

        let (ack, _done) = oneshot::channel();
        engine.apply(EngineCommand::StopEffect { ack });
        engine.tick();

        let frames = sink.frames.lock().unwrap();
        let (states, effect) = frames.last().unwrap();
        assert!(effect.is_none());
        assert!(states.iter().any(|s| s.brightness > 0.0));
    }

    #[test]
    fn run_effect_can_switch_topology() {
        let (mut engine, _sink) = engine_with_sink();
        let (ack, _done) = oneshot::channel();
        engine.apply(EngineCommand::RunEffect {
            effect: EffectSlot::from_request("flow", Value::Null, 14).unwrap(),
            topology: Some(TopologyMode::Circular),
            ack,
        });
        assert_eq!(engine.grid.mode(), TopologyMode::Circular);
    }

    #[test]
    fn status_reflects_the_active_effect() {
        let (mut engine, _sink) = engine_with_sink();
        engine.apply(run_effect_command("flow", Value::Null));
        let status = engine.status();
        assert_eq!(status.current_effect.as_deref(), Some("flow"));
        assert_eq!(status.panel_count, 14);
        assert_eq!(status.target_fps, 60);
    }
}
