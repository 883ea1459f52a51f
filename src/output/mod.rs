//! Output sinks consuming per-frame panel state.

mod artnet;
mod broadcast;

pub use artnet::{ArtNetConfig, ArtNetSink};
pub use broadcast::{BroadcastSink, FrameHub, FrameSnapshot};

use crate::grid::{PanelState, TopologyMode};

/// Immutable view of one rendered frame handed to every sink.
pub struct Frame<'a> {
    pub states: &'a [PanelState],
    pub topology: TopologyMode,
    pub current_effect: Option<&'a str>,
    /// Milliseconds since the engine started.
    pub elapsed_ms: f64,
}

/// A consumer of rendered frames.
///
/// Sinks observe; they never write back into the grid. `render` must not
/// block the tick: slow consumers drop or coalesce on their own.
pub trait OutputSink: Send {
    fn name(&self) -> &'static str;

    fn render(&mut self, frame: &Frame);

    /// Called once when the engine drains; sinks release sockets here.
    fn shutdown(&mut self) {}
}
