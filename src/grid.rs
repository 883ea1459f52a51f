//! Panel array, topology modes, and derived traversal sequences.

use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::color::{Rgbcct, clamp_unit};

/// How panels are ordered when effects traverse the grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopologyMode {
    /// One closed loop: even columns ascending, odd columns descending.
    Circular,
    /// One sequence per column, each top to bottom.
    #[default]
    Linear,
    /// One sequence listing every panel in id order.
    Singular,
}

/// Immutable identity of a single panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Panel {
    pub id: usize,
    pub column: usize,
    pub row: usize,
}

/// Per-panel output state for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PanelState {
    pub color: Rgbcct,
    pub brightness: f64,
    /// Monotonic milliseconds since the grid was constructed.
    #[serde(default)]
    pub timestamp: u64,
}

impl PanelState {
    /// Build a state with clamped brightness and a zero timestamp; the grid
    /// stamps the timestamp when the state is written.
    pub fn new(color: Rgbcct, brightness: f64) -> Self {
        Self {
            color,
            brightness: clamp_unit(brightness),
            timestamp: 0,
        }
    }

    pub fn black() -> Self {
        Self::new(Rgbcct::BLACK, 0.0)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("panel id {id} out of range (grid has {len} panels)")]
    OutOfRange { id: usize, len: usize },
    #[error("expected {expected} panel states, got {got}")]
    LengthMismatch { expected: usize, got: usize },
}

/// Fixed panel array owning the current topology mode and per-panel state.
///
/// The grid is the single place panel state is written; effects return fresh
/// state vectors and the engine applies them here.
#[derive(Debug)]
pub struct PanelGrid {
    columns: usize,
    rows_per_column: usize,
    panels: Vec<Panel>,
    states: Vec<PanelState>,
    mode: TopologyMode,
    epoch: Instant,
}

impl PanelGrid {
    pub fn new(columns: usize, rows_per_column: usize, mode: TopologyMode) -> Self {
        let count = columns * rows_per_column;
        let panels = (0..count)
            .map(|id| Panel {
                id,
                column: id / rows_per_column,
                row: id % rows_per_column,
            })
            .collect();

        Self {
            columns,
            rows_per_column,
            panels,
            states: vec![PanelState::black(); count],
            mode,
            epoch: Instant::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    pub fn columns(&self) -> usize {
        self.columns
    }

    pub fn rows_per_column(&self) -> usize {
        self.rows_per_column
    }

    pub fn mode(&self) -> TopologyMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: TopologyMode) {
        self.mode = mode;
    }

    pub fn panels(&self) -> &[Panel] {
        &self.panels
    }

    pub fn states(&self) -> &[PanelState] {
        &self.states
    }

    /// Monotonic milliseconds since grid construction.
    pub fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    pub fn state(&self, id: usize) -> Result<&PanelState, GridError> {
        self.states.get(id).ok_or(GridError::OutOfRange {
            id,
            len: self.states.len(),
        })
    }

    pub fn set_state(&mut self, id: usize, color: Rgbcct, brightness: f64) -> Result<(), GridError> {
        let timestamp = self.now_ms();
        let len = self.states.len();
        let slot = self
            .states
            .get_mut(id)
            .ok_or(GridError::OutOfRange { id, len })?;
        *slot = PanelState {
            color,
            brightness: clamp_unit(brightness),
            timestamp,
        };
        Ok(())
    }

    /// Replace every panel state at once; the vector length must match the
    /// panel count exactly.
    pub fn set_all(&mut self, states: Vec<PanelState>) -> Result<(), GridError> {
        if states.len() != self.states.len() {
            return Err(GridError::LengthMismatch {
                expected: self.states.len(),
                got: states.len(),
            });
        }
        let timestamp = self.now_ms();
        for (slot, mut state) in self.states.iter_mut().zip(states) {
            state.brightness = clamp_unit(state.brightness);
            state.timestamp = timestamp;
            *slot = state;
        }
        Ok(())
    }

    /// Set every panel to the same color and brightness.
    pub fn set_uniform(&mut self, color: Rgbcct, brightness: f64) {
        let timestamp = self.now_ms();
        let brightness = clamp_unit(brightness);
        for slot in &mut self.states {
            *slot = PanelState {
                color,
                brightness,
                timestamp,
            };
        }
    }

    /// Ordered panel-id traversals for the current topology mode.
    pub fn sequences(&self) -> Vec<Vec<usize>> {
        self.sequences_for(self.mode)
    }

    /// Ordered panel-id traversals for an explicit topology mode.
    pub fn sequences_for(&self, mode: TopologyMode) -> Vec<Vec<usize>> {
        let rows = self.rows_per_column;
        match mode {
            TopologyMode::Linear => (0..self.columns)
                .map(|c| (c * rows..(c + 1) * rows).collect())
                .collect(),
            TopologyMode::Circular => {
                // Even columns run top to bottom, odd columns bottom to top,
                // concatenated into one closed loop.
                let mut loop_ids = Vec::with_capacity(self.len());
                for c in 0..self.columns {
                    if c % 2 == 0 {
                        loop_ids.extend(c * rows..(c + 1) * rows);
                    } else {
                        loop_ids.extend((c * rows..(c + 1) * rows).rev());
                    }
                }
                vec![loop_ids]
            }
            TopologyMode::Singular => vec![(0..self.len()).collect()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canonical_grid() -> PanelGrid {
        PanelGrid::new(2, 7, TopologyMode::Linear)
    }

    #[test]
    fn panel_identity_mapping() {
        let grid = canonical_grid();
        assert_eq!(grid.len(), 14);
        assert_eq!(grid.panels()[0], Panel { id: 0, column: 0, row: 0 });
        assert_eq!(grid.panels()[6], Panel { id: 6, column: 0, row: 6 });
        assert_eq!(grid.panels()[7], Panel { id: 7, column: 1, row: 0 });
        assert_eq!(grid.panels()[13], Panel { id: 13, column: 1, row: 6 });
    }

    #[test]
    fn grid_starts_black() {
        let grid = canonical_grid();
        assert!(grid
            .states()
            .iter()
            .all(|s| s.color == Rgbcct::BLACK && s.brightness == 0.0));
    }

    #[test]
    fn circular_sequence_matches_canonical_shape() {
        let grid = PanelGrid::new(2, 7, TopologyMode::Circular);
        let sequences = grid.sequences();
        assert_eq!(sequences.len(), 1);
        assert_eq!(
            sequences[0],
            vec![0, 1, 2, 3, 4, 5, 6, 13, 12, 11, 10, 9, 8, 7]
        );
    }

    #[test]
    fn circular_generalizes_beyond_two_columns() {
        let grid = PanelGrid::new(3, 2, TopologyMode::Circular);
        assert_eq!(grid.sequences(), vec![vec![0, 1, 3, 2, 4, 5]]);
    }

    #[test]
    fn linear_yields_one_sequence_per_column() {
        let grid = canonical_grid();
        let sequences = grid.sequences();
        assert_eq!(sequences.len(), 2);
        assert_eq!(sequences[0], vec![0, 1, 2, 3, 4, 5, 6]);
        assert_eq!(sequences[1], vec![7, 8, 9, 10, 11, 12, 13]);
    }

    #[test]
    fn every_topology_is_a_permutation_of_panel_ids() {
        let grid = canonical_grid();
        for mode in [
            TopologyMode::Circular,
            TopologyMode::Linear,
            TopologyMode::Singular,
        ] {
            let mut ids: Vec<usize> = grid.sequences_for(mode).into_iter().flatten().collect();
            ids.sort_unstable();
            assert_eq!(ids, (0..grid.len()).collect::<Vec<_>>(), "mode {mode:?}");
        }
    }

    #[test]
    fn set_state_bounds_checked() {
        let mut grid = canonical_grid();
        assert!(grid.set_state(13, Rgbcct::WHITE, 1.0).is_ok());
        assert_eq!(
            grid.set_state(14, Rgbcct::WHITE, 1.0),
            Err(GridError::OutOfRange { id: 14, len: 14 })
        );
    }

    #[test]
    fn set_all_requires_exact_length() {
        let mut grid = canonical_grid();
        let err = grid.set_all(vec![PanelState::black(); 13]).unwrap_err();
        assert_eq!(
            err,
            GridError::LengthMismatch {
                expected: 14,
                got: 13
            }
        );
    }

    #[test]
    fn writes_clamp_brightness_and_stamp_time() {
        let mut grid = canonical_grid();
        grid.set_state(0, Rgbcct::WHITE, 3.5).unwrap();
        let state = grid.state(0).unwrap();
        assert_eq!(state.brightness, 1.0);

        grid.set_uniform(Rgbcct::WHITE, -1.0);
        assert!(grid.states().iter().all(|s| s.brightness == 0.0));
    }
}
