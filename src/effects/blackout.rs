//! Blackout effect: fade every panel from its captured state to black.

use crate::color::clamp_unit;
use crate::grid::PanelState;

use super::{
    BlackoutParams, EFFECT_NAME_BLACKOUT, Effect, EffectContext, EffectKind, ease_in_out_quad,
};

#[derive(Debug, Clone)]
pub struct BlackoutEffect {
    params: BlackoutParams,
    start_time: f64,
    snapshot: Vec<PanelState>,
    progress: f64,
}

impl BlackoutEffect {
    pub fn new(params: BlackoutParams) -> Self {
        Self {
            params,
            start_time: 0.0,
            snapshot: Vec::new(),
            progress: 0.0,
        }
    }
}

impl Effect for BlackoutEffect {
    fn name(&self) -> &'static str {
        EFFECT_NAME_BLACKOUT
    }

    fn kind(&self) -> EffectKind {
        EffectKind::OneShot
    }

    fn initialize(&mut self, ctx: &EffectContext) {
        self.start_time = ctx.elapsed_time;
        // Fade starts from whatever the grid currently shows.
        self.snapshot = ctx.grid.states().to_vec();
        self.progress = 0.0;
    }

    fn compute(&mut self, ctx: &EffectContext) -> Vec<PanelState> {
        let elapsed = ctx.elapsed_time - self.start_time;
        self.progress = if self.params.transition_duration <= 0.0 {
            1.0
        } else {
            clamp_unit(elapsed / self.params.transition_duration)
        };

        let factor = 1.0 - ease_in_out_quad(self.progress);
        self.snapshot
            .iter()
            .map(|state| PanelState::new(state.color.scaled(factor), state.brightness * factor))
            .collect()
    }

    fn is_done(&self) -> bool {
        self.progress >= 1.0
    }

    fn progress(&self) -> f64 {
        self.progress
    }
}
