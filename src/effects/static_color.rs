//! Static effect: hold per-panel colors, easing into every new target set.

use crate::color::{Rgbcct, blend_rgbcct, clamp_unit};
use crate::grid::{PanelGrid, PanelState};

use super::{EFFECT_NAME_STATIC, Effect, EffectContext, EffectKind, StaticParams, ease_out_cubic};

#[derive(Debug, Clone)]
pub struct StaticEffect {
    params: StaticParams,
    target_colors: Vec<Rgbcct>,
    previous_colors: Vec<Rgbcct>,
    transition_start: f64,
    /// Replacement params queued by `retarget`, applied on the next compute.
    pending: Option<StaticParams>,
    primed: bool,
    progress: f64,
}

impl StaticEffect {
    pub fn new(params: StaticParams) -> Self {
        Self {
            params,
            target_colors: Vec::new(),
            previous_colors: Vec::new(),
            transition_start: 0.0,
            pending: None,
            primed: false,
            progress: 0.0,
        }
    }

    pub fn params(&self) -> &StaticParams {
        &self.params
    }

    /// Queue a new parameter set without restarting the effect.
    ///
    /// The runner calls this when a static request supersedes a running
    /// static effect, so repeated updates glide instead of snapping.
    pub fn retarget(&mut self, params: StaticParams) {
        self.pending = Some(params);
    }

    fn padded_targets(params: &StaticParams, panel_count: usize) -> Vec<Rgbcct> {
        let mut targets = params.panel_colors.clone();
        targets.resize(panel_count, Rgbcct::BLACK);
        targets
    }

    fn grid_colors(grid: &PanelGrid) -> Vec<Rgbcct> {
        grid.states().iter().map(|state| state.color).collect()
    }

    fn apply_pending(&mut self, ctx: &EffectContext) {
        let Some(params) = self.pending.take() else {
            return;
        };

        let new_targets = Self::padded_targets(&params, ctx.grid.len());
        if new_targets != self.target_colors {
            self.previous_colors = Self::grid_colors(ctx.grid);
            self.target_colors = new_targets;
            self.transition_start = ctx.elapsed_time;
        }
        self.params = params;
    }
}

impl Effect for StaticEffect {
    fn name(&self) -> &'static str {
        EFFECT_NAME_STATIC
    }

    fn kind(&self) -> EffectKind {
        EffectKind::Continuous
    }

    fn initialize(&mut self, ctx: &EffectContext) {
        self.target_colors = Self::padded_targets(&self.params, ctx.grid.len());
        self.transition_start = ctx.elapsed_time;
        self.primed = false;
        self.progress = 0.0;
    }

    fn compute(&mut self, ctx: &EffectContext) -> Vec<PanelState> {
        if !self.primed {
            self.previous_colors = Self::grid_colors(ctx.grid);
            self.transition_start = ctx.elapsed_time;
            self.primed = true;
        }
        self.apply_pending(ctx);

        let elapsed = ctx.elapsed_time - self.transition_start;
        self.progress = if self.params.transition_duration <= 0.0 {
            1.0
        } else {
            clamp_unit(elapsed / self.params.transition_duration)
        };
        let eased = ease_out_cubic(self.progress);

        self.previous_colors
            .iter()
            .zip(&self.target_colors)
            .map(|(&from, &to)| {
                PanelState::new(blend_rgbcct(from, to, eased), self.params.brightness)
            })
            .collect()
    }

    fn progress(&self) -> f64 {
        self.progress
    }
}
