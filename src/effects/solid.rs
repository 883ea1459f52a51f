//! Solid color effect: a uniform eased fade to one target color.

use crate::color::{Rgbcct, blend_rgbcct, clamp_unit};
use crate::grid::PanelState;

use super::{EFFECT_NAME_SOLID, Effect, EffectContext, EffectKind, SolidParams, ease_out_quad};

#[derive(Debug, Clone)]
pub struct SolidEffect {
    params: SolidParams,
    start_time: f64,
    start_color: Rgbcct,
    target_color: Rgbcct,
    progress: f64,
}

impl SolidEffect {
    pub fn new(params: SolidParams) -> Self {
        Self {
            params,
            start_time: 0.0,
            start_color: Rgbcct::BLACK,
            target_color: Rgbcct::BLACK,
            progress: 0.0,
        }
    }
}

impl Effect for SolidEffect {
    fn name(&self) -> &'static str {
        EFFECT_NAME_SOLID
    }

    fn kind(&self) -> EffectKind {
        EffectKind::OneShot
    }

    fn initialize(&mut self, ctx: &EffectContext) {
        self.start_time = ctx.elapsed_time;
        self.start_color = self.params.start_color.unwrap_or(Rgbcct::BLACK);
        self.target_color = ctx.colors.resolve_color(&self.params.color_preset);
        self.progress = 0.0;
    }

    fn compute(&mut self, ctx: &EffectContext) -> Vec<PanelState> {
        let elapsed = ctx.elapsed_time - self.start_time;
        self.progress = if self.params.transition_duration <= 0.0 {
            1.0
        } else {
            clamp_unit(elapsed / self.params.transition_duration)
        };

        let eased = ease_out_quad(self.progress);
        let color = blend_rgbcct(self.start_color, self.target_color, eased);
        let state = PanelState::new(color, self.params.brightness);

        vec![state; ctx.grid.len()]
    }

    fn is_done(&self) -> bool {
        self.progress >= 1.0
    }

    fn progress(&self) -> f64 {
        self.progress
    }
}
