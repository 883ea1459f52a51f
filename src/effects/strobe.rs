//! Strobe effect: uniform on/off flashing at a fixed frequency.

use crate::color::Rgbcct;
use crate::grid::PanelState;

use super::{EFFECT_NAME_STROBE, Effect, EffectContext, EffectKind, StrobeParams};

#[derive(Debug, Clone)]
pub struct StrobeEffect {
    params: StrobeParams,
    start_time: f64,
    color: Rgbcct,
    phase: f64,
}

impl StrobeEffect {
    pub fn new(params: StrobeParams) -> Self {
        Self {
            params,
            start_time: 0.0,
            color: Rgbcct::BLACK,
            phase: 0.0,
        }
    }
}

impl Effect for StrobeEffect {
    fn name(&self) -> &'static str {
        EFFECT_NAME_STROBE
    }

    fn kind(&self) -> EffectKind {
        EffectKind::Continuous
    }

    fn initialize(&mut self, ctx: &EffectContext) {
        self.start_time = ctx.elapsed_time;
        self.color = ctx.colors.resolve_color(&self.params.color_preset);
        self.phase = 0.0;
    }

    fn compute(&mut self, ctx: &EffectContext) -> Vec<PanelState> {
        let elapsed = ctx.elapsed_time - self.start_time;
        let cycle = 1000.0 / self.params.frequency;
        self.phase = elapsed.rem_euclid(cycle) / cycle;

        let brightness = if self.phase < self.params.duty_cycle {
            self.params.brightness
        } else {
            0.0
        };

        vec![PanelState::new(self.color, brightness); ctx.grid.len()]
    }

    fn progress(&self) -> f64 {
        self.phase
    }
}

#[cfg(test)]
mod tests {
    use crate::color::ColorManager;
    use crate::grid::{PanelGrid, TopologyMode};

    use super::*;

    fn ctx<'a>(grid: &'a PanelGrid, colors: &'a ColorManager, elapsed: f64) -> EffectContext<'a> {
        EffectContext {
            delta_time: 16.0,
            elapsed_time: elapsed,
            grid,
            colors,
        }
    }

    #[test]
    fn ten_hertz_half_duty_alternates_every_fifty_ms() {
        let grid = PanelGrid::new(2, 7, TopologyMode::Circular);
        let colors = ColorManager::with_defaults();
        let mut effect = StrobeEffect::new(StrobeParams {
            color_preset: "white".to_string(),
            frequency: 10.0,
            duty_cycle: 0.5,
            brightness: 1.0,
        });

        effect.initialize(&ctx(&grid, &colors, 0.0));

        let on = effect.compute(&ctx(&grid, &colors, 0.0));
        assert!(on.iter().all(|s| s.brightness == 1.0));

        let off = effect.compute(&ctx(&grid, &colors, 51.0));
        assert!(off.iter().all(|s| s.brightness == 0.0));

        let on_again = effect.compute(&ctx(&grid, &colors, 101.0));
        assert!(on_again.iter().all(|s| s.brightness == 1.0));
    }

    #[test]
    fn color_is_uniform_and_resolved_once() {
        let grid = PanelGrid::new(1, 3, TopologyMode::Linear);
        let colors = ColorManager::with_defaults();
        let mut effect = StrobeEffect::new(StrobeParams::default());

        effect.initialize(&ctx(&grid, &colors, 0.0));
        let states = effect.compute(&ctx(&grid, &colors, 10.0));
        assert!(states
            .iter()
            .all(|s| s.color == Rgbcct::new(255, 255, 255, 255, 0)));
    }
}
