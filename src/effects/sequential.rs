//! Sequential fade: panels fade in one after another along each sequence.

use crate::color::{Rgbcct, blend_rgbcct, clamp_unit};
use crate::grid::PanelState;

use super::{
    EFFECT_NAME_SEQUENTIAL, Effect, EffectContext, EffectKind, SequentialParams, ease_out_quad,
};

#[derive(Debug, Clone)]
pub struct SequentialFadeEffect {
    params: SequentialParams,
    start_time: f64,
    start_color: Rgbcct,
    target_color: Rgbcct,
    delay: f64,
    fade: f64,
    min_progress: f64,
}

impl SequentialFadeEffect {
    pub fn new(params: SequentialParams) -> Self {
        Self {
            params,
            start_time: 0.0,
            start_color: Rgbcct::BLACK,
            target_color: Rgbcct::BLACK,
            delay: 0.0,
            fade: 0.0,
            min_progress: 0.0,
        }
    }

    fn local_progress(&self, elapsed: f64, seq_index: usize) -> f64 {
        let offset = elapsed - seq_index as f64 * self.delay;
        if self.fade <= 0.0 {
            if offset >= 0.0 { 1.0 } else { 0.0 }
        } else {
            clamp_unit(offset / self.fade)
        }
    }
}

impl Effect for SequentialFadeEffect {
    fn name(&self) -> &'static str {
        EFFECT_NAME_SEQUENTIAL
    }

    fn kind(&self) -> EffectKind {
        EffectKind::OneShot
    }

    fn initialize(&mut self, ctx: &EffectContext) {
        self.start_time = ctx.elapsed_time;
        self.start_color = self.params.start_color.unwrap_or(Rgbcct::BLACK);
        self.target_color = ctx.colors.resolve_color(&self.params.color_preset);
        self.min_progress = 0.0;

        // An overall duration splits 30/70 between accumulated delay and fade.
        if let Some(duration) = self.params.transition_duration {
            let panels = ctx.grid.len().max(1) as f64;
            self.delay = 0.3 * duration / panels;
            self.fade = 0.7 * duration;
        } else {
            self.delay = self.params.delay_between_panels;
            self.fade = self.params.fade_duration;
        }
    }

    fn compute(&mut self, ctx: &EffectContext) -> Vec<PanelState> {
        let elapsed = ctx.elapsed_time - self.start_time;
        let mut states =
            vec![PanelState::new(self.start_color, self.params.brightness); ctx.grid.len()];
        let mut min_progress = 1.0f64;

        for sequence in ctx.grid.sequences() {
            for (seq_index, &panel_id) in sequence.iter().enumerate() {
                let local = self.local_progress(elapsed, seq_index);
                min_progress = min_progress.min(local);

                let eased = ease_out_quad(local);
                let color = blend_rgbcct(self.start_color, self.target_color, eased);
                states[panel_id] = PanelState::new(color, self.params.brightness);
            }
        }

        self.min_progress = min_progress;
        states
    }

    fn is_done(&self) -> bool {
        self.min_progress >= 1.0
    }

    fn progress(&self) -> f64 {
        self.min_progress
    }
}

#[cfg(test)]
mod tests {
    use crate::color::{ColorManager, ColorPreset};
    use crate::grid::{PanelGrid, TopologyMode};

    use super::*;

    fn red_manager() -> ColorManager {
        let mut colors = ColorManager::default();
        colors.add_preset(
            "red",
            ColorPreset::Solid {
                color: Rgbcct::new(255, 0, 0, 0, 0),
            },
        );
        colors
    }

    fn ctx<'a>(grid: &'a PanelGrid, colors: &'a ColorManager, elapsed: f64) -> EffectContext<'a> {
        EffectContext {
            delta_time: 16.0,
            elapsed_time: elapsed,
            grid,
            colors,
        }
    }

    #[test]
    fn panels_start_one_after_another_per_sequence() {
        let grid = PanelGrid::new(2, 7, TopologyMode::Linear);
        let colors = red_manager();
        let mut effect = SequentialFadeEffect::new(SequentialParams {
            color_preset: "red".to_string(),
            delay_between_panels: 100.0,
            fade_duration: 500.0,
            transition_duration: None,
            ..SequentialParams::default()
        });

        effect.initialize(&ctx(&grid, &colors, 0.0));
        let states = effect.compute(&ctx(&grid, &colors, 150.0));

        // Sequence index 0 in both columns: progress 0.3, eased 0.51.
        let eased0 = ease_out_quad(0.3);
        let expected0 = (255.0 * eased0).round() as u8;
        assert_eq!(states[0].color.r, expected0);
        assert_eq!(states[7].color.r, expected0);

        // Sequence index 1: progress 0.1, eased 0.19.
        let eased1 = ease_out_quad(0.1);
        assert_eq!(states[1].color.r, (255.0 * eased1).round() as u8);

        // Index 2 onward has not started yet.
        for id in [2, 3, 4, 5, 6] {
            assert_eq!(states[id].color, Rgbcct::BLACK, "panel {id}");
        }
        assert!(!effect.is_done());
    }

    #[test]
    fn overall_duration_splits_thirty_seventy() {
        let grid = PanelGrid::new(2, 7, TopologyMode::Linear);
        let colors = red_manager();
        let mut effect = SequentialFadeEffect::new(SequentialParams {
            color_preset: "red".to_string(),
            transition_duration: Some(1400.0),
            ..SequentialParams::default()
        });

        effect.initialize(&ctx(&grid, &colors, 0.0));
        assert!((effect.delay - 0.3 * 1400.0 / 14.0).abs() < 1e-9);
        assert!((effect.fade - 0.7 * 1400.0).abs() < 1e-9);
    }

    #[test]
    fn completes_once_every_panel_finishes() {
        let grid = PanelGrid::new(2, 2, TopologyMode::Linear);
        let colors = red_manager();
        let mut effect = SequentialFadeEffect::new(SequentialParams {
            color_preset: "red".to_string(),
            delay_between_panels: 100.0,
            fade_duration: 200.0,
            transition_duration: None,
            ..SequentialParams::default()
        });

        effect.initialize(&ctx(&grid, &colors, 0.0));
        effect.compute(&ctx(&grid, &colors, 250.0));
        assert!(!effect.is_done());

        let states = effect.compute(&ctx(&grid, &colors, 400.0));
        assert!(effect.is_done());
        assert!(states.iter().all(|s| s.color.r == 255));
    }
}
