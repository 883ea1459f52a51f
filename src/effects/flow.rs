//! Flow effect: a gradient travels along each topology sequence.

use std::f64::consts::PI;

use crate::color::{Gradient, clamp_unit};
use crate::grid::{PanelState, TopologyMode};

use super::{EFFECT_NAME_FLOW, Effect, EffectContext, EffectKind, FlowMode, FlowParams};

#[derive(Debug, Clone)]
pub struct FlowEffect {
    params: FlowParams,
    start_time: f64,
    gradient: Gradient,
    time_offset: f64,
}

impl FlowEffect {
    pub fn new(params: FlowParams) -> Self {
        Self {
            params,
            start_time: 0.0,
            gradient: Gradient::solid(crate::color::Rgbcct::BLACK),
            time_offset: 0.0,
        }
    }

    fn panel_brightness(&self, normalized: f64, sequence_len: f64) -> f64 {
        let mut brightness = clamp_unit(self.params.brightness);

        if self.params.mode == FlowMode::Chase {
            let distance = normalized.min(1.0 - normalized);
            let falloff = self.params.chase_length / sequence_len;
            brightness = if distance < falloff {
                brightness * (1.0 - distance / falloff)
            } else {
                0.0
            };
        }

        if self.params.wave_height > 0.0 {
            let wave = (4.0 * PI * normalized + 2.0 * PI * self.time_offset).sin();
            brightness += brightness * self.params.wave_height * wave;
            brightness = clamp_unit(brightness);
        }

        brightness
    }
}

impl Effect for FlowEffect {
    fn name(&self) -> &'static str {
        EFFECT_NAME_FLOW
    }

    fn kind(&self) -> EffectKind {
        EffectKind::Continuous
    }

    fn initialize(&mut self, ctx: &EffectContext) {
        self.start_time = ctx.elapsed_time;
        self.gradient = ctx.colors.resolve_gradient(&self.params.color_preset);
        self.time_offset = 0.0;
    }

    fn compute(&mut self, ctx: &EffectContext) -> Vec<PanelState> {
        let elapsed = ctx.elapsed_time - self.start_time;
        self.time_offset = (elapsed * self.params.speed / 1000.0).rem_euclid(1.0);

        // Singular topology shows one traveling color on every panel.
        if ctx.grid.mode() == TopologyMode::Singular {
            let color = self.gradient.sample(self.time_offset);
            let state = PanelState::new(color, self.params.brightness);
            return vec![state; ctx.grid.len()];
        }

        let mut states = vec![PanelState::black(); ctx.grid.len()];
        for sequence in ctx.grid.sequences() {
            let len = sequence.len().max(1) as f64;
            for (seq_index, &panel_id) in sequence.iter().enumerate() {
                let normalized = seq_index as f64 / len;
                let gradient_pos =
                    (normalized * self.params.scale + self.time_offset).rem_euclid(1.0);
                let color = self.gradient.sample(gradient_pos);
                states[panel_id] =
                    PanelState::new(color, self.panel_brightness(normalized, len));
            }
        }

        states
    }

    fn progress(&self) -> f64 {
        self.time_offset
    }
}
