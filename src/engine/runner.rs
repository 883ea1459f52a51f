//! Holds and drives the single active effect.

use tracing::debug;

use crate::effects::{EffectContext, EffectKind, EffectSlot};
use crate::grid::PanelState;

/// At most one effect runs at a time; a new effect supersedes the previous
/// one, and one-shot effects clear themselves on completion.
#[derive(Debug, Default)]
pub struct EffectRunner {
    current: Option<EffectSlot>,
}

impl EffectRunner {
    /// Install a new effect, cleaning up any previous one.
    ///
    /// A static request arriving while a static effect runs retargets the
    /// running instance instead, so repeated updates keep their transition.
    pub fn set_effect(&mut self, effect: EffectSlot, ctx: &EffectContext) {
        if let (Some(EffectSlot::Static(current)), EffectSlot::Static(incoming)) =
            (&mut self.current, &effect)
        {
            current.retarget(incoming.params().clone());
            return;
        }

        self.clear();
        let mut effect = effect;
        effect.initialize(ctx);
        debug!(effect = effect.name(), "effect started");
        self.current = Some(effect);
    }

    /// Stop and clean up the active effect, if any.
    pub fn clear(&mut self) {
        if let Some(mut previous) = self.current.take() {
            previous.cleanup();
            debug!(effect = previous.name(), "effect stopped");
        }
    }

    /// Drop the active effect without running its cleanup.
    ///
    /// Used after a panic inside compute, where cleanup cannot be trusted.
    pub fn abort(&mut self) {
        self.current = None;
    }

    /// Compute one frame from the active effect, clearing finished
    /// one-shots. Returns `None` when idle.
    pub fn update(&mut self, ctx: &EffectContext) -> Option<Vec<PanelState>> {
        let effect = self.current.as_mut()?;
        let states = effect.compute(ctx);

        if effect.kind() == EffectKind::OneShot && effect.is_done() {
            effect.cleanup();
            debug!(effect = effect.name(), "one-shot effect completed");
            self.current = None;
        }

        Some(states)
    }

    pub fn current_name(&self) -> Option<&'static str> {
        self.current.as_ref().map(EffectSlot::name)
    }

    pub fn progress(&self) -> Option<f64> {
        self.current.as_ref().map(EffectSlot::progress)
    }

    pub fn is_idle(&self) -> bool {
        self.current.is_none()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use crate::color::ColorManager;
    use crate::effects::EFFECT_NAME_STATIC;
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

    fn slot(name: &str, params: Value) -> EffectSlot {
        EffectSlot::from_request(name, params, 4).unwrap()
    }

    #[test]
    fn idle_runner_returns_none() {
        let grid = PanelGrid::new(1, 4, TopologyMode::Linear);
        let colors = ColorManager::with_defaults();
        let mut runner = EffectRunner::default();
        assert!(runner.update(&ctx(&grid, &colors, 0.0)).is_none());
        assert!(runner.current_name().is_none());
    }

    #[test]
    fn one_shot_clears_itself_after_completion() {
        let grid = PanelGrid::new(1, 4, TopologyMode::Linear);
        let colors = ColorManager::with_defaults();
        let mut runner = EffectRunner::default();

        runner.set_effect(
            slot("solid", json!({"transitionDuration": 0})),
            &ctx(&grid, &colors, 0.0),
        );
        assert_eq!(runner.current_name(), Some("solid"));

        let states = runner.update(&ctx(&grid, &colors, 10.0)).unwrap();
        assert_eq!(states.len(), 4);
        assert!(runner.is_idle());
        assert!(runner.update(&ctx(&grid, &colors, 20.0)).is_none());
    }

    #[test]
    fn new_effect_supersedes_the_previous_one() {
        let grid = PanelGrid::new(1, 4, TopologyMode::Linear);
        let colors = ColorManager::with_defaults();
        let mut runner = EffectRunner::default();
        let context = ctx(&grid, &colors, 0.0);

        runner.set_effect(slot("strobe", Value::Null), &context);
        runner.set_effect(slot("flow", Value::Null), &context);
        assert_eq!(runner.current_name(), Some("flow"));
    }

    #[test]
    fn static_over_static_retargets_in_place() {
        let grid = PanelGrid::new(1, 2, TopologyMode::Linear);
        let colors = ColorManager::with_defaults();
        let mut runner = EffectRunner::default();
        let context = ctx(&grid, &colors, 0.0);

        runner.set_effect(
            EffectSlot::from_request(
                EFFECT_NAME_STATIC,
                json!({"panelColors": [{"r": 255, "g": 0, "b": 0}], "transitionDuration": 0}),
                2,
            )
            .unwrap(),
            &context,
        );
        runner.update(&context);

        runner.set_effect(
            EffectSlot::from_request(
                EFFECT_NAME_STATIC,
                json!({"panelColors": [{"r": 0, "g": 0, "b": 255}], "transitionDuration": 0}),
                2,
            )
            .unwrap(),
            &context,
        );

        // Still the same static instance, now aimed at the new colors.
        assert_eq!(runner.current_name(), Some(EFFECT_NAME_STATIC));
        let states = runner.update(&ctx(&grid, &colors, 10.0)).unwrap();
        assert_eq!(states[0].color.b, 255);
    }
}
