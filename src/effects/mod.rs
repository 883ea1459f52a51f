//! Effect state machines with compile-time known variants.
//!
//! All effects live in one closed enum so dispatch stays exhaustive; each
//! variant implements the [`Effect`] trait.

mod blackout;
mod flow;
mod params;
mod sequential;
mod solid;
mod static_color;
mod strobe;

use serde_json::Value;
use thiserror::Error;

pub use blackout::BlackoutEffect;
pub use flow::FlowEffect;
pub use params::{
    BlackoutParams, FlowMode, FlowParams, SequentialParams, SolidParams, StaticParams,
    StrobeParams,
};
pub use sequential::SequentialFadeEffect;
pub use solid::SolidEffect;
pub use static_color::StaticEffect;
pub use strobe::StrobeEffect;

use crate::{color::ColorManager, grid::{PanelGrid, PanelState}};

pub const EFFECT_NAME_SOLID: &str = "solid";
pub const EFFECT_NAME_SEQUENTIAL: &str = "sequential";
pub const EFFECT_NAME_FLOW: &str = "flow";
pub const EFFECT_NAME_STROBE: &str = "strobe";
pub const EFFECT_NAME_BLACKOUT: &str = "blackout";
pub const EFFECT_NAME_STATIC: &str = "static";

/// Whether an effect terminates on its own or runs until superseded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Continuous,
    OneShot,
}

/// Per-frame inputs handed to an effect's compute step.
///
/// Effects read the grid and color manager through shared references; only
/// the engine writes panel state back.
pub struct EffectContext<'a> {
    /// Milliseconds since the previous tick.
    pub delta_time: f64,
    /// Milliseconds since the engine started.
    pub elapsed_time: f64,
    pub grid: &'a PanelGrid,
    pub colors: &'a ColorManager,
}

/// Shared protocol implemented by every effect variant.
pub trait Effect {
    fn name(&self) -> &'static str;

    fn kind(&self) -> EffectKind;

    /// Capture start time and resolve colors against the current context.
    fn initialize(&mut self, ctx: &EffectContext);

    /// Produce one frame of panel states, one entry per panel id.
    fn compute(&mut self, ctx: &EffectContext) -> Vec<PanelState>;

    fn cleanup(&mut self) {}

    fn is_done(&self) -> bool {
        false
    }

    /// Completion (one-shot) or cycle position (continuous) in [0,1].
    fn progress(&self) -> f64;
}

/// Quadratic ease-out: fast start, soft landing.
pub fn ease_out_quad(t: f64) -> f64 {
    t * (2.0 - t)
}

/// Quadratic ease-in-out.
pub fn ease_in_out_quad(t: f64) -> f64 {
    if t < 0.5 {
        2.0 * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(2) / 2.0
    }
}

/// Cubic ease-out.
pub fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

#[derive(Debug, Error)]
pub enum BuildEffectError {
    #[error("unknown effect `{0}`")]
    UnknownEffect(String),
    #[error("invalid effect params: {0}")]
    InvalidParams(String),
}

/// Enum containing every effect variant.
#[derive(Debug, Clone)]
pub enum EffectSlot {
    Solid(SolidEffect),
    SequentialFade(SequentialFadeEffect),
    Flow(FlowEffect),
    Strobe(StrobeEffect),
    Blackout(BlackoutEffect),
    Static(StaticEffect),
}

impl EffectSlot {
    /// Build an effect from its wire name and raw params.
    ///
    /// Missing params fall back to the effect's defaults; wrong types and
    /// out-of-range values are rejected here, before the engine sees the
    /// request.
    pub fn from_request(
        name: &str,
        params: Value,
        panel_count: usize,
    ) -> Result<EffectSlot, BuildEffectError> {
        let invalid = |err: String| BuildEffectError::InvalidParams(err);

        match name {
            EFFECT_NAME_SOLID => {
                let params: SolidParams = parse_params(params)?;
                params.validate().map_err(invalid)?;
                Ok(EffectSlot::Solid(SolidEffect::new(params)))
            }
            EFFECT_NAME_SEQUENTIAL => {
                let params: SequentialParams = parse_params(params)?;
                params.validate().map_err(invalid)?;
                Ok(EffectSlot::SequentialFade(SequentialFadeEffect::new(params)))
            }
            EFFECT_NAME_FLOW => {
                let params: FlowParams = parse_params(params)?;
                params.validate().map_err(invalid)?;
                Ok(EffectSlot::Flow(FlowEffect::new(params)))
            }
            EFFECT_NAME_STROBE => {
                let params: StrobeParams = parse_params(params)?;
                params.validate().map_err(invalid)?;
                Ok(EffectSlot::Strobe(StrobeEffect::new(params)))
            }
            EFFECT_NAME_BLACKOUT => {
                let params: BlackoutParams = parse_params(params)?;
                params.validate().map_err(invalid)?;
                Ok(EffectSlot::Blackout(BlackoutEffect::new(params)))
            }
            EFFECT_NAME_STATIC => {
                let params: StaticParams = parse_params(params)?;
                params.validate(panel_count).map_err(invalid)?;
                Ok(EffectSlot::Static(StaticEffect::new(params)))
            }
            other => Err(BuildEffectError::UnknownEffect(other.to_string())),
        }
    }

    fn inner(&self) -> &dyn Effect {
        match self {
            Self::Solid(effect) => effect,
            Self::SequentialFade(effect) => effect,
            Self::Flow(effect) => effect,
            Self::Strobe(effect) => effect,
            Self::Blackout(effect) => effect,
            Self::Static(effect) => effect,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn Effect {
        match self {
            Self::Solid(effect) => effect,
            Self::SequentialFade(effect) => effect,
            Self::Flow(effect) => effect,
            Self::Strobe(effect) => effect,
            Self::Blackout(effect) => effect,
            Self::Static(effect) => effect,
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner().name()
    }

    pub fn kind(&self) -> EffectKind {
        self.inner().kind()
    }

    pub fn initialize(&mut self, ctx: &EffectContext) {
        self.inner_mut().initialize(ctx);
    }

    pub fn compute(&mut self, ctx: &EffectContext) -> Vec<PanelState> {
        self.inner_mut().compute(ctx)
    }

    pub fn cleanup(&mut self) {
        self.inner_mut().cleanup();
    }

    pub fn is_done(&self) -> bool {
        self.inner().is_done()
    }

    pub fn progress(&self) -> f64 {
        self.inner().progress()
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(value: Value) -> Result<T, BuildEffectError> {
    let value = if value.is_null() {
        Value::Object(serde_json::Map::new())
    } else {
        value
    };
    serde_json::from_value(value).map_err(|err| BuildEffectError::InvalidParams(err.to_string()))
}
