//! Typed per-effect parameters.
//!
//! Wire commands carry params as a JSON object; each effect deserializes
//! them into its own struct, so missing options fall back to the effect's
//! defaults and type mismatches are rejected at the command boundary.

use serde::{Deserialize, Serialize};

use crate::color::Rgbcct;

/// Flow traversal mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowMode {
    #[default]
    Full,
    Chase,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SolidParams {
    pub color_preset: String,
    pub brightness: f64,
    /// Fade-in duration in milliseconds.
    pub transition_duration: f64,
    pub start_color: Option<Rgbcct>,
}

impl Default for SolidParams {
    fn default() -> Self {
        Self {
            color_preset: "white".to_string(),
            brightness: 1.0,
            transition_duration: 1000.0,
            start_color: None,
        }
    }
}

impl SolidParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.transition_duration < 0.0 {
            return Err("transitionDuration must not be negative".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SequentialParams {
    pub color_preset: String,
    pub brightness: f64,
    /// Per-panel start offset in milliseconds.
    pub delay_between_panels: f64,
    /// Per-panel fade duration in milliseconds.
    pub fade_duration: f64,
    /// Overall duration override; when set it is split 30/70 between the
    /// accumulated delays and the fade.
    pub transition_duration: Option<f64>,
    pub start_color: Option<Rgbcct>,
}

impl Default for SequentialParams {
    fn default() -> Self {
        Self {
            color_preset: "white".to_string(),
            brightness: 1.0,
            delay_between_panels: 200.0,
            fade_duration: 1000.0,
            transition_duration: None,
            start_color: None,
        }
    }
}

impl SequentialParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.delay_between_panels < 0.0 || self.fade_duration < 0.0 {
            return Err("delayBetweenPanels and fadeDuration must not be negative".to_string());
        }
        if matches!(self.transition_duration, Some(d) if d < 0.0) {
            return Err("transitionDuration must not be negative".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FlowParams {
    pub color_preset: String,
    /// Gradient cycles per second.
    pub speed: f64,
    pub brightness: f64,
    pub mode: FlowMode,
    /// Panels in the bright zone (chase mode only).
    pub chase_length: f64,
    /// Optional sine brightness modulation depth in [0,1].
    pub wave_height: f64,
    /// Fraction of the gradient shown across one sequence; negative reverses.
    pub scale: f64,
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            color_preset: "rainbow".to_string(),
            speed: 0.2,
            brightness: 1.0,
            mode: FlowMode::Full,
            chase_length: 3.0,
            wave_height: 0.0,
            scale: 1.0,
        }
    }
}

impl FlowParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.mode == FlowMode::Chase && self.chase_length <= 0.0 {
            return Err("chaseLength must be positive in chase mode".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StrobeParams {
    pub color_preset: String,
    pub brightness: f64,
    /// Flash rate in Hz.
    pub frequency: f64,
    /// On-fraction of each cycle in [0,1].
    pub duty_cycle: f64,
}

impl Default for StrobeParams {
    fn default() -> Self {
        Self {
            color_preset: "white".to_string(),
            brightness: 1.0,
            frequency: 10.0,
            duty_cycle: 0.5,
        }
    }
}

impl StrobeParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.frequency <= 0.0 {
            return Err("frequency must be positive".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlackoutParams {
    /// Fade-out duration in milliseconds; zero blacks out on the first tick.
    pub transition_duration: f64,
}

impl Default for BlackoutParams {
    fn default() -> Self {
        Self {
            transition_duration: 500.0,
        }
    }
}

impl BlackoutParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.transition_duration < 0.0 {
            return Err("transitionDuration must not be negative".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StaticParams {
    /// Per-panel target colors; entries beyond the list pad to black.
    pub panel_colors: Vec<Rgbcct>,
    pub brightness: f64,
    pub transition_duration: f64,
}

impl Default for StaticParams {
    fn default() -> Self {
        Self {
            panel_colors: Vec::new(),
            brightness: 1.0,
            transition_duration: 500.0,
        }
    }
}

impl StaticParams {
    pub fn validate(&self, panel_count: usize) -> Result<(), String> {
        if self.panel_colors.len() > panel_count {
            return Err(format!(
                "panelColors has {} entries but the grid has {} panels",
                self.panel_colors.len(),
                panel_count
            ));
        }
        if self.transition_duration < 0.0 {
            return Err("transitionDuration must not be negative".to_string());
        }
        Ok(())
    }
}
