//! Named color preset registry.

use indexmap::IndexMap;
use serde_json::Value;
use tracing::warn;

use super::{ColorPreset, ColorSpace, Gradient, GradientStop, Rgbcct};

/// Holds the named color presets effects resolve against.
///
/// Presets coming from the configuration file are validated one by one;
/// invalid entries are skipped with a warning instead of failing startup.
#[derive(Debug, Default)]
pub struct ColorManager {
    presets: IndexMap<String, ColorPreset>,
}

impl ColorManager {
    /// Manager pre-populated with the built-in presets referenced by the
    /// seeded effect presets.
    pub fn with_defaults() -> Self {
        let mut manager = Self::default();
        for (name, preset) in builtin_presets() {
            manager.add_preset(name, preset);
        }
        manager
    }

    pub fn add_preset(&mut self, name: impl Into<String>, mut preset: ColorPreset) {
        if let ColorPreset::Gradient(gradient) = &mut preset {
            gradient.normalize();
        }
        self.presets.insert(name.into(), preset);
    }

    pub fn get_preset(&self, name: &str) -> Option<&ColorPreset> {
        self.presets.get(name)
    }

    pub fn has_preset(&self, name: &str) -> bool {
        self.presets.contains_key(name)
    }

    pub fn remove_preset(&mut self, name: &str) -> Option<ColorPreset> {
        self.presets.shift_remove(name)
    }

    pub fn list_presets(&self) -> Vec<&str> {
        self.presets.keys().map(String::as_str).collect()
    }

    /// Merge raw config entries into the registry, skipping entries that do
    /// not deserialize into a valid preset.
    pub fn load_presets_from_config(&mut self, raw: &IndexMap<String, Value>) {
        for (name, value) in raw {
            match serde_json::from_value::<ColorPreset>(value.clone()) {
                Ok(preset) => self.add_preset(name.clone(), preset),
                Err(err) => {
                    warn!(preset = %name, error = %err, "skipping invalid color preset from config");
                }
            }
        }
    }

    /// Resolve a preset name to one representative color.
    ///
    /// Solids resolve to their color, gradients to their midpoint sample,
    /// and unknown names fall back to pure cool white.
    pub fn resolve_color(&self, name: &str) -> Rgbcct {
        self.get_preset(name)
            .map(ColorPreset::representative_color)
            .unwrap_or(Rgbcct::WHITE)
    }

    /// Resolve a preset name to a gradient.
    ///
    /// Solids become degenerate two-stop gradients; unknown names fall back
    /// to a red-to-blue RGB gradient.
    pub fn resolve_gradient(&self, name: &str) -> Gradient {
        match self.get_preset(name) {
            Some(ColorPreset::Gradient(gradient)) => gradient.clone(),
            Some(ColorPreset::Solid { color }) => Gradient::solid(*color),
            None => Gradient::between(
                Rgbcct::new(255, 0, 0, 0, 0),
                Rgbcct::new(0, 0, 255, 0, 0),
            ),
        }
    }
}

/// Built-in presets shipped with the binary; the protected effect presets
/// reference these by name.
fn builtin_presets() -> Vec<(&'static str, ColorPreset)> {
    let rainbow_stops = [
        (0.0, Rgbcct::new(255, 0, 0, 0, 0)),
        (0.2, Rgbcct::new(255, 255, 0, 0, 0)),
        (0.4, Rgbcct::new(0, 255, 0, 0, 0)),
        (0.6, Rgbcct::new(0, 255, 255, 0, 0)),
        (0.8, Rgbcct::new(0, 0, 255, 0, 0)),
        (1.0, Rgbcct::new(255, 0, 255, 0, 0)),
    ];
    let breathe_stops = [
        (0.0, Rgbcct::new(20, 0, 60, 0, 30)),
        (0.5, Rgbcct::new(120, 40, 200, 0, 80)),
        (1.0, Rgbcct::new(20, 0, 60, 0, 30)),
    ];

    vec![
        (
            "white",
            ColorPreset::Solid {
                color: Rgbcct::new(255, 255, 255, 255, 0),
            },
        ),
        (
            "warm",
            ColorPreset::Solid {
                color: Rgbcct::new(255, 180, 107, 0, 255),
            },
        ),
        (
            "rainbow",
            ColorPreset::Gradient(Gradient {
                stops: rainbow_stops
                    .iter()
                    .map(|&(position, color)| GradientStop { position, color })
                    .collect(),
                color_space: ColorSpace::Hsv,
            }),
        ),
        (
            "breathe",
            ColorPreset::Gradient(Gradient {
                stops: breathe_stops
                    .iter()
                    .map(|&(position, color)| GradientStop { position, color })
                    .collect(),
                color_space: ColorSpace::Rgb,
            }),
        ),
    ]
}
