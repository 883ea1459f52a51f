//! Gradient model and position sampling.

use serde::{Deserialize, Serialize};

use super::{Rgbcct, blend_rgbcct, blend_rgbcct_hsv, clamp_unit};

/// Interpolation space used between gradient stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorSpace {
    #[default]
    Rgb,
    Hsv,
}

/// A single positioned stop inside a gradient.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradientStop {
    pub position: f64,
    pub color: Rgbcct,
}

/// Ordered color stops with an interpolation color space.
///
/// `normalize` must run after deserialization so the stops are sorted by
/// position ascending; sampling assumes that invariant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Gradient {
    pub stops: Vec<GradientStop>,
    #[serde(default)]
    pub color_space: ColorSpace,
}

impl Gradient {
    /// Two-stop gradient between `from` and `to` in RGB space.
    pub fn between(from: Rgbcct, to: Rgbcct) -> Self {
        Self {
            stops: vec![
                GradientStop {
                    position: 0.0,
                    color: from,
                },
                GradientStop {
                    position: 1.0,
                    color: to,
                },
            ],
            color_space: ColorSpace::Rgb,
        }
    }

    /// Degenerate gradient that samples to the same color everywhere.
    pub fn solid(color: Rgbcct) -> Self {
        Self::between(color, color)
    }

    /// Sort stops by position ascending and clamp positions into [0,1].
    pub fn normalize(&mut self) {
        for stop in &mut self.stops {
            stop.position = clamp_unit(stop.position);
        }
        self.stops
            .sort_by(|a, b| a.position.total_cmp(&b.position));
    }

    /// Sample the gradient at position `p` in [0,1].
    ///
    /// RGB channels interpolate in the gradient's declared color space;
    /// the white channels are always linear.
    pub fn sample(&self, p: f64) -> Rgbcct {
        let p = clamp_unit(p);

        let (Some(first), Some(last)) = (self.stops.first(), self.stops.last()) else {
            return Rgbcct::BLACK;
        };

        if self.stops.len() == 1 || p <= first.position {
            return first.color;
        }
        if p >= last.position {
            return last.color;
        }

        // Find the adjacent pair bracketing p.
        let hi_index = self
            .stops
            .iter()
            .position(|stop| stop.position >= p)
            .unwrap_or(self.stops.len() - 1);
        let lo = self.stops[hi_index - 1];
        let hi = self.stops[hi_index];

        let range = hi.position - lo.position;
        let local = if range == 0.0 {
            0.0
        } else {
            (p - lo.position) / range
        };

        match self.color_space {
            ColorSpace::Rgb => blend_rgbcct(lo.color, hi.color, local),
            ColorSpace::Hsv => blend_rgbcct_hsv(lo.color, hi.color, local),
        }
    }
}

/// A named color preset: either one solid color or a gradient.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ColorPreset {
    Solid { color: Rgbcct },
    Gradient(Gradient),
}

impl ColorPreset {
    /// Collapse the preset to one representative color: solids as-is,
    /// gradients sampled at their midpoint.
    pub fn representative_color(&self) -> Rgbcct {
        match self {
            ColorPreset::Solid { color } => *color,
            ColorPreset::Gradient(gradient) => gradient.sample(0.5),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rgb(r: u8, g: u8, b: u8) -> Rgbcct {
        Rgbcct::new(r, g, b, 0, 0)
    }

    fn three_stop() -> Gradient {
        Gradient {
            stops: vec![
                GradientStop {
                    position: 0.0,
                    color: rgb(255, 0, 0),
                },
                GradientStop {
                    position: 0.5,
                    color: rgb(0, 255, 0),
                },
                GradientStop {
                    position: 1.0,
                    color: rgb(0, 0, 255),
                },
            ],
            color_space: ColorSpace::Rgb,
        }
    }

    #[test]
    fn sample_is_exact_at_stop_positions() {
        let g = three_stop();
        for stop in &g.stops {
            assert_eq!(g.sample(stop.position), stop.color);
        }
    }

    #[test]
    fn sample_clamps_out_of_range_positions() {
        let g = three_stop();
        assert_eq!(g.sample(-0.5), rgb(255, 0, 0));
        assert_eq!(g.sample(1.5), rgb(0, 0, 255));
    }

    #[test]
    fn empty_gradient_samples_black() {
        let g = Gradient {
            stops: vec![],
            color_space: ColorSpace::Rgb,
        };
        assert_eq!(g.sample(0.5), Rgbcct::BLACK);
    }

    #[test]
    fn single_stop_samples_that_color_everywhere() {
        let g = Gradient {
            stops: vec![GradientStop {
                position: 0.7,
                color: rgb(10, 20, 30),
            }],
            color_space: ColorSpace::Rgb,
        };
        assert_eq!(g.sample(0.0), rgb(10, 20, 30));
        assert_eq!(g.sample(1.0), rgb(10, 20, 30));
    }

    #[test]
    fn rgb_sampling_commutes_with_reversal() {
        let g = three_stop();
        let mut reversed = g.clone();
        for stop in &mut reversed.stops {
            stop.position = 1.0 - stop.position;
        }
        reversed.normalize();

        for p in [0.0, 0.1, 0.25, 0.4, 0.5, 0.75, 0.9, 1.0] {
            let forward = g.sample(p);
            let backward = reversed.sample(1.0 - p);
            assert_eq!(forward, backward, "mismatch at p={p}");
        }
    }

    #[test]
    fn normalize_sorts_stops() {
        let mut g = Gradient {
            stops: vec![
                GradientStop {
                    position: 1.0,
                    color: rgb(0, 0, 255),
                },
                GradientStop {
                    position: 0.0,
                    color: rgb(255, 0, 0),
                },
            ],
            color_space: ColorSpace::Rgb,
        };
        g.normalize();
        assert_eq!(g.stops[0].position, 0.0);
        assert_eq!(g.sample(0.0), rgb(255, 0, 0));
    }

    #[test]
    fn hsv_gradient_midpoint_goes_through_magenta() {
        let g = Gradient {
            stops: vec![
                GradientStop {
                    position: 0.0,
                    color: rgb(255, 0, 0),
                },
                GradientStop {
                    position: 1.0,
                    color: rgb(0, 0, 255),
                },
            ],
            color_space: ColorSpace::Hsv,
        };
        let mid = g.sample(0.5);
        assert!(mid.r > 200 && mid.b > 200 && mid.g < 30, "got {mid:?}");
    }

    #[test]
    fn preset_representative_color() {
        let solid = ColorPreset::Solid {
            color: rgb(1, 2, 3),
        };
        assert_eq!(solid.representative_color(), rgb(1, 2, 3));

        let gradient = ColorPreset::Gradient(Gradient::between(rgb(0, 0, 0), rgb(200, 0, 0)));
        assert_eq!(gradient.representative_color(), rgb(100, 0, 0));
    }

    #[test]
    fn preset_wire_shape() {
        let json = r#"{"type":"gradient","stops":[{"position":0,"color":{"r":255,"g":0,"b":0}}],"colorSpace":"hsv"}"#;
        let preset: ColorPreset = serde_json::from_str(json).unwrap();
        match preset {
            ColorPreset::Gradient(g) => {
                assert_eq!(g.color_space, ColorSpace::Hsv);
                assert_eq!(g.stops.len(), 1);
            }
            ColorPreset::Solid { .. } => panic!("expected gradient"),
        }
    }
}
