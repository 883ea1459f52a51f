//! Color types and conversion math shared by effects, outputs, and the wire.

mod gradient;
mod manager;

use serde::{Deserialize, Serialize};

pub use gradient::{ColorPreset, ColorSpace, Gradient, GradientStop};
pub use manager::ColorManager;

/// Five-channel color: red, green, blue, cool white, warm white.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rgbcct {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    #[serde(default)]
    pub cool: u8,
    #[serde(default)]
    pub warm: u8,
}

impl Rgbcct {
    pub const BLACK: Rgbcct = Rgbcct {
        r: 0,
        g: 0,
        b: 0,
        cool: 0,
        warm: 0,
    };

    /// Pure cool white used when a color preset cannot be resolved.
    pub const WHITE: Rgbcct = Rgbcct {
        r: 255,
        g: 255,
        b: 255,
        cool: 255,
        warm: 0,
    };

    pub const fn new(r: u8, g: u8, b: u8, cool: u8, warm: u8) -> Self {
        Self { r, g, b, cool, warm }
    }

    /// Scale every channel by `factor` (clamped to [0,1]), rounding to the
    /// nearest integer value.
    pub fn scaled(&self, factor: f64) -> Rgbcct {
        let factor = clamp_unit(factor);
        Rgbcct {
            r: clamp_channel(f64::from(self.r) * factor),
            g: clamp_channel(f64::from(self.g) * factor),
            b: clamp_channel(f64::from(self.b) * factor),
            cool: clamp_channel(f64::from(self.cool) * factor),
            warm: clamp_channel(f64::from(self.warm) * factor),
        }
    }
}

/// HSV color with hue in degrees [0,360) and saturation/value in [0,1].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsv {
    pub h: f64,
    pub s: f64,
    pub v: f64,
}

/// Clamp a fraction to [0,1].
pub fn clamp_unit(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Round and clamp a floating channel value to 0..=255.
pub fn clamp_channel(value: f64) -> u8 {
    value.round().clamp(0.0, 255.0) as u8
}

/// Convert 8-bit RGB channels to HSV.
pub fn rgb_to_hsv(r: u8, g: u8, b: u8) -> Hsv {
    let r = f64::from(r) / 255.0;
    let g = f64::from(g) / 255.0;
    let b = f64::from(b) / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * (((g - b) / delta).rem_euclid(6.0))
    } else if max == g {
        60.0 * ((b - r) / delta + 2.0)
    } else {
        60.0 * ((r - g) / delta + 4.0)
    };

    let s = if max == 0.0 { 0.0 } else { delta / max };

    Hsv { h, s, v: max }
}

/// Convert HSV back to 8-bit RGB channels.
pub fn hsv_to_rgb(hsv: Hsv) -> (u8, u8, u8) {
    let h = hsv.h.rem_euclid(360.0);
    let s = clamp_unit(hsv.s);
    let v = clamp_unit(hsv.v);

    let c = v * s;
    let x = c * (1.0 - ((h / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    (
        clamp_channel((r + m) * 255.0),
        clamp_channel((g + m) * 255.0),
        clamp_channel((b + m) * 255.0),
    )
}

/// Per-channel linear blend of two RGBCCT colors, rounded and clamped.
pub fn blend_rgbcct(from: Rgbcct, to: Rgbcct, t: f64) -> Rgbcct {
    let t = clamp_unit(t);
    let lerp = |a: u8, b: u8| clamp_channel(f64::from(a) + (f64::from(b) - f64::from(a)) * t);
    Rgbcct {
        r: lerp(from.r, to.r),
        g: lerp(from.g, to.g),
        b: lerp(from.b, to.b),
        cool: lerp(from.cool, to.cool),
        warm: lerp(from.warm, to.warm),
    }
}

/// Hue-correct blend between two RGBCCT endpoints.
///
/// RGB channels travel through HSV space taking the shortest hue arc; the
/// white channels stay linear.
pub fn blend_rgbcct_hsv(from: Rgbcct, to: Rgbcct, t: f64) -> Rgbcct {
    let t = clamp_unit(t);
    let a = rgb_to_hsv(from.r, from.g, from.b);
    let b = rgb_to_hsv(to.r, to.g, to.b);

    let mut h1 = a.h;
    let mut h2 = b.h;
    if (h2 - h1).abs() > 180.0 {
        if h2 > h1 {
            h1 += 360.0;
        } else {
            h2 += 360.0;
        }
    }

    let mixed = Hsv {
        h: (h1 + (h2 - h1) * t).rem_euclid(360.0),
        s: a.s + (b.s - a.s) * t,
        v: a.v + (b.v - a.v) * t,
    };
    let (r, g, bl) = hsv_to_rgb(mixed);

    let lerp = |x: u8, y: u8| clamp_channel(f64::from(x) + (f64::from(y) - f64::from(x)) * t);
    Rgbcct {
        r,
        g,
        b: bl,
        cool: lerp(from.cool, to.cool),
        warm: lerp(from.warm, to.warm),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_hsv_round_trip_primaries() {
        for (r, g, b, hue) in [
            (255u8, 0u8, 0u8, 0.0),
            (0, 255, 0, 120.0),
            (0, 0, 255, 240.0),
        ] {
            let hsv = rgb_to_hsv(r, g, b);
            assert!((hsv.h - hue).abs() < 1e-9);
            assert!((hsv.s - 1.0).abs() < 1e-9);
            assert!((hsv.v - 1.0).abs() < 1e-9);
            assert_eq!(hsv_to_rgb(hsv), (r, g, b));
        }
    }

    #[test]
    fn grey_has_zero_saturation() {
        let hsv = rgb_to_hsv(128, 128, 128);
        assert_eq!(hsv.h, 0.0);
        assert_eq!(hsv.s, 0.0);
    }

    #[test]
    fn linear_blend_midpoint() {
        let a = Rgbcct::new(0, 0, 0, 0, 0);
        let b = Rgbcct::new(255, 100, 50, 200, 10);
        let mid = blend_rgbcct(a, b, 0.5);
        assert_eq!(mid, Rgbcct::new(128, 50, 25, 100, 5));
    }

    #[test]
    fn blend_endpoints_are_exact() {
        let a = Rgbcct::new(12, 34, 56, 78, 90);
        let b = Rgbcct::new(200, 150, 100, 50, 0);
        assert_eq!(blend_rgbcct(a, b, 0.0), a);
        assert_eq!(blend_rgbcct(a, b, 1.0), b);
    }

    #[test]
    fn hsv_blend_red_to_blue_takes_shortest_arc() {
        // Red (0deg) to blue (240deg) at t=0.5 must pass through magenta
        // (300deg), not cyan (120deg).
        let red = Rgbcct::new(255, 0, 0, 0, 0);
        let blue = Rgbcct::new(0, 0, 255, 0, 0);
        let mid = blend_rgbcct_hsv(red, blue, 0.5);
        let hsv = rgb_to_hsv(mid.r, mid.g, mid.b);
        assert!((hsv.h - 300.0).abs() < 1.0, "hue was {}", hsv.h);
    }

    #[test]
    fn hsv_blend_keeps_whites_linear() {
        let a = Rgbcct::new(255, 0, 0, 0, 200);
        let b = Rgbcct::new(0, 0, 255, 100, 0);
        let mid = blend_rgbcct_hsv(a, b, 0.5);
        assert_eq!(mid.cool, 50);
        assert_eq!(mid.warm, 100);
    }

    #[test]
    fn scaled_clamps_factor() {
        let c = Rgbcct::new(100, 100, 100, 100, 100);
        assert_eq!(c.scaled(2.0), c);
        assert_eq!(c.scaled(-1.0), Rgbcct::BLACK);
        assert_eq!(c.scaled(0.5), Rgbcct::new(50, 50, 50, 50, 50));
    }
}
