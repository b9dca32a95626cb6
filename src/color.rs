//! RGBA colors: parsing, blending and conversion to plotters colors.
//!
//! Accepted spellings: CSS names and hex (`"orange"`, `"#ff8800"`, `"#ff880080"`),
//! single-letter shorthands (`"r"`, `"k"`, ...), GMT-style `"R/G/B"` triplets,
//! gray levels as a number string between 0 and 1 (`"0.75"`), and `"none"`.

use crate::error::{MapError, Result};
use plotters::style::RGBAColor;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// RGBA color representation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const BLACK: Rgba = Rgba::rgb(0, 0, 0);
    pub const WHITE: Rgba = Rgba::rgb(255, 255, 255);
    pub const TRANSPARENT: Rgba = Rgba::new(0, 0, 0, 0);

    /// Create a new RGBA color.
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Create an opaque RGB color.
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::new(r, g, b, 255)
    }

    /// Build from float components in 0..=1.
    pub fn from_f64(r: f64, g: f64, b: f64, a: f64) -> Self {
        let q = |v: f64| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self::new(q(r), q(g), q(b), q(a))
    }

    /// Build from HSV with hue in degrees and saturation/value in 0..=1.
    pub fn from_hsv(h_deg: f64, s: f64, v: f64) -> Self {
        let h = h_deg.rem_euclid(360.0) / 60.0;
        let c = v * s;
        let x = c * (1.0 - ((h % 2.0) - 1.0).abs());
        let (r, g, b) = match h as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = v - c;
        Self::from_f64(r + m, g + m, b + m, 1.0)
    }

    pub fn is_transparent(&self) -> bool {
        self.a == 0
    }

    /// Same color with a new alpha in 0..=1.
    pub fn with_alpha(self, alpha: f64) -> Self {
        Self {
            a: (alpha.clamp(0.0, 1.0) * 255.0).round() as u8,
            ..self
        }
    }

    /// Multiply the current alpha by `alpha` (0..=1).
    pub fn fade(self, alpha: f64) -> Self {
        Self {
            a: ((self.a as f64) * alpha.clamp(0.0, 1.0)).round() as u8,
            ..self
        }
    }

    pub fn alpha_f64(&self) -> f64 {
        self.a as f64 / 255.0
    }

    /// Component-wise linear interpolation, `t` clamped to 0..=1.
    pub fn lerp(&self, other: &Rgba, t: f64) -> Rgba {
        let t = t.clamp(0.0, 1.0);
        let mix = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgba::new(
            mix(self.r, other.r),
            mix(self.g, other.g),
            mix(self.b, other.b),
            mix(self.a, other.a),
        )
    }

    pub fn to_hex(&self) -> String {
        if self.a == 255 {
            format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
        } else {
            format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
        }
    }

    pub fn to_plotters(&self) -> RGBAColor {
        RGBAColor(self.r, self.g, self.b, self.alpha_f64())
    }

    /// Parse any supported color spelling.
    pub fn parse(s: &str) -> Result<Self> {
        let t = s.trim();
        let invalid = || MapError::config(format!("invalid color: {s:?}"));
        if t.is_empty() {
            return Err(invalid());
        }
        match t.to_ascii_lowercase().as_str() {
            "none" | "transparent" => return Ok(Rgba::TRANSPARENT),
            "r" => return Ok(Rgba::rgb(255, 0, 0)),
            "g" => return Ok(Rgba::rgb(0, 128, 0)),
            "b" => return Ok(Rgba::rgb(0, 0, 255)),
            "c" => return Ok(Rgba::rgb(0, 191, 191)),
            "m" => return Ok(Rgba::rgb(191, 0, 191)),
            "y" => return Ok(Rgba::rgb(191, 191, 0)),
            "k" => return Ok(Rgba::BLACK),
            "w" => return Ok(Rgba::WHITE),
            _ => {}
        }
        if let Some(rgb) = parse_slash_triplet(t) {
            return Ok(rgb);
        }
        if let Ok(level) = t.parse::<f64>() {
            if (0.0..=1.0).contains(&level) {
                return Ok(Rgba::from_f64(level, level, level, 1.0));
            }
            return Err(invalid());
        }
        let c = colorgrad::Color::from_html(t).map_err(|_| invalid())?;
        let [r, g, b, a] = c.to_rgba8();
        Ok(Rgba::new(r, g, b, a))
    }
}

/// `"255/128/0"` (GMT style).
fn parse_slash_triplet(s: &str) -> Option<Rgba> {
    let parts: Vec<&str> = s.split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    let mut out = [0u8; 3];
    for (slot, p) in out.iter_mut().zip(parts.iter()) {
        let v: f64 = p.trim().parse().ok()?;
        if !(0.0..=255.0).contains(&v) {
            return None;
        }
        *slot = v.round() as u8;
    }
    Some(Rgba::rgb(out[0], out[1], out[2]))
}

impl FromStr for Rgba {
    type Err = MapError;

    fn from_str(s: &str) -> Result<Self> {
        Rgba::parse(s)
    }
}

impl TryFrom<String> for Rgba {
    type Error = MapError;

    fn try_from(s: String) -> Result<Self> {
        Rgba::parse(&s)
    }
}

impl From<Rgba> for String {
    fn from(c: Rgba) -> String {
        c.to_hex()
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
