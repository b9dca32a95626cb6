//! Reader for GMT color palette tables (`.cpt`).
//!
//! Supported layout:
//! - `#` comments; `# COLOR_MODEL = HSV` (or `+HSV`) switches the color model
//! - segment lines `z0 R G B z1 R G B [; label]` (8 columns) or
//!   `z0 color z1 color [; label]` with `R/G/B`, `H-S-V`, gray, hex or named colors
//! - `B`, `F`, `N` lines for background, foreground and NaN colors

use crate::color::Rgba;
use crate::colormap::{Colormap, Norm, ScalarMappable};
use crate::error::{MapError, Result};
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ColorModel {
    #[default]
    Rgb,
    Hsv,
}

/// One linear color ramp between two z-values.
#[derive(Clone, Debug, PartialEq)]
pub struct CptSegment {
    pub z0: f64,
    pub color0: Rgba,
    pub z1: f64,
    pub color1: Rgba,
    pub label: Option<String>,
}

/// A parsed color palette table.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct CptFile {
    pub segments: Vec<CptSegment>,
    pub background: Option<Rgba>,
    pub foreground: Option<Rgba>,
    pub nan_color: Option<Rgba>,
    pub model: ColorModel,
}

fn hsv_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\d+(?:\.\d*)?)-(\d*\.?\d+)-(\d*\.?\d+)$").expect("static regex")
    })
}

fn model_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)COLOR_MODEL\s*=\s*\+?(\w+)").expect("static regex"))
}

impl CptFile {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self> {
        let mut cpt = CptFile::default();
        for (idx, raw) in text.lines().enumerate() {
            let line_no = idx + 1;
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(comment) = line.strip_prefix('#') {
                if let Some(caps) = model_re().captures(comment) {
                    cpt.model = match caps[1].to_ascii_uppercase().as_str() {
                        "HSV" => ColorModel::Hsv,
                        "RGB" => ColorModel::Rgb,
                        other => {
                            log::warn!("cpt line {line_no}: unsupported color model {other}, assuming RGB");
                            ColorModel::Rgb
                        }
                    };
                }
                continue;
            }

            let (body, label) = match line.split_once(';') {
                Some((b, l)) => (b.trim(), Some(l.trim().to_string()).filter(|s| !s.is_empty())),
                None => (line, None),
            };
            let tokens: Vec<&str> = body.split_whitespace().collect();

            if let Some(kind) = tokens.first().filter(|t| matches!(**t, "B" | "F" | "N")) {
                let color = cpt.parse_color(&tokens[1..], line_no)?;
                match *kind {
                    "B" => cpt.background = Some(color),
                    "F" => cpt.foreground = Some(color),
                    _ => cpt.nan_color = Some(color),
                }
                continue;
            }

            let segment = cpt.parse_segment(&tokens, label, line_no)?;
            if let Some(prev) = cpt.segments.last()
                && segment.z0 < prev.z1
            {
                return Err(MapError::Cpt {
                    line: line_no,
                    message: "segments must be in increasing z order".into(),
                });
            }
            cpt.segments.push(segment);
        }
        if cpt.segments.is_empty() {
            return Err(MapError::Cpt {
                line: 0,
                message: "no color segments found".into(),
            });
        }
        Ok(cpt)
    }

    fn parse_segment(&self, tokens: &[&str], label: Option<String>, line: usize) -> Result<CptSegment> {
        let err = |message: &str| MapError::Cpt {
            line,
            message: message.to_string(),
        };
        let num = |t: &str| t.parse::<f64>().map_err(|_| err(&format!("expected number, got {t:?}")));

        let numeric_prefix = tokens.iter().take_while(|t| t.parse::<f64>().is_ok()).count();
        if numeric_prefix >= 8 {
            let z0 = num(tokens[0])?;
            let color0 = self.parse_color(&tokens[1..4], line)?;
            let z1 = num(tokens[4])?;
            let color1 = self.parse_color(&tokens[5..8], line)?;
            return Self::checked(z0, color0, z1, color1, label, line);
        }
        if tokens.len() >= 4 {
            let z0 = num(tokens[0])?;
            let color0 = self.parse_color(&tokens[1..2], line)?;
            let z1 = num(tokens[2])?;
            let color1 = self.parse_color(&tokens[3..4], line)?;
            return Self::checked(z0, color0, z1, color1, label, line);
        }
        Err(err("expected `z0 color z1 color`"))
    }

    fn checked(z0: f64, color0: Rgba, z1: f64, color1: Rgba, label: Option<String>, line: usize) -> Result<CptSegment> {
        if z1 < z0 {
            return Err(MapError::Cpt {
                line,
                message: format!("segment end {z1} below start {z0}"),
            });
        }
        Ok(CptSegment {
            z0,
            color0,
            z1,
            color1,
            label,
        })
    }

    /// Parse a color from one token or three numeric components.
    fn parse_color(&self, tokens: &[&str], line: usize) -> Result<Rgba> {
        let err = |message: String| MapError::Cpt { line, message };
        match tokens {
            [a, b, c] => {
                let parse = |t: &str| t.parse::<f64>().map_err(|_| err(format!("bad color component {t:?}")));
                let (x, y, z) = (parse(a)?, parse(b)?, parse(c)?);
                Ok(match self.model {
                    ColorModel::Rgb => Rgba::from_f64(x / 255.0, y / 255.0, z / 255.0, 1.0),
                    ColorModel::Hsv => Rgba::from_hsv(x, y, z),
                })
            }
            [token] => {
                if let Some(caps) = hsv_token_re().captures(token) {
                    let h: f64 = caps[1].parse().map_err(|_| err(format!("bad hue in {token:?}")))?;
                    let s: f64 = caps[2].parse().map_err(|_| err(format!("bad saturation in {token:?}")))?;
                    let v: f64 = caps[3].parse().map_err(|_| err(format!("bad value in {token:?}")))?;
                    return Ok(Rgba::from_hsv(h, s, v));
                }
                if let Ok(gray) = token.parse::<f64>() {
                    if !(0.0..=255.0).contains(&gray) {
                        return Err(err(format!("gray level out of range: {gray}")));
                    }
                    let g = gray / 255.0;
                    return Ok(Rgba::from_f64(g, g, g, 1.0));
                }
                Rgba::parse(token).map_err(|e| err(e.to_string()))
            }
            _ => Err(err(format!("cannot parse color from {tokens:?}"))),
        }
    }

    /// Lowest and highest z covered by the segments.
    pub fn z_range(&self) -> Option<(f64, f64)> {
        let first = self.segments.first()?;
        let last = self.segments.last()?;
        Some((first.z0, last.z1))
    }

    /// Segment edges, usable as boundaries for a discrete norm.
    pub fn boundaries(&self) -> Vec<f64> {
        let mut out: Vec<f64> = Vec::with_capacity(self.segments.len() + 1);
        for seg in &self.segments {
            if out.last().is_none_or(|last| (*last - seg.z0).abs() > f64::EPSILON) {
                out.push(seg.z0);
            }
            out.push(seg.z1);
        }
        out
    }

    /// Mappable over the table's own z-range, with B/F/N colors as under/over/bad.
    pub fn to_mappable(&self, name: &str) -> Result<ScalarMappable> {
        let cmap = Colormap::from_cpt(name, self)?;
        let (zmin, zmax) = self
            .z_range()
            .ok_or_else(|| MapError::config("CPT file has no segments"))?;
        let mut sm = ScalarMappable::new(Norm::linear(zmin, zmax), cmap);
        sm.under = self.background;
        sm.over = self.foreground;
        sm.bad = self.nan_color;
        Ok(sm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOPO: &str = "\
# simple topo table
-100 0 0 255 0 0 255 255 ; sea
0 0/128/0 500 brown
B black
F white
N 128
";

    #[test]
    fn parses_mixed_columns() {
        let cpt = CptFile::parse(TOPO).unwrap();
        assert_eq!(cpt.segments.len(), 2);
        assert_eq!(cpt.segments[0].color0, Rgba::rgb(0, 0, 255));
        assert_eq!(cpt.segments[0].label.as_deref(), Some("sea"));
        assert_eq!(cpt.segments[1].color0, Rgba::rgb(0, 128, 0));
        assert_eq!(cpt.background, Some(Rgba::BLACK));
        assert_eq!(cpt.nan_color, Some(Rgba::rgb(128, 128, 128)));
        assert_eq!(cpt.z_range(), Some((-100.0, 500.0)));
        assert_eq!(cpt.boundaries(), vec![-100.0, 0.0, 500.0]);
    }

    #[test]
    fn hsv_model() {
        let cpt = CptFile::parse("# COLOR_MODEL = +HSV\n0 0 1 1 1 120 1 1\n").unwrap();
        assert_eq!(cpt.model, ColorModel::Hsv);
        assert_eq!(cpt.segments[0].color0, Rgba::rgb(255, 0, 0));
        assert_eq!(cpt.segments[0].color1, Rgba::rgb(0, 255, 0));
    }

    #[test]
    fn rejects_malformed_lines() {
        let err = CptFile::parse("0 red 10\n").unwrap_err();
        assert!(matches!(err, MapError::Cpt { line: 1, .. }));
        assert!(CptFile::parse("# only comments\n").is_err());
    }
}
