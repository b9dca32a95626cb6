//! Colormaps, normalizations and scalar mappables.
//!
//! A [`Colormap`] maps a normalized value in `0..=1` to a color, a [`Norm`] maps data
//! values into that range, and a [`ScalarMappable`] pairs the two (plus under/over/bad
//! colors) so per-feature colors and colorbars are derived from the same object.

use crate::color::Rgba;
use crate::cpt::CptFile;
use crate::error::{MapError, Result};

#[derive(Clone, Debug, PartialEq)]
enum Stops {
    /// Discrete colors, equal share of `0..=1` each.
    Listed(Vec<Rgba>),
    /// Piecewise-linear stops; repeated positions encode discontinuities.
    Linear(Vec<(f64, Rgba)>),
}

/// A named color lookup over `0..=1`.
#[derive(Clone, Debug, PartialEq)]
pub struct Colormap {
    name: String,
    stops: Stops,
}

/// Samples taken from continuous presets.
const PRESET_SAMPLES: usize = 256;

impl Colormap {
    /// Discrete colormap with one equal-width slot per color.
    pub fn listed(name: impl Into<String>, colors: Vec<Rgba>) -> Result<Self> {
        if colors.is_empty() {
            return Err(MapError::config("listed colormap needs at least one color"));
        }
        Ok(Self {
            name: name.into(),
            stops: Stops::Listed(colors),
        })
    }

    /// Continuous colormap through evenly spaced colors.
    pub fn from_colors(name: impl Into<String>, colors: &[Rgba]) -> Result<Self> {
        match colors.len() {
            0 => Err(MapError::config("colormap needs at least one color")),
            1 => Self::from_stops(name, vec![(0.0, colors[0]), (1.0, colors[0])]),
            n => Self::from_stops(
                name,
                colors
                    .iter()
                    .enumerate()
                    .map(|(i, c)| (i as f64 / (n - 1) as f64, *c))
                    .collect(),
            ),
        }
    }

    /// Continuous colormap from explicit `(position, color)` stops spanning `0..=1`.
    pub fn from_stops(name: impl Into<String>, stops: Vec<(f64, Rgba)>) -> Result<Self> {
        if stops.len() < 2 {
            return Err(MapError::config("colormap needs at least two stops"));
        }
        if stops.windows(2).any(|w| w[1].0 < w[0].0) {
            return Err(MapError::config("colormap stops must be non-decreasing"));
        }
        let first = stops[0].0;
        let last = stops[stops.len() - 1].0;
        if first.abs() > 1e-9 || (last - 1.0).abs() > 1e-9 {
            return Err(MapError::config("colormap stops must span 0..1"));
        }
        Ok(Self {
            name: name.into(),
            stops: Stops::Linear(stops),
        })
    }

    /// Look up a preset by name. A `_r` suffix reverses the map.
    pub fn from_name(name: &str) -> Result<Self> {
        let lower = name.trim().to_lowercase();
        if let Some(base) = lower.strip_suffix("_r") {
            return Ok(Self::from_name(base)?.reversed());
        }
        let grad = match lower.as_str() {
            "viridis" => colorgrad::viridis(),
            "inferno" => colorgrad::inferno(),
            "magma" => colorgrad::magma(),
            "plasma" => colorgrad::plasma(),
            "turbo" => colorgrad::turbo(),
            "cividis" => colorgrad::cividis(),
            "rainbow" => colorgrad::rainbow(),
            "spectral" => colorgrad::spectral(),
            "rdbu" | "rd_bu" => colorgrad::rd_bu(),
            "rdylbu" | "rd_yl_bu" => colorgrad::rd_yl_bu(),
            "rdylgn" | "rd_yl_gn" => colorgrad::rd_yl_gn(),
            "blues" => colorgrad::blues(),
            "greens" => colorgrad::greens(),
            "greys" => colorgrad::greys(),
            "oranges" => colorgrad::oranges(),
            "reds" => colorgrad::reds(),
            "purples" => colorgrad::purples(),
            "ylorrd" | "yl_or_rd" => colorgrad::yl_or_rd(),
            "cool" => colorgrad::cool(),
            "warm" => colorgrad::warm(),
            "gray" | "grey" => return Ok(Self::from_name("greys")?.reversed().renamed("gray")),
            "jet" => {
                let colors = [
                    Rgba::rgb(0, 0, 127),
                    Rgba::rgb(0, 0, 255),
                    Rgba::rgb(0, 255, 255),
                    Rgba::rgb(255, 255, 0),
                    Rgba::rgb(255, 0, 0),
                    Rgba::rgb(127, 0, 0),
                ];
                return Self::from_colors("jet", &colors);
            }
            _ => {
                return Err(MapError::config(format!("unknown colormap: {name}")));
            }
        };
        let stops = (0..PRESET_SAMPLES)
            .map(|i| {
                let t = i as f64 / (PRESET_SAMPLES - 1) as f64;
                let [r, g, b, a] = grad.at(t).to_rgba8();
                (t, Rgba::new(r, g, b, a))
            })
            .collect();
        Self::from_stops(lower, stops)
    }

    /// Continuous colormap spanning the z-range of a CPT file.
    pub fn from_cpt(name: impl Into<String>, cpt: &CptFile) -> Result<Self> {
        let (zmin, zmax) = cpt
            .z_range()
            .ok_or_else(|| MapError::config("CPT file has no segments"))?;
        let span = if zmax > zmin { zmax - zmin } else { 1.0 };
        let mut stops = Vec::with_capacity(cpt.segments.len() * 2);
        for seg in &cpt.segments {
            stops.push(((seg.z0 - zmin) / span, seg.color0));
            stops.push(((seg.z1 - zmin) / span, seg.color1));
        }
        Self::from_stops(name, stops)
    }

    /// Black to white.
    pub fn grayscale() -> Self {
        Self {
            name: "gray".into(),
            stops: Stops::Linear(vec![(0.0, Rgba::BLACK), (1.0, Rgba::WHITE)]),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_listed(&self) -> bool {
        matches!(self.stops, Stops::Listed(_))
    }

    /// Number of discrete colors for listed maps, `None` for continuous ones.
    pub fn n_colors(&self) -> Option<usize> {
        match &self.stops {
            Stops::Listed(c) => Some(c.len()),
            Stops::Linear(_) => None,
        }
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn reversed(&self) -> Self {
        let stops = match &self.stops {
            Stops::Listed(c) => Stops::Listed(c.iter().rev().copied().collect()),
            Stops::Linear(s) => Stops::Linear(s.iter().rev().map(|(p, c)| (1.0 - p, *c)).collect()),
        };
        Self {
            name: format!("{}_r", self.name),
            stops,
        }
    }

    /// Color at normalized position `t` (clamped to `0..=1`).
    pub fn at(&self, t: f64) -> Rgba {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        match &self.stops {
            Stops::Listed(colors) => {
                let n = colors.len();
                let idx = ((t * n as f64).floor() as usize).min(n - 1);
                colors[idx]
            }
            Stops::Linear(stops) => {
                // last segment whose start is <= t
                let i = stops
                    .windows(2)
                    .rposition(|w| w[0].0 <= t && t <= w[1].0)
                    .unwrap_or(0);
                let (p0, c0) = stops[i];
                let (p1, c1) = stops[i + 1];
                if p1 - p0 <= f64::EPSILON {
                    c1
                } else {
                    c0.lerp(&c1, (t - p0) / (p1 - p0))
                }
            }
        }
    }
}

/// Normalization of data values into `0..=1`.
#[derive(Clone, Debug, PartialEq)]
pub enum Norm {
    /// Linear between `vmin` and `vmax`; missing limits are filled by [`Norm::autoscaled`].
    Linear { vmin: Option<f64>, vmax: Option<f64> },
    /// Logarithmic between positive limits; non-positive values normalize to NaN.
    Log { vmin: Option<f64>, vmax: Option<f64> },
    /// Discrete bins; each of the `n-1` bins maps to the center of its slot.
    Boundary { boundaries: Vec<f64> },
}

impl Norm {
    pub fn linear(vmin: f64, vmax: f64) -> Self {
        Norm::Linear {
            vmin: Some(vmin),
            vmax: Some(vmax),
        }
    }

    pub fn boundary(boundaries: Vec<f64>) -> Result<Self> {
        if boundaries.len() < 2 {
            return Err(MapError::config("boundary norm needs at least two boundaries"));
        }
        if boundaries.windows(2).any(|w| w[1] <= w[0]) {
            return Err(MapError::config("boundaries must be strictly increasing"));
        }
        Ok(Norm::Boundary { boundaries })
    }

    /// Data limits, once known.
    pub fn limits(&self) -> Option<(f64, f64)> {
        match self {
            Norm::Linear {
                vmin: Some(a),
                vmax: Some(b),
            }
            | Norm::Log {
                vmin: Some(a),
                vmax: Some(b),
            } => Some((*a, *b)),
            Norm::Boundary { boundaries } => Some((boundaries[0], boundaries[boundaries.len() - 1])),
            _ => None,
        }
    }

    /// Fill missing limits from the finite values in `values`.
    pub fn autoscaled(&self, values: &[f64]) -> Norm {
        let positive_only = matches!(self, Norm::Log { .. });
        let finite = values
            .iter()
            .copied()
            .filter(|v| v.is_finite() && (!positive_only || *v > 0.0));
        let (lo, hi) = finite.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(v), hi.max(v))
        });
        let (lo, hi) = if lo.is_finite() { (lo, hi) } else { (0.0, 1.0) };
        match self {
            Norm::Linear { vmin, vmax } => Norm::Linear {
                vmin: Some(vmin.unwrap_or(lo)),
                vmax: Some(vmax.unwrap_or(hi)),
            },
            Norm::Log { vmin, vmax } => Norm::Log {
                vmin: Some(vmin.unwrap_or(lo)),
                vmax: Some(vmax.unwrap_or(hi)),
            },
            Norm::Boundary { .. } => self.clone(),
        }
    }

    /// Normalize a value. Results outside `0..=1` signal under/over.
    /// Unset limits behave as `0..1`.
    pub fn normalize(&self, v: f64) -> f64 {
        if v.is_nan() {
            return f64::NAN;
        }
        match self {
            Norm::Linear { vmin, vmax } => {
                let (a, b) = (vmin.unwrap_or(0.0), vmax.unwrap_or(1.0));
                if b == a { 0.0 } else { (v - a) / (b - a) }
            }
            Norm::Log { vmin, vmax } => {
                let (a, b) = (vmin.unwrap_or(1.0), vmax.unwrap_or(10.0));
                if v <= 0.0 || a <= 0.0 || b <= 0.0 {
                    return f64::NAN;
                }
                if b == a {
                    0.0
                } else {
                    (v.log10() - a.log10()) / (b.log10() - a.log10())
                }
            }
            Norm::Boundary { boundaries } => {
                let n = boundaries.len() - 1;
                let last = boundaries[n];
                if v < boundaries[0] {
                    return -1.0;
                }
                if v > last {
                    return 2.0;
                }
                let idx = boundaries.partition_point(|b| *b <= v).saturating_sub(1).min(n - 1);
                (idx as f64 + 0.5) / n as f64
            }
        }
    }

    /// Inverse of [`Norm::normalize`] for continuous norms (used for colorbar sampling).
    pub fn inverse(&self, t: f64) -> f64 {
        match self {
            Norm::Linear { vmin, vmax } => {
                let (a, b) = (vmin.unwrap_or(0.0), vmax.unwrap_or(1.0));
                a + t * (b - a)
            }
            Norm::Log { vmin, vmax } => {
                let (a, b) = (vmin.unwrap_or(1.0), vmax.unwrap_or(10.0));
                10f64.powf(a.log10() + t * (b.log10() - a.log10()))
            }
            Norm::Boundary { boundaries } => {
                let lo = boundaries[0];
                let hi = boundaries[boundaries.len() - 1];
                lo + t * (hi - lo)
            }
        }
    }
}

/// A normalization paired with a colormap and fallback colors.
#[derive(Clone, Debug, PartialEq)]
pub struct ScalarMappable {
    pub norm: Norm,
    pub cmap: Colormap,
    pub under: Option<Rgba>,
    pub over: Option<Rgba>,
    pub bad: Option<Rgba>,
}

impl ScalarMappable {
    pub fn new(norm: Norm, cmap: Colormap) -> Self {
        Self {
            norm,
            cmap,
            under: None,
            over: None,
            bad: None,
        }
    }

    /// Copy with the norm's missing limits filled from `values`.
    pub fn autoscaled(&self, values: &[f64]) -> Self {
        Self {
            norm: self.norm.autoscaled(values),
            ..self.clone()
        }
    }

    pub fn to_rgba(&self, v: f64) -> Rgba {
        let t = self.norm.normalize(v);
        if t.is_nan() {
            self.bad.unwrap_or(Rgba::TRANSPARENT)
        } else if t < 0.0 {
            self.under.unwrap_or_else(|| self.cmap.at(0.0))
        } else if t > 1.0 {
            self.over.unwrap_or_else(|| self.cmap.at(1.0))
        } else {
            self.cmap.at(t)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listed_slots() {
        let cm = Colormap::listed("x", vec![Rgba::BLACK, Rgba::WHITE]).unwrap();
        assert_eq!(cm.at(0.2), Rgba::BLACK);
        assert_eq!(cm.at(0.7), Rgba::WHITE);
        assert_eq!(cm.at(1.0), Rgba::WHITE);
    }

    #[test]
    fn linear_interpolates() {
        let cm = Colormap::from_colors("bw", &[Rgba::BLACK, Rgba::WHITE]).unwrap();
        assert_eq!(cm.at(0.5), Rgba::rgb(128, 128, 128));
        assert_eq!(cm.reversed().at(0.0), Rgba::WHITE);
    }

    #[test]
    fn presets_resolve() {
        assert!(Colormap::from_name("viridis").is_ok());
        assert!(Colormap::from_name("jet_r").is_ok());
        assert!(Colormap::from_name("no_such_map").is_err());
    }

    #[test]
    fn boundary_norm_bins() {
        let n = Norm::boundary(vec![0.0, 1.0, 10.0]).unwrap();
        assert_eq!(n.normalize(0.5), 0.25);
        assert_eq!(n.normalize(5.0), 0.75);
        assert_eq!(n.normalize(10.0), 0.75);
        assert!(n.normalize(-1.0) < 0.0);
        assert!(n.normalize(11.0) > 1.0);
    }

    #[test]
    fn autoscale_fills_limits() {
        let n = Norm::Linear {
            vmin: None,
            vmax: Some(100.0),
        }
        .autoscaled(&[5.0, f64::NAN, 20.0]);
        assert_eq!(n.limits(), Some((5.0, 100.0)));
    }

    #[test]
    fn mappable_fallbacks() {
        let mut sm = ScalarMappable::new(
            Norm::linear(0.0, 1.0),
            Colormap::from_colors("bw", &[Rgba::BLACK, Rgba::WHITE]).unwrap(),
        );
        sm.over = Some(Rgba::rgb(255, 0, 0));
        assert_eq!(sm.to_rgba(2.0), Rgba::rgb(255, 0, 0));
        assert_eq!(sm.to_rgba(-1.0), Rgba::BLACK);
        assert_eq!(sm.to_rgba(f64::NAN), Rgba::TRANSPARENT);
    }
}
