//! Focal mechanisms and beachball geometry.
//!
//! Angles follow the Aki & Richards convention in a north-east-down frame. The beachball is
//! the lower-hemisphere equal-area (Schmidt) projection of the P-wave radiation sign: a ray
//! `x` is compressional when `(n·x)(s·x) > 0` for fault normal `n` and slip vector `s`.

use super::{Feature, FeatureValue, Multi};
use crate::error::{MapError, Result};
use crate::style::{ParamValue, StyleOverrides};
use geo_types::Geometry;
use ndarray::Array2;

pub type MultiFocmecData = Multi<FocmecData>;

#[derive(Clone, Debug, PartialEq)]
pub struct FocmecData {
    pub lon: f64,
    pub lat: f64,
    /// Degrees clockwise from north, 0..360.
    pub strike: f64,
    /// Degrees from horizontal, 0..=90.
    pub dip: f64,
    /// Degrees, -180..=180.
    pub rake: f64,
    pub magnitude: Option<f64>,
    pub value: Option<FeatureValue>,
    pub label: Option<String>,
    pub style_params: StyleOverrides,
}

type Vec3 = [f64; 3];

fn dot(a: &Vec3, b: &Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

impl FocmecData {
    pub fn new(lon: f64, lat: f64, strike: f64, dip: f64, rake: f64) -> Result<Self> {
        if ![lon, lat, strike, dip, rake].iter().all(|v| v.is_finite()) {
            return Err(MapError::geometry("focal mechanism angles must be finite"));
        }
        if !(0.0..=90.0).contains(&dip) {
            return Err(MapError::geometry(format!("dip {dip} outside 0..=90")));
        }
        Ok(Self {
            lon,
            lat,
            strike: strike.rem_euclid(360.0),
            dip,
            rake,
            magnitude: None,
            value: None,
            label: None,
            style_params: StyleOverrides::new(),
        })
    }

    pub fn with_magnitude(mut self, magnitude: f64) -> Self {
        self.magnitude = Some(magnitude);
        self
    }

    pub fn with_value(mut self, value: impl Into<FeatureValue>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_style_param(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.style_params.insert(name.into(), value);
        self
    }

    /// Fault normal and slip vector in north-east-down coordinates.
    pub fn normal_and_slip(&self) -> (Vec3, Vec3) {
        let (phi, delta, lambda) = (
            self.strike.to_radians(),
            self.dip.to_radians(),
            self.rake.to_radians(),
        );
        let n = [
            -delta.sin() * phi.sin(),
            delta.sin() * phi.cos(),
            -delta.cos(),
        ];
        let s = [
            lambda.cos() * phi.cos() + delta.cos() * lambda.sin() * phi.sin(),
            lambda.cos() * phi.sin() - delta.cos() * lambda.sin() * phi.cos(),
            -lambda.sin() * delta.sin(),
        ];
        (n, s)
    }

    /// Polarity at a point of the unit disk (`x` east, `y` north): `Some(true)` for
    /// compression, `None` outside the disk.
    pub fn polarity(&self, x: f64, y: f64) -> Option<bool> {
        let r = x.hypot(y);
        if r > 1.0 {
            return None;
        }
        // equal-area: r = sqrt(2) sin(i / 2)
        let incidence = 2.0 * (r / std::f64::consts::SQRT_2).asin();
        let azimuth = x.atan2(y);
        let ray = [
            incidence.sin() * azimuth.cos(),
            incidence.sin() * azimuth.sin(),
            incidence.cos(),
        ];
        let (n, s) = self.normal_and_slip();
        Some(dot(&n, &ray) * dot(&s, &ray) > 0.0)
    }

    /// Polarity raster over `[-1, 1]²` with `resolution` cells per side; row 0 is north.
    pub fn beachball(&self, resolution: usize) -> Beachball {
        let res = resolution.max(2);
        let step = 2.0 / res as f64;
        let cells = Array2::from_shape_fn((res, res), |(r, c)| {
            let x = -1.0 + (c as f64 + 0.5) * step;
            let y = 1.0 - (r as f64 + 0.5) * step;
            self.polarity(x, y)
        });
        Beachball { cells }
    }
}

/// Rasterized beachball; `None` cells lie outside the focal sphere.
#[derive(Clone, Debug, PartialEq)]
pub struct Beachball {
    pub cells: Array2<Option<bool>>,
}

impl Beachball {
    pub fn resolution(&self) -> usize {
        self.cells.nrows()
    }

    /// Fraction of in-disk cells that are compressional.
    pub fn compressional_fraction(&self) -> f64 {
        let (inside, comp) = self.cells.iter().fold((0usize, 0usize), |(i, c), cell| match cell {
            Some(true) => (i + 1, c + 1),
            Some(false) => (i + 1, c),
            None => (i, c),
        });
        if inside == 0 { 0.0 } else { comp as f64 / inside as f64 }
    }
}

impl Feature for FocmecData {
    fn value(&self) -> Option<&FeatureValue> {
        self.value.as_ref()
    }

    fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    fn style_params(&self) -> &StyleOverrides {
        &self.style_params
    }

    fn geometry(&self) -> Geometry<f64> {
        Geometry::Point(geo_types::Point::new(self.lon, self.lat))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normal_and_slip_are_orthogonal_unit_vectors() {
        let f = FocmecData::new(0.0, 0.0, 37.0, 61.0, -112.0).unwrap();
        let (n, s) = f.normal_and_slip();
        assert!((dot(&n, &n) - 1.0).abs() < 1e-12);
        assert!((dot(&s, &s) - 1.0).abs() < 1e-12);
        assert!(dot(&n, &s).abs() < 1e-12);
    }

    #[test]
    fn thrust_center_is_compressional() {
        // pure thrust on a 45° plane: vertical rays are compressional
        let thrust = FocmecData::new(0.0, 0.0, 0.0, 45.0, 90.0).unwrap();
        assert_eq!(thrust.polarity(0.0, 0.0), Some(true));
        let normal = FocmecData::new(0.0, 0.0, 0.0, 45.0, -90.0).unwrap();
        assert_eq!(normal.polarity(0.0, 0.0), Some(false));
        assert_eq!(normal.polarity(0.9, 0.9), None);
    }

    #[test]
    fn strike_slip_has_half_compression() {
        let ss = FocmecData::new(0.0, 0.0, 0.0, 90.0, 0.0).unwrap();
        let bb = ss.beachball(64);
        assert!((bb.compressional_fraction() - 0.5).abs() < 0.02);
        // NE and SW quadrants on a north-striking vertical plane
        assert_eq!(ss.polarity(0.5, 0.5), ss.polarity(-0.5, -0.5));
        assert_ne!(ss.polarity(0.5, 0.5), ss.polarity(-0.5, 0.5));
    }

    #[test]
    fn invalid_dip_is_rejected() {
        assert!(FocmecData::new(0.0, 0.0, 0.0, 95.0, 0.0).is_err());
        assert_eq!(FocmecData::new(0.0, 0.0, -10.0, 10.0, 0.0).unwrap().strike, 350.0);
    }
}
