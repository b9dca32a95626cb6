//! Map regions, projections and graticule generation.
//!
//! Two projections are supported: plate carrée (lon/lat as-is) and spherical Mercator.
//! Projected coordinates are mapped linearly onto the pixel frame of the map area.

use crate::error::{MapError, Result};
use serde::{Deserialize, Serialize};

/// Mercator is undefined at the poles; latitudes are clamped to this.
const MERCATOR_MAX_LAT: f64 = 85.051_128_78;

/// Geographic extent `(lon_min, lon_max, lat_min, lat_max)`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Region {
    pub lon_min: f64,
    pub lon_max: f64,
    pub lat_min: f64,
    pub lat_max: f64,
}

impl Region {
    pub fn new(lon_min: f64, lon_max: f64, lat_min: f64, lat_max: f64) -> Result<Self> {
        let r = Self {
            lon_min,
            lon_max,
            lat_min,
            lat_max,
        };
        r.validate()?;
        Ok(r)
    }

    pub fn validate(&self) -> Result<()> {
        let finite = [self.lon_min, self.lon_max, self.lat_min, self.lat_max]
            .iter()
            .all(|v| v.is_finite());
        if !finite || self.lon_max <= self.lon_min || self.lat_max <= self.lat_min {
            return Err(MapError::config(format!("invalid region {self:?}")));
        }
        if self.lat_min < -90.0 || self.lat_max > 90.0 {
            return Err(MapError::config(format!("region latitudes out of range: {self:?}")));
        }
        Ok(())
    }

    pub(crate) fn from_rect(r: geo_types::Rect<f64>) -> Self {
        Self {
            lon_min: r.min().x,
            lon_max: r.max().x,
            lat_min: r.min().y,
            lat_max: r.max().y,
        }
    }

    pub fn union(&self, other: &Region) -> Region {
        Region {
            lon_min: self.lon_min.min(other.lon_min),
            lon_max: self.lon_max.max(other.lon_max),
            lat_min: self.lat_min.min(other.lat_min),
            lat_max: self.lat_max.max(other.lat_max),
        }
    }

    /// Grow by a fraction of the extent on every side (degenerate extents grow by `min_deg`).
    pub fn padded(&self, fraction: f64, min_deg: f64) -> Region {
        let dx = ((self.lon_max - self.lon_min) * fraction).max(min_deg);
        let dy = ((self.lat_max - self.lat_min) * fraction).max(min_deg);
        Region {
            lon_min: self.lon_min - dx,
            lon_max: self.lon_max + dx,
            lat_min: (self.lat_min - dy).max(-90.0),
            lat_max: (self.lat_max + dy).min(90.0),
        }
    }

    pub fn contains(&self, lon: f64, lat: f64) -> bool {
        (self.lon_min..=self.lon_max).contains(&lon) && (self.lat_min..=self.lat_max).contains(&lat)
    }
}

impl TryFrom<(f64, f64, f64, f64)> for Region {
    type Error = MapError;

    fn try_from(t: (f64, f64, f64, f64)) -> Result<Self> {
        Region::new(t.0, t.1, t.2, t.3)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Projection {
    #[default]
    PlateCarree,
    Mercator,
}

impl Projection {
    /// Forward projection to planar coordinates (degrees for plate carrée, radians-scaled
    /// units for Mercator).
    pub fn forward(&self, lon: f64, lat: f64) -> (f64, f64) {
        match self {
            Projection::PlateCarree => (lon, lat),
            Projection::Mercator => {
                let lat = lat.clamp(-MERCATOR_MAX_LAT, MERCATOR_MAX_LAT).to_radians();
                (
                    lon.to_radians(),
                    (std::f64::consts::FRAC_PI_4 + lat / 2.0).tan().ln(),
                )
            }
        }
    }

    /// Reject regions that collapse to a line once projected.
    pub fn check_region(&self, region: &Region) -> Result<()> {
        if *self == Projection::Mercator
            && (region.lat_min >= MERCATOR_MAX_LAT || region.lat_max <= -MERCATOR_MAX_LAT)
        {
            return Err(MapError::config(format!(
                "region {region:?} lies beyond the Mercator latitude limit of {MERCATOR_MAX_LAT}"
            )));
        }
        Ok(())
    }

    pub fn inverse(&self, x: f64, y: f64) -> (f64, f64) {
        match self {
            Projection::PlateCarree => (x, y),
            Projection::Mercator => (
                x.to_degrees(),
                (2.0 * y.exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees(),
            ),
        }
    }
}

/// Maps geographic coordinates of a region onto a pixel frame.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Frame {
    pub projection: Projection,
    pub region: Region,
    /// Pixel rectangle `(x0, y0, width, height)` of the map area.
    pub px: (f64, f64, f64, f64),
    x_range: (f64, f64),
    y_range: (f64, f64),
}

impl Frame {
    pub fn new(projection: Projection, region: Region, px: (f64, f64, f64, f64)) -> Self {
        let (x0, y0) = projection.forward(region.lon_min, region.lat_min);
        let (x1, y1) = projection.forward(region.lon_max, region.lat_max);
        Self {
            projection,
            region,
            px,
            x_range: (x0, x1),
            y_range: (y0, y1),
        }
    }

    /// Pixel position of a lon/lat; y grows downwards.
    pub fn to_px(&self, lon: f64, lat: f64) -> (f64, f64) {
        let (x, y) = self.projection.forward(lon, lat);
        let (px0, py0, w, h) = self.px;
        let fx = (x - self.x_range.0) / (self.x_range.1 - self.x_range.0);
        let fy = (y - self.y_range.0) / (self.y_range.1 - self.y_range.0);
        (px0 + fx * w, py0 + (1.0 - fy) * h)
    }

    /// Lon/lat at a pixel position.
    pub fn to_lonlat(&self, px: f64, py: f64) -> (f64, f64) {
        let (px0, py0, w, h) = self.px;
        let fx = (px - px0) / w;
        let fy = 1.0 - (py - py0) / h;
        let x = self.x_range.0 + fx * (self.x_range.1 - self.x_range.0);
        let y = self.y_range.0 + fy * (self.y_range.1 - self.y_range.0);
        self.projection.inverse(x, y)
    }

    /// Height/width ratio of the projected region, for sizing the map area.
    pub fn aspect(projection: Projection, region: &Region) -> f64 {
        let (x0, y0) = projection.forward(region.lon_min, region.lat_min);
        let (x1, y1) = projection.forward(region.lon_max, region.lat_max);
        ((y1 - y0) / (x1 - x0)).abs()
    }
}

/// One graticule line in lon/lat with its label.
#[derive(Clone, Debug, PartialEq)]
pub struct GraticuleLine {
    pub coords: Vec<(f64, f64)>,
    pub label: String,
    pub is_meridian: bool,
}

/// Meridians and parallels at multiples of the steps inside the region. Lines are densified
/// so they bend correctly under non-linear projections.
pub fn graticule(region: &Region, lon_step: f64, lat_step: f64) -> Result<Vec<GraticuleLine>> {
    if lon_step <= 0.0 || lat_step <= 0.0 {
        return Err(MapError::config("graticule steps must be positive"));
    }
    const SAMPLES: usize = 32;
    let mut out = Vec::new();
    let mut lon = (region.lon_min / lon_step).ceil() * lon_step;
    while lon <= region.lon_max + 1e-9 {
        let coords = (0..=SAMPLES)
            .map(|i| {
                let t = i as f64 / SAMPLES as f64;
                (lon, region.lat_min + t * (region.lat_max - region.lat_min))
            })
            .collect();
        out.push(GraticuleLine {
            coords,
            label: format_degrees(lon, 'E', 'W'),
            is_meridian: true,
        });
        lon += lon_step;
    }
    let mut lat = (region.lat_min / lat_step).ceil() * lat_step;
    while lat <= region.lat_max + 1e-9 {
        let coords = (0..=SAMPLES)
            .map(|i| {
                let t = i as f64 / SAMPLES as f64;
                (region.lon_min + t * (region.lon_max - region.lon_min), lat)
            })
            .collect();
        out.push(GraticuleLine {
            coords,
            label: format_degrees(lat, 'N', 'S'),
            is_meridian: false,
        });
        lat += lat_step;
    }
    Ok(out)
}

fn format_degrees(v: f64, pos: char, neg: char) -> String {
    let v = (v * 1e6).round() / 1e6;
    let hemi = if v > 0.0 {
        Some(pos)
    } else if v < 0.0 {
        Some(neg)
    } else {
        None
    };
    let txt = crate::thematic::format_breakpoint(v.abs());
    match hemi {
        Some(h) => format!("{txt}°{h}"),
        None => format!("{txt}°"),
    }
}
