//! Raster grids: regular meshes and scattered samples.
//!
//! - [`MeshGridData`]: values on a regular lon/lat mesh, `values[[row, col]]` with rows
//!   following `lats` and columns following `lons` (both ascending)
//! - [`UnstructuredGridData`]: scattered samples, gridded onto a mesh by nearest neighbour
//!   or inverse-distance weighting
//!
//! Contours are extracted with marching squares on the mesh and joined into polylines.

use crate::error::{MapError, Result};
use crate::projection::Region;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Nearest,
    #[default]
    Bilinear,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "method")]
pub enum Gridding {
    Nearest,
    InverseDistance {
        power: f64,
        /// Only the closest samples contribute; all of them when unset.
        max_neighbors: Option<usize>,
    },
}

impl Default for Gridding {
    fn default() -> Self {
        Gridding::InverseDistance {
            power: 2.0,
            max_neighbors: Some(12),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MeshGridData {
    lons: Vec<f64>,
    lats: Vec<f64>,
    values: Array2<f64>,
}

fn check_axis(name: &str, axis: &[f64]) -> Result<()> {
    if axis.len() < 2 {
        return Err(MapError::config(format!("{name} axis needs at least 2 values")));
    }
    if axis.windows(2).any(|w| !(w[1] > w[0])) {
        return Err(MapError::config(format!("{name} axis must be strictly ascending")));
    }
    Ok(())
}

/// Fractional index of `v` along an ascending axis; `None` outside.
fn frac_index(axis: &[f64], v: f64) -> Option<f64> {
    let n = axis.len();
    if v.is_nan() || v < axis[0] || v > axis[n - 1] {
        return None;
    }
    let i = axis.partition_point(|a| *a <= v).clamp(1, n - 1) - 1;
    let t = (v - axis[i]) / (axis[i + 1] - axis[i]);
    Some(i as f64 + t)
}

/// Coordinate at a fractional index.
fn axis_at(axis: &[f64], idx: f64) -> f64 {
    let i = (idx.floor() as usize).min(axis.len() - 2);
    let t = idx - i as f64;
    axis[i] + t * (axis[i + 1] - axis[i])
}

impl MeshGridData {
    pub fn new(lons: Vec<f64>, lats: Vec<f64>, values: Array2<f64>) -> Result<Self> {
        check_axis("longitude", &lons)?;
        check_axis("latitude", &lats)?;
        if values.dim() != (lats.len(), lons.len()) {
            return Err(MapError::config(format!(
                "grid values have shape {:?}, expected ({}, {})",
                values.dim(),
                lats.len(),
                lons.len()
            )));
        }
        Ok(Self { lons, lats, values })
    }

    /// Mesh filled by evaluating `f(lon, lat)` at every node.
    pub fn from_fn(lons: Vec<f64>, lats: Vec<f64>, f: impl Fn(f64, f64) -> f64) -> Result<Self> {
        let values = Array2::from_shape_fn((lats.len(), lons.len()), |(r, c)| f(lons[c], lats[r]));
        Self::new(lons, lats, values)
    }

    pub fn lons(&self) -> &[f64] {
        &self.lons
    }

    pub fn lats(&self) -> &[f64] {
        &self.lats
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn bbox(&self) -> Region {
        Region {
            lon_min: self.lons[0],
            lon_max: self.lons[self.lons.len() - 1],
            lat_min: self.lats[0],
            lat_max: self.lats[self.lats.len() - 1],
        }
    }

    /// Smallest and largest finite value.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .filter(|v| v.is_finite())
            .fold(None, |acc, &v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Bilinear sample; `None` outside the mesh, NaN when a neighbouring node is NaN.
    pub fn sample(&self, lon: f64, lat: f64) -> Option<f64> {
        let fx = frac_index(&self.lons, lon)?;
        let fy = frac_index(&self.lats, lat)?;
        let c0 = (fx.floor() as usize).min(self.lons.len() - 2);
        let r0 = (fy.floor() as usize).min(self.lats.len() - 2);
        let (tx, ty) = (fx - c0 as f64, fy - r0 as f64);
        let v = &self.values;
        let top = v[[r0, c0]] * (1.0 - tx) + v[[r0, c0 + 1]] * tx;
        let bottom = v[[r0 + 1, c0]] * (1.0 - tx) + v[[r0 + 1, c0 + 1]] * tx;
        Some(top * (1.0 - ty) + bottom * ty)
    }

    /// Value of the closest node; `None` outside the mesh.
    pub fn sample_nearest(&self, lon: f64, lat: f64) -> Option<f64> {
        let fx = frac_index(&self.lons, lon)?;
        let fy = frac_index(&self.lats, lat)?;
        Some(self.values[[fy.round() as usize, fx.round() as usize]])
    }

    /// Resample onto new axes; nodes outside the source mesh become NaN.
    pub fn resample(&self, lons: Vec<f64>, lats: Vec<f64>, method: Interpolation) -> Result<Self> {
        let values = Array2::from_shape_fn((lats.len(), lons.len()), |(r, c)| {
            let s = match method {
                Interpolation::Nearest => self.sample_nearest(lons[c], lats[r]),
                Interpolation::Bilinear => self.sample(lons[c], lats[r]),
            };
            s.unwrap_or(f64::NAN)
        });
        Self::new(lons, lats, values)
    }

    /// Cell boundaries around each node: midpoints between nodes, extended half a step at
    /// both ends.
    pub fn cell_edges(&self) -> (Vec<f64>, Vec<f64>) {
        (edges(&self.lons), edges(&self.lats))
    }

    /// Contour polylines at `level`, in lon/lat.
    pub fn contour_lines(&self, level: f64) -> Vec<Vec<(f64, f64)>> {
        let segments = march_squares(&self.values, level);
        join_segments(segments)
            .into_iter()
            .map(|line| {
                line.into_iter()
                    .map(|(c, r)| (axis_at(&self.lons, c), axis_at(&self.lats, r)))
                    .collect()
            })
            .collect()
    }
}

fn edges(axis: &[f64]) -> Vec<f64> {
    let n = axis.len();
    let mut out = Vec::with_capacity(n + 1);
    out.push(axis[0] - (axis[1] - axis[0]) / 2.0);
    out.extend(axis.windows(2).map(|w| (w[0] + w[1]) / 2.0));
    out.push(axis[n - 1] + (axis[n - 1] - axis[n - 2]) / 2.0);
    out
}

type Segment = ((f64, f64), (f64, f64));

/// Marching squares over the node mesh; points are `(col, row)` fractional indices.
fn march_squares(values: &Array2<f64>, level: f64) -> Vec<Segment> {
    let (rows, cols) = values.dim();
    let mut segments = Vec::new();
    if rows < 2 || cols < 2 {
        return segments;
    }
    for r in 0..rows - 1 {
        for c in 0..cols - 1 {
            let bl = values[[r, c]];
            let br = values[[r, c + 1]];
            let tr = values[[r + 1, c + 1]];
            let tl = values[[r + 1, c]];
            if [bl, br, tr, tl].iter().any(|v| v.is_nan()) {
                continue;
            }
            let mut case = 0u8;
            if tl >= level {
                case |= 1;
            }
            if tr >= level {
                case |= 2;
            }
            if br >= level {
                case |= 4;
            }
            if bl >= level {
                case |= 8;
            }
            let (x, y) = (c as f64, r as f64);
            let top = edge_point((x, y + 1.0), (x + 1.0, y + 1.0), tl, tr, level);
            let right = edge_point((x + 1.0, y + 1.0), (x + 1.0, y), tr, br, level);
            let bottom = edge_point((x, y), (x + 1.0, y), bl, br, level);
            let left = edge_point((x, y + 1.0), (x, y), tl, bl, level);
            let center = (bl + br + tr + tl) / 4.0;
            match case {
                0 | 15 => {}
                1 | 14 => segments.push((left, top)),
                2 | 13 => segments.push((top, right)),
                3 | 12 => segments.push((left, right)),
                4 | 11 => segments.push((right, bottom)),
                6 | 9 => segments.push((top, bottom)),
                7 | 8 => segments.push((left, bottom)),
                // saddles: the cell center decides which corners connect
                5 if center >= level => {
                    segments.push((left, bottom));
                    segments.push((top, right));
                }
                5 => {
                    segments.push((left, top));
                    segments.push((right, bottom));
                }
                10 if center >= level => {
                    segments.push((left, top));
                    segments.push((right, bottom));
                }
                _ => {
                    segments.push((top, right));
                    segments.push((left, bottom));
                }
            }
        }
    }
    segments
}

fn edge_point(p1: (f64, f64), p2: (f64, f64), v1: f64, v2: f64, level: f64) -> (f64, f64) {
    if (v2 - v1).abs() < 1e-12 {
        return ((p1.0 + p2.0) / 2.0, (p1.1 + p2.1) / 2.0);
    }
    let t = ((level - v1) / (v2 - v1)).clamp(0.0, 1.0);
    (p1.0 + t * (p2.0 - p1.0), p1.1 + t * (p2.1 - p1.1))
}

fn close(a: (f64, f64), b: (f64, f64)) -> bool {
    (a.0 - b.0).abs() < 1e-9 && (a.1 - b.1).abs() < 1e-9
}

/// Chain unordered segments into polylines, extending at both ends.
fn join_segments(segments: Vec<Segment>) -> Vec<Vec<(f64, f64)>> {
    let mut used = vec![false; segments.len()];
    let mut lines = Vec::new();
    for start in 0..segments.len() {
        if used[start] {
            continue;
        }
        used[start] = true;
        let mut line = std::collections::VecDeque::from([segments[start].0, segments[start].1]);
        let mut grown = true;
        while grown {
            grown = false;
            for (i, &(a, b)) in segments.iter().enumerate() {
                if used[i] {
                    continue;
                }
                let (Some(&head), Some(&tail)) = (line.front(), line.back()) else {
                    break;
                };
                let next = if close(a, tail) {
                    Some((false, b))
                } else if close(b, tail) {
                    Some((false, a))
                } else if close(a, head) {
                    Some((true, b))
                } else if close(b, head) {
                    Some((true, a))
                } else {
                    None
                };
                if let Some((at_head, p)) = next {
                    if at_head {
                        line.push_front(p);
                    } else {
                        line.push_back(p);
                    }
                    used[i] = true;
                    grown = true;
                }
            }
        }
        lines.push(line.into_iter().collect());
    }
    lines
}

/// Scattered samples.
#[derive(Clone, Debug, PartialEq)]
pub struct UnstructuredGridData {
    pub lons: Vec<f64>,
    pub lats: Vec<f64>,
    pub values: Vec<f64>,
}

impl UnstructuredGridData {
    pub fn new(lons: Vec<f64>, lats: Vec<f64>, values: Vec<f64>) -> Result<Self> {
        if lons.len() != lats.len() || lons.len() != values.len() {
            return Err(MapError::config(format!(
                "unstructured grid: {} lons, {} lats, {} values",
                lons.len(),
                lats.len(),
                values.len()
            )));
        }
        if lons.is_empty() {
            return Err(MapError::config("unstructured grid has no samples"));
        }
        Ok(Self { lons, lats, values })
    }

    pub fn bbox(&self) -> Region {
        let fold = |v: &[f64]| {
            v.iter()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), x| (lo.min(*x), hi.max(*x)))
        };
        let (lon_min, lon_max) = fold(&self.lons);
        let (lat_min, lat_max) = fold(&self.lats);
        Region {
            lon_min,
            lon_max,
            lat_min,
            lat_max,
        }
    }

    /// Grid the samples onto an `nlon` x `nlat` mesh spanning their bounding box.
    pub fn to_mesh(&self, nlon: usize, nlat: usize, method: Gridding) -> Result<MeshGridData> {
        if nlon < 2 || nlat < 2 {
            return Err(MapError::config("mesh needs at least 2 nodes per axis"));
        }
        let bbox = self.bbox();
        if bbox.lon_max <= bbox.lon_min || bbox.lat_max <= bbox.lat_min {
            return Err(MapError::config("samples span no area"));
        }
        let axis = |lo: f64, hi: f64, n: usize| -> Vec<f64> {
            (0..n).map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64).collect()
        };
        let lons = axis(bbox.lon_min, bbox.lon_max, nlon);
        let lats = axis(bbox.lat_min, bbox.lat_max, nlat);
        let kx = ((bbox.lat_min + bbox.lat_max) / 2.0).to_radians().cos();
        let samples: Vec<(f64, f64, f64)> = self
            .lons
            .iter()
            .zip(&self.lats)
            .zip(&self.values)
            .filter(|(_, v)| v.is_finite())
            .map(|((x, y), v)| (*x, *y, *v))
            .collect();
        let values = Array2::from_shape_fn((nlat, nlon), |(r, c)| {
            let mut d: Vec<(f64, f64)> = samples
                .iter()
                .map(|(x, y, v)| {
                    let dx = (x - lons[c]) * kx;
                    let dy = y - lats[r];
                    (dx * dx + dy * dy, *v)
                })
                .collect();
            d.sort_by(|a, b| a.0.total_cmp(&b.0));
            match method {
                Gridding::Nearest => d.first().map(|(_, v)| *v).unwrap_or(f64::NAN),
                Gridding::InverseDistance {
                    power,
                    max_neighbors,
                } => {
                    let k = max_neighbors.unwrap_or(d.len()).max(1);
                    idw(&d[..k.min(d.len())], power)
                }
            }
        });
        MeshGridData::new(lons, lats, values)
    }
}

/// Inverse-distance weighted mean over squared distances.
fn idw(neighbors: &[(f64, f64)], power: f64) -> f64 {
    let mut wsum = 0.0;
    let mut vsum = 0.0;
    for &(d2, v) in neighbors {
        if d2 < 1e-24 {
            return v;
        }
        let w = 1.0 / d2.sqrt().powf(power);
        wsum += w;
        vsum += w * v;
    }
    if wsum > 0.0 { vsum / wsum } else { f64::NAN }
}
