//! Point, line, polygon and text records, their multi-variants and conversions
//! (WKT, geo-types, GeoJSON, CSV).

use super::{Datum, Feature, FeatureValue, Multi};
use crate::error::{MapError, Result};
use crate::style::{ParamValue, StyleOverrides};
use geo_types::{Coord, Geometry, LineString};
use std::collections::BTreeMap;
use std::path::Path;
use wkt::{ToWkt, TryFromWkt};

pub type MultiPointData = Multi<PointData>;
pub type MultiLineData = Multi<LineData>;
pub type MultiPolygonData = Multi<PolygonData>;
pub type MultiTextData = Multi<TextData>;

fn parse_wkt(s: &str) -> Result<Geometry<f64>> {
    Geometry::try_from_wkt_str(s).map_err(|e| MapError::Wkt(e.to_string()))
}

fn wrong_kind(expected: &str, got: &Geometry<f64>) -> MapError {
    let kind = match got {
        Geometry::Point(_) => "POINT",
        Geometry::Line(_) => "LINE",
        Geometry::LineString(_) => "LINESTRING",
        Geometry::Polygon(_) => "POLYGON",
        Geometry::MultiPoint(_) => "MULTIPOINT",
        Geometry::MultiLineString(_) => "MULTILINESTRING",
        Geometry::MultiPolygon(_) => "MULTIPOLYGON",
        Geometry::GeometryCollection(_) => "GEOMETRYCOLLECTION",
        Geometry::Rect(_) => "RECT",
        Geometry::Triangle(_) => "TRIANGLE",
    };
    MapError::Wkt(format!("expected {expected}, got {kind}"))
}

fn coords_of(ls: &LineString<f64>) -> Vec<(f64, f64)> {
    ls.coords().map(|c| (c.x, c.y)).collect()
}

fn line_string(coords: &[(f64, f64)]) -> LineString<f64> {
    LineString::new(coords.iter().map(|&(x, y)| Coord { x, y }).collect())
}

fn check_finite(coords: &[(f64, f64)]) -> Result<()> {
    if coords.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return Err(MapError::geometry("coordinates must be finite"));
    }
    Ok(())
}

macro_rules! feature_builders {
    ($ty:ty) => {
        impl $ty {
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
        }
    };
}

// ------------------------ Points ------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct PointData {
    pub lon: f64,
    pub lat: f64,
    pub z: Option<f64>,
    pub value: Option<FeatureValue>,
    pub label: Option<String>,
    pub style_params: StyleOverrides,
}

impl PointData {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self {
            lon,
            lat,
            z: None,
            value: None,
            label: None,
            style_params: StyleOverrides::new(),
        }
    }

    pub fn with_z(mut self, z: f64) -> Self {
        self.z = Some(z);
        self
    }

    pub fn from_wkt(s: &str) -> Result<Self> {
        match parse_wkt(s)? {
            Geometry::Point(p) => Ok(Self::from(p)),
            other => Err(wrong_kind("POINT", &other)),
        }
    }

    pub fn to_geo(&self) -> geo_types::Point<f64> {
        geo_types::Point::new(self.lon, self.lat)
    }
}

feature_builders!(PointData);

impl From<geo_types::Point<f64>> for PointData {
    fn from(p: geo_types::Point<f64>) -> Self {
        PointData::new(p.x(), p.y())
    }
}

impl Feature for PointData {
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
        Geometry::Point(self.to_geo())
    }
}

/// Column names for [`MultiPointData::from_csv`].
#[derive(Clone, Debug, PartialEq)]
pub struct CsvColumns {
    pub lon: String,
    pub lat: String,
    pub label: Option<String>,
    /// Columns attached as the per-feature value mapping.
    pub values: Vec<String>,
}

impl Default for CsvColumns {
    fn default() -> Self {
        Self {
            lon: "lon".into(),
            lat: "lat".into(),
            label: None,
            values: Vec::new(),
        }
    }
}

impl Multi<PointData> {
    /// Points from parallel coordinate arrays.
    pub fn from_coords(lons: &[f64], lats: &[f64]) -> Result<Self> {
        if lons.len() != lats.len() {
            return Err(MapError::config(format!(
                "{} longitudes but {} latitudes",
                lons.len(),
                lats.len()
            )));
        }
        Ok(lons
            .iter()
            .zip(lats)
            .map(|(&lon, &lat)| PointData::new(lon, lat))
            .collect())
    }

    pub fn to_wkt(&self) -> String {
        let mp: geo_types::MultiPoint<f64> = self.iter().map(|p| p.to_geo()).collect();
        mp.wkt_string()
    }

    /// Accepts `MULTIPOINT` or a single `POINT`.
    pub fn from_wkt(s: &str) -> Result<Self> {
        match parse_wkt(s)? {
            Geometry::MultiPoint(mp) => Ok(mp.into_iter().map(PointData::from).collect()),
            Geometry::Point(p) => Ok(std::iter::once(PointData::from(p)).collect()),
            other => Err(wrong_kind("MULTIPOINT", &other)),
        }
    }

    /// Read points from a CSV file with a header row.
    pub fn from_csv<P: AsRef<Path>>(path: P, columns: &CsvColumns) -> Result<Self> {
        let mut rdr = csv::Reader::from_path(path)?;
        let headers = rdr.headers()?.clone();
        let col = |name: &str| {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| MapError::config(format!("CSV has no column {name:?}")))
        };
        let lon_i = col(&columns.lon)?;
        let lat_i = col(&columns.lat)?;
        let label_i = columns.label.as_deref().map(col).transpose()?;
        let value_i = columns
            .values
            .iter()
            .map(|name| col(name).map(|i| (name.clone(), i)))
            .collect::<Result<Vec<_>>>()?;

        let mut out = Multi::default();
        for (row, rec) in rdr.records().enumerate() {
            let rec = rec?;
            let number = |i: usize| {
                let cell = rec.get(i).unwrap_or("");
                cell.trim().parse::<f64>().map_err(|_| {
                    MapError::config(format!("CSV row {}: {cell:?} is not a coordinate", row + 2))
                })
            };
            let mut p = PointData::new(number(lon_i)?, number(lat_i)?);
            if let Some(i) = label_i {
                p.label = rec.get(i).map(str::to_string);
            }
            if !value_i.is_empty() {
                let map: BTreeMap<String, Datum> = value_i
                    .iter()
                    .map(|(name, i)| (name.clone(), Datum::parse_cell(rec.get(*i).unwrap_or(""))))
                    .collect();
                p.value = Some(FeatureValue::Map(map));
            }
            out.append(p);
        }
        Ok(out)
    }
}

// ------------------------ Lines ------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct LineData {
    pub coords: Vec<(f64, f64)>,
    pub value: Option<FeatureValue>,
    pub label: Option<String>,
    pub style_params: StyleOverrides,
}

impl LineData {
    pub fn new(coords: Vec<(f64, f64)>) -> Result<Self> {
        if coords.len() < 2 {
            return Err(MapError::geometry(format!(
                "a line needs at least 2 points, got {}",
                coords.len()
            )));
        }
        check_finite(&coords)?;
        Ok(Self {
            coords,
            value: None,
            label: None,
            style_params: StyleOverrides::new(),
        })
    }

    /// Closed when first and last vertices coincide.
    pub fn is_closed(&self) -> bool {
        self.coords.len() > 2 && self.coords.first() == self.coords.last()
    }

    pub fn from_wkt(s: &str) -> Result<Self> {
        match parse_wkt(s)? {
            Geometry::LineString(ls) => Self::try_from(ls),
            other => Err(wrong_kind("LINESTRING", &other)),
        }
    }

    pub fn to_geo(&self) -> LineString<f64> {
        line_string(&self.coords)
    }
}

feature_builders!(LineData);

impl TryFrom<LineString<f64>> for LineData {
    type Error = MapError;

    fn try_from(ls: LineString<f64>) -> Result<Self> {
        LineData::new(coords_of(&ls))
    }
}

impl Feature for LineData {
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
        Geometry::LineString(self.to_geo())
    }
}

impl Multi<LineData> {
    pub fn to_wkt(&self) -> String {
        geo_types::MultiLineString::new(self.iter().map(|l| l.to_geo()).collect()).wkt_string()
    }

    /// Accepts `MULTILINESTRING` or a single `LINESTRING`.
    pub fn from_wkt(s: &str) -> Result<Self> {
        match parse_wkt(s)? {
            Geometry::MultiLineString(mls) => mls.into_iter().map(LineData::try_from).collect(),
            Geometry::LineString(ls) => Ok(std::iter::once(LineData::try_from(ls)?).collect()),
            other => Err(wrong_kind("MULTILINESTRING", &other)),
        }
    }
}

// ------------------------ Polygons ------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct PolygonData {
    /// Closed exterior ring.
    pub exterior: Vec<(f64, f64)>,
    /// Closed interior rings (holes).
    pub interiors: Vec<Vec<(f64, f64)>>,
    pub value: Option<FeatureValue>,
    pub label: Option<String>,
    pub style_params: StyleOverrides,
}

/// Close a ring and check it has at least three distinct vertices.
fn closed_ring(mut ring: Vec<(f64, f64)>) -> Result<Vec<(f64, f64)>> {
    check_finite(&ring)?;
    if ring.len() > 1 && ring.first() == ring.last() {
        ring.pop();
    }
    if ring.len() < 3 {
        return Err(MapError::geometry(format!(
            "a polygon ring needs at least 3 points, got {}",
            ring.len()
        )));
    }
    ring.push(ring[0]);
    Ok(ring)
}

impl PolygonData {
    pub fn new(exterior: Vec<(f64, f64)>, interiors: Vec<Vec<(f64, f64)>>) -> Result<Self> {
        Ok(Self {
            exterior: closed_ring(exterior)?,
            interiors: interiors.into_iter().map(closed_ring).collect::<Result<_>>()?,
            value: None,
            label: None,
            style_params: StyleOverrides::new(),
        })
    }

    pub fn from_wkt(s: &str) -> Result<Self> {
        match parse_wkt(s)? {
            Geometry::Polygon(p) => Self::try_from(p),
            other => Err(wrong_kind("POLYGON", &other)),
        }
    }

    pub fn to_geo(&self) -> geo_types::Polygon<f64> {
        geo_types::Polygon::new(
            line_string(&self.exterior),
            self.interiors.iter().map(|r| line_string(r)).collect(),
        )
    }

    /// Area-weighted centroid of the polygon (holes subtracted); the vertex mean for
    /// degenerate rings.
    pub fn centroid(&self) -> (f64, f64) {
        use geo::Centroid;
        match self.to_geo().centroid() {
            Some(c) => (c.x(), c.y()),
            None => {
                let n = (self.exterior.len() - 1).max(1) as f64;
                let (sx, sy) = self.exterior[..self.exterior.len() - 1]
                    .iter()
                    .fold((0.0, 0.0), |(sx, sy), (x, y)| (sx + x, sy + y));
                (sx / n, sy / n)
            }
        }
    }
}

feature_builders!(PolygonData);

impl TryFrom<geo_types::Polygon<f64>> for PolygonData {
    type Error = MapError;

    fn try_from(p: geo_types::Polygon<f64>) -> Result<Self> {
        let (ext, ints) = p.into_inner();
        PolygonData::new(coords_of(&ext), ints.iter().map(coords_of).collect())
    }
}

impl Feature for PolygonData {
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
        Geometry::Polygon(self.to_geo())
    }
}

impl Multi<PolygonData> {
    pub fn to_wkt(&self) -> String {
        geo_types::MultiPolygon::new(self.iter().map(|p| p.to_geo()).collect()).wkt_string()
    }

    /// Accepts `MULTIPOLYGON` or a single `POLYGON`.
    pub fn from_wkt(s: &str) -> Result<Self> {
        match parse_wkt(s)? {
            Geometry::MultiPolygon(mp) => mp.into_iter().map(PolygonData::try_from).collect(),
            Geometry::Polygon(p) => Ok(std::iter::once(PolygonData::try_from(p)?).collect()),
            other => Err(wrong_kind("MULTIPOLYGON", &other)),
        }
    }
}

// ------------------------ Texts ------------------------

/// A text label anchored at a location.
#[derive(Clone, Debug, PartialEq)]
pub struct TextData {
    pub lon: f64,
    pub lat: f64,
    pub text: String,
    pub value: Option<FeatureValue>,
    pub style_params: StyleOverrides,
}

impl TextData {
    pub fn new(lon: f64, lat: f64, text: impl Into<String>) -> Self {
        Self {
            lon,
            lat,
            text: text.into(),
            value: None,
            style_params: StyleOverrides::new(),
        }
    }

    pub fn with_style_param(mut self, name: impl Into<String>, value: ParamValue) -> Self {
        self.style_params.insert(name.into(), value);
        self
    }
}

impl Feature for TextData {
    fn value(&self) -> Option<&FeatureValue> {
        self.value.as_ref()
    }

    fn label(&self) -> Option<&str> {
        Some(&self.text)
    }

    fn style_params(&self) -> &StyleOverrides {
        &self.style_params
    }

    fn geometry(&self) -> Geometry<f64> {
        Geometry::Point(geo_types::Point::new(self.lon, self.lat))
    }
}

// ------------------------ Composite ------------------------

/// Mixed geometries drawn as one layer.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompositeData {
    pub points: MultiPointData,
    pub lines: MultiLineData,
    pub polygons: MultiPolygonData,
    pub texts: MultiTextData,
}

impl CompositeData {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
            && self.lines.is_empty()
            && self.polygons.is_empty()
            && self.texts.is_empty()
    }

    /// Add a geometry, exploding multi-geometries and collections.
    pub fn push_geometry(&mut self, geom: Geometry<f64>) -> Result<()> {
        match geom {
            Geometry::Point(p) => self.points.append(p.into()),
            Geometry::MultiPoint(mp) => mp.into_iter().for_each(|p| self.points.append(p.into())),
            Geometry::Line(l) => self.lines.append(LineData::try_from(LineString::from(l))?),
            Geometry::LineString(ls) => self.lines.append(LineData::try_from(ls)?),
            Geometry::MultiLineString(mls) => {
                for ls in mls {
                    self.lines.append(LineData::try_from(ls)?);
                }
            }
            Geometry::Polygon(p) => self.polygons.append(PolygonData::try_from(p)?),
            Geometry::MultiPolygon(mp) => {
                for p in mp {
                    self.polygons.append(PolygonData::try_from(p)?);
                }
            }
            Geometry::Rect(r) => self.polygons.append(PolygonData::try_from(r.to_polygon())?),
            Geometry::Triangle(t) => self.polygons.append(PolygonData::try_from(t.to_polygon())?),
            Geometry::GeometryCollection(gc) => {
                for g in gc {
                    self.push_geometry(g)?;
                }
            }
        }
        Ok(())
    }

    pub fn from_wkt(s: &str) -> Result<Self> {
        let mut out = Self::default();
        out.push_geometry(parse_wkt(s)?)?;
        Ok(out)
    }

    /// `GEOMETRYCOLLECTION` of all parts; texts are written as points.
    pub fn to_wkt(&self) -> String {
        let geoms: Vec<Geometry<f64>> = self
            .points
            .iter()
            .map(|f| f.geometry())
            .chain(self.lines.iter().map(|f| f.geometry()))
            .chain(self.polygons.iter().map(|f| f.geometry()))
            .chain(self.texts.iter().map(|f| f.geometry()))
            .collect();
        geo_types::GeometryCollection::new_from(geoms).wkt_string()
    }

    pub fn bbox(&self) -> Option<crate::projection::Region> {
        [
            self.points.bbox(),
            self.lines.bbox(),
            self.polygons.bbox(),
            self.texts.bbox(),
        ]
        .into_iter()
        .flatten()
        .reduce(|a, b| a.union(&b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polygon_rings_are_closed() {
        let p = PolygonData::new(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0)], vec![]).unwrap();
        assert_eq!(p.exterior.len(), 4);
        assert_eq!(p.exterior.first(), p.exterior.last());
        assert!(PolygonData::new(vec![(0.0, 0.0), (1.0, 0.0), (0.0, 0.0)], vec![]).is_err());
    }

    #[test]
    fn line_needs_two_points() {
        assert!(matches!(
            LineData::new(vec![(0.0, 0.0)]).unwrap_err(),
            MapError::InvalidGeometry { .. }
        ));
    }

    #[test]
    fn wkt_kind_mismatch() {
        let err = PointData::from_wkt("LINESTRING (0 0, 1 1)").unwrap_err();
        assert!(err.to_string().contains("expected POINT"));
        assert!(MultiPointData::from_wkt("POINT (1 2)").unwrap().len() == 1);
    }

    #[test]
    fn composite_explodes_collections() {
        let c = CompositeData::from_wkt(
            "GEOMETRYCOLLECTION (POINT (1 2), MULTILINESTRING ((0 0, 1 1), (2 2, 3 3)), \
             POLYGON ((0 0, 1 0, 1 1, 0 0)))",
        )
        .unwrap();
        assert_eq!(c.points.len(), 1);
        assert_eq!(c.lines.len(), 2);
        assert_eq!(c.polygons.len(), 1);
        let bbox = c.bbox().unwrap();
        assert_eq!((bbox.lon_min, bbox.lon_max), (0.0, 3.0));
    }

    #[test]
    fn mismatched_coordinate_arrays() {
        assert!(MultiPointData::from_coords(&[0.0, 1.0], &[0.0]).is_err());
    }

    #[test]
    fn feature_properties_carry_values_and_label() {
        let p = PointData::new(4.0, 50.0).with_value(3.0).with_label("Doel");
        let f = p.to_feature();
        let props = f.properties.unwrap();
        assert_eq!(props["value"], serde_json::json!(3.0));
        assert_eq!(props["label"], serde_json::json!("Doel"));
    }
}
