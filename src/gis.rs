//! GeoJSON file adapter.
//!
//! [`GisData`] reads a GeoJSON document and splits its features into point, line and
//! polygon containers with selected attribute columns attached as per-feature values.
//! Closed line strings are reclassified as polygons unless disabled, and rings with too
//! few vertices are dropped with a warning.

use crate::data::{
    Datum, Feature, FeatureValue, LineData, MultiLineData, MultiPointData, MultiPolygonData,
    PointData, PolygonData,
};
use crate::error::{MapError, Result};
use geo_types::{Geometry, LineString};
use geojson::{GeoJson, JsonObject};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

/// A GIS file plus the columns and rows to read from it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GisData {
    pub path: PathBuf,
    /// Attribute columns attached as each feature's value mapping.
    pub columns: Vec<String>,
    /// Attribute used as feature label.
    pub label_column: Option<String>,
    /// Keep a feature only when, for every entry, its column equals one of the values.
    pub filters: BTreeMap<String, Vec<Datum>>,
    /// Turn closed line strings (at least 4 vertices) into polygons.
    pub closed_lines_as_polygons: bool,
    /// Rings with fewer distinct vertices are dropped.
    pub min_ring_points: usize,
}

impl Default for GisData {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            columns: Vec::new(),
            label_column: None,
            filters: BTreeMap::new(),
            closed_lines_as_polygons: true,
            min_ring_points: 3,
        }
    }
}

/// Features of a GIS file split by geometry kind.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GisLayers {
    pub points: MultiPointData,
    pub lines: MultiLineData,
    pub polygons: MultiPolygonData,
}

impl GisLayers {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty() && self.lines.is_empty() && self.polygons.is_empty()
    }

    pub fn len(&self) -> usize {
        self.points.len() + self.lines.len() + self.polygons.len()
    }

    pub fn bbox(&self) -> Option<crate::projection::Region> {
        [self.points.bbox(), self.lines.bbox(), self.polygons.bbox()]
            .into_iter()
            .flatten()
            .reduce(|a, b| a.union(&b))
    }

    pub fn to_feature_collection(&self) -> geojson::FeatureCollection {
        let features = self
            .points
            .iter()
            .map(|f| f.to_feature())
            .chain(self.lines.iter().map(|f| f.to_feature()))
            .chain(self.polygons.iter().map(|f| f.to_feature()))
            .collect();
        geojson::FeatureCollection {
            bbox: None,
            features,
            foreign_members: None,
        }
    }
}

/// Per-feature attributes carried through geometry explosion.
struct Attributes {
    value: Option<FeatureValue>,
    label: Option<String>,
}

impl GisData {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_label_column(mut self, column: impl Into<String>) -> Self {
        self.label_column = Some(column.into());
        self
    }

    pub fn with_filter(mut self, column: impl Into<String>, values: Vec<Datum>) -> Self {
        self.filters.insert(column.into(), values);
        self
    }

    pub fn with_closed_lines_as_polygons(mut self, enabled: bool) -> Self {
        self.closed_lines_as_polygons = enabled;
        self
    }

    /// Read the file and split it into point, line and polygon layers.
    pub fn get_data(&self) -> Result<GisLayers> {
        let file = File::open(&self.path).map_err(|e| {
            MapError::config(format!("cannot open {}: {e}", self.path.display()))
        })?;
        let geojson = GeoJson::from_reader(BufReader::new(file))?;
        self.read(geojson)
    }

    /// Split an already parsed document.
    pub fn read(&self, geojson: GeoJson) -> Result<GisLayers> {
        let mut out = GisLayers::default();
        let features = match geojson {
            GeoJson::FeatureCollection(fc) => fc.features,
            GeoJson::Feature(f) => vec![f],
            GeoJson::Geometry(g) => vec![geojson::Feature {
                bbox: None,
                geometry: Some(g),
                id: None,
                properties: None,
                foreign_members: None,
            }],
        };
        let total = features.len();
        for feature in features {
            let props = feature.properties.unwrap_or_default();
            if !self.keep(&props) {
                continue;
            }
            let Some(geometry) = feature.geometry else {
                continue;
            };
            let attrs = self.attributes(&props)?;
            let geom = Geometry::<f64>::try_from(geometry.value)?;
            self.push(&mut out, geom, &attrs);
        }
        log::debug!(
            "{}: {} of {total} features -> {} points, {} lines, {} polygons",
            self.path.display(),
            out.len(),
            out.points.len(),
            out.lines.len(),
            out.polygons.len()
        );
        Ok(out)
    }

    fn keep(&self, props: &JsonObject) -> bool {
        self.filters.iter().all(|(column, allowed)| {
            props
                .get(column)
                .and_then(Datum::from_json)
                .is_some_and(|d| allowed.iter().any(|a| datum_eq(a, &d)))
        })
    }

    fn attributes(&self, props: &JsonObject) -> Result<Attributes> {
        let value = if self.columns.is_empty() {
            None
        } else {
            let mut map = BTreeMap::new();
            for column in &self.columns {
                let datum = props
                    .get(column)
                    .ok_or_else(|| MapError::config(format!("feature has no column {column:?}")))?;
                if let Some(d) = Datum::from_json(datum) {
                    map.insert(column.clone(), d);
                }
            }
            Some(FeatureValue::Map(map))
        };
        let label = self
            .label_column
            .as_ref()
            .and_then(|c| props.get(c))
            .and_then(Datum::from_json)
            .map(|d| d.to_string());
        Ok(Attributes { value, label })
    }

    fn push(&self, out: &mut GisLayers, geom: Geometry<f64>, attrs: &Attributes) {
        match geom {
            Geometry::Point(p) => out.points.append(decorate_point(p.into(), attrs)),
            Geometry::MultiPoint(mp) => {
                for p in mp {
                    out.points.append(decorate_point(p.into(), attrs));
                }
            }
            Geometry::Line(l) => self.push_line(out, LineString::from(l), attrs),
            Geometry::LineString(ls) => self.push_line(out, ls, attrs),
            Geometry::MultiLineString(mls) => {
                for ls in mls {
                    self.push_line(out, ls, attrs);
                }
            }
            Geometry::Polygon(p) => self.push_polygon(out, p, attrs),
            Geometry::MultiPolygon(mp) => {
                for p in mp {
                    self.push_polygon(out, p, attrs);
                }
            }
            Geometry::Rect(r) => self.push_polygon(out, r.to_polygon(), attrs),
            Geometry::Triangle(t) => self.push_polygon(out, t.to_polygon(), attrs),
            Geometry::GeometryCollection(gc) => {
                for g in gc {
                    self.push(out, g, attrs);
                }
            }
        }
    }

    fn push_line(&self, out: &mut GisLayers, ls: LineString<f64>, attrs: &Attributes) {
        if self.closed_lines_as_polygons && ls.is_closed() && ls.0.len() >= 4 {
            self.push_polygon(out, geo_types::Polygon::new(ls, vec![]), attrs);
            return;
        }
        match LineData::try_from(ls) {
            Ok(mut line) => {
                line.value = attrs.value.clone();
                line.label = attrs.label.clone();
                out.lines.append(line);
            }
            Err(e) => log::warn!("{}: skipping line: {e}", self.path.display()),
        }
    }

    fn push_polygon(&self, out: &mut GisLayers, p: geo_types::Polygon<f64>, attrs: &Attributes) {
        let (exterior, interiors) = p.into_inner();
        let exterior = ring_coords(&exterior);
        if distinct_vertices(&exterior) < self.min_ring_points {
            log::warn!(
                "{}: dropping polygon with {} ring points",
                self.path.display(),
                distinct_vertices(&exterior)
            );
            return;
        }
        let holes: Vec<Vec<(f64, f64)>> = interiors
            .iter()
            .map(ring_coords)
            .filter(|ring| {
                let keep = distinct_vertices(ring) >= self.min_ring_points;
                if !keep {
                    log::warn!("{}: dropping degenerate interior ring", self.path.display());
                }
                keep
            })
            .collect();
        match PolygonData::new(exterior, holes) {
            Ok(mut poly) => {
                poly.value = attrs.value.clone();
                poly.label = attrs.label.clone();
                out.polygons.append(poly);
            }
            Err(e) => log::warn!("{}: skipping polygon: {e}", self.path.display()),
        }
    }
}

fn decorate_point(mut p: PointData, attrs: &Attributes) -> PointData {
    p.value = attrs.value.clone();
    p.label = attrs.label.clone();
    p
}

fn ring_coords(ls: &LineString<f64>) -> Vec<(f64, f64)> {
    ls.coords().map(|c| (c.x, c.y)).collect()
}

/// Vertex count without the closing vertex.
fn distinct_vertices(ring: &[(f64, f64)]) -> usize {
    match (ring.first(), ring.last()) {
        (Some(a), Some(b)) if ring.len() > 1 && a == b => ring.len() - 1,
        _ => ring.len(),
    }
}

/// Filter comparison: numbers by value (so `"3"` matches `3`), text exactly.
fn datum_eq(a: &Datum, b: &Datum) -> bool {
    match (a.as_number(), b.as_number()) {
        (Some(x), Some(y)) => x == y,
        _ => a.to_string() == b.to_string(),
    }
}

/// Write all layers as one GeoJSON FeatureCollection.
pub fn export_geojson<P: AsRef<Path>>(path: P, layers: &GisLayers) -> Result<()> {
    let mut f = File::create(path)?;
    let s = serde_json::to_string_pretty(&layers.to_feature_collection())?;
    f.write_all(s.as_bytes())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> GeoJson {
        r#"{
          "type": "FeatureCollection",
          "features": [
            {"type": "Feature", "properties": {"name": "A", "kind": "city", "pop": 10},
             "geometry": {"type": "Point", "coordinates": [4.0, 50.0]}},
            {"type": "Feature", "properties": {"name": "B", "kind": "town", "pop": 2},
             "geometry": {"type": "MultiPoint", "coordinates": [[5.0, 51.0], [6.0, 51.5]]}},
            {"type": "Feature", "properties": {"name": "ring", "kind": "zone", "pop": 0},
             "geometry": {"type": "LineString",
                          "coordinates": [[0, 0], [1, 0], [1, 1], [0, 0]]}},
            {"type": "Feature", "properties": {"name": "bad", "kind": "zone", "pop": 0},
             "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 1], [0, 0]]]}}
          ]
        }"#
        .parse()
        .unwrap()
    }

    #[test]
    fn splits_kinds_and_reclassifies_closed_lines() {
        let layers = GisData::new("mem.geojson")
            .with_columns(["pop"])
            .with_label_column("name")
            .read(doc())
            .unwrap();
        assert_eq!(layers.points.len(), 3);
        assert_eq!(layers.lines.len(), 0);
        // the closed line becomes a polygon, the two-vertex ring is dropped
        assert_eq!(layers.polygons.len(), 1);
        assert_eq!(layers.points.labels(), vec![Some("A"), Some("B"), Some("B")]);
        let v = layers.points.items()[0].value.as_ref().unwrap();
        assert_eq!(v.get("pop"), Some(&Datum::Number(10.0)));
    }

    #[test]
    fn reclassification_can_be_disabled() {
        let layers = GisData::new("mem.geojson")
            .with_closed_lines_as_polygons(false)
            .read(doc())
            .unwrap();
        assert_eq!(layers.lines.len(), 1);
        assert!(layers.polygons.is_empty());
    }

    #[test]
    fn filters_select_rows() {
        let layers = GisData::new("mem.geojson")
            .with_filter("kind", vec![Datum::from("city"), Datum::from("town")])
            .read(doc())
            .unwrap();
        assert_eq!(layers.len(), 3);
        assert!(layers.polygons.is_empty());
    }

    #[test]
    fn missing_column_is_config_error() {
        let err = GisData::new("mem.geojson")
            .with_columns(["area"])
            .read(doc())
            .unwrap_err();
        assert!(matches!(err, MapError::Config { .. }));
    }
}
