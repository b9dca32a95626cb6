//! Data containers: geometry records with per-feature values, labels and style overrides.
//!
//! Multi-geometries are plain vectors of single records ([`Multi`]), so values, labels and
//! overrides always stay parallel to the coordinates.

pub mod focmec;
pub mod grid;
pub mod raster;
pub mod vector;

pub use focmec::{Beachball, FocmecData, MultiFocmecData};
pub use grid::{Gridding, Interpolation, MeshGridData, UnstructuredGridData};
pub use raster::GeoImage;
pub use vector::{
    CompositeData, CsvColumns, LineData, MultiLineData, MultiPointData, MultiPolygonData,
    MultiTextData, PointData, PolygonData, TextData,
};

use crate::error::{MapError, Result};
use crate::projection::Region;
use crate::style::StyleOverrides;
use geojson::JsonObject;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// One raw data value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Datum {
    Number(f64),
    Text(String),
}

impl Datum {
    /// Numeric view; text that parses as a number counts.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Datum::Number(v) => Some(*v),
            Datum::Text(s) => s.trim().parse().ok(),
        }
    }

    /// Interpret a CSV/text cell: numbers become `Number`, anything else `Text`.
    pub fn parse_cell(s: &str) -> Self {
        match s.trim().parse::<f64>() {
            Ok(v) => Datum::Number(v),
            Err(_) => Datum::Text(s.to_string()),
        }
    }

    /// From a GeoJSON property; `null`, arrays and objects have no datum.
    pub fn from_json(v: &serde_json::Value) -> Option<Self> {
        match v {
            serde_json::Value::Number(n) => n.as_f64().map(Datum::Number),
            serde_json::Value::String(s) => Some(Datum::Text(s.clone())),
            serde_json::Value::Bool(b) => Some(Datum::Text(b.to_string())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Datum::Number(v) => serde_json::Number::from_f64(*v)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Datum::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl fmt::Display for Datum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Datum::Number(v) => write!(f, "{v}"),
            Datum::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for Datum {
    fn from(v: f64) -> Self {
        Datum::Number(v)
    }
}

impl From<&str> for Datum {
    fn from(s: &str) -> Self {
        Datum::Text(s.to_string())
    }
}

impl From<String> for Datum {
    fn from(s: String) -> Self {
        Datum::Text(s)
    }
}

/// A feature's value: a single datum or a named mapping of data.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Scalar(Datum),
    Map(BTreeMap<String, Datum>),
}

impl FeatureValue {
    /// Pick the datum a thematic style classifies. A scalar ignores the key; a map needs the
    /// key unless it holds exactly one entry.
    pub fn select(&self, key: Option<&str>) -> Result<&Datum> {
        match (self, key) {
            (FeatureValue::Scalar(d), _) => Ok(d),
            (FeatureValue::Map(m), Some(k)) => m.get(k).ok_or_else(|| MapError::MissingValueKey {
                key: k.to_string(),
            }),
            (FeatureValue::Map(m), None) if m.len() == 1 => {
                m.values().next().ok_or_else(|| MapError::MissingValueKey {
                    key: "<none>".into(),
                })
            }
            (FeatureValue::Map(m), None) => Err(MapError::MissingValueKey {
                key: format!(
                    "<none> (value has keys {})",
                    m.keys().cloned().collect::<Vec<_>>().join(", ")
                ),
            }),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Datum> {
        match self {
            FeatureValue::Scalar(_) => None,
            FeatureValue::Map(m) => m.get(key),
        }
    }

    /// GeoJSON properties: map entries as-is, a scalar under `"value"`.
    pub fn to_properties(&self) -> JsonObject {
        let mut props = JsonObject::new();
        match self {
            FeatureValue::Scalar(d) => {
                props.insert("value".into(), d.to_json());
            }
            FeatureValue::Map(m) => {
                for (k, d) in m {
                    props.insert(k.clone(), d.to_json());
                }
            }
        }
        props
    }
}

impl From<f64> for FeatureValue {
    fn from(v: f64) -> Self {
        FeatureValue::Scalar(Datum::Number(v))
    }
}

impl From<&str> for FeatureValue {
    fn from(s: &str) -> Self {
        FeatureValue::Scalar(Datum::Text(s.to_string()))
    }
}

impl From<Datum> for FeatureValue {
    fn from(d: Datum) -> Self {
        FeatureValue::Scalar(d)
    }
}

impl From<BTreeMap<String, Datum>> for FeatureValue {
    fn from(m: BTreeMap<String, Datum>) -> Self {
        FeatureValue::Map(m)
    }
}

/// Shared accessors of every single-geometry record.
pub trait Feature {
    fn value(&self) -> Option<&FeatureValue>;
    fn label(&self) -> Option<&str>;
    fn style_params(&self) -> &StyleOverrides;
    fn geometry(&self) -> geo_types::Geometry<f64>;

    fn bbox(&self) -> Option<Region> {
        use geo::BoundingRect;
        self.geometry().bounding_rect().map(Region::from_rect)
    }

    fn to_wkt(&self) -> String {
        use wkt::ToWkt;
        self.geometry().wkt_string()
    }

    /// GeoJSON feature with value entries and the label as properties.
    fn to_feature(&self) -> geojson::Feature {
        let mut props = self.value().map(|v| v.to_properties()).unwrap_or_default();
        if let Some(label) = self.label() {
            props.insert("label".into(), serde_json::Value::String(label.to_string()));
        }
        geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(&self.geometry()))),
            id: None,
            properties: Some(props),
            foreign_members: None,
        }
    }
}

/// An ordered collection of single records of one kind.
#[derive(Clone, Debug, PartialEq)]
pub struct Multi<T> {
    items: Vec<T>,
}

impl<T> Default for Multi<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T: Feature> Multi<T> {
    pub fn from_items(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn append(&mut self, item: T) {
        self.items.push(item);
    }

    pub fn extend(&mut self, other: Multi<T>) {
        self.items.extend(other.items);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn values(&self) -> Vec<Option<&FeatureValue>> {
        self.items.iter().map(|f| f.value()).collect()
    }

    pub fn labels(&self) -> Vec<Option<&str>> {
        self.items.iter().map(|f| f.label()).collect()
    }

    /// Per-feature overrides; empty when no feature carries any.
    pub fn overrides(&self) -> Vec<Option<&StyleOverrides>> {
        if self.items.iter().all(|f| f.style_params().is_empty()) {
            return Vec::new();
        }
        self.items
            .iter()
            .map(|f| Some(f.style_params()).filter(|o| !o.is_empty()))
            .collect()
    }

    pub fn bbox(&self) -> Option<Region> {
        self.items
            .iter()
            .filter_map(|f| f.bbox())
            .reduce(|a, b| a.union(&b))
    }

    pub fn to_feature_collection(&self) -> geojson::FeatureCollection {
        geojson::FeatureCollection {
            bbox: None,
            features: self.items.iter().map(|f| f.to_feature()).collect(),
            foreign_members: None,
        }
    }
}

impl<T> FromIterator<T> for Multi<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

impl<'a, T> IntoIterator for &'a Multi<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_by_key() {
        let v = FeatureValue::Map(BTreeMap::from([
            ("a".to_string(), Datum::Number(1.0)),
            ("b".to_string(), Datum::from("x")),
        ]));
        assert_eq!(v.select(Some("b")).unwrap(), &Datum::from("x"));
        assert!(v.select(None).is_err());
        assert!(v.select(Some("c")).is_err());
        let single = FeatureValue::Map(BTreeMap::from([("a".to_string(), Datum::Number(1.0))]));
        assert_eq!(single.select(None).unwrap(), &Datum::Number(1.0));
        assert_eq!(FeatureValue::from(2.0).select(Some("a")).unwrap(), &Datum::Number(2.0));
    }

    #[test]
    fn datum_parsing() {
        assert_eq!(Datum::parse_cell(" 3.5"), Datum::Number(3.5));
        assert_eq!(Datum::parse_cell("Doel"), Datum::from("Doel"));
        assert_eq!(Datum::from("12").as_number(), Some(12.0));
        assert_eq!(Datum::from_json(&serde_json::json!(null)), None);
    }
}
