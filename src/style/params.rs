//! Style attribute values: fixed-or-thematic parameters and keyword maps.

use crate::color::Rgba;
use crate::error::{MapError, Result};
use crate::style::{LineDash, MarkerShape};
use crate::thematic::{AnyTheme, StyleOutput, ThematicStyle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single style attribute value, as found in keyword maps and per-feature overrides.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged, from = "RawParam")]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Color(Rgba),
    Marker(MarkerShape),
    Dash(LineDash),
    /// Placeholder for an attribute driven by a thematic style (holds the resolver kind).
    Thematic(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawParam {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl From<RawParam> for ParamValue {
    fn from(raw: RawParam) -> Self {
        match raw {
            RawParam::Bool(b) => ParamValue::Bool(b),
            RawParam::Number(v) => ParamValue::Number(v),
            RawParam::Text(s) => ParamValue::Text(s),
        }
    }
}

impl ParamValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(v) => Some(*v),
            ParamValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamValue::Bool(b) => write!(f, "{b}"),
            ParamValue::Number(v) => write!(f, "{v}"),
            ParamValue::Text(s) => write!(f, "{s:?}"),
            ParamValue::Color(c) => write!(f, "{c}"),
            ParamValue::Marker(m) => write!(f, "{m:?}"),
            ParamValue::Dash(d) => write!(f, "{d:?}"),
            ParamValue::Thematic(kind) => write!(f, "<{kind}>"),
        }
    }
}

/// Ordered keyword map handed to draw calls.
pub type Kwargs = BTreeMap<String, ParamValue>;

/// Per-feature attribute overrides (`style_params`).
pub type StyleOverrides = BTreeMap<String, ParamValue>;

/// Convert an override value to the attribute's type.
pub fn param_as<T: StyleOutput>(name: &str, value: &ParamValue) -> Result<T> {
    T::from_param(value).ok_or_else(|| {
        MapError::config(format!("invalid value {value} for style attribute {name:?}"))
    })
}

pub fn param_f64(name: &str, value: &ParamValue) -> Result<f64> {
    value.as_f64().ok_or_else(|| {
        MapError::config(format!("style attribute {name:?} expects a number, got {value}"))
    })
}

pub fn unknown_attribute(style: &str, name: &str) -> MapError {
    MapError::config(format!("{style} has no attribute {name:?}"))
}

/// A style attribute that is either a fixed value or driven by data.
#[derive(Clone, Debug, PartialEq)]
pub enum StyleParam<T> {
    Fixed(T),
    Thematic(ThematicStyle<T>),
}

impl<T> From<ThematicStyle<T>> for StyleParam<T> {
    fn from(theme: ThematicStyle<T>) -> Self {
        StyleParam::Thematic(theme)
    }
}

impl From<Rgba> for StyleParam<Rgba> {
    fn from(v: Rgba) -> Self {
        StyleParam::Fixed(v)
    }
}

impl From<f64> for StyleParam<f64> {
    fn from(v: f64) -> Self {
        StyleParam::Fixed(v)
    }
}

impl From<MarkerShape> for StyleParam<MarkerShape> {
    fn from(v: MarkerShape) -> Self {
        StyleParam::Fixed(v)
    }
}

impl From<LineDash> for StyleParam<LineDash> {
    fn from(v: LineDash) -> Self {
        StyleParam::Fixed(v)
    }
}

impl<T: StyleOutput> StyleParam<T> {
    pub fn is_thematic(&self) -> bool {
        matches!(self, StyleParam::Thematic(_))
    }

    pub fn theme(&self) -> Option<&ThematicStyle<T>> {
        match self {
            StyleParam::Thematic(t) => Some(t),
            StyleParam::Fixed(_) => None,
        }
    }

    pub fn any_theme(&self) -> Option<AnyTheme<'_>> {
        self.theme().map(|t| t.as_any())
    }

    /// The fixed value, or a value standing in for the whole thematic rule.
    pub fn representative(&self) -> Result<T> {
        match self {
            StyleParam::Fixed(v) => Ok(v.clone()),
            StyleParam::Thematic(t) => t
                .representative()
                .ok_or_else(|| MapError::config("thematic style has no representative value")),
        }
    }

    pub fn to_param(&self) -> ParamValue {
        match self {
            StyleParam::Fixed(v) => v.to_param(),
            StyleParam::Thematic(t) => ParamValue::Thematic(t.kind_name().to_string()),
        }
    }

    pub fn from_override(name: &str, value: &ParamValue) -> Result<Self> {
        param_as(name, value).map(StyleParam::Fixed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_deserialize_from_json() {
        let o: StyleOverrides =
            serde_json::from_str(r#"{"fill_color": "red", "size": 4, "visible": true}"#).unwrap();
        assert_eq!(o["fill_color"], ParamValue::Text("red".into()));
        assert_eq!(o["size"], ParamValue::Number(4.0));
        assert_eq!(param_as::<Rgba>("fill_color", &o["fill_color"]).unwrap(), Rgba::rgb(255, 0, 0));
        assert!(param_as::<MarkerShape>("shape", &o["size"]).is_err());
    }

    #[test]
    fn thematic_param_keyword() {
        let theme = ThematicStyle::ranges(vec![0.0, 10.0, 20.0], vec![1.0, 2.0]).unwrap();
        let param = StyleParam::from(theme);
        assert!(param.is_thematic());
        assert_eq!(param.representative().unwrap(), 1.0);
        assert_eq!(param.to_param(), ParamValue::Thematic("ranges".into()));
        assert_eq!(StyleParam::from(3.0).to_param(), ParamValue::Number(3.0));
    }
}
