//! Layer styles and their resolved per-feature counterparts.

use super::params::{Kwargs, ParamValue, StyleParam, param_as, param_f64, unknown_attribute};
use super::{ColorbarStyle, ConcreteStyle, FrontStyle, LayerStyle, LineDash, MarkerShape, TextStyle};
use crate::color::Rgba;
use crate::colormap::{Colormap, Norm, ScalarMappable};
use crate::error::Result;
use crate::thematic::{AnyTheme, ThematicStyle};
use serde::{Deserialize, Serialize};

const DEFAULT_COLOR: Rgba = Rgba::rgb(31, 119, 180);

fn kwargs<const N: usize>(pairs: [(&str, ParamValue); N]) -> Kwargs {
    pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

fn push_theme<'a, T: crate::thematic::StyleOutput>(
    out: &mut Vec<(&'static str, AnyTheme<'a>)>,
    name: &'static str,
    param: &'a StyleParam<T>,
) {
    if let Some(t) = param.any_theme() {
        out.push((name, t));
    }
}

// ------------------------ Points ------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct PointStyle {
    pub shape: StyleParam<MarkerShape>,
    /// Marker size in pixels.
    pub size: StyleParam<f64>,
    pub fill_color: StyleParam<Rgba>,
    pub line_color: StyleParam<Rgba>,
    pub line_width: f64,
    pub alpha: f64,
    /// Draw feature labels next to the markers.
    pub label_style: Option<TextStyle>,
}

impl Default for PointStyle {
    fn default() -> Self {
        Self {
            shape: MarkerShape::Circle.into(),
            size: 6.0.into(),
            fill_color: DEFAULT_COLOR.into(),
            line_color: Rgba::BLACK.into(),
            line_width: 0.5,
            alpha: 1.0,
            label_style: None,
        }
    }
}

impl PointStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_shape(mut self, shape: impl Into<StyleParam<MarkerShape>>) -> Self {
        self.shape = shape.into();
        self
    }

    pub fn with_size(mut self, size: impl Into<StyleParam<f64>>) -> Self {
        self.size = size.into();
        self
    }

    pub fn with_fill_color(mut self, color: impl Into<StyleParam<Rgba>>) -> Self {
        self.fill_color = color.into();
        self
    }

    pub fn with_line_color(mut self, color: impl Into<StyleParam<Rgba>>) -> Self {
        self.line_color = color.into();
        self
    }

    pub fn with_label_style(mut self, style: TextStyle) -> Self {
        self.label_style = Some(style);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConcretePointStyle {
    pub shape: MarkerShape,
    pub size: f64,
    pub fill_color: Rgba,
    pub line_color: Rgba,
    pub line_width: f64,
    pub alpha: f64,
}

impl ConcreteStyle for ConcretePointStyle {
    fn set(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "shape" => self.shape = param_as(name, value)?,
            "size" => self.size = param_f64(name, value)?,
            "fill_color" => self.fill_color = param_as(name, value)?,
            "line_color" => self.line_color = param_as(name, value)?,
            "line_width" => self.line_width = param_f64(name, value)?,
            "alpha" => self.alpha = param_f64(name, value)?,
            _ => return Err(unknown_attribute("PointStyle", name)),
        }
        Ok(())
    }

    fn to_kwargs(&self) -> Kwargs {
        kwargs([
            ("shape", ParamValue::Marker(self.shape)),
            ("size", ParamValue::Number(self.size)),
            ("fill_color", ParamValue::Color(self.fill_color)),
            ("line_color", ParamValue::Color(self.line_color)),
            ("line_width", ParamValue::Number(self.line_width)),
            ("alpha", ParamValue::Number(self.alpha)),
        ])
    }
}

impl LayerStyle for PointStyle {
    type Concrete = ConcretePointStyle;
    const NAME: &'static str = "PointStyle";

    fn projection(&self) -> Result<ConcretePointStyle> {
        Ok(ConcretePointStyle {
            shape: self.shape.representative()?,
            size: self.size.representative()?,
            fill_color: self.fill_color.representative()?,
            line_color: self.line_color.representative()?,
            line_width: self.line_width,
            alpha: self.alpha,
        })
    }

    fn thematic_attrs(&self) -> Vec<(&'static str, AnyTheme<'_>)> {
        let mut out = Vec::new();
        push_theme(&mut out, "shape", &self.shape);
        push_theme(&mut out, "size", &self.size);
        push_theme(&mut out, "fill_color", &self.fill_color);
        push_theme(&mut out, "line_color", &self.line_color);
        out
    }

    fn set_fixed(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "shape" => self.shape = StyleParam::from_override(name, value)?,
            "size" => self.size = StyleParam::from_override(name, value)?,
            "fill_color" => self.fill_color = StyleParam::from_override(name, value)?,
            "line_color" => self.line_color = StyleParam::from_override(name, value)?,
            "line_width" => self.line_width = param_f64(name, value)?,
            "alpha" => self.alpha = param_f64(name, value)?,
            _ => return Err(unknown_attribute(Self::NAME, name)),
        }
        Ok(())
    }

    fn to_kwargs(&self) -> Kwargs {
        kwargs([
            ("shape", self.shape.to_param()),
            ("size", self.size.to_param()),
            ("fill_color", self.fill_color.to_param()),
            ("line_color", self.line_color.to_param()),
            ("line_width", ParamValue::Number(self.line_width)),
            ("alpha", ParamValue::Number(self.alpha)),
        ])
    }
}

// ------------------------ Lines ------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct LineStyle {
    pub line_color: StyleParam<Rgba>,
    pub line_width: StyleParam<f64>,
    pub line_pattern: StyleParam<LineDash>,
    pub alpha: f64,
    /// Weather-front decoration; such lines are drawn one call per line.
    pub front: Option<FrontStyle>,
}

impl Default for LineStyle {
    fn default() -> Self {
        Self {
            line_color: DEFAULT_COLOR.into(),
            line_width: 1.0.into(),
            line_pattern: LineDash::Solid.into(),
            alpha: 1.0,
            front: None,
        }
    }
}

impl LineStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_line_color(mut self, color: impl Into<StyleParam<Rgba>>) -> Self {
        self.line_color = color.into();
        self
    }

    pub fn with_line_width(mut self, width: impl Into<StyleParam<f64>>) -> Self {
        self.line_width = width.into();
        self
    }

    pub fn with_line_pattern(mut self, pattern: impl Into<StyleParam<LineDash>>) -> Self {
        self.line_pattern = pattern.into();
        self
    }

    pub fn with_front(mut self, front: FrontStyle) -> Self {
        self.front = Some(front);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConcreteLineStyle {
    pub line_color: Rgba,
    pub line_width: f64,
    pub line_pattern: LineDash,
    pub alpha: f64,
}

impl Default for ConcreteLineStyle {
    fn default() -> Self {
        Self {
            line_color: Rgba::BLACK,
            line_width: 1.0,
            line_pattern: LineDash::Solid,
            alpha: 1.0,
        }
    }
}

impl ConcreteStyle for ConcreteLineStyle {
    fn set(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "line_color" => self.line_color = param_as(name, value)?,
            "line_width" => self.line_width = param_f64(name, value)?,
            "line_pattern" => self.line_pattern = param_as(name, value)?,
            "alpha" => self.alpha = param_f64(name, value)?,
            _ => return Err(unknown_attribute("LineStyle", name)),
        }
        Ok(())
    }

    fn to_kwargs(&self) -> Kwargs {
        kwargs([
            ("line_color", ParamValue::Color(self.line_color)),
            ("line_width", ParamValue::Number(self.line_width)),
            ("line_pattern", ParamValue::Dash(self.line_pattern)),
            ("alpha", ParamValue::Number(self.alpha)),
        ])
    }
}

impl LayerStyle for LineStyle {
    type Concrete = ConcreteLineStyle;
    const NAME: &'static str = "LineStyle";

    fn projection(&self) -> Result<ConcreteLineStyle> {
        Ok(ConcreteLineStyle {
            line_color: self.line_color.representative()?,
            line_width: self.line_width.representative()?,
            line_pattern: self.line_pattern.representative()?,
            alpha: self.alpha,
        })
    }

    fn thematic_attrs(&self) -> Vec<(&'static str, AnyTheme<'_>)> {
        let mut out = Vec::new();
        push_theme(&mut out, "line_color", &self.line_color);
        push_theme(&mut out, "line_width", &self.line_width);
        push_theme(&mut out, "line_pattern", &self.line_pattern);
        out
    }

    fn set_fixed(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "line_color" => self.line_color = StyleParam::from_override(name, value)?,
            "line_width" => self.line_width = StyleParam::from_override(name, value)?,
            "line_pattern" => self.line_pattern = StyleParam::from_override(name, value)?,
            "alpha" => self.alpha = param_f64(name, value)?,
            _ => return Err(unknown_attribute(Self::NAME, name)),
        }
        Ok(())
    }

    fn to_kwargs(&self) -> Kwargs {
        kwargs([
            ("line_color", self.line_color.to_param()),
            ("line_width", self.line_width.to_param()),
            ("line_pattern", self.line_pattern.to_param()),
            ("alpha", ParamValue::Number(self.alpha)),
            ("front", ParamValue::Bool(self.front.is_some())),
        ])
    }
}

// ------------------------ Polygons ------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct PolygonStyle {
    pub line_color: StyleParam<Rgba>,
    pub line_width: StyleParam<f64>,
    pub line_pattern: LineDash,
    pub fill_color: StyleParam<Rgba>,
    pub alpha: StyleParam<f64>,
    /// Draw feature labels at the ring centroid.
    pub label_style: Option<TextStyle>,
}

impl Default for PolygonStyle {
    fn default() -> Self {
        Self {
            line_color: Rgba::BLACK.into(),
            line_width: 1.0.into(),
            line_pattern: LineDash::Solid,
            fill_color: DEFAULT_COLOR.into(),
            alpha: 1.0.into(),
            label_style: None,
        }
    }
}

impl PolygonStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fill_color(mut self, color: impl Into<StyleParam<Rgba>>) -> Self {
        self.fill_color = color.into();
        self
    }

    pub fn with_line_color(mut self, color: impl Into<StyleParam<Rgba>>) -> Self {
        self.line_color = color.into();
        self
    }

    pub fn with_line_width(mut self, width: impl Into<StyleParam<f64>>) -> Self {
        self.line_width = width.into();
        self
    }

    pub fn with_alpha(mut self, alpha: impl Into<StyleParam<f64>>) -> Self {
        self.alpha = alpha.into();
        self
    }

    pub fn with_label_style(mut self, style: TextStyle) -> Self {
        self.label_style = Some(style);
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConcretePolygonStyle {
    pub line_color: Rgba,
    pub line_width: f64,
    pub line_pattern: LineDash,
    pub fill_color: Rgba,
    pub alpha: f64,
}

impl ConcretePolygonStyle {
    pub fn outline(&self) -> ConcreteLineStyle {
        ConcreteLineStyle {
            line_color: self.line_color,
            line_width: self.line_width,
            line_pattern: self.line_pattern,
            alpha: self.alpha,
        }
    }
}

impl ConcreteStyle for ConcretePolygonStyle {
    fn set(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "line_color" => self.line_color = param_as(name, value)?,
            "line_width" => self.line_width = param_f64(name, value)?,
            "line_pattern" => self.line_pattern = param_as(name, value)?,
            "fill_color" => self.fill_color = param_as(name, value)?,
            "alpha" => self.alpha = param_f64(name, value)?,
            _ => return Err(unknown_attribute("PolygonStyle", name)),
        }
        Ok(())
    }

    fn to_kwargs(&self) -> Kwargs {
        kwargs([
            ("line_color", ParamValue::Color(self.line_color)),
            ("line_width", ParamValue::Number(self.line_width)),
            ("line_pattern", ParamValue::Dash(self.line_pattern)),
            ("fill_color", ParamValue::Color(self.fill_color)),
            ("alpha", ParamValue::Number(self.alpha)),
        ])
    }
}

impl LayerStyle for PolygonStyle {
    type Concrete = ConcretePolygonStyle;
    const NAME: &'static str = "PolygonStyle";

    fn projection(&self) -> Result<ConcretePolygonStyle> {
        Ok(ConcretePolygonStyle {
            line_color: self.line_color.representative()?,
            line_width: self.line_width.representative()?,
            line_pattern: self.line_pattern,
            fill_color: self.fill_color.representative()?,
            alpha: self.alpha.representative()?,
        })
    }

    fn thematic_attrs(&self) -> Vec<(&'static str, AnyTheme<'_>)> {
        let mut out = Vec::new();
        push_theme(&mut out, "line_color", &self.line_color);
        push_theme(&mut out, "line_width", &self.line_width);
        push_theme(&mut out, "fill_color", &self.fill_color);
        push_theme(&mut out, "alpha", &self.alpha);
        out
    }

    fn set_fixed(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "line_color" => self.line_color = StyleParam::from_override(name, value)?,
            "line_width" => self.line_width = StyleParam::from_override(name, value)?,
            "line_pattern" => self.line_pattern = param_as(name, value)?,
            "fill_color" => self.fill_color = StyleParam::from_override(name, value)?,
            "alpha" => self.alpha = StyleParam::from_override(name, value)?,
            _ => return Err(unknown_attribute(Self::NAME, name)),
        }
        Ok(())
    }

    fn to_kwargs(&self) -> Kwargs {
        kwargs([
            ("line_color", self.line_color.to_param()),
            ("line_width", self.line_width.to_param()),
            ("line_pattern", ParamValue::Dash(self.line_pattern)),
            ("fill_color", self.fill_color.to_param()),
            ("alpha", self.alpha.to_param()),
        ])
    }
}

// ------------------------ Focal mechanisms ------------------------

#[derive(Clone, Debug, PartialEq)]
pub struct FocmecStyle {
    /// Beachball diameter in pixels.
    pub size: StyleParam<f64>,
    pub line_width: f64,
    pub line_color: StyleParam<Rgba>,
    /// Color of the compressional quadrants.
    pub fill_color: StyleParam<Rgba>,
    /// Color of the dilatational quadrants.
    pub bg_color: Rgba,
    pub alpha: f64,
}

impl Default for FocmecStyle {
    fn default() -> Self {
        Self {
            size: 20.0.into(),
            line_width: 1.0,
            line_color: Rgba::BLACK.into(),
            fill_color: Rgba::BLACK.into(),
            bg_color: Rgba::WHITE,
            alpha: 1.0,
        }
    }
}

impl FocmecStyle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_size(mut self, size: impl Into<StyleParam<f64>>) -> Self {
        self.size = size.into();
        self
    }

    pub fn with_fill_color(mut self, color: impl Into<StyleParam<Rgba>>) -> Self {
        self.fill_color = color.into();
        self
    }

    pub fn with_line_color(mut self, color: impl Into<StyleParam<Rgba>>) -> Self {
        self.line_color = color.into();
        self
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ConcreteFocmecStyle {
    pub size: f64,
    pub line_width: f64,
    pub line_color: Rgba,
    pub fill_color: Rgba,
    pub bg_color: Rgba,
    pub alpha: f64,
}

impl ConcreteStyle for ConcreteFocmecStyle {
    fn set(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "size" => self.size = param_f64(name, value)?,
            "line_width" => self.line_width = param_f64(name, value)?,
            "line_color" => self.line_color = param_as(name, value)?,
            "fill_color" => self.fill_color = param_as(name, value)?,
            "bg_color" => self.bg_color = param_as(name, value)?,
            "alpha" => self.alpha = param_f64(name, value)?,
            _ => return Err(unknown_attribute("FocmecStyle", name)),
        }
        Ok(())
    }

    fn to_kwargs(&self) -> Kwargs {
        kwargs([
            ("size", ParamValue::Number(self.size)),
            ("line_width", ParamValue::Number(self.line_width)),
            ("line_color", ParamValue::Color(self.line_color)),
            ("fill_color", ParamValue::Color(self.fill_color)),
            ("bg_color", ParamValue::Color(self.bg_color)),
            ("alpha", ParamValue::Number(self.alpha)),
        ])
    }
}

impl LayerStyle for FocmecStyle {
    type Concrete = ConcreteFocmecStyle;
    const NAME: &'static str = "FocmecStyle";

    fn projection(&self) -> Result<ConcreteFocmecStyle> {
        Ok(ConcreteFocmecStyle {
            size: self.size.representative()?,
            line_width: self.line_width,
            line_color: self.line_color.representative()?,
            fill_color: self.fill_color.representative()?,
            bg_color: self.bg_color,
            alpha: self.alpha,
        })
    }

    fn thematic_attrs(&self) -> Vec<(&'static str, AnyTheme<'_>)> {
        let mut out = Vec::new();
        push_theme(&mut out, "size", &self.size);
        push_theme(&mut out, "line_color", &self.line_color);
        push_theme(&mut out, "fill_color", &self.fill_color);
        out
    }

    fn set_fixed(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "size" => self.size = StyleParam::from_override(name, value)?,
            "line_width" => self.line_width = param_f64(name, value)?,
            "line_color" => self.line_color = StyleParam::from_override(name, value)?,
            "fill_color" => self.fill_color = StyleParam::from_override(name, value)?,
            "bg_color" => self.bg_color = param_as(name, value)?,
            "alpha" => self.alpha = param_f64(name, value)?,
            _ => return Err(unknown_attribute(Self::NAME, name)),
        }
        Ok(())
    }

    fn to_kwargs(&self) -> Kwargs {
        kwargs([
            ("size", self.size.to_param()),
            ("line_width", ParamValue::Number(self.line_width)),
            ("line_color", self.line_color.to_param()),
            ("fill_color", self.fill_color.to_param()),
            ("bg_color", ParamValue::Color(self.bg_color)),
            ("alpha", ParamValue::Number(self.alpha)),
        ])
    }
}

// ------------------------ Grids ------------------------

/// Raster grid styling: color fill plus optional contours.
#[derive(Clone, Debug, PartialEq)]
pub struct GridStyle {
    pub color: ThematicStyle<Rgba>,
    /// Draw cells as blocks; otherwise the grid is resampled for a smooth fill.
    pub pixelated: bool,
    pub alpha: f64,
    pub contour_levels: Vec<f64>,
    pub contour_line: ConcreteLineStyle,
    pub contour_labels: bool,
    pub contour_label_style: TextStyle,
}

impl Default for GridStyle {
    fn default() -> Self {
        Self::from_mappable(ScalarMappable::new(
            Norm::Linear {
                vmin: None,
                vmax: None,
            },
            Colormap::grayscale(),
        ))
    }
}

impl GridStyle {
    pub fn from_mappable(mappable: ScalarMappable) -> Self {
        Self {
            color: ThematicStyle::Colormap(crate::thematic::ColormapTheme {
                mappable,
                meta: Default::default(),
            }),
            pixelated: true,
            alpha: 1.0,
            contour_levels: Vec::new(),
            contour_line: ConcreteLineStyle::default(),
            contour_labels: false,
            contour_label_style: TextStyle {
                font_size: 8.0,
                ..TextStyle::default()
            },
        }
    }

    pub fn with_color(mut self, color: ThematicStyle<Rgba>) -> Self {
        self.color = color;
        self
    }

    pub fn with_contours(mut self, levels: Vec<f64>, line: ConcreteLineStyle) -> Self {
        self.contour_levels = levels;
        self.contour_line = line;
        self
    }

    pub fn colorbar_style(&self) -> ColorbarStyle {
        self.color.meta().colorbar_style.clone().unwrap_or_default()
    }

    pub fn to_kwargs(&self) -> Kwargs {
        kwargs([
            ("color", ParamValue::Thematic(self.color.kind_name().to_string())),
            ("pixelated", ParamValue::Bool(self.pixelated)),
            ("alpha", ParamValue::Number(self.alpha)),
            ("contours", ParamValue::Number(self.contour_levels.len() as f64)),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Datum, FeatureValue};
    use crate::error::MapError;
    use crate::style::StyleOverrides;
    use crate::thematic::ThemeClass;
    use std::collections::BTreeMap;

    fn colors() -> ThematicStyle<Rgba> {
        ThematicStyle::ranges(vec![0.0, 5.0, 10.0], vec![Rgba::BLACK, Rgba::WHITE]).unwrap()
    }

    #[test]
    fn two_thematic_colors_are_rejected_everywhere() {
        let point = PointStyle::new()
            .with_fill_color(colors())
            .with_line_color(colors());
        assert!(point.validate().is_err());
        let poly = PolygonStyle::new()
            .with_fill_color(colors())
            .with_line_color(colors());
        assert!(matches!(poly.validate().unwrap_err(), MapError::Config { .. }));
        let focmec = FocmecStyle::new()
            .with_fill_color(colors())
            .with_line_color(colors());
        assert!(focmec.resolve(&[], &[]).is_err());
    }

    #[test]
    fn resolve_tracks_classes_and_overrides() {
        let style = PointStyle::new().with_fill_color(colors().with_value_key("v"));
        let a = FeatureValue::Map(BTreeMap::from([("v".to_string(), Datum::Number(7.0))]));
        let b = FeatureValue::Scalar(Datum::Number(1.0));
        let over = StyleOverrides::from([("size".to_string(), ParamValue::Number(12.0))]);
        let resolved = style.resolve(&[Some(&a), Some(&b)], &[None, Some(&over)]).unwrap();
        assert_eq!(resolved.styles[0].fill_color, Rgba::WHITE);
        assert_eq!(resolved.styles[1].fill_color, Rgba::BLACK);
        assert_eq!(resolved.styles[1].size, 12.0);
        assert_eq!(
            resolved.classes["fill_color"],
            vec![ThemeClass::Index(1), ThemeClass::Index(0)]
        );
    }

    #[test]
    fn with_overrides_returns_new_record() {
        let style = LineStyle::new();
        let over = StyleOverrides::from([("line_pattern".to_string(), ParamValue::Text("--".into()))]);
        let changed = style.with_overrides(&over).unwrap();
        assert_eq!(changed.line_pattern, StyleParam::Fixed(LineDash::Dash));
        assert_eq!(style.line_pattern, StyleParam::Fixed(LineDash::Solid));
        let bad = StyleOverrides::from([("hatch".to_string(), ParamValue::Text("/".into()))]);
        assert!(style.with_overrides(&bad).is_err());
    }

    #[test]
    fn kwargs_mark_thematic_attributes() {
        let kw = PolygonStyle::new().with_fill_color(colors()).to_kwargs();
        assert_eq!(kw["fill_color"], ParamValue::Thematic("ranges".into()));
        assert_eq!(kw["line_color"], ParamValue::Color(Rgba::BLACK));
    }
}
