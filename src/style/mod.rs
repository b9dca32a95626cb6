//! Style records for every layer kind.
//!
//! Layer styles ([`PointStyle`], [`LineStyle`], [`PolygonStyle`], [`FocmecStyle`]) hold
//! attributes that may be fixed or thematic ([`StyleParam`]). Rendering resolves them into
//! concrete per-feature records (`Concrete*Style`) through [`LayerStyle::resolve`].
//! Decoration styles (text, legend, colorbar, graticule, fronts) are plain values and
//! deserialize from map documents.

pub mod layer;
pub mod markers;
pub mod params;

pub use layer::{
    ConcreteFocmecStyle, ConcreteLineStyle, ConcretePointStyle, ConcretePolygonStyle, FocmecStyle,
    GridStyle, LineStyle, PointStyle, PolygonStyle,
};
pub use markers::{LineDash, MarkerShape};
pub use params::{Kwargs, ParamValue, StyleOverrides, StyleParam, param_as, param_f64};

use crate::color::Rgba;
use crate::data::FeatureValue;
use crate::error::{MapError, Result};
use crate::thematic::{AnyTheme, ThemeClass};
use crate::viz::types::{DEFAULT_LEGEND_MODE, LegendMode, Orientation};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A fully resolved style for one feature.
pub trait ConcreteStyle: Clone + fmt::Debug {
    /// Replace one attribute by name.
    fn set(&mut self, name: &str, value: &ParamValue) -> Result<()>;

    fn to_kwargs(&self) -> Kwargs;

    fn apply(&mut self, overrides: &StyleOverrides) -> Result<()> {
        for (name, value) in overrides {
            self.set(name, value)?;
        }
        Ok(())
    }
}

/// Per-feature concrete styles plus the class each thematic attribute assigned.
#[derive(Clone, Debug)]
pub struct Resolved<C> {
    pub styles: Vec<C>,
    pub classes: BTreeMap<&'static str, Vec<ThemeClass>>,
}

/// Common behavior of the layer styles.
pub trait LayerStyle: Clone {
    type Concrete: ConcreteStyle;

    /// Name used in error messages.
    const NAME: &'static str;

    /// Copy of the style with every thematic attribute replaced by a representative value.
    fn projection(&self) -> Result<Self::Concrete>;

    /// Thematic attributes in declaration order.
    fn thematic_attrs(&self) -> Vec<(&'static str, AnyTheme<'_>)>;

    /// Replace one attribute by a fixed value.
    fn set_fixed(&mut self, name: &str, value: &ParamValue) -> Result<()>;

    fn to_kwargs(&self) -> Kwargs;

    fn is_thematic(&self) -> bool {
        !self.thematic_attrs().is_empty()
    }

    /// At most one color-bearing attribute may be thematic.
    fn validate(&self) -> Result<()> {
        let colors: Vec<&str> = self
            .thematic_attrs()
            .into_iter()
            .filter(|(_, t)| t.is_color_style())
            .map(|(name, _)| name)
            .collect();
        if colors.len() > 1 {
            return Err(MapError::config(format!(
                "{}: only one color attribute may be thematic, got {}",
                Self::NAME,
                colors.join(" and ")
            )));
        }
        Ok(())
    }

    /// New style with the named attributes fixed to the given values.
    fn with_overrides(&self, overrides: &StyleOverrides) -> Result<Self> {
        let mut out = self.clone();
        for (name, value) in overrides {
            out.set_fixed(name, value)?;
        }
        Ok(out)
    }

    /// Resolve every feature's concrete style. `overrides` is either empty or parallel
    /// to `values`.
    fn resolve(
        &self,
        values: &[Option<&FeatureValue>],
        overrides: &[Option<&StyleOverrides>],
    ) -> Result<Resolved<Self::Concrete>> {
        self.validate()?;
        if !overrides.is_empty() && overrides.len() != values.len() {
            return Err(MapError::config(format!(
                "{}: {} features but {} style overrides",
                Self::NAME,
                values.len(),
                overrides.len()
            )));
        }
        let base = self.projection()?;
        let mut styles = vec![base; values.len()];
        let mut classes = BTreeMap::new();
        for (name, theme) in self.thematic_attrs() {
            let key = theme.meta().value_key.as_deref();
            let datums = values
                .iter()
                .map(|v| v.map(|fv| fv.select(key)).transpose())
                .collect::<Result<Vec<_>>>()?;
            let resolved = theme.resolve_params(&datums)?;
            let mut used = Vec::with_capacity(resolved.len());
            for (style, (class, value)) in styles.iter_mut().zip(resolved) {
                style.set(name, &value)?;
                used.push(class);
            }
            log::debug!("{}: resolved thematic {name} for {} features", Self::NAME, used.len());
            classes.insert(name, used);
        }
        for (style, o) in styles.iter_mut().zip(overrides) {
            if let Some(o) = o {
                style.apply(o)?;
            }
        }
        Ok(Resolved { styles, classes })
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HAlign {
    Left,
    #[default]
    Center,
    Right,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VAlign {
    Top,
    #[default]
    Center,
    Bottom,
}

/// Text labels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextStyle {
    pub font_size: f64,
    pub color: Rgba,
    pub background_color: Option<Rgba>,
    pub h_align: HAlign,
    pub v_align: VAlign,
    /// Degrees, counter-clockwise.
    pub rotation: f64,
    /// Pixel offset from the anchor, `(dx, dy)` with `dy` pointing up.
    pub offset: (f64, f64),
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 10.0,
            color: Rgba::BLACK,
            background_color: None,
            h_align: HAlign::Center,
            v_align: VAlign::Center,
            rotation: 0.0,
            offset: (0.0, 0.0),
        }
    }
}

impl ConcreteStyle for TextStyle {
    fn set(&mut self, name: &str, value: &ParamValue) -> Result<()> {
        match name {
            "font_size" => self.font_size = param_f64(name, value)?,
            "color" => self.color = param_as(name, value)?,
            "background_color" => self.background_color = Some(param_as(name, value)?),
            "rotation" => self.rotation = param_f64(name, value)?,
            _ => return Err(params::unknown_attribute("TextStyle", name)),
        }
        Ok(())
    }

    fn to_kwargs(&self) -> Kwargs {
        let mut kw = Kwargs::new();
        kw.insert("font_size".into(), ParamValue::Number(self.font_size));
        kw.insert("color".into(), ParamValue::Color(self.color));
        if let Some(bg) = self.background_color {
            kw.insert("background_color".into(), ParamValue::Color(bg));
        }
        kw.insert("rotation".into(), ParamValue::Number(self.rotation));
        kw
    }
}

/// Decoration repeated along a front line.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrontSymbol {
    /// Cold front.
    #[default]
    Triangle,
    /// Warm front.
    HalfCircle,
    Bar,
    /// Triangles and half circles in turn (occluded front).
    Mixed,
}

/// Weather-front decoration for lines.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrontStyle {
    pub symbol: FrontSymbol,
    /// Distance between symbols along the line, in pixels.
    pub interval_px: f64,
    pub size_px: f64,
    /// Symbol color; the line color when unset.
    pub color: Option<Rgba>,
    /// Put every other symbol on the opposite side (stationary fronts).
    pub alternate: bool,
    /// Draw symbols on the right of the line direction instead of the left.
    pub flip: bool,
}

impl Default for FrontStyle {
    fn default() -> Self {
        Self {
            symbol: FrontSymbol::Triangle,
            interval_px: 24.0,
            size_px: 7.0,
            color: None,
            alternate: false,
            flip: false,
        }
    }
}

/// Legend box.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LegendStyle {
    pub mode: LegendMode,
    pub title: Option<String>,
    pub font_size: f64,
    pub title_font_size: f64,
    pub frame_color: Option<Rgba>,
    pub background: Rgba,
}

impl Default for LegendStyle {
    fn default() -> Self {
        Self {
            mode: DEFAULT_LEGEND_MODE,
            title: None,
            font_size: 14.0,
            title_font_size: 16.0,
            frame_color: Some(Rgba::rgb(160, 160, 160)),
            background: Rgba::WHITE,
        }
    }
}

/// Colorbar appearance. Ticks default to the resolver's breakpoints and labels.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorbarStyle {
    pub orientation: Orientation,
    pub label: Option<String>,
    pub ticks: Option<Vec<f64>>,
    pub tick_labels: Option<Vec<String>>,
    pub thickness_px: f64,
    pub font_size: f64,
}

impl Default for ColorbarStyle {
    fn default() -> Self {
        Self {
            orientation: Orientation::Horizontal,
            label: None,
            ticks: None,
            tick_labels: None,
            thickness_px: 14.0,
            font_size: 12.0,
        }
    }
}

/// Lon/lat grid lines.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraticuleStyle {
    pub lon_step: f64,
    pub lat_step: f64,
    pub line: ConcreteLineStyle,
    pub labels: bool,
    pub font_size: f64,
}

impl Default for GraticuleStyle {
    fn default() -> Self {
        Self {
            lon_step: 1.0,
            lat_step: 1.0,
            line: ConcreteLineStyle {
                line_color: Rgba::rgb(128, 128, 128),
                line_width: 0.5,
                line_pattern: LineDash::Dot,
                alpha: 1.0,
            },
            labels: true,
            font_size: 10.0,
        }
    }
}

/// Styles for layers that mix geometry kinds (composite data, GIS files).
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompositeStyle {
    pub point: PointStyle,
    pub line: LineStyle,
    pub polygon: PolygonStyle,
    pub text: TextStyle,
}
