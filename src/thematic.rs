//! Thematic styles: rules that map data values to style values.
//!
//! Four resolvers are provided, all generic over the output type `T`:
//! - [`Individual`]: exact lookup from discrete values to styles
//! - [`Ranges`]: half-open bins between sorted breakpoints
//! - [`Gradient`]: piecewise-linear interpolation between breakpoint styles
//! - [`ColormapTheme`]: a normalization followed by a continuous colormap
//!
//! The output kind (`Color`, `Scalar`, `Pattern`) is declared by the output type through
//! [`StyleOutput::KIND`]; nothing is guessed from the style values themselves.

use crate::color::Rgba;
use crate::colormap::{Colormap, Norm, ScalarMappable};
use crate::data::Datum;
use crate::error::{MapError, Result};
use crate::style::{ColorbarStyle, LineDash, MarkerShape, ParamValue};
use num_format::{Locale, ToFormattedString};
use std::collections::HashMap;
use std::fmt;

/// What a thematic style produces.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputKind {
    Color,
    Scalar,
    Pattern,
}

/// A value a thematic style can produce.
pub trait StyleOutput: Clone + PartialEq + fmt::Debug {
    const KIND: OutputKind;

    /// Linear blend towards `other`; `None` for kinds that cannot be interpolated.
    fn interpolate(&self, _other: &Self, _t: f64) -> Option<Self> {
        None
    }

    /// Build from a colormap color; only color outputs accept this.
    fn from_color(_c: Rgba) -> Option<Self> {
        None
    }

    fn as_color(&self) -> Option<Rgba> {
        None
    }

    fn to_param(&self) -> ParamValue;

    /// Convert a per-feature override value.
    fn from_param(p: &ParamValue) -> Option<Self>;

    fn any_theme(theme: &ThematicStyle<Self>) -> AnyTheme<'_>;
}

impl StyleOutput for Rgba {
    const KIND: OutputKind = OutputKind::Color;

    fn interpolate(&self, other: &Self, t: f64) -> Option<Self> {
        Some(self.lerp(other, t))
    }

    fn from_color(c: Rgba) -> Option<Self> {
        Some(c)
    }

    fn as_color(&self) -> Option<Rgba> {
        Some(*self)
    }

    fn to_param(&self) -> ParamValue {
        ParamValue::Color(*self)
    }

    fn from_param(p: &ParamValue) -> Option<Self> {
        match p {
            ParamValue::Color(c) => Some(*c),
            ParamValue::Text(s) => Rgba::parse(s).ok(),
            _ => None,
        }
    }

    fn any_theme(theme: &ThematicStyle<Self>) -> AnyTheme<'_> {
        AnyTheme::Color(theme)
    }
}

impl StyleOutput for f64 {
    const KIND: OutputKind = OutputKind::Scalar;

    fn interpolate(&self, other: &Self, t: f64) -> Option<Self> {
        Some(self + (other - self) * t)
    }

    fn to_param(&self) -> ParamValue {
        ParamValue::Number(*self)
    }

    fn from_param(p: &ParamValue) -> Option<Self> {
        match p {
            ParamValue::Number(v) => Some(*v),
            ParamValue::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    fn any_theme(theme: &ThematicStyle<Self>) -> AnyTheme<'_> {
        AnyTheme::Scalar(theme)
    }
}

impl StyleOutput for MarkerShape {
    const KIND: OutputKind = OutputKind::Pattern;

    fn to_param(&self) -> ParamValue {
        ParamValue::Marker(*self)
    }

    fn from_param(p: &ParamValue) -> Option<Self> {
        match p {
            ParamValue::Marker(m) => Some(*m),
            ParamValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    fn any_theme(theme: &ThematicStyle<Self>) -> AnyTheme<'_> {
        AnyTheme::Marker(theme)
    }
}

impl StyleOutput for LineDash {
    const KIND: OutputKind = OutputKind::Pattern;

    fn to_param(&self) -> ParamValue {
        ParamValue::Dash(*self)
    }

    fn from_param(p: &ParamValue) -> Option<Self> {
        match p {
            ParamValue::Dash(d) => Some(*d),
            ParamValue::Text(s) => s.parse().ok(),
            _ => None,
        }
    }

    fn any_theme(theme: &ThematicStyle<Self>) -> AnyTheme<'_> {
        AnyTheme::Dash(theme)
    }
}

/// The class a value falls into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ThemeClass {
    Under,
    Index(usize),
    Over,
    Bad,
    /// Interpolated (gradient/colormap) values have no discrete class.
    Continuous,
}

/// Legend bookkeeping shared by all resolvers.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct ThemeMeta {
    /// Selects the named value out of a per-feature value mapping.
    pub value_key: Option<String>,
    /// Explicit class labels; defaults are derived from breakpoints/values when empty.
    pub labels: Vec<String>,
    pub add_legend: bool,
    pub legend_title: Option<String>,
    pub colorbar_style: Option<ColorbarStyle>,
}

/// Styles used outside the regular classes.
#[derive(Clone, Debug, PartialEq)]
pub struct Fallbacks<T> {
    pub under: Option<T>,
    pub over: Option<T>,
    pub bad: Option<T>,
}

impl<T> Default for Fallbacks<T> {
    fn default() -> Self {
        Self {
            under: None,
            over: None,
            bad: None,
        }
    }
}

/// Hashable form of a [`Datum`]; `-0.0` and `0.0` share a key.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum DatumKey {
    Number(u64),
    Text(String),
}

impl DatumKey {
    fn of(d: &Datum) -> Self {
        match d {
            Datum::Number(v) => {
                let v = if *v == 0.0 { 0.0 } else { *v };
                DatumKey::Number(v.to_bits())
            }
            Datum::Text(s) => DatumKey::Text(s.clone()),
        }
    }
}

/// Exact-match lookup table.
#[derive(Clone, Debug, PartialEq)]
pub struct Individual<T> {
    values: Vec<Datum>,
    styles: Vec<T>,
    index: HashMap<DatumKey, usize, ahash::RandomState>,
    pub fallbacks: Fallbacks<T>,
    pub meta: ThemeMeta,
}

impl<T: StyleOutput> Individual<T> {
    pub fn new(values: Vec<Datum>, styles: Vec<T>) -> Result<Self> {
        if values.is_empty() {
            return Err(MapError::config("individual style needs at least one value"));
        }
        if values.len() != styles.len() {
            return Err(MapError::config(format!(
                "individual style: {} values but {} styles",
                values.len(),
                styles.len()
            )));
        }
        let mut index = HashMap::with_hasher(ahash::RandomState::new());
        for (i, v) in values.iter().enumerate() {
            if index.insert(DatumKey::of(v), i).is_some() {
                return Err(MapError::config(format!("individual style: duplicate value {v}")));
            }
        }
        Ok(Self {
            values,
            styles,
            index,
            fallbacks: Fallbacks::default(),
            meta: ThemeMeta::default(),
        })
    }

    pub fn values(&self) -> &[Datum] {
        &self.values
    }

    pub fn styles(&self) -> &[T] {
        &self.styles
    }

    fn classify(&self, value: Option<&Datum>) -> Result<ThemeClass> {
        let Some(value) = value else {
            return self.bad_or(|| MapError::Unclassified {
                message: "feature has no value".into(),
            });
        };
        if let Some(i) = self.index.get(&DatumKey::of(value)) {
            return Ok(ThemeClass::Index(*i));
        }
        if let Some(v) = value.as_number().filter(|v| !v.is_nan()) {
            let (lo, hi) = self
                .number_range()
                .unwrap_or((f64::INFINITY, f64::NEG_INFINITY));
            if self.fallbacks.under.is_some() && v < lo {
                return Ok(ThemeClass::Under);
            }
            if self.fallbacks.over.is_some() && v > hi {
                return Ok(ThemeClass::Over);
            }
        }
        self.bad_or(|| MapError::UnmappedValue {
            value: value.to_string(),
        })
    }

    /// Smallest and largest numeric key, whatever order the keys were given in.
    fn number_range(&self) -> Option<(f64, f64)> {
        self.values
            .iter()
            .filter_map(|d| d.as_number())
            .filter(|x| x.is_finite())
            .fold(None, |acc, x| match acc {
                None => Some((x, x)),
                Some((lo, hi)) => Some((f64::min(lo, x), f64::max(hi, x))),
            })
    }

    fn bad_or(&self, err: impl FnOnce() -> MapError) -> Result<ThemeClass> {
        if self.fallbacks.bad.is_some() {
            Ok(ThemeClass::Bad)
        } else {
            Err(err())
        }
    }
}

/// Half-open bins `[b_i, b_{i+1})`; the last bin is closed.
#[derive(Clone, Debug, PartialEq)]
pub struct Ranges<T> {
    breakpoints: Vec<f64>,
    styles: Vec<T>,
    pub fallbacks: Fallbacks<T>,
    pub meta: ThemeMeta,
}

impl<T: StyleOutput> Ranges<T> {
    pub fn new(breakpoints: Vec<f64>, styles: Vec<T>) -> Result<Self> {
        check_breakpoints(&breakpoints, 2)?;
        if styles.len() + 1 != breakpoints.len() {
            return Err(MapError::config(format!(
                "ranges style: {} breakpoints need {} styles, got {}",
                breakpoints.len(),
                breakpoints.len() - 1,
                styles.len()
            )));
        }
        Ok(Self {
            breakpoints,
            styles,
            fallbacks: Fallbacks::default(),
            meta: ThemeMeta::default(),
        })
    }

    pub fn breakpoints(&self) -> &[f64] {
        &self.breakpoints
    }

    pub fn styles(&self) -> &[T] {
        &self.styles
    }

    fn classify(&self, value: Option<&Datum>) -> Result<ThemeClass> {
        let v = match numeric_or_bad(value)? {
            Some(v) => v,
            None => return bad_class(&self.fallbacks, value),
        };
        let first = self.breakpoints[0];
        let last = self.breakpoints[self.breakpoints.len() - 1];
        if v < first {
            return Ok(if self.fallbacks.under.is_some() {
                ThemeClass::Under
            } else {
                ThemeClass::Index(0)
            });
        }
        if v > last {
            return Ok(if self.fallbacks.over.is_some() {
                ThemeClass::Over
            } else {
                ThemeClass::Index(self.styles.len() - 1)
            });
        }
        let idx = self
            .breakpoints
            .partition_point(|b| *b <= v)
            .saturating_sub(1)
            .min(self.styles.len() - 1);
        Ok(ThemeClass::Index(idx))
    }
}

/// Piecewise-linear interpolation between breakpoint styles.
#[derive(Clone, Debug, PartialEq)]
pub struct Gradient<T> {
    breakpoints: Vec<f64>,
    styles: Vec<T>,
    pub fallbacks: Fallbacks<T>,
    pub meta: ThemeMeta,
}

impl<T: StyleOutput> Gradient<T> {
    pub fn new(breakpoints: Vec<f64>, styles: Vec<T>) -> Result<Self> {
        check_breakpoints(&breakpoints, 2)?;
        if styles.len() != breakpoints.len() {
            return Err(MapError::config(format!(
                "gradient style: {} breakpoints but {} styles",
                breakpoints.len(),
                styles.len()
            )));
        }
        if styles[0].interpolate(&styles[1], 0.5).is_none() {
            return Err(MapError::config(format!(
                "gradient style: {:?} outputs cannot be interpolated",
                T::KIND
            )));
        }
        Ok(Self {
            breakpoints,
            styles,
            fallbacks: Fallbacks::default(),
            meta: ThemeMeta::default(),
        })
    }

    pub fn breakpoints(&self) -> &[f64] {
        &self.breakpoints
    }

    pub fn styles(&self) -> &[T] {
        &self.styles
    }

    fn resolve(&self, value: Option<&Datum>) -> Result<(ThemeClass, T)> {
        let v = match numeric_or_bad(value)? {
            Some(v) => v,
            None => {
                let class = bad_class(&self.fallbacks, value)?;
                return fallback_style(&self.fallbacks, class).map(|s| (class, s));
            }
        };
        let n = self.breakpoints.len();
        if v < self.breakpoints[0] {
            if let Some(s) = &self.fallbacks.under {
                return Ok((ThemeClass::Under, s.clone()));
            }
            return Ok((ThemeClass::Continuous, self.styles[0].clone()));
        }
        if v > self.breakpoints[n - 1] {
            if let Some(s) = &self.fallbacks.over {
                return Ok((ThemeClass::Over, s.clone()));
            }
            return Ok((ThemeClass::Continuous, self.styles[n - 1].clone()));
        }
        let i = self
            .breakpoints
            .partition_point(|b| *b <= v)
            .saturating_sub(1)
            .min(n - 2);
        let (b0, b1) = (self.breakpoints[i], self.breakpoints[i + 1]);
        let t = (v - b0) / (b1 - b0);
        let style = self.styles[i]
            .interpolate(&self.styles[i + 1], t)
            .ok_or_else(|| MapError::config("gradient output cannot be interpolated"))?;
        Ok((ThemeClass::Continuous, style))
    }
}

/// Normalization + colormap.
#[derive(Clone, Debug, PartialEq)]
pub struct ColormapTheme {
    pub mappable: ScalarMappable,
    pub meta: ThemeMeta,
}

/// A thematic rule mapping data values to style values of type `T`.
#[derive(Clone, Debug, PartialEq)]
pub enum ThematicStyle<T> {
    Individual(Individual<T>),
    Ranges(Ranges<T>),
    Gradient(Gradient<T>),
    Colormap(ColormapTheme),
}

impl<T: StyleOutput> ThematicStyle<T> {
    pub fn individual(values: Vec<Datum>, styles: Vec<T>) -> Result<Self> {
        Individual::new(values, styles).map(ThematicStyle::Individual)
    }

    pub fn ranges(breakpoints: Vec<f64>, styles: Vec<T>) -> Result<Self> {
        Ranges::new(breakpoints, styles).map(ThematicStyle::Ranges)
    }

    pub fn gradient(breakpoints: Vec<f64>, styles: Vec<T>) -> Result<Self> {
        Gradient::new(breakpoints, styles).map(ThematicStyle::Gradient)
    }

    /// Colormap resolver; only valid for color outputs.
    pub fn colormap(mappable: ScalarMappable) -> Result<Self> {
        if T::KIND != OutputKind::Color {
            return Err(MapError::config(format!(
                "colormap style cannot produce {:?} values",
                T::KIND
            )));
        }
        Ok(ThematicStyle::Colormap(ColormapTheme {
            mappable,
            meta: ThemeMeta::default(),
        }))
    }

    pub fn meta(&self) -> &ThemeMeta {
        match self {
            ThematicStyle::Individual(s) => &s.meta,
            ThematicStyle::Ranges(s) => &s.meta,
            ThematicStyle::Gradient(s) => &s.meta,
            ThematicStyle::Colormap(s) => &s.meta,
        }
    }

    pub fn meta_mut(&mut self) -> &mut ThemeMeta {
        match self {
            ThematicStyle::Individual(s) => &mut s.meta,
            ThematicStyle::Ranges(s) => &mut s.meta,
            ThematicStyle::Gradient(s) => &mut s.meta,
            ThematicStyle::Colormap(s) => &mut s.meta,
        }
    }

    pub fn with_value_key(mut self, key: impl Into<String>) -> Self {
        self.meta_mut().value_key = Some(key.into());
        self
    }

    pub fn with_labels(mut self, labels: Vec<String>) -> Result<Self> {
        if let Some(n) = self.n_classes()
            && !labels.is_empty()
            && labels.len() != n
        {
            return Err(MapError::config(format!(
                "thematic style has {n} classes but {} labels",
                labels.len()
            )));
        }
        self.meta_mut().labels = labels;
        Ok(self)
    }

    pub fn with_legend(mut self, add_legend: bool) -> Self {
        self.meta_mut().add_legend = add_legend;
        self
    }

    pub fn with_legend_title(mut self, title: impl Into<String>) -> Self {
        self.meta_mut().legend_title = Some(title.into());
        self
    }

    pub fn with_colorbar_style(mut self, style: ColorbarStyle) -> Self {
        self.meta_mut().colorbar_style = Some(style);
        self
    }

    pub fn with_under(self, style: T) -> Self {
        self.with_fallback(style, |f, s| f.under = Some(s), |m, c| m.under = Some(c))
    }

    pub fn with_over(self, style: T) -> Self {
        self.with_fallback(style, |f, s| f.over = Some(s), |m, c| m.over = Some(c))
    }

    pub fn with_bad(self, style: T) -> Self {
        self.with_fallback(style, |f, s| f.bad = Some(s), |m, c| m.bad = Some(c))
    }

    fn with_fallback(
        mut self,
        style: T,
        set: impl FnOnce(&mut Fallbacks<T>, T),
        set_color: impl FnOnce(&mut ScalarMappable, Rgba),
    ) -> Self {
        match &mut self {
            ThematicStyle::Individual(s) => set(&mut s.fallbacks, style),
            ThematicStyle::Ranges(s) => set(&mut s.fallbacks, style),
            ThematicStyle::Gradient(s) => set(&mut s.fallbacks, style),
            ThematicStyle::Colormap(s) => {
                if let Some(c) = style.as_color() {
                    set_color(&mut s.mappable, c);
                }
            }
        }
        self
    }

    pub fn fallbacks(&self) -> Option<&Fallbacks<T>> {
        match self {
            ThematicStyle::Individual(s) => Some(&s.fallbacks),
            ThematicStyle::Ranges(s) => Some(&s.fallbacks),
            ThematicStyle::Gradient(s) => Some(&s.fallbacks),
            ThematicStyle::Colormap(_) => None,
        }
    }

    pub fn value_key(&self) -> Option<&str> {
        self.meta().value_key.as_deref()
    }

    pub fn add_legend(&self) -> bool {
        self.meta().add_legend
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            ThematicStyle::Individual(_) => "individual",
            ThematicStyle::Ranges(_) => "ranges",
            ThematicStyle::Gradient(_) => "gradient",
            ThematicStyle::Colormap(_) => "colormap",
        }
    }

    pub fn as_any(&self) -> AnyTheme<'_> {
        T::any_theme(self)
    }

    pub fn output_kind(&self) -> OutputKind {
        T::KIND
    }

    pub fn is_color_style(&self) -> bool {
        T::KIND == OutputKind::Color
    }

    /// Gradient and colormap styles vary continuously.
    pub fn is_continuous(&self) -> bool {
        matches!(self, ThematicStyle::Gradient(_) | ThematicStyle::Colormap(_))
    }

    /// Number of regular classes for discrete styles, breakpoints for gradients.
    pub fn n_classes(&self) -> Option<usize> {
        match self {
            ThematicStyle::Individual(s) => Some(s.styles.len()),
            ThematicStyle::Ranges(s) => Some(s.styles.len()),
            ThematicStyle::Gradient(s) => Some(s.styles.len()),
            ThematicStyle::Colormap(_) => None,
        }
    }

    pub fn breakpoints(&self) -> Vec<f64> {
        match self {
            ThematicStyle::Individual(s) => s.values.iter().filter_map(|d| d.as_number()).collect(),
            ThematicStyle::Ranges(s) => s.breakpoints.clone(),
            ThematicStyle::Gradient(s) => s.breakpoints.clone(),
            ThematicStyle::Colormap(s) => match &s.mappable.norm {
                Norm::Boundary { boundaries } => boundaries.clone(),
                norm => norm.limits().map(|(a, b)| vec![a, b]).unwrap_or_default(),
            },
        }
    }

    /// Values below/above which the under/over styles apply.
    fn outer_limits(&self) -> Option<(f64, f64)> {
        match self {
            ThematicStyle::Individual(s) => s.number_range(),
            _ => {
                let b = self.breakpoints();
                Some((*b.first()?, *b.last()?))
            }
        }
    }

    /// Resolve one value to its class and style.
    pub fn resolve(&self, value: Option<&Datum>) -> Result<(ThemeClass, T)> {
        match self {
            ThematicStyle::Individual(s) => {
                let class = s.classify(value)?;
                Ok((class, self.class_style(class)?))
            }
            ThematicStyle::Ranges(s) => {
                let class = s.classify(value)?;
                Ok((class, self.class_style(class)?))
            }
            ThematicStyle::Gradient(s) => s.resolve(value),
            ThematicStyle::Colormap(s) => {
                let v = value.and_then(|d| d.as_number()).unwrap_or(f64::NAN);
                let color = s.mappable.to_rgba(v);
                let class = if v.is_nan() {
                    ThemeClass::Bad
                } else {
                    ThemeClass::Continuous
                };
                T::from_color(color)
                    .map(|style| (class, style))
                    .ok_or_else(|| MapError::config("colormap style used for non-color output"))
            }
        }
    }

    /// Resolve a whole value array; colormap norms autoscale over the finite values.
    pub fn resolve_all(&self, values: &[Option<&Datum>]) -> Result<Vec<(ThemeClass, T)>> {
        if let ThematicStyle::Colormap(s) = self
            && s.mappable.norm.limits().is_none()
        {
            let numbers: Vec<f64> = values
                .iter()
                .filter_map(|d| d.and_then(|d| d.as_number()))
                .collect();
            let scaled = ThematicStyle::<T>::Colormap(ColormapTheme {
                mappable: s.mappable.autoscaled(&numbers),
                meta: s.meta.clone(),
            });
            return values.iter().map(|v| scaled.resolve(*v)).collect();
        }
        values.iter().map(|v| self.resolve(*v)).collect()
    }

    /// Style of a discrete class.
    pub fn class_style(&self, class: ThemeClass) -> Result<T> {
        let missing = || MapError::Unclassified {
            message: format!("no style for class {class:?}"),
        };
        let (styles, fallbacks) = match self {
            ThematicStyle::Individual(s) => (&s.styles, &s.fallbacks),
            ThematicStyle::Ranges(s) => (&s.styles, &s.fallbacks),
            ThematicStyle::Gradient(s) => (&s.styles, &s.fallbacks),
            ThematicStyle::Colormap(_) => return Err(missing()),
        };
        match class {
            ThemeClass::Index(i) => styles.get(i).cloned().ok_or_else(missing),
            ThemeClass::Continuous => Err(missing()),
            other => fallback_style(fallbacks, other),
        }
    }

    /// Style used to represent the whole rule when a single value is needed.
    pub fn representative(&self) -> Option<T> {
        match self {
            ThematicStyle::Individual(s) => s.styles.first().cloned(),
            ThematicStyle::Ranges(s) => s.styles.first().cloned(),
            ThematicStyle::Gradient(s) => s.styles.first().cloned(),
            ThematicStyle::Colormap(s) => T::from_color(s.mappable.cmap.at(0.5)),
        }
    }

    /// Label for a class: explicit labels first, then one derived from breakpoints/values.
    pub fn class_label(&self, class: ThemeClass) -> String {
        let explicit = |i: usize| self.meta().labels.get(i).cloned();
        match (self, class) {
            (_, ThemeClass::Bad) => "n/a".to_string(),
            (_, ThemeClass::Continuous) => String::new(),
            (ThematicStyle::Individual(s), ThemeClass::Index(i)) => explicit(i)
                .unwrap_or_else(|| s.values.get(i).map(|v| v.to_string()).unwrap_or_default()),
            (ThematicStyle::Ranges(s), ThemeClass::Index(i)) => explicit(i).unwrap_or_else(|| {
                format!(
                    "{} - {}",
                    format_breakpoint(s.breakpoints[i]),
                    format_breakpoint(s.breakpoints[i + 1])
                )
            }),
            (ThematicStyle::Gradient(s), ThemeClass::Index(i)) => {
                explicit(i).unwrap_or_else(|| format_breakpoint(s.breakpoints[i]))
            }
            (ThematicStyle::Colormap(_), ThemeClass::Index(i)) => format!("class {i}"),
            (_, ThemeClass::Under) => match self.outer_limits() {
                Some((lo, _)) => format!("< {}", format_breakpoint(lo)),
                None => "under".to_string(),
            },
            (_, ThemeClass::Over) => match self.outer_limits() {
                Some((_, hi)) => format!("> {}", format_breakpoint(hi)),
                None => "over".to_string(),
            },
        }
    }

    /// Every legend class with its style and label, in legend order.
    pub fn legend_classes(&self) -> Vec<(ThemeClass, T, String)> {
        let Some(n) = self.n_classes() else {
            return Vec::new();
        };
        let mut classes = vec![ThemeClass::Under];
        classes.extend((0..n).map(ThemeClass::Index));
        classes.extend([ThemeClass::Over, ThemeClass::Bad]);
        classes
            .into_iter()
            .filter_map(|c| self.class_style(c).ok().map(|s| (c, s, self.class_label(c))))
            .collect()
    }
}

impl ThematicStyle<Rgba> {
    /// Colormap usable for a colorbar.
    pub fn to_colormap(&self) -> Result<Colormap> {
        match self {
            ThematicStyle::Individual(s) => Colormap::listed("individual", s.styles.clone()),
            ThematicStyle::Ranges(s) => Colormap::listed("ranges", s.styles.clone()),
            ThematicStyle::Gradient(s) => {
                let lo = s.breakpoints[0];
                let span = s.breakpoints[s.breakpoints.len() - 1] - lo;
                let stops = s
                    .breakpoints
                    .iter()
                    .zip(&s.styles)
                    .map(|(b, c)| ((b - lo) / span, *c))
                    .collect();
                Colormap::from_stops("gradient", stops)
            }
            ThematicStyle::Colormap(s) => Ok(s.mappable.cmap.clone()),
        }
    }

    /// Normalization matching [`ThematicStyle::to_colormap`].
    pub fn get_norm(&self) -> Result<Norm> {
        match self {
            ThematicStyle::Individual(s) => {
                let bounds = (0..=s.styles.len()).map(|i| i as f64 - 0.5).collect();
                Norm::boundary(bounds)
            }
            ThematicStyle::Ranges(s) => Norm::boundary(s.breakpoints.clone()),
            ThematicStyle::Gradient(s) => Ok(Norm::linear(
                s.breakpoints[0],
                s.breakpoints[s.breakpoints.len() - 1],
            )),
            ThematicStyle::Colormap(s) => Ok(s.mappable.norm.clone()),
        }
    }

    pub fn to_scalar_mappable(&self) -> Result<ScalarMappable> {
        if let ThematicStyle::Colormap(s) = self {
            return Ok(s.mappable.clone());
        }
        let mut sm = ScalarMappable::new(self.get_norm()?, self.to_colormap()?);
        if let Some(f) = self.fallbacks() {
            sm.under = f.under;
            sm.over = f.over;
            sm.bad = f.bad;
        }
        Ok(sm)
    }
}

/// A thematic style with its output type erased, for code that handles every attribute
/// the same way (legend synthesis, keyword dumps).
#[derive(Clone, Copy, Debug)]
pub enum AnyTheme<'a> {
    Color(&'a ThematicStyle<Rgba>),
    Scalar(&'a ThematicStyle<f64>),
    Marker(&'a ThematicStyle<MarkerShape>),
    Dash(&'a ThematicStyle<LineDash>),
}

macro_rules! with_theme {
    ($any:expr, $t:ident => $body:expr) => {
        match $any {
            AnyTheme::Color($t) => $body,
            AnyTheme::Scalar($t) => $body,
            AnyTheme::Marker($t) => $body,
            AnyTheme::Dash($t) => $body,
        }
    };
}

impl<'a> AnyTheme<'a> {
    pub fn meta(&self) -> &'a ThemeMeta {
        with_theme!(*self, t => t.meta())
    }

    pub fn kind_name(&self) -> &'static str {
        with_theme!(*self, t => t.kind_name())
    }

    pub fn output_kind(&self) -> OutputKind {
        with_theme!(*self, t => t.output_kind())
    }

    pub fn is_color_style(&self) -> bool {
        self.output_kind() == OutputKind::Color
    }

    pub fn is_continuous(&self) -> bool {
        with_theme!(*self, t => t.is_continuous())
    }

    pub fn class_label(&self, class: ThemeClass) -> String {
        with_theme!(*self, t => t.class_label(class))
    }

    pub fn class_param(&self, class: ThemeClass) -> Result<ParamValue> {
        with_theme!(*self, t => t.class_style(class).map(|s| s.to_param()))
    }

    pub fn legend_classes(&self) -> Vec<(ThemeClass, ParamValue, String)> {
        with_theme!(*self, t => t
            .legend_classes()
            .into_iter()
            .map(|(c, s, l)| (c, s.to_param(), l))
            .collect())
    }

    pub fn breakpoints(&self) -> Vec<f64> {
        with_theme!(*self, t => t.breakpoints())
    }

    /// Resolve per-feature values to erased style values.
    pub fn resolve_params(&self, values: &[Option<&Datum>]) -> Result<Vec<(ThemeClass, ParamValue)>> {
        with_theme!(*self, t => Ok(t
            .resolve_all(values)?
            .into_iter()
            .map(|(c, s)| (c, s.to_param()))
            .collect()))
    }

    /// Scalar mappable for colorbars; only color styles have one.
    pub fn to_scalar_mappable(&self) -> Option<Result<ScalarMappable>> {
        match self {
            AnyTheme::Color(t) => Some(t.to_scalar_mappable()),
            _ => None,
        }
    }
}

fn check_breakpoints(breakpoints: &[f64], min: usize) -> Result<()> {
    if breakpoints.len() < min {
        return Err(MapError::config(format!(
            "need at least {min} breakpoints, got {}",
            breakpoints.len()
        )));
    }
    if breakpoints.iter().any(|b| !b.is_finite()) {
        return Err(MapError::config("breakpoints must be finite"));
    }
    if breakpoints.windows(2).any(|w| w[1] <= w[0]) {
        return Err(MapError::config(format!(
            "breakpoints must be strictly increasing: {breakpoints:?}"
        )));
    }
    Ok(())
}

/// Numeric value, `None` for NaN/missing; text that is not a number is an error.
fn numeric_or_bad(value: Option<&Datum>) -> Result<Option<f64>> {
    match value {
        None => Ok(None),
        Some(d) => match d.as_number() {
            Some(v) if v.is_nan() => Ok(None),
            Some(v) => Ok(Some(v)),
            None => Err(MapError::Unclassified {
                message: format!("{d} is not numeric"),
            }),
        },
    }
}

fn bad_class<T>(fallbacks: &Fallbacks<T>, value: Option<&Datum>) -> Result<ThemeClass> {
    if fallbacks.bad.is_some() {
        Ok(ThemeClass::Bad)
    } else {
        Err(MapError::Unclassified {
            message: match value {
                Some(d) => format!("{d} has no class and no bad-value style is set"),
                None => "feature has no value and no bad-value style is set".into(),
            },
        })
    }
}

fn fallback_style<T: Clone>(fallbacks: &Fallbacks<T>, class: ThemeClass) -> Result<T> {
    let style = match class {
        ThemeClass::Under => fallbacks.under.clone(),
        ThemeClass::Over => fallbacks.over.clone(),
        ThemeClass::Bad => fallbacks.bad.clone(),
        _ => None,
    };
    style.ok_or_else(|| MapError::Unclassified {
        message: format!("no fallback style for {class:?}"),
    })
}

/// Format a breakpoint for labels: grouped integer part, trimmed fraction.
pub fn format_breakpoint(v: f64) -> String {
    if !v.is_finite() {
        return v.to_string();
    }
    let rounded = (v * 1e6).round() / 1e6;
    let int_part = rounded.trunc();
    let frac = (rounded - int_part).abs();
    let sign = if rounded < 0.0 && int_part == 0.0 { "-" } else { "" };
    let grouped = (int_part as i64).to_formatted_string(&Locale::en);
    if frac < 1e-9 {
        return format!("{sign}{grouped}");
    }
    let frac_txt = format!("{frac:.6}");
    let frac_txt = frac_txt.trim_start_matches('0').trim_end_matches('0');
    format!("{sign}{grouped}{frac_txt}")
}
