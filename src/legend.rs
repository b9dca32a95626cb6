//! Legend bookkeeping.
//!
//! Layers append entries to a [`LegendAccumulator`] while they render; the compositor
//! draws every group and colorbar once at the end. Entries for thematic styles are
//! synthesized from the resolver and the classes that were actually used.

use crate::colormap::{Norm, ScalarMappable};
use crate::data::FeatureValue;
use crate::error::Result;
use crate::style::{
    ColorbarStyle, ConcreteFocmecStyle, ConcreteLineStyle, ConcretePointStyle,
    ConcretePolygonStyle, ConcreteStyle, LayerStyle, Resolved,
};
use crate::thematic::{AnyTheme, ThematicStyle, ThemeClass, format_breakpoint};
use std::collections::BTreeSet;

/// Label that suppresses the legend entry.
pub const NO_LEGEND: &str = "_nolegend_";

/// Default legend group.
pub const MAIN_GROUP: &str = "main";

/// Where a layer's legend entry goes and what it says.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LegendLabel {
    pub group: String,
    pub text: Option<String>,
}

impl Default for LegendLabel {
    fn default() -> Self {
        Self {
            group: MAIN_GROUP.to_string(),
            text: None,
        }
    }
}

impl LegendLabel {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            group: MAIN_GROUP.to_string(),
            text: Some(text.into()),
        }
    }

    pub fn in_group(group: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            text: Some(text.into()),
        }
    }

    pub fn none() -> Self {
        Self::new(NO_LEGEND)
    }

    /// The label text, unless missing or the `_nolegend_` sentinel.
    pub fn visible_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| *t != NO_LEGEND)
    }
}

/// Glyph drawn next to a legend label.
#[derive(Clone, Debug, PartialEq)]
pub enum LegendHandle {
    Marker(ConcretePointStyle),
    Line(ConcreteLineStyle),
    Patch(ConcretePolygonStyle),
    Beachball(ConcreteFocmecStyle),
}

/// Concrete styles that can stand for a layer in the legend.
pub trait IntoHandle: ConcreteStyle {
    fn into_handle(self) -> LegendHandle;
}

impl IntoHandle for ConcretePointStyle {
    fn into_handle(self) -> LegendHandle {
        LegendHandle::Marker(self)
    }
}

impl IntoHandle for ConcreteLineStyle {
    fn into_handle(self) -> LegendHandle {
        LegendHandle::Line(self)
    }
}

impl IntoHandle for ConcretePolygonStyle {
    fn into_handle(self) -> LegendHandle {
        LegendHandle::Patch(self)
    }
}

impl IntoHandle for ConcreteFocmecStyle {
    fn into_handle(self) -> LegendHandle {
        LegendHandle::Beachball(self)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct LegendEntry {
    pub handle: LegendHandle,
    pub label: String,
}

#[derive(Clone, Debug, PartialEq, Default)]
pub struct LegendGroup {
    pub name: String,
    pub title: Option<String>,
    pub entries: Vec<LegendEntry>,
}

/// A colorbar to draw after all layers.
#[derive(Clone, Debug, PartialEq)]
pub struct ColorbarSpec {
    pub mappable: ScalarMappable,
    pub ticks: Vec<f64>,
    pub tick_labels: Vec<String>,
    pub style: ColorbarStyle,
}

impl ColorbarSpec {
    /// Value range covered by the bar.
    pub fn range(&self) -> (f64, f64) {
        match &self.mappable.norm {
            Norm::Boundary { boundaries } => (
                boundaries.first().copied().unwrap_or(0.0),
                boundaries.last().copied().unwrap_or(1.0),
            ),
            norm => norm.limits().unwrap_or((0.0, 1.0)),
        }
    }
}

/// Legend groups in first-use order plus pending colorbars.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LegendAccumulator {
    groups: Vec<LegendGroup>,
    colorbars: Vec<ColorbarSpec>,
}

impl LegendAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    fn group_mut(&mut self, name: &str) -> &mut LegendGroup {
        let idx = match self.groups.iter().position(|g| g.name == name) {
            Some(i) => i,
            None => {
                self.groups.push(LegendGroup {
                    name: name.to_string(),
                    ..LegendGroup::default()
                });
                self.groups.len() - 1
            }
        };
        &mut self.groups[idx]
    }

    pub fn push(&mut self, group: &str, entry: LegendEntry) {
        self.group_mut(group).entries.push(entry);
    }

    /// Set a group title unless one is already set.
    pub fn set_title(&mut self, group: &str, title: &str) {
        let g = self.group_mut(group);
        if g.title.is_none() {
            g.title = Some(title.to_string());
        }
    }

    pub fn push_colorbar(&mut self, spec: ColorbarSpec) {
        self.colorbars.push(spec);
    }

    pub fn groups(&self) -> &[LegendGroup] {
        &self.groups
    }

    pub fn group(&self, name: &str) -> Option<&LegendGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    pub fn colorbars(&self) -> &[ColorbarSpec] {
        &self.colorbars
    }

    /// Entries across all groups.
    pub fn n_entries(&self) -> usize {
        self.groups.iter().map(|g| g.entries.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.n_entries() == 0 && self.colorbars.is_empty()
    }
}

/// Colorbar for a color theme, autoscaled over `numbers` when its norm has no limits.
pub fn colorbar_for(theme: &ThematicStyle<crate::color::Rgba>, numbers: &[f64]) -> Result<ColorbarSpec> {
    let mut mappable = theme.to_scalar_mappable()?;
    if mappable.norm.limits().is_none() {
        mappable = mappable.autoscaled(numbers);
    }
    let style = theme.meta().colorbar_style.clone().unwrap_or_default();
    let ticks = match &style.ticks {
        Some(t) => t.clone(),
        None => match theme {
            ThematicStyle::Colormap(_) => match &mappable.norm {
                Norm::Boundary { boundaries } => boundaries.clone(),
                norm => norm
                    .limits()
                    .map(|(a, b)| (0..=4).map(|i| a + (b - a) * i as f64 / 4.0).collect())
                    .unwrap_or_default(),
            },
            // class centers for individual values
            ThematicStyle::Individual(s) => (0..s.styles().len()).map(|i| i as f64).collect(),
            _ => theme.breakpoints(),
        },
    };
    let tick_labels = match &style.tick_labels {
        Some(l) => l.clone(),
        None => match theme {
            ThematicStyle::Individual(_) => (0..ticks.len())
                .map(|i| theme.class_label(ThemeClass::Index(i)))
                .collect(),
            ThematicStyle::Gradient(_) if theme.meta().labels.len() == ticks.len() => {
                theme.meta().labels.clone()
            }
            _ => ticks.iter().map(|t| format_breakpoint(*t)).collect(),
        },
    };
    Ok(ColorbarSpec {
        mappable,
        ticks,
        tick_labels,
        style,
    })
}

fn wants_colorbar(theme: &AnyTheme<'_>) -> bool {
    theme.is_color_style() && theme.is_continuous()
}

/// Numbers a theme classified, for colorbar autoscaling.
fn theme_numbers(theme: &AnyTheme<'_>, values: &[Option<&FeatureValue>]) -> Vec<f64> {
    let key = theme.meta().value_key.as_deref();
    values
        .iter()
        .filter_map(|v| v.and_then(|fv| fv.select(key).ok()))
        .filter_map(|d| d.as_number())
        .filter(|v| v.is_finite())
        .collect()
}

/// Append a layer's legend artifacts and return how many entries were added.
///
/// A layer without legend-enabled thematic attributes contributes one entry (its
/// non-thematic projection) when it has a visible label. Continuous color themes become
/// colorbars; discrete themes add one entry per class present in `resolved`.
pub fn synthesize<S>(
    style: &S,
    resolved: &Resolved<S::Concrete>,
    values: &[Option<&FeatureValue>],
    label: &LegendLabel,
    legend: &mut LegendAccumulator,
) -> Result<usize>
where
    S: LayerStyle,
    S::Concrete: IntoHandle,
{
    let themed: Vec<(&'static str, AnyTheme<'_>)> = style
        .thematic_attrs()
        .into_iter()
        .filter(|(_, t)| t.meta().add_legend)
        .collect();
    if themed.is_empty() {
        return Ok(match label.visible_text() {
            Some(text) => {
                legend.push(
                    &label.group,
                    LegendEntry {
                        handle: style.projection()?.into_handle(),
                        label: text.to_string(),
                    },
                );
                1
            }
            None => 0,
        });
    }

    let mut added = 0;
    for (name, theme) in themed {
        if wants_colorbar(&theme) {
            if let AnyTheme::Color(t) = theme {
                let spec = colorbar_for(t, &theme_numbers(&theme, values))?;
                legend.push_colorbar(spec);
            }
            continue;
        }
        let used: BTreeSet<ThemeClass> = resolved
            .classes
            .get(name)
            .map(|c| c.iter().copied().collect())
            .unwrap_or_default();
        let base = style.projection()?;
        if let Some(title) = theme.meta().legend_title.as_deref() {
            legend.set_title(&label.group, title);
        }
        for (class, param, text) in theme.legend_classes() {
            // gradients interpolate, so every anchor is shown
            let show = used.contains(&class)
                || (used.contains(&ThemeClass::Continuous) && matches!(class, ThemeClass::Index(_)));
            if !show {
                continue;
            }
            let mut handle = base.clone();
            handle.set(name, &param)?;
            legend.push(
                &label.group,
                LegendEntry {
                    handle: handle.into_handle(),
                    label: text,
                },
            );
            added += 1;
        }
    }
    log::debug!("{}: {added} legend entries", S::NAME);
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::color::Rgba;
    use crate::colormap::Colormap;
    use crate::style::{MarkerShape, PointStyle, PolygonStyle};

    fn ranges() -> ThematicStyle<Rgba> {
        ThematicStyle::ranges(
            vec![0.0, 1.0, 10.0, 25.0, 50.0],
            vec![
                Rgba::parse("red").unwrap(),
                Rgba::parse("orange").unwrap(),
                Rgba::parse("yellow").unwrap(),
                Rgba::parse("green").unwrap(),
            ],
        )
        .unwrap()
        .with_legend(true)
    }

    #[test]
    fn label_sentinel() {
        assert_eq!(LegendLabel::none().visible_text(), None);
        assert_eq!(LegendLabel::default().visible_text(), None);
        assert_eq!(LegendLabel::new("Sites").visible_text(), Some("Sites"));
    }

    #[test]
    fn groups_keep_first_use_order() {
        let mut acc = LegendAccumulator::new();
        let entry = LegendEntry {
            handle: LegendHandle::Line(ConcreteLineStyle::default()),
            label: "x".into(),
        };
        acc.push("b", entry.clone());
        acc.push(MAIN_GROUP, entry.clone());
        acc.push("b", entry);
        let names: Vec<&str> = acc.groups().iter().map(|g| g.name.as_str()).collect();
        assert_eq!(names, vec!["b", "main"]);
        assert_eq!(acc.n_entries(), 3);
    }

    #[test]
    fn only_used_classes_are_listed() {
        let style = PolygonStyle::new().with_fill_color(ranges());
        let a = FeatureValue::from(5.0);
        let b = FeatureValue::from(7.0);
        let c = FeatureValue::from(30.0);
        let values = vec![Some(&a), Some(&b), Some(&c)];
        let resolved = style.resolve(&values, &[]).unwrap();
        let mut acc = LegendAccumulator::new();
        let n = synthesize(&style, &resolved, &values, &LegendLabel::default(), &mut acc).unwrap();
        assert_eq!(n, 2);
        let labels: Vec<&str> = acc.groups()[0].entries.iter().map(|e| e.label.as_str()).collect();
        assert_eq!(labels, vec!["1 - 10", "25 - 50"]);
    }

    #[test]
    fn continuous_color_becomes_colorbar() {
        let theme = ThematicStyle::colormap(ScalarMappable::new(
            Norm::Linear {
                vmin: None,
                vmax: None,
            },
            Colormap::grayscale(),
        ))
        .unwrap()
        .with_legend(true);
        let style = PointStyle::new().with_fill_color(theme);
        let a = FeatureValue::from(2.0);
        let b = FeatureValue::from(6.0);
        let values = vec![Some(&a), Some(&b)];
        let resolved = style.resolve(&values, &[]).unwrap();
        let mut acc = LegendAccumulator::new();
        let n = synthesize(&style, &resolved, &values, &LegendLabel::new("v"), &mut acc).unwrap();
        assert_eq!(n, 0);
        assert_eq!(acc.colorbars().len(), 1);
        assert_eq!(acc.colorbars()[0].range(), (2.0, 6.0));
        assert_eq!(acc.colorbars()[0].ticks.len(), 5);
    }

    #[test]
    fn plain_style_gets_single_entry() {
        let style = PointStyle::new().with_shape(MarkerShape::Square);
        let resolved = style.resolve(&[None, None], &[]).unwrap();
        let mut acc = LegendAccumulator::new();
        synthesize(&style, &resolved, &[None, None], &LegendLabel::new("pts"), &mut acc).unwrap();
        synthesize(&style, &resolved, &[None, None], &LegendLabel::none(), &mut acc).unwrap();
        assert_eq!(acc.n_entries(), 1);
        assert!(matches!(
            &acc.groups()[0].entries[0].handle,
            LegendHandle::Marker(s) if s.shape == MarkerShape::Square
        ));
    }
}
