//! Layer rendering: turn (data, style) pairs into draw calls and legend entries.
//!
//! Renderers talk to a [`Canvas`]. Every draw call gets coordinates in lon/lat and either one
//! style for all features (`styles.len() == 1`) or one style per feature. The plotters
//! backend lives in [`crate::viz`]; [`RecordingCanvas`] only records calls.

pub mod recording;

pub use recording::{DrawCall, RecordingCanvas};

use crate::color::Rgba;
use crate::data::{
    Beachball, Datum, Feature, GeoImage, MeshGridData, MultiFocmecData, MultiLineData,
    MultiPointData, MultiPolygonData, MultiTextData, PolygonData,
};
use crate::error::{MapError, Result};
use crate::legend::{
    self, ColorbarSpec, LegendAccumulator, LegendEntry, LegendGroup, LegendHandle, LegendLabel,
};
use crate::map::{LayerKind, MapLayer};
use crate::projection::{Projection, Region};
use crate::style::{
    CompositeStyle, ConcreteFocmecStyle, ConcreteLineStyle, ConcretePointStyle,
    ConcretePolygonStyle, ConcreteStyle, FocmecStyle, FrontStyle, GridStyle, LayerStyle,
    LegendStyle, LineStyle, PointStyle, PolygonStyle, TextStyle,
};
use crate::thematic::{ThemeClass, format_breakpoint};
use ndarray::Array2;
use std::collections::BTreeSet;

/// Beachball raster resolution (cells per side).
const BEACHBALL_RESOLUTION: usize = 48;

/// Smooth grid fills are resampled by this factor per axis.
const SMOOTH_FACTOR: usize = 4;

/// A drawing surface.
pub trait Canvas {
    /// Pixel size of the map area.
    fn map_size_px(&self) -> (u32, u32);

    fn background(&mut self, color: Rgba) -> Result<()>;

    fn scatter(
        &mut self,
        coords: &[(f64, f64)],
        styles: &[ConcretePointStyle],
        zorder: u32,
    ) -> Result<()>;

    fn polylines(
        &mut self,
        lines: &[&[(f64, f64)]],
        styles: &[ConcreteLineStyle],
        front: Option<&FrontStyle>,
        zorder: u32,
    ) -> Result<()>;

    fn polygons(
        &mut self,
        polygons: &[&PolygonData],
        styles: &[ConcretePolygonStyle],
        zorder: u32,
    ) -> Result<()>;

    fn text(&mut self, lon: f64, lat: f64, text: &str, style: &TextStyle, zorder: u32) -> Result<()>;

    /// Colored grid cells; `colors` has the grid's shape.
    fn mesh(&mut self, grid: &MeshGridData, colors: &Array2<Rgba>, zorder: u32) -> Result<()>;

    fn beachball(
        &mut self,
        lon: f64,
        lat: f64,
        ball: &Beachball,
        style: &ConcreteFocmecStyle,
        zorder: u32,
    ) -> Result<()>;

    fn image(&mut self, image: &GeoImage, alpha: f64, zorder: u32) -> Result<()>;

    /// Map frame outline.
    fn border(&mut self, style: &ConcreteLineStyle, zorder: u32) -> Result<()>;

    /// One legend box; `slot` counts boxes already drawn.
    fn legend(&mut self, group: &LegendGroup, style: &LegendStyle, slot: usize) -> Result<()>;

    /// One colorbar; `slot` counts colorbars already drawn.
    fn colorbar(&mut self, spec: &ColorbarSpec, slot: usize) -> Result<()>;

    fn title(&mut self, text: &str, style: &TextStyle) -> Result<()>;
}

/// Stacking counter, advanced once per completed layer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct ZOrder(u32);

impl ZOrder {
    pub fn new(start: u32) -> Self {
        Self(start)
    }

    pub fn current(&self) -> u32 {
        self.0
    }

    /// Move past the current value and return the new one.
    pub fn advance(&mut self) -> u32 {
        self.0 += 1;
        self.0
    }
}

/// Per-session state threaded through layer rendering.
pub struct RenderContext<'a> {
    pub region: Region,
    pub projection: Projection,
    pub zorder: ZOrder,
    pub legend: &'a mut LegendAccumulator,
}

impl<'a> RenderContext<'a> {
    pub fn new(region: Region, projection: Projection, legend: &'a mut LegendAccumulator) -> Self {
        Self {
            region,
            projection,
            zorder: ZOrder::new(1),
            legend,
        }
    }
}

/// What happened to one layer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayerOutcome {
    Drawn { calls: usize },
    Skipped { reason: String },
}

/// Render one layer and advance the z-order.
pub fn render_layer(
    canvas: &mut dyn Canvas,
    layer: &MapLayer,
    ctx: &mut RenderContext<'_>,
) -> Result<LayerOutcome> {
    let label = &layer.legend_label;
    let calls = match &layer.kind {
        LayerKind::Points { data, style } => render_points(canvas, data, style, label, ctx)?,
        LayerKind::Lines { data, style } => render_lines(canvas, data, style, label, ctx)?,
        LayerKind::Polygons { data, style } => render_polygons(canvas, data, style, label, ctx)?,
        LayerKind::Texts { data, style } => render_texts(canvas, data, style, ctx)?,
        LayerKind::Grid { data, style } => render_grid(canvas, data, style, label, ctx)?,
        LayerKind::Focmec { data, style } => render_focmec(canvas, data, style, label, ctx)?,
        LayerKind::Composite { data, style } => render_parts(
            canvas,
            Parts {
                points: &data.points,
                lines: &data.lines,
                polygons: &data.polygons,
                texts: Some(&data.texts),
            },
            style,
            label,
            ctx,
        )?,
        LayerKind::Gis { data, style } => {
            let layers = data.get_data()?;
            render_parts(
                canvas,
                Parts {
                    points: &layers.points,
                    lines: &layers.lines,
                    polygons: &layers.polygons,
                    texts: None,
                },
                style,
                label,
                ctx,
            )?
        }
        LayerKind::Image { data, alpha } => {
            canvas.image(data, *alpha, ctx.zorder.current())?;
            image_legend(label, ctx);
            1
        }
        LayerKind::Wms {
            client,
            request,
            alpha,
        } => {
            let size = canvas.map_size_px();
            match client.get_map(request, &ctx.region, ctx.projection, size) {
                Ok(img) => {
                    canvas.image(&img, *alpha, ctx.zorder.current())?;
                    image_legend(label, ctx);
                    1
                }
                Err(e) => {
                    log::warn!("skipping WMS layer {}: {e}", layer.display_name());
                    ctx.zorder.advance();
                    return Ok(LayerOutcome::Skipped {
                        reason: e.to_string(),
                    });
                }
            }
        }
    };
    log::debug!(
        "layer {} at z={}: {calls} draw calls",
        layer.display_name(),
        ctx.zorder.current()
    );
    ctx.zorder.advance();
    Ok(LayerOutcome::Drawn { calls })
}

pub(crate) fn image_legend(label: &LegendLabel, ctx: &mut RenderContext<'_>) {
    if let Some(text) = label.visible_text() {
        ctx.legend.push(
            &label.group,
            LegendEntry {
                handle: LegendHandle::Patch(ConcretePolygonStyle {
                    line_color: Rgba::BLACK,
                    line_width: 0.5,
                    line_pattern: Default::default(),
                    fill_color: Rgba::rgb(200, 200, 200),
                    alpha: 1.0,
                }),
                label: text.to_string(),
            },
        );
    }
}

fn check_features<T: Feature>(data: &crate::data::Multi<T>, kind: &str) -> Result<()> {
    use geo::CoordsIter;
    let finite = data.iter().all(|f| {
        f.geometry()
            .coords_iter()
            .all(|c| c.x.is_finite() && c.y.is_finite())
    });
    if !finite {
        return Err(MapError::geometry(format!("{kind} with non-finite coordinates")));
    }
    Ok(())
}

pub fn render_points(
    canvas: &mut dyn Canvas,
    data: &MultiPointData,
    style: &PointStyle,
    label: &LegendLabel,
    ctx: &mut RenderContext<'_>,
) -> Result<usize> {
    check_features(data, "points")?;
    let values = data.values();
    let overrides = data.overrides();
    let resolved = style.resolve(&values, &overrides)?;
    let z = ctx.zorder.current();
    let coords: Vec<(f64, f64)> = data.iter().map(|p| (p.lon, p.lat)).collect();
    let mut calls = 0;
    if !data.is_empty() {
        if !style.is_thematic() && overrides.is_empty() {
            canvas.scatter(&coords, &resolved.styles[..1], z)?;
            calls += 1;
        } else {
            // the scatter primitive draws one shape per call
            let mut batches: Vec<(crate::style::MarkerShape, Vec<usize>)> = Vec::new();
            for (i, s) in resolved.styles.iter().enumerate() {
                match batches.iter_mut().find(|(shape, _)| *shape == s.shape) {
                    Some((_, idx)) => idx.push(i),
                    None => batches.push((s.shape, vec![i])),
                }
            }
            for (_, idx) in batches {
                let c: Vec<(f64, f64)> = idx.iter().map(|&i| coords[i]).collect();
                let s: Vec<ConcretePointStyle> =
                    idx.iter().map(|&i| resolved.styles[i].clone()).collect();
                canvas.scatter(&c, &s, z)?;
                calls += 1;
            }
        }
    }
    if let Some(ts) = &style.label_style {
        for p in data.iter() {
            if let Some(text) = p.label.as_deref() {
                canvas.text(p.lon, p.lat, text, ts, z)?;
                calls += 1;
            }
        }
    }
    legend::synthesize(style, &resolved, &values, label, ctx.legend)?;
    Ok(calls)
}

pub fn render_lines(
    canvas: &mut dyn Canvas,
    data: &MultiLineData,
    style: &LineStyle,
    label: &LegendLabel,
    ctx: &mut RenderContext<'_>,
) -> Result<usize> {
    check_features(data, "lines")?;
    let values = data.values();
    let overrides = data.overrides();
    let resolved = style.resolve(&values, &overrides)?;
    let z = ctx.zorder.current();
    let lines: Vec<&[(f64, f64)]> = data.iter().map(|l| l.coords.as_slice()).collect();
    let mut calls = 0;
    if !data.is_empty() {
        match &style.front {
            Some(front) => {
                for (line, s) in lines.iter().zip(&resolved.styles) {
                    canvas.polylines(std::slice::from_ref(line), std::slice::from_ref(s), Some(front), z)?;
                    calls += 1;
                }
            }
            None if !style.is_thematic() && overrides.is_empty() => {
                canvas.polylines(&lines, &resolved.styles[..1], None, z)?;
                calls += 1;
            }
            None => {
                canvas.polylines(&lines, &resolved.styles, None, z)?;
                calls += 1;
            }
        }
    }
    legend::synthesize(style, &resolved, &values, label, ctx.legend)?;
    Ok(calls)
}

pub fn render_polygons(
    canvas: &mut dyn Canvas,
    data: &MultiPolygonData,
    style: &PolygonStyle,
    label: &LegendLabel,
    ctx: &mut RenderContext<'_>,
) -> Result<usize> {
    check_features(data, "polygons")?;
    let values = data.values();
    let overrides = data.overrides();
    let resolved = style.resolve(&values, &overrides)?;
    let z = ctx.zorder.current();
    let polys: Vec<&PolygonData> = data.iter().collect();
    let mut calls = 0;
    if !data.is_empty() {
        if !style.is_thematic() && overrides.is_empty() {
            canvas.polygons(&polys, &resolved.styles[..1], z)?;
            calls += 1;
        } else {
            for (p, s) in polys.iter().zip(&resolved.styles) {
                canvas.polygons(std::slice::from_ref(p), std::slice::from_ref(s), z)?;
                calls += 1;
            }
        }
    }
    if let Some(ts) = &style.label_style {
        for p in data.iter() {
            if let Some(text) = p.label.as_deref() {
                let (lon, lat) = p.centroid();
                canvas.text(lon, lat, text, ts, z)?;
                calls += 1;
            }
        }
    }
    legend::synthesize(style, &resolved, &values, label, ctx.legend)?;
    Ok(calls)
}

pub fn render_texts(
    canvas: &mut dyn Canvas,
    data: &MultiTextData,
    style: &TextStyle,
    ctx: &mut RenderContext<'_>,
) -> Result<usize> {
    let z = ctx.zorder.current();
    for t in data.iter() {
        let mut s = style.clone();
        s.apply(&t.style_params)?;
        canvas.text(t.lon, t.lat, &t.text, &s, z)?;
    }
    Ok(data.len())
}

/// Cell colors of a grid under its style; NaN cells take the bad color or stay transparent.
pub fn grid_colors(grid: &MeshGridData, style: &GridStyle) -> Result<Array2<Rgba>> {
    let numbers: Vec<f64> = grid.values().iter().copied().filter(|v| v.is_finite()).collect();
    let theme = match &style.color {
        crate::thematic::ThematicStyle::Colormap(c) if c.mappable.norm.limits().is_none() => {
            crate::thematic::ThematicStyle::Colormap(crate::thematic::ColormapTheme {
                mappable: c.mappable.autoscaled(&numbers),
                meta: c.meta.clone(),
            })
        }
        other => other.clone(),
    };
    let bad = match &theme {
        crate::thematic::ThematicStyle::Colormap(c) => c.mappable.bad,
        other => other.fallbacks().and_then(|f| f.bad),
    }
    .unwrap_or(Rgba::TRANSPARENT);
    let colors = grid
        .values()
        .iter()
        .map(|&v| {
            if v.is_nan() {
                Ok(bad)
            } else {
                theme
                    .resolve(Some(&Datum::Number(v)))
                    .map(|(_, c)| c.fade(style.alpha))
            }
        })
        .collect::<Result<Vec<Rgba>>>()?;
    Array2::from_shape_vec(grid.values().dim(), colors)
        .map_err(|e| MapError::config(format!("grid colors: {e}")))
}

pub fn render_grid(
    canvas: &mut dyn Canvas,
    grid: &MeshGridData,
    style: &GridStyle,
    label: &LegendLabel,
    ctx: &mut RenderContext<'_>,
) -> Result<usize> {
    let z = ctx.zorder.current();
    let fill = if style.pixelated {
        grid.clone()
    } else {
        let refine = |axis: &[f64]| -> Vec<f64> {
            let n = (axis.len() - 1) * SMOOTH_FACTOR + 1;
            let (lo, hi) = (axis[0], axis[axis.len() - 1]);
            (0..n).map(|i| lo + (hi - lo) * i as f64 / (n - 1) as f64).collect()
        };
        grid.resample(
            refine(grid.lons()),
            refine(grid.lats()),
            crate::data::Interpolation::Bilinear,
        )?
    };
    let colors = grid_colors(&fill, style)?;
    canvas.mesh(&fill, &colors, z)?;
    let mut calls = 1;

    for &level in &style.contour_levels {
        let lines = grid.contour_lines(level);
        if lines.is_empty() {
            continue;
        }
        let refs: Vec<&[(f64, f64)]> = lines.iter().map(|l| l.as_slice()).collect();
        canvas.polylines(&refs, std::slice::from_ref(&style.contour_line), None, z)?;
        calls += 1;
        if style.contour_labels {
            let text = format_breakpoint(level);
            for line in &lines {
                let (lon, lat) = line[line.len() / 2];
                canvas.text(lon, lat, &text, &style.contour_label_style, z)?;
                calls += 1;
            }
        }
    }

    if style.color.add_legend() {
        let numbers: Vec<f64> = grid.values().iter().copied().filter(|v| v.is_finite()).collect();
        if style.color.is_continuous() {
            ctx.legend.push_colorbar(legend::colorbar_for(&style.color, &numbers)?);
        } else {
            let used: BTreeSet<ThemeClass> = numbers
                .iter()
                .filter_map(|v| style.color.resolve(Some(&Datum::Number(*v))).ok())
                .map(|(c, _)| c)
                .collect();
            for (class, color, text) in style.color.legend_classes() {
                if used.contains(&class) {
                    ctx.legend.push(
                        &label.group,
                        LegendEntry {
                            handle: LegendHandle::Patch(patch(color)),
                            label: text,
                        },
                    );
                }
            }
        }
    } else if let Some(text) = label.visible_text() {
        let color = style.color.representative().unwrap_or(Rgba::rgb(128, 128, 128));
        ctx.legend.push(
            &label.group,
            LegendEntry {
                handle: LegendHandle::Patch(patch(color)),
                label: text.to_string(),
            },
        );
    }
    Ok(calls)
}

fn patch(fill: Rgba) -> ConcretePolygonStyle {
    ConcretePolygonStyle {
        line_color: Rgba::TRANSPARENT,
        line_width: 0.0,
        line_pattern: Default::default(),
        fill_color: fill,
        alpha: 1.0,
    }
}

pub fn render_focmec(
    canvas: &mut dyn Canvas,
    data: &MultiFocmecData,
    style: &FocmecStyle,
    label: &LegendLabel,
    ctx: &mut RenderContext<'_>,
) -> Result<usize> {
    let values = data.values();
    let overrides = data.overrides();
    let resolved = style.resolve(&values, &overrides)?;
    let z = ctx.zorder.current();
    for (f, s) in data.iter().zip(&resolved.styles) {
        canvas.beachball(f.lon, f.lat, &f.beachball(BEACHBALL_RESOLUTION), s, z)?;
    }
    legend::synthesize(style, &resolved, &values, label, ctx.legend)?;
    Ok(data.len())
}

struct Parts<'d> {
    points: &'d MultiPointData,
    lines: &'d MultiLineData,
    polygons: &'d MultiPolygonData,
    texts: Option<&'d MultiTextData>,
}

/// Polygons, then lines, then points, then texts; the layer label goes to the first
/// non-empty kind.
fn render_parts(
    canvas: &mut dyn Canvas,
    parts: Parts<'_>,
    style: &CompositeStyle,
    label: &LegendLabel,
    ctx: &mut RenderContext<'_>,
) -> Result<usize> {
    let mut labelled = false;
    let mut label_for = |empty: bool| {
        if empty || labelled {
            LegendLabel {
                group: label.group.clone(),
                text: None,
            }
        } else {
            labelled = true;
            label.clone()
        }
    };
    let mut calls = 0;
    let l = label_for(parts.polygons.is_empty());
    calls += render_polygons(canvas, parts.polygons, &style.polygon, &l, ctx)?;
    let l = label_for(parts.lines.is_empty());
    calls += render_lines(canvas, parts.lines, &style.line, &l, ctx)?;
    let l = label_for(parts.points.is_empty());
    calls += render_points(canvas, parts.points, &style.point, &l, ctx)?;
    if let Some(texts) = parts.texts {
        calls += render_texts(canvas, texts, &style.text, ctx)?;
    }
    Ok(calls)
}
