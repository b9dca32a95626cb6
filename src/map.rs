//! The layered map: an ordered list of layers plus frame decorations.
//!
//! ```no_run
//! use mapcompose::data::{MultiPointData, PointData};
//! use mapcompose::map::{LayeredMap, MapLayer};
//! use mapcompose::projection::Region;
//! use mapcompose::style::PointStyle;
//!
//! let points: MultiPointData = [PointData::new(4.35, 50.85).with_label("Brussels")]
//!     .into_iter()
//!     .collect();
//! let map = LayeredMap::new()
//!     .with_region(Region::new(0.0, 8.0, 49.0, 52.0)?)
//!     .with_title("Belgium")
//!     .with_layer(MapLayer::points(points, PointStyle::new()).with_label("capital"));
//! map.plot("belgium.svg", 900, 500)?;
//! # Ok::<(), mapcompose::MapError>(())
//! ```

use crate::color::Rgba;
use crate::data::{
    CompositeData, GeoImage, MeshGridData, MultiFocmecData, MultiLineData, MultiPointData,
    MultiPolygonData, MultiTextData,
};
use crate::error::{MapError, Result};
use crate::gis::GisData;
use crate::legend::{LegendAccumulator, LegendGroup, LegendLabel, MAIN_GROUP};
use crate::projection::{Projection, Region, graticule};
use crate::render::{self, Canvas, LayerOutcome, RecordingCanvas, RenderContext};
use crate::style::{
    CompositeStyle, ConcreteLineStyle, FocmecStyle, GraticuleStyle, GridStyle, HAlign,
    LegendStyle, LineStyle, PointStyle, PolygonStyle, TextStyle, VAlign,
};
use crate::wms::{WmsClient, WmsRequest};
use std::path::Path;

/// What a layer draws.
#[derive(Clone, Debug)]
pub enum LayerKind {
    Points { data: MultiPointData, style: PointStyle },
    Lines { data: MultiLineData, style: LineStyle },
    Polygons { data: MultiPolygonData, style: PolygonStyle },
    Texts { data: MultiTextData, style: TextStyle },
    Grid { data: MeshGridData, style: GridStyle },
    Focmec { data: MultiFocmecData, style: FocmecStyle },
    Composite { data: CompositeData, style: CompositeStyle },
    Gis { data: GisData, style: CompositeStyle },
    Image { data: GeoImage, alpha: f64 },
    Wms {
        client: WmsClient,
        request: WmsRequest,
        alpha: f64,
    },
}

impl LayerKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            LayerKind::Points { .. } => "points",
            LayerKind::Lines { .. } => "lines",
            LayerKind::Polygons { .. } => "polygons",
            LayerKind::Texts { .. } => "texts",
            LayerKind::Grid { .. } => "grid",
            LayerKind::Focmec { .. } => "focmec",
            LayerKind::Composite { .. } => "composite",
            LayerKind::Gis { .. } => "gis",
            LayerKind::Image { .. } => "image",
            LayerKind::Wms { .. } => "wms",
        }
    }

    /// Geographic extent of the layer data, when it has one.
    pub fn bbox(&self) -> Option<Region> {
        match self {
            LayerKind::Points { data, .. } => data.bbox(),
            LayerKind::Lines { data, .. } => data.bbox(),
            LayerKind::Polygons { data, .. } => data.bbox(),
            LayerKind::Texts { data, .. } => data.bbox(),
            LayerKind::Grid { data, .. } => Some(data.bbox()),
            LayerKind::Focmec { data, .. } => data.bbox(),
            LayerKind::Composite { data, .. } => data.bbox(),
            LayerKind::Gis { data, .. } => data.get_data().ok().and_then(|l| l.bbox()),
            LayerKind::Image { data, .. } => Some(data.bounds),
            LayerKind::Wms { .. } => None,
        }
    }
}

/// One layer: data, style and legend label.
#[derive(Clone, Debug)]
pub struct MapLayer {
    pub kind: LayerKind,
    pub legend_label: LegendLabel,
    pub name: Option<String>,
}

impl MapLayer {
    pub fn new(kind: LayerKind) -> Self {
        Self {
            kind,
            legend_label: LegendLabel::default(),
            name: None,
        }
    }

    pub fn points(data: MultiPointData, style: PointStyle) -> Self {
        Self::new(LayerKind::Points { data, style })
    }

    pub fn lines(data: MultiLineData, style: LineStyle) -> Self {
        Self::new(LayerKind::Lines { data, style })
    }

    pub fn polygons(data: MultiPolygonData, style: PolygonStyle) -> Self {
        Self::new(LayerKind::Polygons { data, style })
    }

    pub fn texts(data: MultiTextData, style: TextStyle) -> Self {
        Self::new(LayerKind::Texts { data, style })
    }

    pub fn grid(data: MeshGridData, style: GridStyle) -> Self {
        Self::new(LayerKind::Grid { data, style })
    }

    pub fn focmec(data: MultiFocmecData, style: FocmecStyle) -> Self {
        Self::new(LayerKind::Focmec { data, style })
    }

    pub fn composite(data: CompositeData, style: CompositeStyle) -> Self {
        Self::new(LayerKind::Composite { data, style })
    }

    pub fn gis(data: GisData, style: CompositeStyle) -> Self {
        Self::new(LayerKind::Gis { data, style })
    }

    pub fn image(data: GeoImage, alpha: f64) -> Self {
        Self::new(LayerKind::Image { data, alpha })
    }

    pub fn wms(client: WmsClient, request: WmsRequest) -> Self {
        Self::new(LayerKind::Wms {
            client,
            request,
            alpha: 1.0,
        })
    }

    /// Legend text in the main group.
    pub fn with_label(mut self, text: impl Into<String>) -> Self {
        self.legend_label.text = Some(text.into());
        self
    }

    pub fn with_legend(mut self, label: LegendLabel) -> Self {
        self.legend_label = label;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Name for log messages: the explicit name, else the legend text, else the kind.
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .or(self.legend_label.visible_text())
            .unwrap_or(self.kind.kind_name())
    }
}

/// What a render pass did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RenderSummary {
    pub draw_calls: usize,
    pub layers_drawn: usize,
    /// `(layer name, reason)` for every skipped layer.
    pub skipped: Vec<(String, String)>,
    pub legend_entries: usize,
    pub colorbars: usize,
    /// Z-order after the last decoration.
    pub zorder: u32,
}

/// Ordered layers with region, projection and decorations.
#[derive(Clone, Debug)]
pub struct LayeredMap {
    pub layers: Vec<MapLayer>,
    /// Derived from the layer extents when unset.
    pub region: Option<Region>,
    pub projection: Projection,
    pub title: Option<String>,
    pub title_style: TextStyle,
    pub legend_style: LegendStyle,
    pub graticule: Option<GraticuleStyle>,
    pub border_style: Option<ConcreteLineStyle>,
    pub background: Rgba,
}

impl Default for LayeredMap {
    fn default() -> Self {
        Self {
            layers: Vec::new(),
            region: None,
            projection: Projection::PlateCarree,
            title: None,
            title_style: TextStyle {
                font_size: 18.0,
                ..TextStyle::default()
            },
            legend_style: LegendStyle::default(),
            graticule: None,
            border_style: Some(ConcreteLineStyle::default()),
            background: Rgba::WHITE,
        }
    }
}

impl LayeredMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region: Region) -> Self {
        self.region = Some(region);
        self
    }

    pub fn with_projection(mut self, projection: Projection) -> Self {
        self.projection = projection;
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_legend_style(mut self, style: LegendStyle) -> Self {
        self.legend_style = style;
        self
    }

    pub fn with_graticule(mut self, style: GraticuleStyle) -> Self {
        self.graticule = Some(style);
        self
    }

    pub fn with_border(mut self, style: Option<ConcreteLineStyle>) -> Self {
        self.border_style = style;
        self
    }

    pub fn with_background(mut self, color: Rgba) -> Self {
        self.background = color;
        self
    }

    pub fn with_layer(mut self, layer: MapLayer) -> Self {
        self.layers.push(layer);
        self
    }

    pub fn push(&mut self, layer: MapLayer) {
        self.layers.push(layer);
    }

    /// The explicit region, or the padded union of all layer extents.
    pub fn region(&self) -> Result<Region> {
        let region = match self.region {
            Some(r) => {
                r.validate()?;
                r
            }
            None => self
                .layers
                .iter()
                .filter_map(|l| l.kind.bbox())
                .reduce(|a, b| a.union(&b))
                .map(|r| r.padded(0.05, 0.5))
                .ok_or_else(|| MapError::config("no region given and no layer has an extent"))?,
        };
        self.projection.check_region(&region)?;
        Ok(region)
    }

    /// Render every layer in order, then graticule, border, legends, colorbars and title.
    pub fn render(&self, canvas: &mut dyn Canvas) -> Result<RenderSummary> {
        let region = self.region()?;
        let mut legend = LegendAccumulator::new();
        let mut summary = RenderSummary::default();
        canvas.background(self.background)?;

        let mut ctx = RenderContext::new(region, self.projection, &mut legend);
        for layer in &self.layers {
            match render::render_layer(canvas, layer, &mut ctx)? {
                LayerOutcome::Drawn { calls } => {
                    summary.draw_calls += calls;
                    summary.layers_drawn += 1;
                }
                LayerOutcome::Skipped { reason } => summary
                    .skipped
                    .push((layer.display_name().to_string(), reason)),
            }
        }
        if let Some(g) = &self.graticule {
            summary.draw_calls += draw_graticule(canvas, g, &region, ctx.zorder.current())?;
            ctx.zorder.advance();
        }
        if let Some(b) = &self.border_style {
            canvas.border(b, ctx.zorder.current())?;
            summary.draw_calls += 1;
            ctx.zorder.advance();
        }
        summary.zorder = ctx.zorder.current();

        for (slot, group) in self.titled_groups(&legend).iter().enumerate() {
            canvas.legend(group, &self.legend_style, slot)?;
        }
        for (slot, spec) in legend.colorbars().iter().enumerate() {
            canvas.colorbar(spec, slot)?;
        }
        if let Some(title) = &self.title {
            canvas.title(title, &self.title_style)?;
        }
        summary.legend_entries = legend.n_entries();
        summary.colorbars = legend.colorbars().len();
        log::debug!(
            "rendered {} layers ({} skipped), {} draw calls, {} legend entries",
            summary.layers_drawn,
            summary.skipped.len(),
            summary.draw_calls,
            summary.legend_entries
        );
        Ok(summary)
    }

    /// Legend content without drawing or fetching anything, for laying out legend panels.
    pub fn legend_preview(&self) -> Result<LegendAccumulator> {
        let region = self.region()?;
        let mut legend = LegendAccumulator::new();
        let mut canvas = RecordingCanvas::new(1, 1);
        let mut ctx = RenderContext::new(region, self.projection, &mut legend);
        for layer in &self.layers {
            if let LayerKind::Wms { .. } = layer.kind {
                render::image_legend(&layer.legend_label, &mut ctx);
                continue;
            }
            render::render_layer(&mut canvas, layer, &mut ctx)?;
        }
        Ok(legend)
    }

    /// Non-empty legend groups in drawing order; the main group takes the legend title.
    pub fn titled_groups(&self, legend: &LegendAccumulator) -> Vec<LegendGroup> {
        legend
            .groups()
            .iter()
            .filter(|g| !g.entries.is_empty())
            .map(|g| {
                let mut group = g.clone();
                if group.title.is_none() && group.name == MAIN_GROUP {
                    group.title = self.legend_style.title.clone();
                }
                group
            })
            .collect()
    }

    /// Render to an `.svg` file, or to a bitmap chosen by the extension (`.png`, `.jpg`, ...).
    pub fn plot<P: AsRef<Path>>(&self, path: P, width: u32, height: u32) -> Result<RenderSummary> {
        crate::viz::plot_map(self, path, width, height)
    }
}

fn draw_graticule(
    canvas: &mut dyn Canvas,
    style: &GraticuleStyle,
    region: &Region,
    zorder: u32,
) -> Result<usize> {
    let lines = graticule(region, style.lon_step, style.lat_step)?;
    if lines.is_empty() {
        return Ok(0);
    }
    let coords: Vec<&[(f64, f64)]> = lines.iter().map(|l| l.coords.as_slice()).collect();
    canvas.polylines(&coords, std::slice::from_ref(&style.line), None, zorder)?;
    let mut calls = 1;
    if style.labels {
        for line in &lines {
            let (lon, lat) = line.coords[0];
            // meridians are labelled below the frame, parallels left of it
            let text_style = if line.is_meridian {
                TextStyle {
                    font_size: style.font_size,
                    v_align: VAlign::Top,
                    offset: (0.0, -4.0),
                    ..TextStyle::default()
                }
            } else {
                TextStyle {
                    font_size: style.font_size,
                    h_align: HAlign::Right,
                    offset: (-4.0, 0.0),
                    ..TextStyle::default()
                }
            };
            canvas.text(lon, lat, &line.label, &text_style, zorder)?;
            calls += 1;
        }
    }
    Ok(calls)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::PointData;

    fn points() -> MultiPointData {
        [PointData::new(1.0, 50.0), PointData::new(3.0, 51.0)]
            .into_iter()
            .collect()
    }

    #[test]
    fn region_derived_from_layers() {
        let map = LayeredMap::new().with_layer(MapLayer::points(points(), PointStyle::new()));
        let r = map.region().unwrap();
        assert!(r.lon_min < 1.0 && r.lon_max > 3.0);
        assert!(r.lat_min < 50.0 && r.lat_max > 51.0);
    }

    #[test]
    fn empty_map_without_region_fails() {
        assert!(matches!(
            LayeredMap::new().region(),
            Err(MapError::Config { .. })
        ));
    }

    #[test]
    fn decorations_follow_layers() {
        let map = LayeredMap::new()
            .with_region(Region::new(0.0, 8.0, 49.0, 52.0).unwrap())
            .with_graticule(GraticuleStyle {
                lon_step: 2.0,
                lat_step: 1.0,
                ..GraticuleStyle::default()
            })
            .with_title("t")
            .with_layer(MapLayer::points(points(), PointStyle::new()).with_label("pts"));
        let mut canvas = RecordingCanvas::new(800, 300);
        let summary = map.render(&mut canvas).unwrap();
        assert_eq!(summary.layers_drawn, 1);
        assert_eq!(summary.legend_entries, 1);
        // layer at 1, graticule at 2, border at 3
        assert_eq!(summary.zorder, 4);
        let border = canvas.calls_of("border").next().unwrap();
        assert_eq!(border.zorder, 3);
        assert_eq!(canvas.count("legend"), 1);
        assert_eq!(canvas.count("title"), 1);
        // 5 meridian and 4 parallel labels
        assert_eq!(canvas.count("text"), 9);
    }

    #[test]
    fn preview_matches_render_legend() {
        let map = LayeredMap::new()
            .with_layer(MapLayer::points(points(), PointStyle::new()).with_label("a"))
            .with_layer(MapLayer::points(points(), PointStyle::new()).with_label("b"));
        assert_eq!(map.legend_preview().unwrap().n_entries(), 2);
    }
}
