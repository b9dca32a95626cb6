//! Plotters backend: render a [`LayeredMap`] to **SVG** or **PNG**.
//!
//! - Map frame fitted to the projected region's aspect ratio
//! - Legend placement: `Inside`, `Right`, `Top`, `Bottom` (external legends never overlap the frame)
//! - Colorbars stacked below the map (horizontal) or right of it (vertical)
//! - Geometry clipped to the map frame; fronts decorated with symbols along the line

pub mod colorbar;
pub mod legend;
pub mod shapes;
pub mod text;
pub mod types;

pub use types::{DEFAULT_LEGEND_MODE, LegendMode, Orientation};

use crate::color::Rgba;
use crate::data::{Beachball, GeoImage, MeshGridData, PolygonData};
use crate::error::{MapError, Result};
use crate::legend::{ColorbarSpec, LegendAccumulator, LegendGroup};
use crate::map::{LayeredMap, RenderSummary};
use crate::projection::{Frame, Projection, Region};
use crate::render::Canvas;
use crate::style::{
    ConcreteFocmecStyle, ConcreteLineStyle, ConcretePointStyle, ConcretePolygonStyle, FrontStyle,
    FrontSymbol, HAlign, LegendStyle, LineDash, TextStyle, VAlign,
};

use ndarray::Array2;
use plotters::backend::DrawingBackend;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters::style::{FontFamily, FontTransform, TextStyle as PlotTextStyle};
use plotters_bitmap::BitMapBackend;
use plotters_svg::SVGBackend;

use shapes::{Px, Rect, clip_polyline, clip_ring, draw_marker, draw_path, fill_ring, keyhole};
use std::path::Path;
use std::sync::Once;

static INIT_FONTS: Once = Once::new();

fn ensure_fonts_registered() {
    // Safe to call many times; only runs once.
    INIT_FONTS.call_once(|| {
        let _ = plotters::style::register_font(
            "sans-serif",
            plotters::style::FontStyle::Normal,
            include_bytes!("../../assets/DejaVuSans.ttf"),
        );
    });
}

const MARGIN: f64 = 16.0;
const GAP: f64 = 12.0;
/// Inset of inside legends from the frame corner.
const INSET: f64 = 8.0;
/// External legend column never takes more than this share of the figure width.
const MAX_LEGEND_SHARE: f64 = 0.35;
const MIN_MAP_PX: f64 = 20.0;

/// Render `map` to `out_path`: SVG when the extension is `.svg`, a bitmap otherwise.
pub fn plot_map<P: AsRef<Path>>(
    map: &LayeredMap,
    out_path: P,
    width: u32,
    height: u32,
) -> Result<RenderSummary> {
    ensure_fonts_registered();
    let out_path = out_path.as_ref();
    if width < 64 || height < 64 {
        return Err(MapError::config(format!(
            "figure size {width}x{height} is too small (minimum 64x64)"
        )));
    }
    let region = map.region()?;
    let preview = map.legend_preview()?;
    let layout = Layout::compute(width, height, map, &region, &preview)?;
    log::debug!("map frame {:?} in {width}x{height} figure", layout.map);

    let is_svg = out_path
        .extension()
        .and_then(|s| s.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"));
    if is_svg {
        let root = SVGBackend::new(out_path, (width, height)).into_drawing_area();
        draw_map(root, map, layout, region)
    } else {
        let root = BitMapBackend::new(out_path, (width, height)).into_drawing_area();
        draw_map(root, map, layout, region)
    }
}

fn draw_map<DB: DrawingBackend>(
    root: DrawingArea<DB, Shift>,
    map: &LayeredMap,
    layout: Layout,
    region: Region,
) -> Result<RenderSummary> {
    let mut canvas = PlottersCanvas::new(root, layout, map.projection, region);
    let summary = map.render(&mut canvas)?;
    canvas.root.present().map_err(MapError::backend)?;
    Ok(summary)
}

/// Pixel layout of a map figure.
#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    pub width: u32,
    pub height: u32,
    pub map: Rect,
    pub title: Option<Rect>,
    /// Legend column (`Right`), band (`Top`/`Bottom`) or the map frame (`Inside`).
    pub legend: Option<Rect>,
    pub legend_mode: LegendMode,
    /// One slot per colorbar, in drawing order.
    pub colorbars: Vec<Rect>,
}

impl Layout {
    /// Reserve title, legend and colorbar space, then fit the map frame into what is left.
    pub fn compute(
        width: u32,
        height: u32,
        map: &LayeredMap,
        region: &Region,
        preview: &LegendAccumulator,
    ) -> Result<Layout> {
        let (w, h) = (width as f64, height as f64);
        let (mut left, mut top) = (MARGIN, MARGIN);
        let (mut right, mut bottom) = (w - MARGIN, h - MARGIN);

        let title = map.title.as_ref().map(|_| {
            let band = map.title_style.font_size.max(6.0) + 16.0;
            let r = Rect::new(left, top, right - left, band);
            top += band;
            r
        });

        // horizontal colorbars stack upwards from the bottom edge, vertical ones leftwards
        // from the right edge
        let specs = preview.colorbars();
        let mut colorbars = vec![Rect::new(0.0, 0.0, 0.0, 0.0); specs.len()];
        for (i, spec) in specs.iter().enumerate() {
            if spec.style.orientation == Orientation::Horizontal {
                let extent = colorbar::colorbar_extent_px(spec) as f64;
                bottom -= extent;
                colorbars[i] = Rect::new(left, bottom, right - left, extent);
            }
        }
        for (i, spec) in specs.iter().enumerate() {
            if spec.style.orientation == Orientation::Vertical {
                let extent = colorbar::colorbar_extent_px(spec) as f64;
                right -= extent;
                colorbars[i] = Rect::new(right, top, extent, bottom - top);
            }
        }

        let style = &map.legend_style;
        let groups = map.titled_groups(preview);
        let mut legend = None;
        if !groups.is_empty() {
            match style.mode {
                LegendMode::Right => {
                    let lw = legend::estimate_column_width_px(
                        &groups,
                        style,
                        (w * MAX_LEGEND_SHARE) as i32,
                    ) as f64;
                    right -= lw + GAP;
                    legend = Some(Rect::new(right + GAP, top, lw, bottom - top));
                }
                LegendMode::Top | LegendMode::Bottom => {
                    let band_w = right - left;
                    let band_h = band_height(&groups, style, band_w);
                    if style.mode == LegendMode::Top {
                        legend = Some(Rect::new(left, top, band_w, band_h));
                        top += band_h + GAP;
                    } else {
                        bottom -= band_h;
                        legend = Some(Rect::new(left, bottom, band_w, band_h));
                        bottom -= GAP;
                    }
                }
                LegendMode::Inside => {}
            }
        }

        // graticule labels sit outside the frame, left and below
        let (label_left, label_bottom) = match &map.graticule {
            Some(g) if g.labels => {
                let font = g.font_size.max(6.0);
                (font * 4.0 + 4.0, font + 6.0)
            }
            _ => (0.0, 0.0),
        };
        let avail = Rect::new(
            left + label_left,
            top,
            right - left - label_left,
            bottom - top - label_bottom,
        );
        if avail.w < MIN_MAP_PX || avail.h < MIN_MAP_PX {
            return Err(MapError::config(format!(
                "no room for the map frame in a {width}x{height} figure"
            )));
        }
        let map_rect = fit_aspect(&avail, Frame::aspect(map.projection, region));

        if style.mode == LegendMode::Inside && !groups.is_empty() {
            legend = Some(map_rect);
        }
        if let (LegendMode::Right, Some(l)) = (style.mode, legend.as_mut()) {
            l.x = map_rect.right() + GAP;
        }
        Ok(Layout {
            width,
            height,
            map: map_rect,
            title,
            legend,
            legend_mode: style.mode,
            colorbars,
        })
    }
}

fn band_height(groups: &[LegendGroup], style: &LegendStyle, width: f64) -> f64 {
    let boxes: i32 = groups
        .iter()
        .map(|g| legend::estimate_group_height_px(g, style, style.mode, width as i32))
        .sum();
    boxes as f64 + GAP * (groups.len().saturating_sub(1)) as f64
}

/// Largest rectangle with height/width `aspect` centered in `avail`.
fn fit_aspect(avail: &Rect, aspect: f64) -> Rect {
    if !aspect.is_finite() || aspect <= 0.0 {
        return *avail;
    }
    let (w, h) = if avail.w * aspect <= avail.h {
        (avail.w, avail.w * aspect)
    } else {
        (avail.h / aspect, avail.h)
    };
    Rect::new(
        avail.x + (avail.w - w) / 2.0,
        avail.y + (avail.h - h) / 2.0,
        w,
        h,
    )
}

fn style_at<S>(styles: &[S], i: usize) -> Result<&S> {
    let s = if styles.len() == 1 {
        styles.first()
    } else {
        styles.get(i)
    };
    s.ok_or_else(|| MapError::config(format!("no style for feature {i} ({} styles)", styles.len())))
}

fn font_px(size: f64) -> u32 {
    size.round().max(1.0) as u32
}

fn anchor_pos(h: HAlign, v: VAlign) -> Pos {
    let hp = match h {
        HAlign::Left => HPos::Left,
        HAlign::Center => HPos::Center,
        HAlign::Right => HPos::Right,
    };
    let vp = match v {
        VAlign::Top => VPos::Top,
        VAlign::Center => VPos::Center,
        VAlign::Bottom => VPos::Bottom,
    };
    Pos::new(hp, vp)
}

/// Counter-clockwise degrees snapped to the quarter turns plotters can draw.
fn rotation_transform(degrees: f64) -> Option<FontTransform> {
    let quarter = (degrees.rem_euclid(360.0) / 90.0).round() as i32 % 4;
    match quarter {
        1 => Some(FontTransform::Rotate270),
        2 => Some(FontTransform::Rotate180),
        3 => Some(FontTransform::Rotate90),
        _ => None,
    }
}

/// [`Canvas`] drawing onto a plotters drawing area.
pub struct PlottersCanvas<DB: DrawingBackend> {
    root: DrawingArea<DB, Shift>,
    layout: Layout,
    frame: Frame,
    /// Vertical offset of the next legend box within the legend area.
    legend_cursor: f64,
}

impl<DB: DrawingBackend> PlottersCanvas<DB> {
    pub fn new(
        root: DrawingArea<DB, Shift>,
        layout: Layout,
        projection: Projection,
        region: Region,
    ) -> Self {
        let m = layout.map;
        let frame = Frame::new(projection, region, (m.x, m.y, m.w, m.h));
        Self {
            root,
            layout,
            frame,
            legend_cursor: 0.0,
        }
    }

    pub fn layout(&self) -> &Layout {
        &self.layout
    }

    fn project(&self, coords: &[(f64, f64)]) -> Vec<Px> {
        coords
            .iter()
            .map(|&(lon, lat)| self.frame.to_px(lon, lat))
            .collect()
    }

    fn sub_area(&self, r: &Rect) -> DrawingArea<DB, Shift> {
        let [(x0, y0), (x1, y1)] = r.corners_i32();
        self.root.clone().shrink(
            (x0, y0),
            ((x1 - x0).max(1) as u32, (y1 - y0).max(1) as u32),
        )
    }

    fn fill_rect(&self, r: &Rect, color: Rgba) -> Result<()> {
        if color.is_transparent() || r.w <= 0.0 || r.h <= 0.0 {
            return Ok(());
        }
        self.root
            .draw(&Rectangle::new(r.corners_i32(), color.to_plotters().filled()))
            .map_err(MapError::backend)?;
        Ok(())
    }

    fn draw_front(&self, line: &[Px], front: &FrontStyle, style: &ConcreteLineStyle) -> Result<()> {
        let color = front.color.unwrap_or(style.line_color).fade(style.alpha);
        let base_side = if front.flip { -1.0 } else { 1.0 };
        for (k, (at, tangent)) in shapes::sample_along(line, front.interval_px)
            .into_iter()
            .enumerate()
        {
            let side = if front.alternate && k % 2 == 1 {
                -base_side
            } else {
                base_side
            };
            let symbol = match front.symbol {
                FrontSymbol::Mixed if k % 2 == 1 => FrontSymbol::HalfCircle,
                FrontSymbol::Mixed => FrontSymbol::Triangle,
                s => s,
            };
            let (pts, filled) = shapes::front_symbol(symbol, at, tangent, front.size_px, side);
            if filled {
                fill_ring(&self.root, &pts, color)?;
            } else {
                draw_path(&self.root, &pts, color, style.line_width.max(1.5), LineDash::Solid)?;
            }
        }
        Ok(())
    }
}

impl<DB: DrawingBackend> Canvas for PlottersCanvas<DB> {
    fn map_size_px(&self) -> (u32, u32) {
        (
            self.layout.map.w.round() as u32,
            self.layout.map.h.round() as u32,
        )
    }

    fn background(&mut self, color: Rgba) -> Result<()> {
        self.root
            .fill(&color.to_plotters())
            .map_err(MapError::backend)?;
        Ok(())
    }

    fn scatter(&mut self, coords: &[(f64, f64)], styles: &[ConcretePointStyle], _zorder: u32) -> Result<()> {
        for (i, &(lon, lat)) in coords.iter().enumerate() {
            let style = style_at(styles, i)?;
            let p = self.frame.to_px(lon, lat);
            if !self.layout.map.contains(p) {
                continue;
            }
            draw_marker(&self.root, p, style.size / 2.0, style)?;
        }
        Ok(())
    }

    fn polylines(
        &mut self,
        lines: &[&[(f64, f64)]],
        styles: &[ConcreteLineStyle],
        front: Option<&FrontStyle>,
        _zorder: u32,
    ) -> Result<()> {
        for (i, line) in lines.iter().enumerate() {
            let style = style_at(styles, i)?;
            let px = self.project(line);
            for piece in clip_polyline(&px, &self.layout.map) {
                draw_path(
                    &self.root,
                    &piece,
                    style.line_color.fade(style.alpha),
                    style.line_width,
                    style.line_pattern,
                )?;
                if let Some(front) = front {
                    self.draw_front(&piece, front, style)?;
                }
            }
        }
        Ok(())
    }

    fn polygons(
        &mut self,
        polygons: &[&PolygonData],
        styles: &[ConcretePolygonStyle],
        _zorder: u32,
    ) -> Result<()> {
        for (i, poly) in polygons.iter().enumerate() {
            let style = style_at(styles, i)?;
            let exterior = self.project(&poly.exterior);
            let holes: Vec<Vec<Px>> = poly.interiors.iter().map(|r| self.project(r)).collect();
            let ring = keyhole(&exterior, &holes);
            let clipped = clip_ring(&ring, &self.layout.map);
            fill_ring(&self.root, &clipped, style.fill_color.fade(style.alpha))?;

            let edge = style.line_color.fade(style.alpha);
            for outline in std::iter::once(&exterior).chain(holes.iter()) {
                for piece in clip_polyline(outline, &self.layout.map) {
                    draw_path(&self.root, &piece, edge, style.line_width, style.line_pattern)?;
                }
            }
        }
        Ok(())
    }

    fn text(&mut self, lon: f64, lat: f64, text: &str, style: &TextStyle, _zorder: u32) -> Result<()> {
        let anchor = self.frame.to_px(lon, lat);
        let m = &self.layout.map;
        let tolerance = Rect::new(m.x - 1.0, m.y - 1.0, m.w + 2.0, m.h + 2.0);
        if !tolerance.contains(anchor) {
            return Ok(());
        }
        let (x, y) = (anchor.0 + style.offset.0, anchor.1 - style.offset.1);
        let font = font_px(style.font_size);

        if let Some(bg) = style.background_color {
            let tw = text::estimate_text_width_px(text, font) as f64;
            let th = font as f64;
            let bx = match style.h_align {
                HAlign::Left => x,
                HAlign::Center => x - tw / 2.0,
                HAlign::Right => x - tw,
            };
            let by = match style.v_align {
                VAlign::Top => y,
                VAlign::Center => y - th / 2.0,
                VAlign::Bottom => y - th,
            };
            self.fill_rect(&Rect::new(bx - 2.0, by - 2.0, tw + 4.0, th + 4.0), bg)?;
        }

        let color = style.color.to_plotters();
        let mut ts = PlotTextStyle::from((FontFamily::SansSerif, font))
            .pos(anchor_pos(style.h_align, style.v_align))
            .color(&color);
        if let Some(t) = rotation_transform(style.rotation) {
            ts = ts.transform(t);
        }
        self.root
            .draw(&Text::new(text.to_string(), shapes::to_i32((x, y)), ts))
            .map_err(MapError::backend)?;
        Ok(())
    }

    fn mesh(&mut self, grid: &MeshGridData, colors: &Array2<Rgba>, _zorder: u32) -> Result<()> {
        if colors.dim() != grid.values().dim() {
            return Err(MapError::config(format!(
                "mesh colors {:?} do not match grid shape {:?}",
                colors.dim(),
                grid.values().dim()
            )));
        }
        let (lon_edges, lat_edges) = grid.cell_edges();
        let map = self.layout.map;
        for (r, row) in colors.outer_iter().enumerate() {
            // merge runs of equal color along the row
            let mut c = 0;
            while c < row.len() {
                let color = row[c];
                let mut end = c + 1;
                while end < row.len() && row[end] == color {
                    end += 1;
                }
                if !color.is_transparent() {
                    let p0 = self.frame.to_px(lon_edges[c], lat_edges[r + 1]);
                    let p1 = self.frame.to_px(lon_edges[end], lat_edges[r]);
                    let cell = Rect::new(p0.0, p0.1, p1.0 - p0.0, p1.1 - p0.1);
                    if let Some(vis) = cell.intersect(&map) {
                        self.fill_rect(&vis, color)?;
                    }
                }
                c = end;
            }
        }
        Ok(())
    }

    fn beachball(
        &mut self,
        lon: f64,
        lat: f64,
        ball: &Beachball,
        style: &ConcreteFocmecStyle,
        _zorder: u32,
    ) -> Result<()> {
        let center = self.frame.to_px(lon, lat);
        if !self.layout.map.contains(center) {
            return Ok(());
        }
        let radius = style.size / 2.0;
        let n = ball.resolution();
        if n == 0 {
            return Ok(());
        }
        let cell = 2.0 * radius / n as f64;
        let (x_left, y_top) = (center.0 - radius, center.1 - radius);
        for (row, cells) in ball.cells.outer_iter().enumerate() {
            let mut c = 0;
            while c < cells.len() {
                let kind = cells[c];
                let mut end = c + 1;
                while end < cells.len() && cells[end] == kind {
                    end += 1;
                }
                let color = match kind {
                    Some(true) => Some(style.fill_color),
                    Some(false) => Some(style.bg_color),
                    None => None,
                };
                if let Some(color) = color {
                    let r = Rect::new(
                        x_left + c as f64 * cell,
                        y_top + row as f64 * cell,
                        (end - c) as f64 * cell,
                        cell,
                    );
                    self.fill_rect(&r, color.fade(style.alpha))?;
                }
                c = end;
            }
        }
        if style.line_width > 0.0 {
            self.root
                .draw(&Circle::new(
                    shapes::to_i32(center),
                    radius.round().max(1.0) as i32,
                    shapes::stroke(style.line_color.fade(style.alpha), style.line_width),
                ))
                .map_err(MapError::backend)?;
        }
        Ok(())
    }

    fn image(&mut self, image: &GeoImage, alpha: f64, _zorder: u32) -> Result<()> {
        // pixels are stretched linearly over the projected extent of the image bounds
        let b = image.bounds;
        let p0 = self.frame.to_px(b.lon_min, b.lat_max);
        let p1 = self.frame.to_px(b.lon_max, b.lat_min);
        let extent = Rect::new(p0.0, p0.1, p1.0 - p0.0, p1.1 - p0.1);
        let Some(vis) = extent.intersect(&self.layout.map) else {
            return Ok(());
        };
        let (iw, ih) = (image.pixels.width(), image.pixels.height());
        let [(x0, y0), (x1, y1)] = vis.corners_i32();
        for py in y0..y1 {
            let fy = (py as f64 + 0.5 - p0.1) / extent.h;
            let iy = ((fy * ih as f64).floor().max(0.0) as u32).min(ih - 1);
            for px in x0..x1 {
                let fx = (px as f64 + 0.5 - p0.0) / extent.w;
                let ix = ((fx * iw as f64).floor().max(0.0) as u32).min(iw - 1);
                let [r, g, bl, a] = image.pixels.get_pixel(ix, iy).0;
                let color = Rgba::new(r, g, bl, a).fade(alpha);
                if color.is_transparent() {
                    continue;
                }
                self.root
                    .draw_pixel((px, py), &color.to_plotters())
                    .map_err(MapError::backend)?;
            }
        }
        Ok(())
    }

    fn border(&mut self, style: &ConcreteLineStyle, _zorder: u32) -> Result<()> {
        let m = self.layout.map;
        let ring = [
            (m.x, m.y),
            (m.right(), m.y),
            (m.right(), m.bottom()),
            (m.x, m.bottom()),
            (m.x, m.y),
        ];
        draw_path(
            &self.root,
            &ring,
            style.line_color.fade(style.alpha),
            style.line_width,
            style.line_pattern,
        )
    }

    fn legend(&mut self, group: &LegendGroup, style: &LegendStyle, _slot: usize) -> Result<()> {
        let mode = style.mode;
        let Some(area) = self.layout.legend else {
            log::warn!("no legend area reserved; skipping legend group {:?}", group.name);
            return Ok(());
        };
        let rect = match mode {
            LegendMode::Right | LegendMode::Top | LegendMode::Bottom => {
                let h = legend::estimate_group_height_px(group, style, mode, area.w as i32) as f64;
                Rect::new(area.x, area.y + self.legend_cursor, area.w, h)
            }
            LegendMode::Inside => {
                let w = legend::estimate_column_width_px(
                    std::slice::from_ref(group),
                    style,
                    (area.w * 0.5) as i32,
                ) as f64;
                let h = legend::estimate_group_height_px(group, style, mode, w as i32) as f64;
                Rect::new(
                    area.right() - w - INSET,
                    area.y + INSET + self.legend_cursor,
                    w,
                    h,
                )
            }
        };
        self.legend_cursor += rect.h + GAP;
        legend::draw_legend_group(&self.sub_area(&rect), group, style, mode)
    }

    fn colorbar(&mut self, spec: &ColorbarSpec, slot: usize) -> Result<()> {
        let Some(rect) = self.layout.colorbars.get(slot).copied() else {
            log::warn!("no colorbar slot {slot} reserved; skipping");
            return Ok(());
        };
        colorbar::draw_colorbar(&self.sub_area(&rect), spec)
    }

    fn title(&mut self, text: &str, style: &TextStyle) -> Result<()> {
        let band = self
            .layout
            .title
            .unwrap_or_else(|| Rect::new(0.0, 0.0, self.layout.width as f64, MARGIN * 2.0));
        let color = style.color.to_plotters();
        let ts = PlotTextStyle::from((FontFamily::SansSerif, font_px(style.font_size)))
            .pos(Pos::new(HPos::Center, VPos::Center))
            .color(&color);
        let at = (band.x + band.w / 2.0, band.y + band.h / 2.0);
        self.root
            .draw(&Text::new(text.to_string(), shapes::to_i32(at), ts))
            .map_err(MapError::backend)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::MultiPointData;
    use crate::map::MapLayer;
    use crate::style::PointStyle;

    fn belgium() -> Region {
        Region::new(2.0, 7.0, 49.0, 52.0).unwrap()
    }

    #[test]
    fn frame_keeps_aspect_ratio() {
        let map = LayeredMap::new().with_region(belgium());
        let preview = map.legend_preview().unwrap();
        let layout = Layout::compute(800, 600, &map, &belgium(), &preview).unwrap();
        let expected = Frame::aspect(Projection::PlateCarree, &belgium());
        let got = layout.map.h / layout.map.w;
        assert!((got - expected).abs() < 1e-9);
        assert!(layout.map.x >= MARGIN && layout.map.right() <= 800.0 - MARGIN);
        assert!(layout.legend.is_none());
    }

    #[test]
    fn right_legend_sits_beside_the_frame() {
        let points = MultiPointData::from_coords(&[4.0, 5.0], &[50.0, 51.0]).unwrap();
        let map = LayeredMap::new()
            .with_region(belgium())
            .with_layer(MapLayer::points(points, PointStyle::default()).with_label("Stations"));
        let preview = map.legend_preview().unwrap();
        let layout = Layout::compute(800, 600, &map, &belgium(), &preview).unwrap();
        let legend = layout.legend.unwrap();
        assert!(legend.x >= layout.map.right());
        assert!(legend.right() <= 800.0);
    }

    #[test]
    fn tiny_figures_are_rejected() {
        let map = LayeredMap::new().with_region(belgium());
        let preview = map.legend_preview().unwrap();
        assert!(Layout::compute(40, 40, &map, &belgium(), &preview).is_err());
    }

    #[test]
    fn text_rotation_snaps_to_quarter_turns() {
        assert!(rotation_transform(0.0).is_none());
        assert!(matches!(rotation_transform(90.0), Some(FontTransform::Rotate270)));
        assert!(matches!(rotation_transform(-90.0), Some(FontTransform::Rotate90)));
        assert!(matches!(rotation_transform(178.0), Some(FontTransform::Rotate180)));
    }

    #[test]
    fn fit_centers_the_frame() {
        let r = fit_aspect(&Rect::new(0.0, 0.0, 200.0, 100.0), 0.5);
        assert_eq!(r, Rect::new(0.0, 0.0, 200.0, 100.0));
        let r = fit_aspect(&Rect::new(0.0, 0.0, 200.0, 100.0), 1.0);
        assert_eq!(r, Rect::new(50.0, 0.0, 100.0, 100.0));
    }
}
