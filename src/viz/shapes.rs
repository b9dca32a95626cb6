//! Pixel-space geometry and primitive drawing: clipping, dashes, markers, front symbols.
//!
//! Plotters draws whatever it is given, so everything inside the map frame is clipped here
//! before it reaches the backend.

use crate::color::Rgba;
use crate::error::{MapError, Result};
use crate::style::{ConcretePointStyle, FrontSymbol, LineDash, MarkerShape};
use plotters::backend::DrawingBackend;
use plotters::coord::Shift;
use plotters::prelude::*;

pub type Px = (f64, f64);

/// Axis-aligned pixel rectangle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    pub fn right(&self) -> f64 {
        self.x + self.w
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.h
    }

    pub fn contains(&self, p: Px) -> bool {
        p.0 >= self.x && p.0 <= self.right() && p.1 >= self.y && p.1 <= self.bottom()
    }

    /// Overlap of two rectangles, `None` when disjoint.
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x0 = self.x.max(other.x);
        let y0 = self.y.max(other.y);
        let x1 = self.right().min(other.right());
        let y1 = self.bottom().min(other.bottom());
        (x1 > x0 && y1 > y0).then(|| Rect::new(x0, y0, x1 - x0, y1 - y0))
    }

    pub fn corners_i32(&self) -> [(i32, i32); 2] {
        [
            (self.x.floor() as i32, self.y.floor() as i32),
            (self.right().ceil() as i32, self.bottom().ceil() as i32),
        ]
    }
}

pub fn to_i32(p: Px) -> (i32, i32) {
    (p.0.round() as i32, p.1.round() as i32)
}

// Liang-Barsky
fn clip_segment(a: Px, b: Px, r: &Rect) -> Option<(Px, Px)> {
    let (dx, dy) = (b.0 - a.0, b.1 - a.1);
    let mut t0 = 0.0_f64;
    let mut t1 = 1.0_f64;
    for (p, q) in [
        (-dx, a.0 - r.x),
        (dx, r.right() - a.0),
        (-dy, a.1 - r.y),
        (dy, r.bottom() - a.1),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
        } else {
            let t = q / p;
            if p < 0.0 {
                t0 = t0.max(t);
            } else {
                t1 = t1.min(t);
            }
            if t0 > t1 {
                return None;
            }
        }
    }
    Some((
        (a.0 + t0 * dx, a.1 + t0 * dy),
        (a.0 + t1 * dx, a.1 + t1 * dy),
    ))
}

/// Visible pieces of a polyline inside `rect`.
pub fn clip_polyline(points: &[Px], rect: &Rect) -> Vec<Vec<Px>> {
    let mut pieces: Vec<Vec<Px>> = Vec::new();
    let mut cur: Vec<Px> = Vec::new();
    for w in points.windows(2) {
        match clip_segment(w[0], w[1], rect) {
            Some((a, b)) => {
                if cur.last() != Some(&a) {
                    if cur.len() > 1 {
                        pieces.push(std::mem::take(&mut cur));
                    }
                    cur.clear();
                    cur.push(a);
                }
                cur.push(b);
            }
            None => {
                if cur.len() > 1 {
                    pieces.push(std::mem::take(&mut cur));
                }
                cur.clear();
            }
        }
    }
    if cur.len() > 1 {
        pieces.push(cur);
    }
    pieces
}

/// Sutherland-Hodgman clip of a closed ring against `rect`.
pub fn clip_ring(ring: &[Px], rect: &Rect) -> Vec<Px> {
    type Edge = Box<dyn Fn(Px) -> bool>;
    let (x0, x1, y0, y1) = (rect.x, rect.right(), rect.y, rect.bottom());
    let edges: [(Edge, u8); 4] = [
        (Box::new(move |p: Px| p.0 >= x0), 0),
        (Box::new(move |p: Px| p.0 <= x1), 1),
        (Box::new(move |p: Px| p.1 >= y0), 2),
        (Box::new(move |p: Px| p.1 <= y1), 3),
    ];
    let cross = |a: Px, b: Px, edge: u8| -> Px {
        let (bound, vertical) = match edge {
            0 => (x0, true),
            1 => (x1, true),
            2 => (y0, false),
            _ => (y1, false),
        };
        if vertical {
            let t = (bound - a.0) / (b.0 - a.0);
            (bound, a.1 + t * (b.1 - a.1))
        } else {
            let t = (bound - a.1) / (b.1 - a.1);
            (a.0 + t * (b.0 - a.0), bound)
        }
    };
    let mut out: Vec<Px> = ring.to_vec();
    for (inside, edge) in &edges {
        if out.is_empty() {
            break;
        }
        let input = std::mem::take(&mut out);
        let mut prev = input[input.len() - 1];
        for &p in &input {
            match (inside(p), inside(prev)) {
                (true, true) => out.push(p),
                (true, false) => {
                    out.push(cross(prev, p, *edge));
                    out.push(p);
                }
                (false, true) => out.push(cross(prev, p, *edge)),
                (false, false) => {}
            }
            prev = p;
        }
    }
    out
}

fn signed_area(ring: &[Px]) -> f64 {
    let n = ring.len();
    (0..n)
        .map(|i| {
            let (a, b) = (ring[i], ring[(i + 1) % n]);
            a.0 * b.1 - b.0 * a.1
        })
        .sum::<f64>()
        / 2.0
}

/// One ring tracing the exterior and every hole through zero-width bridges, with holes
/// wound opposite to the exterior so both fill rules leave them empty.
pub fn keyhole(exterior: &[Px], holes: &[Vec<Px>]) -> Vec<Px> {
    let mut out: Vec<Px> = exterior.to_vec();
    if signed_area(&out) < 0.0 {
        out.reverse();
    }
    let Some(&anchor) = out.first() else {
        return out;
    };
    out.push(anchor);
    for hole in holes.iter().filter(|h| h.len() >= 3) {
        let mut h = hole.clone();
        if signed_area(&h) > 0.0 {
            h.reverse();
        }
        let start = h[0];
        out.extend(h);
        out.push(start);
        out.push(anchor);
    }
    out
}

/// Split a polyline into the "on" pieces of a dash pattern given in pixels.
pub fn dash_pieces(points: &[Px], pattern: &[f64]) -> Vec<Vec<Px>> {
    if pattern.is_empty() || pattern.iter().any(|d| *d <= 0.0) {
        return vec![points.to_vec()];
    }
    let mut pieces = Vec::new();
    let mut idx = 0;
    let mut left = pattern[0];
    let mut on = true;
    let mut cur: Vec<Px> = points.first().copied().into_iter().collect();
    for w in points.windows(2) {
        let (mut a, b) = (w[0], w[1]);
        let mut seg = ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt();
        while seg > left {
            let t = left / seg;
            let p = (a.0 + t * (b.0 - a.0), a.1 + t * (b.1 - a.1));
            if on {
                cur.push(p);
                pieces.push(std::mem::take(&mut cur));
            } else {
                cur = vec![p];
            }
            on = !on;
            seg -= left;
            a = p;
            idx = (idx + 1) % pattern.len();
            left = pattern[idx];
        }
        left -= seg;
        if on {
            cur.push(b);
        }
    }
    if on && cur.len() > 1 {
        pieces.push(cur);
    }
    pieces
}

/// Evenly spaced positions along a polyline (first at half an interval) with unit tangents.
pub fn sample_along(points: &[Px], interval: f64) -> Vec<(Px, Px)> {
    let mut out = Vec::new();
    if interval <= 0.0 {
        return out;
    }
    let mut next = interval / 2.0;
    let mut walked = 0.0;
    for w in points.windows(2) {
        let (a, b) = (w[0], w[1]);
        let len = ((b.0 - a.0).powi(2) + (b.1 - a.1).powi(2)).sqrt();
        if len == 0.0 {
            continue;
        }
        let tangent = ((b.0 - a.0) / len, (b.1 - a.1) / len);
        while next <= walked + len {
            let t = (next - walked) / len;
            out.push(((a.0 + t * (b.0 - a.0), a.1 + t * (b.1 - a.1)), tangent));
            next += interval;
        }
        walked += len;
    }
    out
}

/// Outline of one front symbol; `side` is +1 for the left of the line direction, -1 for
/// the right. Returns the points and whether the shape is filled.
pub fn front_symbol(symbol: FrontSymbol, at: Px, tangent: Px, size: f64, side: f64) -> (Vec<Px>, bool) {
    // screen y points down, so the left normal of (tx, ty) is (ty, -tx)
    let normal = (tangent.1 * side, -tangent.0 * side);
    let half = size / 2.0;
    match symbol {
        FrontSymbol::Triangle | FrontSymbol::Mixed => (
            vec![
                (at.0 - tangent.0 * half, at.1 - tangent.1 * half),
                (at.0 + tangent.0 * half, at.1 + tangent.1 * half),
                (at.0 + normal.0 * size, at.1 + normal.1 * size),
            ],
            true,
        ),
        FrontSymbol::HalfCircle => {
            let pts = (0..=12)
                .map(|i| {
                    let a = std::f64::consts::PI * i as f64 / 12.0;
                    let (c, s) = (a.cos(), a.sin());
                    (
                        at.0 - tangent.0 * half * c + normal.0 * half * s,
                        at.1 - tangent.1 * half * c + normal.1 * half * s,
                    )
                })
                .collect();
            (pts, true)
        }
        FrontSymbol::Bar => (
            vec![at, (at.0 + normal.0 * size, at.1 + normal.1 * size)],
            false,
        ),
    }
}

/// Pixel geometry of a marker.
#[derive(Clone, Debug, PartialEq)]
pub enum MarkerGeom {
    Circle(f64),
    Polygon(Vec<Px>),
    Strokes(Vec<[Px; 2]>),
}

/// Marker geometry centered at `c` with half-size `r`.
pub fn marker_geom(shape: MarkerShape, c: Px, r: f64) -> MarkerGeom {
    let (x, y) = c;
    match shape {
        MarkerShape::Circle => MarkerGeom::Circle(r),
        MarkerShape::Dot => MarkerGeom::Circle((r / 2.5).max(1.0)),
        MarkerShape::Square => MarkerGeom::Polygon(vec![
            (x - r, y - r),
            (x + r, y - r),
            (x + r, y + r),
            (x - r, y + r),
        ]),
        MarkerShape::Triangle => MarkerGeom::Polygon(vec![(x, y - r), (x - r, y + r), (x + r, y + r)]),
        MarkerShape::TriangleDown => {
            MarkerGeom::Polygon(vec![(x, y + r), (x + r, y - r), (x - r, y - r)])
        }
        MarkerShape::Diamond => {
            MarkerGeom::Polygon(vec![(x, y - r), (x - r, y), (x, y + r), (x + r, y)])
        }
        MarkerShape::Star => MarkerGeom::Polygon(
            (0..10)
                .map(|i| {
                    let a = -std::f64::consts::FRAC_PI_2 + std::f64::consts::PI * i as f64 / 5.0;
                    let rr = if i % 2 == 0 { r } else { r * 0.4 };
                    (x + rr * a.cos(), y + rr * a.sin())
                })
                .collect(),
        ),
        MarkerShape::Cross => MarkerGeom::Strokes(vec![[(x - r, y), (x + r, y)], [(x, y - r), (x, y + r)]]),
        MarkerShape::X => MarkerGeom::Strokes(vec![
            [(x - r, y - r), (x + r, y + r)],
            [(x - r, y + r), (x + r, y - r)],
        ]),
    }
}

pub fn stroke(color: Rgba, width: f64) -> ShapeStyle {
    ShapeStyle {
        color: color.to_plotters(),
        filled: false,
        stroke_width: width.round().max(1.0) as u32,
    }
}

/// Draw one marker with fill, outline and alpha from the style.
pub fn draw_marker<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    center: Px,
    radius: f64,
    style: &ConcretePointStyle,
) -> Result<()> {
    let fill = style.fill_color.fade(style.alpha);
    let edge = style.line_color.fade(style.alpha);
    match marker_geom(style.shape, center, radius) {
        MarkerGeom::Circle(r) => {
            let r = r.round().max(1.0) as i32;
            area.draw(&Circle::new(to_i32(center), r, fill.to_plotters().filled()))
                .map_err(MapError::backend)?;
            if style.line_width > 0.0 && !edge.is_transparent() {
                area.draw(&Circle::new(to_i32(center), r, stroke(edge, style.line_width)))
                    .map_err(MapError::backend)?;
            }
        }
        MarkerGeom::Polygon(pts) => {
            let pts: Vec<(i32, i32)> = pts.into_iter().map(to_i32).collect();
            area.draw(&Polygon::new(pts.clone(), fill.to_plotters().filled()))
                .map_err(MapError::backend)?;
            if style.line_width > 0.0 && !edge.is_transparent() {
                let mut ring = pts;
                ring.push(ring[0]);
                area.draw(&PathElement::new(ring, stroke(edge, style.line_width)))
                    .map_err(MapError::backend)?;
            }
        }
        MarkerGeom::Strokes(segs) => {
            // stroked shapes take the fill color, like filled ones
            let s = stroke(fill, style.line_width.max(1.5));
            for [a, b] in segs {
                area.draw(&PathElement::new(vec![to_i32(a), to_i32(b)], s))
                    .map_err(MapError::backend)?;
            }
        }
    }
    Ok(())
}

/// Stroke a pixel polyline with a dash pattern scaled by the line width.
pub fn draw_path<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    points: &[Px],
    color: Rgba,
    width: f64,
    dash: LineDash,
) -> Result<()> {
    if points.len() < 2 || color.is_transparent() || width <= 0.0 {
        return Ok(());
    }
    let style = stroke(color, width);
    let pieces = match dash.pattern() {
        Some(p) => {
            let scaled: Vec<f64> = p.iter().map(|d| d * width.max(1.0)).collect();
            dash_pieces(points, &scaled)
        }
        None => vec![points.to_vec()],
    };
    for piece in pieces {
        let px: Vec<(i32, i32)> = piece.into_iter().map(to_i32).collect();
        area.draw(&PathElement::new(px, style))
            .map_err(MapError::backend)?;
    }
    Ok(())
}

/// Fill a pixel ring.
pub fn fill_ring<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    ring: &[Px],
    color: Rgba,
) -> Result<()> {
    if ring.len() < 3 || color.is_transparent() {
        return Ok(());
    }
    let px: Vec<(i32, i32)> = ring.iter().copied().map(to_i32).collect();
    area.draw(&Polygon::new(px, color.to_plotters().filled()))
        .map_err(MapError::backend)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn polyline_clipped_at_frame() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        let pieces = clip_polyline(&[(-5.0, 5.0), (5.0, 5.0), (15.0, 5.0)], &r);
        assert_eq!(pieces, vec![vec![(0.0, 5.0), (5.0, 5.0), (10.0, 5.0)]]);
        assert!(clip_polyline(&[(20.0, 0.0), (30.0, 5.0)], &r).is_empty());
    }

    #[test]
    fn ring_clipped_to_square() {
        let r = Rect::new(0.0, 0.0, 10.0, 10.0);
        let ring = clip_ring(&[(5.0, 5.0), (15.0, 5.0), (15.0, 15.0), (5.0, 15.0)], &r);
        assert!((signed_area(&ring).abs() - 25.0).abs() < 1e-9);
    }

    #[test]
    fn dashes_alternate() {
        let pieces = dash_pieces(&[(0.0, 0.0), (10.0, 0.0)], &[2.0, 3.0]);
        assert_eq!(pieces.len(), 2);
        assert_eq!(pieces[0], vec![(0.0, 0.0), (2.0, 0.0)]);
        assert_eq!(pieces[1], vec![(5.0, 0.0), (7.0, 0.0)]);
    }

    #[test]
    fn keyhole_winds_hole_backwards() {
        let ext = [(0.0, 0.0), (10.0, 0.0), (10.0, 10.0), (0.0, 10.0)];
        let hole = vec![(2.0, 2.0), (4.0, 2.0), (4.0, 4.0), (2.0, 4.0)];
        let ring = keyhole(&ext, &[hole]);
        assert!((signed_area(&ring) - 96.0).abs() < 1e-9);
    }

    #[test]
    fn symbols_every_interval() {
        let s = sample_along(&[(0.0, 0.0), (100.0, 0.0)], 25.0);
        let xs: Vec<f64> = s.iter().map(|(p, _)| p.0).collect();
        assert_eq!(xs, vec![12.5, 37.5, 62.5, 87.5]);
    }
}
