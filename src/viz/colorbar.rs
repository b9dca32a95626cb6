//! Colorbar drawing.
//!
//! Boundary norms are drawn with equal-width slots per bin, so ticks sit on the slot edges
//! (or centers, for individual-value classes) regardless of the bin widths.

use plotters::backend::DrawingBackend;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontFamily;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::text::max_line_width_px;
use super::types::Orientation;
use crate::colormap::Norm;
use crate::error::{MapError, Result};
use crate::legend::ColorbarSpec;

const PAD: i32 = 6;
const TICK_LEN: i32 = 4;
/// Room at the bar ends for centered tick labels.
const END_PAD: i32 = 24;

/// Position `0..=1` along the bar of a data value.
pub fn value_to_fraction(norm: &Norm, v: f64) -> f64 {
    match norm {
        Norm::Boundary { boundaries } => {
            let n = (boundaries.len() - 1) as f64;
            if v <= boundaries[0] {
                return 0.0;
            }
            for (j, w) in boundaries.windows(2).enumerate() {
                if v <= w[1] {
                    return (j as f64 + (v - w[0]) / (w[1] - w[0])) / n;
                }
            }
            1.0
        }
        other => other.normalize(v).clamp(0.0, 1.0),
    }
}

/// Data value at a position `0..=1` along the bar.
pub fn fraction_to_value(norm: &Norm, t: f64) -> f64 {
    match norm {
        Norm::Boundary { boundaries } => {
            let n = boundaries.len() - 1;
            let x = t.clamp(0.0, 1.0) * n as f64;
            let j = (x.floor() as usize).min(n - 1);
            boundaries[j] + (x - j as f64) * (boundaries[j + 1] - boundaries[j])
        }
        other => other.inverse(t),
    }
}

fn font_px(spec: &ColorbarSpec) -> u32 {
    spec.style.font_size.round().max(6.0) as u32
}

fn label_h(spec: &ColorbarSpec) -> i32 {
    if spec.style.label.is_some() {
        font_px(spec) as i32 + 4
    } else {
        0
    }
}

/// Pixels the colorbar needs across its orientation (height if horizontal, width if vertical).
pub fn colorbar_extent_px(spec: &ColorbarSpec) -> i32 {
    let thickness = spec.style.thickness_px.round().max(4.0) as i32;
    let font = font_px(spec) as i32;
    match spec.style.orientation {
        Orientation::Horizontal => PAD + label_h(spec) + thickness + TICK_LEN + 2 + font + PAD,
        Orientation::Vertical => {
            let labels = max_line_width_px(&spec.tick_labels, font_px(spec)) as i32;
            PAD + thickness + TICK_LEN + 2 + labels + PAD
        }
    }
}

/// Draw the colorbar filling `area`.
pub fn draw_colorbar<DB: DrawingBackend>(area: &DrawingArea<DB, Shift>, spec: &ColorbarSpec) -> Result<()> {
    let (w_u32, h_u32) = area.dim_in_pixel();
    let (w, h) = (w_u32 as i32, h_u32 as i32);
    let thickness = spec.style.thickness_px.round().max(4.0) as i32;
    let font = font_px(spec);
    let norm = &spec.mappable.norm;
    let color_at = |t: f64| spec.mappable.to_rgba(fraction_to_value(norm, t));

    if let Some(label) = &spec.style.label {
        let style = TextStyle::from((FontFamily::SansSerif, font)).pos(Pos::new(HPos::Center, VPos::Top));
        area.draw(&Text::new(label.as_str(), (w / 2, PAD), style))
            .map_err(MapError::backend)?;
    }

    let horizontal = spec.style.orientation == Orientation::Horizontal;
    let (x0, y0, x1, y1) = if horizontal {
        let y0 = PAD + label_h(spec);
        (END_PAD, y0, (w - END_PAD).max(END_PAD + 1), y0 + thickness)
    } else {
        let y0 = PAD + label_h(spec) + font as i32 / 2;
        (PAD, y0, PAD + thickness, (h - PAD - font as i32 / 2).max(y0 + 1))
    };
    let len = if horizontal { x1 - x0 } else { y1 - y0 };

    // one rectangle per run of equal colors
    let mut run_start = 0;
    let mut run_color = color_at(0.5 / len as f64);
    for i in 1..=len {
        let c = if i < len {
            Some(color_at((i as f64 + 0.5) / len as f64))
        } else {
            None
        };
        if c != Some(run_color) {
            let rect = if horizontal {
                [(x0 + run_start, y0), (x0 + i, y1)]
            } else {
                [(x0, y1 - i), (x1, y1 - run_start)]
            };
            area.draw(&Rectangle::new(rect, run_color.to_plotters().filled()))
                .map_err(MapError::backend)?;
            if let Some(c) = c {
                run_color = c;
                run_start = i;
            }
        }
    }
    area.draw(&Rectangle::new([(x0, y0), (x1, y1)], BLACK.stroke_width(1)))
        .map_err(MapError::backend)?;

    let tick_style = ShapeStyle {
        color: BLACK.to_rgba(),
        filled: false,
        stroke_width: 1,
    };
    for (tick, label) in spec.ticks.iter().zip(&spec.tick_labels) {
        let f = value_to_fraction(norm, *tick);
        if horizontal {
            let x = x0 + (f * len as f64).round() as i32;
            area.draw(&PathElement::new(vec![(x, y1), (x, y1 + TICK_LEN)], tick_style))
                .map_err(MapError::backend)?;
            let style = TextStyle::from((FontFamily::SansSerif, font)).pos(Pos::new(HPos::Center, VPos::Top));
            area.draw(&Text::new(label.as_str(), (x, y1 + TICK_LEN + 2), style))
                .map_err(MapError::backend)?;
        } else {
            let y = y1 - (f * len as f64).round() as i32;
            area.draw(&PathElement::new(vec![(x1, y), (x1 + TICK_LEN, y)], tick_style))
                .map_err(MapError::backend)?;
            let style = TextStyle::from((FontFamily::SansSerif, font)).pos(Pos::new(HPos::Left, VPos::Center));
            area.draw(&Text::new(label.as_str(), (x1 + TICK_LEN + 2, y), style))
                .map_err(MapError::backend)?;
        }
    }
    Ok(())
}
