//! Legend layout and drawing: one boxed block per legend group.
//!
//! `Right` and `Inside` legends are a single column; `Top`/`Bottom` bands flow entries
//! into table-like rows. Size estimation and drawing share [`flow_rows`], so a reserved
//! band always fits what gets drawn.

use plotters::backend::DrawingBackend;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::FontFamily;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::shapes::{draw_marker, draw_path, fill_ring};
use super::text::{estimate_text_width_px, max_line_width_px, wrap_text_to_width};
use super::types::LegendMode;
use crate::error::{MapError, Result};
use crate::legend::{LegendGroup, LegendHandle};
use crate::style::LegendStyle;

// Layout constants shared by estimation and drawing
const ROW_GAP: i32 = 4;
const PAD_SMALL: i32 = 6;
const PAD_BAND: i32 = 8;
const GLYPH_W: i32 = 20;
const GLYPH_TO_TEXT_GAP: i32 = 8;
const TRAILING_GAP: i32 = 12;
const MIN_TEXT_CAP: i32 = 40;

fn font_px(style: &LegendStyle) -> u32 {
    style.font_size.round().max(6.0) as u32
}

fn title_font_px(style: &LegendStyle) -> u32 {
    style.title_font_size.round().max(6.0) as u32
}

fn line_h(style: &LegendStyle) -> i32 {
    font_px(style) as i32 + 2
}

fn title_h(group: &LegendGroup, style: &LegendStyle) -> i32 {
    match group.title.as_deref().map(str::trim) {
        Some(t) if !t.is_empty() => title_font_px(style) as i32 + 8,
        _ => 0,
    }
}

fn block_overhead() -> i32 {
    GLYPH_W + GLYPH_TO_TEXT_GAP + TRAILING_GAP
}

/// Row membership and column geometry of a flowed legend band.
#[derive(Debug, Clone, PartialEq)]
pub struct FlowLayout {
    /// Entry indices per row.
    pub rows: Vec<Vec<usize>>,
    /// Left edge of every column's glyph.
    pub col_x: Vec<i32>,
    /// Text width available in every column.
    pub text_caps: Vec<i32>,
}

/// Greedily pack labels into rows, then size columns from the longest single-line label
/// per column; when those widths do not fit, fall back to uniform columns and wrap.
pub fn flow_rows(labels: &[&str], font_px: u32, start_x: i32, total_w: i32) -> FlowLayout {
    let usable_row_w = total_w - PAD_SMALL;
    let per_item_cap_px: i32 = (((usable_row_w - start_x) as f32) * 0.35).max(140.0) as i32;
    let block_width_for_cap = |label: &str, cap_px: i32| -> i32 {
        let lines = wrap_text_to_width(label, font_px, cap_px.max(MIN_TEXT_CAP) as u32);
        block_overhead() + max_line_width_px(&lines, font_px) as i32
    };

    let mut rows: Vec<Vec<usize>> = Vec::new();
    let mut cur: Vec<usize> = Vec::new();
    let mut x = start_x;
    for (i, label) in labels.iter().enumerate() {
        let remaining = (usable_row_w - x).max(MIN_TEXT_CAP);
        let mut block_w = block_width_for_cap(label, (remaining - block_overhead()).min(per_item_cap_px));
        if x + block_w > usable_row_w && !cur.is_empty() {
            rows.push(std::mem::take(&mut cur));
            x = start_x;
            let fresh = ((usable_row_w - start_x) - block_overhead()).min(per_item_cap_px);
            block_w = block_width_for_cap(label, fresh);
        }
        x += block_w;
        cur.push(i);
    }
    if !cur.is_empty() {
        rows.push(cur);
    }

    let k_cols = rows.iter().map(Vec::len).max().unwrap_or(1);
    let mut col_block_w: Vec<i32> = vec![60; k_cols];
    for row in &rows {
        for (ci, &i) in row.iter().enumerate() {
            let w = block_overhead() + estimate_text_width_px(labels[i], font_px) as i32;
            col_block_w[ci] = col_block_w[ci].max(w);
        }
    }
    let slot_w: Vec<i32> = if start_x + col_block_w.iter().sum::<i32>() <= usable_row_w {
        col_block_w
    } else {
        vec![((usable_row_w - start_x) / k_cols as i32).max(60); k_cols]
    };
    let mut col_x = Vec::with_capacity(k_cols);
    let mut acc = start_x;
    for sw in &slot_w {
        col_x.push(acc);
        acc += sw;
    }
    let text_caps = slot_w
        .iter()
        .map(|sw| (sw - block_overhead()).max(MIN_TEXT_CAP))
        .collect();
    FlowLayout {
        rows,
        col_x,
        text_caps,
    }
}

/// Width a single-column legend needs for all groups, capped at `max_w`.
pub fn estimate_column_width_px(groups: &[LegendGroup], style: &LegendStyle, max_w: i32) -> i32 {
    let font = font_px(style);
    let widest_label = groups
        .iter()
        .flat_map(|g| g.entries.iter())
        .map(|e| estimate_text_width_px(&e.label, font) as i32)
        .max()
        .unwrap_or(0);
    let widest_title = groups
        .iter()
        .filter_map(|g| g.title.as_deref())
        .map(|t| estimate_text_width_px(t, title_font_px(style)) as i32)
        .max()
        .unwrap_or(0);
    let content = (PAD_SMALL + block_overhead() + widest_label).max(2 * PAD_SMALL + widest_title);
    content.min(max_w).max(80)
}

/// Height of one group box laid out in `width` pixels.
pub fn estimate_group_height_px(
    group: &LegendGroup,
    style: &LegendStyle,
    mode: LegendMode,
    width: i32,
) -> i32 {
    let font = font_px(style);
    let lh = line_h(style);
    let mut height = PAD_BAND + title_h(group, style);
    match mode {
        LegendMode::Top | LegendMode::Bottom => {
            let labels: Vec<&str> = group.entries.iter().map(|e| e.label.as_str()).collect();
            let flow = flow_rows(&labels, font, PAD_SMALL, width);
            for (ri, row) in flow.rows.iter().enumerate() {
                let row_h = row
                    .iter()
                    .enumerate()
                    .map(|(ci, &i)| {
                        wrap_text_to_width(labels[i], font, flow.text_caps[ci] as u32).len() as i32 * lh
                    })
                    .max()
                    .unwrap_or(lh)
                    .max(lh);
                height += row_h;
                if ri + 1 < flow.rows.len() {
                    height += ROW_GAP;
                }
            }
        }
        LegendMode::Right | LegendMode::Inside => {
            let cap = (width - PAD_SMALL * 2 - block_overhead()).max(MIN_TEXT_CAP) as u32;
            for e in &group.entries {
                let lines = wrap_text_to_width(&e.label, font, cap);
                height += lines.len().max(1) as i32 * lh + ROW_GAP;
            }
        }
    }
    height + PAD_BAND
}

fn label_style(style: &LegendStyle) -> TextStyle<'static> {
    TextStyle::from((FontFamily::SansSerif, font_px(style))).pos(Pos::new(HPos::Left, VPos::Center))
}

/// Draw one group box covering the whole `area`.
pub fn draw_legend_group<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    group: &LegendGroup,
    style: &LegendStyle,
    mode: LegendMode,
) -> Result<()> {
    let (w_u32, h_u32) = area.dim_in_pixel();
    let (w, h) = (w_u32 as i32, h_u32 as i32);
    if !style.background.is_transparent() {
        area.fill(&style.background.to_plotters())
            .map_err(MapError::backend)?;
    }
    if let Some(frame) = style.frame_color {
        area.draw(&Rectangle::new(
            [(0, 0), (w - 1, h - 1)],
            frame.to_plotters().stroke_width(1),
        ))
        .map_err(MapError::backend)?;
    }

    let font = font_px(style);
    let lh = line_h(style);
    let mut y = PAD_BAND;
    if let Some(title) = group.title.as_deref().filter(|t| !t.trim().is_empty()) {
        let title_style = TextStyle::from((FontFamily::SansSerif, title_font_px(style)))
            .pos(Pos::new(HPos::Left, VPos::Top));
        area.draw(&Text::new(title, (PAD_SMALL, y), title_style))
            .map_err(MapError::backend)?;
        y += title_h(group, style);
    }
    let text_style = label_style(style);

    match mode {
        LegendMode::Right | LegendMode::Inside => {
            let text_x = PAD_SMALL + GLYPH_W + GLYPH_TO_TEXT_GAP;
            let cap = (w - PAD_SMALL * 2 - block_overhead()).max(MIN_TEXT_CAP) as u32;
            for entry in &group.entries {
                let lines = wrap_text_to_width(&entry.label, font, cap);
                let block_h = lines.len().max(1) as i32 * lh;
                draw_handle(area, &entry.handle, (PAD_SMALL, y + block_h / 2))?;
                for (i, line) in lines.iter().enumerate() {
                    area.draw(&Text::new(
                        line.as_str(),
                        (text_x, y + i as i32 * lh + lh / 2),
                        text_style.clone(),
                    ))
                    .map_err(MapError::backend)?;
                }
                y += block_h + ROW_GAP;
            }
        }
        LegendMode::Top | LegendMode::Bottom => {
            let labels: Vec<&str> = group.entries.iter().map(|e| e.label.as_str()).collect();
            let flow = flow_rows(&labels, font, PAD_SMALL, w);
            for row in &flow.rows {
                let blocks: Vec<Vec<String>> = row
                    .iter()
                    .enumerate()
                    .map(|(ci, &i)| wrap_text_to_width(labels[i], font, flow.text_caps[ci] as u32))
                    .collect();
                let row_h = blocks
                    .iter()
                    .map(|l| l.len().max(1) as i32 * lh)
                    .max()
                    .unwrap_or(lh);
                let y_center = y + row_h / 2;
                for (ci, &i) in row.iter().enumerate() {
                    let x = flow.col_x[ci];
                    draw_handle(area, &group.entries[i].handle, (x, y_center))?;
                    let lines = &blocks[ci];
                    let top = y_center - lines.len().max(1) as i32 * lh / 2;
                    for (li, line) in lines.iter().enumerate() {
                        area.draw(&Text::new(
                            line.as_str(),
                            (x + GLYPH_W + GLYPH_TO_TEXT_GAP, top + li as i32 * lh + lh / 2),
                            text_style.clone(),
                        ))
                        .map_err(MapError::backend)?;
                    }
                }
                y += row_h + ROW_GAP;
            }
        }
    }
    Ok(())
}

/// Draw a legend glyph whose left edge is at `left.0`, vertically centered on `left.1`.
pub fn draw_handle<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    handle: &LegendHandle,
    left: (i32, i32),
) -> Result<()> {
    let (x, y) = (left.0 as f64, left.1 as f64);
    let cx = x + GLYPH_W as f64 / 2.0;
    match handle {
        LegendHandle::Marker(s) => {
            let r = (s.size / 2.0).clamp(2.0, 7.0);
            draw_marker(area, (cx, y), r, s)?;
        }
        LegendHandle::Line(s) => {
            draw_path(
                area,
                &[(x, y), (x + GLYPH_W as f64, y)],
                s.line_color.fade(s.alpha),
                s.line_width.clamp(1.0, 4.0),
                s.line_pattern,
            )?;
        }
        LegendHandle::Patch(p) => {
            let ring = [(x + 2.0, y - 6.0), (x + 18.0, y - 6.0), (x + 18.0, y + 6.0), (x + 2.0, y + 6.0)];
            fill_ring(area, &ring, p.fill_color.fade(p.alpha))?;
            if p.line_width > 0.0 {
                let mut closed = ring.to_vec();
                closed.push(ring[0]);
                draw_path(area, &closed, p.line_color.fade(p.alpha), p.line_width.min(2.0), p.line_pattern)?;
            }
        }
        LegendHandle::Beachball(f) => {
            let r = 7.0;
            let circle = |from: f64, to: f64| -> Vec<(f64, f64)> {
                let mut pts = vec![(cx, y)];
                pts.extend((0..=8).map(|i| {
                    let a = from + (to - from) * i as f64 / 8.0;
                    (cx + r * a.cos(), y - r * a.sin())
                }));
                pts
            };
            use std::f64::consts::{FRAC_PI_2, PI, TAU};
            fill_ring(area, &circle(0.0, TAU)[1..], f.bg_color.fade(f.alpha))?;
            // pure strike-slip glyph: NE and SW quadrants compressional
            fill_ring(area, &circle(0.0, FRAC_PI_2), f.fill_color.fade(f.alpha))?;
            fill_ring(area, &circle(PI, PI + FRAC_PI_2), f.fill_color.fade(f.alpha))?;
            let outline = circle(0.0, TAU)[1..].to_vec();
            draw_path(area, &outline, f.line_color.fade(f.alpha), f.line_width.min(2.0), Default::default())?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::legend::LegendEntry;
    use crate::style::ConcreteLineStyle;

    fn group(labels: &[&str]) -> LegendGroup {
        LegendGroup {
            name: "main".into(),
            title: None,
            entries: labels
                .iter()
                .map(|l| LegendEntry {
                    handle: LegendHandle::Line(ConcreteLineStyle::default()),
                    label: l.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn short_labels_share_one_row() {
        let flow = flow_rows(&["a", "b", "c"], 14, 6, 800);
        assert_eq!(flow.rows, vec![vec![0, 1, 2]]);
        assert!(flow.col_x.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn narrow_band_wraps_rows() {
        let labels = ["first label", "second label", "third label", "fourth label"];
        let flow = flow_rows(&labels, 14, 6, 300);
        assert!(flow.rows.len() > 1);
        assert_eq!(flow.rows.iter().map(Vec::len).sum::<usize>(), 4);
    }

    #[test]
    fn column_height_grows_with_entries() {
        let style = LegendStyle::default();
        let h1 = estimate_group_height_px(&group(&["a"]), &style, LegendMode::Right, 200);
        let h3 = estimate_group_height_px(&group(&["a", "b", "c"]), &style, LegendMode::Right, 200);
        assert_eq!(h3 - h1, 2 * (line_h(&style) + ROW_GAP));
    }
}
