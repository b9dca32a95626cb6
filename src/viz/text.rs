//! Text measurement, truncation, and wrapping for legend and colorbar labels.

/// Heuristic: estimate pixel width of text (Plotters has no built-in text measuring).
/// Average glyph advance is 0.6 em.
pub fn estimate_text_width_px(text: &str, font_px: u32) -> u32 {
    (text.chars().count() as u32 * font_px * 3).div_ceil(5)
}

/// Widest of several lines.
pub fn max_line_width_px<S: AsRef<str>>(lines: &[S], font_px: u32) -> u32 {
    lines
        .iter()
        .map(|l| estimate_text_width_px(l.as_ref(), font_px))
        .max()
        .unwrap_or(0)
}

/// Truncate to fit `max_px` and add a single ellipsis if needed.
pub fn truncate_to_width(text: &str, font_px: u32, max_px: u32) -> String {
    let mut out = String::new();
    for ch in text.chars() {
        out.push(ch);
        if estimate_text_width_px(&out, font_px) > max_px {
            out.pop();
            if out.is_empty() {
                return out;
            }
            out.push('…');
            if estimate_text_width_px(&out, font_px) > max_px {
                out.pop();
                out.pop();
                out.push('…');
            }
            return out;
        }
    }
    out
}

/// Wrap text to fit within a maximum pixel width, breaking on word boundaries where possible.
pub fn wrap_text_to_width(text: &str, font_px: u32, max_px: u32) -> Vec<String> {
    if max_px <= 12 {
        return vec![truncate_to_width(text, font_px, max_px)];
    }
    let mut lines: Vec<String> = Vec::new();
    let mut cur = String::new();
    for word in text.split_whitespace() {
        let candidate = if cur.is_empty() {
            word.to_string()
        } else {
            format!("{cur} {word}")
        };
        if estimate_text_width_px(&candidate, font_px) <= max_px {
            cur = candidate;
            continue;
        }
        if !cur.is_empty() {
            lines.push(std::mem::take(&mut cur));
        }
        if estimate_text_width_px(word, font_px) <= max_px {
            cur = word.to_string();
        } else {
            // hard-break a single long word by characters
            let mut buf = String::new();
            for ch in word.chars() {
                buf.push(ch);
                if estimate_text_width_px(&buf, font_px) > max_px {
                    buf.pop();
                    lines.push(std::mem::replace(&mut buf, ch.to_string()));
                }
            }
            cur = buf;
        }
    }
    if !cur.is_empty() {
        lines.push(cur);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
