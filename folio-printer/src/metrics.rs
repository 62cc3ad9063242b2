//! Text metrics for the built-in Helvetica faces
//!
//! PDF base-14 fonts carry no embedded metrics, so layout measures strings
//! with the standard AFM advance widths (1/1000 em). Characters outside
//! printable ASCII use the average lowercase width.
//!
//! This module provides:
//! - Measuring string widths in points
//! - Truncating strings to a width (with ellipsis)
//! - Greedy word wrapping to a column width

const FIRST: u32 = 32;

/// Helvetica advance widths for U+0020..=U+007E
const REGULAR: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // sp - /
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0 - 9
    278, 278, 584, 584, 584, 556, 1015, // : - @
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, // A - M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N - Z
    278, 278, 278, 469, 556, 333, // [ - `
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, // a - m
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, // n - z
    334, 260, 334, 584, // { - ~
];

/// Helvetica-Bold advance widths for U+0020..=U+007E
const BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, // sp - /
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, // 0 - 9
    333, 333, 584, 584, 584, 611, 975, // : - @
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, // A - M
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, // N - Z
    333, 278, 333, 584, 556, 333, // [ - `
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, // a - m
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, // n - z
    389, 280, 389, 584, // { - ~
];

const FALLBACK: u16 = 556;
const ELLIPSIS: &str = "...";

/// Line box height for a font size
pub fn line_height(size: f32) -> f32 {
    size * 1.25
}

fn char_units(c: char, bold: bool) -> u16 {
    let code = c as u32;
    if (FIRST..FIRST + 95).contains(&code) {
        let idx = (code - FIRST) as usize;
        if bold { BOLD[idx] } else { REGULAR[idx] }
    } else {
        FALLBACK
    }
}

/// Width of a string in points
pub fn text_width(s: &str, size: f32, bold: bool) -> f32 {
    let units: u32 = s.chars().map(|c| char_units(c, bold) as u32).sum();
    units as f32 * size / 1000.0
}

/// Truncate a string to fit within `max_width` points, appending "..." when
/// anything was cut
pub fn truncate_to_width(s: &str, max_width: f32, size: f32, bold: bool) -> String {
    if text_width(s, size, bold) <= max_width {
        return s.to_string();
    }
    let budget = max_width - text_width(ELLIPSIS, size, bold);
    let mut width = 0.0;
    let mut result = String::new();
    for c in s.chars() {
        let w = char_units(c, bold) as f32 * size / 1000.0;
        if width + w > budget {
            break;
        }
        result.push(c);
        width += w;
    }
    result.truncate(result.trim_end().len());
    result.push_str(ELLIPSIS);
    result
}

/// Greedy word wrap
///
/// Explicit newlines start a new line. Words wider than the column are
/// broken between characters. Always returns at least one (possibly empty)
/// line.
pub fn wrap_text(s: &str, max_width: f32, size: f32, bold: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in s.split('\n') {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if text_width(&candidate, size, bold) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if text_width(word, size, bold) <= max_width {
                current = word.to_string();
            } else {
                // Hard-break an oversized word
                for c in word.chars() {
                    let mut next = current.clone();
                    next.push(c);
                    if !current.is_empty() && text_width(&next, size, bold) > max_width {
                        lines.push(std::mem::replace(&mut current, c.to_string()));
                    } else {
                        current = next;
                    }
                }
            }
        }
        lines.push(current);
    }
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}
