//! Block builder
//!
//! A document is a vertical stack of blocks. Each block is laid out once at
//! the page body width and records:
//! - its height
//! - the offsets where it may be cut across pages (`breaks`)
//! - the draw operations, positioned relative to the block's top-left corner
//!
//! Item rows are built with [`BlockBuilder::build_row`] and carry no break
//! points, so the paginator always moves them as a unit.

use std::sync::Arc;

use crate::metrics::{line_height, text_width, truncate_to_width, wrap_text};

/// RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const DARK_GRAY: Color = Color::rgb(51, 65, 85);
    pub const GRAY: Color = Color::rgb(100, 116, 139);
    pub const LIGHT_GRAY: Color = Color::rgb(203, 213, 225);
    pub const ROW_SHADE: Color = Color::rgb(248, 250, 252);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse `#rrggbb` (or `#rgb`)
    pub fn from_hex(hex: &str) -> Option<Color> {
        let digits = hex.trim().strip_prefix('#')?;
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => return None,
        };
        let channel = |i: usize| u8::from_str_radix(expanded.get(i..i + 2)?, 16).ok();
        Some(Color::rgb(channel(0)?, channel(2)?, channel(4)?))
    }
}

/// Horizontal alignment within a box
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    Right,
}

/// Decoded raster image (8-bit RGB, row-major)
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

/// Single drawing primitive. `y` is measured downward from the block top.
#[derive(Debug, Clone)]
pub enum DrawOp {
    /// Text line; `y` is the top of its line box
    Text {
        x: f32,
        y: f32,
        size: f32,
        bold: bool,
        color: Color,
        text: String,
    },
    /// Horizontal rule
    Rule {
        x1: f32,
        x2: f32,
        y: f32,
        thickness: f32,
        color: Color,
    },
    /// Solid rectangle
    Fill {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        color: Color,
    },
    Image {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        image: Arc<ImageData>,
    },
}

impl DrawOp {
    /// Top edge, used to decide which page slice owns the operation
    pub fn top(&self) -> f32 {
        match self {
            DrawOp::Text { y, .. }
            | DrawOp::Fill { y, .. }
            | DrawOp::Image { y, .. } => *y,
            DrawOp::Rule { y, thickness, .. } => y - thickness / 2.0,
        }
    }
}

/// Role of a block during pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockKind {
    /// Free-flowing content, cut only at its break points
    #[default]
    Flow,
    /// Table column head; repeated on continuation pages
    TableHead,
    /// Table row; never split
    Row,
}

#[derive(Debug, Clone, Default)]
pub struct Block {
    pub kind: BlockKind,
    pub height: f32,
    /// Allowed cut offsets, strictly increasing, each in `(0, height]`
    pub breaks: Vec<f32>,
    pub ops: Vec<DrawOp>,
}

impl Block {
    /// Fixed vertical space with nothing drawn
    pub fn spacer(height: f32) -> Self {
        Self {
            kind: BlockKind::Flow,
            height,
            breaks: Vec::new(),
            ops: Vec::new(),
        }
    }

    pub fn is_atomic(&self) -> bool {
        self.kind == BlockKind::Row || self.breaks.is_empty()
    }
}

/// One cell of a table row
#[derive(Debug, Clone)]
pub struct Cell<'a> {
    pub text: &'a str,
    pub x: f32,
    pub width: f32,
    pub align: Align,
    pub bold: bool,
    /// Wrap into at most this many lines (last one truncated); `None`
    /// keeps the text on a single truncated line
    pub max_lines: Option<usize>,
}

impl<'a> Cell<'a> {
    pub fn new(text: &'a str, x: f32, width: f32) -> Self {
        Self {
            text,
            x,
            width,
            align: Align::Left,
            bold: false,
            max_lines: None,
        }
    }

    pub fn right(mut self) -> Self {
        self.align = Align::Right;
        self
    }

    pub fn center(mut self) -> Self {
        self.align = Align::Center;
        self
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn wrap(mut self, max_lines: usize) -> Self {
        self.max_lines = Some(max_lines.max(1));
        self
    }
}

/// Fluent block builder
///
/// Works like a cursor over a fixed-width column: every call that emits a
/// line advances the cursor and records a break point after the line.
pub struct BlockBuilder {
    width: f32,
    cursor: f32,
    size: f32,
    bold: bool,
    color: Color,
    align: Align,
    breaks: Vec<f32>,
    ops: Vec<DrawOp>,
}

impl BlockBuilder {
    /// Create a new builder for a column `width` points wide
    pub fn new(width: f32) -> Self {
        Self {
            width,
            cursor: 0.0,
            size: 10.0,
            bold: false,
            color: Color::BLACK,
            align: Align::Left,
            breaks: Vec::new(),
            ops: Vec::new(),
        }
    }

    /// Get the configured column width
    pub fn width(&self) -> f32 {
        self.width
    }

    /// Current cursor position (height consumed so far)
    pub fn cursor(&self) -> f32 {
        self.cursor
    }

    // === Text Style ===

    pub fn size(&mut self, size: f32) -> &mut Self {
        self.size = size;
        self
    }

    pub fn bold(&mut self) -> &mut Self {
        self.bold = true;
        self
    }

    pub fn bold_off(&mut self) -> &mut Self {
        self.bold = false;
        self
    }

    pub fn color(&mut self, color: Color) -> &mut Self {
        self.color = color;
        self
    }

    pub fn left(&mut self) -> &mut Self {
        self.align = Align::Left;
        self
    }

    pub fn center(&mut self) -> &mut Self {
        self.align = Align::Center;
        self
    }

    pub fn right(&mut self) -> &mut Self {
        self.align = Align::Right;
        self
    }

    // === Text Output ===

    /// Write one line, truncated to the column width
    pub fn line(&mut self, s: &str) -> &mut Self {
        let text = truncate_to_width(s, self.width, self.size, self.bold);
        let x = self.aligned_x(&text, 0.0, self.width, self.align);
        self.push_text(x, self.cursor, text);
        self.advance(line_height(self.size))
    }

    /// Write text wrapped to the column width, one break point per line
    pub fn wrapped(&mut self, s: &str) -> &mut Self {
        for text in wrap_text(s, self.width, self.size, self.bold) {
            let x = self.aligned_x(&text, 0.0, self.width, self.align);
            self.push_text(x, self.cursor, text);
            self.advance(line_height(self.size));
        }
        self
    }

    /// Left and right text on the same line
    pub fn line_lr(&mut self, left: &str, right: &str) -> &mut Self {
        let right_w = text_width(right, self.size, self.bold);
        let left_text = truncate_to_width(left, (self.width - right_w - 6.0).max(0.0), self.size, self.bold);
        self.push_text(0.0, self.cursor, left_text);
        self.push_text(self.width - right_w, self.cursor, right.to_string());
        self.advance(line_height(self.size))
    }

    /// Two-column label/value line inside `[x, x + width]`, value
    /// right-aligned
    pub fn pair_at(&mut self, x: f32, width: f32, label: &str, value: &str) -> &mut Self {
        let value_w = text_width(value, self.size, self.bold);
        self.push_text(x, self.cursor, label.to_string());
        self.push_text(x + width - value_w, self.cursor, value.to_string());
        self.advance(line_height(self.size))
    }

    /// Text placed at an absolute position without moving the cursor
    pub fn text_at(&mut self, x: f32, y: f32, width: f32, s: &str) -> &mut Self {
        let text = truncate_to_width(s, width, self.size, self.bold);
        let x = self.aligned_x(&text, x, width, self.align);
        self.push_text(x, y, text);
        self
    }

    // === Separators and Shapes ===

    /// Vertical gap
    pub fn gap(&mut self, height: f32) -> &mut Self {
        self.advance(height)
    }

    /// Full-width rule at the cursor, then advance by `space`
    pub fn rule(&mut self, thickness: f32, color: Color, space: f32) -> &mut Self {
        self.ops.push(DrawOp::Rule {
            x1: 0.0,
            x2: self.width,
            y: self.cursor + space / 2.0,
            thickness,
            color,
        });
        self.advance(space)
    }

    /// Rule between two x positions at an absolute y
    pub fn rule_at(&mut self, x1: f32, x2: f32, y: f32, thickness: f32, color: Color) -> &mut Self {
        self.ops.push(DrawOp::Rule {
            x1,
            x2,
            y,
            thickness,
            color,
        });
        self
    }

    /// Solid band at the cursor; does not advance
    pub fn fill(&mut self, height: f32, color: Color) -> &mut Self {
        self.ops.push(DrawOp::Fill {
            x: 0.0,
            y: self.cursor,
            width: self.width,
            height,
            color,
        });
        self
    }

    /// Image scaled to fit `max_w` x `max_h`, placed at an absolute position
    pub fn image_at(&mut self, image: Arc<ImageData>, x: f32, y: f32, max_w: f32, max_h: f32) -> &mut Self {
        let (width, height) = fit_within(image.width, image.height, max_w, max_h);
        self.ops.push(DrawOp::Image {
            x,
            y,
            width,
            height,
            image,
        });
        self
    }

    /// Image at the cursor, honoring the current alignment, then advance
    pub fn image(&mut self, image: Arc<ImageData>, max_w: f32, max_h: f32) -> &mut Self {
        let (width, height) = fit_within(image.width, image.height, max_w, max_h);
        let x = match self.align {
            Align::Left => 0.0,
            Align::Center => (self.width - width) / 2.0,
            Align::Right => self.width - width,
        };
        let y = self.cursor;
        self.ops.push(DrawOp::Image {
            x,
            y,
            width,
            height,
            image,
        });
        self.advance(height)
    }

    // === Table Rows ===

    /// Emit one table row: every cell wrapped to its own column, row height
    /// from the tallest cell plus vertical padding. Returns the row height.
    pub fn cells(&mut self, cells: &[Cell<'_>], padding: f32, shade: Option<Color>) -> f32 {
        let lh = line_height(self.size);
        let laid_out: Vec<Vec<String>> = cells
            .iter()
            .map(|cell| match cell.max_lines {
                Some(max) => {
                    let mut lines = wrap_text(cell.text, cell.width, self.size, cell.bold);
                    if lines.len() > max {
                        let rest = lines.split_off(max - 1).join(" ");
                        lines.push(truncate_to_width(&rest, cell.width, self.size, cell.bold));
                    }
                    lines
                }
                None => vec![truncate_to_width(cell.text, cell.width, self.size, cell.bold)],
            })
            .collect();
        let rows = laid_out.iter().map(Vec::len).max().unwrap_or(1).max(1);
        let height = rows as f32 * lh + padding * 2.0;
        if let Some(color) = shade {
            self.fill(height, color);
        }
        let top = self.cursor + padding;
        for (cell, lines) in cells.iter().zip(laid_out) {
            for (i, text) in lines.into_iter().enumerate() {
                let x = self.aligned_x_styled(&text, cell.x, cell.width, cell.align, cell.bold);
                self.ops.push(DrawOp::Text {
                    x,
                    y: top + i as f32 * lh,
                    size: self.size,
                    bold: cell.bold,
                    color: self.color,
                    text,
                });
            }
        }
        self.advance(height);
        height
    }

    // === Build ===

    /// Build a flow block that may be cut at any recorded line boundary
    pub fn build(self) -> Block {
        self.finish(BlockKind::Flow, true)
    }

    /// Build a block that must stay on one page
    pub fn build_atomic(self) -> Block {
        self.finish(BlockKind::Flow, false)
    }

    /// Build a table head block
    pub fn build_table_head(self) -> Block {
        self.finish(BlockKind::TableHead, false)
    }

    /// Build an item row block
    pub fn build_row(self) -> Block {
        self.finish(BlockKind::Row, false)
    }

    fn finish(self, kind: BlockKind, breakable: bool) -> Block {
        let height = self.cursor;
        let breaks = if breakable {
            let mut breaks: Vec<f32> = self.breaks.into_iter().filter(|b| *b > 0.0 && *b <= height).collect();
            breaks.dedup_by(|a, b| (*a - *b).abs() < f32::EPSILON);
            breaks
        } else {
            Vec::new()
        };
        Block {
            kind,
            height,
            breaks,
            ops: self.ops,
        }
    }

    fn advance(&mut self, height: f32) -> &mut Self {
        self.cursor += height;
        self.breaks.push(self.cursor);
        self
    }

    fn push_text(&mut self, x: f32, y: f32, text: String) {
        if text.is_empty() {
            return;
        }
        self.ops.push(DrawOp::Text {
            x,
            y,
            size: self.size,
            bold: self.bold,
            color: self.color,
            text,
        });
    }

    fn aligned_x(&self, text: &str, x: f32, width: f32, align: Align) -> f32 {
        self.aligned_x_styled(text, x, width, align, self.bold)
    }

    fn aligned_x_styled(&self, text: &str, x: f32, width: f32, align: Align, bold: bool) -> f32 {
        let w = text_width(text, self.size, bold);
        match align {
            Align::Left => x,
            Align::Center => x + (width - w) / 2.0,
            Align::Right => x + width - w,
        }
    }
}

/// Scale `(w, h)` pixels to fit inside a box, preserving aspect ratio
pub fn fit_within(width: u32, height: u32, max_w: f32, max_h: f32) -> (f32, f32) {
    if width == 0 || height == 0 {
        return (0.0, 0.0);
    }
    let scale = (max_w / width as f32).min(max_h / height as f32);
    (width as f32 * scale, height as f32 * scale)
}
