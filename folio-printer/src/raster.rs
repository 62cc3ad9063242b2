//! Page rasterization
//!
//! A page is described as SVG in page points and rendered with resvg onto
//! a white bitmap. Text uses whichever common sans-serif face is installed.

use std::io::Cursor;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use resvg::tiny_skia::{self, Pixmap, Transform};
use resvg::usvg::{Options, Tree, fontdb};
use tracing::debug;

use crate::block::{Block, Color, DrawOp, ImageData};
use crate::error::{PrintError, PrintResult};
use crate::paginate::{PageGeometry, PagePlan};

/// Metric-compatible Helvetica substitutes, most faithful first
const SANS_FAMILIES: [&str; 5] = ["Helvetica", "Arial", "Liberation Sans", "Nimbus Sans", "DejaVu Sans"];

const FONT_FAMILY: &str = "Helvetica, Arial, 'Liberation Sans', 'Nimbus Sans', 'DejaVu Sans', sans-serif";

/// Renders page plans to bitmaps. Fonts are loaded once per writer.
pub(crate) struct Rasterizer {
    geometry: PageGeometry,
    scale: f32,
    fonts: Arc<fontdb::Database>,
}

impl Rasterizer {
    pub(crate) fn new(geometry: PageGeometry, dpi: u32) -> PrintResult<Self> {
        if dpi == 0 {
            return Err(PrintError::Raster("dpi must be positive".to_string()));
        }
        Ok(Self {
            geometry,
            scale: dpi as f32 / 72.0,
            fonts: Arc::new(system_fonts()),
        })
    }

    /// Bitmap size in pixels
    pub(crate) fn size(&self) -> (u32, u32) {
        (
            (self.geometry.width * self.scale).round() as u32,
            (self.geometry.height * self.scale).round() as u32,
        )
    }

    pub(crate) fn render(
        &self,
        blocks: &[Block],
        plan: &PagePlan,
        label: Option<&(String, f32, f32)>,
    ) -> PrintResult<ImageData> {
        let svg = page_svg(&self.geometry, blocks, plan, label)?;
        let mut options = Options::default();
        options.fontdb = self.fonts.clone();
        let tree = Tree::from_str(&svg, &options).map_err(|e| PrintError::Raster(e.to_string()))?;

        let (width, height) = self.size();
        let mut pixmap = Pixmap::new(width, height)
            .ok_or_else(|| PrintError::Raster(format!("cannot allocate a {width}x{height} page")))?;
        pixmap.fill(tiny_skia::Color::WHITE);
        resvg::render(&tree, Transform::from_scale(self.scale, self.scale), &mut pixmap.as_mut());

        // Opaque background: premultiplied RGBA is plain RGB plus alpha
        let rgb = pixmap
            .data()
            .chunks_exact(4)
            .flat_map(|px| [px[0], px[1], px[2]])
            .collect();
        Ok(ImageData { width, height, rgb })
    }
}

fn system_fonts() -> fontdb::Database {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();
    let installed = |name: &str| db.faces().any(|face| face.families.iter().any(|(family, _)| family == name));
    let fallback = SANS_FAMILIES.iter().copied().find(|name| installed(name));
    if let Some(family) = fallback {
        db.set_sans_serif_family(family);
    }
    debug!(faces = db.len(), sans = ?fallback, "System fonts loaded");
    db
}

/// One page as an SVG document in points, origin at the top-left corner
pub(crate) fn page_svg(
    g: &PageGeometry,
    blocks: &[Block],
    plan: &PagePlan,
    label: Option<&(String, f32, f32)>,
) -> PrintResult<String> {
    let mut svg = format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"#,
        w = g.width,
        h = g.height
    );

    for placement in &plan.placements {
        let block = blocks
            .get(placement.block)
            .ok_or_else(|| PrintError::Pdf(format!("unknown block {}", placement.block)))?;
        let top = |y: f32| placement.page_y(g, y);

        for op in placement.ops(block) {
            match op {
                DrawOp::Text {
                    x,
                    y,
                    size,
                    bold,
                    color,
                    text,
                } => push_text(&mut svg, g.margin + x, top(y + size), *size, *bold, *color, text),
                DrawOp::Rule {
                    x1,
                    x2,
                    y,
                    thickness,
                    color,
                } => push_rect(&mut svg, g.margin + x1, top(*y) - thickness / 2.0, x2 - x1, *thickness, *color),
                DrawOp::Fill {
                    x,
                    y,
                    width,
                    height,
                    color,
                } => push_rect(&mut svg, g.margin + x, top(*y), *width, *height, *color),
                DrawOp::Image {
                    x,
                    y,
                    width,
                    height,
                    image,
                } => {
                    if image.width == 0 || image.height == 0 {
                        continue;
                    }
                    svg.push_str(&format!(
                        r#"<image x="{}" y="{}" width="{width}" height="{height}" preserveAspectRatio="none" xlink:href="{}"/>"#,
                        g.margin + x,
                        top(*y),
                        png_data_url(image)?
                    ));
                }
            }
        }
    }

    if let Some((text, x, label_top)) = label {
        push_text(&mut svg, *x, label_top + 8.0, 8.0, false, Color::GRAY, text);
    }
    svg.push_str("</svg>");
    Ok(svg)
}

fn push_text(svg: &mut String, x: f32, baseline: f32, size: f32, bold: bool, color: Color, text: &str) {
    svg.push_str(&format!(
        r#"<text x="{x}" y="{baseline}" font-family="{FONT_FAMILY}" font-size="{size}" font-weight="{}" fill="{}" xml:space="preserve">{}</text>"#,
        if bold { "bold" } else { "normal" },
        hex(color),
        escape(text)
    ));
}

fn push_rect(svg: &mut String, x: f32, y: f32, width: f32, height: f32, color: Color) {
    if width <= 0.0 || height <= 0.0 {
        return;
    }
    svg.push_str(&format!(
        r#"<rect x="{x}" y="{y}" width="{width}" height="{height}" fill="{}"/>"#,
        hex(color)
    ));
}

fn hex(color: Color) -> String {
    format!("#{:02x}{:02x}{:02x}", color.r, color.g, color.b)
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

fn png_data_url(data: &ImageData) -> PrintResult<String> {
    let buffer = image::RgbImage::from_raw(data.width, data.height, data.rgb.clone())
        .ok_or_else(|| PrintError::Image("pixel buffer does not match dimensions".to_string()))?;
    let mut png = Cursor::new(Vec::new());
    buffer
        .write_to(&mut png, image::ImageFormat::Png)
        .map_err(|e| PrintError::Image(e.to_string()))?;
    Ok(format!("data:image/png;base64,{}", STANDARD.encode(png.into_inner())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockBuilder;
    use crate::paginate::paginate;

    const BRICK: Color = Color::rgb(180, 40, 30);

    fn pixel(image: &ImageData, x: u32, y: u32) -> [u8; 3] {
        let i = ((y * image.width + x) * 3) as usize;
        [image.rgb[i], image.rgb[i + 1], image.rgb[i + 2]]
    }

    #[test]
    fn test_fill_lands_where_the_vector_page_puts_it() {
        let g = PageGeometry::LETTER;
        let mut row = BlockBuilder::new(g.body_width());
        row.fill(20.0, BRICK).line("Pipe fitting");
        let blocks = vec![row.build_row()];
        let pages = paginate(&blocks, &g);

        let rasterizer = Rasterizer::new(g, 72).unwrap();
        let page = rasterizer.render(&blocks, &pages[0], None).unwrap();
        assert_eq!((page.width, page.height), (612, 792));

        let inside = (g.margin + 200.0) as u32;
        assert_eq!(pixel(&page, inside, (g.margin + 10.0) as u32), [180, 40, 30]);
        // Margins and the space below the band stay white
        assert_eq!(pixel(&page, 5, 5), [255, 255, 255]);
        assert_eq!(pixel(&page, inside, (g.margin + 60.0) as u32), [255, 255, 255]);
    }

    #[test]
    fn test_resolution_follows_dpi() {
        let rasterizer = Rasterizer::new(PageGeometry::LETTER, 144).unwrap();
        assert_eq!(rasterizer.size(), (1224, 1584));
        assert!(Rasterizer::new(PageGeometry::LETTER, 0).is_err());
    }

    #[test]
    fn test_markup_in_text_is_escaped() {
        let g = PageGeometry::LETTER;
        let mut block = BlockBuilder::new(g.body_width());
        block.line("Tubo 1/2\" <PVC> & codo");
        let blocks = vec![block.build()];
        let pages = paginate(&blocks, &g);

        let svg = page_svg(&g, &blocks, &pages[0], None).unwrap();
        assert!(svg.contains("Tubo 1/2&quot; &lt;PVC&gt; &amp; codo"));
        assert!(Tree::from_str(&svg, &Options::default()).is_ok());
    }

    #[test]
    fn test_page_label_and_images_are_included() {
        let g = PageGeometry::LETTER;
        let mut block = BlockBuilder::new(g.body_width());
        block.image(
            Arc::new(ImageData {
                width: 2,
                height: 1,
                rgb: vec![255, 0, 0, 0, 0, 255],
            }),
            40.0,
            20.0,
        );
        let blocks = vec![block.build()];
        let pages = paginate(&blocks, &g);
        let label = ("Page 1 of 2".to_string(), 500.0, 760.0);

        let svg = page_svg(&g, &blocks, &pages[0], Some(&label)).unwrap();
        assert!(svg.contains("data:image/png;base64,"));
        assert!(svg.contains(">Page 1 of 2</text>"));
    }
}
