//! PDF output
//!
//! Draws paginated blocks onto fixed-size pages. In vector mode text uses
//! the built-in Helvetica faces; in raster mode each page is rendered to
//! one bitmap and embedded as a full-page image. Layout units are points;
//! printpdf positions are in millimetres with the origin at the
//! bottom-left corner.

use std::io::BufWriter;

use printpdf::{
    BuiltinFont, Color as PdfColor, Image, ImageTransform, IndirectFontRef, Line, Mm,
    PdfDocument, PdfLayerReference, Point, Rgb,
};
use tracing::{debug, instrument};

use crate::block::{Block, Color, DrawOp, ImageData};
use crate::error::{PrintError, PrintResult};
use crate::metrics::text_width;
use crate::paginate::{PagePlan, PageGeometry, Placement};
#[cfg(feature = "raster")]
use crate::raster::Rasterizer;

/// Footer label size
const PAGE_NUMBER_SIZE: f32 = 8.0;

fn mm(pt: f32) -> Mm {
    Mm(pt * 25.4 / 72.0)
}

fn pdf_color(color: Color) -> PdfColor {
    PdfColor::Rgb(Rgb::new(
        color.r as f32 / 255.0,
        color.g as f32 / 255.0,
        color.b as f32 / 255.0,
        None,
    ))
}

/// How page content reaches the PDF
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageMode {
    /// Selectable text and vector rules
    #[default]
    Vector,
    /// One bitmap per page at the given resolution. Needs the `raster`
    /// feature; text is drawn with system sans-serif fonts.
    Raster { dpi: u32 },
}

impl PageMode {
    /// Raster pages at twice screen resolution
    pub const RASTER: PageMode = PageMode::Raster { dpi: 144 };
}

/// PDF document writer
#[derive(Debug, Clone)]
pub struct PdfWriter {
    title: String,
    geometry: PageGeometry,
    page_numbers: bool,
    mode: PageMode,
}

struct Fonts {
    regular: IndirectFontRef,
    bold: IndirectFontRef,
}

/// "Page n of m" and its position (left x, top y), for multi-page documents
pub(crate) fn page_label(geometry: &PageGeometry, page: usize, total: usize) -> Option<(String, f32, f32)> {
    if total <= 1 {
        return None;
    }
    let label = format!("Page {page} of {total}");
    let x = geometry.width - geometry.margin - text_width(&label, PAGE_NUMBER_SIZE, false);
    let top = geometry.height - geometry.margin / 2.0 - PAGE_NUMBER_SIZE;
    Some((label, x, top))
}

impl PdfWriter {
    pub fn new(title: impl Into<String>, geometry: PageGeometry) -> Self {
        Self {
            title: title.into(),
            geometry,
            page_numbers: true,
            mode: PageMode::Vector,
        }
    }

    /// Print "Page n of m" in the bottom margin of multi-page documents
    pub fn page_numbers(mut self, enabled: bool) -> Self {
        self.page_numbers = enabled;
        self
    }

    pub fn mode(mut self, mode: PageMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Draw `pages` and serialize the document.
    ///
    /// `should_stop` is polled before each page; when it returns true the
    /// partial document is dropped and `PrintError::Cancelled` is returned.
    #[instrument(skip_all, fields(pages = pages.len(), mode = ?self.mode))]
    pub fn write(
        &self,
        blocks: &[Block],
        pages: &[PagePlan],
        should_stop: &dyn Fn() -> bool,
    ) -> PrintResult<Vec<u8>> {
        let g = self.geometry;
        let (doc, first_page, first_layer) =
            PdfDocument::new(self.title.as_str(), mm(g.width), mm(g.height), "Layer 1");
        let fonts = Fonts {
            regular: doc
                .add_builtin_font(BuiltinFont::Helvetica)
                .map_err(|e| PrintError::Pdf(e.to_string()))?,
            bold: doc
                .add_builtin_font(BuiltinFont::HelveticaBold)
                .map_err(|e| PrintError::Pdf(e.to_string()))?,
        };
        let rasterizer = match self.mode {
            PageMode::Vector => None,
            PageMode::Raster { dpi } => Some(Rasterizer::new(g, dpi)?),
        };

        let total = pages.len().max(1);
        for (n, plan) in pages.iter().enumerate() {
            if should_stop() {
                debug!(page = n + 1, "render cancelled");
                return Err(PrintError::Cancelled);
            }
            let layer = if n == 0 {
                doc.get_page(first_page).get_layer(first_layer)
            } else {
                let (page, layer) = doc.add_page(mm(g.width), mm(g.height), format!("Page {}", n + 1));
                doc.get_page(page).get_layer(layer)
            };
            let label = page_label(&g, n + 1, total).filter(|_| self.page_numbers);

            if let Some(rasterizer) = rasterizer.as_ref() {
                let bitmap = rasterizer.render(blocks, plan, label.as_ref())?;
                draw_image(&layer, &bitmap, 0.0, 0.0, g.width, g.height)?;
                continue;
            }
            for placement in &plan.placements {
                let block = blocks
                    .get(placement.block)
                    .ok_or_else(|| PrintError::Pdf(format!("unknown block {}", placement.block)))?;
                self.draw_slice(&layer, &fonts, block, placement)?;
            }
            if let Some((text, x, top)) = label {
                layer.set_fill_color(pdf_color(Color::GRAY));
                layer.use_text(text, PAGE_NUMBER_SIZE, mm(x), mm(g.height - top - PAGE_NUMBER_SIZE), &fonts.regular);
            }
        }

        if should_stop() {
            return Err(PrintError::Cancelled);
        }
        let mut writer = BufWriter::new(Vec::<u8>::new());
        doc.save(&mut writer)
            .map_err(|e| PrintError::Pdf(e.to_string()))?;
        writer
            .into_inner()
            .map_err(|e| PrintError::Pdf(e.to_string()))
    }

    fn draw_slice(
        &self,
        layer: &PdfLayerReference,
        fonts: &Fonts,
        block: &Block,
        placement: &Placement,
    ) -> PrintResult<()> {
        let g = self.geometry;
        let from_bottom = |y: f32| g.height - placement.page_y(&g, y);

        for op in placement.ops(block) {
            match op {
                DrawOp::Text {
                    x,
                    y,
                    size,
                    bold,
                    color,
                    text,
                } => {
                    let font = if *bold { &fonts.bold } else { &fonts.regular };
                    layer.set_fill_color(pdf_color(*color));
                    layer.use_text(
                        text.as_str(),
                        *size,
                        mm(g.margin + x),
                        mm(from_bottom(y + size)),
                        font,
                    );
                }
                DrawOp::Rule {
                    x1,
                    x2,
                    y,
                    thickness,
                    color,
                } => {
                    self.horizontal(layer, g.margin + x1, g.margin + x2, from_bottom(*y), *thickness, *color);
                }
                DrawOp::Fill {
                    x,
                    y,
                    width,
                    height,
                    color,
                } => {
                    // A stroke as thick as the box fills it exactly (butt caps)
                    let center = from_bottom(y + height / 2.0);
                    self.horizontal(layer, g.margin + x, g.margin + x + width, center, *height, *color);
                }
                DrawOp::Image {
                    x,
                    y,
                    width,
                    height,
                    image,
                } => {
                    draw_image(layer, image, g.margin + x, from_bottom(y + height), *width, *height)?;
                }
            }
        }
        Ok(())
    }

    fn horizontal(&self, layer: &PdfLayerReference, x1: f32, x2: f32, y: f32, thickness: f32, color: Color) {
        layer.set_outline_color(pdf_color(color));
        layer.set_outline_thickness(thickness);
        layer.add_line(Line {
            points: vec![
                (Point::new(mm(x1), mm(y)), false),
                (Point::new(mm(x2), mm(y)), false),
            ],
            is_closed: false,
        });
    }
}

/// Stand-in when raster support is compiled out
#[cfg(not(feature = "raster"))]
struct Rasterizer;

#[cfg(not(feature = "raster"))]
impl Rasterizer {
    fn new(_: PageGeometry, _: u32) -> PrintResult<Self> {
        Err(PrintError::Raster("built without the `raster` feature".to_string()))
    }

    fn render(&self, _: &[Block], _: &PagePlan, _: Option<&(String, f32, f32)>) -> PrintResult<ImageData> {
        Err(PrintError::Raster("built without the `raster` feature".to_string()))
    }
}

fn draw_image(
    layer: &PdfLayerReference,
    data: &ImageData,
    x: f32,
    bottom: f32,
    width: f32,
    height: f32,
) -> PrintResult<()> {
    if data.width == 0 || data.height == 0 {
        return Ok(());
    }
    let buffer = printpdf::image_crate::RgbImage::from_raw(data.width, data.height, data.rgb.clone())
        .ok_or_else(|| PrintError::Image("pixel buffer does not match dimensions".to_string()))?;
    let image = Image::from_dynamic_image(&printpdf::image_crate::DynamicImage::ImageRgb8(buffer));
    // At 72 dpi one pixel is one point before scaling
    image.add_to_layer(
        layer.clone(),
        ImageTransform {
            translate_x: Some(mm(x)),
            translate_y: Some(mm(bottom)),
            scale_x: Some(width / data.width as f32),
            scale_y: Some(height / data.height as f32),
            dpi: Some(72.0),
            ..Default::default()
        },
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockBuilder;
    use crate::paginate::paginate;
    use std::sync::Arc;

    fn sample_blocks() -> Vec<Block> {
        let mut header = BlockBuilder::new(PageGeometry::LETTER.body_width());
        header.size(18.0).bold().line("Acme Services").bold_off();
        header.size(10.0).rule(1.0, Color::LIGHT_GRAY, 8.0);
        header.image(
            Arc::new(ImageData {
                width: 2,
                height: 2,
                rgb: vec![0; 12],
            }),
            40.0,
            40.0,
        );
        let mut row = BlockBuilder::new(PageGeometry::LETTER.body_width());
        row.fill(20.0, Color::ROW_SHADE).line("1  pza  Pipe fitting  $100.00");
        vec![header.build(), row.build_row()]
    }

    #[test]
    fn test_write_produces_pdf() {
        let blocks = sample_blocks();
        let pages = paginate(&blocks, &PageGeometry::LETTER);
        let bytes = PdfWriter::new("Quote", PageGeometry::LETTER)
            .write(&blocks, &pages, &|| false)
            .unwrap();
        assert!(bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_write_cancelled() {
        let blocks = sample_blocks();
        let pages = paginate(&blocks, &PageGeometry::LETTER);
        let result = PdfWriter::new("Quote", PageGeometry::LETTER).write(&blocks, &pages, &|| true);
        assert!(matches!(result, Err(PrintError::Cancelled)));
    }

    fn count(haystack: &[u8], needle: &[u8]) -> usize {
        haystack.windows(needle.len()).filter(|w| *w == needle).count()
    }

    #[test]
    fn test_page_label_only_on_multi_page_documents() {
        let g = PageGeometry::LETTER;
        assert!(page_label(&g, 1, 1).is_none());
        let (text, x, top) = page_label(&g, 2, 3).unwrap();
        assert_eq!(text, "Page 2 of 3");
        assert!(x < g.width - g.margin);
        assert!(top > g.height - g.margin);
    }

    #[cfg(feature = "raster")]
    #[test]
    fn test_raster_mode_embeds_one_image_per_page() {
        let mut blocks = Vec::new();
        for i in 0..80 {
            let mut row = BlockBuilder::new(PageGeometry::LETTER.body_width());
            row.fill(20.0, Color::ROW_SHADE).line(&format!("{i}  pza  Pipe fitting  $100.00"));
            blocks.push(row.build_row());
        }
        let pages = paginate(&blocks, &PageGeometry::LETTER);
        assert!(pages.len() > 1);

        let vector = PdfWriter::new("Quote", PageGeometry::LETTER)
            .write(&blocks, &pages, &|| false)
            .unwrap();
        let raster = PdfWriter::new("Quote", PageGeometry::LETTER)
            .mode(PageMode::Raster { dpi: 72 })
            .write(&blocks, &pages, &|| false)
            .unwrap();
        assert!(raster.starts_with(b"%PDF"));
        // One image XObject per page on top of whatever the vector file has
        assert!(count(&raster, b"/Image") >= count(&vector, b"/Image") + pages.len());
    }

    #[cfg(feature = "raster")]
    #[test]
    fn test_raster_mode_cancelled() {
        let blocks = sample_blocks();
        let pages = paginate(&blocks, &PageGeometry::LETTER);
        let result = PdfWriter::new("Quote", PageGeometry::LETTER)
            .mode(PageMode::RASTER)
            .write(&blocks, &pages, &|| true);
        assert!(matches!(result, Err(PrintError::Cancelled)));
    }

    #[test]
    fn test_bad_image_buffer_is_error() {
        let mut builder = BlockBuilder::new(100.0);
        builder.image(
            Arc::new(ImageData {
                width: 10,
                height: 10,
                rgb: vec![0; 3],
            }),
            50.0,
            50.0,
        );
        let blocks = vec![builder.build()];
        let pages = paginate(&blocks, &PageGeometry::LETTER);
        let result = PdfWriter::new("Quote", PageGeometry::LETTER).write(&blocks, &pages, &|| false);
        assert!(matches!(result, Err(PrintError::Image(_))));
    }
}
