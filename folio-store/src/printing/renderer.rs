//! Quote document renderer
//!
//! Lays a quote out as blocks (letterhead, title, item table, totals,
//! terms, signature), paginates them onto Letter pages and writes a PDF.

use std::sync::Arc;

use folio_printer::{
    Block, BlockBuilder, Cell, Color, ImageData, PageGeometry, PageMode, PagePlan, PdfWriter, PrintResult,
    line_height, paginate, text_width,
};
use shared::models::{Profile, Quote, QuoteItem};
use shared::util::display_date;

use crate::quotes::money::{LineAmount, QuoteTotals, calculate_item_totals, format_money, format_rate};

/// Document label printed in the letterhead
const DOCUMENT_LABEL: &str = "QUOTE";

const BODY_SIZE: f32 = 9.0;
const SMALL_SIZE: f32 = 8.0;
const CELL_PADDING: f32 = 6.0;

/// Everything a document is drawn from
#[derive(Debug, Clone)]
pub struct QuoteDocument {
    pub quote: Quote,
    pub profile: Profile,
    pub logo: Option<Arc<ImageData>>,
    pub signature: Option<Arc<ImageData>>,
}

impl QuoteDocument {
    pub fn new(quote: Quote, profile: Profile) -> Self {
        Self {
            quote,
            profile,
            logo: None,
            signature: None,
        }
    }
}

/// Rendered output
#[derive(Debug, Clone)]
pub struct RenderedDocument {
    pub bytes: Vec<u8>,
    pub pages: Vec<PagePlan>,
}

impl RenderedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Item table columns as fractions of the body width
struct Columns {
    qty: (f32, f32),
    unit: (f32, f32),
    description: (f32, f32),
    price: (f32, f32),
    amount: (f32, f32),
}

impl Columns {
    fn new(width: f32) -> Self {
        let fractions = [0.08, 0.10, 0.47, 0.17, 0.18];
        let mut x = 0.0;
        let mut spans = [(0.0, 0.0); 5];
        for (span, fraction) in spans.iter_mut().zip(fractions) {
            let w = width * fraction;
            // Inner padding on both sides of every cell
            *span = (x + 4.0, w - 8.0);
            x += w;
        }
        Self {
            qty: spans[0],
            unit: spans[1],
            description: spans[2],
            price: spans[3],
            amount: spans[4],
        }
    }
}

/// Quote document renderer
///
/// Produces one table row block per item; rows are atomic so the
/// paginator never cuts one across pages.
pub struct QuoteDocumentRenderer {
    geometry: PageGeometry,
    mode: PageMode,
}

impl Default for QuoteDocumentRenderer {
    fn default() -> Self {
        Self::new(PageGeometry::LETTER)
    }
}

impl QuoteDocumentRenderer {
    pub fn new(geometry: PageGeometry) -> Self {
        Self {
            geometry,
            mode: PageMode::Vector,
        }
    }

    /// Vector pages (default) or one bitmap per page
    pub fn with_mode(mut self, mode: PageMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn geometry(&self) -> &PageGeometry {
        &self.geometry
    }

    /// Lay out, paginate and write the PDF.
    ///
    /// `should_stop` is polled between pages.
    pub fn render(&self, doc: &QuoteDocument, should_stop: &dyn Fn() -> bool) -> PrintResult<RenderedDocument> {
        let blocks = self.layout(doc);
        let pages = paginate(&blocks, &self.geometry);
        let title = format!("{} {}", doc.quote.display_title(), doc.quote.folio);
        let bytes = PdfWriter::new(title, self.geometry)
            .mode(self.mode)
            .write(&blocks, &pages, should_stop)?;
        Ok(RenderedDocument { bytes, pages })
    }

    /// Blocks in document order: header, title, table head, one row per
    /// item, then the footer blocks
    pub fn layout(&self, doc: &QuoteDocument) -> Vec<Block> {
        let width = self.geometry.body_width();
        let brand = Color::from_hex(&doc.profile.color).unwrap_or(Color::DARK_GRAY);
        let columns = Columns::new(width);
        let totals = calculate_item_totals(&doc.quote.items, doc.quote.discount_rate, doc.quote.tax_rate);

        let mut blocks = vec![
            self.render_header(doc, width, brand),
            self.render_title(&doc.quote, width),
        ];

        let head = self.render_table_head(&columns, width, brand);
        let max_lines = self.max_description_lines(head.height);
        blocks.push(head);
        for (i, item) in doc.quote.items.iter().enumerate() {
            blocks.push(self.render_row(item, i, &columns, width, max_lines));
        }

        blocks.push(Block::spacer(12.0));
        blocks.push(self.render_totals(&doc.quote, &totals, width, brand));
        blocks.push(self.render_terms(&doc.profile, width));
        blocks.push(self.render_signature(doc.signature.clone(), width));
        blocks
    }

    /// Letterhead: logo and business details left, document data right
    fn render_header(&self, doc: &QuoteDocument, width: f32, brand: Color) -> Block {
        let profile = &doc.profile;
        let quote = &doc.quote;
        let left_w = width * 0.55;
        let right_x = left_w;
        let right_w = width - left_w;

        let mut b = BlockBuilder::new(left_w);

        // Right column first; it does not move the cursor
        b.size(22.0).bold().color(brand).right();
        b.text_at(right_x, 0.0, right_w, DOCUMENT_LABEL);
        let mut y = line_height(22.0) + 4.0;
        b.left();
        for (label, value) in [
            ("FOLIO", format!("#{}", quote.folio)),
            ("DATE", display_date(&quote.date)),
            ("STATUS", quote.status.label().to_uppercase()),
        ] {
            right_pair(&mut b, width, y, label, &value);
            y += line_height(BODY_SIZE + 2.0);
        }
        let right_height = y;

        // Left column
        if let Some(logo) = &doc.logo {
            b.image(Arc::clone(logo), 160.0, 60.0).gap(8.0);
        }
        b.size(18.0).bold().color(Color::BLACK).line(&profile.name.to_uppercase());
        b.size(BODY_SIZE).bold_off().color(Color::GRAY);
        if !profile.slogan.trim().is_empty() {
            b.line(&profile.slogan);
        }
        b.gap(4.0).size(SMALL_SIZE);
        if let Some(city) = profile.city.as_deref().filter(|c| !c.trim().is_empty()) {
            b.line(city);
        }
        if !profile.phone.trim().is_empty() {
            b.line(&profile.phone);
        }

        let filler = right_height - b.cursor();
        if filler > 0.0 {
            b.gap(filler);
        }
        b.gap(8.0);
        let y = b.cursor();
        b.rule_at(0.0, width, y + 1.0, 2.0, brand);
        b.gap(14.0);
        b.build_atomic()
    }

    /// Title and "Attention" block
    fn render_title(&self, quote: &Quote, width: f32) -> Block {
        let mut b = BlockBuilder::new(width);
        b.size(18.0).bold().color(Color::BLACK).center();
        b.wrapped(&quote.display_title().to_uppercase());
        b.gap(10.0).left();
        b.size(SMALL_SIZE).color(Color::GRAY).line("ATTENTION");
        b.size(13.0).color(Color::DARK_GRAY).line(&quote.client_name);
        b.gap(6.0);
        b.rule(0.5, Color::LIGHT_GRAY, 12.0);
        b.build()
    }

    fn render_table_head(&self, columns: &Columns, width: f32, brand: Color) -> Block {
        let mut b = BlockBuilder::new(width);
        b.size(SMALL_SIZE).bold().color(Color::WHITE);
        b.cells(
            &[
                Cell::new("QTY", columns.qty.0, columns.qty.1).center().bold(),
                Cell::new("UNIT", columns.unit.0, columns.unit.1).center().bold(),
                Cell::new("DESCRIPTION", columns.description.0, columns.description.1).bold(),
                Cell::new("PRICE", columns.price.0, columns.price.1).right().bold(),
                Cell::new("AMOUNT", columns.amount.0, columns.amount.1).right().bold(),
            ],
            CELL_PADDING,
            Some(brand),
        );
        b.build_table_head()
    }

    /// Description line cap so that a row plus the repeated table head
    /// always fits on an empty page
    fn max_description_lines(&self, head_height: f32) -> usize {
        let available = self.geometry.body_height() - head_height - CELL_PADDING * 2.0 - 1.0;
        ((available / line_height(BODY_SIZE)).floor() as usize).max(1)
    }

    fn render_row(&self, item: &QuoteItem, index: usize, columns: &Columns, width: f32, max_lines: usize) -> Block {
        let line = LineAmount::from(item);
        let qty = line.quantity.normalize().to_string();
        let unit = if item.unit.trim().is_empty() {
            "-".to_string()
        } else {
            item.unit.to_uppercase()
        };
        let price = format_money(line.unit_price);
        let amount = format_money(line.amount());

        let mut b = BlockBuilder::new(width);
        b.size(BODY_SIZE).color(Color::DARK_GRAY);
        let shade = (index % 2 == 1).then_some(Color::ROW_SHADE);
        b.cells(
            &[
                Cell::new(&qty, columns.qty.0, columns.qty.1).center().bold(),
                Cell::new(&unit, columns.unit.0, columns.unit.1).center(),
                Cell::new(&item.description, columns.description.0, columns.description.1).wrap(max_lines),
                Cell::new(&price, columns.price.0, columns.price.1).right(),
                Cell::new(&amount, columns.amount.0, columns.amount.1).right().bold(),
            ],
            CELL_PADDING,
            shade,
        );
        b.rule(0.5, Color::LIGHT_GRAY, 0.0);
        b.build_row()
    }

    /// Totals column; subtotal, discount and tax lines only when a rate applies
    fn render_totals(&self, quote: &Quote, totals: &QuoteTotals, width: f32, brand: Color) -> Block {
        let x = width * 0.6;
        let w = width - x;
        let has_discount = quote.discount_rate > rust_decimal::Decimal::ZERO;
        let has_tax = quote.tax_rate > rust_decimal::Decimal::ZERO;

        let mut b = BlockBuilder::new(width);
        b.rule(0.75, Color::LIGHT_GRAY, 10.0);
        b.size(10.0).color(Color::GRAY);
        if has_discount || has_tax {
            b.pair_at(x, w, "Subtotal", &format_money(totals.subtotal));
        }
        if has_discount {
            let label = format!("Discount ({})", format_rate(quote.discount_rate));
            b.pair_at(x, w, &label, &format!("-{}", format_money(totals.discount_amount)));
        }
        if has_tax {
            let label = format!("Tax ({})", format_rate(quote.tax_rate));
            b.pair_at(x, w, &label, &format_money(totals.tax_amount));
        }
        b.gap(4.0);
        b.size(14.0).bold().color(brand);
        b.pair_at(x, w, "TOTAL", &format_money(totals.total));
        b.gap(12.0);
        b.build_atomic()
    }

    fn render_terms(&self, profile: &Profile, width: f32) -> Block {
        let mut b = BlockBuilder::new(width * 0.6);
        if profile.terms.trim().is_empty() {
            b.size(SMALL_SIZE).color(Color::LIGHT_GRAY).line("No additional terms.");
        } else {
            b.size(SMALL_SIZE).bold().color(Color::GRAY).line("TERMS AND CONDITIONS");
            b.bold_off().gap(2.0).wrapped(profile.terms.trim());
        }
        b.gap(18.0);
        b.build()
    }

    /// Acceptance signature, with the captured image when present
    fn render_signature(&self, signature: Option<Arc<ImageData>>, width: f32) -> Block {
        let line_w = 200.0_f32.min(width);
        let x1 = (width - line_w) / 2.0;

        let mut b = BlockBuilder::new(width);
        b.center();
        match signature {
            Some(image) => {
                b.image(image, line_w, 50.0);
            }
            None => {
                b.gap(40.0);
            }
        }
        let y = b.cursor();
        b.rule_at(x1, x1 + line_w, y + 2.0, 0.75, Color::GRAY);
        b.gap(6.0);
        b.size(7.0).bold().color(Color::GRAY).line("ACCEPTANCE SIGNATURE");
        b.build_atomic()
    }
}

/// Right-aligned `LABEL  value` ending at `right_edge`
fn right_pair(b: &mut BlockBuilder, right_edge: f32, y: f32, label: &str, value: &str) {
    let value_size = BODY_SIZE + 1.0;
    let value_w = text_width(value, value_size, true);
    let label_w = text_width(label, SMALL_SIZE, true);
    let value_x = right_edge - value_w;
    let label_x = value_x - 10.0 - label_w;

    b.size(SMALL_SIZE).bold().color(Color::GRAY);
    b.text_at(label_x, y + 1.5, label_w + 1.0, label);
    b.size(value_size).color(Color::DARK_GRAY);
    b.text_at(value_x, y, value_w + 1.0, value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use folio_printer::{BlockKind, DrawOp};
    use rust_decimal::Decimal;
    use shared::models::{QuoteStatus, RawNumber};

    fn item(i: usize, desc: &str) -> QuoteItem {
        QuoteItem {
            id: format!("i{i}"),
            quantity: RawNumber::from(2),
            unit: "pza".to_string(),
            description: desc.to_string(),
            unit_price: RawNumber::from("100"),
        }
    }

    fn quote(items: Vec<QuoteItem>) -> Quote {
        Quote {
            id: "q1".to_string(),
            folio: "0007".to_string(),
            date: Utc.with_ymd_and_hms(2025, 3, 5, 10, 0, 0).unwrap(),
            title: None,
            client_name: "Ana Lopez".to_string(),
            client_phone: "5512345678".to_string(),
            items,
            status: QuoteStatus::Pending,
            discount_rate: Decimal::from(10),
            tax_rate: Decimal::from(16),
            total: Decimal::ZERO,
            signature: None,
        }
    }

    fn document(count: usize) -> QuoteDocument {
        let items = (0..count).map(|i| item(i, &format!("Service line {i}"))).collect();
        QuoteDocument::new(quote(items), Profile::default())
    }

    fn texts(block: &Block) -> Vec<&str> {
        block
            .ops
            .iter()
            .filter_map(|op| match op {
                DrawOp::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Page index of every placement of block `index`
    fn pages_of(pages: &[PagePlan], index: usize) -> Vec<usize> {
        pages
            .iter()
            .enumerate()
            .flat_map(|(n, p)| p.placements.iter().filter(move |pl| pl.block == index).map(move |_| n))
            .collect()
    }

    #[test]
    fn test_single_item_fits_one_page() {
        let renderer = QuoteDocumentRenderer::default();
        let rendered = renderer.render(&document(1), &|| false).unwrap();
        assert_eq!(rendered.page_count(), 1);
        assert!(rendered.bytes.starts_with(b"%PDF"));
    }

    #[test]
    fn test_totals_lines() {
        let renderer = QuoteDocumentRenderer::default();
        let blocks = renderer.layout(&document(1));
        let totals = &blocks[blocks.len() - 3];
        let lines = texts(totals);
        assert!(lines.contains(&"Subtotal"));
        assert!(lines.contains(&"Discount (10%)"));
        assert!(lines.contains(&"-$20.00"));
        assert!(lines.contains(&"Tax (16%)"));
        assert!(lines.contains(&"$208.80"));
    }

    #[test]
    fn test_zero_rates_show_only_total() {
        let renderer = QuoteDocumentRenderer::default();
        let mut doc = document(1);
        doc.quote.discount_rate = Decimal::ZERO;
        doc.quote.tax_rate = Decimal::ZERO;
        let blocks = renderer.layout(&doc);
        let lines = texts(&blocks[blocks.len() - 3]);
        assert_eq!(lines, vec!["TOTAL", "$200.00"]);
    }

    #[test]
    fn test_long_quote_spans_pages_without_splitting_rows() {
        let renderer = QuoteDocumentRenderer::default();
        let doc = document(120);
        let blocks = renderer.layout(&doc);
        let pages = paginate(&blocks, renderer.geometry());
        assert!(pages.len() > 2);

        for page in &pages {
            for placement in &page.placements {
                let block = &blocks[placement.block];
                if block.kind == BlockKind::Row {
                    assert_eq!(placement.from, 0.0);
                    assert_eq!(placement.to, block.height);
                }
                assert!(placement.y + placement.height() <= renderer.geometry().body_height() + 0.01);
            }
        }

        // Letterhead on the first page only; footer after the last row
        assert_eq!(pages_of(&pages, 0), vec![0]);
        let last_row = 3 + doc.quote.items.len() - 1;
        let footer = blocks.len() - 1;
        assert!(pages_of(&pages, footer)[0] >= pages_of(&pages, last_row)[0]);
    }

    #[test]
    fn test_table_head_repeats_on_continuation_pages() {
        let renderer = QuoteDocumentRenderer::default();
        let blocks = renderer.layout(&document(120));
        let pages = paginate(&blocks, renderer.geometry());
        let head_index = 2;
        assert_eq!(blocks[head_index].kind, BlockKind::TableHead);
        let head_pages = pages_of(&pages, head_index);
        assert!(head_pages.len() > 1);
    }

    #[test]
    fn test_huge_description_is_capped_to_one_page() {
        let renderer = QuoteDocumentRenderer::default();
        let doc = QuoteDocument::new(quote(vec![item(0, &"lorem ipsum ".repeat(2000))]), Profile::default());
        let blocks = renderer.layout(&doc);
        let head = &blocks[2];
        let row = &blocks[3];
        assert!(head.height + row.height <= renderer.geometry().body_height());
    }

    #[test]
    fn test_empty_item_list_still_renders() {
        let renderer = QuoteDocumentRenderer::default();
        let rendered = renderer.render(&document(0), &|| false).unwrap();
        assert_eq!(rendered.page_count(), 1);
    }

    #[test]
    fn test_cancelled_render() {
        let renderer = QuoteDocumentRenderer::default();
        let result = renderer.render(&document(3), &|| true);
        assert!(matches!(result, Err(folio_printer::PrintError::Cancelled)));
    }

    #[test]
    fn test_logo_and_signature_are_drawn() {
        let renderer = QuoteDocumentRenderer::default();
        let mut doc = document(1);
        let image = Arc::new(ImageData {
            width: 2,
            height: 1,
            rgb: vec![0; 6],
        });
        doc.logo = Some(Arc::clone(&image));
        doc.signature = Some(image);
        let blocks = renderer.layout(&doc);
        let has_image = |block: &Block| block.ops.iter().any(|op| matches!(op, DrawOp::Image { .. }));
        assert!(has_image(&blocks[0]));
        assert!(has_image(&blocks[blocks.len() - 1]));
        assert!(renderer.render(&doc, &|| false).is_ok());
    }
}
