//! Row-aware pagination
//!
//! Blocks are packed greedily into fixed-size pages:
//! - a `Row` moves to the next page whenever it would overflow the current
//!   one, so rows are never cut
//! - a `TableHead` is kept together with the first row after it, and is
//!   repeated at the top of a page that continues the table
//! - a `Flow` block that does not fit is cut at its last break point that
//!   fits; only a block with no usable break point is cut at the page edge

use crate::block::{Block, BlockKind, DrawOp};

/// Physical page size and margins, in points
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin: f32,
}

impl PageGeometry {
    /// US Letter, 0.5in margins
    pub const LETTER: PageGeometry = PageGeometry {
        width: 612.0,
        height: 792.0,
        margin: 36.0,
    };

    pub fn body_width(&self) -> f32 {
        self.width - self.margin * 2.0
    }

    pub fn body_height(&self) -> f32 {
        self.height - self.margin * 2.0
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        PageGeometry::LETTER
    }
}

/// A vertical slice `[from, to)` of block `block`, drawn with its top at
/// `y` (offset from the top of the page body)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    pub block: usize,
    pub from: f32,
    pub to: f32,
    pub y: f32,
}

impl Placement {
    pub fn height(&self) -> f32 {
        self.to - self.from
    }

    /// Operations of `block` drawn by this slice, chosen by their top edge.
    /// The first slice also takes anything above it and the last slice
    /// anything below.
    pub fn ops<'a>(&self, block: &'a Block) -> impl Iterator<Item = &'a DrawOp> + use<'a> {
        let first = self.from <= 0.0;
        let last = self.to >= block.height;
        let (from, to) = (self.from, self.to);
        block.ops.iter().filter(move |op| {
            let top = op.top();
            (top >= from || first) && (top < to || last)
        })
    }

    /// Page-space distance from the top edge for a block-relative `y`
    pub fn page_y(&self, geometry: &PageGeometry, y: f32) -> f32 {
        geometry.margin + self.y + (y - self.from)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PagePlan {
    pub placements: Vec<Placement>,
    /// Body height consumed; the rest of the page stays blank
    pub used: f32,
}

struct Packer<'a> {
    blocks: &'a [Block],
    body: f32,
    pages: Vec<PagePlan>,
    /// Head of the table currently being laid out
    open_head: Option<usize>,
}

impl Packer<'_> {
    fn page(&mut self) -> &mut PagePlan {
        if self.pages.is_empty() {
            self.pages.push(PagePlan::default());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn cursor(&mut self) -> f32 {
        self.page().used
    }

    fn remaining(&mut self) -> f32 {
        self.body - self.cursor()
    }

    fn new_page(&mut self) {
        self.pages.push(PagePlan::default());
    }

    fn place(&mut self, block: usize, from: f32, to: f32) {
        let page = self.page();
        page.placements.push(Placement {
            block,
            from,
            to,
            y: page.used,
        });
        page.used += to - from;
    }

    fn place_whole(&mut self, index: usize) {
        let height = self.blocks[index].height;
        self.place(index, 0.0, height);
    }

    /// Start a fresh page for table content, repeating the open head
    fn continue_table(&mut self) {
        self.new_page();
        if let Some(head) = self.open_head {
            self.place_whole(head);
        }
    }

    fn pack_row(&mut self, index: usize) {
        let height = self.blocks[index].height;
        if height > self.remaining() && self.cursor() > 0.0 {
            self.continue_table();
        }
        self.place_whole(index);
    }

    fn pack_head(&mut self, index: usize) {
        let head = self.blocks[index].height;
        let first_row = self
            .blocks
            .get(index + 1)
            .filter(|b| b.kind == BlockKind::Row)
            .map(|b| b.height)
            .unwrap_or(0.0);
        if head + first_row > self.remaining() && self.cursor() > 0.0 {
            self.new_page();
        }
        self.place_whole(index);
        self.open_head = Some(index);
    }

    fn pack_flow(&mut self, index: usize) {
        self.open_head = None;
        let block = &self.blocks[index];
        let height = block.height;

        if height <= self.remaining() {
            self.place_whole(index);
            return;
        }
        if block.is_atomic() && height <= self.body {
            self.new_page();
            self.place_whole(index);
            return;
        }

        let breaks = block.breaks.clone();
        let mut from = 0.0_f32;
        while height - from > self.remaining() {
            let remaining = self.remaining();
            let cut = breaks
                .iter()
                .copied()
                .filter(|b| *b > from && *b - from <= remaining)
                .last();
            match cut {
                Some(cut) => {
                    self.place(index, from, cut);
                    from = cut;
                    self.new_page();
                }
                None if self.cursor() > 0.0 => self.new_page(),
                None => {
                    // Nothing fits on an empty page: hard cut at the edge
                    let cut = from + remaining;
                    self.place(index, from, cut);
                    from = cut;
                    self.new_page();
                }
            }
        }
        if height > from {
            self.place(index, from, height);
        }
    }
}

/// Pack blocks into pages. Always returns at least one page.
pub fn paginate(blocks: &[Block], geometry: &PageGeometry) -> Vec<PagePlan> {
    let mut packer = Packer {
        blocks,
        body: geometry.body_height().max(1.0),
        pages: vec![PagePlan::default()],
        open_head: None,
    };
    for (index, block) in blocks.iter().enumerate() {
        match block.kind {
            BlockKind::Row => packer.pack_row(index),
            BlockKind::TableHead => packer.pack_head(index),
            BlockKind::Flow => packer.pack_flow(index),
        }
    }
    // A trailing empty page can only come from a cut landing exactly on the
    // page edge
    if packer.pages.len() > 1 && packer.pages.last().is_some_and(|p| p.placements.is_empty()) {
        packer.pages.pop();
    }
    packer.pages
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::BlockBuilder;
    use proptest::prelude::*;

    const GEOMETRY: PageGeometry = PageGeometry {
        width: 200.0,
        height: 240.0,
        margin: 20.0,
    };

    fn row(height: f32) -> Block {
        Block {
            kind: BlockKind::Row,
            height,
            ..Block::default()
        }
    }

    fn head(height: f32) -> Block {
        Block {
            kind: BlockKind::TableHead,
            height,
            ..Block::default()
        }
    }

    fn flow_lines(lines: usize) -> Block {
        let mut builder = BlockBuilder::new(GEOMETRY.body_width());
        for i in 0..lines {
            builder.line(&format!("line {i}"));
        }
        builder.build()
    }

    fn placements_of(pages: &[PagePlan], block: usize) -> Vec<(usize, Placement)> {
        pages
            .iter()
            .enumerate()
            .flat_map(|(n, p)| p.placements.iter().map(move |pl| (n, *pl)))
            .filter(|(_, pl)| pl.block == block)
            .collect()
    }

    #[test]
    fn test_empty_document_has_one_page() {
        let pages = paginate(&[], &GEOMETRY);
        assert_eq!(pages.len(), 1);
        assert!(pages[0].placements.is_empty());
    }

    #[test]
    fn test_row_moves_to_next_page() {
        // body = 200; 3 rows of 60 fit, the 4th moves
        let blocks = vec![row(60.0), row(60.0), row(60.0), row(60.0)];
        let pages = paginate(&blocks, &GEOMETRY);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].placements.len(), 3);
        assert_eq!(pages[1].placements[0].y, 0.0);
    }

    #[test]
    fn test_head_repeats_on_continuation() {
        let blocks = vec![head(20.0), row(90.0), row(90.0), row(90.0)];
        let pages = paginate(&blocks, &GEOMETRY);
        assert_eq!(pages.len(), 2);
        let first_on_page_2 = pages[1].placements[0];
        assert_eq!(first_on_page_2.block, 0);
        assert_eq!(pages[1].placements[1].block, 3);
    }

    #[test]
    fn test_head_kept_with_first_row() {
        let blocks = vec![Block::spacer(170.0), head(20.0), row(30.0)];
        let pages = paginate(&blocks, &GEOMETRY);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].placements[0].block, 1);
        assert_eq!(pages[1].placements[1].block, 2);
    }

    #[test]
    fn test_flow_cut_at_line_boundary() {
        // 20 lines of 12.5pt = 250pt over a 200pt body
        let blocks = vec![flow_lines(20)];
        let pages = paginate(&blocks, &GEOMETRY);
        assert_eq!(pages.len(), 2);
        let first = pages[0].placements[0];
        assert_eq!(first.to, 200.0);
        assert_eq!(pages[1].placements[0].from, 200.0);
        assert_eq!(pages[1].placements[0].to, 250.0);
    }

    #[test]
    fn test_flow_after_table_does_not_repeat_head() {
        let blocks = vec![head(20.0), row(150.0), flow_lines(10)];
        let pages = paginate(&blocks, &GEOMETRY);
        assert!(pages[1..].iter().all(|p| p.placements.iter().all(|pl| pl.block != 0)));
    }

    #[test]
    fn test_atomic_flow_moves_whole() {
        let mut totals = BlockBuilder::new(GEOMETRY.body_width());
        totals.line("Subtotal").line("Tax").line("Total");
        let blocks = vec![Block::spacer(180.0), totals.build_atomic()];
        let pages = paginate(&blocks, &GEOMETRY);
        assert_eq!(pages.len(), 2);
        assert_eq!(placements_of(&pages, 1).len(), 1);
    }

    #[test]
    fn test_oversized_spacer_hard_cut() {
        let pages = paginate(&[Block::spacer(450.0)], &GEOMETRY);
        assert_eq!(pages.len(), 3);
        let total: f32 = pages.iter().map(|p| p.used).sum();
        assert_eq!(total, 450.0);
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]

        #[test]
        fn rows_are_never_split(
            lead in 0usize..30,
            heights in prop::collection::vec(10.0f32..120.0, 0..80),
            tail in 0usize..40,
        ) {
            let mut blocks = vec![flow_lines(lead), head(18.0)];
            blocks.extend(heights.iter().map(|h| row(*h)));
            blocks.push(flow_lines(tail));
            let pages = paginate(&blocks, &GEOMETRY);
            let body = GEOMETRY.body_height();

            for (index, block) in blocks.iter().enumerate() {
                let placed = placements_of(&pages, index);
                if block.kind == BlockKind::Row {
                    prop_assert_eq!(placed.len(), 1);
                    let (_, pl) = placed[0];
                    prop_assert_eq!(pl.from, 0.0);
                    prop_assert_eq!(pl.to, block.height);
                    prop_assert!(pl.y + block.height <= body + 1e-3);
                }
            }
            for page in &pages {
                prop_assert!(page.used <= body + 1e-3);
            }
            // Rows keep their order across pages
            let order: Vec<usize> = pages
                .iter()
                .flat_map(|p| p.placements.iter())
                .filter(|pl| blocks[pl.block].kind == BlockKind::Row)
                .map(|pl| pl.block)
                .collect();
            prop_assert!(order.windows(2).all(|w| w[0] < w[1]));
        }
    }
}
