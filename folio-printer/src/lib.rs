//! # folio-printer
//!
//! Paged document library - low-level layout and output only.
//!
//! ## Scope
//!
//! This crate handles HOW to lay out and print:
//! - Helvetica text metrics, truncation and word wrapping
//! - Block building (text, rules, fills, images) with cut points
//! - Row-aware pagination onto fixed-size pages
//! - PDF output, as vector pages or one bitmap per page
//! - Image/logo decoding
//!
//! Business logic (WHAT to print) stays in application code:
//! - Quote document layout → folio-store
//!
//! ## Example
//!
//! ```ignore
//! use folio_printer::{BlockBuilder, Cell, PageGeometry, PdfWriter, paginate};
//!
//! let width = PageGeometry::LETTER.body_width();
//!
//! let mut header = BlockBuilder::new(width);
//! header.size(18.0).bold().line("Acme Services").bold_off();
//!
//! let mut row = BlockBuilder::new(width);
//! row.cells(&[Cell::new("Pipe fitting", 0.0, 300.0).wrap(4)], 4.0, None);
//!
//! let blocks = vec![header.build(), row.build_row()];
//! let pages = paginate(&blocks, &PageGeometry::LETTER);
//! let pdf = PdfWriter::new("Quote 0007", PageGeometry::LETTER).write(&blocks, &pages, &|| false)?;
//! ```

mod asset;
mod block;
mod error;
mod metrics;
mod paginate;
mod pdf;
#[cfg(feature = "raster")]
mod raster;

// Re-exports
pub use block::{Align, Block, BlockBuilder, BlockKind, Cell, Color, DrawOp, ImageData, fit_within};
pub use error::{PrintError, PrintResult};
pub use asset::decode_data_url;
pub use metrics::{line_height, text_width, truncate_to_width, wrap_text};
pub use paginate::{PageGeometry, PagePlan, Placement, paginate};
pub use pdf::{PageMode, PdfWriter};

#[cfg(feature = "image")]
pub use asset::process_image;
