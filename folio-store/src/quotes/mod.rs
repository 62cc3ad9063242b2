//! Quotes: calculation engine, folio sequencing and lifecycle

pub mod folio;
pub mod money;
pub mod service;
pub mod templates;

pub use folio::{FolioSequencer, format_folio};
pub use money::{LineAmount, QuoteTotals, calculate_totals, format_money, round_for_display, suggest_price};
pub use service::{QuoteService, SavedQuote};
