//! Folio Store - local-first quotes and invoices
//!
//! # Architecture
//!
//! Everything runs against one embedded redb file. Services write through
//! [`Storage`]; every commit bumps a version counter and publishes the
//! tables it touched, which drives the live query layer.
//!
//! - **Store** (`store`): transactional table access, change notifications
//! - **Live queries** (`live`): reactive views recomputed on relevant commits
//! - **Quotes** (`quotes`): folio sequencing, money arithmetic, drafts
//! - **Services** (`services`): catalog, profile, backup import/export
//! - **Printing** (`printing`): paginated PDF documents
//!
//! # Module layout
//!
//! ```text
//! folio-store/src/
//! ├── common/        # errors, logging
//! ├── core/          # config, application state
//! ├── store/         # redb tables, scopes, versions
//! ├── live/          # live query registry and dispatcher
//! ├── quotes/        # folio, money, templates, quote service
//! ├── services/      # catalog, profile, backup
//! ├── printing/      # renderer, assets, export, sinks
//! └── utils/         # validation helpers
//! ```

pub mod common;
pub mod core;
pub mod live;
pub mod printing;
pub mod quotes;
pub mod services;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use common::{AppError, AppResult};
pub use core::{AppState, Config};
pub use live::{LiveQueries, Subscription};
pub use printing::{ExportService, ExportedDocument};
pub use quotes::{FolioSequencer, QuoteService, SavedQuote};
pub use services::{BackupService, CatalogService, ImportSummary, ProfileService};
pub use store::{Storage, TableName};

// Re-export logger functions
pub use common::logger::{cleanup_old_logs, init_logger, init_logger_with_file};

/// Audit log entry, routed to the permanent audit log files
///
/// ```ignore
/// audit_log!(action = "quote.delete", id = %id);
/// ```
#[macro_export]
macro_rules! audit_log {
    ($($arg:tt)+) => {
        ::tracing::info!(target: "audit", $($arg)+)
    };
}
