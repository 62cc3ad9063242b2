//! Quote document printing
//!
//! - `renderer`: quote → blocks → paginated PDF
//! - `assets`: logo and signature loading with a time bound
//! - `service`: export of a stored quote
//! - `sink`: where finished documents are written

pub mod assets;
pub mod renderer;
pub mod service;
pub mod sink;

pub use assets::{AssetKind, ImageLoader, LocalImageLoader, RenderDegraded, load_asset};
pub use renderer::{QuoteDocument, QuoteDocumentRenderer, RenderedDocument};
pub use service::{ExportService, ExportedDocument, document_file_name};
pub use sink::{DocumentSink, FileSink};
