//! Document export service - quote snapshot in, PDF bytes out
//!
//! Reads the quote and profile in one snapshot, loads the logo and
//! signature concurrently, then renders on the blocking pool. Export never
//! writes to the store.

use std::sync::Arc;
use std::time::Duration;

use folio_printer::{ImageData, PageGeometry, PageMode, PrintError};
use shared::models::{PROFILE_KEY, Profile, Quote};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

use super::assets::{AssetKind, ImageLoader, RenderDegraded, load_asset};
use super::renderer::{QuoteDocument, QuoteDocumentRenderer};
use crate::common::{AppError, AppResult};
use crate::store::Storage;

/// Longest client-name fragment kept in a file name
const FILE_NAME_CLIENT_LEN: usize = 15;

/// `Quote_<client>_<folio>.pdf`, client reduced to ASCII alphanumerics
pub fn document_file_name(quote: &Quote) -> String {
    let client: String = quote
        .client_name
        .trim()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .take(FILE_NAME_CLIENT_LEN)
        .collect();
    format!("Quote_{}_{}.pdf", client, quote.folio)
}

/// Finished export
#[derive(Debug, Clone)]
pub struct ExportedDocument {
    pub file_name: String,
    pub bytes: Vec<u8>,
    pub page_count: usize,
    /// Assets left out of the document
    pub degraded: Vec<RenderDegraded>,
}

#[derive(Clone)]
pub struct ExportService {
    storage: Storage,
    loader: Arc<dyn ImageLoader>,
    image_timeout: Duration,
    geometry: PageGeometry,
    mode: PageMode,
}

impl ExportService {
    pub fn new(storage: Storage, loader: Arc<dyn ImageLoader>, image_timeout: Duration) -> Self {
        Self {
            storage,
            loader,
            image_timeout,
            geometry: PageGeometry::LETTER,
            mode: PageMode::Vector,
        }
    }

    pub fn with_page_mode(mut self, mode: PageMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_geometry(mut self, geometry: PageGeometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Render quote `id` to PDF.
    ///
    /// Fails with [`AppError::Cancelled`] when `cancel` fires before the
    /// last page is written; nothing partial is returned.
    #[instrument(skip(self, cancel))]
    pub async fn export_quote(&self, id: &str, cancel: &CancellationToken) -> AppResult<ExportedDocument> {
        let snapshot = self
            .storage
            .read(|scope| Ok((scope.get::<Quote>(id)?, scope.get::<Profile>(PROFILE_KEY)?)))?;
        let (quote, profile) = snapshot.value;
        let quote = quote.ok_or_else(|| AppError::not_found(format!("Quote {id}")))?;
        let profile = profile.unwrap_or_default();

        if cancel.is_cancelled() {
            return Err(AppError::Cancelled);
        }

        let (logo, signature) = futures::future::join(
            self.load_optional(profile.logo.as_deref(), AssetKind::Logo),
            self.load_optional(quote.signature.as_deref(), AssetKind::Signature),
        )
        .await;

        let mut degraded = Vec::new();
        let mut keep = |asset: Option<Result<Arc<ImageData>, RenderDegraded>>| match asset {
            Some(Ok(image)) => Some(image),
            Some(Err(d)) => {
                degraded.push(d);
                None
            }
            None => None,
        };
        let document = QuoteDocument {
            logo: keep(logo),
            signature: keep(signature),
            quote,
            profile,
        };
        let file_name = document_file_name(&document.quote);

        let (geometry, mode) = (self.geometry, self.mode);
        let token = cancel.clone();
        let rendered = tokio::task::spawn_blocking(move || {
            QuoteDocumentRenderer::new(geometry)
                .with_mode(mode)
                .render(&document, &|| token.is_cancelled())
        })
        .await?
        .map_err(|e| match e {
            PrintError::Cancelled => AppError::Cancelled,
            other => AppError::Render(other),
        })?;

        info!(
            file = %file_name,
            pages = rendered.page_count(),
            bytes = rendered.bytes.len(),
            degraded = degraded.len(),
            "Document exported"
        );
        Ok(ExportedDocument {
            file_name,
            page_count: rendered.page_count(),
            bytes: rendered.bytes,
            degraded,
        })
    }

    async fn load_optional(
        &self,
        reference: Option<&str>,
        kind: AssetKind,
    ) -> Option<Result<Arc<ImageData>, RenderDegraded>> {
        let reference = reference.map(str::trim).filter(|r| !r.is_empty())?;
        Some(load_asset(self.loader.as_ref(), reference, kind, self.image_timeout).await)
    }
}
