//! Error types for the document library

use thiserror::Error;

/// Document output error types
#[derive(Debug, Error)]
pub enum PrintError {
    /// PDF assembly or serialization failed
    #[error("PDF error: {0}")]
    Pdf(String),

    /// Image could not be decoded
    #[error("Image error: {0}")]
    Image(String),

    /// A page could not be rasterized
    #[error("Raster error: {0}")]
    Raster(String),

    /// Asset reference could not be resolved (bad data URL, missing file)
    #[error("Invalid asset: {0}")]
    InvalidAsset(String),

    /// IO error while reading an asset or writing output
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Rendering was abandoned by the caller
    #[error("Rendering cancelled")]
    Cancelled,
}

/// Result type for document operations
pub type PrintResult<T> = Result<T, PrintError>;
