//! Image assets for documents
//!
//! Loading goes through [`ImageLoader`] so callers can plug in other
//! sources. Every load is bounded by a timeout; a failed or slow asset is
//! reported as [`RenderDegraded`] and the document renders without it.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use folio_printer::{ImageData, PrintError, decode_data_url, process_image};
use tracing::{debug, warn};

use crate::common::{AppError, AppResult};

/// Pixel bounds assets are downscaled to before embedding
pub const LOGO_MAX_PX: (u32, u32) = (480, 240);
pub const SIGNATURE_MAX_PX: (u32, u32) = (600, 200);

/// Source of encoded image bytes
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load(&self, reference: &str) -> AppResult<Vec<u8>>;
}

/// `data:` URLs decoded in place; anything else read as a file path,
/// relative paths resolved against `base_dir`
#[derive(Debug, Clone, Default)]
pub struct LocalImageLoader {
    base_dir: Option<PathBuf>,
}

impl LocalImageLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
        }
    }
}

#[async_trait]
impl ImageLoader for LocalImageLoader {
    async fn load(&self, reference: &str) -> AppResult<Vec<u8>> {
        let reference = reference.trim();
        if reference.starts_with("data:") {
            return Ok(decode_data_url(reference)?);
        }

        let path = PathBuf::from(reference);
        let path = match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path,
        };
        let bytes = tokio::fs::read(&path).await.map_err(PrintError::from)?;
        Ok(bytes)
    }
}

/// Which document asset an image belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Logo,
    Signature,
}

impl AssetKind {
    fn max_px(self) -> (u32, u32) {
        match self {
            AssetKind::Logo => LOGO_MAX_PX,
            AssetKind::Signature => SIGNATURE_MAX_PX,
        }
    }
}

impl fmt::Display for AssetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetKind::Logo => f.write_str("logo"),
            AssetKind::Signature => f.write_str("signature"),
        }
    }
}

/// Non-fatal: an asset was left out of the document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderDegraded {
    pub asset: AssetKind,
    pub reason: String,
}

impl fmt::Display for RenderDegraded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} omitted: {}", self.asset, self.reason)
    }
}

/// Load and decode one asset; fetch and decode together share `timeout`.
///
/// A decode still running at the deadline is abandoned and finishes on
/// the blocking pool without being used.
pub async fn load_asset(
    loader: &dyn ImageLoader,
    reference: &str,
    kind: AssetKind,
    timeout: Duration,
) -> Result<Arc<ImageData>, RenderDegraded> {
    let degraded = |reason: String| {
        warn!(asset = %kind, %reason, "Rendering without asset");
        RenderDegraded { asset: kind, reason }
    };

    let (max_w, max_h) = kind.max_px();
    let prepared = tokio::time::timeout(timeout, async {
        let bytes = loader.load(reference).await?;
        let image = tokio::task::spawn_blocking(move || process_image(&bytes, max_w, max_h)).await??;
        Ok::<_, AppError>(image)
    })
    .await;

    match prepared {
        Ok(Ok(image)) => {
            debug!(asset = %kind, width = image.width, height = image.height, "Asset ready");
            Ok(Arc::new(image))
        }
        Ok(Err(e)) => Err(degraded(e.to_string())),
        Err(_) => Err(degraded(format!("not ready within {} ms", timeout.as_millis()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;

    struct SlowLoader;

    #[async_trait]
    impl ImageLoader for SlowLoader {
        async fn load(&self, _reference: &str) -> AppResult<Vec<u8>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Vec::new())
        }
    }

    /// Hands back a large encoded image immediately
    struct LargeImageLoader(Vec<u8>);

    #[async_trait]
    impl ImageLoader for LargeImageLoader {
        async fn load(&self, _reference: &str) -> AppResult<Vec<u8>> {
            Ok(self.0.clone())
        }
    }

    fn png_data_url() -> String {
        let img = image::RgbImage::from_pixel(4, 2, image::Rgb([200, 10, 10]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        format!("data:image/png;base64,{}", STANDARD.encode(bytes.into_inner()))
    }

    #[tokio::test]
    async fn test_data_url_loads() {
        let loader = LocalImageLoader::new();
        let image = load_asset(&loader, &png_data_url(), AssetKind::Logo, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!((image.width, image.height), (4, 2));
        assert_eq!(image.rgb.len(), 4 * 2 * 3);
    }

    #[tokio::test]
    async fn test_file_path_relative_to_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let img = image::RgbImage::from_pixel(3, 3, image::Rgb([0, 0, 0]));
        img.save(dir.path().join("logo.png")).unwrap();

        let loader = LocalImageLoader::with_base_dir(dir.path());
        let image = load_asset(&loader, "logo.png", AssetKind::Logo, Duration::from_secs(1))
            .await
            .unwrap();
        assert_eq!(image.width, 3);
    }

    #[tokio::test]
    async fn test_missing_file_degrades() {
        let loader = LocalImageLoader::new();
        let err = load_asset(&loader, "/nonexistent/logo.png", AssetKind::Logo, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.asset, AssetKind::Logo);
    }

    #[tokio::test]
    async fn test_garbage_bytes_degrade() {
        let loader = LocalImageLoader::new();
        let url = format!("data:image/png;base64,{}", STANDARD.encode(b"not an image"));
        let err = load_asset(&loader, &url, AssetKind::Signature, Duration::from_secs(1))
            .await
            .unwrap_err();
        assert_eq!(err.asset, AssetKind::Signature);
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_loader_times_out() {
        let err = load_asset(&SlowLoader, "logo", AssetKind::Logo, Duration::from_millis(3000))
            .await
            .unwrap_err();
        assert!(err.reason.contains("3000 ms"));
    }

    #[tokio::test]
    async fn test_decode_shares_the_time_bound() {
        let img = image::RgbImage::from_fn(4000, 4000, |x, y| image::Rgb([(x % 251) as u8, (y % 241) as u8, 7]));
        let mut bytes = std::io::Cursor::new(Vec::new());
        img.write_to(&mut bytes, image::ImageFormat::Png).unwrap();
        let loader = LargeImageLoader(bytes.into_inner());

        let started = std::time::Instant::now();
        let err = load_asset(&loader, "logo", AssetKind::Logo, Duration::from_millis(5))
            .await
            .unwrap_err();
        assert_eq!(err.asset, AssetKind::Logo);
        assert!(err.reason.contains("5 ms"));
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
