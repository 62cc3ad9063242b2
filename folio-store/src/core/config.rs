use std::path::PathBuf;
use std::time::Duration;

use folio_printer::PageMode;

/// Application configuration
///
/// # Environment variables
///
/// Every field can be overridden from the environment (a `.env` file is
/// loaded first when present):
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | FOLIO_WORK_DIR | ./folio-data | Work directory (database, logs, exports) |
/// | FOLIO_DB_FILE | folio.redb | Database file name inside the work dir |
/// | LOG_LEVEL | info | Default log level |
/// | LOG_JSON | false | JSON log output |
/// | IMAGE_LOAD_TIMEOUT_MS | 3000 | Bound on each logo/signature load |
/// | LIVE_QUERY_DEBOUNCE_MS | 5 | Coalescing window for live queries |
/// | EXPORT_DIR | `<work_dir>/exports` | Where exported documents are written |
/// | RASTER_PAGES | false | Export every page as one bitmap instead of vector text |
/// | RASTER_DPI | 144 | Bitmap resolution when `RASTER_PAGES` is set |
///
/// # Example
///
/// ```ignore
/// FOLIO_WORK_DIR=/data/folio LOG_LEVEL=debug folio quotes list
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// Work directory for the database, logs and exports
    pub work_dir: String,
    pub db_file: String,
    pub log_level: String,
    pub log_json: bool,
    /// Image asset load bound (milliseconds)
    pub image_load_timeout_ms: u64,
    /// Live query coalescing window (milliseconds)
    pub live_query_debounce_ms: u64,
    pub export_dir: Option<String>,
    /// Image-only pages in exported PDFs
    pub raster_pages: bool,
    pub raster_dpi: u32,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable variables fall back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            work_dir: std::env::var("FOLIO_WORK_DIR").unwrap_or(defaults.work_dir),
            db_file: std::env::var("FOLIO_DB_FILE").unwrap_or(defaults.db_file),
            log_level: std::env::var("LOG_LEVEL").unwrap_or(defaults.log_level),
            log_json: std::env::var("LOG_JSON")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.log_json),
            image_load_timeout_ms: std::env::var("IMAGE_LOAD_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.image_load_timeout_ms),
            live_query_debounce_ms: std::env::var("LIVE_QUERY_DEBOUNCE_MS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.live_query_debounce_ms),
            export_dir: std::env::var("EXPORT_DIR").ok(),
            raster_pages: std::env::var("RASTER_PAGES")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.raster_pages),
            raster_dpi: std::env::var("RASTER_DPI")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|dpi| *dpi > 0)
                .unwrap_or(defaults.raster_dpi),
        }
    }

    /// Defaults with a different work directory (tests, CLI `--work-dir`)
    pub fn with_work_dir(work_dir: impl Into<String>) -> Self {
        Self {
            work_dir: work_dir.into(),
            ..Self::default()
        }
    }

    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join(&self.db_file)
    }

    pub fn log_dir(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join("logs")
    }

    pub fn export_dir(&self) -> PathBuf {
        match &self.export_dir {
            Some(dir) => PathBuf::from(dir),
            None => PathBuf::from(&self.work_dir).join("exports"),
        }
    }

    pub fn image_load_timeout(&self) -> Duration {
        Duration::from_millis(self.image_load_timeout_ms)
    }

    pub fn live_query_debounce(&self) -> Duration {
        Duration::from_millis(self.live_query_debounce_ms)
    }

    pub fn page_mode(&self) -> PageMode {
        if self.raster_pages {
            PageMode::Raster { dpi: self.raster_dpi }
        } else {
            PageMode::Vector
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            work_dir: "./folio-data".into(),
            db_file: "folio.redb".into(),
            log_level: "info".into(),
            log_json: false,
            image_load_timeout_ms: 3000,
            live_query_debounce_ms: 5,
            export_dir: None,
            raster_pages: false,
            raster_dpi: 144,
        }
    }
}
