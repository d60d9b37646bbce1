use once_cell::sync::Lazy;
use std::path::PathBuf;
use tracing::debug;

pub mod attributes;
pub mod geometry;
pub mod processed;
pub mod raw;
pub mod region;
pub mod test_data;

pub const DATA_DIR_DEFAULT: &str = "./voicemap_data";

/// Environment variable that overrides the dataset directory.
pub const DATA_DIR_ENV: &str = "VOICEMAP_DATA_DIR";

/// Directory the GeoJSON datasets are read from (and downloaded into).
///
/// Resolution order: `VOICEMAP_DATA_DIR`, then the platform data directory when
/// the `system-dirs` feature is enabled, then `./voicemap_data`.
pub static DATA_DIR: Lazy<PathBuf> = Lazy::new(|| {
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        debug!(dir, "Using data directory from environment");
        return PathBuf::from(dir);
    }
    #[cfg(feature = "system-dirs")]
    if let Some(dirs) = directories::ProjectDirs::from("org", "voicemap", "voicemap") {
        return dirs.data_dir().to_path_buf();
    }
    PathBuf::from(DATA_DIR_DEFAULT)
});

pub fn get_data_dir() -> &'static std::path::Path {
    DATA_DIR.as_path()
}

mod error {
    use std::path::PathBuf;
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum DataError {
        #[error("IO error: {0}")]
        Io(#[from] std::io::Error),
        #[error("Serialization error: {0}")]
        Serde(#[from] serde_json::Error),
        #[cfg(feature = "download_data")]
        #[error("HTTP error: {0}")]
        Http(#[from] reqwest::Error),
        #[cfg(feature = "download_data")]
        #[error("Join error: {0}")]
        JoinError(#[from] tokio::task::JoinError),
        #[error("Not a GeoJSON FeatureCollection: {0}")]
        InvalidFeatureCollection(String),
        #[error("Dataset not found: {}", .0.display())]
        DatasetNotFound(PathBuf),
        #[error("No data directory provided and download_data feature is disabled")]
        NoDataDirProvided,
    }

    pub type Result<T> = std::result::Result<T, DataError>;
}

pub use error::{DataError, Result};

pub use attributes::probe_str;
pub use geometry::{BoundingBox, Coordinate, Geometry, bounds_from_value};
pub use processed::{DatasetBundle, LoadReport, load_datasets};
pub use raw::{DataSource, DatasetKind};
pub use region::{AdminRefs, PostalRecord, Region, RegionKind};
pub use test_data::{TestDataConfig, create_test_data};
