use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::region::RegionKind;
use crate::{DataError, Result};

#[cfg(feature = "download_data")]
pub mod fetch;

/// The four GeoJSON files a VoiceMap deployment ships.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DatasetKind {
    States,
    Districts,
    Constituencies,
    PostalPoints,
}

impl DatasetKind {
    pub const ALL: [Self; 4] = [
        Self::States,
        Self::Districts,
        Self::Constituencies,
        Self::PostalPoints,
    ];

    pub const fn file_name(self) -> &'static str {
        match self {
            Self::States => "states.geojson",
            Self::Districts => "districts.geojson",
            Self::Constituencies => "pc.geojson",
            Self::PostalPoints => "pincode.points.geojson",
        }
    }

    pub const fn region_kind(self) -> Option<RegionKind> {
        match self {
            Self::States => Some(RegionKind::State),
            Self::Districts => Some(RegionKind::District),
            Self::Constituencies => Some(RegionKind::Constituency),
            Self::PostalPoints => None,
        }
    }

    pub const fn for_region(kind: RegionKind) -> Self {
        match kind {
            RegionKind::State => Self::States,
            RegionKind::District => Self::Districts,
            RegionKind::Constituency => Self::Constituencies,
        }
    }
}

/// Where datasets come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    /// Files already on disk.
    Directory(PathBuf),
    /// Files served under `base_url`, cached in `cache_dir`.
    Remote { base_url: String, cache_dir: PathBuf },
}

impl Default for DataSource {
    fn default() -> Self {
        Self::Directory(crate::get_data_dir().to_path_buf())
    }
}

impl DataSource {
    pub fn base_url(&self) -> Option<&str> {
        match self {
            Self::Directory(_) => None,
            Self::Remote { base_url, .. } => Some(base_url),
        }
    }

    pub fn dir(&self) -> &Path {
        match self {
            Self::Directory(dir) | Self::Remote { cache_dir: dir, .. } => dir,
        }
    }
}

/// Makes sure the dataset files are on disk and returns their directory.
///
/// A directory source is returned as is; missing files surface later, per
/// dataset. A remote source downloads every file missing from the cache.
#[instrument(name = "Resolve dataset directory", skip_all, level = "info")]
pub fn ensure_datasets(source: &DataSource) -> Result<PathBuf> {
    let dir = source.dir().to_path_buf();
    let missing: Vec<DatasetKind> = DatasetKind::ALL
        .into_iter()
        .filter(|kind| !dir.join(kind.file_name()).exists())
        .collect();

    if missing.is_empty() {
        info!(dir = %dir.display(), "Found all dataset files");
        return Ok(dir);
    }

    let Some(base_url) = source.base_url() else {
        warn!(dir = %dir.display(), ?missing, "Dataset files missing");
        return Ok(dir);
    };

    #[cfg(feature = "download_data")]
    {
        info!(base_url, ?missing, "Downloading missing datasets");
        fetch::download_datasets(base_url, &dir, &missing)?;
        Ok(dir)
    }
    #[cfg(not(feature = "download_data"))]
    {
        warn!(base_url, "download_data feature is disabled. Cannot download missing files.");
        Err(DataError::NoDataDirProvided)
    }
}

/// Reads one dataset file as raw JSON.
pub fn read_dataset(dir: &Path, kind: DatasetKind) -> Result<Value> {
    let path = dir.join(kind.file_name());
    if !path.exists() {
        return Err(DataError::DatasetNotFound(path));
    }
    let reader = BufReader::new(File::open(&path)?);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_data::{TestDataConfig, create_test_data};

    #[test]
    fn test_read_dataset_parses_fixture_files() {
        let dir = create_test_data(&TestDataConfig::minimal()).unwrap();
        for kind in DatasetKind::ALL {
            let value = read_dataset(dir.path(), kind).unwrap();
            assert_eq!(value["type"], "FeatureCollection", "{kind:?}");
        }
    }

    #[test]
    fn test_read_dataset_reports_missing_file() {
        let dir = create_test_data(&TestDataConfig::minimal().without(DatasetKind::Districts)).unwrap();
        let err = read_dataset(dir.path(), DatasetKind::Districts).unwrap_err();
        assert!(matches!(err, DataError::DatasetNotFound(path) if path.ends_with("districts.geojson")));
    }

    #[test]
    fn test_ensure_datasets_keeps_local_directory() {
        let dir = create_test_data(&TestDataConfig::minimal().without(DatasetKind::States)).unwrap();
        let source = DataSource::Directory(dir.path().to_path_buf());
        assert_eq!(ensure_datasets(&source).unwrap(), dir.path());
    }

    #[test]
    fn test_dataset_kind_maps_to_region_kind() {
        for kind in RegionKind::SEARCH_ORDER {
            assert_eq!(DatasetKind::for_region(kind).region_kind(), Some(kind));
        }
        assert_eq!(DatasetKind::PostalPoints.region_kind(), None);
    }
}
