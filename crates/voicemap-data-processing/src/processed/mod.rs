use std::fmt;
use std::path::Path;

use itertools::Itertools;
use tracing::{info, info_span, instrument, warn};

use crate::Result;
use crate::raw::{DataSource, DatasetKind, ensure_datasets, read_dataset};
use crate::region::{PostalRecord, Region, RegionKind};

pub mod features;

pub use features::{
    Feature, parse_feature_collection, postal_records_from_features, regions_from_features,
};

/// Everything loaded from one data directory.
#[derive(Debug, Clone, Default)]
pub struct DatasetBundle {
    pub states: Vec<Region>,
    pub districts: Vec<Region>,
    pub constituencies: Vec<Region>,
    pub postal: Vec<PostalRecord>,
}

impl DatasetBundle {
    pub fn regions(&self, kind: RegionKind) -> &[Region] {
        match kind {
            RegionKind::State => &self.states,
            RegionKind::District => &self.districts,
            RegionKind::Constituency => &self.constituencies,
        }
    }

    fn regions_mut(&mut self, kind: RegionKind) -> &mut Vec<Region> {
        match kind {
            RegionKind::State => &mut self.states,
            RegionKind::District => &mut self.districts,
            RegionKind::Constituency => &mut self.constituencies,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetFailure {
    pub dataset: DatasetKind,
    pub message: String,
}

impl fmt::Display for DatasetFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.dataset.file_name(), self.message)
    }
}

/// Outcome of a load: per-dataset feature counts and failures.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub loaded: Vec<(DatasetKind, usize)>,
    pub failures: Vec<DatasetFailure>,
}

impl LoadReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failed(&self, dataset: DatasetKind) -> bool {
        self.failures.iter().any(|f| f.dataset == dataset)
    }

    /// User-facing summary of the failures, if any.
    pub fn banner_message(&self) -> Option<String> {
        if self.failures.is_empty() {
            return None;
        }
        Some(format!(
            "Some map data failed to load ({}). Search results may be incomplete.",
            self.failures.iter().map(|f| f.dataset.file_name()).join(", ")
        ))
    }

    fn record_failure(&mut self, dataset: DatasetKind, message: impl Into<String>) {
        self.failures.push(DatasetFailure {
            dataset,
            message: message.into(),
        });
    }
}

/// Loads every dataset the source provides.
///
/// Never fails as a whole: a dataset that cannot be read or parsed is left
/// empty and recorded in the [`LoadReport`].
#[instrument(name = "Load datasets", skip_all, level = "info")]
pub fn load_datasets(source: &DataSource) -> (DatasetBundle, LoadReport) {
    match ensure_datasets(source) {
        Ok(dir) => load_datasets_from_dir(&dir),
        Err(e) => {
            warn!(error = %e, "Could not obtain datasets");
            let mut report = LoadReport::default();
            for dataset in DatasetKind::ALL {
                report.record_failure(dataset, e.to_string());
            }
            (DatasetBundle::default(), report)
        }
    }
}

pub fn load_datasets_from_dir(dir: &Path) -> (DatasetBundle, LoadReport) {
    let t = std::time::Instant::now();
    let mut bundle = DatasetBundle::default();
    let mut report = LoadReport::default();

    for dataset in DatasetKind::ALL {
        let _span = info_span!("Load dataset", file = dataset.file_name()).entered();
        let features = match read_features(dir, dataset) {
            Ok(features) => features,
            Err(e) => {
                warn!(error = %e, "Dataset failed to load");
                report.record_failure(dataset, e.to_string());
                continue;
            }
        };
        let count = features.len();
        match dataset.region_kind() {
            Some(kind) => *bundle.regions_mut(kind) = regions_from_features(kind, features),
            None => bundle.postal = postal_records_from_features(features),
        }
        report.loaded.push((dataset, count));
    }

    info!(
        states = bundle.states.len(),
        districts = bundle.districts.len(),
        constituencies = bundle.constituencies.len(),
        postal = bundle.postal.len(),
        failures = report.failures.len(),
        elapsed_seconds = ?t.elapsed(),
        "Datasets loaded"
    );
    (bundle, report)
}

fn read_features(dir: &Path, dataset: DatasetKind) -> Result<Vec<Feature>> {
    parse_feature_collection(read_dataset(dir, dataset)?)
}
