//! Entry point: loads the datasets, builds every index once, and hands out
//! the shared resolver and per-search-box sessions.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use voicemap::{DataSource, GeocoderConfig, VoiceMap};
//!
//! let map = VoiceMap::builder()
//!     .data_source(DataSource::Directory("./voicemap_data".into()))
//!     .geocoder_config(GeocoderConfig::default())
//!     .nominatim()?
//!     .build()?;
//!
//! println!("{}", map.info().summary());
//! # Ok::<(), voicemap::error::VoiceMapError>(())
//! ```

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};
use voicemap_data_processing::{
    Coordinate, DataSource, DatasetBundle, LoadReport, Region, RegionKind, load_datasets,
};

use crate::backend::{HttpRegionFetcher, LocalOnly, RegionFetcher};
use crate::catalog::RegionCatalog;
use crate::config::{BackendConfig, GeocoderConfig, ResolverConfig, SessionConfig};
use crate::error::Result;
use crate::geocoder::{Geocoder, NominatimGeocoder, NoopGeocoder, ThrottledGeocoder};
use crate::index::RegionSearchIndex;
use crate::postal::PostalIndex;
use crate::search::{PlaceResolver, Suggestion};
use crate::session::SearchSession;

/// One load of the datasets and every index built over it.
///
/// Immutable once built. A retry builds a new snapshot and swaps it into the
/// resolver as a whole.
#[derive(Debug)]
pub struct PlaceIndexes {
    pub catalog: RegionCatalog,
    pub postal: PostalIndex,
    pub text_index: RegionSearchIndex,
    /// What this load found and what failed.
    pub report: LoadReport,
    /// 0 for the first load, incremented on every retry.
    pub load: u64,
}

impl PlaceIndexes {
    #[instrument(name = "Build indexes", skip(bundle, report), level = "info")]
    pub fn build(bundle: DatasetBundle, report: LoadReport, load: u64) -> Result<Self> {
        let t = std::time::Instant::now();
        let DatasetBundle {
            states,
            districts,
            constituencies,
            postal,
        } = bundle;

        let (catalog, postal) = rayon::join(
            || RegionCatalog::new(states, districts, constituencies),
            || PostalIndex::build(postal),
        );
        let text_index = RegionSearchIndex::new(&catalog)?;

        info!(
            elapsed_seconds = ?t.elapsed(),
            regions = catalog.len(),
            postal_points = postal.len(),
            "Indexes built"
        );
        Ok(Self {
            catalog,
            postal,
            text_index,
            report,
            load,
        })
    }
}

/// Loaded datasets, their indexes, and the resolver over them.
///
/// Sessions share the resolver through an `Arc`, so a successful
/// [`retry_failed`](Self::retry_failed) is visible to every session at once.
#[derive(Debug)]
pub struct VoiceMap<G = NoopGeocoder, F = LocalOnly> {
    data_source: DataSource,
    resolver: Arc<PlaceResolver<ThrottledGeocoder<G>, F>>,
    session_config: SessionConfig,
}

impl VoiceMap {
    /// An offline builder: no geocoder, no backend.
    pub fn builder() -> VoiceMapBuilder {
        VoiceMapBuilder::default()
    }

    /// Offline `VoiceMap` over `data_source` with default configuration.
    ///
    /// ```rust,no_run
    /// use voicemap::{DataSource, VoiceMap};
    ///
    /// let map = VoiceMap::initialize(DataSource::default())?;
    /// # Ok::<(), voicemap::error::VoiceMapError>(())
    /// ```
    #[instrument(name = "Initialize VoiceMap", level = "info")]
    pub fn initialize(data_source: DataSource) -> Result<Self> {
        Self::builder().data_source(data_source).build()
    }
}

impl<G: Geocoder, F: RegionFetcher> VoiceMap<G, F> {
    pub fn resolver(&self) -> &PlaceResolver<ThrottledGeocoder<G>, F> {
        &self.resolver
    }

    /// Shorthand for `self.resolver().resolve(query)`.
    pub async fn resolve(&self, query: &str) -> Vec<Suggestion> {
        self.resolver.resolve(query).await
    }

    /// A new search session. Dataset load failures become its banner.
    pub fn session(&self) -> SearchSession<ThrottledGeocoder<G>, F> {
        SearchSession::new(Arc::clone(&self.resolver), self.session_config)
    }

    /// The indexes currently answering queries.
    pub fn indexes(&self) -> Arc<PlaceIndexes> {
        self.resolver.indexes()
    }

    pub fn load_report(&self) -> LoadReport {
        self.indexes().report.clone()
    }

    /// Reloads the datasets if any failed, and swaps the rebuilt indexes
    /// into the resolver. Returns whether every dataset is now loaded.
    ///
    /// Sessions see the new data and banner on their next call. The same
    /// restriction as [`VoiceMapBuilder::build`] applies to remote sources.
    #[instrument(name = "Retry failed datasets", skip(self), level = "info")]
    pub fn retry_failed(&self) -> Result<bool> {
        let current = self.resolver.indexes();
        if current.report.is_complete() {
            debug!("All datasets loaded, nothing to retry");
            return Ok(true);
        }

        let (bundle, report) = load_datasets(&self.data_source);
        let indexes = PlaceIndexes::build(bundle, report, current.load + 1)?;
        let complete = indexes.report.is_complete();
        info!(
            previously_failed = current.report.failures.len(),
            still_failed = indexes.report.failures.len(),
            load = indexes.load,
            "Datasets reloaded"
        );
        self.resolver.replace_indexes(Arc::new(indexes));
        Ok(complete)
    }

    /// Regions under a clicked point, smallest first.
    pub fn regions_at(&self, coordinate: Coordinate, kind: Option<RegionKind>) -> Vec<Region> {
        self.indexes()
            .catalog
            .containing(coordinate, kind)
            .into_iter()
            .cloned()
            .collect()
    }

    pub fn info(&self) -> VoiceMapInfo {
        let indexes = self.indexes();
        VoiceMapInfo {
            data_source: self.data_source.clone(),
            states: indexes.catalog.regions(RegionKind::State).len(),
            districts: indexes.catalog.regions(RegionKind::District).len(),
            constituencies: indexes.catalog.regions(RegionKind::Constituency).len(),
            postal_points: indexes.postal.len(),
            failed_datasets: indexes.report.failures.len(),
        }
    }
}

/// Counts of what a [`VoiceMap`] loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceMapInfo {
    pub data_source: DataSource,
    pub states: usize,
    pub districts: usize,
    pub constituencies: usize,
    pub postal_points: usize,
    pub failed_datasets: usize,
}

impl VoiceMapInfo {
    pub fn summary(&self) -> String {
        format!(
            "VoiceMap from {} with {} states, {} districts, {} constituencies and {} PIN codes ({} datasets failed)",
            self.data_source.dir().display(),
            self.states,
            self.districts,
            self.constituencies,
            self.postal_points,
            self.failed_datasets
        )
    }
}

/// Configures and builds a [`VoiceMap`].
///
/// The geocoder and region fetcher are type parameters so the resolver is
/// monomorphised over them; swapping one returns a builder of a new type.
#[derive(Debug)]
pub struct VoiceMapBuilder<G = NoopGeocoder, F = LocalOnly> {
    data_source: DataSource,
    resolver_config: ResolverConfig,
    geocoder_config: GeocoderConfig,
    session_config: SessionConfig,
    geocoder: G,
    fetcher: F,
}

impl Default for VoiceMapBuilder {
    fn default() -> Self {
        Self {
            data_source: DataSource::default(),
            resolver_config: ResolverConfig::default(),
            geocoder_config: GeocoderConfig::default(),
            session_config: SessionConfig::default(),
            geocoder: NoopGeocoder,
            fetcher: LocalOnly,
        }
    }
}

impl<G, F> VoiceMapBuilder<G, F> {
    pub fn data_source(mut self, data_source: DataSource) -> Self {
        self.data_source = data_source;
        self
    }

    pub fn resolver_config(mut self, config: ResolverConfig) -> Self {
        self.resolver_config = config;
        self
    }

    /// Used by [`nominatim`](Self::nominatim), and for the rate limit of any
    /// geocoder.
    pub fn geocoder_config(mut self, config: GeocoderConfig) -> Self {
        self.geocoder_config = config;
        self
    }

    pub fn session_config(mut self, config: SessionConfig) -> Self {
        self.session_config = config;
        self
    }

    pub fn geocoder<G2>(self, geocoder: G2) -> VoiceMapBuilder<G2, F> {
        VoiceMapBuilder {
            data_source: self.data_source,
            resolver_config: self.resolver_config,
            geocoder_config: self.geocoder_config,
            session_config: self.session_config,
            geocoder,
            fetcher: self.fetcher,
        }
    }

    pub fn region_fetcher<F2>(self, fetcher: F2) -> VoiceMapBuilder<G, F2> {
        VoiceMapBuilder {
            data_source: self.data_source,
            resolver_config: self.resolver_config,
            geocoder_config: self.geocoder_config,
            session_config: self.session_config,
            geocoder: self.geocoder,
            fetcher,
        }
    }

    /// Falls back to OpenStreetMap Nominatim, configured by the current
    /// geocoder config.
    pub fn nominatim(self) -> Result<VoiceMapBuilder<NominatimGeocoder, F>> {
        let geocoder = NominatimGeocoder::new(self.geocoder_config.clone())?;
        Ok(self.geocoder(geocoder))
    }

    /// Resolves regions missing locally through the VoiceMap backend.
    pub fn backend(self, config: &BackendConfig) -> Result<VoiceMapBuilder<G, HttpRegionFetcher>> {
        let fetcher = HttpRegionFetcher::new(config)?;
        Ok(self.region_fetcher(fetcher))
    }
}

impl<G: Geocoder, F: RegionFetcher> VoiceMapBuilder<G, F> {
    /// Loads the datasets and builds every index.
    ///
    /// Dataset failures are not errors: the affected layers stay empty, the
    /// failures are kept in [`VoiceMap::load_report`] and
    /// [`VoiceMap::retry_failed`] loads them again. A remote data
    /// source downloads on a runtime of its own, so this must not be called
    /// from inside an async context in that case.
    #[instrument(name = "Build VoiceMap", skip_all, fields(source = ?self.data_source), level = "info")]
    pub fn build(self) -> Result<VoiceMap<G, F>> {
        let t = std::time::Instant::now();

        let (bundle, report) = load_datasets(&self.data_source);
        if let Some(banner) = report.banner_message() {
            warn!(banner, "Continuing with partial data");
        }
        let indexes = PlaceIndexes::build(bundle, report, 0)?;

        let geocoder = ThrottledGeocoder::new(self.geocoder, self.geocoder_config.effective_min_interval());
        let resolver = PlaceResolver::new(Arc::new(indexes), geocoder, self.fetcher, self.resolver_config);

        info!(elapsed_seconds = ?t.elapsed(), "VoiceMap ready");

        Ok(VoiceMap {
            data_source: self.data_source,
            resolver: Arc::new(resolver),
            session_config: self.session_config,
        })
    }
}

#[cfg(test)]
mod tests {
    use voicemap_data_processing::test_data::fixture;
    use voicemap_data_processing::{DatasetKind, TestDataConfig, create_test_data};

    use super::*;
    use crate::search::SuggestionKind;

    #[test]
    fn test_build_from_fixture_directory() {
        let dir = create_test_data(&TestDataConfig::minimal()).unwrap();
        let map = VoiceMap::initialize(DataSource::Directory(dir.path().to_path_buf())).unwrap();

        let info = map.info();
        assert_eq!(info.states, 4);
        assert_eq!(info.districts, 5);
        assert_eq!(info.constituencies, 5);
        assert_eq!(info.postal_points, 6);
        assert_eq!(info.failed_datasets, 0);
        assert!(map.load_report().is_complete());
        assert!(map.session().banner().is_none());
        assert_eq!(map.indexes().text_index.num_docs(RegionKind::District), 5);
        assert_eq!(map.indexes().load, 0);
    }

    #[test]
    fn test_missing_dataset_surfaces_as_banner() {
        let dir = create_test_data(&TestDataConfig::minimal().without(DatasetKind::Constituencies)).unwrap();
        let map = VoiceMap::initialize(DataSource::Directory(dir.path().to_path_buf())).unwrap();

        assert_eq!(map.info().constituencies, 0);
        assert!(map.load_report().failed(DatasetKind::Constituencies));
        let banner = map.session().banner().unwrap();
        assert!(banner.contains("pc.geojson"), "{banner}");
    }

    #[tokio::test]
    async fn test_retry_loads_repaired_dataset() {
        let dir = create_test_data(&TestDataConfig::minimal().without(DatasetKind::Constituencies)).unwrap();
        let map = VoiceMap::initialize(DataSource::Directory(dir.path().to_path_buf())).unwrap();
        let session = map.session();
        assert!(session.banner().is_some());
        assert!(map.resolve("Bangalore South").await.iter().all(|s| s.kind != SuggestionKind::Constituency));

        // Still missing: the retry fails again and keeps the banner.
        assert!(!map.retry_failed().unwrap());
        assert_eq!(map.indexes().load, 1);
        assert!(session.banner().is_some());

        let pc = DatasetKind::Constituencies;
        std::fs::write(dir.path().join(pc.file_name()), fixture(pc).to_string()).unwrap();
        assert!(map.retry_failed().unwrap());

        assert!(map.load_report().is_complete());
        assert_eq!(map.info().constituencies, 5);
        assert!(session.banner().is_none());
        let suggestions = map.resolve("Bangalore South").await;
        assert_eq!(suggestions[0].kind, SuggestionKind::Constituency);

        // Nothing left to retry.
        assert!(map.retry_failed().unwrap());
        assert_eq!(map.indexes().load, 2);
    }

    #[tokio::test]
    async fn test_resolves_against_loaded_data() {
        let dir = create_test_data(&TestDataConfig::minimal()).unwrap();
        let map = VoiceMap::builder()
            .data_source(DataSource::Directory(dir.path().to_path_buf()))
            .resolver_config(ResolverConfig::builder().suggestion_cap(5).build())
            .build()
            .unwrap();

        let suggestions = map.resolve("Bangalore South").await;
        assert_eq!(suggestions[0].kind, SuggestionKind::Constituency);
        assert_eq!(suggestions[0].label, "Bangalore South");

        let regions = map.regions_at(Coordinate::new(80.95, 26.85), None);
        let names: Vec<&str> = regions.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, ["Lucknow", "Lucknow", "Uttar Pradesh"]);
    }

    #[test]
    fn test_builder_swaps_adapters() {
        let builder = VoiceMap::builder()
            .backend(&BackendConfig::default())
            .unwrap()
            .nominatim()
            .unwrap();
        assert_eq!(builder.geocoder.config().country_codes, "in");
    }
}
