use std::sync::{Arc, PoisonError, RwLock};

use itertools::Itertools;
use tracing::{debug, instrument, warn};
use voicemap_data_processing::{AdminRefs, Region, RegionKind};

use super::query::SearchQuery;
use super::{Suggestion, SuggestionKind, Viewport, ViewportCommand};
use crate::backend::RegionFetcher;
use crate::config::ResolverConfig;
use crate::core::PlaceIndexes;
use crate::geocoder::{GeocodeHit, Geocoder};
use crate::postal::{PREFIX_LENGTH, PostalPoint, prefix_table};

/// Turns queries into ranked suggestions over the loaded indexes.
///
/// Resolution short-circuits in this order:
/// 1. six digits: exact PIN code (a miss falls back to its three-digit prefix)
/// 2. three to five digits: PIN prefix, then the curated prefix table
/// 3. text: constituencies, districts, then states
/// 4. nothing found for a text query: the geocoder
///
/// Numeric queries never reach the geocoder.
///
/// Each query runs against one snapshot of the indexes; a reload swaps the
/// snapshot without disturbing queries already running.
#[derive(Debug)]
pub struct PlaceResolver<G, F> {
    indexes: RwLock<Arc<PlaceIndexes>>,
    geocoder: G,
    fetcher: F,
    config: ResolverConfig,
}

impl<G, F> PlaceResolver<G, F> {
    pub fn new(indexes: Arc<PlaceIndexes>, geocoder: G, fetcher: F, config: ResolverConfig) -> Self {
        Self {
            indexes: RwLock::new(indexes),
            geocoder,
            fetcher,
            config,
        }
    }

    /// The current snapshot.
    pub fn indexes(&self) -> Arc<PlaceIndexes> {
        Arc::clone(&self.indexes.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replaces the snapshot used by subsequent queries.
    pub fn replace_indexes(&self, indexes: Arc<PlaceIndexes>) {
        *self.indexes.write().unwrap_or_else(PoisonError::into_inner) = indexes;
    }

    pub const fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub const fn geocoder(&self) -> &G {
        &self.geocoder
    }

    pub const fn fetcher(&self) -> &F {
        &self.fetcher
    }
}

impl<G: Geocoder, F: RegionFetcher> PlaceResolver<G, F> {
    /// Ranked suggestions for `query`, best first. Never fails: lookup misses
    /// and geocoder errors both yield fewer (or no) suggestions.
    #[instrument(name = "Resolve query", skip(self), level = "debug")]
    pub async fn resolve(&self, query: &str) -> Vec<Suggestion> {
        let query = SearchQuery::parse(query);
        let indexes = self.indexes();
        let local = match &query {
            SearchQuery::Empty => return Vec::new(),
            SearchQuery::PinCode(code) => self.pin_code_suggestions(&indexes, code),
            SearchQuery::PinPrefix(prefix) => self.pin_prefix_suggestions(&indexes, prefix),
            SearchQuery::LongNumber(digits) => {
                debug!(digits, "Numeric query longer than a PIN code");
                Vec::new()
            }
            SearchQuery::ShortNumber(text) | SearchQuery::Text(text) => self.region_suggestions(&indexes, text),
        };

        let mut suggestions: Vec<Suggestion> = local
            .into_iter()
            .unique_by(|s| (s.kind, s.label.to_lowercase()))
            .collect();

        if suggestions.is_empty()
            && !query.is_numeric()
            && let Some(text) = query.text()
        {
            suggestions = self.geocoder_suggestions(text).await;
        }

        suggestions.truncate(self.config.suggestion_cap);
        debug!(suggestions = suggestions.len(), "Query resolved");
        suggestions
    }

    /// The command for a chosen suggestion.
    ///
    /// Suggestions without a viewport are located by name: first in the local
    /// catalog, then through the region fetcher. If both miss, the command
    /// carries only the name and kind.
    #[instrument(name = "Command for suggestion", skip_all, fields(id = %suggestion.id), level = "debug")]
    pub async fn command_for(&self, suggestion: &Suggestion) -> ViewportCommand {
        let viewport = match suggestion.viewport {
            Some(viewport) => Some(viewport),
            None => self.locate(suggestion).await,
        };
        ViewportCommand {
            name: suggestion.name.clone(),
            kind: suggestion.kind,
            viewport,
            admin_refs: suggestion.admin_refs.clone(),
        }
    }

    fn pin_code_suggestions(&self, indexes: &PlaceIndexes, code: &str) -> Vec<Suggestion> {
        match indexes.postal.lookup_exact(code) {
            Some(point) => {
                debug!(code, "Exact PIN code match");
                vec![self.postal_suggestion(point, self.config.postal_exact_score)]
            }
            None => {
                debug!(code, "PIN code not found, trying its prefix");
                self.pin_prefix_suggestions(indexes, &code[..PREFIX_LENGTH])
            }
        }
    }

    fn pin_prefix_suggestions(&self, indexes: &PlaceIndexes, prefix: &str) -> Vec<Suggestion> {
        let limit = self.config.postal_suggestion_limit;
        let points = indexes.postal.lookup_prefix(prefix, limit);
        if !points.is_empty() {
            return points
                .into_iter()
                .enumerate()
                .map(|(i, point)| self.postal_suggestion(point, self.config.postal_prefix_base - i as f64))
                .collect();
        }

        let localities = prefix_table::localities(prefix);
        debug!(prefix, localities = localities.len(), "No postal points, using curated prefix table");
        localities
            .iter()
            .take(limit)
            .enumerate()
            .map(|(i, locality)| self.prefix_locality_suggestion(indexes, prefix, locality, i))
            .collect()
    }

    fn postal_suggestion(&self, point: &PostalPoint, score: f64) -> Suggestion {
        Suggestion {
            id: format!("postal:{}", point.code),
            kind: SuggestionKind::Postal,
            label: point.display_label(),
            score,
            viewport: Some(Viewport::FlyTo {
                center: point.coordinate,
                zoom: self.config.postal_zoom,
            }),
            name: point.code.clone(),
            admin_refs: (!point.admin_refs.is_empty()).then(|| point.admin_refs.clone()),
        }
    }

    fn prefix_locality_suggestion(
        &self,
        indexes: &PlaceIndexes,
        prefix: &str,
        locality: &str,
        rank: usize,
    ) -> Suggestion {
        let name = prefix_table::primary_name(locality);
        let key = &prefix[..PREFIX_LENGTH];
        let viewport = indexes
            .catalog
            .region_by_name(RegionKind::District, name)
            .and_then(|region| self.region_viewport(region));
        Suggestion {
            id: format!("prefix:{key}:{name}"),
            kind: SuggestionKind::PrefixLocality,
            label: format!("{locality} (pincode prefix {prefix})"),
            score: self.config.postal_prefix_base - rank as f64,
            viewport,
            name: name.to_string(),
            admin_refs: Some(AdminRefs {
                district: Some(name.to_string()),
                prefix: Some(key.to_string()),
                ..AdminRefs::default()
            }),
        }
    }

    /// Constituencies, then districts, then states, until the suggestion cap
    /// is reached; ranked by kind weight less the match dissimilarity.
    fn region_suggestions(&self, indexes: &PlaceIndexes, text: &str) -> Vec<Suggestion> {
        let cap = self.config.suggestion_cap;
        let mut suggestions = Vec::new();

        for kind in RegionKind::SEARCH_ORDER {
            let remaining = cap.saturating_sub(suggestions.len());
            if remaining == 0 {
                break;
            }
            let limit = self.config.per_index_limit.min(remaining);
            let matches = match indexes.text_index.search(
                kind,
                text,
                limit,
                self.config.threshold(kind),
                self.config.fuzzy_search,
            ) {
                Ok(matches) => matches,
                Err(e) => {
                    warn!(error = %e, %kind, "Text index search failed");
                    continue;
                }
            };
            let weight = self.config.kind_weights.weight(kind);
            suggestions.extend(matches.into_iter().filter_map(|m| {
                let region = indexes.catalog.region(kind, m.ordinal)?;
                let score = weight - 100.0 * m.dissimilarity;
                Some(self.region_suggestion(region, m.ordinal, score))
            }));
        }

        // Stable: equal scores keep constituency, district, state order.
        suggestions.sort_by(|a, b| b.score.total_cmp(&a.score));
        suggestions
    }

    fn region_suggestion(&self, region: &Region, ordinal: usize, score: f64) -> Suggestion {
        Suggestion {
            id: format!("{}:{ordinal}", region.kind.backend_type()),
            kind: region.kind.into(),
            label: region.name.clone(),
            score,
            viewport: self.region_viewport(region),
            name: region.name.clone(),
            admin_refs: region.state.as_ref().map(|state| AdminRefs {
                state: Some(state.clone()),
                ..AdminRefs::default()
            }),
        }
    }

    fn region_viewport(&self, region: &Region) -> Option<Viewport> {
        region
            .bbox
            .map(|bbox| Viewport::from_bounds(bbox, self.config.place_zoom))
            .or_else(|| {
                region.centroid.map(|center| Viewport::FlyTo {
                    center,
                    zoom: self.config.place_zoom,
                })
            })
    }

    async fn geocoder_suggestions(&self, text: &str) -> Vec<Suggestion> {
        match self.geocoder.search(text).await {
            Ok(hits) => {
                debug!(hits = hits.len(), "Falling back to geocoder results");
                hits.into_iter()
                    .enumerate()
                    .map(|(i, hit)| self.geocoder_suggestion(hit, i))
                    .collect()
            }
            Err(e) => {
                warn!(error = %e, "Geocoder failed, no suggestions");
                Vec::new()
            }
        }
    }

    fn geocoder_suggestion(&self, hit: GeocodeHit, rank: usize) -> Suggestion {
        let viewport = match hit.bbox {
            Some(bbox) if !bbox.is_degenerate() => Viewport::FitBounds { bbox },
            _ => Viewport::FlyTo {
                center: hit.center,
                zoom: self.config.place_zoom,
            },
        };
        Suggestion {
            id: format!("nominatim:{rank}"),
            kind: SuggestionKind::Nominatim,
            score: self.config.geocoder_base - rank as f64,
            viewport: Some(viewport),
            name: hit.label.clone(),
            label: hit.label,
            admin_refs: None,
        }
    }

    async fn locate(&self, suggestion: &Suggestion) -> Option<Viewport> {
        let kind = suggestion.kind.region_kind()?;
        if let Some(viewport) = self
            .indexes()
            .catalog
            .region_by_name(kind, &suggestion.name)
            .and_then(|region| self.region_viewport(region))
        {
            return Some(viewport);
        }

        match self.fetcher.fetch_region(kind, &suggestion.name).await {
            Ok(Some(region)) => {
                debug!(name = %region.name, "Region located through backend");
                self.region_viewport(&region)
            }
            Ok(None) => {
                debug!(name = %suggestion.name, "Region not found anywhere");
                None
            }
            Err(e) => {
                warn!(error = %e, name = %suggestion.name, "Region fetch failed");
                None
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use voicemap_data_processing::{BoundingBox, Coordinate};

    use super::*;
    use crate::backend::FetchError;
    use crate::geocoder::ThrottledGeocoder;
    use crate::geocoder::tests::RecordingGeocoder;
    use crate::test_support::fixture_indexes;

    /// Counts fetches; knows a single district named "Kanpur".
    #[derive(Debug, Default)]
    pub(crate) struct CountingFetcher {
        pub calls: AtomicUsize,
    }

    impl CountingFetcher {
        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl RegionFetcher for CountingFetcher {
        async fn fetch_region(&self, kind: RegionKind, name: &str) -> Result<Option<Region>, FetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if kind != RegionKind::District || name != "Kanpur" {
                return Ok(None);
            }
            let mut region = Region::new(kind, "Kanpur", Some("Uttar Pradesh".into()), None, Default::default());
            region.bbox = Some(BoundingBox::from_corners(
                Coordinate::new(80.1, 26.3),
                Coordinate::new(80.5, 26.6),
            ));
            Ok(Some(region))
        }
    }

    pub(crate) type TestResolver = PlaceResolver<ThrottledGeocoder<RecordingGeocoder>, CountingFetcher>;

    pub(crate) fn fixture_resolver(geocoder: RecordingGeocoder) -> TestResolver {
        PlaceResolver::new(
            Arc::new(fixture_indexes()),
            ThrottledGeocoder::new(geocoder, Duration::from_secs(1)),
            CountingFetcher::default(),
            ResolverConfig::default(),
        )
    }

    fn labels(suggestions: &[Suggestion]) -> Vec<&str> {
        suggestions.iter().map(|s| s.label.as_str()).collect()
    }

    #[tokio::test]
    async fn test_exact_pin_code_short_circuits() {
        let resolver = fixture_resolver(RecordingGeocoder::default());
        let suggestions = resolver.resolve("560001").await;

        assert_eq!(suggestions.len(), 1);
        let top = &suggestions[0];
        assert_eq!(top.kind, SuggestionKind::Postal);
        assert_eq!(top.id, "postal:560001");
        assert_eq!(top.score, 100.0);
        assert_eq!(
            top.viewport,
            Some(Viewport::FlyTo {
                center: Coordinate::new(77.59, 12.97),
                zoom: 16.0
            })
        );
        assert_eq!(resolver.geocoder().inner().calls(), 0);
    }

    #[tokio::test]
    async fn test_spaced_pin_code() {
        let resolver = fixture_resolver(RecordingGeocoder::default());
        let suggestions = resolver.resolve(" 110 001 ").await;
        assert_eq!(labels(&suggestions), ["110001 (Connaught Place)"]);
        assert_eq!(
            suggestions[0].admin_refs.as_ref().and_then(|r| r.district.as_deref()),
            Some("New Delhi")
        );
    }

    #[tokio::test]
    async fn test_pin_prefix_in_dataset_order() {
        let resolver = fixture_resolver(RecordingGeocoder::default());
        let suggestions = resolver.resolve("110").await;

        let ids: Vec<&str> = suggestions.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, ["postal:110001", "postal:110002", "postal:110045"]);
        let scores: Vec<f64> = suggestions.iter().map(|s| s.score).collect();
        assert_eq!(scores, [80.0, 79.0, 78.0]);
    }

    #[tokio::test]
    async fn test_missing_pin_code_falls_back_to_prefix() {
        let resolver = fixture_resolver(RecordingGeocoder::default());
        let suggestions = resolver.resolve("110099").await;
        assert_eq!(suggestions.len(), 3);
        assert!(suggestions.iter().all(|s| s.kind == SuggestionKind::Postal));
    }

    #[tokio::test]
    async fn test_unknown_prefix_uses_curated_table() {
        let resolver = fixture_resolver(RecordingGeocoder::default());
        let suggestions = resolver.resolve("208").await;

        assert_eq!(
            labels(&suggestions),
            ["Kanpur (pincode prefix 208)", "Kanpur Nagar (pincode prefix 208)"]
        );
        assert!(suggestions.iter().all(|s| s.kind == SuggestionKind::PrefixLocality));
        // Kanpur Nagar is a loaded district; Kanpur is not.
        assert!(suggestions[0].viewport.is_none());
        assert!(matches!(suggestions[1].viewport, Some(Viewport::FitBounds { .. })));
        assert_eq!(
            suggestions[0].admin_refs.as_ref().and_then(|r| r.prefix.as_deref()),
            Some("208")
        );
        assert_eq!(resolver.geocoder().inner().calls(), 0);
    }

    #[tokio::test]
    async fn test_numeric_queries_never_geocode() {
        let resolver = fixture_resolver(RecordingGeocoder::default());
        assert!(resolver.resolve("999").await.is_empty());
        assert!(resolver.resolve("99").await.is_empty());
        assert!(resolver.resolve("1234567").await.is_empty());
        assert_eq!(resolver.geocoder().inner().calls(), 0);
    }

    #[tokio::test]
    async fn test_text_ranks_by_kind_weight() {
        let resolver = fixture_resolver(RecordingGeocoder::default());
        let suggestions = resolver.resolve("lucknow").await;

        assert!(suggestions.len() >= 2);
        assert_eq!(suggestions[0].kind, SuggestionKind::Constituency);
        assert_eq!(suggestions[0].label, "Lucknow");
        assert_eq!(suggestions[0].score, 100.0);
        assert_eq!(suggestions[1].kind, SuggestionKind::District);
        assert_eq!(suggestions[1].score, 80.0);
        assert!(matches!(suggestions[0].viewport, Some(Viewport::FitBounds { .. })));
        assert_eq!(resolver.geocoder().inner().calls(), 0);
    }

    #[tokio::test]
    async fn test_misspelled_state() {
        let resolver = fixture_resolver(RecordingGeocoder::default());
        let suggestions = resolver.resolve("Karnatka").await;

        let state = suggestions
            .iter()
            .find(|s| s.kind == SuggestionKind::State)
            .unwrap();
        assert_eq!(state.label, "Karnataka");
        assert!(state.score < 60.0);
    }

    #[tokio::test]
    async fn test_suggestion_cap() {
        let resolver = PlaceResolver::new(
            Arc::new(fixture_indexes()),
            crate::geocoder::NoopGeocoder,
            crate::backend::LocalOnly,
            ResolverConfig::builder().suggestion_cap(1).build(),
        );
        let suggestions = resolver.resolve("new delhi").await;
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].kind, SuggestionKind::Constituency);
    }

    #[tokio::test]
    async fn test_replaced_indexes_answer_new_queries() {
        let empty = PlaceIndexes::build(
            voicemap_data_processing::DatasetBundle::default(),
            voicemap_data_processing::LoadReport::default(),
            0,
        )
        .unwrap();
        let resolver = PlaceResolver::new(
            Arc::new(empty),
            crate::geocoder::NoopGeocoder,
            crate::backend::LocalOnly,
            ResolverConfig::default(),
        );
        assert!(resolver.resolve("lucknow").await.is_empty());

        resolver.replace_indexes(Arc::new(fixture_indexes()));
        let suggestions = resolver.resolve("lucknow").await;
        assert_eq!(suggestions[0].label, "Lucknow");
        assert_eq!(resolver.indexes().catalog.regions(RegionKind::District).len(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_geocoder_fallback_is_cached() {
        let resolver = fixture_resolver(RecordingGeocoder::default());

        let first = resolver.resolve("xyzqqq123").await;
        let second = resolver.resolve("xyzqqq123").await;

        assert_eq!(first, second);
        assert_eq!(labels(&first), ["xyzqqq123, India"]);
        assert_eq!(first[0].kind, SuggestionKind::Nominatim);
        assert_eq!(first[0].score, 40.0);
        assert_eq!(
            first[0].viewport,
            Some(Viewport::FlyTo {
                center: Coordinate::new(78.0, 21.0),
                zoom: 14.0
            })
        );
        assert_eq!(resolver.geocoder().inner().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_geocoder_failure_degrades_to_empty() {
        let resolver = fixture_resolver(RecordingGeocoder {
            fail: true,
            ..RecordingGeocoder::default()
        });
        assert!(resolver.resolve("xyzqqq123").await.is_empty());
    }

    #[tokio::test]
    async fn test_command_uses_catalog_then_fetcher() {
        let resolver = fixture_resolver(RecordingGeocoder::default());
        let suggestions = resolver.resolve("208").await;

        let nagar = resolver.command_for(&suggestions[1]).await;
        assert_eq!(nagar.name, "Kanpur Nagar");
        assert!(matches!(nagar.viewport, Some(Viewport::FitBounds { .. })));
        assert_eq!(resolver.fetcher().calls(), 0);

        let kanpur = resolver.command_for(&suggestions[0]).await;
        assert_eq!(kanpur.kind, SuggestionKind::PrefixLocality);
        assert_eq!(
            kanpur.viewport,
            Some(Viewport::FitBounds {
                bbox: BoundingBox::from_corners(Coordinate::new(80.1, 26.3), Coordinate::new(80.5, 26.6))
            })
        );
        assert_eq!(resolver.fetcher().calls(), 1);
    }

    #[tokio::test]
    async fn test_command_without_geometry_keeps_name() {
        let resolver = fixture_resolver(RecordingGeocoder::default());
        let orphan = Suggestion {
            id: "district:99".into(),
            kind: SuggestionKind::District,
            label: "Nowhere".into(),
            score: 50.0,
            viewport: None,
            name: "Nowhere".into(),
            admin_refs: None,
        };

        let command = resolver.command_for(&orphan).await;
        assert_eq!(command.name, "Nowhere");
        assert_eq!(command.kind, SuggestionKind::District);
        assert!(command.viewport.is_none());
        assert_eq!(resolver.fetcher().calls(), 1);
    }
}
