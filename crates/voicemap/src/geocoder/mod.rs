//! Fallback geocoding for queries no local index can answer.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use ahash::AHashMap;
pub use error::GeocodeError;
use error::Result;
use tokio::time::Instant;
use tracing::{debug, instrument};
use voicemap_data_processing::{BoundingBox, Coordinate};

use crate::config::GEOCODER_MIN_INTERVAL_FLOOR;

mod nominatim;

pub use nominatim::NominatimGeocoder;

/// One place returned by a geocoder.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct GeocodeHit {
    pub label: String,
    pub center: Coordinate,
    pub bbox: Option<BoundingBox>,
}

/// A free-text place lookup service.
pub trait Geocoder: Send + Sync {
    fn search(&self, query: &str) -> impl Future<Output = Result<Vec<GeocodeHit>>> + Send;
}

/// Geocoder that never finds anything. Used when running offline.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopGeocoder;

impl Geocoder for NoopGeocoder {
    async fn search(&self, _query: &str) -> Result<Vec<GeocodeHit>> {
        Ok(Vec::new())
    }
}

/// Wraps a geocoder with a minimum interval between requests and a per-query
/// result cache.
///
/// Concurrent callers queue on the interval; a caller that waited re-checks
/// the cache before going to the network. Failures are not cached. Queries
/// are cached case-insensitively.
#[derive(Debug)]
pub struct ThrottledGeocoder<G> {
    inner: G,
    min_interval: Duration,
    last_request: tokio::sync::Mutex<Option<Instant>>,
    cache: Mutex<AHashMap<String, Vec<GeocodeHit>>>,
}

impl<G: Geocoder> ThrottledGeocoder<G> {
    /// `min_interval` is raised to [`GEOCODER_MIN_INTERVAL_FLOOR`] if lower.
    pub fn new(inner: G, min_interval: Duration) -> Self {
        Self {
            inner,
            min_interval: min_interval.max(GEOCODER_MIN_INTERVAL_FLOOR),
            last_request: tokio::sync::Mutex::new(None),
            cache: Mutex::new(AHashMap::new()),
        }
    }

    pub const fn inner(&self) -> &G {
        &self.inner
    }

    pub const fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn cached_queries(&self) -> usize {
        self.cache.lock().map_or(0, |cache| cache.len())
    }

    fn cached(&self, key: &str) -> Option<Vec<GeocodeHit>> {
        self.cache.lock().ok()?.get(key).cloned()
    }

    fn store(&self, key: String, hits: Vec<GeocodeHit>) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, hits);
        }
    }
}

impl<G: Geocoder> Geocoder for ThrottledGeocoder<G> {
    #[instrument(name = "Throttled geocode", skip(self), level = "debug")]
    async fn search(&self, query: &str) -> Result<Vec<GeocodeHit>> {
        let query = query.trim();
        let key = query.to_lowercase();
        if let Some(hits) = self.cached(&key) {
            debug!(hits = hits.len(), "Geocoder cache hit");
            return Ok(hits);
        }

        let mut last_request = self.last_request.lock().await;
        if let Some(hits) = self.cached(&key) {
            debug!(hits = hits.len(), "Geocoder cache hit after waiting");
            return Ok(hits);
        }
        if let Some(previous) = *last_request {
            let ready_at = previous + self.min_interval;
            if ready_at > Instant::now() {
                debug!(wait = ?(ready_at - Instant::now()), "Rate limiting geocoder request");
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last_request = Some(Instant::now());

        let hits = self.inner.search(query).await?;
        self.store(key, hits.clone());
        Ok(hits)
    }
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum GeocodeError {
        #[error("HTTP error: {0}")]
        Http(#[from] reqwest::Error),
        #[error("Invalid geocoder response: {0}")]
        InvalidResponse(String),
    }
    pub type Result<T> = std::result::Result<T, GeocodeError>;
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    /// Records every query it sees; answers with one hit or an error.
    #[derive(Debug, Default)]
    pub(crate) struct RecordingGeocoder {
        pub calls: AtomicUsize,
        pub seen_at: Mutex<Vec<Instant>>,
        pub fail: bool,
    }

    impl RecordingGeocoder {
        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Geocoder for RecordingGeocoder {
        async fn search(&self, query: &str) -> Result<Vec<GeocodeHit>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.seen_at.lock().unwrap().push(Instant::now());
            if self.fail {
                return Err(GeocodeError::InvalidResponse("unavailable".into()));
            }
            Ok(vec![GeocodeHit {
                label: format!("{query}, India"),
                center: Coordinate::new(78.0, 21.0),
                bbox: None,
            }])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_query_hits_cache() {
        let geocoder = ThrottledGeocoder::new(RecordingGeocoder::default(), Duration::from_secs(1));

        let first = geocoder.search("xyzqqq123").await.unwrap();
        let second = geocoder.search("  xyzqqq123 ").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(geocoder.inner().calls(), 1);
        assert_eq!(geocoder.cached_queries(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cache_ignores_case() {
        let geocoder = ThrottledGeocoder::new(RecordingGeocoder::default(), Duration::from_secs(1));

        let first = geocoder.search("Delhi Cantt").await.unwrap();
        let second = geocoder.search("delhi cantt").await.unwrap();

        assert_eq!(first, second);
        assert_eq!(first[0].label, "Delhi Cantt, India");
        assert_eq!(geocoder.inner().calls(), 1);
        assert_eq!(geocoder.cached_queries(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_below_floor_is_raised() {
        let geocoder = ThrottledGeocoder::new(RecordingGeocoder::default(), Duration::ZERO);
        assert_eq!(geocoder.min_interval(), GEOCODER_MIN_INTERVAL_FLOOR);

        geocoder.search("first").await.unwrap();
        geocoder.search("second").await.unwrap();

        let seen = geocoder.inner().seen_at.lock().unwrap().clone();
        assert_eq!(seen.len(), 2);
        assert!(seen[1] - seen[0] >= GEOCODER_MIN_INTERVAL_FLOOR);
    }

    #[tokio::test(start_paused = true)]
    async fn test_distinct_queries_respect_min_interval() {
        let geocoder = ThrottledGeocoder::new(RecordingGeocoder::default(), Duration::from_secs(1));

        geocoder.search("first").await.unwrap();
        geocoder.search("second").await.unwrap();
        geocoder.search("third").await.unwrap();

        let seen = geocoder.inner().seen_at.lock().unwrap().clone();
        assert_eq!(seen.len(), 3);
        for pair in seen.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_secs(1));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_failures_are_not_cached() {
        let geocoder = ThrottledGeocoder::new(
            RecordingGeocoder {
                fail: true,
                ..RecordingGeocoder::default()
            },
            Duration::from_millis(200),
        );

        assert!(geocoder.search("nowhere").await.is_err());
        assert!(geocoder.search("nowhere").await.is_err());
        assert_eq!(geocoder.inner().calls(), 2);
        assert_eq!(geocoder.cached_queries(), 0);
    }

    #[tokio::test]
    async fn test_noop_geocoder_is_empty() {
        assert!(NoopGeocoder.search("anything").await.unwrap().is_empty());
    }
}
