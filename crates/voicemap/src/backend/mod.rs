//! Region-by-name fetches from the VoiceMap backend.
//!
//! Used when a selected suggestion names a region that has no geometry
//! loaded locally (curated PIN prefixes, districts missing from the dataset).

use std::future::Future;

pub use error::FetchError;
use error::Result;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};
use voicemap_data_processing::{BoundingBox, Coordinate, Geometry, Region, RegionKind};

use crate::config::BackendConfig;

pub trait RegionFetcher: Send + Sync {
    /// The best region of `kind` named `name`, if the backend knows one.
    fn fetch_region(
        &self,
        kind: RegionKind,
        name: &str,
    ) -> impl Future<Output = Result<Option<Region>>> + Send;
}

/// Fetcher for deployments without a backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalOnly;

impl RegionFetcher for LocalOnly {
    async fn fetch_region(&self, _kind: RegionKind, _name: &str) -> Result<Option<Region>> {
        Ok(None)
    }
}

/// `GET {base_url}/api/regions/search?q={name}`.
#[derive(Debug, Clone)]
pub struct HttpRegionFetcher {
    client: reqwest::Client,
    base_url: String,
}

impl HttpRegionFetcher {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl RegionFetcher for HttpRegionFetcher {
    #[instrument(name = "Fetch region", skip(self), level = "debug")]
    async fn fetch_region(&self, kind: RegionKind, name: &str) -> Result<Option<Region>> {
        let url = format!("{}/api/regions/search", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("q", name)])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                warn!(error = %e, is_timeout = e.is_timeout(), "Region fetch failed");
                e
            })?;
        let candidates: Vec<BackendRegion> = response.json().await?;
        debug!(candidates = candidates.len(), "Backend region candidates");
        Ok(pick_region(candidates, kind, name))
    }
}

/// Region document as served by the backend.
#[derive(Debug, Deserialize)]
struct BackendRegion {
    name: String,
    #[serde(rename = "type", default)]
    kind: Option<String>,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    geo: Option<Value>,
    /// `[minLon, minLat, maxLon, maxLat]`.
    #[serde(default)]
    bbox: Option<Vec<f64>>,
    #[serde(default)]
    centroid: Option<Vec<f64>>,
}

impl BackendRegion {
    fn into_region(self, kind: RegionKind) -> Region {
        let geometry = self.geo.as_ref().and_then(Geometry::from_value);
        let mut region = Region::new(kind, self.name, self.state, geometry, Map::new());
        if region.bbox.is_none() {
            region.bbox = match self.bbox.as_deref() {
                Some(&[min_lon, min_lat, max_lon, max_lat]) => Some(BoundingBox::from_corners(
                    Coordinate::new(min_lon, min_lat),
                    Coordinate::new(max_lon, max_lat),
                )),
                _ => None,
            };
        }
        if region.centroid.is_none() {
            region.centroid = match self.centroid.as_deref() {
                Some(&[lon, lat]) => Some(Coordinate::new(lon, lat)),
                _ => None,
            };
        }
        region
    }
}

/// Candidates of the requested kind; an exact (case-insensitive) name wins,
/// else the first one the backend returned.
fn pick_region(candidates: Vec<BackendRegion>, kind: RegionKind, name: &str) -> Option<Region> {
    let mut of_kind: Vec<BackendRegion> = candidates
        .into_iter()
        .filter(|c| {
            c.kind
                .as_deref()
                .and_then(|k| k.parse::<RegionKind>().ok())
                .is_some_and(|k| k == kind)
        })
        .collect();
    let exact = of_kind.iter().position(|c| c.name.eq_ignore_ascii_case(name.trim()));
    let chosen = match exact {
        Some(position) => of_kind.swap_remove(position),
        None if !of_kind.is_empty() => of_kind.swap_remove(0),
        None => return None,
    };
    Some(chosen.into_region(kind))
}

mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum FetchError {
        #[error("HTTP error: {0}")]
        Http(#[from] reqwest::Error),
    }
    pub type Result<T> = std::result::Result<T, FetchError>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::test_support::serve_once;

    fn backend_regions() -> Value {
        json!([
            { "name": "Kanpur Dehat", "type": "district", "state": "Uttar Pradesh",
              "bbox": [79.6, 26.1, 80.2, 26.6], "centroid": [79.9, 26.35] },
            { "name": "Kanpur", "type": "pc", "bbox": [80.2, 26.35, 80.45, 26.55] },
            { "name": "Kanpur Nagar", "type": "district", "state": "Uttar Pradesh",
              "geo": { "type": "MultiPolygon", "coordinates": [[[[80.0, 26.2], [80.6, 26.2], [80.6, 26.7], [80.0, 26.2]]]] } }
        ])
    }

    #[test]
    fn test_pick_prefers_exact_name_of_kind() {
        let candidates: Vec<BackendRegion> = serde_json::from_value(backend_regions()).unwrap();
        let region = pick_region(candidates, RegionKind::District, "kanpur nagar").unwrap();
        assert_eq!(region.name, "Kanpur Nagar");
        assert_eq!(region.bbox.unwrap().min, Coordinate::new(80.0, 26.2));
        assert!(region.geometry.is_some());
    }

    #[test]
    fn test_pick_falls_back_to_first_of_kind() {
        let candidates: Vec<BackendRegion> = serde_json::from_value(backend_regions()).unwrap();
        let region = pick_region(candidates, RegionKind::District, "Kanpur").unwrap();
        assert_eq!(region.name, "Kanpur Dehat");
        assert!(region.geometry.is_none());
        assert_eq!(region.bbox.unwrap().max, Coordinate::new(80.2, 26.6));
        assert_eq!(region.centroid, Some(Coordinate::new(79.9, 26.35)));

        let candidates: Vec<BackendRegion> = serde_json::from_value(backend_regions()).unwrap();
        assert!(pick_region(candidates, RegionKind::State, "Kanpur").is_none());
    }

    #[tokio::test]
    async fn test_http_fetcher_queries_search_endpoint() {
        let (base_url, request) = serve_once(200, backend_regions().to_string()).await;
        let fetcher = HttpRegionFetcher::new(&BackendConfig {
            base_url: format!("{base_url}/"),
            ..BackendConfig::default()
        })
        .unwrap();

        let region = fetcher
            .fetch_region(RegionKind::Constituency, "Kanpur")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(region.kind, RegionKind::Constituency);
        assert_eq!(region.name, "Kanpur");

        let request_line = request.await.unwrap();
        assert!(request_line.starts_with("GET /api/regions/search?q=Kanpur "), "{request_line}");
    }

    #[tokio::test]
    async fn test_local_only_never_finds() {
        assert!(LocalOnly.fetch_region(RegionKind::State, "Delhi").await.unwrap().is_none());
    }
}
