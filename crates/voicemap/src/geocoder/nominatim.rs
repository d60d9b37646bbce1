use serde::Deserialize;
use tracing::{debug, instrument, warn};
use voicemap_data_processing::{BoundingBox, Coordinate};

use super::error::{GeocodeError, Result};
use super::{GeocodeHit, Geocoder};
use crate::config::GeocoderConfig;

/// OpenStreetMap Nominatim search, scoped to the configured countries.
#[derive(Debug, Clone)]
pub struct NominatimGeocoder {
    client: reqwest::Client,
    config: GeocoderConfig,
}

impl NominatimGeocoder {
    pub fn new(config: GeocoderConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self { client, config })
    }

    pub const fn config(&self) -> &GeocoderConfig {
        &self.config
    }
}

impl Geocoder for NominatimGeocoder {
    #[instrument(name = "Nominatim search", skip(self), level = "debug")]
    async fn search(&self, query: &str) -> Result<Vec<GeocodeHit>> {
        let limit = self.config.result_limit.to_string();
        let response = self
            .client
            .get(&self.config.endpoint)
            .query(&[
                ("format", "json"),
                ("countrycodes", self.config.country_codes.as_str()),
                ("q", query),
                ("addressdetails", "1"),
                ("limit", limit.as_str()),
                ("accept-language", self.config.accept_language.as_str()),
            ])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| {
                warn!(
                    error = %e,
                    is_timeout = e.is_timeout(),
                    is_connect = e.is_connect(),
                    status = ?e.status(),
                    "Nominatim request failed"
                );
                e
            })?;

        let places: Vec<NominatimPlace> = response.json().await.map_err(|e| {
            if e.is_decode() {
                GeocodeError::InvalidResponse(e.to_string())
            } else {
                GeocodeError::Http(e)
            }
        })?;

        let hits: Vec<GeocodeHit> = places.into_iter().filter_map(NominatimPlace::into_hit).collect();
        debug!(hits = hits.len(), "Nominatim results");
        Ok(hits)
    }
}

/// The subset of a Nominatim `format=json` result VoiceMap reads.
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
    #[serde(default)]
    display_name: Option<String>,
    /// `[south, north, west, east]` as strings.
    #[serde(default)]
    boundingbox: Option<Vec<String>>,
}

impl NominatimPlace {
    fn into_hit(self) -> Option<GeocodeHit> {
        let lat: f64 = self.lat.trim().parse().ok()?;
        let lon: f64 = self.lon.trim().parse().ok()?;
        if !(lat.is_finite() && lon.is_finite()) {
            return None;
        }
        let bbox = self.boundingbox.as_deref().and_then(parse_bounding_box);
        let label = self
            .display_name
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| format!("{},{}", self.lat, self.lon));
        Some(GeocodeHit {
            label,
            center: Coordinate::new(lon, lat),
            bbox,
        })
    }
}

fn parse_bounding_box(raw: &[String]) -> Option<BoundingBox> {
    let [south, north, west, east] = raw else {
        return None;
    };
    let parse = |s: &String| s.trim().parse::<f64>().ok().filter(|v| v.is_finite());
    Some(BoundingBox::from_corners(
        Coordinate::new(parse(west)?, parse(south)?),
        Coordinate::new(parse(east)?, parse(north)?),
    ))
}
