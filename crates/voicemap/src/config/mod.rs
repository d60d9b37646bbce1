//! Tunables for resolution, the geocoder, the backend adapter and the session.

use std::time::Duration;

use voicemap_data_processing::{Coordinate, RegionKind};

use crate::error::VoiceMapError;

/// Base score per text-index kind. A match scores `weight - 100 * dissimilarity`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KindWeights {
    pub constituency: f64,
    pub district: f64,
    pub state: f64,
}

impl Default for KindWeights {
    fn default() -> Self {
        Self {
            constituency: 100.0,
            district: 80.0,
            state: 60.0,
        }
    }
}

impl KindWeights {
    pub const fn weight(&self, kind: RegionKind) -> f64 {
        match kind {
            RegionKind::Constituency => self.constituency,
            RegionKind::District => self.district,
            RegionKind::State => self.state,
        }
    }
}

/// Limits, thresholds and scores used by the place resolver.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolverConfig {
    /// Hard cap on the final suggestion list.
    pub suggestion_cap: usize,
    /// Cap on postal prefix suggestions.
    pub postal_suggestion_limit: usize,
    /// Matches taken from each text index.
    pub per_index_limit: usize,
    /// Maximum accepted dissimilarity, per kind.
    pub constituency_threshold: f64,
    pub district_threshold: f64,
    pub state_threshold: f64,
    pub kind_weights: KindWeights,
    /// Score of an exact PIN code hit.
    pub postal_exact_score: f64,
    /// Prefix suggestion `i` scores `postal_prefix_base - i`.
    pub postal_prefix_base: f64,
    /// Geocoder result `i` scores `geocoder_base - i`.
    pub geocoder_base: f64,
    pub postal_zoom: f64,
    pub place_zoom: f64,
    /// Adds fuzzy term queries to the text index search.
    pub fuzzy_search: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            suggestion_cap: 12,
            postal_suggestion_limit: 8,
            per_index_limit: 6,
            constituency_threshold: 0.36,
            district_threshold: 0.36,
            state_threshold: 0.32,
            kind_weights: KindWeights::default(),
            postal_exact_score: 100.0,
            postal_prefix_base: 80.0,
            geocoder_base: 40.0,
            postal_zoom: 16.0,
            place_zoom: 14.0,
            fuzzy_search: true,
        }
    }
}

impl ResolverConfig {
    pub fn builder() -> ResolverConfigBuilder {
        ResolverConfigBuilder::new()
    }

    pub const fn threshold(&self, kind: RegionKind) -> f64 {
        match kind {
            RegionKind::Constituency => self.constituency_threshold,
            RegionKind::District => self.district_threshold,
            RegionKind::State => self.state_threshold,
        }
    }
}

/// Builder for [`ResolverConfig`].
#[derive(Debug, Clone, Default)]
pub struct ResolverConfigBuilder {
    config: ResolverConfig,
}

impl ResolverConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: ResolverConfig::default(),
        }
    }

    /// Short lists and stricter matching, for small dropdowns.
    pub fn compact() -> Self {
        let mut builder = Self::new();
        builder.config.suggestion_cap = 6;
        builder.config.postal_suggestion_limit = 4;
        builder.config.per_index_limit = 3;
        builder.config.constituency_threshold = 0.3;
        builder.config.district_threshold = 0.3;
        builder.config.state_threshold = 0.25;
        builder
    }

    /// Long lists and looser matching.
    pub fn exhaustive() -> Self {
        let mut builder = Self::new();
        builder.config.suggestion_cap = 25;
        builder.config.postal_suggestion_limit = 20;
        builder.config.per_index_limit = 12;
        builder.config.constituency_threshold = 0.45;
        builder.config.district_threshold = 0.45;
        builder.config.state_threshold = 0.4;
        builder
    }

    pub fn suggestion_cap(mut self, cap: usize) -> Self {
        self.config.suggestion_cap = cap.max(1);
        self
    }

    pub fn postal_suggestion_limit(mut self, limit: usize) -> Self {
        self.config.postal_suggestion_limit = limit;
        self
    }

    pub fn per_index_limit(mut self, limit: usize) -> Self {
        self.config.per_index_limit = limit;
        self
    }

    /// Set the dissimilarity threshold for one kind, clamped to `[0, 1]`.
    pub fn threshold(mut self, kind: RegionKind, threshold: f64) -> Self {
        let threshold = threshold.clamp(0.0, 1.0);
        match kind {
            RegionKind::Constituency => self.config.constituency_threshold = threshold,
            RegionKind::District => self.config.district_threshold = threshold,
            RegionKind::State => self.config.state_threshold = threshold,
        }
        self
    }

    pub fn fuzzy_search(mut self, enabled: bool) -> Self {
        self.config.fuzzy_search = enabled;
        self
    }

    pub fn zoom_levels(mut self, postal: f64, place: f64) -> Self {
        self.config.postal_zoom = postal.max(0.0);
        self.config.place_zoom = place.max(0.0);
        self
    }

    /// Set custom kind weights.
    ///
    /// Weights must be finite, positive and ordered constituency >= district
    /// >= state, since ties between kinds are broken in that order.
    pub fn kind_weights(
        mut self,
        constituency: f64,
        district: f64,
        state: f64,
    ) -> Result<Self, VoiceMapError> {
        let weights = [constituency, district, state];
        if weights.iter().any(|w| !w.is_finite() || *w <= 0.0) {
            return Err(VoiceMapError::ConfigError(format!(
                "Kind weights must be finite and positive, got {weights:?}"
            )));
        }
        if constituency < district || district < state {
            return Err(VoiceMapError::ConfigError(format!(
                "Kind weights must not increase from constituency to state, got {weights:?}"
            )));
        }
        self.config.kind_weights = KindWeights {
            constituency,
            district,
            state,
        };
        Ok(self)
    }

    pub fn build(self) -> ResolverConfig {
        self.config
    }
}

/// Smallest interval allowed between two geocoder requests.
pub const GEOCODER_MIN_INTERVAL_FLOOR: Duration = Duration::from_millis(200);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeocoderConfig {
    pub endpoint: String,
    pub country_codes: String,
    pub result_limit: usize,
    pub accept_language: String,
    pub user_agent: String,
    pub timeout: Duration,
    pub min_interval: Duration,
}

impl Default for GeocoderConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://nominatim.openstreetmap.org/search".to_string(),
            country_codes: "in".to_string(),
            result_limit: 8,
            accept_language: "en".to_string(),
            user_agent: concat!("voicemap/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(10),
            min_interval: Duration::from_secs(1),
        }
    }
}

impl GeocoderConfig {
    /// `min_interval`, raised to the floor if set lower.
    pub fn effective_min_interval(&self) -> Duration {
        self.min_interval.max(GEOCODER_MIN_INTERVAL_FLOOR)
    }
}

/// VoiceMap backend used for region-by-name fetches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8080".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionConfig {
    pub debounce: Duration,
    pub home_center: Coordinate,
    pub home_zoom: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(120),
            home_center: Coordinate::new(80.0, 22.0),
            home_zoom: 4.5,
        }
    }
}
