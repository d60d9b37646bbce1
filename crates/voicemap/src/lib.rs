//! VoiceMap - place and PIN code resolution for Indian boundary maps
//!
//! VoiceMap turns what a user types into a search box (a constituency, a
//! district, a state, a six-digit PIN code or a PIN prefix, or any other
//! place name) into a ranked list of suggestions, each of which reduces to a
//! single camera command for a map surface.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use voicemap::{DataSource, VoiceMap};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), voicemap::error::VoiceMapError> {
//! let map = VoiceMap::builder()
//!     .data_source(DataSource::Directory("./voicemap_data".into()))
//!     .nominatim()?
//!     .build()?;
//!
//! let suggestions = map.resolver().resolve("Lucknow").await;
//! if let Some(best) = suggestions.first() {
//!     let command = map.resolver().command_for(best).await;
//!     println!("{} -> {:?}", best.label, command.viewport);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! # Resolution order
//!
//! - Six digits: exact PIN code lookup.
//! - Three to five digits: PIN prefix lookup, then the curated prefix table.
//! - Text: fuzzy search over constituencies, districts and states.
//! - Nothing local: the Nominatim geocoder, rate limited and cached.
//!
//! # Data
//!
//! Four GeoJSON feature collections are read from the data directory
//! (`VOICEMAP_DATA_DIR`, default `./voicemap_data`): `states.geojson`,
//! `districts.geojson`, `pc.geojson` and `pincode.points.geojson`. A dataset
//! that fails to load leaves its layer empty and is reported through
//! [`SearchSession::banner`] instead of failing start-up;
//! [`VoiceMap::retry_failed`] loads the data again.
use once_cell::sync::OnceCell;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{EnvFilter, fmt::format::FmtSpan};

mod backend;
mod catalog;
mod config;
mod core;
pub mod error;
mod geocoder;
mod index;
mod postal;
mod search;
mod session;
#[cfg(test)]
mod test_support;

pub use core::{PlaceIndexes, VoiceMap, VoiceMapBuilder, VoiceMapInfo};

pub use backend::{FetchError, HttpRegionFetcher, LocalOnly, RegionFetcher};
pub use catalog::RegionCatalog;
pub use config::{
    BackendConfig, GEOCODER_MIN_INTERVAL_FLOOR, GeocoderConfig, KindWeights, ResolverConfig,
    ResolverConfigBuilder, SessionConfig,
};
pub use geocoder::{
    GeocodeError, GeocodeHit, Geocoder, NominatimGeocoder, NoopGeocoder, ThrottledGeocoder,
};
pub use index::{FTSIndexSearchParams, RegionSearchIndex, TextMatch};
pub use postal::{PostalIndex, PostalPoint, prefix_table};
pub use search::{PlaceResolver, Suggestion, SuggestionKind, Viewport, ViewportCommand};
pub use session::{MapSurface, SearchSession, SelectedPlace};
pub use voicemap_data_processing as data_processing;
pub use voicemap_data_processing::{
    AdminRefs, BoundingBox, Coordinate, DataSource, Geometry, LoadReport, Region, RegionKind,
    bounds_from_value,
};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Initialize logging for VoiceMap.
///
/// Installs a `tracing` fmt subscriber. `RUST_LOG` takes precedence over
/// `level` when set. Safe to call more than once; only the first call
/// installs anything.
///
/// ```rust
/// use tracing::Level;
/// use voicemap::init_logging;
///
/// init_logging(Level::INFO)?;
/// # Ok::<(), voicemap::error::VoiceMapError>(())
/// ```
pub fn init_logging(level: impl Into<LevelFilter>) -> Result<&'static (), error::VoiceMapError> {
    LOGGER_INIT.get_or_try_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(level.into().to_string()))?
            .add_directive("tantivy=warn".parse()?)
            .add_directive("hyper_util=warn".parse()?)
            .add_directive("reqwest=warn".parse()?);

        tracing_subscriber::fmt::fmt()
            .with_env_filter(filter)
            .with_span_events(FmtSpan::CLOSE)
            .try_init()
            .map_err(|e| anyhow::anyhow!(e))?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        assert!(init_logging(tracing::Level::WARN).is_ok());
        assert!(init_logging(tracing::Level::DEBUG).is_ok());
    }
}
