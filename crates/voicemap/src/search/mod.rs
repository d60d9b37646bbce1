//! Query resolution: from raw search-box text to ranked suggestions, and from
//! a chosen suggestion to a single camera command.

mod query;
mod resolver;

use serde::Serialize;
use voicemap_data_processing::{AdminRefs, BoundingBox, Coordinate, RegionKind};

pub use resolver::PlaceResolver;
#[cfg(test)]
pub(crate) use resolver::tests as resolver_tests;

/// What a suggestion points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    /// A single PIN code point.
    Postal,
    /// A locality from the curated PIN prefix table.
    PrefixLocality,
    Constituency,
    District,
    State,
    /// A place returned by the external geocoder.
    Nominatim,
}

impl SuggestionKind {
    /// The region layer a suggestion of this kind is resolved against, if any.
    pub const fn region_kind(self) -> Option<RegionKind> {
        match self {
            Self::Constituency => Some(RegionKind::Constituency),
            Self::District | Self::PrefixLocality => Some(RegionKind::District),
            Self::State => Some(RegionKind::State),
            Self::Postal | Self::Nominatim => None,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Postal => "postal",
            Self::PrefixLocality => "prefix_locality",
            Self::Constituency => "constituency",
            Self::District => "district",
            Self::State => "state",
            Self::Nominatim => "nominatim",
        }
    }
}

impl From<RegionKind> for SuggestionKind {
    fn from(kind: RegionKind) -> Self {
        match kind {
            RegionKind::State => Self::State,
            RegionKind::District => Self::District,
            RegionKind::Constituency => Self::Constituency,
        }
    }
}

/// A camera target: a box to fit, or a point and zoom to fly to.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Viewport {
    FitBounds { bbox: BoundingBox },
    FlyTo { center: Coordinate, zoom: f64 },
}

impl Viewport {
    /// Fits `bbox`, or flies to its center at `zoom` when it has no area.
    pub fn from_bounds(bbox: BoundingBox, zoom: f64) -> Self {
        if bbox.is_degenerate() {
            Self::FlyTo {
                center: bbox.center(),
                zoom,
            }
        } else {
            Self::FitBounds { bbox }
        }
    }

    /// Whether a map can execute this command.
    pub fn is_valid(&self) -> bool {
        match self {
            Self::FitBounds { bbox } => !bbox.is_degenerate(),
            Self::FlyTo { center, zoom } => {
                center.lon.is_finite() && center.lat.is_finite() && *zoom >= 0.0
            }
        }
    }
}

/// One ranked candidate for a query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Suggestion {
    /// Stable within one load, e.g. `postal:110001` or `pc:3`.
    pub id: String,
    pub kind: SuggestionKind,
    pub label: String,
    /// Relative rank; higher is more relevant.
    pub score: f64,
    /// `None` when the target has no usable geometry yet.
    pub viewport: Option<Viewport>,
    /// Name the map surface highlights or the backend is asked for.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_refs: Option<AdminRefs>,
}

/// The single command emitted when a suggestion is chosen.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewportCommand {
    pub name: String,
    pub kind: SuggestionKind,
    pub viewport: Option<Viewport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_refs: Option<AdminRefs>,
}
