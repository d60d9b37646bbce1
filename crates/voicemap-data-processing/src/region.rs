use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::attributes::{CONSTITUENCY_NAME_KEYS, DISTRICT_NAME_KEYS, STATE_NAME_KEYS};
use crate::geometry::{BoundingBox, Coordinate, Geometry};

/// Administrative layer a region belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RegionKind {
    State,
    District,
    /// Parliamentary constituency.
    Constituency,
}

impl RegionKind {
    /// Order in which text queries consult the layers.
    pub const SEARCH_ORDER: [Self; 3] = [Self::Constituency, Self::District, Self::State];

    /// Prioritized attribute keys holding the region name.
    pub const fn name_keys(self) -> &'static [&'static str] {
        match self {
            Self::State => STATE_NAME_KEYS,
            Self::District => DISTRICT_NAME_KEYS,
            Self::Constituency => CONSTITUENCY_NAME_KEYS,
        }
    }

    /// Type tag used by the VoiceMap backend API.
    pub const fn backend_type(self) -> &'static str {
        match self {
            Self::State => "state",
            Self::District => "district",
            Self::Constituency => "pc",
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::State => "State",
            Self::District => "District",
            Self::Constituency => "Constituency",
        }
    }
}

impl fmt::Display for RegionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRegionKindError(pub String);

impl fmt::Display for ParseRegionKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown region kind: {}", self.0)
    }
}

impl std::error::Error for ParseRegionKindError {}

impl FromStr for RegionKind {
    type Err = ParseRegionKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "state" => Ok(Self::State),
            "district" => Ok(Self::District),
            "pc" | "constituency" => Ok(Self::Constituency),
            _ => Err(ParseRegionKindError(s.to_string())),
        }
    }
}

/// A named administrative area loaded from a boundary dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct Region {
    pub kind: RegionKind,
    pub name: String,
    /// Home state, for districts and constituencies.
    pub state: Option<String>,
    pub geometry: Option<Geometry>,
    pub attributes: Map<String, Value>,
    pub bbox: Option<BoundingBox>,
    pub centroid: Option<Coordinate>,
}

impl Region {
    pub fn new(
        kind: RegionKind,
        name: impl Into<String>,
        state: Option<String>,
        geometry: Option<Geometry>,
        attributes: Map<String, Value>,
    ) -> Self {
        let bbox = geometry.as_ref().and_then(Geometry::bounds);
        let centroid = geometry.as_ref().and_then(Geometry::centroid);
        Self {
            kind,
            name: name.into(),
            state,
            geometry,
            attributes,
            bbox,
            centroid,
        }
    }

    pub fn contains(&self, c: Coordinate) -> bool {
        self.bbox.is_some_and(|b| b.contains(c))
            && self.geometry.as_ref().is_some_and(|g| g.contains(c))
    }

    /// Attribute values flattened into one searchable string.
    pub fn attribute_text(&self) -> String {
        self.attributes
            .values()
            .filter_map(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Back-references from a postal point to the areas it sits in.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminRefs {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub district: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub constituency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub division: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub circle: Option<String>,
    /// Three-digit prefix, set on curated-prefix selections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl AdminRefs {
    pub const fn is_empty(&self) -> bool {
        self.district.is_none()
            && self.state.is_none()
            && self.constituency.is_none()
            && self.division.is_none()
            && self.region.is_none()
            && self.circle.is_none()
            && self.prefix.is_none()
    }
}

/// One feature of the postal-points dataset, before index build rules apply.
#[derive(Debug, Clone, PartialEq)]
pub struct PostalRecord {
    pub code: Option<String>,
    /// Post office name, when the dataset carries one.
    pub label: Option<String>,
    pub geometry: Option<Geometry>,
    pub admin_refs: AdminRefs,
}

impl PostalRecord {
    /// The point geometry, else the south-west corner of the geometry's bounds.
    pub fn coordinate(&self) -> Option<Coordinate> {
        match self.geometry.as_ref()? {
            Geometry::Point(c) => Some(*c),
            other => other.bounds().map(|b| b.min),
        }
    }
}
