use ahash::AHashMap;
use tracing::{debug, instrument};
use voicemap_data_processing::{Coordinate, Region, RegionKind};

/// The loaded regions of every kind, in dataset order.
///
/// Ordinals (positions within a kind) are the ids the text indexes store.
#[derive(Debug, Clone, Default)]
pub struct RegionCatalog {
    states: Vec<Region>,
    districts: Vec<Region>,
    constituencies: Vec<Region>,
    by_name: AHashMap<(RegionKind, String), usize>,
}

impl RegionCatalog {
    pub fn new(states: Vec<Region>, districts: Vec<Region>, constituencies: Vec<Region>) -> Self {
        let mut by_name = AHashMap::new();
        for (kind, regions) in [
            (RegionKind::State, &states),
            (RegionKind::District, &districts),
            (RegionKind::Constituency, &constituencies),
        ] {
            for (ordinal, region) in regions.iter().enumerate() {
                // First occurrence wins for repeated names.
                by_name
                    .entry((kind, normalize_name(&region.name)))
                    .or_insert(ordinal);
            }
        }
        Self {
            states,
            districts,
            constituencies,
            by_name,
        }
    }

    pub fn regions(&self, kind: RegionKind) -> &[Region] {
        match kind {
            RegionKind::State => &self.states,
            RegionKind::District => &self.districts,
            RegionKind::Constituency => &self.constituencies,
        }
    }

    pub fn region(&self, kind: RegionKind, ordinal: usize) -> Option<&Region> {
        self.regions(kind).get(ordinal)
    }

    /// Case-insensitive exact name lookup.
    pub fn region_by_name(&self, kind: RegionKind, name: &str) -> Option<&Region> {
        self.by_name
            .get(&(kind, normalize_name(name)))
            .and_then(|ordinal| self.region(kind, *ordinal))
    }

    /// Regions containing `coordinate`, smallest bounding box first.
    ///
    /// With `kind` set only that layer is searched.
    #[instrument(level = "debug", skip(self))]
    pub fn containing(&self, coordinate: Coordinate, kind: Option<RegionKind>) -> Vec<&Region> {
        let kinds = kind.map_or_else(|| RegionKind::SEARCH_ORDER.to_vec(), |k| vec![k]);
        let mut matches: Vec<&Region> = kinds
            .into_iter()
            .flat_map(|k| self.regions(k))
            .filter(|region| region.contains(coordinate))
            .collect();
        matches.sort_by(|a, b| bbox_area(a).total_cmp(&bbox_area(b)));
        debug!(matches = matches.len(), "Containment lookup complete");
        matches
    }

    pub fn len(&self) -> usize {
        self.states.len() + self.districts.len() + self.constituencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn bbox_area(region: &Region) -> f64 {
    region.bbox.map_or(f64::INFINITY, |b| b.area())
}

/// Lowercases, collapses whitespace and drops punctuation at either end.
pub(crate) fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}
