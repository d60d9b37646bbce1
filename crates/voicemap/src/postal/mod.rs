//! PIN code lookups.
//!
//! Indian PIN codes are six digits; the first three identify the sorting
//! district. The index keeps an exact map for full codes and, for every
//! three-digit prefix, the codes sharing it in dataset order.

use ahash::AHashMap;
use tracing::{debug, info, instrument};
use voicemap_data_processing::{AdminRefs, Coordinate, PostalRecord};

pub mod prefix_table;

/// Length of a complete PIN code.
pub const CODE_LENGTH: usize = 6;
/// Length of the sorting-district prefix.
pub const PREFIX_LENGTH: usize = 3;

#[derive(Debug, Clone, PartialEq)]
pub struct PostalPoint {
    pub code: String,
    pub label: Option<String>,
    pub coordinate: Coordinate,
    pub admin_refs: AdminRefs,
}

impl PostalPoint {
    /// `"110001 (Connaught Place)"`, or just the code.
    pub fn display_label(&self) -> String {
        match &self.label {
            Some(label) => format!("{} ({label})", self.code),
            None => self.code.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PostalIndex {
    points: Vec<PostalPoint>,
    code_to_point: AHashMap<String, usize>,
    prefix_to_codes: AHashMap<String, Vec<usize>>,
}

impl PostalIndex {
    /// Builds the index, skipping records without a code of at least three
    /// characters or without a derivable coordinate.
    #[instrument(name = "Build postal index", skip_all, level = "info")]
    pub fn build(records: impl IntoIterator<Item = PostalRecord>) -> Self {
        let mut index = Self::default();
        let mut skipped = 0usize;

        for record in records {
            let coordinate = record.coordinate();
            let (Some(code), Some(coordinate)) = (record.code, coordinate) else {
                skipped += 1;
                continue;
            };
            if code.chars().count() < PREFIX_LENGTH {
                skipped += 1;
                continue;
            }
            let prefix: String = code.chars().take(PREFIX_LENGTH).collect();
            let position = index.points.len();
            index.points.push(PostalPoint {
                code: code.clone(),
                label: record.label,
                coordinate,
                admin_refs: record.admin_refs,
            });
            index.code_to_point.insert(code, position);
            index.prefix_to_codes.entry(prefix).or_default().push(position);
        }

        info!(
            points = index.points.len(),
            codes = index.code_to_point.len(),
            prefixes = index.prefix_to_codes.len(),
            skipped,
            "Postal index built"
        );
        index
    }

    /// Exact lookup of a six-character code. Other lengths never match.
    pub fn lookup_exact(&self, code: &str) -> Option<&PostalPoint> {
        if code.chars().count() != CODE_LENGTH {
            return None;
        }
        self.code_to_point.get(code).map(|i| &self.points[*i])
    }

    /// Up to `limit` points sharing the first three characters of `prefix`,
    /// in dataset order.
    ///
    /// Accepts three to five characters; anything shorter or longer yields
    /// nothing.
    pub fn lookup_prefix(&self, prefix: &str, limit: usize) -> Vec<&PostalPoint> {
        let len = prefix.chars().count();
        if !(PREFIX_LENGTH..CODE_LENGTH).contains(&len) {
            debug!(prefix, "Prefix length outside 3..=5, skipping postal lookup");
            return Vec::new();
        }
        let key: String = prefix.chars().take(PREFIX_LENGTH).collect();
        self.prefix_to_codes
            .get(&key)
            .map(|positions| positions.iter().take(limit).map(|i| &self.points[*i]).collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}
