use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::attributes::{
    HOME_STATE_KEYS, OFFICE_NAME_KEYS, PINCODE_KEYS, POSTAL_CIRCLE_KEYS, POSTAL_DISTRICT_KEYS,
    POSTAL_DIVISION_KEYS, POSTAL_REGION_KEYS, POSTAL_STATE_KEYS, probe_str,
};
use crate::geometry::Geometry;
use crate::region::{AdminRefs, PostalRecord, Region, RegionKind};
use crate::{DataError, Result};

#[derive(Debug, Deserialize)]
struct FeatureCollection {
    #[serde(rename = "type")]
    kind: String,
    features: Vec<Feature>,
}

#[derive(Debug, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub geometry: Option<Value>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

/// Extracts the feature list from a GeoJSON `FeatureCollection`.
pub fn parse_feature_collection(value: Value) -> Result<Vec<Feature>> {
    let collection: FeatureCollection = serde_json::from_value(value)
        .map_err(|e| DataError::InvalidFeatureCollection(e.to_string()))?;
    if collection.kind != "FeatureCollection" {
        return Err(DataError::InvalidFeatureCollection(format!(
            "unexpected type {}",
            collection.kind
        )));
    }
    Ok(collection.features)
}

/// Builds regions of one kind, in dataset order.
///
/// Features without a usable name get a positional placeholder (`"District 3"`).
/// Malformed geometry is kept as `None` so the region stays searchable by name.
pub fn regions_from_features(kind: RegionKind, features: Vec<Feature>) -> Vec<Region> {
    features
        .into_iter()
        .enumerate()
        .map(|(idx, feature)| {
            let attributes = feature.properties.unwrap_or_default();
            let name = probe_str(&attributes, kind.name_keys())
                .unwrap_or_else(|| format!("{kind} {idx}"));
            let state = match kind {
                RegionKind::State => None,
                RegionKind::District | RegionKind::Constituency => {
                    probe_str(&attributes, HOME_STATE_KEYS)
                }
            };
            let geometry = feature.geometry.as_ref().and_then(Geometry::from_value);
            if geometry.is_none() {
                debug!(%kind, name, "Region has no usable geometry");
            }
            Region::new(kind, name, state, geometry, attributes)
        })
        .collect()
}

pub fn postal_records_from_features(features: Vec<Feature>) -> Vec<PostalRecord> {
    features
        .into_iter()
        .map(|feature| {
            let props = feature.properties.unwrap_or_default();
            PostalRecord {
                code: probe_str(&props, PINCODE_KEYS),
                label: probe_str(&props, OFFICE_NAME_KEYS),
                geometry: feature.geometry.as_ref().and_then(Geometry::from_value),
                admin_refs: AdminRefs {
                    district: probe_str(&props, POSTAL_DISTRICT_KEYS),
                    state: probe_str(&props, POSTAL_STATE_KEYS),
                    division: probe_str(&props, POSTAL_DIVISION_KEYS),
                    region: probe_str(&props, POSTAL_REGION_KEYS),
                    circle: probe_str(&props, POSTAL_CIRCLE_KEYS),
                    ..AdminRefs::default()
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_rejects_non_collections() {
        assert!(parse_feature_collection(json!({ "type": "Feature", "features": [] })).is_err());
        assert!(parse_feature_collection(json!({ "type": "FeatureCollection" })).is_err());
        assert!(parse_feature_collection(json!([1, 2, 3])).is_err());
    }

    #[test]
    fn test_regions_probe_names_and_home_state() {
        let features = parse_feature_collection(json!({
            "type": "FeatureCollection",
            "features": [
                { "type": "Feature", "properties": { "DIST_NAME": "Mumbai", "ST_NM": "Maharashtra" }, "geometry": null },
                { "type": "Feature", "properties": {}, "geometry": { "type": "LineString", "coordinates": [] } }
            ]
        }))
        .unwrap();

        let regions = regions_from_features(RegionKind::District, features);
        assert_eq!(regions.len(), 2);
        assert_eq!(regions[0].name, "Mumbai");
        assert_eq!(regions[0].state.as_deref(), Some("Maharashtra"));
        assert_eq!(regions[1].name, "District 1");
        assert!(regions[1].geometry.is_none());
    }

    #[test]
    fn test_postal_records_carry_admin_refs() {
        let features = parse_feature_collection(json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {
                    "Pincode": "110001", "Office_Name": "Connaught Place",
                    "District": "New Delhi", "Division": "New Delhi GPO", "Circle": "Delhi"
                },
                "geometry": { "type": "Point", "coordinates": [77.21, 28.65] }
            }]
        }))
        .unwrap();

        let records = postal_records_from_features(features);
        assert_eq!(records[0].code.as_deref(), Some("110001"));
        assert_eq!(records[0].label.as_deref(), Some("Connaught Place"));
        assert_eq!(records[0].admin_refs.district.as_deref(), Some("New Delhi"));
        assert_eq!(records[0].admin_refs.circle.as_deref(), Some("Delhi"));
        assert!(records[0].admin_refs.region.is_none());
    }
}
