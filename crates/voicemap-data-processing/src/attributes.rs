//! Probing of loosely-typed GeoJSON feature properties.
//!
//! Boundary datasets from different publishers name the same attribute in
//! different ways (`ST_NM`, `STATE`, `state`, ...). Each lookup walks a
//! prioritized key list and takes the first usable value.

use serde_json::{Map, Value};

pub const STATE_NAME_KEYS: &[&str] = &[
    "ST_NM", "ST_NAME", "STATE", "NAME", "name", "state", "State", "st_nm",
];
pub const DISTRICT_NAME_KEYS: &[&str] = &["DISTRICT", "DIST_NAME", "DIST", "NAME"];
pub const CONSTITUENCY_NAME_KEYS: &[&str] = &["pc_name", "PC_NAME", "pc", "PC", "NAME"];

/// Home-state keys for districts and constituencies. `NAME` is left out: on
/// those layers it holds the region's own name.
pub const HOME_STATE_KEYS: &[&str] = &["ST_NM", "ST_NAME", "STATE", "state", "State", "st_nm"];

pub const PINCODE_KEYS: &[&str] = &["Pincode", "PINCODE", "pincode", "PIN"];
pub const OFFICE_NAME_KEYS: &[&str] = &["Office_Name", "OfficeName", "officename"];
pub const POSTAL_DISTRICT_KEYS: &[&str] = &["District", "DISTRICT", "district", "Districtname"];
pub const POSTAL_STATE_KEYS: &[&str] = &["StateName", "State", "STATE", "statename"];
pub const POSTAL_DIVISION_KEYS: &[&str] = &["Division", "DivisionName"];
pub const POSTAL_REGION_KEYS: &[&str] = &["Region", "RegionName"];
pub const POSTAL_CIRCLE_KEYS: &[&str] = &["Circle", "CircleName"];

/// First non-empty string under any of `keys`, in key order.
///
/// Integral numbers are rendered without a fractional part, so a pincode
/// stored as `226001` comes back as `"226001"`.
pub fn probe_str(properties: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| properties.get(*key))
        .find_map(value_to_string)
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        }
        Value::Number(n) => n
            .as_u64()
            .map(|v| v.to_string())
            .or_else(|| n.as_i64().map(|v| v.to_string()))
            .or_else(|| n.as_f64().map(|v| v.to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn props(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_probe_respects_key_priority() {
        let p = props(json!({ "NAME": "Fallback", "ST_NM": "Karnataka" }));
        assert_eq!(probe_str(&p, STATE_NAME_KEYS).as_deref(), Some("Karnataka"));
    }

    #[test]
    fn test_probe_skips_blank_and_null_values() {
        let p = props(json!({ "pc_name": "  ", "PC_NAME": null, "PC": "Lucknow" }));
        assert_eq!(probe_str(&p, CONSTITUENCY_NAME_KEYS).as_deref(), Some("Lucknow"));
    }

    #[test]
    fn test_probe_renders_numeric_codes() {
        let p = props(json!({ "PINCODE": 226001 }));
        assert_eq!(probe_str(&p, PINCODE_KEYS).as_deref(), Some("226001"));
    }

    #[test]
    fn test_probe_missing_returns_none() {
        let p = props(json!({ "other": "x" }));
        assert!(probe_str(&p, DISTRICT_NAME_KEYS).is_none());
    }
}
