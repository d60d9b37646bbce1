//! Small on-disk GeoJSON fixtures.
//!
//! The shapes are axis-aligned rectangles placed roughly where the real areas
//! are; they are good enough for bounds, containment and search tests.

use std::fs;

use serde_json::{Value, json};
use tempfile::TempDir;
use tracing::info;

use crate::Result;
use crate::raw::DatasetKind;

/// Which fixture files to write, and which to deliberately break.
#[derive(Debug, Clone)]
pub struct TestDataConfig {
    pub datasets: Vec<DatasetKind>,
    /// Written as invalid JSON.
    pub corrupt: Vec<DatasetKind>,
}

impl Default for TestDataConfig {
    fn default() -> Self {
        Self::minimal()
    }
}

impl TestDataConfig {
    /// All four datasets, all valid.
    pub fn minimal() -> Self {
        Self {
            datasets: DatasetKind::ALL.to_vec(),
            corrupt: Vec::new(),
        }
    }

    pub fn without(mut self, dataset: DatasetKind) -> Self {
        self.datasets.retain(|d| *d != dataset);
        self
    }

    pub fn corrupt(mut self, dataset: DatasetKind) -> Self {
        self.corrupt.push(dataset);
        self
    }
}

/// Writes the configured fixture files into a fresh temporary directory.
pub fn create_test_data(config: &TestDataConfig) -> Result<TempDir> {
    info!(?config, "Creating test data");
    let dir = TempDir::new()?;
    for dataset in &config.datasets {
        let path = dir.path().join(dataset.file_name());
        if config.corrupt.contains(dataset) {
            fs::write(path, "{ \"type\": \"FeatureCollection\", \"features\": [")?;
        } else {
            fs::write(path, serde_json::to_vec_pretty(&fixture(*dataset))?)?;
        }
    }
    Ok(dir)
}

pub fn fixture(dataset: DatasetKind) -> Value {
    match dataset {
        DatasetKind::States => states_fixture(),
        DatasetKind::Districts => districts_fixture(),
        DatasetKind::Constituencies => constituencies_fixture(),
        DatasetKind::PostalPoints => postal_fixture(),
    }
}

fn rect(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Value {
    json!([[
        [min_lon, min_lat],
        [max_lon, min_lat],
        [max_lon, max_lat],
        [min_lon, max_lat],
        [min_lon, min_lat]
    ]])
}

fn polygon(min_lon: f64, min_lat: f64, max_lon: f64, max_lat: f64) -> Value {
    json!({ "type": "Polygon", "coordinates": rect(min_lon, min_lat, max_lon, max_lat) })
}

fn point(lon: f64, lat: f64) -> Value {
    json!({ "type": "Point", "coordinates": [lon, lat] })
}

fn collection(features: Vec<Value>) -> Value {
    json!({ "type": "FeatureCollection", "features": features })
}

fn feature(properties: Value, geometry: Value) -> Value {
    json!({ "type": "Feature", "properties": properties, "geometry": geometry })
}

pub fn states_fixture() -> Value {
    collection(vec![
        feature(json!({ "ST_NM": "Uttar Pradesh" }), polygon(77.4, 23.8, 84.6, 30.4)),
        feature(json!({ "ST_NM": "Karnataka" }), polygon(74.0, 11.5, 78.6, 18.5)),
        feature(json!({ "NAME": "Delhi" }), polygon(76.8, 28.4, 77.35, 28.9)),
        feature(
            json!({ "STATE": "Maharashtra" }),
            json!({
                "type": "MultiPolygon",
                "coordinates": [rect(72.6, 15.6, 80.9, 22.0), rect(72.7, 18.8, 72.78, 18.86)]
            }),
        ),
    ])
}

pub fn districts_fixture() -> Value {
    collection(vec![
        feature(
            json!({ "DISTRICT": "Lucknow", "ST_NM": "Uttar Pradesh" }),
            polygon(80.6, 26.6, 81.2, 27.1),
        ),
        feature(
            json!({ "DISTRICT": "Kanpur Nagar", "ST_NM": "Uttar Pradesh" }),
            polygon(80.0, 26.2, 80.6, 26.7),
        ),
        feature(
            json!({ "DISTRICT": "Bengaluru Urban", "ST_NM": "Karnataka" }),
            polygon(77.3, 12.8, 77.9, 13.2),
        ),
        feature(
            json!({ "DISTRICT": "New Delhi", "ST_NM": "Delhi" }),
            polygon(77.1, 28.55, 77.25, 28.7),
        ),
        feature(
            json!({ "DIST_NAME": "Mumbai", "STATE": "Maharashtra" }),
            polygon(72.8, 18.9, 73.0, 19.3),
        ),
    ])
}

pub fn constituencies_fixture() -> Value {
    collection(vec![
        feature(
            json!({ "pc_name": "Lucknow", "ST_NAME": "Uttar Pradesh", "pc_no": 35 }),
            polygon(80.8, 26.7, 81.1, 27.0),
        ),
        feature(
            json!({ "pc_name": "Bangalore South", "ST_NAME": "Karnataka", "pc_no": 26 }),
            polygon(77.5, 12.85, 77.65, 12.98),
        ),
        feature(
            json!({ "PC_NAME": "New Delhi", "ST_NAME": "Delhi", "pc_no": 4 }),
            polygon(77.15, 28.56, 77.24, 28.64),
        ),
        feature(
            json!({ "pc_name": "Mumbai North", "ST_NAME": "Maharashtra", "pc_no": 26 }),
            json!({
                "type": "MultiPolygon",
                "coordinates": [rect(72.82, 19.15, 72.9, 19.27), rect(72.78, 19.2, 72.81, 19.24)]
            }),
        ),
        feature(
            json!({ "pc_name": "Kanpur", "ST_NAME": "Uttar Pradesh", "pc_no": 43 }),
            polygon(80.2, 26.35, 80.45, 26.55),
        ),
    ])
}

/// Postal points. `110001`, `110002`, `110045` appear in that order; the tail
/// holds records the postal index build must skip or special-case.
pub fn postal_fixture() -> Value {
    collection(vec![
        feature(
            json!({
                "Pincode": "110001", "Office_Name": "Connaught Place", "District": "New Delhi",
                "StateName": "Delhi", "Division": "New Delhi Central", "Region": "Delhi", "Circle": "Delhi"
            }),
            point(77.21, 28.65),
        ),
        feature(
            json!({ "Pincode": "110002", "Office_Name": "Indraprastha", "District": "New Delhi" }),
            point(77.24, 28.64),
        ),
        feature(
            json!({ "Pincode": "110045", "Office_Name": "Palam", "District": "South West Delhi" }),
            point(77.08, 28.6),
        ),
        feature(
            json!({ "PINCODE": "560001", "Office_Name": "Bengaluru GPO", "District": "Bengaluru Urban" }),
            point(77.59, 12.97),
        ),
        feature(json!({ "pincode": 226001, "Office_Name": "Lucknow GPO" }), point(80.94, 26.85)),
        feature(json!({ "Office_Name": "No Code" }), point(78.0, 20.0)),
        feature(json!({ "Pincode": "12" }), point(78.0, 20.0)),
        feature(
            json!({ "PIN": "400001", "Office_Name": "Mumbai GPO" }),
            polygon(72.83, 18.93, 72.84, 18.94),
        ),
        feature(json!({ "Pincode": "400002" }), Value::Null),
    ])
}
