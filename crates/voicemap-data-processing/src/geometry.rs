//! Geometry primitives and the bounding-box calculator.
//!
//! GeoJSON geometries arrive loosely typed. [`Geometry::from_value`] accepts the
//! three tags the map layers use (`Point`, `Polygon`, `MultiPolygon`) and returns
//! `None` for anything else, so callers never have to deal with a half-parsed
//! shape. All positions are `[longitude, latitude]`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A `[longitude, latitude]` position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Coordinate {
    pub lon: f64,
    pub lat: f64,
}

impl Coordinate {
    pub const fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }

    fn from_position(value: &Value) -> Option<Self> {
        let position = value.as_array()?;
        if position.len() < 2 {
            return None;
        }
        let lon = position[0].as_f64()?;
        let lat = position[1].as_f64()?;
        (lon.is_finite() && lat.is_finite()).then_some(Self { lon, lat })
    }
}

impl From<[f64; 2]> for Coordinate {
    fn from([lon, lat]: [f64; 2]) -> Self {
        Self { lon, lat }
    }
}

impl From<Coordinate> for [f64; 2] {
    fn from(c: Coordinate) -> Self {
        [c.lon, c.lat]
    }
}

/// Axis-aligned box, serialized as `[[minLon, minLat], [maxLon, maxLat]]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[[f64; 2]; 2]", into = "[[f64; 2]; 2]")]
pub struct BoundingBox {
    pub min: Coordinate,
    pub max: Coordinate,
}

impl BoundingBox {
    /// Zero-area box at a single position.
    pub const fn at(c: Coordinate) -> Self {
        Self { min: c, max: c }
    }

    /// Builds a box from two opposite corners in any order.
    pub fn from_corners(a: Coordinate, b: Coordinate) -> Self {
        Self {
            min: Coordinate::new(a.lon.min(b.lon), a.lat.min(b.lat)),
            max: Coordinate::new(a.lon.max(b.lon), a.lat.max(b.lat)),
        }
    }

    fn extend(&mut self, c: Coordinate) {
        self.min.lon = self.min.lon.min(c.lon);
        self.min.lat = self.min.lat.min(c.lat);
        self.max.lon = self.max.lon.max(c.lon);
        self.max.lat = self.max.lat.max(c.lat);
    }

    pub fn width(&self) -> f64 {
        self.max.lon - self.min.lon
    }

    pub fn height(&self) -> f64 {
        self.max.lat - self.min.lat
    }

    /// Rough area in square degrees. Used only to order overlapping regions.
    pub fn area(&self) -> f64 {
        (self.width() * self.height()).abs()
    }

    /// True when the box cannot be fitted by a camera (zero width or height).
    pub fn is_degenerate(&self) -> bool {
        !(self.min.lon < self.max.lon && self.min.lat < self.max.lat)
    }

    pub fn center(&self) -> Coordinate {
        Coordinate::new(
            (self.min.lon + self.max.lon) / 2.0,
            (self.min.lat + self.max.lat) / 2.0,
        )
    }

    pub fn contains(&self, c: Coordinate) -> bool {
        c.lon >= self.min.lon && c.lon <= self.max.lon && c.lat >= self.min.lat && c.lat <= self.max.lat
    }
}

impl From<[[f64; 2]; 2]> for BoundingBox {
    fn from([min, max]: [[f64; 2]; 2]) -> Self {
        Self {
            min: min.into(),
            max: max.into(),
        }
    }
}

impl From<BoundingBox> for [[f64; 2]; 2] {
    fn from(b: BoundingBox) -> Self {
        [b.min.into(), b.max.into()]
    }
}

pub type Ring = Vec<Coordinate>;

/// The geometry shapes the boundary and postal datasets use.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Coordinate),
    /// Exterior ring followed by holes.
    Polygon(Vec<Ring>),
    MultiPolygon(Vec<Vec<Ring>>),
}

impl Geometry {
    /// Parses a GeoJSON geometry object.
    ///
    /// Returns `None` for unsupported tags and for any position that is not a
    /// pair of finite numbers.
    pub fn from_value(value: &Value) -> Option<Self> {
        let coordinates = value.get("coordinates")?;
        match value.get("type")?.as_str()? {
            "Point" => Coordinate::from_position(coordinates).map(Self::Point),
            "Polygon" => parse_polygon(coordinates).map(Self::Polygon),
            "MultiPolygon" => coordinates
                .as_array()?
                .iter()
                .map(parse_polygon)
                .collect::<Option<Vec<_>>>()
                .map(Self::MultiPolygon),
            _ => None,
        }
    }

    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Point(_) => "Point",
            Self::Polygon(_) => "Polygon",
            Self::MultiPolygon(_) => "MultiPolygon",
        }
    }

    fn positions(&self) -> Box<dyn Iterator<Item = Coordinate> + '_> {
        match self {
            Self::Point(c) => Box::new(std::iter::once(*c)),
            Self::Polygon(rings) => Box::new(rings.iter().flatten().copied()),
            Self::MultiPolygon(polygons) => {
                Box::new(polygons.iter().flatten().flatten().copied())
            }
        }
    }

    fn exterior_rings(&self) -> Vec<&Ring> {
        match self {
            Self::Point(_) => Vec::new(),
            Self::Polygon(rings) => rings.first().into_iter().collect(),
            Self::MultiPolygon(polygons) => polygons.iter().filter_map(|p| p.first()).collect(),
        }
    }

    /// Componentwise min/max over every position.
    ///
    /// A point yields a zero-area box. Empty coordinate arrays yield `None`.
    /// Ring closing positions repeat the first vertex, so they never move the
    /// extremes.
    pub fn bounds(&self) -> Option<BoundingBox> {
        let mut positions = self.positions();
        let first = positions.next()?;
        let mut bbox = BoundingBox::at(first);
        for c in positions {
            bbox.extend(c);
        }
        Some(bbox)
    }

    /// Mean of the exterior ring vertices, closing vertex excluded.
    pub fn centroid(&self) -> Option<Coordinate> {
        if let Self::Point(c) = self {
            return Some(*c);
        }
        let (mut sum_lon, mut sum_lat, mut count) = (0.0, 0.0, 0usize);
        for ring in self.exterior_rings() {
            for c in open_ring(ring) {
                sum_lon += c.lon;
                sum_lat += c.lat;
                count += 1;
            }
        }
        (count > 0).then(|| Coordinate::new(sum_lon / count as f64, sum_lat / count as f64))
    }

    /// Point-in-polygon test. Points inside a hole are outside.
    pub fn contains(&self, c: Coordinate) -> bool {
        match self {
            Self::Point(_) => false,
            Self::Polygon(rings) => polygon_contains(rings, c),
            Self::MultiPolygon(polygons) => polygons.iter().any(|p| polygon_contains(p, c)),
        }
    }
}

/// Bounding box of a raw GeoJSON geometry value.
///
/// This is the entry point used on data that has not been through
/// [`Geometry::from_value`]; malformed or unsupported input gives `None`.
pub fn bounds_from_value(value: &Value) -> Option<BoundingBox> {
    Geometry::from_value(value)?.bounds()
}

fn parse_polygon(value: &Value) -> Option<Vec<Ring>> {
    value.as_array()?.iter().map(parse_ring).collect()
}

fn parse_ring(value: &Value) -> Option<Ring> {
    value.as_array()?.iter().map(Coordinate::from_position).collect()
}

fn open_ring(ring: &Ring) -> &[Coordinate] {
    match ring.as_slice() {
        [first, .., last] if first == last => &ring[..ring.len() - 1],
        all => all,
    }
}

fn polygon_contains(rings: &[Ring], c: Coordinate) -> bool {
    let Some((exterior, holes)) = rings.split_first() else {
        return false;
    };
    ring_contains(exterior, c) && !holes.iter().any(|hole| ring_contains(hole, c))
}

// Even-odd ray casting along +lon.
fn ring_contains(ring: &Ring, c: Coordinate) -> bool {
    let vertices = open_ring(ring);
    if vertices.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (a, b) = (vertices[i], vertices[j]);
        if (a.lat > c.lat) != (b.lat > c.lat) {
            let crossing = (b.lon - a.lon) * (c.lat - a.lat) / (b.lat - a.lat) + a.lon;
            if c.lon < crossing {
                inside = !inside;
            }
        }
        j = i;
    }
    inside
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn square(min: f64, max: f64) -> Value {
        json!([[[min, min], [max, min], [max, max], [min, max], [min, min]]])
    }

    #[test]
    fn test_polygon_bounds_cover_every_vertex() {
        let geometry = json!({
            "type": "Polygon",
            "coordinates": [[[77.1, 28.5], [77.3, 28.52], [77.25, 28.7], [77.05, 28.66], [77.1, 28.5]]]
        });
        let bbox = bounds_from_value(&geometry).unwrap();

        assert_eq!(bbox.min, Coordinate::new(77.05, 28.5));
        assert_eq!(bbox.max, Coordinate::new(77.3, 28.7));
        assert!(!bbox.is_degenerate());

        let parsed = Geometry::from_value(&geometry).unwrap();
        for c in parsed.positions() {
            assert!(bbox.contains(c));
        }
    }

    #[test]
    fn test_multipolygon_bounds_span_all_parts() {
        let geometry = json!({
            "type": "MultiPolygon",
            "coordinates": [square(0.0, 1.0), square(5.0, 7.0)]
        });
        let bbox = bounds_from_value(&geometry).unwrap();
        assert_eq!(bbox.min, Coordinate::new(0.0, 0.0));
        assert_eq!(bbox.max, Coordinate::new(7.0, 7.0));
    }

    #[test]
    fn test_point_bounds_are_zero_area() {
        let geometry = json!({ "type": "Point", "coordinates": [77.21, 28.65] });
        let bbox = bounds_from_value(&geometry).unwrap();
        assert_eq!(bbox.min, bbox.max);
        assert!(bbox.is_degenerate());
        assert_eq!(bbox.center(), Coordinate::new(77.21, 28.65));
    }

    #[test]
    fn test_unsupported_or_malformed_geometry_returns_none() {
        let cases = [
            json!({ "type": "LineString", "coordinates": [[0.0, 0.0], [1.0, 1.0]] }),
            json!({ "type": "Polygon" }),
            json!({ "type": "Polygon", "coordinates": [] }),
            json!({ "type": "Polygon", "coordinates": [[]] }),
            json!({ "type": "Polygon", "coordinates": [[["a", 1.0]]] }),
            json!({ "type": "Point", "coordinates": [1.0] }),
            json!({ "coordinates": [1.0, 2.0] }),
            json!(null),
            json!("Polygon"),
        ];
        for case in cases {
            assert!(bounds_from_value(&case).is_none(), "expected None for {case}");
        }
    }

    #[test]
    fn test_centroid_skips_closing_vertex() {
        let geometry = Geometry::from_value(&json!({
            "type": "Polygon",
            "coordinates": square(0.0, 2.0)
        }))
        .unwrap();
        assert_eq!(geometry.centroid(), Some(Coordinate::new(1.0, 1.0)));
    }

    #[test]
    fn test_contains_respects_holes() {
        let geometry = Geometry::from_value(&json!({
            "type": "Polygon",
            "coordinates": [
                [[0.0, 0.0], [10.0, 0.0], [10.0, 10.0], [0.0, 10.0], [0.0, 0.0]],
                [[4.0, 4.0], [6.0, 4.0], [6.0, 6.0], [4.0, 6.0], [4.0, 4.0]]
            ]
        }))
        .unwrap();

        assert!(geometry.contains(Coordinate::new(1.0, 1.0)));
        assert!(!geometry.contains(Coordinate::new(5.0, 5.0)));
        assert!(!geometry.contains(Coordinate::new(11.0, 5.0)));
    }

    #[test]
    fn test_bbox_serializes_as_corner_pairs() {
        let bbox = BoundingBox::from_corners(Coordinate::new(2.0, 3.0), Coordinate::new(1.0, 4.0));
        let value = serde_json::to_value(bbox).unwrap();
        assert_eq!(value, json!([[1.0, 3.0], [2.0, 4.0]]));
    }
}
