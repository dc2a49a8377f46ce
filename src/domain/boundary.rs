use geo::{LineString, Polygon};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Result, SurveyError};

/// Identity of a placed marker, assigned by the [`Boundary`] in drawing order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerKey(pub u64);

impl std::fmt::Display for MarkerKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "m{}", self.0)
    }
}

/// Wire shape of a coordinate, shared by boundary files and marker uploads
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// A user-placed boundary marker
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryPoint {
    pub key: MarkerKey,
    pub latitude: f64,
    pub longitude: f64,
}

impl BoundaryPoint {
    pub fn coordinate(&self) -> Coordinate {
        Coordinate {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Ordered sequence of boundary markers
///
/// The polygon is never stored; [`Boundary::polygon`] closes the ring from
/// the current markers every time it is asked.
#[derive(Debug, Clone, Default)]
pub struct Boundary {
    points: Vec<BoundaryPoint>,
    next_key: u64,
}

impl Boundary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a boundary from (lat, lon) pairs in drawing order
    pub fn from_coords<I>(coords: I) -> Self
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut boundary = Self::new();
        for (lat, lon) in coords {
            boundary.add(lat, lon);
        }
        boundary
    }

    /// Append a marker and return its key
    pub fn add(&mut self, latitude: f64, longitude: f64) -> MarkerKey {
        let key = MarkerKey(self.next_key);
        self.next_key += 1;
        self.points.push(BoundaryPoint {
            key,
            latitude,
            longitude,
        });
        key
    }

    /// Remove the marker with `key`. Returns false if no such marker exists.
    pub fn remove(&mut self, key: MarkerKey) -> bool {
        let before = self.points.len();
        self.points.retain(|p| p.key != key);
        self.points.len() != before
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    pub fn points(&self) -> &[BoundaryPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Points as (lat, lon) pairs
    pub fn coords(&self) -> Vec<(f64, f64)> {
        self.points
            .iter()
            .map(|p| (p.latitude, p.longitude))
            .collect()
    }

    pub fn coordinates(&self) -> Vec<Coordinate> {
        self.points.iter().map(BoundaryPoint::coordinate).collect()
    }

    /// Number of distinct positions among the markers
    pub fn distinct_count(&self) -> usize {
        distinct_count(&self.coords())
    }

    /// A polygon needs at least three distinct positions
    pub fn is_polygon(&self) -> bool {
        self.distinct_count() >= 3
    }

    /// The closed ring (first point repeated at the end), if the boundary forms a polygon
    pub fn ring(&self) -> Option<LineString<f64>> {
        closed_ring(&self.coords())
    }

    pub fn polygon(&self) -> Option<Polygon<f64>> {
        self.ring().map(|ring| Polygon::new(ring, vec![]))
    }
}

pub(crate) fn distinct_count(coords: &[(f64, f64)]) -> usize {
    // Adding +0.0 folds -0.0 into +0.0 so both zeros hash alike
    coords
        .iter()
        .map(|&(lat, lon)| ((lat + 0.0).to_bits(), (lon + 0.0).to_bits()))
        .collect::<HashSet<_>>()
        .len()
}

/// Close a (lat, lon) sequence into a ring in geo's x = lon, y = lat convention
pub(crate) fn closed_ring(coords: &[(f64, f64)]) -> Option<LineString<f64>> {
    if distinct_count(coords) < 3 {
        return None;
    }

    let mut ring: Vec<geo::Coord<f64>> = coords
        .iter()
        .map(|&(lat, lon)| geo::coord! { x: lon, y: lat })
        .collect();
    ring.push(ring[0]);

    Some(LineString::new(ring))
}

/// Parse boundary input into (lat, lon) pairs.
///
/// Accepts a JSON array of `{"latitude", "longitude"}` objects, or plain text
/// with one `lat,lon` pair per line. Blank lines and `#` comments are skipped.
pub fn parse_boundary(input: &str) -> Result<Vec<(f64, f64)>> {
    let trimmed = input.trim_start();
    if trimmed.starts_with('[') {
        let coords: Vec<Coordinate> = serde_json::from_str(trimmed)
            .map_err(|e| SurveyError::InvalidBoundary(format!("bad JSON: {}", e)))?;
        return Ok(coords.iter().map(|c| (c.latitude, c.longitude)).collect());
    }

    let mut points = Vec::new();
    for (lineno, line) in input.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let point = parse_lat_lon(line)
            .map_err(|e| SurveyError::InvalidBoundary(format!("line {}: {}", lineno + 1, e)))?;
        points.push(point);
    }
    Ok(points)
}

/// Parse a single `lat,lon` pair
pub fn parse_lat_lon(s: &str) -> std::result::Result<(f64, f64), String> {
    let (lat, lon) = s
        .split_once(',')
        .ok_or_else(|| format!("expected 'lat,lon', got '{}'", s))?;
    let lat: f64 = lat
        .trim()
        .parse()
        .map_err(|_| format!("invalid latitude '{}'", lat.trim()))?;
    let lon: f64 = lon
        .trim()
        .parse()
        .map_err(|_| format!("invalid longitude '{}'", lon.trim()))?;

    if !(-90.0..=90.0).contains(&lat) {
        return Err(format!("latitude {} out of range", lat));
    }
    if !(-180.0..=180.0).contains(&lon) {
        return Err(format!("longitude {} out of range", lon));
    }
    Ok((lat, lon))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_remove_markers() {
        let mut boundary = Boundary::new();
        let a = boundary.add(1.0, 2.0);
        let b = boundary.add(3.0, 4.0);
        assert_ne!(a, b);
        assert_eq!(boundary.len(), 2);

        assert!(boundary.remove(a));
        assert!(!boundary.remove(a));
        assert_eq!(boundary.coords(), vec![(3.0, 4.0)]);
    }

    #[test]
    fn test_keys_not_reused_after_removal() {
        let mut boundary = Boundary::new();
        let a = boundary.add(0.0, 0.0);
        boundary.remove(a);
        let b = boundary.add(0.0, 0.0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_ring_is_closed() {
        let boundary = Boundary::from_coords([(0.0, 0.0), (0.0, 2.0), (2.0, 2.0)]);
        let ring = boundary.ring().unwrap();
        assert_eq!(ring.0.len(), 4);
        assert_eq!(ring.0.first(), ring.0.last());
        // x is longitude
        assert_eq!(ring.0[1], geo::coord! { x: 2.0, y: 0.0 });
    }

    #[test]
    fn test_duplicate_points_do_not_form_polygon() {
        let boundary = Boundary::from_coords([(1.0, 1.0), (1.0, 1.0), (2.0, 2.0)]);
        assert_eq!(boundary.len(), 3);
        assert!(!boundary.is_polygon());
        assert!(boundary.polygon().is_none());
    }

    #[test]
    fn test_parse_plain_lines() {
        let input = "# survey plot\n10.5, 106.7\n\n10.6,106.8\n";
        let points = parse_boundary(input).unwrap();
        assert_eq!(points, vec![(10.5, 106.7), (10.6, 106.8)]);
    }

    #[test]
    fn test_parse_json_markers() {
        let input =
            r#"[{"latitude": 1.5, "longitude": -2.5}, {"latitude": 3.0, "longitude": 4.0}]"#;
        let points = parse_boundary(input).unwrap();
        assert_eq!(points, vec![(1.5, -2.5), (3.0, 4.0)]);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_boundary("1.0,2.0\nnot a point\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
        assert!(parse_lat_lon("95.0,0.0").is_err());
        assert!(parse_lat_lon("0.0,181.0").is_err());
    }
}
