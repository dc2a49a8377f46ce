//! GeoJSON output of a boundary and its grid

use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use serde_json::json;
use std::fs;
use std::path::Path;

use crate::domain::boundary::closed_ring;
use crate::error::Result;
use crate::geometry::{GridResult, SamplePoint};

fn position(lat: f64, lon: f64) -> Vec<f64> {
    vec![lon, lat]
}

fn feature(geometry: Value, properties: serde_json::Value) -> Feature {
    let properties: Option<JsonObject> = match properties {
        serde_json::Value::Object(map) => Some(map),
        _ => None,
    };
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geometry)),
        id: None,
        properties,
        foreign_members: None,
    }
}

fn point_position(p: &SamplePoint) -> Vec<f64> {
    position(p.latitude, p.longitude)
}

/// Build a feature collection: the boundary polygon followed by cells, points and edges.
///
/// Every feature carries a `kind` property (`boundary`, `cell`, `point`, `edge`).
pub fn grid_to_geojson(boundary: &[(f64, f64)], result: &GridResult) -> GeoJson {
    let mut features = Vec::new();

    if let Some(ring) = closed_ring(boundary) {
        let ring: Vec<Vec<f64>> = ring.0.iter().map(|c| vec![c.x, c.y]).collect();
        features.push(feature(
            Value::Polygon(vec![ring]),
            json!({ "kind": "boundary" }),
        ));
    }

    for cell in result.cells() {
        let ring = cell
            .ring
            .iter()
            .map(|&(lat, lon)| position(lat, lon))
            .collect();
        features.push(feature(
            Value::Polygon(vec![ring]),
            json!({ "kind": "cell", "row": cell.row, "col": cell.col }),
        ));
    }

    let points = result.points();
    for p in points {
        features.push(feature(
            Value::Point(point_position(p)),
            json!({ "kind": "point", "row": p.row, "col": p.col }),
        ));
    }

    for edge in result.edges() {
        let (from, to) = (&points[edge.from], &points[edge.to]);
        features.push(feature(
            Value::LineString(vec![point_position(from), point_position(to)]),
            json!({ "kind": "edge", "from": edge.from, "to": edge.to }),
        ));
    }

    GeoJson::FeatureCollection(FeatureCollection {
        bbox: result
            .bounds()
            .map(|b| vec![b.min_lon, b.min_lat, b.max_lon, b.max_lat]),
        features,
        foreign_members: None,
    })
}

/// Write the grid as GeoJSON to `path`
pub fn write_geojson(path: &Path, boundary: &[(f64, f64)], result: &GridResult) -> Result<()> {
    let geojson = grid_to_geojson(boundary, result);
    fs::write(path, geojson.to_string())?;
    tracing::debug!(path = %path.display(), "wrote geojson");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{GridOptions, GridShape, build_grid};

    const SQUARE: [(f64, f64); 4] = [(0.0, 0.0), (0.0, 2.0), (2.0, 2.0), (2.0, 0.0)];

    fn kinds(geojson: &GeoJson) -> Vec<String> {
        match geojson {
            GeoJson::FeatureCollection(fc) => fc
                .features
                .iter()
                .map(|f| f.property("kind").unwrap().as_str().unwrap().to_string())
                .collect(),
            _ => panic!("expected a feature collection"),
        }
    }

    #[test]
    fn test_square_grid_features() {
        let result = build_grid(&SQUARE, &GridOptions::new(1.0, GridShape::Square)).unwrap();
        let geojson = grid_to_geojson(&SQUARE, &result);

        let kinds = kinds(&geojson);
        assert_eq!(kinds[0], "boundary");
        assert_eq!(kinds.iter().filter(|k| *k == "cell").count(), 4);
    }

    #[test]
    fn test_point_grid_features() {
        let boundary = [(0.0, 0.0), (0.0, 4.0), (4.0, 4.0), (4.0, 0.0)];
        let result = build_grid(&boundary, &GridOptions::new(1.0, GridShape::Point)).unwrap();
        let geojson = grid_to_geojson(&boundary, &result);

        let kinds = kinds(&geojson);
        // 3x3 interior points, 6 east edges + 6 south edges
        assert_eq!(kinds.iter().filter(|k| *k == "point").count(), 9);
        assert_eq!(kinds.iter().filter(|k| *k == "edge").count(), 12);
    }

    #[test]
    fn test_empty_grid_has_no_features() {
        let geojson = grid_to_geojson(&[(0.0, 0.0)], &GridResult::Empty);
        assert!(kinds(&geojson).is_empty());
    }

    #[test]
    fn test_write_geojson() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.geojson");
        let result = build_grid(&SQUARE, &GridOptions::new(1.0, GridShape::Square)).unwrap();

        write_geojson(&path, &SQUARE, &result).unwrap();

        let parsed: GeoJson = fs::read_to_string(&path).unwrap().parse().unwrap();
        assert_eq!(kinds(&parsed).len(), 5);
    }
}
