use geo::{ChamberlainDuquetteArea, Polygon};

use crate::domain::boundary::closed_ring;

/// Spherical area enclosed by a (lat, lon) boundary, in square metres.
///
/// Uses the Chamberlain-Duquette approximation on a spherical earth.
/// Returns 0.0 when the boundary has fewer than three distinct points.
pub fn polygon_area_m2(boundary: &[(f64, f64)]) -> f64 {
    match closed_ring(boundary) {
        Some(ring) => Polygon::new(ring, vec![]).chamberlain_duquette_unsigned_area(),
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_area_too_few_points() {
        assert_eq!(polygon_area_m2(&[]), 0.0);
        assert_eq!(polygon_area_m2(&[(0.0, 0.0), (1.0, 1.0)]), 0.0);
    }

    #[test]
    fn test_area_small_square_at_equator() {
        // 0.001 degrees is about 111.3 m at the equator
        let square = [(0.0, 0.0), (0.0, 0.001), (0.001, 0.001), (0.001, 0.0)];
        let area = polygon_area_m2(&square);
        assert!((area - 12_392.0).abs() < 100.0, "area was {}", area);
    }

    #[test]
    fn test_area_independent_of_winding() {
        let cw = [(0.0, 0.0), (0.001, 0.0), (0.001, 0.001), (0.0, 0.001)];
        let ccw = [(0.0, 0.0), (0.0, 0.001), (0.001, 0.001), (0.001, 0.0)];
        assert!((polygon_area_m2(&cw) - polygon_area_m2(&ccw)).abs() < 1e-6);
    }
}
