/// Axis-aligned bounding box in degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// Create bounds from (lat, lon) points
    pub fn from_points(points: &[(f64, f64)]) -> Option<Self> {
        if points.is_empty() {
            return None;
        }

        let mut min_lat = f64::MAX;
        let mut max_lat = f64::MIN;
        let mut min_lon = f64::MAX;
        let mut max_lon = f64::MIN;

        for &(lat, lon) in points {
            min_lat = min_lat.min(lat);
            max_lat = max_lat.max(lat);
            min_lon = min_lon.min(lon);
            max_lon = max_lon.max(lon);
        }

        Some(Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        })
    }

    /// Extent in latitude (degrees)
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Extent in longitude (degrees)
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounds_from_points() {
        let points = vec![(0.0, 0.0), (1.0, 2.0), (0.5, 1.0)];
        let bounds = BoundingBox::from_points(&points).unwrap();

        assert_eq!(bounds.min_lat, 0.0);
        assert_eq!(bounds.max_lat, 1.0);
        assert_eq!(bounds.min_lon, 0.0);
        assert_eq!(bounds.max_lon, 2.0);
        assert_eq!(bounds.width(), 2.0);
        assert_eq!(bounds.height(), 1.0);
        assert_eq!(bounds.center(), (0.5, 1.0));
    }

    #[test]
    fn test_bounds_empty() {
        assert!(BoundingBox::from_points(&[]).is_none());
    }
}
