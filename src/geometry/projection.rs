use super::BoundingBox;

/// Meters per degree of latitude (and of longitude at the equator)
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Equirectangular scale from degrees to ground metres around a centre latitude
///
/// - east-west = d_lon * cos(center_lat) * 111320
/// - north-south = d_lat * 111320
///
/// Good enough for survey plots a few kilometres across, which is all we
/// use it for: telling the user how big a lattice step and the plot are
/// on the ground.
#[derive(Debug, Clone)]
pub struct Projector {
    cos_lat: f64,
}

impl Projector {
    /// Create a projector for plots centred at (lat, lon)
    pub fn new(center: (f64, f64)) -> Self {
        let (lat, _) = center;
        Self {
            cos_lat: lat.to_radians().cos(),
        }
    }

    /// Ground size of one lattice step as (north-south, east-west) metres
    pub fn step_meters(&self, spacing_deg: f64) -> (f64, f64) {
        let north = spacing_deg * METERS_PER_DEGREE;
        let east = spacing_deg * self.cos_lat * METERS_PER_DEGREE;
        (north, east)
    }

    /// Ground size of a bounding box as (north-south, east-west) metres
    pub fn extent_meters(&self, bounds: &BoundingBox) -> (f64, f64) {
        (
            bounds.height() * METERS_PER_DEGREE,
            bounds.width() * self.cos_lat * METERS_PER_DEGREE,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_1km() {
        let bounds =
            BoundingBox::from_points(&[(10.7769, 106.7009), (10.7859, 106.7009)]).unwrap();
        let (north, east) = Projector::new(bounds.center()).extent_meters(&bounds);
        assert!((north - 1000.0).abs() < 50.0);
        assert_eq!(east, 0.0);
    }

    #[test]
    fn test_step_meters_shrinks_east_west_away_from_equator() {
        let equator = Projector::new((0.0, 0.0)).step_meters(0.001);
        let north = Projector::new((60.0, 0.0)).step_meters(0.001);

        assert!((equator.0 - 111.32).abs() < 1e-9);
        assert!((equator.1 - 111.32).abs() < 1e-9);
        assert!((north.1 - 55.66).abs() < 0.01);
    }

    #[test]
    fn test_extent_matches_steps() {
        let bounds = BoundingBox::from_points(&[(0.0, 0.0), (0.002, 0.003)]).unwrap();
        let proj = Projector::new(bounds.center());
        let (north, east) = proj.extent_meters(&bounds);
        let (step_n, step_e) = proj.step_meters(0.001);
        assert!((north - 2.0 * step_n).abs() < 1e-6);
        assert!((east - 3.0 * step_e).abs() < 1e-6);
    }
}
