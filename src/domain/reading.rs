use chrono::{DateTime, Utc};
use geo::Point;
use serde::Deserialize;

/// A position fix from the location stream
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Recorded tracks may omit this; the fix is then stamped on arrival
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl LocationFix {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
            timestamp: Utc::now(),
        }
    }

    /// Position as a geo point (x = lon, y = lat)
    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }
}

/// A raw magnetometer sample in microtesla
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct CompassReading {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl CompassReading {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            x,
            y,
            z,
            timestamp: Utc::now(),
        }
    }

    /// Heading in degrees clockwise from magnetic north, assuming the device lies flat
    pub fn heading_degrees(&self) -> f64 {
        let heading = self.y.atan2(self.x).to_degrees();
        (90.0 - heading).rem_euclid(360.0)
    }
}
