use geo::{Distance, Haversine};
use std::time::Duration;

use crate::domain::LocationFix;

/// Drops location fixes that arrive too soon or too close to the last one kept.
///
/// A fix is kept only when at least `min_interval` has passed (by fix
/// timestamp) *and* the position moved at least `min_distance_m` metres.
/// The first fix is always kept.
#[derive(Debug, Clone)]
pub struct LocationThrottle {
    min_interval: Duration,
    min_distance_m: f64,
    last: Option<LocationFix>,
}

impl LocationThrottle {
    pub fn new(min_interval: Duration, min_distance_m: f64) -> Self {
        Self {
            min_interval,
            min_distance_m,
            last: None,
        }
    }

    /// Returns true if `fix` should be forwarded, and remembers it if so
    pub fn admit(&mut self, fix: &LocationFix) -> bool {
        if let Some(last) = &self.last {
            let elapsed = (fix.timestamp - last.timestamp)
                .to_std()
                .unwrap_or(Duration::ZERO);
            if elapsed < self.min_interval {
                return false;
            }

            let moved = Haversine::distance(last.point(), fix.point());
            if moved < self.min_distance_m {
                return false;
            }
        }

        self.last = Some(*fix);
        true
    }
}
