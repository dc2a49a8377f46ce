pub mod boundary;
pub mod reading;
pub mod tide;

pub use boundary::{Boundary, BoundaryPoint, Coordinate, MarkerKey, parse_boundary};
pub use reading::{CompassReading, LocationFix};
pub use tide::{TideExtreme, TideReport};
