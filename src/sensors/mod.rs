//! Sensor streams: sources of readings and the subscriptions that drain them

pub mod replay;
pub mod subscription;
pub mod throttle;

pub use replay::{IterSource, ReplaySource};
pub use subscription::Subscription;
pub use throttle::LocationThrottle;

use crate::error::Result;

/// A stream of sensor readings, pulled one at a time
pub trait SensorSource: Send {
    type Reading: Send + 'static;

    /// Sensor name for logs and errors, e.g. "location"
    fn name(&self) -> &'static str;

    /// The next reading, or `None` once the stream has ended
    fn next_reading(&mut self) -> Result<Option<Self::Reading>>;
}

impl<S: SensorSource + ?Sized> SensorSource for Box<S> {
    type Reading = S::Reading;

    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn next_reading(&mut self) -> Result<Option<Self::Reading>> {
        (**self).next_reading()
    }
}
