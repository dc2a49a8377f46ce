//! Live telemetry: location and compass streams pushed to the remote store
//!
//! Each stream runs on its own subscription worker and writes to its own
//! key, so writes for one key are always in reading order while the two keys
//! race freely. Failed writes are logged and dropped.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::api::store::{RemoteStore, StoreKey, compass_payload, location_payload};
use crate::config::MonitorConfig;
use crate::domain::{CompassReading, LocationFix};
use crate::error::{Result, SurveyError};
use crate::sensors::{LocationThrottle, SensorSource, Subscription};

pub type LocationStream = Box<dyn SensorSource<Reading = LocationFix>>;
pub type CompassStream = Box<dyn SensorSource<Reading = CompassReading>>;

#[derive(Debug, Clone, Copy)]
pub struct MonitorOptions {
    pub location_interval: Duration,
    pub location_distance_m: f64,
    pub compass_interval: Duration,
    /// Pause between pulls from a source; replayed tracks use this to pace themselves
    pub poll_interval: Duration,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        MonitorOptions::from(&MonitorConfig::default())
    }
}

impl From<&MonitorConfig> for MonitorOptions {
    fn from(config: &MonitorConfig) -> Self {
        Self {
            location_interval: Duration::from_millis(config.location_interval_ms),
            location_distance_m: config.location_distance_m,
            compass_interval: Duration::from_millis(config.compass_interval_ms),
            poll_interval: Duration::ZERO,
        }
    }
}

/// Per-stream counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamStats {
    /// Readings produced by the source
    pub received: usize,
    /// Readings dropped by the location throttle
    pub throttled: usize,
    pub written: usize,
    pub failed: usize,
}

#[derive(Debug, Default)]
struct StreamCounters {
    received: AtomicUsize,
    throttled: AtomicUsize,
    written: AtomicUsize,
    failed: AtomicUsize,
}

impl StreamCounters {
    fn snapshot(&self) -> StreamStats {
        StreamStats {
            received: self.received.load(Ordering::Relaxed),
            throttled: self.throttled.load(Ordering::Relaxed),
            written: self.written.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Default)]
struct MonitorState {
    location: Mutex<Option<LocationFix>>,
    compass: Mutex<Option<CompassReading>>,
    location_stats: StreamCounters,
    compass_stats: StreamCounters,
}

fn write(
    store: &dyn RemoteStore,
    key: StoreKey,
    value: &serde_json::Value,
    counters: &StreamCounters,
) {
    match store.put(key, value) {
        Ok(()) => {
            counters.written.fetch_add(1, Ordering::Relaxed);
        }
        Err(e) => {
            counters.failed.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(%key, error = %e, "telemetry write failed");
        }
    }
}

/// Turn a denied sensor into a disabled one.
///
/// Permission denial is logged and yields `Ok(None)`; any other error is
/// passed through.
pub fn permit<T>(opened: Result<T>) -> Result<Option<T>> {
    match opened {
        Ok(source) => Ok(Some(source)),
        Err(SurveyError::PermissionDenied { sensor }) => {
            tracing::warn!(sensor, "permission denied; live {} disabled", sensor);
            Ok(None)
        }
        Err(e) => Err(e),
    }
}

/// Running live-telemetry session. Dropping it releases both streams.
pub struct Monitor {
    state: Arc<MonitorState>,
    location: Option<Subscription>,
    compass: Option<Subscription>,
}

impl Monitor {
    pub fn start(
        store: Arc<dyn RemoteStore>,
        location: Option<LocationStream>,
        compass: Option<CompassStream>,
        options: MonitorOptions,
    ) -> Result<Self> {
        let state = Arc::new(MonitorState::default());

        let location = match location {
            Some(source) => {
                let state = state.clone();
                let store = store.clone();
                let mut throttle =
                    LocationThrottle::new(options.location_interval, options.location_distance_m);

                Some(Subscription::spawn(source, options.poll_interval, move |fix| {
                    let counters = &state.location_stats;
                    counters.received.fetch_add(1, Ordering::Relaxed);
                    if !throttle.admit(&fix) {
                        counters.throttled.fetch_add(1, Ordering::Relaxed);
                        return;
                    }
                    *state.location.lock().unwrap_or_else(|e| e.into_inner()) = Some(fix);
                    write(
                        store.as_ref(),
                        StoreKey::RealtimeLocation,
                        &location_payload(&fix),
                        counters,
                    );
                })?)
            }
            None => None,
        };

        let compass = match compass {
            Some(source) => {
                let state = state.clone();
                let interval = options.compass_interval.max(options.poll_interval);

                Some(Subscription::spawn(source, interval, move |reading| {
                    let counters = &state.compass_stats;
                    counters.received.fetch_add(1, Ordering::Relaxed);
                    *state.compass.lock().unwrap_or_else(|e| e.into_inner()) = Some(reading);
                    write(
                        store.as_ref(),
                        StoreKey::RealtimeCompass,
                        &compass_payload(&reading),
                        counters,
                    );
                })?)
            }
            None => None,
        };

        tracing::info!(
            location = location.is_some(),
            compass = compass.is_some(),
            "monitor started"
        );

        Ok(Self {
            state,
            location,
            compass,
        })
    }

    /// True once every stream has ended
    pub fn is_finished(&self) -> bool {
        self.location.as_ref().is_none_or(Subscription::is_finished)
            && self.compass.as_ref().is_none_or(Subscription::is_finished)
    }

    pub fn latest_location(&self) -> Option<LocationFix> {
        *self.state.location.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn latest_compass(&self) -> Option<CompassReading> {
        *self.state.compass.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn location_stats(&self) -> StreamStats {
        self.state.location_stats.snapshot()
    }

    pub fn compass_stats(&self) -> StreamStats {
        self.state.compass_stats.snapshot()
    }

    /// Block until every stream's source is exhausted
    pub fn wait(&mut self) {
        if let Some(sub) = self.location.take() {
            sub.wait();
        }
        if let Some(sub) = self.compass.take() {
            sub.wait();
        }
    }

    /// Release both streams now
    pub fn stop(&mut self) {
        if let Some(sub) = self.location.take() {
            sub.cancel();
        }
        if let Some(sub) = self.compass.take() {
            sub.cancel();
        }
        tracing::info!("monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MemoryStore;
    use crate::sensors::IterSource;
    use chrono::{TimeZone, Utc};

    fn fix(secs: i64, lat: f64) -> LocationFix {
        LocationFix {
            latitude: lat,
            longitude: 106.0,
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
                + chrono::Duration::seconds(secs),
        }
    }

    fn quick_options() -> MonitorOptions {
        MonitorOptions {
            compass_interval: Duration::ZERO,
            ..Default::default()
        }
    }

    #[test]
    fn test_streams_write_latest_values() {
        let store = Arc::new(MemoryStore::new());
        let location: LocationStream = Box::new(IterSource::new(
            "location",
            vec![fix(0, 10.0), fix(10, 10.001), fix(20, 10.002)],
        ));
        let compass: CompassStream = Box::new(IterSource::new(
            "compass",
            vec![CompassReading::new(1.0, 2.0, 3.0), CompassReading::new(4.0, 5.0, 6.0)],
        ));

        let mut monitor =
            Monitor::start(store.clone(), Some(location), Some(compass), quick_options()).unwrap();
        monitor.wait();

        assert_eq!(monitor.location_stats().written, 3);
        assert_eq!(monitor.compass_stats().written, 2);
        assert_eq!(monitor.latest_location().unwrap().latitude, 10.002);
        assert_eq!(monitor.latest_compass().unwrap().x, 4.0);

        let stored = store.get(StoreKey::RealtimeLocation).unwrap();
        assert_eq!(stored["latitude"], 10.002);
        let stored = store.get(StoreKey::RealtimeCompass).unwrap();
        assert_eq!(stored["z"], 6.0);
    }

    #[test]
    fn test_location_throttle_applied() {
        let store = Arc::new(MemoryStore::new());
        let location: LocationStream = Box::new(IterSource::new(
            "location",
            vec![fix(0, 10.0), fix(1, 10.001), fix(2, 10.0), fix(30, 10.0000001)],
        ));

        let mut monitor =
            Monitor::start(store.clone(), Some(location), None, quick_options()).unwrap();
        monitor.wait();

        let stats = monitor.location_stats();
        assert_eq!(stats.received, 4);
        assert_eq!(stats.throttled, 3);
        assert_eq!(stats.written, 1);
    }

    #[test]
    fn test_failed_writes_are_dropped() {
        let store = Arc::new(MemoryStore::new());
        store.set_failing(true);
        let compass: CompassStream = Box::new(IterSource::new(
            "compass",
            vec![CompassReading::new(1.0, 0.0, 0.0); 3],
        ));

        let mut monitor =
            Monitor::start(store.clone(), None, Some(compass), quick_options()).unwrap();
        monitor.wait();

        let stats = monitor.compass_stats();
        assert_eq!(stats.received, 3);
        assert_eq!(stats.failed, 3);
        assert_eq!(stats.written, 0);
        // Local state still follows the stream
        assert!(monitor.latest_compass().is_some());
        assert_eq!(store.writes(), 0);
    }

    #[test]
    fn test_permission_denied_disables_stream() {
        let denied: Result<LocationStream> =
            Err(SurveyError::PermissionDenied { sensor: "location" });
        assert!(permit(denied).unwrap().is_none());

        let other: Result<LocationStream> = Err(SurveyError::Config("bad".to_string()));
        assert!(permit(other).is_err());
    }

    #[test]
    fn test_idle_monitor() {
        let store = Arc::new(MemoryStore::new());
        let mut monitor = Monitor::start(store, None, None, MonitorOptions::default()).unwrap();
        assert!(monitor.is_finished());
        monitor.stop();
    }

    #[test]
    fn test_stop_releases_endless_streams() {
        let store = Arc::new(MemoryStore::new());
        let compass: CompassStream = Box::new(IterSource::new(
            "compass",
            std::iter::repeat(CompassReading::new(0.0, 1.0, 0.0)),
        ));
        let options = MonitorOptions {
            compass_interval: Duration::from_secs(60),
            ..Default::default()
        };

        let mut monitor = Monitor::start(store, None, Some(compass), options).unwrap();
        assert!(!monitor.is_finished());
        monitor.stop();
        assert!(monitor.is_finished());
    }
}
