//! Overwrite-only remote key-value store
//!
//! Each write replaces whatever was stored under the key. Nothing is appended
//! and no history is kept.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::USER_AGENT;
use crate::config::StoreConfig;
use crate::domain::{CompassReading, Coordinate, LocationFix};
use crate::error::{Result, SurveyError};

const SERVICE: &str = "store";

/// Top-level keys written by the survey tool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Markers,
    RealtimeLocation,
    RealtimeCompass,
}

impl StoreKey {
    pub fn path(&self) -> &'static str {
        match self {
            StoreKey::Markers => "markers",
            StoreKey::RealtimeLocation => "realtimeLocation",
            StoreKey::RealtimeCompass => "realtimeCompass",
        }
    }
}

impl std::fmt::Display for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

pub trait RemoteStore: Send + Sync {
    /// Replace the value stored under `key`
    fn put(&self, key: StoreKey, value: &Value) -> Result<()>;
}

/// ISO-8601 UTC with millisecond precision, e.g. `2024-05-01T03:00:00.000Z`
pub fn iso_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub fn markers_payload(markers: &[Coordinate], time: &DateTime<Utc>) -> Value {
    json!({
        "markers": markers,
        "timestamp": iso_timestamp(time),
    })
}

pub fn location_payload(fix: &LocationFix) -> Value {
    json!({
        "latitude": fix.latitude,
        "longitude": fix.longitude,
        "timestamp": iso_timestamp(&fix.timestamp),
    })
}

pub fn compass_payload(reading: &CompassReading) -> Value {
    json!({
        "x": reading.x,
        "y": reading.y,
        "z": reading.z,
        "timestamp": iso_timestamp(&reading.timestamp),
    })
}

/// Upload the boundary markers, stamped with the current time
pub fn upload_markers(store: &dyn RemoteStore, markers: &[Coordinate]) -> Result<()> {
    store.put(StoreKey::Markers, &markers_payload(markers, &Utc::now()))?;
    tracing::info!(count = markers.len(), "markers uploaded");
    Ok(())
}

/// Firebase Realtime Database over its REST interface
pub struct FirebaseStore {
    client: reqwest::blocking::Client,
    database_url: String,
    auth: Option<String>,
}

impl FirebaseStore {
    pub fn new(config: &StoreConfig) -> Result<Self> {
        let database_url = config
            .database_url
            .as_deref()
            .map(|u| u.trim_end_matches('/').to_string())
            .filter(|u| !u.is_empty())
            .ok_or_else(|| SurveyError::Config("no [store].database_url configured".to_string()))?;

        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|source| SurveyError::Network {
                service: SERVICE,
                source,
            })?;

        Ok(Self {
            client,
            database_url,
            auth: config.auth.clone(),
        })
    }

    fn url(&self, key: StoreKey) -> String {
        format!("{}/{}.json", self.database_url, key.path())
    }
}

impl RemoteStore for FirebaseStore {
    fn put(&self, key: StoreKey, value: &Value) -> Result<()> {
        let mut request = self.client.put(self.url(key)).json(value);
        if let Some(auth) = &self.auth {
            request = request.query(&[("auth", auth)]);
        }

        let response = request.send().map_err(|source| SurveyError::Network {
            service: SERVICE,
            source,
        })?;

        if !response.status().is_success() {
            return Err(SurveyError::HttpStatus {
                service: SERVICE,
                status: response.status(),
            });
        }

        tracing::debug!(%key, "store write ok");
        Ok(())
    }
}

/// In-process store, for dry runs and tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<StoreKey, Value>>,
    writes: AtomicUsize,
    failing: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail, as an unreachable store would
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn get(&self, key: StoreKey) -> Option<Value> {
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .cloned()
    }

    /// Successful writes so far
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl RemoteStore for MemoryStore {
    fn put(&self, key: StoreKey, value: &Value) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SurveyError::Io(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "memory store is offline",
            )));
        }
        self.values
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, value.clone());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::test_server::{refused_url, serve_once};
    use chrono::TimeZone;

    fn firebase_at(database_url: String, auth: Option<&str>) -> FirebaseStore {
        FirebaseStore::new(&StoreConfig {
            database_url: Some(database_url),
            auth: auth.map(str::to_string),
            timeout_secs: 5,
        })
        .unwrap()
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 3, 0, 0).unwrap()
    }

    #[test]
    fn test_key_paths() {
        assert_eq!(StoreKey::Markers.path(), "markers");
        assert_eq!(StoreKey::RealtimeLocation.path(), "realtimeLocation");
        assert_eq!(StoreKey::RealtimeCompass.path(), "realtimeCompass");
    }

    #[test]
    fn test_iso_timestamp() {
        assert_eq!(iso_timestamp(&fixed_time()), "2024-05-01T03:00:00.000Z");
    }

    #[test]
    fn test_markers_payload_shape() {
        let markers = [
            Coordinate {
                latitude: 10.0,
                longitude: 106.0,
            },
            Coordinate {
                latitude: 10.1,
                longitude: 106.1,
            },
        ];
        let payload = markers_payload(&markers, &fixed_time());
        assert_eq!(payload["markers"][1]["latitude"], 10.1);
        assert_eq!(payload["markers"].as_array().unwrap().len(), 2);
        assert_eq!(payload["timestamp"], "2024-05-01T03:00:00.000Z");
    }

    #[test]
    fn test_sensor_payload_shapes() {
        let fix = LocationFix {
            latitude: 1.0,
            longitude: 2.0,
            timestamp: fixed_time(),
        };
        let payload = location_payload(&fix);
        assert_eq!(payload["latitude"], 1.0);
        assert_eq!(payload["longitude"], 2.0);

        let reading = CompassReading {
            x: 3.0,
            y: 4.0,
            z: 5.0,
            timestamp: fixed_time(),
        };
        let payload = compass_payload(&reading);
        assert_eq!(payload["z"], 5.0);
        assert_eq!(payload["timestamp"], "2024-05-01T03:00:00.000Z");
    }

    #[test]
    fn test_memory_store_overwrites() {
        let store = MemoryStore::new();
        store.put(StoreKey::Markers, &json!({"n": 1})).unwrap();
        store.put(StoreKey::Markers, &json!({"n": 2})).unwrap();

        assert_eq!(store.get(StoreKey::Markers), Some(json!({"n": 2})));
        assert_eq!(store.get(StoreKey::RealtimeCompass), None);
        assert_eq!(store.writes(), 2);
    }

    #[test]
    fn test_memory_store_failing() {
        let store = MemoryStore::new();
        store.set_failing(true);
        assert!(upload_markers(&store, &[]).is_err());
        assert_eq!(store.writes(), 0);

        store.set_failing(false);
        upload_markers(&store, &[]).unwrap();
        assert_eq!(store.get(StoreKey::Markers).unwrap()["markers"], json!([]));
    }

    #[test]
    fn test_firebase_store_needs_url() {
        let config = StoreConfig::default();
        assert!(matches!(
            FirebaseStore::new(&config),
            Err(SurveyError::Config(_))
        ));

        let config = StoreConfig {
            database_url: Some("https://survey-rtdb.example.app/".to_string()),
            ..Default::default()
        };
        let store = FirebaseStore::new(&config).unwrap();
        assert_eq!(
            store.url(StoreKey::RealtimeLocation),
            "https://survey-rtdb.example.app/realtimeLocation.json"
        );
    }

    #[test]
    fn test_firebase_put_replaces_key() {
        let (url, server) = serve_once("200 OK", r#"{"x": 1.0}"#);

        firebase_at(url, Some("tok"))
            .put(StoreKey::RealtimeCompass, &json!({"x": 1.0}))
            .unwrap();

        let request = server.join().unwrap();
        assert!(request.starts_with("PUT /realtimeCompass.json?auth=tok "));
        assert!(request.ends_with(r#"{"x":1.0}"#));
    }

    #[test]
    fn test_firebase_put_error_status() {
        let (url, server) = serve_once("401 Unauthorized", r#"{"error": "Permission denied"}"#);

        let err = firebase_at(url, None)
            .put(StoreKey::Markers, &json!({"markers": []}))
            .unwrap_err();
        server.join().unwrap();
        match err {
            SurveyError::HttpStatus { status, .. } => {
                assert_eq!(status, reqwest::StatusCode::UNAUTHORIZED)
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_firebase_put_unreachable_is_network_error() {
        let err = firebase_at(refused_url(), None)
            .put(StoreKey::RealtimeLocation, &json!({}))
            .unwrap_err();
        assert!(matches!(err, SurveyError::Network { .. }));
    }
}
