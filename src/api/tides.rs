use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::USER_AGENT;
use crate::config::TideConfig;
use crate::domain::{TideExtreme, TideReport};
use crate::error::{Result, SurveyError};

const SERVICE: &str = "tide";
const TIDES_PATH: &str = "/v2/tides";
const TOKEN_HEADER: &str = "x-marea-api-token";

/// Subset of the tide provider response we consume
#[derive(Debug, Deserialize)]
struct TideResponse {
    #[serde(default)]
    extremes: Option<Vec<RawExtreme>>,
}

#[derive(Debug, Deserialize)]
struct RawExtreme {
    datetime: DateTime<Utc>,
    height: f64,
    state: String,
}

/// Client for the tide-extremes endpoint
pub struct TideClient {
    client: reqwest::blocking::Client,
    config: TideConfig,
    token: String,
}

impl TideClient {
    pub fn new(config: TideConfig) -> Result<Self> {
        let token = config.resolve_token()?;
        let client = reqwest::blocking::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout())
            .build()
            .map_err(|source| SurveyError::Network {
                service: SERVICE,
                source,
            })?;

        Ok(Self {
            client,
            config,
            token,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), TIDES_PATH)
    }

    /// Fetch tide extremes for the window starting now at (lat, lon).
    ///
    /// One request, no retry. A transport failure, an error status and a
    /// body without extremes are reported as distinct error kinds.
    pub fn fetch(&self, latitude: f64, longitude: f64) -> Result<TideReport> {
        tracing::info!(latitude, longitude, "fetching tide data");

        let response = self
            .client
            .get(self.endpoint())
            .header(TOKEN_HEADER, &self.token)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("duration", self.config.duration.to_string()),
                ("interval", self.config.interval.to_string()),
                ("model", self.config.model.clone()),
                ("datum", self.config.datum.clone()),
            ])
            .send()
            .map_err(|source| SurveyError::Network {
                service: SERVICE,
                source,
            })?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            return Err(SurveyError::HttpStatus {
                service: SERVICE,
                status,
            });
        }

        let body = response.text().map_err(|source| SurveyError::Network {
            service: SERVICE,
            source,
        })?;

        let report = parse_tide_response(&body)?;
        tracing::debug!(
            extremes = report.extremes.len(),
            high = report.high().len(),
            low = report.low().len(),
            "tide data received"
        );
        Ok(report)
    }
}

/// Parse a 200 response body into a report.
///
/// An empty `extremes` list is valid and yields an empty report; a missing
/// one is a malformed response.
pub fn parse_tide_response(body: &str) -> Result<TideReport> {
    let response: TideResponse =
        serde_json::from_str(body).map_err(|e| SurveyError::MalformedResponse {
            service: SERVICE,
            reason: e.to_string(),
        })?;

    let extremes = response
        .extremes
        .ok_or_else(|| SurveyError::MalformedResponse {
            service: SERVICE,
            reason: "no extremes in response".to_string(),
        })?;

    Ok(TideReport::new(
        extremes
            .into_iter()
            .map(|e| TideExtreme {
                time: e.datetime,
                height: e.height,
                state: e.state,
            })
            .collect(),
    ))
}
