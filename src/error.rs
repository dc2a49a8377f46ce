use thiserror::Error;

/// Failure kinds surfaced by the survey library.
///
/// A boundary with too few points is not an error; grid generation simply
/// yields nothing.
#[derive(Debug, Error)]
pub enum SurveyError {
    /// A sensor source could not be opened because access was refused.
    #[error("permission denied for {sensor} source")]
    PermissionDenied { sensor: &'static str },

    /// The request never produced an HTTP response.
    #[error("{service} request failed: {source}")]
    Network {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    /// The service answered with a non-success status.
    #[error("{service} returned error status: {status}")]
    HttpStatus {
        service: &'static str,
        status: reqwest::StatusCode,
    },

    /// The service answered 200 but the body was not what we expected.
    #[error("malformed {service} response: {reason}")]
    MalformedResponse {
        service: &'static str,
        reason: String,
    },

    #[error("grid spacing must be a positive number of degrees, got {0}")]
    InvalidSpacing(f64),

    #[error("lattice of {rows} x {cols} exceeds the limit of {limit} elements")]
    LatticeTooLarge { rows: u64, cols: u64, limit: u64 },

    #[error("invalid boundary input: {0}")]
    InvalidBoundary(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = SurveyError> = std::result::Result<T, E>;
