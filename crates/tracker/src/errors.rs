use serde::Serialize;
use thiserror::Error;

/// Failure reported by the upstream position source.
///
/// Any of these terminates the active session; none is retried automatically.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AcquisitionError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Position request timed out")]
    Timeout,

    #[error("Position unavailable")]
    PositionUnavailable,

    #[error("Geolocation is not supported by this source")]
    Unsupported,

    #[error("Position subscription closed")]
    Closed,
}

impl AcquisitionError {
    /// Maps the numeric codes used by platform geolocation services
    /// (1 = permission denied, 2 = unavailable, 3 = timeout).
    pub fn from_code(code: u16) -> Self {
        match code {
            1 => AcquisitionError::PermissionDenied,
            2 => AcquisitionError::PositionUnavailable,
            3 => AcquisitionError::Timeout,
            _ => AcquisitionError::Unsupported,
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Error type for fix log parsing failures
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to parse GPX file: {0}")]
    Gpx(String),

    #[error("Failed to parse fix on line {line}: {source}")]
    Json {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("Fix log is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("No timestamped fixes found")]
    Empty,
}

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Acquisition error: {0}")]
    Acquisition(#[from] AcquisitionError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("A session is already active")]
    SessionActive,

    #[error("No session is active")]
    SessionInactive,
}
