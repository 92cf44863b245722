//! Weather-specific error types.
//!
//! The resolver and fetcher surface raw errors; `WeatherService` is the one
//! place they are translated into [`SearchError`], the taxonomy the renderer
//! sees. Raw network errors never reach the UI.

use thiserror::Error;

/// Errors from the geocoding resolver.
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("No results for query: {0}")]
    NotFound(String),

    #[error("Geocoding request timed out")]
    Timeout,

    #[error("Geocoding service returned status {status}")]
    Service { status: u16 },

    #[error("Malformed geocoding response: {0}")]
    Malformed(String),

    #[error("Network error: {0}")]
    Network(reqwest::Error),
}

impl GeocodeError {
    /// Classify a transport error, separating timeouts from the rest.
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err)
        }
    }
}

/// Errors from the weather fetcher.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Coordinates out of range: {latitude}, {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("Weather request timed out")]
    Timeout,

    #[error("Weather service returned status {status}")]
    Service { status: u16 },

    #[error("Malformed weather response: {0}")]
    Malformed(String),

    #[error("Network error: {0}")]
    Network(reqwest::Error),
}

impl FetchError {
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Network(err)
        }
    }
}

/// Errors from the device geolocation collaborator.
#[derive(Debug, Error)]
pub enum GeolocationError {
    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Device position unavailable")]
    PositionUnavailable,
}

/// Terminal error taxonomy for a search request.
///
/// Every variant maps to exactly one user-facing message.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("Empty city name")]
    EmptyInput,

    #[error("City not found: {0}")]
    CityNotFound(String),

    #[error("Coordinates out of range: {latitude}, {longitude}")]
    InvalidCoordinates { latitude: f64, longitude: f64 },

    #[error("Request timed out")]
    Timeout,

    #[error("Weather service error: {0}")]
    Service(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Location permission denied")]
    PermissionDenied,

    #[error("Device position unavailable")]
    PositionUnavailable,

    #[error("Storage error: {0}")]
    Storage(String),
}

impl SearchError {
    /// User-friendly message for UI display.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::EmptyInput => "Enter a city name.",
            Self::CityNotFound(_) => "City not found. Please try again.",
            Self::InvalidCoordinates { .. } => "That location has invalid coordinates.",
            Self::Timeout => "The request took too long. Please try again.",
            Self::Service(_) => "Weather service unavailable. Please try again later.",
            Self::MalformedResponse(_) => "Received an unexpected response. Please try again.",
            Self::PermissionDenied => "Location permission was denied.",
            Self::PositionUnavailable => "Could not determine your location.",
            Self::Storage(_) => "Local data error. Try clearing saved data.",
        }
    }

    pub(crate) fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }
}

impl From<GeocodeError> for SearchError {
    fn from(err: GeocodeError) -> Self {
        match err {
            GeocodeError::NotFound(query) => Self::CityNotFound(query),
            GeocodeError::Timeout => Self::Timeout,
            GeocodeError::Service { status } => {
                Self::Service(format!("geocoding status {}", status))
            }
            GeocodeError::Malformed(detail) => Self::MalformedResponse(detail),
            GeocodeError::Network(e) if e.is_timeout() => Self::Timeout,
            GeocodeError::Network(e) => Self::Service(e.to_string()),
        }
    }
}

impl From<FetchError> for SearchError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::InvalidCoordinates {
                latitude,
                longitude,
            } => Self::InvalidCoordinates {
                latitude,
                longitude,
            },
            FetchError::Timeout => Self::Timeout,
            FetchError::Service { status } => Self::Service(format!("weather status {}", status)),
            FetchError::Malformed(detail) => Self::MalformedResponse(detail),
            FetchError::Network(e) if e.is_timeout() => Self::Timeout,
            FetchError::Network(e) => Self::Service(e.to_string()),
        }
    }
}

impl From<GeolocationError> for SearchError {
    fn from(err: GeolocationError) -> Self {
        match err {
            GeolocationError::PermissionDenied => Self::PermissionDenied,
            GeolocationError::PositionUnavailable => Self::PositionUnavailable,
        }
    }
}
