use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A resolved place: canonical name plus coordinates.
///
/// Immutable once produced by the geocoding resolver; consumed by the
/// weather fetcher and used to build cache keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub name: String,
    pub country: String,
    pub admin_region: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
}

impl Location {
    /// Display form: "Name, Region, Country" (region omitted when absent).
    pub fn display_name(&self) -> String {
        let mut parts = vec![self.name.as_str()];
        if let Some(region) = self.admin_region.as_deref() {
            parts.push(region);
        }
        if !self.country.is_empty() {
            parts.push(self.country.as_str());
        }
        parts.join(", ")
    }
}

/// Raw device coordinates from the geolocation collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Current conditions at a location. Raw floats are retained; rounding to
/// whole-degree display values happens at presentation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub temperature_c: f64,
    pub apparent_temperature_c: f64,
    pub humidity_pct: u8,
    pub wind_speed_kmh: f64,
    pub wind_direction_deg: u16,
    pub pressure_hpa: f64,
    pub cloud_cover_pct: u8,
    pub precipitation_mm: f64,
    pub weather_code: i32,
}

impl CurrentConditions {
    /// 16-point compass direction the wind is blowing from.
    pub fn wind_compass(&self) -> CompassPoint {
        CompassPoint::from_degrees(f64::from(self.wind_direction_deg))
    }
}

/// One day of forecast. Probability and precipitation sum are not always
/// reported by the upstream service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastDay {
    pub date: NaiveDate,
    pub temp_max_c: f64,
    pub temp_min_c: f64,
    pub weather_code: i32,
    pub precipitation_probability_pct: Option<u8>,
    pub precipitation_sum_mm: Option<f64>,
}

/// The unit of caching and display: a resolved location, its current
/// conditions, and a chronological daily forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherRecord {
    pub location: Location,
    pub current: CurrentConditions,
    pub forecast: Vec<ForecastDay>,
    pub timezone: Option<String>,
    pub fetched_at_ms: i64,
    /// Set only when this record was served from an expired cache entry
    /// because the network was unreachable.
    #[serde(default)]
    pub stale: bool,
}

impl WeatherRecord {
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.fetched_at_ms)
    }
}

/// A city kept in the recent-searches list or the favorites set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedCity {
    pub name: String,
    pub country: String,
    pub admin_region: Option<String>,
    pub saved_at_ms: i64,
}

impl SavedCity {
    pub fn from_location(location: &Location, saved_at_ms: i64) -> Self {
        Self {
            name: location.name.clone(),
            country: location.country.clone(),
            admin_region: location.admin_region.clone(),
            saved_at_ms,
        }
    }

    /// Identity for dedup purposes: case-insensitive (name, country).
    pub fn same_city(&self, other: &SavedCity) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
            && self.country.eq_ignore_ascii_case(&other.country)
    }
}

/// The most recent successful search, restored on start-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastSearch {
    pub city_name: String,
    pub saved_at_ms: i64,
}

/// Persisted theme preference. Applying it is the renderer's problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// 16-point compass rose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompassPoint {
    N,
    NNE,
    NE,
    ENE,
    E,
    ESE,
    SE,
    SSE,
    S,
    SSW,
    SW,
    WSW,
    W,
    WNW,
    NW,
    NNW,
}

impl CompassPoint {
    const POINTS: [CompassPoint; 16] = [
        Self::N,
        Self::NNE,
        Self::NE,
        Self::ENE,
        Self::E,
        Self::ESE,
        Self::SE,
        Self::SSE,
        Self::S,
        Self::SSW,
        Self::SW,
        Self::WSW,
        Self::W,
        Self::WNW,
        Self::NW,
        Self::NNW,
    ];

    /// Map degrees (0-360, wrapping) onto the nearest of 16 points.
    pub fn from_degrees(degrees: f64) -> Self {
        let normalized = degrees.rem_euclid(360.0);
        let index = (normalized / 22.5).round() as usize % 16;
        Self::POINTS[index]
    }

    pub fn abbreviation(&self) -> &'static str {
        match self {
            Self::N => "N",
            Self::NNE => "NNE",
            Self::NE => "NE",
            Self::ENE => "ENE",
            Self::E => "E",
            Self::ESE => "ESE",
            Self::SE => "SE",
            Self::SSE => "SSE",
            Self::S => "S",
            Self::SSW => "SSW",
            Self::SW => "SW",
            Self::WSW => "WSW",
            Self::W => "W",
            Self::WNW => "WNW",
            Self::NW => "NW",
            Self::NNW => "NNW",
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;

    #[test]
    fn test_compass_cardinal_points() {
        assert_eq!(CompassPoint::from_degrees(0.0), CompassPoint::N);
        assert_eq!(CompassPoint::from_degrees(90.0), CompassPoint::E);
        assert_eq!(CompassPoint::from_degrees(180.0), CompassPoint::S);
        assert_eq!(CompassPoint::from_degrees(270.0), CompassPoint::W);
    }

    #[test]
    fn test_compass_intercardinal_points() {
        assert_eq!(CompassPoint::from_degrees(45.0), CompassPoint::NE);
        assert_eq!(CompassPoint::from_degrees(135.0), CompassPoint::SE);
        assert_eq!(CompassPoint::from_degrees(225.0), CompassPoint::SW);
        assert_eq!(CompassPoint::from_degrees(315.0), CompassPoint::NW);
    }

    #[test]
    fn test_compass_wraparound() {
        assert_eq!(CompassPoint::from_degrees(360.0), CompassPoint::N);
        assert_eq!(CompassPoint::from_degrees(359.0), CompassPoint::N);
        assert_eq!(CompassPoint::from_degrees(-22.5), CompassPoint::NNW);
    }

    #[test]
    fn test_compass_boundary_rounds_to_nearest() {
        // 11.24 rounds down to N, 11.25 rounds up to NNE
        assert_eq!(CompassPoint::from_degrees(11.2), CompassPoint::N);
        assert_eq!(CompassPoint::from_degrees(11.3), CompassPoint::NNE);
    }

    #[test]
    fn test_location_display_name() {
        let loc = Location {
            name: "Aracaju".to_string(),
            country: "Brasil".to_string(),
            admin_region: Some("Sergipe".to_string()),
            latitude: -10.91,
            longitude: -37.07,
        };
        assert_eq!(loc.display_name(), "Aracaju, Sergipe, Brasil");
    }

    #[test]
    fn test_location_display_name_without_region() {
        let loc = Location {
            name: "Current Location".to_string(),
            country: String::new(),
            admin_region: None,
            latitude: 0.0,
            longitude: 0.0,
        };
        assert_eq!(loc.display_name(), "Current Location");
    }

    #[test]
    fn test_saved_city_identity_is_case_insensitive() {
        let a = SavedCity {
            name: "Rio".to_string(),
            country: "Brasil".to_string(),
            admin_region: None,
            saved_at_ms: 1,
        };
        let b = SavedCity {
            name: "RIO".to_string(),
            country: "brasil".to_string(),
            admin_region: Some("RJ".to_string()),
            saved_at_ms: 2,
        };
        assert!(a.same_city(&b));
    }

    #[test]
    fn test_wind_compass_from_conditions() {
        let current = CurrentConditions {
            temperature_c: 25.0,
            apparent_temperature_c: 26.0,
            humidity_pct: 60,
            wind_speed_kmh: 12.0,
            wind_direction_deg: 45,
            pressure_hpa: 1013.0,
            cloud_cover_pct: 20,
            precipitation_mm: 0.0,
            weather_code: 0,
        };
        assert_eq!(current.wind_compass(), CompassPoint::NE);
    }
}
