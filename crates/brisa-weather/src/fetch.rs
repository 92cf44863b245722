//! Current conditions and daily forecast retrieval.
//!
//! Unit normalization happens here: wind speed lands in km/h (converted from
//! m/s when the upstream units block says so) and percentages are clamped
//! into their integer ranges. Display rounding is the presentation layer's.

use chrono::NaiveDate;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::instrument;

use brisa_core::config::ApiConfig;

use crate::cache::{coord_key, CacheStore};
use crate::error::FetchError;
use crate::types::{CurrentConditions, ForecastDay, Location};

const CURRENT_FIELDS: &str = "temperature_2m,relative_humidity_2m,apparent_temperature,precipitation,weather_code,cloud_cover,pressure_msl,wind_speed_10m,wind_direction_10m";
const DAILY_FIELDS: &str = "temperature_2m_max,temperature_2m_min,weather_code,precipitation_sum,precipitation_probability_max";

pub const DEFAULT_FORECAST_DAYS: u8 = 7;
const MAX_FORECAST_DAYS: u8 = 16;

/// Convert meters-per-second to kilometers-per-hour.
pub fn kmh_from_ms(ms: f64) -> f64 {
    ms * 3.6
}

/// One combined fetch: current conditions plus the daily forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchedWeather {
    pub current: CurrentConditions,
    pub forecast: Vec<ForecastDay>,
    pub timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ForecastResponse {
    current: Option<CurrentBlock>,
    current_units: Option<CurrentUnits>,
    daily: Option<DailyBlock>,
    timezone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CurrentBlock {
    temperature_2m: Option<f64>,
    relative_humidity_2m: Option<f64>,
    apparent_temperature: Option<f64>,
    precipitation: Option<f64>,
    weather_code: Option<i32>,
    cloud_cover: Option<f64>,
    pressure_msl: Option<f64>,
    wind_speed_10m: Option<f64>,
    wind_direction_10m: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct CurrentUnits {
    wind_speed_10m: Option<String>,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    time: Vec<NaiveDate>,
    temperature_2m_max: Vec<f64>,
    temperature_2m_min: Vec<f64>,
    weather_code: Vec<i32>,
    precipitation_sum: Option<Vec<Option<f64>>>,
    precipitation_probability_max: Option<Vec<Option<f64>>>,
}

fn require<T>(field: Option<T>, name: &str) -> Result<T, FetchError> {
    field.ok_or_else(|| FetchError::Malformed(format!("missing field: {}", name)))
}

fn pct_u8(value: f64) -> u8 {
    value.round().clamp(0.0, 100.0) as u8
}

pub struct WeatherFetcher {
    client: Client,
    base_url: String,
    cache: CacheStore,
    cache_ttl: Duration,
}

impl WeatherFetcher {
    pub fn new(cache: CacheStore, api: &ApiConfig, cache_ttl: Duration) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(api.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: api.forecast_url.clone(),
            cache,
            cache_ttl,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    /// Current conditions only.
    #[instrument(skip(self, location), fields(city = %location.name), level = "info")]
    pub async fn fetch_current(&self, location: &Location) -> Result<CurrentConditions, FetchError> {
        validate_coordinates(location.latitude, location.longitude)?;

        let key = coord_key("wx-cur", location.latitude, location.longitude);
        if let Some(cached) = self.cache_get::<CurrentConditions>(&key) {
            return Ok(cached);
        }

        let body = self.request(location, true, None).await?;
        let current = convert_current(
            require(body.current, "current")?,
            body.current_units.as_ref(),
        )?;
        self.cache_put(&key, &current);
        Ok(current)
    }

    /// Daily forecast only. `days` is clamped to the service's 1-16 range.
    #[instrument(skip(self, location), fields(city = %location.name), level = "info")]
    pub async fn fetch_forecast(
        &self,
        location: &Location,
        days: u8,
    ) -> Result<Vec<ForecastDay>, FetchError> {
        validate_coordinates(location.latitude, location.longitude)?;
        let days = days.clamp(1, MAX_FORECAST_DAYS);

        let key = format!(
            "{}:{}d",
            coord_key("wx-daily", location.latitude, location.longitude),
            days
        );
        if let Some(cached) = self.cache_get::<Vec<ForecastDay>>(&key) {
            return Ok(cached);
        }

        let body = self.request(location, false, Some(days)).await?;
        let forecast = convert_daily(require(body.daily, "daily")?)?;
        self.cache_put(&key, &forecast);
        Ok(forecast)
    }

    /// Combined request for current conditions and forecast - one round trip
    /// instead of two. Preferred by the orchestrator.
    #[instrument(skip(self, location), fields(city = %location.name), level = "info")]
    pub async fn fetch_both(
        &self,
        location: &Location,
        days: u8,
    ) -> Result<FetchedWeather, FetchError> {
        validate_coordinates(location.latitude, location.longitude)?;
        let days = days.clamp(1, MAX_FORECAST_DAYS);

        let key = format!(
            "{}:{}d",
            coord_key("wx", location.latitude, location.longitude),
            days
        );
        if let Some(cached) = self.cache_get::<FetchedWeather>(&key) {
            tracing::debug!(%key, "weather cache hit");
            return Ok(cached);
        }

        let body = self.request(location, true, Some(days)).await?;
        let fetched = FetchedWeather {
            current: convert_current(
                require(body.current, "current")?,
                body.current_units.as_ref(),
            )?,
            forecast: convert_daily(require(body.daily, "daily")?)?,
            timezone: body.timezone,
        };
        self.cache_put(&key, &fetched);
        Ok(fetched)
    }

    async fn request(
        &self,
        location: &Location,
        with_current: bool,
        daily_days: Option<u8>,
    ) -> Result<ForecastResponse, FetchError> {
        let mut params: Vec<(&str, String)> = vec![
            ("latitude", location.latitude.to_string()),
            ("longitude", location.longitude.to_string()),
            ("timezone", "auto".to_string()),
            ("wind_speed_unit", "kmh".to_string()),
        ];
        if with_current {
            params.push(("current", CURRENT_FIELDS.to_string()));
        }
        if let Some(days) = daily_days {
            params.push(("daily", DAILY_FIELDS.to_string()));
            params.push(("forecast_days", days.to_string()));
        }

        let response = self
            .client
            .get(&self.base_url)
            .query(&params)
            .send()
            .await
            .map_err(FetchError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Service {
                status: status.as_u16(),
            });
        }

        response.json().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout
            } else {
                FetchError::Malformed(e.to_string())
            }
        })
    }

    fn cache_get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key, self.cache_ttl) {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(key, error = %e, "weather cache read failed");
                None
            }
        }
    }

    fn cache_put<T: serde::Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = self.cache.put(key, value) {
            tracing::warn!(key, error = %e, "weather cache write failed");
        }
    }
}

/// Range-check coordinates before any network call.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), FetchError> {
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(FetchError::InvalidCoordinates {
            latitude,
            longitude,
        });
    }
    Ok(())
}

fn convert_current(
    block: CurrentBlock,
    units: Option<&CurrentUnits>,
) -> Result<CurrentConditions, FetchError> {
    let mut wind_speed = require(block.wind_speed_10m, "current.wind_speed_10m")?;
    let wind_unit = units.and_then(|u| u.wind_speed_10m.as_deref());
    if matches!(wind_unit, Some("m/s" | "ms")) {
        wind_speed = kmh_from_ms(wind_speed);
    }

    let direction = require(block.wind_direction_10m, "current.wind_direction_10m")?;

    Ok(CurrentConditions {
        temperature_c: require(block.temperature_2m, "current.temperature_2m")?,
        apparent_temperature_c: require(block.apparent_temperature, "current.apparent_temperature")?,
        humidity_pct: pct_u8(require(
            block.relative_humidity_2m,
            "current.relative_humidity_2m",
        )?),
        wind_speed_kmh: wind_speed,
        wind_direction_deg: direction.rem_euclid(360.0).round() as u16 % 360,
        pressure_hpa: require(block.pressure_msl, "current.pressure_msl")?,
        cloud_cover_pct: pct_u8(require(block.cloud_cover, "current.cloud_cover")?),
        precipitation_mm: require(block.precipitation, "current.precipitation")?,
        weather_code: require(block.weather_code, "current.weather_code")?,
    })
}

fn convert_daily(block: DailyBlock) -> Result<Vec<ForecastDay>, FetchError> {
    let len = block.time.len();
    if len == 0 {
        return Err(FetchError::Malformed("daily.time is empty".to_string()));
    }

    let check_len = |name: &str, actual: usize| -> Result<(), FetchError> {
        if actual != len {
            return Err(FetchError::Malformed(format!(
                "daily.{} has length {}, expected {}",
                name, actual, len
            )));
        }
        Ok(())
    };
    check_len("temperature_2m_max", block.temperature_2m_max.len())?;
    check_len("temperature_2m_min", block.temperature_2m_min.len())?;
    check_len("weather_code", block.weather_code.len())?;
    if let Some(sums) = &block.precipitation_sum {
        check_len("precipitation_sum", sums.len())?;
    }
    if let Some(probs) = &block.precipitation_probability_max {
        check_len("precipitation_probability_max", probs.len())?;
    }

    if block.time.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(FetchError::Malformed(
            "daily.time is not chronological".to_string(),
        ));
    }

    let days = block
        .time
        .iter()
        .enumerate()
        .map(|(i, date)| ForecastDay {
            date: *date,
            temp_max_c: block.temperature_2m_max[i],
            temp_min_c: block.temperature_2m_min[i],
            weather_code: block.weather_code[i],
            precipitation_probability_pct: block
                .precipitation_probability_max
                .as_ref()
                .and_then(|probs| probs[i])
                .map(pct_u8),
            precipitation_sum_mm: block.precipitation_sum.as_ref().and_then(|sums| sums[i]),
        })
        .collect();

    Ok(days)
}
