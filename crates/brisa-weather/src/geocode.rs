//! City geocoding: free-text query -> coordinates, plus best-effort
//! reverse lookup for device fixes.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;

use brisa_core::config::{ApiConfig, SearchConfig};

use crate::cache::{coord_key, query_key, CacheStore};
use crate::error::GeocodeError;
use crate::types::Location;

#[derive(Debug, Deserialize)]
struct GeocodingResponse {
    results: Option<Vec<GeoResult>>,
}

#[derive(Debug, Deserialize)]
struct GeoResult {
    name: String,
    country: Option<String>,
    admin1: Option<String>,
    latitude: f64,
    longitude: f64,
    country_code: Option<String>,
}

impl GeoResult {
    fn into_location(self) -> Location {
        Location {
            name: self.name,
            country: self.country.unwrap_or_default(),
            admin_region: self.admin1,
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

pub struct GeoResolver {
    client: Client,
    base_url: String,
    cache: CacheStore,
    language: String,
    home_country: String,
    suggest_min_chars: usize,
    suggest_max_results: u8,
    cache_ttl: Duration,
}

impl GeoResolver {
    pub fn new(
        cache: CacheStore,
        api: &ApiConfig,
        search: &SearchConfig,
        cache_ttl: Duration,
    ) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(api.request_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: api.geocoding_url.clone(),
            cache,
            language: api.language.clone(),
            home_country: api.home_country.clone(),
            suggest_min_chars: search.suggest_min_chars,
            suggest_max_results: search.suggest_max_results,
            cache_ttl,
        })
    }

    #[cfg(test)]
    pub(crate) fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.to_string();
        self
    }

    /// Resolve a query to its single best match.
    #[instrument(skip(self), level = "info")]
    pub async fn resolve(&self, query: &str) -> Result<Location, GeocodeError> {
        let trimmed = query.trim();
        if trimmed.is_empty() {
            return Err(GeocodeError::NotFound(query.to_string()));
        }

        let key = query_key("geo", trimmed);
        if let Some(cached) = self.cache_get::<Location>(&key) {
            tracing::debug!(%key, "geocode cache hit");
            return Ok(cached);
        }

        let mut results = self.fetch_results(trimmed, 1).await?;
        if results.is_empty() {
            return Err(GeocodeError::NotFound(trimmed.to_string()));
        }

        let location = results.remove(0).into_location();
        self.cache_put(&key, &location);
        Ok(location)
    }

    /// Up to K matches for autocomplete. Degrades silently: short queries
    /// and upstream failures both produce an empty list.
    #[instrument(skip(self), level = "debug")]
    pub async fn suggest(&self, query: &str) -> Vec<Location> {
        let trimmed = query.trim();
        if trimmed.len() < self.suggest_min_chars {
            return Vec::new();
        }

        let key = query_key("suggest", trimmed);
        if let Some(cached) = self.cache_get::<Vec<Location>>(&key) {
            return cached;
        }

        let mut results = match self.fetch_results(trimmed, self.suggest_max_results).await {
            Ok(results) => results,
            Err(e) => {
                tracing::debug!(error = %e, "suggestion lookup failed, degrading to empty");
                return Vec::new();
            }
        };

        // Endpoint relevance order, with home-country matches floated to the
        // front. Stable: ties keep their relative order.
        let home = self.home_country.as_str();
        results.sort_by_key(|r| {
            let is_home = r
                .country_code
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(home));
            u8::from(!is_home)
        });

        let locations: Vec<Location> = results.into_iter().map(GeoResult::into_location).collect();
        self.cache_put(&key, &locations);
        locations
    }

    /// Best-effort coordinates -> place lookup. The caller falls back to a
    /// placeholder name when this returns None.
    #[instrument(skip(self), level = "debug")]
    pub async fn reverse(&self, latitude: f64, longitude: f64) -> Option<Location> {
        let key = coord_key("rev", latitude, longitude);
        if let Some(cached) = self.cache_get::<Location>(&key) {
            return Some(cached);
        }

        let response = match self
            .client
            .get(&self.base_url)
            .query(&[
                ("latitude", latitude.to_string()),
                ("longitude", longitude.to_string()),
                ("count", "1".to_string()),
                ("language", self.language.clone()),
                ("format", "json".to_string()),
            ])
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::debug!(error = %e, "reverse geocode request failed");
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!(status = %response.status(), "reverse geocode returned non-success");
            return None;
        }

        let body: GeocodingResponse = match response.json().await {
            Ok(b) => b,
            Err(e) => {
                tracing::debug!(error = %e, "reverse geocode parse error");
                return None;
            }
        };

        let location = body
            .results
            .and_then(|mut r| (!r.is_empty()).then(|| r.remove(0)))
            .map(GeoResult::into_location)?;

        self.cache_put(&key, &location);
        Some(location)
    }

    async fn fetch_results(&self, name: &str, count: u8) -> Result<Vec<GeoResult>, GeocodeError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("name", name.to_string()),
                ("count", count.to_string()),
                ("language", self.language.clone()),
                ("format", "json".to_string()),
            ])
            .send()
            .await
            .map_err(GeocodeError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(GeocodeError::Service {
                status: status.as_u16(),
            });
        }

        let body: GeocodingResponse = response.json().await.map_err(|e| {
            if e.is_timeout() {
                GeocodeError::Timeout
            } else {
                GeocodeError::Malformed(e.to_string())
            }
        })?;

        Ok(body.results.unwrap_or_default())
    }

    // Cache failures degrade to misses: persistence trouble must not take
    // down a lookup that can still go to the network.
    fn cache_get<T: serde::de::DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.cache.get(key, self.cache_ttl) {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(key, error = %e, "geocode cache read failed");
                None
            }
        }
    }

    fn cache_put<T: serde::Serialize>(&self, key: &str, value: &T) {
        if let Err(e) = self.cache.put(key, value) {
            tracing::warn!(key, error = %e, "geocode cache write failed");
        }
    }
}
