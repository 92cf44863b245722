//! Search orchestration: query -> resolved location -> weather record.
//!
//! This is the one place raw resolver/fetcher errors are translated into the
//! [`SearchError`] taxonomy, and the one place the offline downgrade decision
//! is made. Each search walks Idle -> Resolving -> Fetching -> Ready/Failed;
//! callers are only notified at entry and at a terminal state.

use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

use brisa_core::Config;

use crate::cache::{query_key, CacheStore};
use crate::debounce::{Debouncer, LatestQuery};
use crate::error::{GeolocationError, SearchError};
use crate::fetch::{validate_coordinates, WeatherFetcher};
use crate::geocode::GeoResolver;
use crate::storage::{ns, Storage};
use crate::types::{Coordinates, Location, SavedCity, WeatherRecord};

/// Name shown when reverse geocoding a device fix fails.
const PLACEHOLDER_CITY: &str = "Current location";

/// Externally observable states of one search request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchPhase {
    Idle,
    Resolving,
    Fetching,
    Ready,
    Failed,
}

impl SearchPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed)
    }
}

/// Visual output collaborator. The orchestrator only hands over plain data.
pub trait Renderer {
    fn show_loading(&self);
    fn show_error(&self, error: &SearchError);
    fn show_record(&self, record: &WeatherRecord);
}

/// Device position collaborator.
pub trait Geolocator {
    fn current_coordinates(
        &self,
    ) -> impl std::future::Future<Output = Result<Coordinates, GeolocationError>> + Send;
}

/// Connectivity probe. Gates the offline downgrade.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}

/// Default probe: assume the network is reachable and let failures surface.
pub struct AssumeOnline;

impl Connectivity for AssumeOnline {
    fn is_online(&self) -> bool {
        true
    }
}

pub struct WeatherService {
    storage: Arc<Storage>,
    cache: CacheStore,
    /// Last good record per city, never TTL-purged. Source for the offline
    /// downgrade after the expiring cache has moved on.
    offline: CacheStore,
    resolver: GeoResolver,
    fetcher: WeatherFetcher,
    connectivity: Box<dyn Connectivity>,
    forecast_days: u8,
    cache_ttl: Duration,
    last_search_expiry: Duration,
    recent_cap: usize,
    debounce: Duration,
}

impl WeatherService {
    pub fn new(storage: Arc<Storage>, config: &Config) -> anyhow::Result<Self> {
        let cache_ttl = Duration::from_secs(config.retention.cache_ttl_minutes * 60);
        let cache = CacheStore::new(Arc::clone(&storage), ns::WEATHER_CACHE);
        let offline = CacheStore::new(Arc::clone(&storage), ns::OFFLINE);

        let resolver = GeoResolver::new(cache.clone(), &config.api, &config.search, cache_ttl)?;
        let fetcher = WeatherFetcher::new(cache.clone(), &config.api, cache_ttl)?;

        Ok(Self {
            storage,
            cache,
            offline,
            resolver,
            fetcher,
            connectivity: Box::new(AssumeOnline),
            forecast_days: config.search.forecast_days,
            cache_ttl,
            last_search_expiry: Duration::from_secs(
                config.retention.last_search_expiry_hours * 3600,
            ),
            recent_cap: config.retention.recent_max_items,
            debounce: Duration::from_millis(config.search.debounce_ms),
        })
    }

    /// A debouncer configured with the product quiet period, one per input.
    pub fn new_debouncer(&self) -> Debouncer {
        Debouncer::new(self.debounce)
    }

    /// Swap the connectivity probe (platform integrations, tests).
    pub fn with_connectivity(mut self, connectivity: Box<dyn Connectivity>) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Full search: free-text query to weather record.
    #[instrument(skip(self), level = "info")]
    pub async fn search(&self, query: &str) -> Result<WeatherRecord, SearchError> {
        let city = sanitize_query(query);
        if city.is_empty() {
            return Err(SearchError::EmptyInput);
        }

        let key = query_key("city", &city);
        if let Some(record) = self.cached_record(&key) {
            tracing::debug!(%city, "serving cached record");
            self.remember(&record.location);
            return Ok(record);
        }

        tracing::debug!(phase = ?SearchPhase::Resolving, %city);
        let location = self.resolver.resolve(&city).await?;

        self.fetch_and_assemble(location, &key).await
    }

    /// Search with an already-resolved location (autocomplete selection,
    /// favorite, recent). Skips geocoding entirely.
    #[instrument(skip(self, location), fields(city = %location.name), level = "info")]
    pub async fn search_by_location(
        &self,
        location: &Location,
    ) -> Result<WeatherRecord, SearchError> {
        validate_coordinates(location.latitude, location.longitude)
            .map_err(SearchError::from)?;

        let key = query_key("city", &location.name);
        if let Some(record) = self.cached_record(&key) {
            self.remember(&record.location);
            return Ok(record);
        }

        self.fetch_and_assemble(location.clone(), &key).await
    }

    /// Search from the device position. Reverse resolution is best-effort:
    /// when it fails the record carries a placeholder name instead of
    /// failing the whole operation.
    #[instrument(skip(self, geolocator), level = "info")]
    pub async fn search_by_device_location(
        &self,
        geolocator: &impl Geolocator,
    ) -> Result<WeatherRecord, SearchError> {
        let coords = geolocator.current_coordinates().await?;
        validate_coordinates(coords.latitude, coords.longitude).map_err(SearchError::from)?;

        let location = match self.resolver.reverse(coords.latitude, coords.longitude).await {
            Some(mut place) => {
                // Keep the exact device fix; the resolved name is for display.
                place.latitude = coords.latitude;
                place.longitude = coords.longitude;
                place
            }
            None => Location {
                name: PLACEHOLDER_CITY.to_string(),
                country: String::new(),
                admin_region: None,
                latitude: coords.latitude,
                longitude: coords.longitude,
            },
        };

        self.search_by_location(&location).await
    }

    /// Autocomplete suggestions. Degrades to empty, never fails.
    pub async fn suggest(&self, query: &str) -> Vec<Location> {
        self.resolver.suggest(query).await
    }

    /// Debounced autocomplete for keystroke bursts: waits out the quiet
    /// period, then drops the response if a newer query superseded it.
    /// `None` means "discard"; `Some` carries the suggestions to apply.
    pub async fn suggest_debounced(
        &self,
        query: &str,
        debouncer: &Debouncer,
        latest: &LatestQuery,
    ) -> Option<Vec<Location>> {
        let query = debouncer.settle(query.to_string()).await?;
        let token = latest.issue();
        let suggestions = self.resolver.suggest(&query).await;
        latest.is_current(token).then_some(suggestions)
    }

    /// Re-run the last unexpired search, if any (start-up restore).
    pub async fn restore_last_search(&self) -> Result<Option<WeatherRecord>, SearchError> {
        let last = self
            .storage
            .last_search(self.last_search_expiry)
            .map_err(SearchError::storage)?;

        match last {
            Some(entry) => self.search(&entry.city_name).await.map(Some),
            None => Ok(None),
        }
    }

    /// Drive a full search through the renderer: loading at entry, record or
    /// error at the terminal state, nothing in between.
    pub async fn search_and_render(&self, query: &str, renderer: &dyn Renderer) {
        renderer.show_loading();
        match self.search(query).await {
            Ok(record) => renderer.show_record(&record),
            Err(error) => {
                tracing::warn!(phase = ?SearchPhase::Failed, %error);
                renderer.show_error(&error);
            }
        }
    }

    // ---- history & favorites ----

    pub fn recent_cities(&self) -> Result<Vec<SavedCity>, SearchError> {
        self.storage.recent_cities().map_err(SearchError::storage)
    }

    pub fn favorites(&self) -> Result<Vec<SavedCity>, SearchError> {
        self.storage.favorites().map_err(SearchError::storage)
    }

    pub fn add_favorite(&self, location: &Location) -> Result<bool, SearchError> {
        self.storage
            .add_favorite(location)
            .map_err(SearchError::storage)
    }

    pub fn remove_favorite(&self, name: &str, country: &str) -> Result<bool, SearchError> {
        self.storage
            .remove_favorite(name, country)
            .map_err(SearchError::storage)
    }

    pub fn is_favorite(&self, name: &str, country: &str) -> Result<bool, SearchError> {
        self.storage
            .is_favorite(name, country)
            .map_err(SearchError::storage)
    }

    /// Wipe cache, history, favorites and preferences.
    pub fn clear_all_data(&self) -> Result<(), SearchError> {
        self.storage.clear_all().map_err(SearchError::storage)
    }

    // ---- internals ----

    async fn fetch_and_assemble(
        &self,
        location: Location,
        key: &str,
    ) -> Result<WeatherRecord, SearchError> {
        tracing::debug!(phase = ?SearchPhase::Fetching, city = %location.name);

        let fetched = match self.fetcher.fetch_both(&location, self.forecast_days).await {
            Ok(fetched) => fetched,
            Err(error) => {
                if let Some(stale) = self.offline_fallback(key, &location) {
                    tracing::info!(city = %location.name, "network unreachable, serving stale record");
                    return Ok(stale);
                }
                return Err(error.into());
            }
        };

        let record = WeatherRecord {
            location,
            current: fetched.current,
            forecast: fetched.forecast,
            timezone: fetched.timezone,
            fetched_at_ms: Storage::now_ms(),
            stale: false,
        };

        if let Err(e) = self.cache.put(key, &record) {
            tracing::warn!(key, error = %e, "failed to cache weather record");
        }
        if let Err(e) = self.offline.put(key, &record) {
            tracing::warn!(key, error = %e, "failed to archive weather record");
        }
        self.remember(&record.location);

        tracing::debug!(phase = ?SearchPhase::Ready, city = %record.location.name);
        Ok(record)
    }

    /// The downgrade decision: only when the connectivity probe says we are
    /// offline AND an earlier record for this city survives in the cache.
    /// The record keeps its original fetch timestamp and gains a stale flag.
    fn offline_fallback(&self, key: &str, location: &Location) -> Option<WeatherRecord> {
        if self.connectivity.is_online() {
            return None;
        }

        let peeked = self.offline.peek::<WeatherRecord>(key).unwrap_or_else(|e| {
            tracing::warn!(key, error = %e, "offline fallback read failed");
            None
        });

        peeked.map(|(mut record, _stored_at)| {
            tracing::debug!(city = %location.name, "found stale record for offline fallback");
            record.stale = true;
            record
        })
    }

    fn cached_record(&self, key: &str) -> Option<WeatherRecord> {
        match self.cache.get::<WeatherRecord>(key, self.cache_ttl) {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(key, error = %e, "record cache read failed");
                None
            }
        }
    }

    /// Update recents, the last-search singleton and the visited flag after
    /// a successful search. History trouble never fails the search itself.
    fn remember(&self, location: &Location) {
        if let Err(e) = self.storage.add_recent(location, self.recent_cap) {
            tracing::warn!(error = %e, "failed to update recent cities");
        }
        if let Err(e) = self.storage.set_last_search(&location.name) {
            tracing::warn!(error = %e, "failed to update last search");
        }
        if let Err(e) = self.storage.mark_visited() {
            tracing::warn!(error = %e, "failed to set visited flag");
        }
    }
}

/// Trim and drop angle brackets and control characters from raw input.
fn sanitize_query(query: &str) -> String {
    query
        .chars()
        .filter(|c| !matches!(c, '<' | '>') && !c.is_control())
        .collect::<String>()
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
    use super::*;
    use parking_lot::Mutex;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Offline;

    impl Connectivity for Offline {
        fn is_online(&self) -> bool {
            false
        }
    }

    struct FixedPosition(Coordinates);

    impl Geolocator for FixedPosition {
        async fn current_coordinates(&self) -> Result<Coordinates, GeolocationError> {
            Ok(self.0)
        }
    }

    struct DeniedPosition;

    impl Geolocator for DeniedPosition {
        async fn current_coordinates(&self) -> Result<Coordinates, GeolocationError> {
            Err(GeolocationError::PermissionDenied)
        }
    }

    #[derive(Default)]
    struct RecordingRenderer {
        calls: Mutex<Vec<&'static str>>,
    }

    impl Renderer for RecordingRenderer {
        fn show_loading(&self) {
            self.calls.lock().push("loading");
        }
        fn show_error(&self, _error: &SearchError) {
            self.calls.lock().push("error");
        }
        fn show_record(&self, _record: &WeatherRecord) {
            self.calls.lock().push("record");
        }
    }

    fn service_at(server: &MockServer) -> (WeatherService, Arc<Storage>) {
        let storage = Arc::new(Storage::in_memory().unwrap());
        let mut config = Config::default();
        config.api.geocoding_url = format!("{}/geocode", server.uri());
        config.api.forecast_url = format!("{}/forecast", server.uri());
        let service = WeatherService::new(Arc::clone(&storage), &config).unwrap();
        (service, storage)
    }

    fn geocode_hit() -> serde_json::Value {
        serde_json::json!({
            "results": [{
                "name": "Aracaju",
                "country": "Brasil",
                "admin1": "Sergipe",
                "latitude": -10.9167,
                "longitude": -37.05,
                "country_code": "BR"
            }]
        })
    }

    fn forecast_body() -> serde_json::Value {
        serde_json::json!({
            "timezone": "America/Maceio",
            "current": {
                "temperature_2m": 27.3,
                "relative_humidity_2m": 74.0,
                "apparent_temperature": 30.1,
                "precipitation": 0.0,
                "weather_code": 1,
                "cloud_cover": 40.0,
                "pressure_msl": 1013.2,
                "wind_speed_10m": 18.4,
                "wind_direction_10m": 120.0
            },
            "daily": {
                "time": ["2026-08-07", "2026-08-08", "2026-08-09", "2026-08-10",
                         "2026-08-11", "2026-08-12", "2026-08-13"],
                "temperature_2m_max": [29.0, 28.5, 29.2, 30.0, 28.1, 27.9, 29.5],
                "temperature_2m_min": [22.5, 22.0, 22.8, 23.1, 21.9, 21.5, 22.2],
                "weather_code": [1, 2, 3, 61, 2, 1, 0],
                "precipitation_sum": [0.0, 0.2, null, 4.1, 0.0, 0.0, 0.0],
                "precipitation_probability_max": [10.0, 25.0, null, 80.0, 15.0, 5.0, 0.0]
            }
        })
    }

    async fn mount_happy(server: &MockServer) {
        Mock::given(method("GET"))
            .and(path("/geocode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(geocode_hit()))
            .mount(server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_search_happy_path() {
        let server = MockServer::start().await;
        mount_happy(&server).await;
        let (service, storage) = service_at(&server);

        let record = service.search("Aracaju").await.unwrap();

        assert_eq!(record.location.name, "Aracaju");
        assert_eq!(record.forecast.len(), 7);
        assert_eq!(
            record.forecast[0].date,
            chrono::NaiveDate::from_ymd_opt(2026, 8, 7).unwrap()
        );
        assert!(!record.stale);
        assert_eq!(record.current.weather_code, 1);

        let recents = storage.recent_cities().unwrap();
        assert_eq!(recents.len(), 1);
        assert_eq!(recents[0].name, "Aracaju");

        let last = storage
            .last_search(Duration::from_secs(24 * 3600))
            .unwrap()
            .unwrap();
        assert_eq!(last.city_name, "Aracaju");
        assert!(storage.has_visited().unwrap());
    }

    #[tokio::test]
    async fn test_search_twice_issues_one_network_call_pair() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geocode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(geocode_hit()))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
            .expect(1)
            .mount(&server)
            .await;
        let (service, _storage) = service_at(&server);

        let first = service.search("São Paulo").await.unwrap();
        let second = service.search("são paulo").await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_expired_cache_triggers_one_fresh_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geocode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(geocode_hit()))
            .expect(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
            .expect(2)
            .mount(&server)
            .await;
        let (service, _storage) = service_at(&server);

        service.search("Aracaju").await.unwrap();
        // age every cached entry past the 10-minute TTL
        let eleven_minutes_ago = Storage::now_ms() - 11 * 60 * 1000;
        service.cache.backdate_all(eleven_minutes_ago).unwrap();
        service.search("Aracaju").await.unwrap();
    }

    #[tokio::test]
    async fn test_empty_query_fails_without_network() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let (service, _storage) = service_at(&server);

        assert!(matches!(
            service.search("").await.unwrap_err(),
            SearchError::EmptyInput
        ));
        // angle brackets and control characters are stripped before the check
        assert!(matches!(
            service.search("  <> \u{7} ").await.unwrap_err(),
            SearchError::EmptyInput
        ));
    }

    #[tokio::test]
    async fn test_city_not_found_attempts_no_weather_call() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geocode"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"results": []})),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let (service, _storage) = service_at(&server);

        let err = service.search("Atlantis").await.unwrap_err();
        assert!(matches!(err, SearchError::CityNotFound(q) if q == "Atlantis"));
    }

    #[tokio::test]
    async fn test_fetch_failure_online_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geocode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(geocode_hit()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        let (service, _storage) = service_at(&server);

        let err = service.search("Aracaju").await.unwrap_err();
        assert!(matches!(err, SearchError::Service(_)));
    }

    #[tokio::test]
    async fn test_offline_with_stale_record_downgrades() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geocode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(geocode_hit()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let (service, _storage) = service_at(&server);
        let service = service.with_connectivity(Box::new(Offline));

        let fresh = service.search("Aracaju").await.unwrap();
        service
            .cache
            .backdate_all(Storage::now_ms() - 11 * 60 * 1000)
            .unwrap();

        let stale = service.search("Aracaju").await.unwrap();
        assert!(stale.stale);
        assert_eq!(stale.fetched_at_ms, fresh.fetched_at_ms);
        assert_eq!(stale.forecast, fresh.forecast);
    }

    #[tokio::test]
    async fn test_offline_without_prior_record_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geocode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(geocode_hit()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let (service, _storage) = service_at(&server);
        let service = service.with_connectivity(Box::new(Offline));

        let err = service.search("Aracaju").await.unwrap_err();
        assert!(matches!(err, SearchError::Service(_)));
    }

    #[tokio::test]
    async fn test_search_by_location_skips_geocoding() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geocode"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
            .mount(&server)
            .await;
        let (service, _storage) = service_at(&server);

        let location = Location {
            name: "Aracaju".to_string(),
            country: "Brasil".to_string(),
            admin_region: Some("Sergipe".to_string()),
            latitude: -10.9167,
            longitude: -37.05,
        };
        let record = service.search_by_location(&location).await.unwrap();
        assert_eq!(record.location.name, "Aracaju");
    }

    #[tokio::test]
    async fn test_search_by_location_rejects_bad_coordinates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let (service, _storage) = service_at(&server);

        let location = Location {
            name: "Nowhere".to_string(),
            country: String::new(),
            admin_region: None,
            latitude: -95.0,
            longitude: 10.0,
        };
        let err = service.search_by_location(&location).await.unwrap_err();
        assert!(matches!(err, SearchError::InvalidCoordinates { .. }));
    }

    #[tokio::test]
    async fn test_device_location_with_reverse_name() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geocode"))
            .and(query_param("latitude", "-10.9167"))
            .respond_with(ResponseTemplate::new(200).set_body_json(geocode_hit()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
            .mount(&server)
            .await;
        let (service, _storage) = service_at(&server);

        let geolocator = FixedPosition(Coordinates {
            latitude: -10.9167,
            longitude: -37.05,
        });
        let record = service
            .search_by_device_location(&geolocator)
            .await
            .unwrap();
        assert_eq!(record.location.name, "Aracaju");
    }

    #[tokio::test]
    async fn test_device_location_placeholder_when_reverse_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geocode"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/forecast"))
            .respond_with(ResponseTemplate::new(200).set_body_json(forecast_body()))
            .mount(&server)
            .await;
        let (service, _storage) = service_at(&server);

        let geolocator = FixedPosition(Coordinates {
            latitude: -10.9167,
            longitude: -37.05,
        });
        let record = service
            .search_by_device_location(&geolocator)
            .await
            .unwrap();
        assert_eq!(record.location.name, PLACEHOLDER_CITY);
        assert!((record.location.latitude - -10.9167).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_device_location_permission_denied() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let (service, _storage) = service_at(&server);

        let err = service
            .search_by_device_location(&DeniedPosition)
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::PermissionDenied));
    }

    #[tokio::test]
    async fn test_repeat_search_keeps_single_recent_entry() {
        let server = MockServer::start().await;
        mount_happy(&server).await;
        let (service, storage) = service_at(&server);

        service.search("Aracaju").await.unwrap();
        service.search("Aracaju").await.unwrap(); // cache hit

        let recents = storage.recent_cities().unwrap();
        assert_eq!(recents.len(), 1);
    }

    #[tokio::test]
    async fn test_suggest_debounced_keeps_only_last_of_burst() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/geocode"))
            .respond_with(ResponseTemplate::new(200).set_body_json(geocode_hit()))
            .mount(&server)
            .await;
        let (service, _storage) = service_at(&server);

        let debouncer = Debouncer::new(Duration::from_millis(50));
        let latest = LatestQuery::new();
        let (first, second) = tokio::join!(
            service.suggest_debounced("arac", &debouncer, &latest),
            service.suggest_debounced("aracaj", &debouncer, &latest),
        );
        assert!(first.is_none());
        assert_eq!(second.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_restore_last_search() {
        let server = MockServer::start().await;
        mount_happy(&server).await;
        let (service, _storage) = service_at(&server);

        assert!(service.restore_last_search().await.unwrap().is_none());

        service.search("Aracaju").await.unwrap();

        let restored = service.restore_last_search().await.unwrap().unwrap();
        assert_eq!(restored.location.name, "Aracaju");
    }

    #[tokio::test]
    async fn test_favorites_through_service() {
        let server = MockServer::start().await;
        let (service, _storage) = service_at(&server);

        let rio = Location {
            name: "Rio de Janeiro".to_string(),
            country: "Brasil".to_string(),
            admin_region: None,
            latitude: -22.9,
            longitude: -43.2,
        };
        assert!(service.add_favorite(&rio).unwrap());
        assert!(!service.add_favorite(&rio).unwrap());
        assert!(service.is_favorite("rio de janeiro", "brasil").unwrap());
        assert!(service.remove_favorite("Rio de Janeiro", "Brasil").unwrap());
        assert!(service.favorites().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_renderer_sees_loading_then_record() {
        let server = MockServer::start().await;
        mount_happy(&server).await;
        let (service, _storage) = service_at(&server);

        let renderer = RecordingRenderer::default();
        service.search_and_render("Aracaju", &renderer).await;
        assert_eq!(*renderer.calls.lock(), vec!["loading", "record"]);
    }

    #[tokio::test]
    async fn test_renderer_sees_loading_then_error() {
        let server = MockServer::start().await;
        let (service, _storage) = service_at(&server);

        let renderer = RecordingRenderer::default();
        service.search_and_render("", &renderer).await;
        assert_eq!(*renderer.calls.lock(), vec!["loading", "error"]);
    }

    #[test]
    fn test_phase_terminality() {
        assert!(!SearchPhase::Idle.is_terminal());
        assert!(!SearchPhase::Resolving.is_terminal());
        assert!(!SearchPhase::Fetching.is_terminal());
        assert!(SearchPhase::Ready.is_terminal());
        assert!(SearchPhase::Failed.is_terminal());
    }

    #[test]
    fn test_sanitize_query() {
        assert_eq!(sanitize_query("  Aracaju  "), "Aracaju");
        assert_eq!(sanitize_query("<script>Rio</script>"), "scriptRio/script");
        assert_eq!(sanitize_query("Rio\u{0}\u{1f}"), "Rio");
    }
}
