//! Weather lookup core for Brisa
//!
//! Turns a free-text city query into a validated, cached, displayable
//! weather record: geocoding via Open-Meteo, current conditions plus a
//! daily forecast, persistent caching and small local histories.

pub mod cache;
pub mod codes;
pub mod debounce;
pub mod error;
pub mod fetch;
pub mod geocode;
pub mod service;
pub mod storage;
pub mod types;

pub use cache::CacheStore;
pub use codes::{lookup, CodeInfo, WeatherCode};
pub use debounce::{Debouncer, LatestQuery};
pub use error::{FetchError, GeocodeError, GeolocationError, SearchError};
pub use fetch::{FetchedWeather, WeatherFetcher};
pub use geocode::GeoResolver;
pub use service::{Connectivity, Geolocator, Renderer, SearchPhase, WeatherService};
pub use storage::Storage;
pub use types::*;
