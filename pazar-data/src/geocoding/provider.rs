//! Blocking [`Geocoder`] over the Photon search API.
//!
//! The [`Geocoder`] trait is synchronous so seeders and importers can call it
//! from plain worker threads. This provider bridges the async HTTP client to
//! that interface by blocking on a Tokio runtime it owns.
//!
//! Public Photon instances throttle aggressive clients. Requests are spaced
//! by [`PhotonGeocoderConfig::min_interval`] across every thread sharing the
//! provider, and HTTP 403/429 answers or timeouts are retried after a fixed
//! backoff.

use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use geo::Coord;
use log::{debug, warn};
use pazar_core::{GeocodeError, Geocoder};
use reqwest::{Client, StatusCode};
use thiserror::Error;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use url::Url;

use super::clean_address;
use super::photon::SearchResponse;

/// Public Photon instance operated by Komoot.
pub const DEFAULT_BASE_URL: &str = "https://photon.komoot.io";

/// Default user agent for geocoding requests.
pub const DEFAULT_USER_AGENT: &str = "pazar-geocoder/0.1";

/// Appended to every query to keep results inside the country.
const COUNTRY_SUFFIX: &str = ", Bulgaria";

const DEFAULT_TIMEOUT_SECS: u64 = 5;
const DEFAULT_MIN_INTERVAL_MILLIS: u64 = 500;
const DEFAULT_MAX_RETRIES: u32 = 3;
const DEFAULT_RETRY_BACKOFF_SECS: u64 = 2;

/// Error type for [`PhotonGeocoder`] construction failures.
#[derive(Debug, Error)]
pub enum GeocoderBuildError {
    /// The base URL could not be parsed.
    #[error("invalid geocoder base URL '{url}'")]
    InvalidUrl {
        /// Rejected URL.
        url: String,
        /// Parser error.
        #[source]
        source: url::ParseError,
    },
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client")]
    HttpClient(#[source] reqwest::Error),
    /// Failed to build the Tokio runtime.
    #[error("failed to build Tokio runtime")]
    Runtime(#[source] std::io::Error),
}

/// Configuration for [`PhotonGeocoder`].
#[derive(Debug, Clone)]
pub struct PhotonGeocoderConfig {
    /// Base URL of the Photon service; `/api/` is appended.
    pub base_url: String,
    /// Request timeout.
    pub timeout: Duration,
    /// User agent string for requests.
    pub user_agent: String,
    /// Minimum delay between the start of two requests.
    pub min_interval: Duration,
    /// Extra attempts after a rate-limited or timed-out request.
    pub max_retries: u32,
    /// Delay before each retry.
    pub retry_backoff: Duration,
}

impl Default for PhotonGeocoderConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            min_interval: Duration::from_millis(DEFAULT_MIN_INTERVAL_MILLIS),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: Duration::from_secs(DEFAULT_RETRY_BACKOFF_SECS),
        }
    }
}

impl PhotonGeocoderConfig {
    /// Create a configuration for the service at `base_url`.
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            ..Default::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the minimum spacing between requests.
    #[must_use]
    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    /// Set how many times a throttled request is retried.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the delay before each retry.
    #[must_use]
    pub fn with_retry_backoff(mut self, retry_backoff: Duration) -> Self {
        self.retry_backoff = retry_backoff;
        self
    }
}

/// Photon-backed geocoder.
///
/// # Runtime behaviour
///
/// Outside any Tokio runtime the provider blocks on its own current-thread
/// runtime. Inside a multi-threaded runtime it uses that runtime's handle
/// with [`tokio::task::block_in_place`]; inside a `current_thread` runtime it
/// falls back to its own runtime.
pub struct PhotonGeocoder {
    client: Client,
    config: PhotonGeocoderConfig,
    endpoint: Url,
    runtime: Runtime,
    last_request: Mutex<Option<Instant>>,
}

impl std::fmt::Debug for PhotonGeocoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotonGeocoder")
            .field("client", &self.client)
            .field("config", &self.config)
            .field("endpoint", &self.endpoint.as_str())
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish_non_exhaustive()
    }
}

impl PhotonGeocoder {
    /// Create a geocoder for `base_url` with default settings.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client or Tokio
    /// runtime fails to build.
    pub fn new(base_url: impl Into<String>) -> Result<Self, GeocoderBuildError> {
        Self::with_config(PhotonGeocoderConfig::new(base_url))
    }

    /// Create a geocoder with explicit configuration.
    ///
    /// # Errors
    /// Returns an error if the URL is invalid or the HTTP client or Tokio
    /// runtime fails to build.
    pub fn with_config(config: PhotonGeocoderConfig) -> Result<Self, GeocoderBuildError> {
        let endpoint_text = format!("{}/api/", config.base_url.trim_end_matches('/'));
        let endpoint = Url::parse(&endpoint_text).map_err(|source| {
            GeocoderBuildError::InvalidUrl {
                url: config.base_url.clone(),
                source,
            }
        })?;
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .connect_timeout(config.timeout)
            .timeout(config.timeout)
            .build()
            .map_err(GeocoderBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(GeocoderBuildError::Runtime)?;
        Ok(Self {
            client,
            config,
            endpoint,
            runtime,
            last_request: Mutex::new(None),
        })
    }

    /// Build the search URL for an already cleaned query.
    fn search_url(&self, query: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("q", &format!("{query}{COUNTRY_SUFFIX}"))
            .append_pair("limit", "1");
        url
    }

    /// Sleep until `min_interval` has passed since the previous request.
    ///
    /// The lock is held while sleeping so concurrent callers queue up.
    fn wait_for_slot(&self) {
        let mut last = self
            .last_request
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.config.min_interval {
                thread::sleep(self.config.min_interval.saturating_sub(elapsed));
            }
        }
        *last = Some(Instant::now());
    }

    async fn fetch_async(&self, url: &Url) -> Result<Option<Coord<f64>>, GeocodeError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| self.convert_reqwest_error(&err, url))?;
        let status = response.status();
        if status == StatusCode::FORBIDDEN || status == StatusCode::TOO_MANY_REQUESTS {
            return Err(GeocodeError::HttpError {
                url: url.to_string(),
                status: status.as_u16(),
                message: "request throttled".to_owned(),
            });
        }
        let body: SearchResponse = response
            .error_for_status()
            .map_err(|err| self.convert_reqwest_error(&err, url))?
            .json()
            .await
            .map_err(|err| GeocodeError::ParseError {
                message: err.to_string(),
            })?;
        convert_response(body)
    }

    fn convert_reqwest_error(&self, error: &reqwest::Error, url: &Url) -> GeocodeError {
        if error.is_timeout() {
            return GeocodeError::Timeout {
                url: url.to_string(),
                timeout_secs: self.config.timeout.as_secs(),
            };
        }

        if let Some(status) = error.status() {
            return GeocodeError::HttpError {
                url: url.to_string(),
                status: status.as_u16(),
                message: error.to_string(),
            };
        }

        GeocodeError::NetworkError {
            url: url.to_string(),
            message: error.to_string(),
        }
    }

    fn fetch_blocking(&self, url: &Url) -> Result<Option<Coord<f64>>, GeocodeError> {
        let future = self.fetch_async(url);
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }
}

const fn is_throttled(error: &GeocodeError) -> bool {
    matches!(
        error,
        GeocodeError::Timeout { .. } | GeocodeError::HttpError { status: 403 | 429, .. }
    )
}

/// Take the first feature of a search response as `Coord { x: lon, y: lat }`.
fn convert_response(response: SearchResponse) -> Result<Option<Coord<f64>>, GeocodeError> {
    let Some(feature) = response.features.into_iter().next() else {
        return Ok(None);
    };
    match feature.geometry.coordinates.as_slice() {
        [lon, lat, ..] if lon.is_finite() && lat.is_finite() => Ok(Some(Coord { x: *lon, y: *lat })),
        other => Err(GeocodeError::ParseError {
            message: format!("expected [lon, lat] point coordinates, got {other:?}"),
        }),
    }
}

impl Geocoder for PhotonGeocoder {
    /// Geocode `address` after [`clean_address`].
    ///
    /// An address that cleans to nothing is answered with `Ok(None)` without
    /// a request.
    fn geocode(&self, address: &str) -> Result<Option<Coord<f64>>, GeocodeError> {
        let query = clean_address(address);
        if query.is_empty() {
            return Ok(None);
        }
        let url = self.search_url(&query);
        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);
            self.wait_for_slot();
            match self.fetch_blocking(&url) {
                Ok(found) => {
                    debug!("geocoded '{query}' after {attempts} attempt(s): {found:?}");
                    return Ok(found);
                }
                Err(err) if is_throttled(&err) && attempts <= self.config.max_retries => {
                    warn!(
                        "geocoding '{query}' failed on attempt {attempts}: {err}; retrying in {:?}",
                        self.config.retry_backoff
                    );
                    thread::sleep(self.config.retry_backoff);
                }
                Err(GeocodeError::HttpError {
                    status: 403 | 429, ..
                }) => {
                    warn!("geocoding '{query}' gave up after {attempts} throttled attempt(s)");
                    return Err(GeocodeError::RateLimited {
                        url: url.to_string(),
                        attempts,
                    });
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geocoding::photon::{Feature, Geometry};
    use rstest::{fixture, rstest};

    #[fixture]
    fn geocoder() -> PhotonGeocoder {
        PhotonGeocoder::new("https://photon.example.com/").expect("geocoder should build")
    }

    fn feature(coordinates: Vec<f64>) -> Feature {
        Feature {
            geometry: Geometry { coordinates },
        }
    }

    #[rstest]
    fn search_url_carries_query_and_limit(geocoder: PhotonGeocoder) {
        let url = geocoder.search_url("ул. Девня 24");

        assert_eq!(url.host_str(), Some("photon.example.com"));
        assert_eq!(url.path(), "/api/");
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("q".to_owned(), "ул. Девня 24, Bulgaria".to_owned()),
                ("limit".to_owned(), "1".to_owned()),
            ]
        );
    }

    #[rstest]
    fn invalid_base_url_is_rejected() {
        let err = PhotonGeocoder::new("not a url").expect_err("should fail");
        assert!(matches!(err, GeocoderBuildError::InvalidUrl { .. }));
    }

    #[rstest]
    fn convert_response_swaps_axis_order() {
        let response = SearchResponse {
            features: vec![feature(vec![27.901336, 43.202323])],
        };

        let coord = convert_response(response).expect("should parse");

        assert_eq!(coord, Some(Coord { x: 27.901336, y: 43.202323 }));
    }

    #[rstest]
    fn convert_response_handles_no_features() {
        let found = convert_response(SearchResponse { features: vec![] }).expect("should parse");
        assert_eq!(found, None);
    }

    #[rstest]
    #[case(vec![27.9])]
    #[case(vec![f64::NAN, 43.2])]
    fn convert_response_rejects_bad_geometry(#[case] coordinates: Vec<f64>) {
        let response = SearchResponse {
            features: vec![feature(coordinates)],
        };

        let err = convert_response(response).expect_err("should fail");

        assert!(matches!(err, GeocodeError::ParseError { .. }));
    }

    #[rstest]
    #[case(GeocodeError::Timeout { url: String::new(), timeout_secs: 5 }, true)]
    #[case(GeocodeError::HttpError { url: String::new(), status: 429, message: String::new() }, true)]
    #[case(GeocodeError::HttpError { url: String::new(), status: 403, message: String::new() }, true)]
    #[case(GeocodeError::HttpError { url: String::new(), status: 500, message: String::new() }, false)]
    #[case(GeocodeError::NetworkError { url: String::new(), message: String::new() }, false)]
    fn only_throttling_is_retried(#[case] error: GeocodeError, #[case] expected: bool) {
        assert_eq!(is_throttled(&error), expected);
    }

    #[rstest]
    fn blank_address_needs_no_request(geocoder: PhotonGeocoder) {
        assert_eq!(geocoder.geocode("  \"\" ").expect("no request"), None);
    }

    #[rstest]
    fn unreachable_service_is_a_network_error() {
        let config = PhotonGeocoderConfig::new("http://127.0.0.1:9")
            .with_min_interval(Duration::ZERO)
            .with_max_retries(0);
        let geocoder = PhotonGeocoder::with_config(config).expect("geocoder should build");

        let err = geocoder.geocode("ул. Мир 45").expect_err("should fail");

        assert!(matches!(
            err,
            GeocodeError::NetworkError { .. } | GeocodeError::Timeout { .. }
        ));
    }

    #[rstest]
    fn config_builder_pattern() {
        let config = PhotonGeocoderConfig::new("http://example.com")
            .with_timeout(Duration::from_secs(60))
            .with_user_agent("test-agent/1.0")
            .with_min_interval(Duration::from_secs(1))
            .with_max_retries(5)
            .with_retry_backoff(Duration::from_millis(10));

        assert_eq!(config.base_url, "http://example.com");
        assert_eq!(config.timeout, Duration::from_secs(60));
        assert_eq!(config.user_agent, "test-agent/1.0");
        assert_eq!(config.min_interval, Duration::from_secs(1));
        assert_eq!(config.max_retries, 5);
        assert_eq!(config.retry_backoff, Duration::from_millis(10));
    }
}
