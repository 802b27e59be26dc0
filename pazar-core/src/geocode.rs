//! Resolve free-text addresses to coordinates.
//!
//! The [`Geocoder`] trait is synchronous so importers and seeders can call it
//! from plain worker threads. Network-backed implementations live in
//! `pazar-data`; this module also provides [`MemoizedGeocoder`], which caches
//! answers per normalised address so consecutive rows for the same store do
//! not trigger repeated lookups.

use std::collections::HashMap;
use std::sync::Mutex;

use geo::Coord;
use thiserror::Error;

/// Errors from [`Geocoder::geocode`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeocodeError {
    /// The request did not complete within the configured timeout.
    #[error("geocoding request to {url} timed out after {timeout_secs}s")]
    Timeout {
        /// Requested URL.
        url: String,
        /// Configured timeout in seconds.
        timeout_secs: u64,
    },
    /// The service kept refusing requests after every retry.
    #[error("geocoding service at {url} rate limited {attempts} attempt(s)")]
    RateLimited {
        /// Requested URL.
        url: String,
        /// Number of attempts made.
        attempts: u32,
    },
    /// The service answered with an unexpected HTTP status.
    #[error("geocoding request to {url} failed with HTTP {status}: {message}")]
    HttpError {
        /// Requested URL.
        url: String,
        /// HTTP status code.
        status: u16,
        /// Error detail.
        message: String,
    },
    /// The connection failed before a response arrived.
    #[error("network error contacting {url}: {message}")]
    NetworkError {
        /// Requested URL.
        url: String,
        /// Error detail.
        message: String,
    },
    /// The response body could not be decoded.
    #[error("failed to parse geocoding response: {message}")]
    ParseError {
        /// Error detail.
        message: String,
    },
}

/// Look up the position of a street address.
///
/// `Ok(None)` means the service answered but knows no such place.
///
/// # Examples
///
/// ```
/// use geo::Coord;
/// use pazar_core::{GeocodeError, Geocoder};
///
/// struct Fixed;
///
/// impl Geocoder for Fixed {
///     fn geocode(&self, address: &str) -> Result<Option<Coord<f64>>, GeocodeError> {
///         Ok((!address.is_empty()).then_some(Coord { x: 27.91, y: 43.2047 }))
///     }
/// }
///
/// assert!(Fixed.geocode("Варна")?.is_some());
/// assert!(Fixed.geocode("")?.is_none());
/// # Ok::<(), GeocodeError>(())
/// ```
pub trait Geocoder {
    /// Return the coordinate of `address`, if known.
    fn geocode(&self, address: &str) -> Result<Option<Coord<f64>>, GeocodeError>;
}

impl<G: Geocoder + ?Sized> Geocoder for &G {
    fn geocode(&self, address: &str) -> Result<Option<Coord<f64>>, GeocodeError> {
        (**self).geocode(address)
    }
}

/// Caches the answers of another [`Geocoder`].
///
/// Keys are lowercased with whitespace collapsed. Successful answers,
/// including "not found", are cached; errors are not, so a later call may
/// retry.
#[derive(Debug)]
pub struct MemoizedGeocoder<G> {
    inner: G,
    cache: Mutex<HashMap<String, Option<Coord<f64>>>>,
}

impl<G> MemoizedGeocoder<G> {
    /// Wrap `inner` with an empty cache.
    pub fn new(inner: G) -> Self {
        Self {
            inner,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Number of cached addresses.
    pub fn cached(&self) -> usize {
        self.cache.lock().map_or(0, |cache| cache.len())
    }

    /// Return the wrapped geocoder.
    pub fn into_inner(self) -> G {
        self.inner
    }
}

fn cache_key(address: &str) -> String {
    address
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

impl<G: Geocoder> Geocoder for MemoizedGeocoder<G> {
    fn geocode(&self, address: &str) -> Result<Option<Coord<f64>>, GeocodeError> {
        let key = cache_key(address);
        if let Ok(cache) = self.cache.lock()
            && let Some(hit) = cache.get(&key)
        {
            return Ok(*hit);
        }
        let answer = self.inner.geocode(address)?;
        if let Ok(mut cache) = self.cache.lock() {
            cache.insert(key, answer);
        }
        Ok(answer)
    }
}
