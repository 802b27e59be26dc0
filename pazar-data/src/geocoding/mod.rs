//! HTTP geocoding of store addresses.
//!
//! [`PhotonGeocoder`] implements [`pazar_core::Geocoder`] against a
//! Photon-compatible search API. Feed addresses carry retailer prefixes,
//! store numbers and postcodes that confuse the search index, so queries are
//! passed through [`clean_address`] first.
//!
//! # Example
//!
//! ```no_run
//! use pazar_core::Geocoder;
//! use pazar_data::{PhotonGeocoder, PhotonGeocoderConfig};
//! use std::time::Duration;
//!
//! let config = PhotonGeocoderConfig::new("https://photon.komoot.io")
//!     .with_timeout(Duration::from_secs(10))
//!     .with_user_agent("pazar-example/1.0");
//! let geocoder = PhotonGeocoder::with_config(config)?;
//! if let Some(coord) = geocoder.geocode("гр. Варна, ул. „Девня“ 24")? {
//!     println!("{}, {}", coord.y, coord.x);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod photon;
mod provider;

use std::sync::LazyLock;

use regex::Regex;

pub use provider::{
    DEFAULT_BASE_URL, DEFAULT_USER_AGENT, GeocoderBuildError, PhotonGeocoder,
    PhotonGeocoderConfig,
};

struct CleanupPatterns {
    chain_prefix: Regex,
    postcode: Regex,
    leading_separators: Regex,
}

#[allow(
    clippy::expect_used,
    reason = "patterns are compile-time constants covered by unit tests"
)]
static CLEANUP: LazyLock<CleanupPatterns> = LazyLock::new(|| CleanupPatterns {
    chain_prefix: Regex::new(r"(?i)^(Билла|Метро|Kaufland|Кауфланд|BulMag|Булмаг)\s+\d*\s*")
        .expect("valid chain prefix pattern"),
    postcode: Regex::new(r"\b\d{4}\b").expect("valid postcode pattern"),
    leading_separators: Regex::new(r"^[\s\-,]+").expect("valid separator pattern"),
});

/// Reduce a feed or seed address to something a search index understands.
///
/// The Latin look-alike `rp.` becomes `гр.`, only the part after the last
/// `" - "` is kept (with `/` read as a separator), and leading retailer
/// names, store numbers and four-digit postcodes are dropped.
///
/// # Examples
/// ```
/// use pazar_data::clean_address;
///
/// assert_eq!(clean_address("Kaufland 4 - ул. Девня 24, 9000 Варна"), "ул. Девня 24, Варна");
/// assert_eq!(clean_address("Билла 112 бул. Сливница 185"), "бул. Сливница 185");
/// ```
#[must_use]
pub fn clean_address(raw: &str) -> String {
    let replaced = raw.replace("rp.", "гр.");
    let trimmed = replaced.trim_matches(|c: char| c == ' ' || c == '"');
    let segment = match trimmed.rsplit_once(" - ") {
        Some((_, tail)) if trimmed.contains('/') => tail.replace('/', ", "),
        Some((_, tail)) => tail.to_owned(),
        None => trimmed.to_owned(),
    };
    let without_chain = CLEANUP.chain_prefix.replace(&segment, "");
    let without_postcode = CLEANUP.postcode.replace_all(&without_chain, "");
    let cleaned = CLEANUP.leading_separators.replace(&without_postcode, "");
    cleaned.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Kaufland 4 - ул. Девня 24, 9000 Варна", "ул. Девня 24, Варна")]
    #[case("\"rp. Варна, ул. Мир 45\"", "гр. Варна, ул. Мир 45")]
    #[case("Варна - Мол/Левски 1", "Мол, Левски 1")]
    #[case("КАУФЛАНД 12 бул. Република 60", "бул. Република 60")]
    #[case("BulMag бул. Чаталджа 22", "бул. Чаталджа 22")]
    #[case("  - , ул. Подвис 25", "ул. Подвис 25")]
    #[case("бул. „Сливница“ 176", "бул. „Сливница“ 176")]
    #[case("", "")]
    fn cleans_addresses(#[case] raw: &str, #[case] expected: &str) {
        assert_eq!(clean_address(raw), expected);
    }
}
