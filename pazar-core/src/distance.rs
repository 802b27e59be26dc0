//! Great-circle distances between `"lat, lon"` positions.
//!
//! Coordinates travel through the system as [`geo::Coord`] values with
//! `x = longitude` and `y = latitude`, and as `"lat, lon"` strings at the
//! edges. Distance lookups never fail: anything that cannot be parsed or is
//! missing yields [`PENALTY_DISTANCE_KM`].

use geo::Coord;
use thiserror::Error;

/// Mean Earth radius used by [`haversine_km`].
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Distance substituted when either position is unknown or malformed.
pub const PENALTY_DISTANCE_KM: f64 = 999.0;

/// Errors returned by [`parse_coordinates`].
#[derive(Debug, Error, PartialEq)]
pub enum CoordinatesError {
    /// The input did not contain exactly two comma-separated values.
    #[error("expected 'lat, lon' but found {found} value(s) in '{input}'")]
    WrongTokenCount {
        /// Rejected input.
        input: String,
        /// Number of comma-separated values found.
        found: usize,
    },
    /// A value was not a decimal number.
    #[error("'{token}' in '{input}' is not a decimal degree value")]
    Malformed {
        /// Rejected input.
        input: String,
        /// Offending value.
        token: String,
    },
    /// Latitude or longitude fell outside the valid range.
    #[error("coordinates ({lat}, {lon}) are out of range")]
    OutOfRange {
        /// Parsed latitude.
        lat: f64,
        /// Parsed longitude.
        lon: f64,
    },
}

/// Parse a `"lat, lon"` string into a coordinate.
///
/// # Errors
/// Returns [`CoordinatesError`] when the string does not hold exactly two
/// finite decimal numbers within `[-90, 90]` and `[-180, 180]`.
///
/// # Examples
/// ```
/// use pazar_core::parse_coordinates;
///
/// let varna = parse_coordinates("43.2047, 27.9100")?;
/// assert_eq!((varna.y, varna.x), (43.2047, 27.91));
/// assert!(parse_coordinates("43.2047").is_err());
/// # Ok::<(), pazar_core::CoordinatesError>(())
/// ```
pub fn parse_coordinates(input: &str) -> Result<Coord<f64>, CoordinatesError> {
    let tokens: Vec<&str> = input.split(',').map(str::trim).collect();
    let [lat, lon] = tokens.as_slice() else {
        return Err(CoordinatesError::WrongTokenCount {
            input: input.to_owned(),
            found: tokens.len(),
        });
    };
    let lat = parse_degrees(input, lat)?;
    let lon = parse_degrees(input, lon)?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(CoordinatesError::OutOfRange { lat, lon });
    }
    Ok(Coord { x: lon, y: lat })
}

fn parse_degrees(input: &str, token: &str) -> Result<f64, CoordinatesError> {
    token
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
        .ok_or_else(|| CoordinatesError::Malformed {
            input: input.to_owned(),
            token: token.to_owned(),
        })
}

/// Render a coordinate as `"lat, lon"`.
///
/// # Examples
/// ```
/// use geo::Coord;
/// use pazar_core::format_coordinates;
///
/// assert_eq!(format_coordinates(Coord { x: 27.91, y: 43.2047 }), "43.2047, 27.91");
/// ```
#[must_use]
pub fn format_coordinates(coord: Coord<f64>) -> String {
    format!("{}, {}", coord.y, coord.x)
}

/// Haversine distance in kilometres between two coordinates.
#[must_use]
pub fn haversine_km(from: Coord<f64>, to: Coord<f64>) -> f64 {
    let (lat1, lon1) = (from.y.to_radians(), from.x.to_radians());
    let (lat2, lon2) = (to.y.to_radians(), to.x.to_radians());
    let half_dlat = (lat2 - lat1) / 2.0;
    let half_dlon = (lon2 - lon1) / 2.0;
    let a = half_dlat.sin().powi(2) + lat1.cos() * lat2.cos() * half_dlon.sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Distance between two optional positions, or [`PENALTY_DISTANCE_KM`] when
/// either is missing.
#[must_use]
pub fn distance_or_penalty(from: Option<Coord<f64>>, to: Option<Coord<f64>>) -> f64 {
    match (from, to) {
        (Some(from), Some(to)) => haversine_km(from, to),
        _ => PENALTY_DISTANCE_KM,
    }
}

/// Distance between two `"lat, lon"` strings.
///
/// Malformed input on either side yields [`PENALTY_DISTANCE_KM`].
///
/// # Examples
/// ```
/// use pazar_core::{PENALTY_DISTANCE_KM, distance_between};
///
/// assert_eq!(distance_between("43.2047, 27.91", "43.2047, 27.91"), 0.0);
/// assert_eq!(distance_between("43.2047", "43.2047, 27.91"), PENALTY_DISTANCE_KM);
/// ```
#[must_use]
pub fn distance_between(from: &str, to: &str) -> f64 {
    distance_or_penalty(parse_coordinates(from).ok(), parse_coordinates(to).ok())
}
