//! Photon search API response types.
//!
//! Photon answers with a GeoJSON `FeatureCollection`; only the point
//! geometry of each feature is read.
//!
//! See: <https://github.com/komoot/photon#search-api>

use serde::Deserialize;

/// GeoJSON feature collection returned by `/api/`.
#[derive(Debug, Deserialize)]
pub struct SearchResponse {
    /// Matches ordered by relevance.
    #[serde(default)]
    pub features: Vec<Feature>,
}

/// A single search hit.
#[derive(Debug, Deserialize)]
pub struct Feature {
    /// Point geometry of the hit.
    pub geometry: Geometry,
}

/// GeoJSON geometry.
///
/// `coordinates` is `[longitude, latitude]` for points.
#[derive(Debug, Deserialize)]
pub struct Geometry {
    /// Position in GeoJSON axis order.
    pub coordinates: Vec<f64>,
}
