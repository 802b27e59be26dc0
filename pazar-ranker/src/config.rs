//! Tunable constants of the ranking model.
#![forbid(unsafe_code)]

use pazar_core::PENALTY_DISTANCE_KM;

use crate::RankingError;
use crate::category::CATEGORY_MATCH_THRESHOLD;

/// Penalties and weights applied when scoring a store.
///
/// # Examples
/// ```
/// use pazar_ranker::RankingConfig;
///
/// let config = RankingConfig {
///     cost_per_km: 1.0,
///     ..RankingConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankingConfig {
    /// Flat cost added for a term that matches no category.
    pub uncategorized_penalty: f64,
    /// Cost assumed for a category with no priced products anywhere.
    pub default_missing_cost: f64,
    /// Currency units charged per kilometre of travel.
    pub cost_per_km: f64,
    /// Distance assumed when either position is unknown.
    pub penalty_distance_km: f64,
    /// Minimum partial-match score for a term to resolve to a category.
    pub category_threshold: f64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            uncategorized_penalty: 3.0,
            default_missing_cost: 4.0,
            cost_per_km: 0.5,
            penalty_distance_km: PENALTY_DISTANCE_KM,
            category_threshold: CATEGORY_MATCH_THRESHOLD,
        }
    }
}

impl RankingConfig {
    /// Validate the settings and return a copy.
    ///
    /// # Errors
    /// Returns [`RankingError::InvalidConfig`] for the first setting that is
    /// negative, NaN or infinite.
    pub fn validate(self) -> Result<Self, RankingError> {
        let fields = [
            ("uncategorized_penalty", self.uncategorized_penalty),
            ("default_missing_cost", self.default_missing_cost),
            ("cost_per_km", self.cost_per_km),
            ("penalty_distance_km", self.penalty_distance_km),
            ("category_threshold", self.category_threshold),
        ];
        match fields
            .into_iter()
            .find(|(_, value)| !value.is_finite() || value.is_sign_negative())
        {
            Some((field, value)) => Err(RankingError::InvalidConfig { field, value }),
            None => Ok(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn defaults_are_valid() {
        let config = RankingConfig::default();
        assert_eq!(config.validate().ok(), Some(config));
        assert_eq!(config.penalty_distance_km, 999.0);
        assert_eq!(config.category_threshold, 70.0);
    }

    #[rstest]
    #[case(RankingConfig { cost_per_km: -0.5, ..RankingConfig::default() }, "cost_per_km")]
    #[case(RankingConfig { uncategorized_penalty: f64::NAN, ..RankingConfig::default() }, "uncategorized_penalty")]
    #[case(RankingConfig { penalty_distance_km: f64::INFINITY, ..RankingConfig::default() }, "penalty_distance_km")]
    fn rejects_unusable_settings(#[case] config: RankingConfig, #[case] expected: &str) {
        match config.validate() {
            Err(RankingError::InvalidConfig { field, .. }) => assert_eq!(field, expected),
            other => panic!("expected invalid config, got {other:?}"),
        }
    }
}
