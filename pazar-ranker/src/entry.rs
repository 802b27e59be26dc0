//! Ranking output records.
#![forbid(unsafe_code)]

use serde::Serialize;

/// Chain name reported for stores that belong to no known chain.
pub const UNKNOWN_CHAIN: &str = "Unknown";

/// A product picked to satisfy one shopping-list term.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChosenItem {
    /// The shopping-list term as the user wrote it.
    pub requested_as: String,
    /// Normalised product name.
    pub name: String,
    /// Shelf price rounded to two decimals.
    pub price: f64,
}

/// One store's standing for a shopping list.
///
/// Monetary amounts and the distance are rounded to two decimals;
/// `internal_score` keeps full precision and defines the order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingEntry {
    /// Identifier of the ranked store.
    pub store_id: u32,
    /// Owning chain, or [`UNKNOWN_CHAIN`].
    pub chain_name: String,
    /// Store address as seeded.
    pub address: String,
    /// Store position as `"lat, lon"`, when known.
    pub coords: Option<String>,
    /// Products chosen for the terms the store can satisfy.
    pub chosen_items: Vec<ChosenItem>,
    /// Terms the store cannot satisfy, in request order.
    pub missing_items: Vec<String>,
    /// Sum of the chosen items' prices.
    pub real_price: f64,
    /// Great-circle distance from the user, or the penalty distance.
    pub distance_km: f64,
    /// Number of entries in `missing_items`.
    pub missing_count: usize,
    /// Basket price plus penalties plus travel cost.
    pub internal_score: f64,
}

#[expect(
    clippy::float_arithmetic,
    reason = "rounding money and distances to cents requires scaling"
)]
pub(crate) fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
#[expect(clippy::expect_used, reason = "tests should fail fast")]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(1.005_f64, 1.0)]
    #[case(3.499_999, 3.5)]
    #[case(0.555_975, 0.56)]
    #[case(999.0, 999.0)]
    fn rounds_to_cents(#[case] value: f64, #[case] expected: f64) {
        assert_eq!(round_cents(value), expected);
    }

    #[rstest]
    fn serialises_output_fields() {
        let entry = RankingEntry {
            store_id: 3,
            chain_name: UNKNOWN_CHAIN.to_owned(),
            address: "ул. „Мир“ 45".to_owned(),
            coords: None,
            chosen_items: vec![ChosenItem {
                requested_as: "хляб".to_owned(),
                name: "Хляб".to_owned(),
                price: 1.2,
            }],
            missing_items: vec!["кафе".to_owned()],
            real_price: 1.2,
            distance_km: 999.0,
            missing_count: 1,
            internal_score: 503.7,
        };
        let json = serde_json::to_value(&entry).expect("serialise entry");
        assert_eq!(json["chain_name"], "Unknown");
        assert!(json["coords"].is_null());
        assert_eq!(json["chosen_items"][0]["requested_as"], "хляб");
        assert_eq!(json["missing_count"], 1);
        assert_eq!(json["internal_score"], 503.7);
    }
}
