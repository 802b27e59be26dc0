//! Extract quantity and unit from free-text product descriptions.
//!
//! Feed descriptions embed sizes anywhere in the text with Cyrillic or Latin
//! unit abbreviations: `"300/500ГР сирене"`, `"2x500Г кренвирши"`,
//! `"Олио 1,5Л"`. [`parse_product`] recognises three shapes, tried in order,
//! and the first that matches wins:
//!
//! 1. a range `A/B<unit>`, whose quantity is the mean of `A` and `B`;
//! 2. a multipack `N x V<unit>`, whose quantity is `N × V`;
//! 3. a plain size `V<unit>`.
//!
//! Grams and millilitres are scaled to kilograms and litres, results are
//! rounded to three decimals, and anything at or below one thousandth is
//! treated as a placeholder and replaced by a count of one.

use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::Unit;

/// Quantities at or below this value are parsing artefacts.
pub const DEGENERATE_QUANTITY: f64 = 0.001;

const UNIT_TOKEN: &str = r"(КГ|ГР|Г|МЛ|Л|БР|KG|GR|G|ML|L|MЛ|КG|KГ|M)";

/// Result of normalising a product description.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedProduct {
    /// Description with the matched size removed.
    pub name: String,
    /// Positive amount expressed in `unit`.
    pub quantity: f64,
    /// Canonical unit of `quantity`.
    pub unit: Unit,
}

impl ParsedProduct {
    fn single_item(name: String) -> Self {
        Self {
            name,
            quantity: 1.0,
            unit: Unit::Item,
        }
    }
}

struct SizePatterns {
    range: Regex,
    multipack: Regex,
    standard: Regex,
    edge_punctuation: Regex,
}

#[allow(
    clippy::expect_used,
    reason = "patterns are compile-time constants covered by unit tests"
)]
static PATTERNS: LazyLock<SizePatterns> = LazyLock::new(|| SizePatterns {
    range: Regex::new(&format!(r"(?i)([0-9]+)/([0-9]+)\s*{UNIT_TOKEN}"))
        .expect("range pattern compiles"),
    multipack: Regex::new(&format!(
        r"(?i)([0-9]+)\s*[xхXХ]\s*([0-9]+[.,]?[0-9]*)\s*{UNIT_TOKEN}"
    ))
    .expect("multipack pattern compiles"),
    standard: Regex::new(&format!(r"(?i)([0-9]+[.,]?[0-9]*)\s*{UNIT_TOKEN}\b"))
        .expect("standard pattern compiles"),
    edge_punctuation: Regex::new(r"^[\s.\-,]+|[\s.\-,]+$").expect("edge pattern compiles"),
});

/// Scale factor and canonical unit for a recognised unit token.
fn conversion(token: &str) -> Option<(Unit, f64)> {
    let conversion = match token.to_uppercase().as_str() {
        "Г" | "ГР" | "G" | "GR" => (Unit::Kilogram, 0.001),
        "КГ" | "KG" | "КG" | "KГ" => (Unit::Kilogram, 1.0),
        "МЛ" | "ML" | "MЛ" | "M" => (Unit::Litre, 0.001),
        "Л" | "L" => (Unit::Litre, 1.0),
        "БР" => (Unit::Item, 1.0),
        _ => return None,
    };
    Some(conversion)
}

fn parse_amount(raw: &str) -> Option<f64> {
    raw.replace(',', ".")
        .parse::<f64>()
        .ok()
        .filter(|amount| amount.is_finite())
}

/// A size expression found in the description.
struct SizeMatch<'a> {
    text: &'a str,
    quantity: f64,
    token: &'a str,
}

impl<'a> SizeMatch<'a> {
    fn range(caps: &Captures<'a>) -> Option<Self> {
        let low = parse_amount(caps.get(1)?.as_str())?;
        let high = parse_amount(caps.get(2)?.as_str())?;
        Some(Self {
            text: caps.get(0)?.as_str(),
            quantity: f64::midpoint(low, high),
            token: caps.get(3)?.as_str(),
        })
    }

    fn multipack(caps: &Captures<'a>) -> Option<Self> {
        let count = parse_amount(caps.get(1)?.as_str())?;
        let each = parse_amount(caps.get(2)?.as_str())?;
        Some(Self {
            text: caps.get(0)?.as_str(),
            quantity: count * each,
            token: caps.get(3)?.as_str(),
        })
    }

    fn standard(caps: &Captures<'a>) -> Option<Self> {
        Some(Self {
            text: caps.get(0)?.as_str(),
            quantity: parse_amount(caps.get(1)?.as_str())?,
            token: caps.get(2)?.as_str(),
        })
    }
}

fn find_size(text: &str) -> Option<SizeMatch<'_>> {
    let patterns = &*PATTERNS;
    if let Some(caps) = patterns.range.captures(text) {
        return SizeMatch::range(&caps);
    }
    if let Some(caps) = patterns.multipack.captures(text) {
        return SizeMatch::multipack(&caps);
    }
    patterns
        .standard
        .captures(text)
        .and_then(|caps| SizeMatch::standard(&caps))
}

/// Round to three decimal places.
fn round_milli(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

/// Split a raw description into a clean name, quantity and canonical unit.
///
/// Tilde markers are removed before matching. When no size expression is
/// found, or its amount does not fit a finite number, the trimmed
/// description is returned with a count of one.
///
/// # Examples
/// ```
/// use pazar_core::{Unit, parse_product};
///
/// let cheese = parse_product("300/500ГР сирене");
/// assert_eq!(cheese.name, "сирене");
/// assert_eq!(cheese.quantity, 0.4);
/// assert_eq!(cheese.unit, Unit::Kilogram);
///
/// let loose = parse_product("Банани");
/// assert_eq!((loose.quantity, loose.unit), (1.0, Unit::Item));
/// ```
#[must_use]
pub fn parse_product(raw: &str) -> ParsedProduct {
    let text = raw.replace('~', "");
    let text = text.trim();
    let Some(size) = find_size(text).filter(|size| size.quantity.is_finite()) else {
        return ParsedProduct::single_item(text.to_owned());
    };

    let (mut unit, scale) = conversion(size.token).unwrap_or((Unit::Item, 1.0));
    let mut quantity = round_milli(size.quantity * scale);
    if quantity <= DEGENERATE_QUANTITY {
        quantity = 1.0;
        unit = Unit::Item;
    }

    let without_size = text.replace(size.text, "");
    let name = PATTERNS
        .edge_punctuation
        .replace_all(without_size.trim(), "")
        .into_owned();

    ParsedProduct {
        name,
        quantity,
        unit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("300/500ГР сирене", "сирене", 0.4, Unit::Kilogram)]
    #[case("2x500Г кренвирши", "кренвирши", 1.0, Unit::Kilogram)]
    #[case("Кока кола 2 х 1,5Л", "Кока кола", 3.0, Unit::Litre)]
    #[case("Мляко прясно 3% 1Л", "Мляко прясно 3%", 1.0, Unit::Litre)]
    #[case("Олио 1,5Л", "Олио", 1.5, Unit::Litre)]
    #[case("Бира 500мл", "Бира", 0.5, Unit::Litre)]
    #[case("Сок 360M", "Сок", 0.36, Unit::Litre)]
    #[case("Cheese 250g", "Cheese", 0.25, Unit::Kilogram)]
    #[case("Яйца 10БР", "Яйца", 10.0, Unit::Item)]
    #[case("Захар 1 кг.", "Захар", 1.0, Unit::Kilogram)]
    fn extracts_size_from_description(
        #[case] raw: &str,
        #[case] name: &str,
        #[case] quantity: f64,
        #[case] unit: Unit,
    ) {
        let parsed = parse_product(raw);
        assert_eq!(parsed.name, name);
        assert!(
            (parsed.quantity - quantity).abs() < 1e-9,
            "expected {quantity}, got {}",
            parsed.quantity
        );
        assert_eq!(parsed.unit, unit);
    }

    #[rstest]
    fn range_wins_over_later_patterns() {
        let parsed = parse_product("Кашкавал 200/400Г 2x100Г");
        assert!((parsed.quantity - 0.3).abs() < 1e-9);
        assert_eq!(parsed.name, "Кашкавал  2x100Г");
    }

    #[rstest]
    #[case("1Г дъвка")]
    #[case("0,5МЛ капки")]
    #[case("0G проба")]
    fn degenerate_quantities_become_single_items(#[case] raw: &str) {
        let parsed = parse_product(raw);
        assert_eq!(parsed.quantity, 1.0);
        assert_eq!(parsed.unit, Unit::Item);
    }

    #[rstest]
    #[case("  Банани насипни ", "Банани насипни")]
    #[case("~Хляб Добруджа~", "Хляб Добруджа")]
    fn descriptions_without_size_are_single_items(#[case] raw: &str, #[case] name: &str) {
        let parsed = parse_product(raw);
        assert_eq!(parsed, ParsedProduct::single_item(name.to_owned()));
    }

    #[rstest]
    #[case("Захар {digits}КГ")]
    #[case("Вода {digits}x2Л")]
    fn oversized_amounts_become_single_items(#[case] template: &str) {
        let raw = template.replace("{digits}", &"9".repeat(400));
        let parsed = parse_product(&raw);
        assert_eq!(parsed, ParsedProduct::single_item(raw));
        assert!(parsed.quantity.is_finite());
    }

    #[rstest]
    fn strips_edge_punctuation_left_by_size() {
        let parsed = parse_product("- 400ГР - Кроасани, ");
        assert_eq!(parsed.name, "Кроасани");
    }

    #[rstest]
    fn rounds_to_three_decimals() {
        let parsed = parse_product("Подправка 12,3456Г");
        assert_eq!(parsed.quantity, 0.012);
    }

    #[rstest]
    fn is_deterministic() {
        let raw = "3x90Г бисквити";
        assert_eq!(parse_product(raw), parse_product(raw));
    }
}
