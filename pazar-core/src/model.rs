//! Reference records and priced observations.
//!
//! Categories, chains, chain aliases, units and stores are seed data: they are
//! created once and read thereafter. [`Product`] rows are appended by feed
//! ingestion and read by ranking; nothing in this crate updates or deletes
//! them.

use geo::Coord;
use thiserror::Error;

/// One entry of the fixed product taxonomy.
///
/// Identifiers are assigned externally and stay stable across imports.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Category {
    /// Externally assigned identifier.
    pub id: u32,
    /// Display name, e.g. `"Бяла захар 1 кг"`.
    pub name: String,
}

/// A retail brand.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Chain {
    /// Repository identifier.
    pub id: u32,
    /// Canonical brand name, e.g. `"Kaufland"`.
    pub name: String,
}

/// Alternative spelling used to recognise a chain in filenames.
///
/// Aliases map many-to-one onto chains and are compared case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChainAlias {
    /// Spelling or transliteration of the chain name.
    pub alias: String,
    /// Chain the alias resolves to.
    pub chain_id: u32,
}

/// A physical shop belonging to a chain.
///
/// `location` follows the `geo` convention: `x = longitude`, `y = latitude`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Store {
    /// Repository identifier.
    pub id: u32,
    /// Owning chain, when known.
    pub chain_id: Option<u32>,
    /// Free-text street address.
    pub address: String,
    /// Town or city label.
    pub populated_area: Option<String>,
    /// Geographic position, when known.
    pub location: Option<Coord<f64>>,
}

/// Canonical measurement unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Unit {
    /// Mass in kilograms.
    Kilogram,
    /// Volume in litres.
    Litre,
    /// Item count.
    Item,
}

impl Unit {
    /// All canonical units in repository order.
    pub const ALL: [Self; 3] = [Self::Kilogram, Self::Litre, Self::Item];

    /// Return the persisted symbol for the unit.
    ///
    /// # Examples
    /// ```
    /// use pazar_core::Unit;
    ///
    /// assert_eq!(Unit::Kilogram.symbol(), "KG");
    /// assert_eq!(Unit::Item.symbol(), "бр");
    /// ```
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Kilogram => "KG",
            Self::Litre => "L",
            Self::Item => "бр",
        }
    }
}

impl std::fmt::Display for Unit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.symbol())
    }
}

impl std::str::FromStr for Unit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "KG" => Ok(Self::Kilogram),
            "L" => Ok(Self::Litre),
            "БР" => Ok(Self::Item),
            _ => Err(format!("unknown unit '{s}'")),
        }
    }
}

/// A persisted unit row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnitRecord {
    /// Repository identifier.
    pub id: u32,
    /// Unit the row represents.
    pub unit: Unit,
}

/// Errors returned by [`NewProduct::new`].
#[derive(Debug, Error, PartialEq)]
pub enum ProductError {
    /// The price was negative, NaN or infinite.
    #[error("price {price} must be a finite, non-negative amount")]
    InvalidPrice {
        /// Rejected price.
        price: f64,
    },
    /// The quantity was not a finite positive number.
    #[error("quantity {quantity} must be finite and positive")]
    InvalidQuantity {
        /// Rejected quantity.
        quantity: f64,
    },
}

/// A priced observation waiting to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    /// Store that offered the product.
    pub store_id: u32,
    /// Taxonomy category, when the feed supplied a usable one.
    pub category_id: Option<u32>,
    /// Canonical unit of `quantity`.
    pub unit: Option<Unit>,
    /// Cleaned product name.
    pub name: String,
    /// Amount in `unit`; `None` means a count of one.
    pub quantity: Option<f64>,
    /// Price in currency units.
    pub price: f64,
}

impl NewProduct {
    /// Validate and construct a [`NewProduct`].
    ///
    /// # Errors
    /// Returns [`ProductError`] when the price is negative or not finite, or
    /// when a quantity is supplied that is not finite and positive.
    ///
    /// # Examples
    /// ```
    /// use pazar_core::{NewProduct, Unit};
    ///
    /// let product = NewProduct::new(1, Some(38), Some(Unit::Kilogram), "Захар", Some(1.0), 2.2)?;
    /// assert_eq!(product.name, "Захар");
    /// assert!(NewProduct::new(1, None, None, "Захар", None, -1.0).is_err());
    /// # Ok::<(), pazar_core::ProductError>(())
    /// ```
    pub fn new(
        store_id: u32,
        category_id: Option<u32>,
        unit: Option<Unit>,
        name: impl Into<String>,
        quantity: Option<f64>,
        price: f64,
    ) -> Result<Self, ProductError> {
        if !price.is_finite() || price < 0.0 {
            return Err(ProductError::InvalidPrice { price });
        }
        if let Some(amount) = quantity
            && (!amount.is_finite() || amount <= 0.0)
        {
            return Err(ProductError::InvalidQuantity { quantity: amount });
        }
        Ok(Self {
            store_id,
            category_id,
            unit,
            name: name.into(),
            quantity,
            price,
        })
    }

    /// Attach a repository identifier, producing the persisted form.
    #[must_use]
    pub fn with_id(self, id: u64) -> Product {
        Product {
            id,
            store_id: self.store_id,
            category_id: self.category_id,
            unit: self.unit,
            name: self.name,
            quantity: self.quantity,
            price: self.price,
        }
    }
}

/// A persisted price record.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Product {
    /// Repository identifier.
    pub id: u64,
    /// Store that offered the product.
    pub store_id: u32,
    /// Taxonomy category, if classified.
    pub category_id: Option<u32>,
    /// Canonical unit of `quantity`.
    pub unit: Option<Unit>,
    /// Cleaned product name.
    pub name: String,
    /// Amount in `unit`; `None` means a count of one.
    pub quantity: Option<f64>,
    /// Price in currency units.
    pub price: f64,
}

impl Product {
    /// Price used when comparing products of one category.
    ///
    /// Returns price per unit when a positive quantity is known and the raw
    /// price otherwise.
    ///
    /// # Examples
    /// ```
    /// use pazar_core::{NewProduct, Unit};
    ///
    /// let bread = NewProduct::new(1, Some(1), Some(Unit::Kilogram), "Хляб", Some(0.5), 1.2)?
    ///     .with_id(1);
    /// assert!((bread.comparable_price() - 2.4).abs() < 1e-9);
    /// # Ok::<(), pazar_core::ProductError>(())
    /// ```
    #[must_use]
    pub fn comparable_price(&self) -> f64 {
        match self.quantity {
            Some(quantity) if quantity > 0.0 => self.price / quantity,
            _ => self.price,
        }
    }
}
