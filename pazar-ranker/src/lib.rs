//! Shopping-list ranking for Pazar grocery stores.
//!
//! Given free-text shopping-list terms and the user's position, the crate
//! estimates what the list would cost at every store and orders the stores
//! cheapest first:
//! - **Category matching** maps each term to the closest fixed product
//!   category with a partial fuzzy match ([`CategoryMatcher`]). Terms that
//!   score below the threshold stay uncategorized.
//! - **Ranking** ([`RankingEngine`]) picks, per store and category, the
//!   product with the lowest unit price. Terms a store cannot satisfy cost
//!   either a flat penalty (uncategorized) or the category's market average
//!   across all stores. Travel is charged per kilometre of great-circle
//!   distance; unknown positions are charged a fixed penalty distance.
//!
//! All constants live in [`RankingConfig`].
//!
//! # Examples
//!
//! ```no_run
//! use pazar_core::SqliteRepository;
//! use pazar_ranker::RankingEngine;
//!
//! let repository = SqliteRepository::open("artifacts/pazar.db")?;
//! let ranking = RankingEngine::default().rank(
//!     &repository,
//!     &["хляб", "мляко", "масло", "захар"],
//!     "43.2047, 27.9100",
//! )?;
//! for entry in &ranking {
//!     println!("{} {}: {:.2}", entry.chain_name, entry.address, entry.internal_score);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]

mod category;
mod config;
mod engine;
mod entry;
mod error;

pub use category::{CATEGORY_MATCH_THRESHOLD, CategoryMatch, CategoryMatcher};
pub use config::RankingConfig;
pub use engine::RankingEngine;
pub use entry::{ChosenItem, RankingEntry, UNKNOWN_CHAIN};
pub use error::RankingError;
