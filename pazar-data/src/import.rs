//! Import feed rows as priced products.
//!
//! A file's chain is found by alias lookup on its name; each row's store is
//! then resolved by address among that chain's stores only. Rows that cannot
//! be placed or priced are counted and skipped, never raised. Persistence
//! failures fail the file they occurred in and leave other files untouched.

use std::error::Error as _;
use std::num::NonZeroUsize;
use std::thread;

use log::{debug, info, warn};
use pazar_core::{
    AddressResolver, Catalog, NewProduct, Repository, RepositoryError, parse_product,
};
use serde::Serialize;
use thiserror::Error;

use crate::feed::{FeedFile, FeedRow};

/// Errors that fail a whole feed file.
#[derive(Debug, Error)]
pub enum ImportError {
    /// Writing the file's products failed.
    #[error("failed to persist products from {file}")]
    Persist {
        /// Entry name of the feed file.
        file: String,
        /// Repository error.
        #[source]
        source: RepositoryError,
    },
    /// An import worker could not open its repository session.
    #[error("failed to open a repository session")]
    Session {
        /// Repository error.
        #[source]
        source: RepositoryError,
    },
}

/// Row counters for one imported file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FileImportReport {
    /// Chain the file was attributed to.
    pub chain: String,
    /// Rows read from the file.
    pub rows: u64,
    /// Products written.
    pub imported: u64,
    /// Rows whose address matched no store of the chain.
    pub unresolved_store: u64,
    /// Rows without a product description.
    pub empty_product: u64,
    /// Rows with neither a positive promotional nor retail price.
    pub invalid_price: u64,
    /// Rows whose category was not a known integer id; stored uncategorised.
    pub discarded_category: u64,
    /// Records the CSV reader could not decode.
    pub malformed: u64,
}

/// What happened to one feed file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileOutcome {
    /// Rows were processed and persisted.
    Imported(FileImportReport),
    /// No chain alias occurs in the file name.
    NoChain,
    /// The chain is known but has no stores to match against.
    NoStores {
        /// Chain name.
        chain: String,
    },
    /// Persistence failed; nothing from this file was kept.
    Failed {
        /// Error message including its causes.
        error: String,
    },
}

/// Outcome of one file, keyed by its entry name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSummary {
    /// Entry name inside the archive.
    pub file: String,
    /// Result for the file.
    #[serde(flatten)]
    pub outcome: FileOutcome,
}

/// Per-file outcomes of an import run, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// One entry per input file.
    pub files: Vec<FileSummary>,
}

impl ImportReport {
    /// Total products written across all files.
    #[must_use]
    pub fn imported_rows(&self) -> u64 {
        self.files
            .iter()
            .filter_map(|summary| match &summary.outcome {
                FileOutcome::Imported(report) => Some(report.imported),
                _ => None,
            })
            .sum()
    }

    /// Files whose import failed.
    pub fn failed(&self) -> impl Iterator<Item = &FileSummary> + '_ {
        self.files
            .iter()
            .filter(|summary| matches!(summary.outcome, FileOutcome::Failed { .. }))
    }
}

/// Parse a price field, accepting `,` as the decimal separator.
///
/// Only finite, strictly positive values are usable.
fn positive_price(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().replace(',', ".").parse().ok()?;
    (value.is_finite() && value > 0.0).then_some(value)
}

/// Choose the price of a row: promotional when positive, else retail when
/// positive.
///
/// # Examples
/// ```
/// use pazar_data::import::select_price;
///
/// assert_eq!(select_price("2,20", "2,49"), Some(2.2));
/// assert_eq!(select_price("", "2,49"), Some(2.49));
/// assert_eq!(select_price("0", "0.00"), None);
/// ```
#[must_use]
pub fn select_price(promo: &str, retail: &str) -> Option<f64> {
    positive_price(promo).or_else(|| positive_price(retail))
}

enum CategoryField {
    Absent,
    Known(u32),
    Discarded,
}

/// Imports feed files against a loaded [`Catalog`].
#[derive(Debug, Clone, Copy)]
pub struct FeedImporter<'c> {
    catalog: &'c Catalog,
}

impl<'c> FeedImporter<'c> {
    /// Create an importer over `catalog`.
    #[must_use]
    pub const fn new(catalog: &'c Catalog) -> Self {
        Self { catalog }
    }

    fn category(&self, raw: &str) -> CategoryField {
        let raw = raw.trim();
        if raw.is_empty() {
            return CategoryField::Absent;
        }
        if !raw.chars().all(|c| c.is_ascii_digit()) {
            return CategoryField::Discarded;
        }
        match raw.parse::<u32>() {
            Ok(id) if self.catalog.category(id).is_some() => CategoryField::Known(id),
            _ => CategoryField::Discarded,
        }
    }

    fn product_from_row(
        &self,
        resolver: &AddressResolver,
        row: &FeedRow,
        report: &mut FileImportReport,
    ) -> Option<NewProduct> {
        let Some(found) = resolver.resolve(&row.store_address) else {
            report.unresolved_store += 1;
            return None;
        };
        if row.product.is_empty() {
            report.empty_product += 1;
            return None;
        }
        let Some(price) = select_price(&row.promo_price, &row.retail_price) else {
            report.invalid_price += 1;
            return None;
        };
        let category_id = match self.category(&row.category) {
            CategoryField::Absent => None,
            CategoryField::Known(id) => Some(id),
            CategoryField::Discarded => {
                report.discarded_category += 1;
                None
            }
        };
        let parsed = parse_product(&row.product);
        match NewProduct::new(
            found.store_id,
            category_id,
            Some(parsed.unit),
            parsed.name,
            Some(parsed.quantity),
            price,
        ) {
            Ok(product) => Some(product),
            Err(err) => {
                debug!("dropping row '{}': {err}", row.product);
                report.invalid_price += 1;
                None
            }
        }
    }

    /// Import one file into `repository`.
    ///
    /// All of the file's products are written with a single
    /// [`Repository::insert_products`] call.
    ///
    /// # Errors
    /// Returns [`ImportError::Persist`] when the repository rejects the batch.
    pub fn import_file<R: Repository + ?Sized>(
        &self,
        repository: &mut R,
        file: &FeedFile,
    ) -> Result<FileOutcome, ImportError> {
        let Some(chain) = self.catalog.chain_for_filename(&file.name) else {
            debug!("skipping {}: no known chain in file name", file.name);
            return Ok(FileOutcome::NoChain);
        };
        let resolver = AddressResolver::new(
            self.catalog.stores_of(chain.id),
            self.catalog.aliases_of(chain.id),
        );
        if resolver.is_empty() {
            debug!("skipping {}: chain {} has no stores", file.name, chain.name);
            return Ok(FileOutcome::NoStores {
                chain: chain.name.clone(),
            });
        }

        let mut report = FileImportReport {
            chain: chain.name.clone(),
            malformed: file.malformed_rows,
            ..FileImportReport::default()
        };
        let mut products = Vec::new();
        for row in &file.rows {
            report.rows += 1;
            if let Some(product) = self.product_from_row(&resolver, row, &mut report) {
                products.push(product);
            }
        }

        let ids = repository
            .insert_products(&products)
            .map_err(|source| ImportError::Persist {
                file: file.name.clone(),
                source,
            })?;
        report.imported = ids.len() as u64;
        info!(
            "processed {} ({}): imported {} of {} rows, {} unresolved, {} unpriced",
            file.name,
            report.chain,
            report.imported,
            report.rows,
            report.unresolved_store,
            report.invalid_price
        );
        Ok(FileOutcome::Imported(report))
    }

    fn summarise<R: Repository + ?Sized>(&self, repository: &mut R, file: &FeedFile) -> FileSummary {
        let outcome = self
            .import_file(repository, file)
            .unwrap_or_else(|err| failed(&err));
        FileSummary {
            file: file.name.clone(),
            outcome,
        }
    }

    /// Import `files` one after another through a single session.
    pub fn import_files<R: Repository + ?Sized>(
        &self,
        repository: &mut R,
        files: &[FeedFile],
    ) -> ImportReport {
        ImportReport {
            files: files
                .iter()
                .map(|file| self.summarise(repository, file))
                .collect(),
        }
    }

    /// Import `files` on up to `workers` scoped threads.
    ///
    /// Every worker opens its own repository session with `open_session` and
    /// processes a disjoint subset of the files sequentially. The report
    /// lists files in input order.
    pub fn import_parallel<F, R>(
        &self,
        files: &[FeedFile],
        workers: NonZeroUsize,
        open_session: F,
    ) -> ImportReport
    where
        F: Fn() -> Result<R, RepositoryError> + Sync,
        R: Repository,
    {
        if files.is_empty() {
            return ImportReport::default();
        }
        let stride = workers.get().min(files.len());
        let open_session = &open_session;
        let mut indexed: Vec<(usize, FileSummary)> = thread::scope(|scope| {
            let handles: Vec<_> = (0..stride)
                .map(|worker| {
                    scope.spawn(move || self.run_worker(files, worker, stride, open_session))
                })
                .collect();
            handles
                .into_iter()
                .flat_map(|handle| {
                    handle.join().unwrap_or_else(|_| {
                        warn!("import worker panicked; its files are missing from the report");
                        Vec::new()
                    })
                })
                .collect()
        });
        indexed.sort_by_key(|(index, _)| *index);
        ImportReport {
            files: indexed.into_iter().map(|(_, summary)| summary).collect(),
        }
    }

    fn run_worker<F, R>(
        &self,
        files: &[FeedFile],
        worker: usize,
        stride: usize,
        open_session: &F,
    ) -> Vec<(usize, FileSummary)>
    where
        F: Fn() -> Result<R, RepositoryError>,
        R: Repository,
    {
        let assigned = files.iter().enumerate().skip(worker).step_by(stride);
        match open_session() {
            Ok(mut repository) => assigned
                .map(|(index, file)| (index, self.summarise(&mut repository, file)))
                .collect(),
            Err(source) => {
                let outcome = failed(&ImportError::Session { source });
                assigned
                    .map(|(index, file)| {
                        (
                            index,
                            FileSummary {
                                file: file.name.clone(),
                                outcome: outcome.clone(),
                            },
                        )
                    })
                    .collect()
            }
        }
    }
}

fn failed(err: &ImportError) -> FileOutcome {
    let mut message = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        cause = inner.source();
    }
    warn!("{message}");
    FileOutcome::Failed { error: message }
}
