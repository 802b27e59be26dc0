//! Reading price feeds from zip archives of CSV files.
//!
//! Each archive entry is one retailer's price list. Column headers are
//! Bulgarian; only the six columns the importer needs are kept, and a
//! missing column reads as an empty string.

use std::io::{Read, Seek};

use camino::{Utf8Path, Utf8PathBuf};
use csv::{ReaderBuilder, StringRecord};
use log::{debug, warn};
use thiserror::Error;
use zip::ZipArchive;

/// Header of the store address column.
pub const STORE_COLUMN: &str = "Търговски обект";
/// Header of the populated-area column.
pub const AREA_COLUMN: &str = "Населено място";
/// Header of the product description column.
pub const PRODUCT_COLUMN: &str = "Наименование на продукта";
/// Header of the category identifier column.
pub const CATEGORY_COLUMN: &str = "Категория";
/// Header of the retail price column.
pub const RETAIL_PRICE_COLUMN: &str = "Цена на дребно";
/// Header of the promotional price column.
pub const PROMO_PRICE_COLUMN: &str = "Цена в промоция";

/// Errors returned while reading a feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The archive file could not be opened.
    #[error("failed to open feed archive at {path}")]
    Open {
        /// Location of the archive.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The archive is not a readable zip file.
    #[error("failed to read zip archive")]
    Archive {
        /// Underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },
    /// The header row of a CSV entry could not be read.
    #[error("failed to read header of {file}")]
    Header {
        /// Entry name.
        file: String,
        /// Underlying CSV error.
        #[source]
        source: csv::Error,
    },
}

/// One row of a price feed, reduced to the columns the importer uses.
///
/// Values are trimmed; absent columns are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedRow {
    /// Free-text store address.
    pub store_address: String,
    /// Town or village of the store.
    pub populated_area: String,
    /// Raw product description.
    pub product: String,
    /// Category identifier as written in the feed.
    pub category: String,
    /// Regular shelf price.
    pub retail_price: String,
    /// Promotional price, often empty.
    pub promo_price: String,
}

/// A parsed CSV entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedFile {
    /// Entry name inside the archive.
    pub name: String,
    /// Rows in file order.
    pub rows: Vec<FeedRow>,
    /// Records dropped because they could not be decoded.
    pub malformed_rows: u64,
}

#[derive(Debug, Default)]
struct ColumnIndex {
    store_address: Option<usize>,
    populated_area: Option<usize>,
    product: Option<usize>,
    category: Option<usize>,
    retail_price: Option<usize>,
    promo_price: Option<usize>,
}

impl ColumnIndex {
    fn from_headers(headers: &StringRecord) -> Self {
        let mut index = Self::default();
        for (position, header) in headers.iter().enumerate() {
            let slot = match header.trim_start_matches('\u{feff}').trim() {
                STORE_COLUMN => &mut index.store_address,
                AREA_COLUMN => &mut index.populated_area,
                PRODUCT_COLUMN => &mut index.product,
                CATEGORY_COLUMN => &mut index.category,
                RETAIL_PRICE_COLUMN => &mut index.retail_price,
                PROMO_PRICE_COLUMN => &mut index.promo_price,
                _ => continue,
            };
            slot.get_or_insert(position);
        }
        index
    }

    fn row(&self, record: &StringRecord) -> FeedRow {
        let field = |position: Option<usize>| {
            position
                .and_then(|p| record.get(p))
                .map(str::trim)
                .unwrap_or_default()
                .to_owned()
        };
        FeedRow {
            store_address: field(self.store_address),
            populated_area: field(self.populated_area),
            product: field(self.product),
            category: field(self.category),
            retail_price: field(self.retail_price),
            promo_price: field(self.promo_price),
        }
    }
}

/// Parse one delimited file with a header row.
///
/// Records that fail to decode (for example invalid UTF-8) are skipped and
/// counted in [`FeedFile::malformed_rows`].
///
/// # Errors
/// Returns [`FeedError::Header`] when the header row cannot be read.
///
/// # Examples
/// ```
/// use pazar_data::read_feed_csv;
///
/// let csv = "Търговски обект,Наименование на продукта,Цена на дребно\n\
///            ул. Девня 24,Захар 1кг,\"2,20\"\n";
/// let file = read_feed_csv("kaufland.csv", csv.as_bytes())?;
/// assert_eq!(file.rows[0].retail_price, "2,20");
/// assert_eq!(file.rows[0].promo_price, "");
/// # Ok::<(), pazar_data::FeedError>(())
/// ```
pub fn read_feed_csv<R: Read>(name: &str, reader: R) -> Result<FeedFile, FeedError> {
    let mut csv = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = csv.headers().map_err(|source| FeedError::Header {
        file: name.to_owned(),
        source,
    })?;
    let columns = ColumnIndex::from_headers(headers);
    let mut file = FeedFile {
        name: name.to_owned(),
        ..FeedFile::default()
    };
    for record in csv.records() {
        match record {
            Ok(record) => file.rows.push(columns.row(&record)),
            Err(err) => {
                warn!("skipping malformed record in {name}: {err}");
                file.malformed_rows += 1;
            }
        }
    }
    Ok(file)
}

/// Read every `.csv` entry of a zip archive held in `reader`.
///
/// Other entries and directories are ignored. An entry whose header cannot
/// be read is logged and skipped so the remaining files still load.
///
/// # Errors
/// Returns [`FeedError::Archive`] when the archive itself is unreadable.
pub fn read_feed_zip<R: Read + Seek>(reader: R) -> Result<Vec<FeedFile>, FeedError> {
    let mut archive = ZipArchive::new(reader).map_err(|source| FeedError::Archive { source })?;
    let mut files = Vec::new();
    for i in 0..archive.len() {
        let entry = archive
            .by_index(i)
            .map_err(|source| FeedError::Archive { source })?;
        let name = entry.name().to_owned();
        if entry.is_dir() || !name.to_lowercase().ends_with(".csv") {
            debug!("skipping non-CSV entry {name}");
            continue;
        }
        match read_feed_csv(&name, entry) {
            Ok(file) => files.push(file),
            Err(err) => warn!("skipping unreadable entry: {err}"),
        }
    }
    Ok(files)
}

/// Open the zip archive at `path` and read its CSV entries.
///
/// # Errors
/// Returns [`FeedError::Open`] when the file cannot be opened and
/// [`FeedError::Archive`] when it is not a valid archive.
pub fn read_feed_archive(path: &Utf8Path) -> Result<Vec<FeedFile>, FeedError> {
    let file = pazar_fs::open_utf8_file(path).map_err(|source| FeedError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    read_feed_zip(file.into_std())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};

    use rstest::{fixture, rstest};
    use zip::ZipWriter;
    use zip::write::SimpleFileOptions;

    const HEADER: &str = "Населено място,Търговски обект,Наименование на продукта,\
                          Код на продукта,Категория,Цена на дребно,Цена в промоция";

    fn archive(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut buffer = Vec::new();
        {
            let mut zip = ZipWriter::new(Cursor::new(&mut buffer));
            for (name, body) in entries {
                zip.start_file(*name, SimpleFileOptions::default())
                    .expect("start entry");
                zip.write_all(body.as_bytes()).expect("write entry");
            }
            zip.finish().expect("finish archive");
        }
        buffer
    }

    #[fixture]
    fn kaufland_csv() -> String {
        format!(
            "\u{feff}{HEADER}\n\
             Варна,Kaufland 4 ул. Девня 24,Захар 1КГ,123,38,\"2,49\",\"2,20\"\n\
             Варна,Kaufland 4 ул. Девня 24,Масло 125Г,124,12,3.10,\n"
        )
    }

    #[rstest]
    fn reads_named_columns_and_strips_bom(kaufland_csv: String) {
        let file = read_feed_csv("kaufland.csv", kaufland_csv.as_bytes()).expect("read csv");
        assert_eq!(file.rows.len(), 2);
        let first = &file.rows[0];
        assert_eq!(first.populated_area, "Варна");
        assert_eq!(first.store_address, "Kaufland 4 ул. Девня 24");
        assert_eq!(first.product, "Захар 1КГ");
        assert_eq!(first.category, "38");
        assert_eq!(first.retail_price, "2,49");
        assert_eq!(first.promo_price, "2,20");
        assert_eq!(file.rows[1].promo_price, "");
    }

    #[rstest]
    fn missing_columns_read_as_empty() {
        let file = read_feed_csv("lidl.csv", "Наименование на продукта\nХляб 500г\n".as_bytes())
            .expect("read csv");
        assert_eq!(
            file.rows,
            vec![FeedRow {
                product: "Хляб 500г".to_owned(),
                ..FeedRow::default()
            }]
        );
    }

    #[rstest]
    fn archive_yields_only_csv_entries(kaufland_csv: String) {
        let bytes = archive(&[
            ("2026-01-04/KAUFLAND.csv", kaufland_csv.as_str()),
            ("readme.txt", "not a feed"),
            ("lidl.CSV", HEADER),
        ]);
        let files = read_feed_zip(Cursor::new(bytes)).expect("read archive");
        let names: Vec<&str> = files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["2026-01-04/KAUFLAND.csv", "lidl.CSV"]);
        assert_eq!(files[0].rows.len(), 2);
        assert!(files[1].rows.is_empty());
    }

    #[rstest]
    fn archive_on_disk_round_trips(kaufland_csv: String) {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = Utf8PathBuf::from_path_buf(dir.path().join("feed.zip")).expect("utf-8 path");
        std::fs::write(&path, archive(&[("kaufland.csv", kaufland_csv.as_str())])).expect("write zip");
        let files = read_feed_archive(&path).expect("read archive");
        assert_eq!(files.len(), 1);
    }

    #[rstest]
    fn missing_archive_reports_path() {
        let path = Utf8Path::new("/definitely/not/here.zip");
        let err = read_feed_archive(path).expect_err("missing archive");
        assert!(matches!(err, FeedError::Open { path: p, .. } if p.as_path() == path));
    }

    #[rstest]
    fn garbage_is_not_an_archive() {
        let err = read_feed_zip(Cursor::new(b"plain text".to_vec())).expect_err("not a zip");
        assert!(matches!(err, FeedError::Archive { .. }));
    }
}
