//! Test helpers for building seed files, feed archives and scratch
//! databases.

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

use crate::import::ImportConfig;
use crate::rank::{Position, RankConfig};
use crate::seed::SeedConfig;
use pazar_data::geocoding::DEFAULT_BASE_URL;
use pazar_ranker::RankingConfig;

const FEED_HEADER: &str = "Населено място,Търговски обект,Наименование на продукта,\
                           Код на продукта,Категория,Цена на дребно,Цена в промоция";

/// A scratch directory holding a database path and input files.
pub(super) struct Workspace {
    _dir: TempDir,
    root: Utf8PathBuf,
}

impl Workspace {
    pub(super) fn new() -> Self {
        let dir = TempDir::new().expect("tempdir");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("utf-8 workspace");
        Self { _dir: dir, root }
    }

    pub(super) fn path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    pub(super) fn database(&self) -> Utf8PathBuf {
        self.root.join("data").join("pazar.db")
    }

    pub(super) fn seed_config(&self) -> SeedConfig {
        SeedConfig {
            database: self.database(),
            seed: shipped_seed(),
            geocode: false,
            geocoder_url: DEFAULT_BASE_URL.to_owned(),
        }
    }

    pub(super) fn import_config(&self, archive: Utf8PathBuf) -> ImportConfig {
        ImportConfig {
            database: self.database(),
            archive,
            workers: std::num::NonZeroUsize::new(2).expect("non-zero"),
        }
    }

    pub(super) fn rank_config(&self, terms: &[&str]) -> RankConfig {
        RankConfig {
            database: self.database(),
            position: Position::Coordinates(crate::rank::DEFAULT_POSITION.to_owned()),
            geocoder_url: DEFAULT_BASE_URL.to_owned(),
            ranking: RankingConfig::default(),
            terms: terms.iter().map(|term| (*term).to_owned()).collect(),
        }
    }
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace").field("root", &self.root).finish()
    }
}

/// The Varna seed shipped with the repository.
pub(super) fn shipped_seed() -> Utf8PathBuf {
    Utf8PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../seeds/varna.json")
}

pub(super) fn write_utf8(path: &Utf8Path, contents: &[u8]) {
    std::fs::write(path.as_std_path(), contents).expect("write file");
}

/// Write a feed archive with one Kaufland file, one Lidl file and one file
/// naming no known chain.
pub(super) fn write_feed_archive(path: &Utf8Path) {
    let kaufland = format!(
        "{FEED_HEADER}\n\
         Варна,Kaufland 4 ул. Девня 24,Захар 1КГ,1001,38,\"2,49\",\"2,20\"\n\
         Варна,Kaufland 7 бул. Република 60,Прясно мляко 3% 1Л,1002,6,\"2,10\",\n\
         Варна,Kaufland 9 бул. Сливница 185,Сол 1КГ,1003,39,\"0,89\",\n"
    );
    let lidl = format!("{FEED_HEADER}\nВарна,Lidl ул. Мир 45,Хляб 500г,77,1,\"1,20\",\n");
    let other = format!("{FEED_HEADER}\nВарна,ул. Подвис 25,Хляб 500г,5,1,\"1,10\",\n");

    let file = std::fs::File::create(path.as_std_path()).expect("create archive");
    let mut zip = ZipWriter::new(file);
    for (name, body) in [
        ("Kaufland_Varna.csv", kaufland),
        ("Lidl.csv", lidl),
        ("unknown_shop.csv", other),
    ] {
        zip.start_file(name, SimpleFileOptions::default())
            .expect("start entry");
        zip.write_all(body.as_bytes()).expect("write entry");
    }
    zip.finish().expect("finish archive");
}
