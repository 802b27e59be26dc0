//! SQLite-backed repository for reference data and price observations.

use std::{collections::HashMap, fmt, path::Path, str::FromStr, time::Duration};

use geo::Coord;
use rusqlite::{Connection, OptionalExtension, Row, params};

use crate::{Category, Chain, ChainAlias, NewProduct, Product, Store, Unit, UnitRecord};

use super::{ProductFilter, Repository, RepositoryError};

/// How long a connection waits for another writer before failing.
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(30);

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS categories (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS chains (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS chain_aliases (
    id INTEGER PRIMARY KEY,
    alias TEXT NOT NULL UNIQUE,
    chain_id INTEGER NOT NULL REFERENCES chains(id)
);
CREATE TABLE IF NOT EXISTS units (
    id INTEGER PRIMARY KEY,
    symbol TEXT NOT NULL UNIQUE
);
CREATE TABLE IF NOT EXISTS stores (
    id INTEGER PRIMARY KEY,
    chain_id INTEGER REFERENCES chains(id),
    address TEXT NOT NULL,
    populated_area TEXT,
    lat REAL,
    lon REAL
);
CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY,
    store_id INTEGER NOT NULL REFERENCES stores(id),
    category_id INTEGER REFERENCES categories(id),
    unit_id INTEGER REFERENCES units(id),
    name TEXT NOT NULL,
    quantity REAL,
    price REAL NOT NULL
);
CREATE INDEX IF NOT EXISTS products_by_store ON products(store_id);
CREATE INDEX IF NOT EXISTS products_by_category ON products(category_id);
";

/// [`Repository`] persisted in a SQLite database.
///
/// Each value owns one connection. Concurrent importers open one repository
/// per worker; SQLite serialises their write transactions and the busy
/// timeout makes waiting writers block instead of failing.
pub struct SqliteRepository {
    connection: Connection,
}

impl fmt::Debug for SqliteRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqliteRepository")
            .field("path", &self.connection.path())
            .finish_non_exhaustive()
    }
}

impl SqliteRepository {
    /// Open or create the database at `path` and ensure the schema exists.
    ///
    /// # Errors
    /// Returns [`RepositoryError::OpenDatabase`] when the file cannot be
    /// opened and [`RepositoryError::Database`] when schema setup fails.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        let connection =
            Connection::open(path).map_err(|source| RepositoryError::OpenDatabase {
                path: path.to_path_buf(),
                source,
            })?;
        Self::initialise(connection)
    }

    /// Create a private in-memory database.
    ///
    /// # Errors
    /// Returns [`RepositoryError::Database`] when schema setup fails.
    pub fn open_in_memory() -> Result<Self, RepositoryError> {
        Self::initialise(Connection::open_in_memory()?)
    }

    fn initialise(connection: Connection) -> Result<Self, RepositoryError> {
        connection.busy_timeout(DEFAULT_BUSY_TIMEOUT)?;
        connection.pragma_update(None, "foreign_keys", true)?;
        connection.execute_batch(SCHEMA)?;
        for unit in Unit::ALL {
            connection.execute(
                "INSERT OR IGNORE INTO units (symbol) VALUES (?1)",
                params![unit.symbol()],
            )?;
        }
        Ok(Self { connection })
    }

    /// Change how long writes wait for a competing connection.
    ///
    /// # Errors
    /// Returns [`RepositoryError::Database`] when SQLite rejects the setting.
    pub fn set_busy_timeout(&self, timeout: Duration) -> Result<(), RepositoryError> {
        self.connection.busy_timeout(timeout)?;
        Ok(())
    }

    /// Insert a category unless its id is already present.
    ///
    /// Returns whether a row was written.
    ///
    /// # Errors
    /// Returns [`RepositoryError::Database`] on SQLite failures.
    pub fn insert_category(&self, category: &Category) -> Result<bool, RepositoryError> {
        let changed = self.connection.execute(
            "INSERT OR IGNORE INTO categories (id, name) VALUES (?1, ?2)",
            params![category.id, category.name],
        )?;
        Ok(changed == 1)
    }

    /// Insert a chain unless its name exists, returning its identifier.
    ///
    /// # Errors
    /// Returns [`RepositoryError::Database`] on SQLite failures.
    pub fn insert_chain(&self, name: &str) -> Result<u32, RepositoryError> {
        self.connection.execute(
            "INSERT OR IGNORE INTO chains (name) VALUES (?1)",
            params![name],
        )?;
        let id = self.connection.query_row(
            "SELECT id FROM chains WHERE name = ?1",
            params![name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    /// Insert a lowercased alias for `chain_id` unless it exists.
    ///
    /// Returns whether a row was written.
    ///
    /// # Errors
    /// Returns [`RepositoryError::Database`] on SQLite failures, including a
    /// missing chain.
    pub fn insert_chain_alias(&self, alias: &str, chain_id: u32) -> Result<bool, RepositoryError> {
        let changed = self.connection.execute(
            "INSERT OR IGNORE INTO chain_aliases (alias, chain_id) VALUES (?1, ?2)",
            params![alias.trim().to_lowercase(), chain_id],
        )?;
        Ok(changed == 1)
    }

    /// Insert a store unless one with the same chain and address exists,
    /// returning its identifier.
    ///
    /// An existing store keeps its recorded location.
    ///
    /// # Errors
    /// Returns [`RepositoryError::Database`] on SQLite failures.
    pub fn insert_store(
        &self,
        chain_id: Option<u32>,
        address: &str,
        populated_area: Option<&str>,
        location: Option<Coord<f64>>,
    ) -> Result<u32, RepositoryError> {
        let existing: Option<u32> = self
            .connection
            .query_row(
                "SELECT id FROM stores WHERE chain_id IS ?1 AND address = ?2",
                params![chain_id, address],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(id) = existing {
            return Ok(id);
        }
        self.connection.execute(
            "INSERT INTO stores (chain_id, address, populated_area, lat, lon)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                chain_id,
                address,
                populated_area,
                location.map(|c| c.y),
                location.map(|c| c.x)
            ],
        )?;
        row_id_u32(self.connection.last_insert_rowid(), "stores")
    }

    /// Record the position of a store.
    ///
    /// Returns whether the store exists.
    ///
    /// # Errors
    /// Returns [`RepositoryError::Database`] on SQLite failures.
    pub fn set_store_location(
        &self,
        store_id: u32,
        location: Coord<f64>,
    ) -> Result<bool, RepositoryError> {
        let changed = self.connection.execute(
            "UPDATE stores SET lat = ?1, lon = ?2 WHERE id = ?3",
            params![location.y, location.x, store_id],
        )?;
        Ok(changed == 1)
    }
}

fn row_id_u32(id: i64, table: &'static str) -> Result<u32, RepositoryError> {
    u32::try_from(id).map_err(|err| RepositoryError::InvalidRecord {
        table,
        id,
        reason: err.to_string(),
    })
}

fn store_from_row(row: &Row<'_>) -> rusqlite::Result<Store> {
    let lat: Option<f64> = row.get(4)?;
    let lon: Option<f64> = row.get(5)?;
    Ok(Store {
        id: row.get(0)?,
        chain_id: row.get(1)?,
        address: row.get(2)?,
        populated_area: row.get(3)?,
        location: lat.zip(lon).map(|(y, x)| Coord { x, y }),
    })
}

fn ensure_references(connection: &Connection, product: &NewProduct) -> Result<(), RepositoryError> {
    let store_exists: bool = connection.query_row(
        "SELECT EXISTS(SELECT 1 FROM stores WHERE id = ?1)",
        params![product.store_id],
        |row| row.get(0),
    )?;
    if !store_exists {
        return Err(RepositoryError::UnknownStore {
            store_id: product.store_id,
        });
    }
    if let Some(category_id) = product.category_id {
        let category_exists: bool = connection.query_row(
            "SELECT EXISTS(SELECT 1 FROM categories WHERE id = ?1)",
            params![category_id],
            |row| row.get(0),
        )?;
        if !category_exists {
            return Err(RepositoryError::UnknownCategory { category_id });
        }
    }
    Ok(())
}

fn insert_product_with(
    connection: &Connection,
    product: &NewProduct,
) -> Result<u64, RepositoryError> {
    ensure_references(connection, product)?;
    connection.execute(
        "INSERT INTO products (store_id, category_id, unit_id, name, quantity, price)
         VALUES (?1, ?2, (SELECT id FROM units WHERE symbol = ?3), ?4, ?5, ?6)",
        params![
            product.store_id,
            product.category_id,
            product.unit.map(Unit::symbol),
            product.name,
            product.quantity,
            product.price
        ],
    )?;
    let id = connection.last_insert_rowid();
    u64::try_from(id).map_err(|err| RepositoryError::InvalidRecord {
        table: "products",
        id,
        reason: err.to_string(),
    })
}

impl Repository for SqliteRepository {
    fn stores(&self, chain_id: Option<u32>) -> Result<Vec<Store>, RepositoryError> {
        let mut statement = self.connection.prepare(
            "SELECT id, chain_id, address, populated_area, lat, lon FROM stores
             WHERE ?1 IS NULL OR chain_id = ?1 ORDER BY id",
        )?;
        let stores = statement
            .query_map(params![chain_id], store_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(stores)
    }

    fn chains(&self) -> Result<Vec<Chain>, RepositoryError> {
        let mut statement = self
            .connection
            .prepare("SELECT id, name FROM chains ORDER BY id")?;
        let chains = statement
            .query_map([], |row| {
                Ok(Chain {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(chains)
    }

    fn chain_aliases(&self) -> Result<Vec<ChainAlias>, RepositoryError> {
        let mut statement = self
            .connection
            .prepare("SELECT alias, chain_id FROM chain_aliases ORDER BY id")?;
        let aliases = statement
            .query_map([], |row| {
                Ok(ChainAlias {
                    alias: row.get(0)?,
                    chain_id: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(aliases)
    }

    fn categories(&self) -> Result<Vec<Category>, RepositoryError> {
        let mut statement = self
            .connection
            .prepare("SELECT id, name FROM categories ORDER BY id")?;
        let categories = statement
            .query_map([], |row| {
                Ok(Category {
                    id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(categories)
    }

    fn units(&self) -> Result<Vec<UnitRecord>, RepositoryError> {
        let mut statement = self
            .connection
            .prepare("SELECT id, symbol FROM units ORDER BY id")?;
        let mut rows = statement.query([])?;
        let mut units = Vec::new();
        while let Some(row) = rows.next()? {
            let id: u32 = row.get(0)?;
            let symbol: String = row.get(1)?;
            let unit = Unit::from_str(&symbol).map_err(|reason| RepositoryError::InvalidRecord {
                table: "units",
                id: i64::from(id),
                reason,
            })?;
            units.push(UnitRecord { id, unit });
        }
        Ok(units)
    }

    fn products(&self, filter: ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let mut statement = self.connection.prepare(
            "SELECT p.id, p.store_id, p.category_id, u.symbol, p.name, p.quantity, p.price
             FROM products p LEFT JOIN units u ON u.id = p.unit_id
             WHERE (?1 IS NULL OR p.store_id = ?1)
               AND (?2 IS NULL OR p.category_id = ?2)
             ORDER BY p.id",
        )?;
        let mut rows = statement.query(params![filter.store_id, filter.category_id])?;
        let mut products = Vec::new();
        while let Some(row) = rows.next()? {
            let id: u64 = row.get(0)?;
            let symbol: Option<String> = row.get(3)?;
            let unit = symbol
                .map(|symbol| Unit::from_str(&symbol))
                .transpose()
                .map_err(|reason| RepositoryError::InvalidRecord {
                    table: "products",
                    id: i64::try_from(id).unwrap_or(i64::MAX),
                    reason,
                })?;
            products.push(Product {
                id,
                store_id: row.get(1)?,
                category_id: row.get(2)?,
                unit,
                name: row.get(4)?,
                quantity: row.get(5)?,
                price: row.get(6)?,
            });
        }
        Ok(products)
    }

    fn average_price_by_category(&self) -> Result<HashMap<u32, f64>, RepositoryError> {
        let mut statement = self.connection.prepare(
            "SELECT category_id, AVG(price) FROM products
             WHERE category_id IS NOT NULL GROUP BY category_id",
        )?;
        let averages = statement
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .collect::<rusqlite::Result<HashMap<u32, f64>>>()?;
        Ok(averages)
    }

    fn insert_product(&mut self, product: &NewProduct) -> Result<u64, RepositoryError> {
        insert_product_with(&self.connection, product)
    }

    fn insert_products(&mut self, products: &[NewProduct]) -> Result<Vec<u64>, RepositoryError> {
        let transaction = self.connection.transaction()?;
        let ids = products
            .iter()
            .map(|product| insert_product_with(&transaction, product))
            .collect::<Result<Vec<_>, _>>()?;
        transaction.commit()?;
        Ok(ids)
    }
}
