//! SQLite-backed product repository.
//!
//! Two tables:
//! - `products`: the product record itself
//! - `product_metadata`: optional one-to-one free-text attributes
//!
//! Writes go through [`ProductStore::transaction`], which runs registered
//! commit hooks only after the transaction has committed.

use anyhow::{Context, Result};
use rusqlite::functions::FunctionFlags;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row, Transaction};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::SystemTime;

use crate::model::{MetadataPatch, NewProduct, Product, ProductId, ProductMetadata};

const SELECT_PRODUCT: &str = "
    SELECT p.id, p.title, p.description, p.price, p.mrp, p.stock, p.rating,
           p.total_reviews, p.units_sold, p.return_rate, p.currency, p.created_at,
           m.product_id, m.ram, m.storage, m.screensize, m.model, m.brightness,
           m.color, m.category
    FROM products p
    LEFT JOIN product_metadata m ON m.product_id = p.id";

/// Callback run once after a successful commit.
pub type CommitHook = Box<dyn FnOnce() + Send + 'static>;

/// Product repository over a single SQLite connection.
pub struct ProductStore {
    conn: Mutex<Connection>,
}

impl ProductStore {
    /// Create or open the catalog database at the given directory.
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let db_path = data_dir.join("catalog.db");
        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open catalog database at {}", db_path.display()))?;
        Self::init(conn)
    }

    /// Open a throwaway in-memory catalog.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        // SQLite's LIKE folds ASCII only
        conn.create_scalar_function(
            "unicode_lower",
            1,
            FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
            |ctx| {
                let value: Option<String> = ctx.get(0)?;
                Ok(value.map(|v| v.to_lowercase()))
            },
        ).context("Failed to register unicode_lower")?;

        conn.execute_batch(r#"
            PRAGMA foreign_keys = ON;

            CREATE TABLE IF NOT EXISTS products (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                rating REAL NOT NULL DEFAULT 0,
                total_reviews INTEGER NOT NULL DEFAULT 0,
                units_sold INTEGER NOT NULL DEFAULT 0,
                return_rate REAL NOT NULL DEFAULT 0,
                stock INTEGER NOT NULL DEFAULT 0,
                price REAL NOT NULL,
                mrp REAL NOT NULL,
                currency TEXT NOT NULL DEFAULT 'Rupee',
                created_at INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS product_metadata (
                product_id INTEGER PRIMARY KEY,
                ram TEXT,
                storage TEXT,
                screensize TEXT,
                model TEXT,
                brightness TEXT,
                color TEXT,
                category TEXT,
                FOREIGN KEY (product_id) REFERENCES products(id) ON DELETE CASCADE
            );
        "#).context("Failed to create tables")?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| anyhow::anyhow!("Connection lock poisoned: {}", e))
    }

    /// Look up a single product.
    pub fn get(&self, id: ProductId) -> Result<Option<Product>> {
        let conn = self.lock()?;
        fetch_one(&conn, id)
    }

    /// Look up many products at once. Missing ids are absent from the map;
    /// the map carries no ordering.
    pub fn in_bulk(&self, ids: &[ProductId]) -> Result<HashMap<ProductId, Product>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = format!("{} WHERE p.id IN ({})", SELECT_PRODUCT, placeholders);

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let products = stmt
            .query_map(params_from_iter(ids.iter()), row_to_product)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(products.into_iter().map(|p| (p.id, p)).collect())
    }

    /// Products whose title or description contains `text`, ignoring case.
    /// An empty needle matches every product. Results are ordered by id.
    pub fn filter_by_substring(&self, text: &str) -> Result<Vec<Product>> {
        let pattern = format!("%{}%", escape_like(&text.to_lowercase()));
        let sql = format!(
            "{} WHERE unicode_lower(p.title) LIKE ?1 ESCAPE '\\'
                OR unicode_lower(p.description) LIKE ?1 ESCAPE '\\'
             ORDER BY p.id",
            SELECT_PRODUCT
        );

        let conn = self.lock()?;
        let mut stmt = conn.prepare(&sql)?;
        let products = stmt
            .query_map(params![pattern], row_to_product)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(products)
    }

    /// Every product, ordered by id.
    pub fn all(&self) -> Result<Vec<Product>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!("{} ORDER BY p.id", SELECT_PRODUCT))?;
        let products = stmt
            .query_map([], row_to_product)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(products)
    }

    /// Number of stored products.
    pub fn count(&self) -> Result<usize> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Run `f` inside a single transaction.
    ///
    /// If `f` fails or the commit fails, everything is rolled back and the
    /// hooks registered through [`UnitOfWork::on_commit`] are dropped unrun.
    /// Otherwise each hook runs exactly once, in registration order, after
    /// the connection lock has been released.
    pub fn transaction<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut UnitOfWork<'_>) -> Result<T>,
    {
        let (value, hooks) = {
            let mut conn = self.lock()?;
            let mut uow = UnitOfWork {
                tx: conn.transaction().context("Failed to begin transaction")?,
                hooks: Vec::new(),
            };
            let value = f(&mut uow)?;

            let UnitOfWork { tx, hooks } = uow;
            tx.commit().context("Failed to commit transaction")?;
            (value, hooks)
        };

        for hook in hooks {
            hook();
        }
        Ok(value)
    }
}

/// Writes staged inside one [`ProductStore::transaction`].
pub struct UnitOfWork<'conn> {
    tx: Transaction<'conn>,
    hooks: Vec<CommitHook>,
}

impl UnitOfWork<'_> {
    /// Insert a product, plus its metadata row when the payload carries one.
    pub fn insert_product(&mut self, new: &NewProduct) -> Result<ProductId> {
        let now = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);

        self.tx.execute(
            "INSERT INTO products (title, description, rating, total_reviews, units_sold,
                                   return_rate, stock, price, mrp, currency, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                new.title,
                new.description,
                new.rating,
                new.total_reviews,
                new.units_sold,
                new.return_rate,
                new.stock,
                new.price,
                new.mrp,
                new.currency,
                now,
            ],
        )?;
        let id = self.tx.last_insert_rowid();

        if let Some(ref patch) = new.metadata {
            self.upsert_metadata(id, patch)?;
        }
        Ok(id)
    }

    /// Get-or-create the metadata row of `id`, then overwrite the fields
    /// present in `patch`.
    pub fn upsert_metadata(&mut self, id: ProductId, patch: &MetadataPatch) -> Result<()> {
        self.tx.execute(
            "INSERT OR IGNORE INTO product_metadata (product_id) VALUES (?1)",
            params![id],
        )?;
        self.tx.execute(
            "UPDATE product_metadata SET
                ram = COALESCE(?2, ram),
                storage = COALESCE(?3, storage),
                screensize = COALESCE(?4, screensize),
                model = COALESCE(?5, model),
                brightness = COALESCE(?6, brightness),
                color = COALESCE(?7, color),
                category = COALESCE(?8, category)
             WHERE product_id = ?1",
            params![
                id,
                patch.ram,
                patch.storage,
                patch.screensize,
                patch.model,
                patch.brightness,
                patch.color,
                patch.category,
            ],
        )?;
        Ok(())
    }

    /// Read a product as this transaction sees it.
    pub fn get(&self, id: ProductId) -> Result<Option<Product>> {
        fetch_one(&self.tx, id)
    }

    /// Register a callback to run after the transaction commits.
    pub fn on_commit<F>(&mut self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.hooks.push(Box::new(hook));
    }
}

fn fetch_one(conn: &Connection, id: ProductId) -> Result<Option<Product>> {
    let product = conn
        .query_row(&format!("{} WHERE p.id = ?1", SELECT_PRODUCT), params![id], row_to_product)
        .optional()?;
    Ok(product)
}

fn row_to_product(row: &Row<'_>) -> rusqlite::Result<Product> {
    let metadata_row: Option<i64> = row.get(12)?;
    let metadata = match metadata_row {
        Some(_) => Some(ProductMetadata {
            ram: row.get(13)?,
            storage: row.get(14)?,
            screensize: row.get(15)?,
            model: row.get(16)?,
            brightness: row.get(17)?,
            color: row.get(18)?,
            category: row.get(19)?,
        }),
        None => None,
    };

    Ok(Product {
        id: row.get(0)?,
        title: row.get(1)?,
        description: row.get(2)?,
        price: row.get(3)?,
        mrp: row.get(4)?,
        stock: row.get(5)?,
        rating: row.get(6)?,
        total_reviews: row.get(7)?,
        units_sold: row.get(8)?,
        return_rate: row.get(9)?,
        currency: row.get(10)?,
        created_at: row.get(11)?,
        metadata,
    })
}

/// Escape LIKE wildcards so the needle matches literally.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
