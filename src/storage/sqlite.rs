use anyhow::{anyhow, Result};
use rusqlite::{params, types::Type, Connection, OptionalExtension};
use serde_json::Value;
use std::{
    path::Path,
    str::FromStr,
    sync::{Arc, Mutex},
};

use super::traits::{
    Block, Page, PageBlockLink, Slug, Storage, StorageRead, StorageTx, StorageWrite,
};

const DB_SCHEMA_VERSION: i64 = 1;

// SQLite caps bound parameters per statement.
const MAX_IN_PARAMS: usize = 900;

/// SQLite store with one shared connection, opened by `init` and released by `close`.
#[derive(Clone)]
pub struct SqliteStorage {
    pub path: String,
    conn: Arc<Mutex<Option<Connection>>>,
}

pub struct SqliteTx {
    conn: Connection,
}

impl StorageTx for SqliteTx {
    fn commit(self) -> Result<()> {
        self.conn.execute("COMMIT", [])?;
        Ok(())
    }
}

fn map_page_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Page> {
    let slug_str: String = row.get(2)?;
    let slug = Slug::from_str(&slug_str)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(err)))?;
    Ok(Page {
        id: row.get(0)?,
        name: row.get(1)?,
        slug,
        order_by: row.get(3)?,
    })
}

fn map_block_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Block> {
    let links_str: String = row.get(2)?;
    let links: Value = serde_json::from_str(&links_str)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(2, Type::Text, Box::new(err)))?;
    Ok(Block {
        id: row.get(0)?,
        name: row.get(1)?,
        links,
        viewed_count: row.get(3)?,
    })
}

fn db_list_pages(conn: &Connection) -> rusqlite::Result<Vec<Page>> {
    let mut stmt = conn.prepare("SELECT id, name, slug, order_by FROM pages ORDER BY order_by, id")?;
    let mapped = stmt
        .query_map([], map_page_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(mapped)
}

fn db_load_page_by_slug(conn: &Connection, slug: &str) -> rusqlite::Result<Option<Page>> {
    conn.query_row(
        "SELECT id, name, slug, order_by FROM pages WHERE slug = ?1",
        params![slug],
        map_page_row,
    )
    .optional()
}

fn db_list_page_blocks(conn: &Connection, page_id: i64) -> rusqlite::Result<Vec<Block>> {
    let mut stmt = conn.prepare(
        r#"
        SELECT b.id, b.name, b.links, b.viewed_count
        FROM blocks b
        JOIN pages_blocks pb ON pb.block_id = b.id
        WHERE pb.page_id = ?1
        ORDER BY pb.order_by, b.id
        "#,
    )?;
    let rows = stmt
        .query_map(params![page_id], map_block_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

fn db_insert_page(
    conn: &Connection,
    name: &str,
    slug: &Slug,
    order_by: i64,
) -> rusqlite::Result<Page> {
    conn.execute(
        "INSERT INTO pages (name, slug, order_by) VALUES (?1, ?2, ?3)",
        params![name, slug.as_str(), order_by],
    )?;
    Ok(Page {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        slug: slug.clone(),
        order_by,
    })
}

fn db_insert_block(
    conn: &Connection,
    name: &str,
    links: &Value,
    viewed_count: i64,
) -> rusqlite::Result<Block> {
    let links_str = serde_json::to_string(links)
        .map_err(|err| rusqlite::Error::ToSqlConversionFailure(Box::new(err)))?;
    conn.execute(
        "INSERT INTO blocks (name, links, viewed_count) VALUES (?1, ?2, ?3)",
        params![name, links_str, viewed_count],
    )?;
    Ok(Block {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        links: links.clone(),
        viewed_count,
    })
}

fn db_link_block(conn: &Connection, link: &PageBlockLink) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO pages_blocks (page_id, block_id, order_by) VALUES (?1, ?2, ?3)",
        params![link.page_id, link.block_id, link.order_by],
    )?;
    Ok(())
}

fn db_increment_viewed_counts(conn: &Connection, block_ids: &[i64]) -> rusqlite::Result<usize> {
    if block_ids.is_empty() {
        return Ok(0);
    }

    // Inside an open transaction the caller owns commit/rollback.
    if !conn.is_autocommit() {
        return db_increment_chunks(conn, block_ids);
    }

    let tx = conn.unchecked_transaction()?;
    let updated = db_increment_chunks(&tx, block_ids)?;
    tx.commit()?;
    Ok(updated)
}

// The counter is bumped in SQL so concurrent readers never overwrite each other.
fn db_increment_chunks(conn: &Connection, block_ids: &[i64]) -> rusqlite::Result<usize> {
    let mut updated = 0;
    for chunk in block_ids.chunks(MAX_IN_PARAMS) {
        let placeholders = std::iter::repeat("?")
            .take(chunk.len())
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE blocks SET viewed_count = viewed_count + 1 WHERE id IN ({placeholders})"
        );
        updated += conn.execute(&sql, rusqlite::params_from_iter(chunk.iter()))?;
    }
    Ok(updated)
}

fn open_connection(path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(std::time::Duration::from_millis(500))?;
    Ok(conn)
}

impl StorageRead for SqliteTx {
    fn list_pages(&self) -> Result<Vec<Page>> {
        Ok(db_list_pages(&self.conn)?)
    }

    fn load_page_by_slug(&self, slug: &str) -> Result<Option<Page>> {
        Ok(db_load_page_by_slug(&self.conn, slug)?)
    }

    fn list_page_blocks(&self, page_id: i64) -> Result<Vec<Block>> {
        Ok(db_list_page_blocks(&self.conn, page_id)?)
    }
}

impl StorageWrite for SqliteTx {
    fn insert_page(&self, name: &str, slug: &Slug, order_by: i64) -> Result<Page> {
        Ok(db_insert_page(&self.conn, name, slug, order_by)?)
    }

    fn insert_block(&self, name: &str, links: &Value, viewed_count: i64) -> Result<Block> {
        Ok(db_insert_block(&self.conn, name, links, viewed_count)?)
    }

    fn link_block(&self, link: &PageBlockLink) -> Result<()> {
        Ok(db_link_block(&self.conn, link)?)
    }

    fn increment_viewed_counts(&self, block_ids: &[i64]) -> Result<usize> {
        Ok(db_increment_viewed_counts(&self.conn, block_ids)?)
    }
}

impl Storage for SqliteStorage {
    type Tx = SqliteTx;

    fn begin_tx(&self) -> Result<Self::Tx> {
        let conn = open_connection(&self.path)?;
        conn.execute("BEGIN IMMEDIATE", [])?;

        Ok(SqliteTx { conn })
    }
}

impl SqliteStorage {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_string_lossy().to_string(),
            conn: Arc::new(Mutex::new(None)),
        }
    }

    pub fn reset_all(&self) -> Result<()> {
        self.close()?;
        if !Path::new(&self.path).exists() {
            return Ok(());
        }
        std::fs::remove_file(&self.path)?;
        Ok(())
    }

    /// Opens the shared connection and brings the schema up to date.
    pub fn init(&self) -> Result<()> {
        if let Some(parent) = Path::new(&self.path)
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            std::fs::create_dir_all(parent)?;
        }

        let conn = open_connection(&self.path)?;
        Self::migrate(&conn)?;

        let mut guard = self
            .conn
            .lock()
            .map_err(|_| anyhow!("storage connection lock poisoned"))?;
        *guard = Some(conn);
        Ok(())
    }

    pub fn close(&self) -> Result<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|_| anyhow!("storage connection lock poisoned"))?
            .take();
        if let Some(conn) = conn {
            conn.close().map_err(|(_, err)| err)?;
            log::info!("SQLite storage closed: {}", self.path);
        }
        Ok(())
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let guard = self
            .conn
            .lock()
            .map_err(|_| anyhow!("storage connection lock poisoned"))?;
        let conn = guard
            .as_ref()
            .ok_or_else(|| anyhow!("storage is not open: {}", self.path))?;
        Ok(f(conn)?)
    }

    fn migrate(conn: &Connection) -> rusqlite::Result<()> {
        let version: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

        if version == DB_SCHEMA_VERSION {
            return Ok(());
        }

        log::info!(
            "SQLite schema migration: {} -> {}",
            version,
            DB_SCHEMA_VERSION
        );

        if version == 0 {
            conn.execute_batch(
                r#"
            CREATE TABLE pages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                order_by INTEGER NOT NULL DEFAULT 0
            );
            CREATE TABLE blocks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                links TEXT NOT NULL DEFAULT 'null',
                viewed_count INTEGER NOT NULL DEFAULT 0 CHECK (viewed_count >= 0)
            );
            CREATE TABLE pages_blocks (
                page_id INTEGER NOT NULL REFERENCES pages(id) ON DELETE CASCADE,
                block_id INTEGER NOT NULL REFERENCES blocks(id) ON DELETE CASCADE,
                order_by INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (page_id, block_id)
            );
            CREATE INDEX pages_order_idx ON pages(order_by);
            CREATE INDEX pages_blocks_page_order_idx ON pages_blocks(page_id, order_by);
            CREATE INDEX pages_blocks_block_idx ON pages_blocks(block_id);
        "#,
            )?;
            conn.pragma_update(None, "user_version", DB_SCHEMA_VERSION)?;
            return Ok(());
        }

        Err(rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::ErrorCode::SchemaChanged as i32),
            Some("database schema version mismatch; please run with --reset option".to_string()),
        ))
    }
}

impl StorageRead for SqliteStorage {
    fn list_pages(&self) -> Result<Vec<Page>> {
        self.with_conn(db_list_pages)
    }

    fn load_page_by_slug(&self, slug: &str) -> Result<Option<Page>> {
        self.with_conn(|conn| db_load_page_by_slug(conn, slug))
    }

    fn list_page_blocks(&self, page_id: i64) -> Result<Vec<Block>> {
        self.with_conn(|conn| db_list_page_blocks(conn, page_id))
    }
}

impl StorageWrite for SqliteStorage {
    fn insert_page(&self, name: &str, slug: &Slug, order_by: i64) -> Result<Page> {
        self.with_conn(|conn| db_insert_page(conn, name, slug, order_by))
    }

    fn insert_block(&self, name: &str, links: &Value, viewed_count: i64) -> Result<Block> {
        self.with_conn(|conn| db_insert_block(conn, name, links, viewed_count))
    }

    fn link_block(&self, link: &PageBlockLink) -> Result<()> {
        self.with_conn(|conn| db_link_block(conn, link))
    }

    fn increment_viewed_counts(&self, block_ids: &[i64]) -> Result<usize> {
        self.with_conn(|conn| db_increment_viewed_counts(conn, block_ids))
    }
}
