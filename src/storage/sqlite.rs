//! SQLite storage backend

use super::traits::{
    require_concrete, ItemStore, LanguageFilter, MetadataStore, OpenStore, StorageError, StorageResult,
    UnitOfWork, WorkUnit,
};
use crate::metadata::{Confidence, ItemId, MetadataFieldKey, MetadataValue};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Raw row of the `metadata_values` table, in column order
type ValueRow = (i64, String, String, String, String, Option<String>, String, Option<String>, i32, i64);

const VALUE_COLUMNS: &str =
    "id, item_id, schema_name, element, qualifier, language, value, authority, confidence, place";

/// SQLite-backed metadata store
///
/// One table of items and one of metadata values. The qualifier column
/// holds `''` for unqualified fields so equality lookups stay simple.
/// Thread-safe via internal mutex on the connection.
///
/// A unit of work is a `BEGIN IMMEDIATE` transaction that keeps the
/// connection locked, so other callers wait for it instead of writing
/// into it.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS items (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                last_modified TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS metadata_values (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                item_id TEXT NOT NULL,
                schema_name TEXT NOT NULL,
                element TEXT NOT NULL,
                qualifier TEXT NOT NULL DEFAULT '',
                language TEXT,
                value TEXT NOT NULL,
                authority TEXT,
                confidence INTEGER NOT NULL DEFAULT -1,
                place INTEGER NOT NULL,
                FOREIGN KEY (item_id) REFERENCES items(id) ON DELETE CASCADE
            );

            CREATE INDEX IF NOT EXISTS idx_values_field
                ON metadata_values(item_id, schema_name, element, qualifier, place);

            PRAGMA foreign_keys = ON;
            "#,
        )?;
        Ok(())
    }

    /// Enable WAL for file-backed databases
    fn enable_wal(conn: &Connection) -> StorageResult<()> {
        conn.query_row("PRAGMA journal_mode = WAL", [], |_| Ok(()))?;
        Ok(())
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    fn row_to_value(row: ValueRow) -> StorageResult<MetadataValue> {
        let (_id, item_id, schema, element, qualifier, language, value, authority, confidence, place) = row;
        let owner: ItemId = item_id
            .parse()
            .map_err(|e: uuid::Error| StorageError::Backend(format!("bad item id '{}': {}", item_id, e)))?;
        let qualifier = (!qualifier.is_empty()).then_some(qualifier);
        let field = MetadataFieldKey::new(schema, element, qualifier.as_deref())?;
        Ok(MetadataValue {
            owner,
            field,
            value,
            language,
            authority,
            confidence: Confidence::new(confidence),
            place: usize::try_from(place).map_err(|_| StorageError::Backend(format!("negative place {}", place)))?,
        })
    }

    fn item_exists(conn: &Connection, id: &ItemId) -> StorageResult<bool> {
        let found: Option<i64> = conn
            .query_row("SELECT 1 FROM items WHERE id = ?1", params![id.to_string()], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    fn ensure_item(conn: &Connection, id: &ItemId) -> StorageResult<()> {
        if Self::item_exists(conn, id)? {
            Ok(())
        } else {
            Err(StorageError::ItemNotFound(*id))
        }
    }

    fn touch(conn: &Connection, id: &ItemId) -> StorageResult<()> {
        conn.execute(
            "UPDATE items SET last_modified = ?2 WHERE id = ?1",
            params![id.to_string(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    /// Select values of an item, optionally narrowed to one field
    fn query_values(
        conn: &Connection,
        owner: &ItemId,
        field: Option<&MetadataFieldKey>,
    ) -> StorageResult<Vec<MetadataValue>> {
        let mut sql = format!("SELECT {} FROM metadata_values WHERE item_id = ?", VALUE_COLUMNS);
        let mut params_vec: Vec<Box<dyn ToSql>> = vec![Box::new(owner.to_string())];

        if let Some(field) = field {
            sql.push_str(" AND schema_name = ? AND element = ?");
            params_vec.push(Box::new(field.schema().to_string()));
            params_vec.push(Box::new(field.element().to_string()));
            if !field.is_wildcard() {
                sql.push_str(" AND qualifier = ?");
                params_vec.push(Box::new(field.qualifier().unwrap_or("").to_string()));
            }
        }
        sql.push_str(" ORDER BY schema_name, element, qualifier, place");

        let mut stmt = conn.prepare(&sql)?;
        let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();
        let rows = stmt.query_map(params_refs.as_slice(), |row| -> rusqlite::Result<ValueRow> {
            Ok((
                row.get(0)?,
                row.get(1)?,
                row.get(2)?,
                row.get(3)?,
                row.get(4)?,
                row.get(5)?,
                row.get(6)?,
                row.get(7)?,
                row.get(8)?,
                row.get(9)?,
            ))
        })?;

        let mut values = Vec::new();
        for row in rows {
            values.push(Self::row_to_value(row?)?);
        }
        Ok(values)
    }

    /// Reassign places 0..n for every field of an item, keeping order
    fn renumber(conn: &Connection, owner: &ItemId) -> StorageResult<()> {
        let mut stmt = conn.prepare(
            "SELECT id, schema_name, element, qualifier FROM metadata_values
             WHERE item_id = ?1 ORDER BY schema_name, element, qualifier, place",
        )?;
        let rows: Vec<(i64, String, String, String)> = stmt
            .query_map(params![owner.to_string()], |row| -> rusqlite::Result<(i64, String, String, String)> {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })?
            .collect::<Result<_, _>>()?;

        let mut current: Option<(String, String, String)> = None;
        let mut next: i64 = 0;
        for (id, schema, element, qualifier) in rows {
            let field = (schema, element, qualifier);
            if current.as_ref() != Some(&field) {
                current = Some(field);
                next = 0;
            }
            conn.execute("UPDATE metadata_values SET place = ?2 WHERE id = ?1", params![id, next])?;
            next += 1;
        }
        Ok(())
    }

    /// When an item was last changed, if the item exists
    pub fn last_modified(&self, id: &ItemId) -> StorageResult<Option<DateTime<Utc>>> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT last_modified FROM items WHERE id = ?1",
                params![id.to_string()],
                |row| row.get(0),
            )
            .optional()?;

        raw.map(|s| {
            DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .map_err(|e| StorageError::DateParse(e.to_string()))
        })
        .transpose()
    }
}

impl OpenStore for SqliteStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;
        Self::enable_wal(&conn)?;

        Ok(Self { conn: Mutex::new(conn) })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self { conn: Mutex::new(conn) })
    }
}

impl SqliteStore {
    fn fetch(conn: &Connection, owner: &ItemId, field: &MetadataFieldKey) -> StorageResult<Vec<MetadataValue>> {
        Self::ensure_item(conn, owner)?;
        Self::query_values(conn, owner, Some(field))
    }

    fn insert_value(
        conn: &Connection,
        target: &ItemId,
        field: &MetadataFieldKey,
        language: Option<&str>,
        value: &str,
        authority: Option<&str>,
        confidence: Confidence,
    ) -> StorageResult<MetadataValue> {
        require_concrete(field)?;
        Self::ensure_item(conn, target)?;

        let qualifier = field.qualifier().unwrap_or("");
        let place: i64 = conn.query_row(
            "SELECT COUNT(*) FROM metadata_values
             WHERE item_id = ?1 AND schema_name = ?2 AND element = ?3 AND qualifier = ?4",
            params![target.to_string(), field.schema(), field.element(), qualifier],
            |row| row.get(0),
        )?;

        conn.execute(
            r#"
            INSERT INTO metadata_values
                (item_id, schema_name, element, qualifier, language, value, authority, confidence, place)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                target.to_string(),
                field.schema(),
                field.element(),
                qualifier,
                language,
                value,
                authority,
                confidence.score(),
                place
            ],
        )?;
        Self::touch(conn, target)?;

        Ok(MetadataValue {
            owner: *target,
            field: field.clone(),
            value: value.to_string(),
            language: language.map(str::to_string),
            authority: authority.map(str::to_string),
            confidence,
            place: place as usize,
        })
    }

    fn delete_values(
        conn: &Connection,
        target: &ItemId,
        field: &MetadataFieldKey,
        language: &LanguageFilter,
    ) -> StorageResult<usize> {
        Self::ensure_item(conn, target)?;

        let mut sql = String::from("DELETE FROM metadata_values WHERE item_id = ? AND schema_name = ? AND element = ?");
        let mut params_vec: Vec<Box<dyn ToSql>> = vec![
            Box::new(target.to_string()),
            Box::new(field.schema().to_string()),
            Box::new(field.element().to_string()),
        ];
        if !field.is_wildcard() {
            sql.push_str(" AND qualifier = ?");
            params_vec.push(Box::new(field.qualifier().unwrap_or("").to_string()));
        }
        match language {
            LanguageFilter::Any => {}
            LanguageFilter::Unset => sql.push_str(" AND language IS NULL"),
            LanguageFilter::Is(lang) => {
                sql.push_str(" AND language = ?");
                params_vec.push(Box::new(lang.clone()));
            }
        }

        let params_refs: Vec<&dyn ToSql> = params_vec.iter().map(|b| b.as_ref()).collect();
        let removed = conn.execute(&sql, params_refs.as_slice())?;
        if removed > 0 {
            Self::renumber(conn, target)?;
            Self::touch(conn, target)?;
        }
        Ok(removed)
    }

    fn insert_item(conn: &Connection) -> StorageResult<ItemId> {
        let id = ItemId::new();
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO items (id, created_at, last_modified) VALUES (?1, ?2, ?2)",
            params![id.to_string(), now],
        )?;
        Ok(id)
    }

    fn fetch_all(conn: &Connection, id: &ItemId) -> StorageResult<Vec<MetadataValue>> {
        Self::ensure_item(conn, id)?;
        Self::query_values(conn, id, None)
    }
}

impl MetadataStore for SqliteStore {
    fn get_metadata(&self, owner: &ItemId, field: &MetadataFieldKey) -> StorageResult<Vec<MetadataValue>> {
        let conn = self.lock()?;
        Self::fetch(&conn, owner, field)
    }

    fn add_metadata(
        &self,
        target: &ItemId,
        field: &MetadataFieldKey,
        language: Option<&str>,
        value: &str,
        authority: Option<&str>,
        confidence: Confidence,
    ) -> StorageResult<MetadataValue> {
        let conn = self.lock()?;
        Self::insert_value(&conn, target, field, language, value, authority, confidence)
    }

    fn clear_metadata(
        &self,
        target: &ItemId,
        field: &MetadataFieldKey,
        language: &LanguageFilter,
    ) -> StorageResult<usize> {
        let conn = self.lock()?;
        Self::delete_values(&conn, target, field, language)
    }
}

impl ItemStore for SqliteStore {
    fn create_item(&self) -> StorageResult<ItemId> {
        let conn = self.lock()?;
        Self::insert_item(&conn)
    }

    fn has_item(&self, id: &ItemId) -> StorageResult<bool> {
        let conn = self.lock()?;
        Self::item_exists(&conn, id)
    }

    fn all_metadata(&self, id: &ItemId) -> StorageResult<Vec<MetadataValue>> {
        let conn = self.lock()?;
        Self::fetch_all(&conn, id)
    }
}

impl UnitOfWork for SqliteStore {
    type Unit<'a> = SqliteUnit<'a>
    where
        Self: 'a;

    fn begin(&self) -> StorageResult<SqliteUnit<'_>> {
        let conn = self.lock()?;
        if !conn.is_autocommit() {
            return Err(StorageError::Transaction(
                "connection is already inside a transaction".to_string(),
            ));
        }
        conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(SqliteUnit { conn, open: true })
    }
}

/// A `BEGIN IMMEDIATE` transaction holding the store's connection.
///
/// The connection stays locked until the unit ends. Dropping the unit
/// without `commit` issues `ROLLBACK`.
pub struct SqliteUnit<'a> {
    conn: MutexGuard<'a, Connection>,
    open: bool,
}

impl MetadataStore for SqliteUnit<'_> {
    fn get_metadata(&self, owner: &ItemId, field: &MetadataFieldKey) -> StorageResult<Vec<MetadataValue>> {
        SqliteStore::fetch(&self.conn, owner, field)
    }

    fn add_metadata(
        &self,
        target: &ItemId,
        field: &MetadataFieldKey,
        language: Option<&str>,
        value: &str,
        authority: Option<&str>,
        confidence: Confidence,
    ) -> StorageResult<MetadataValue> {
        SqliteStore::insert_value(&self.conn, target, field, language, value, authority, confidence)
    }

    fn clear_metadata(
        &self,
        target: &ItemId,
        field: &MetadataFieldKey,
        language: &LanguageFilter,
    ) -> StorageResult<usize> {
        SqliteStore::delete_values(&self.conn, target, field, language)
    }
}

impl ItemStore for SqliteUnit<'_> {
    fn create_item(&self) -> StorageResult<ItemId> {
        SqliteStore::insert_item(&self.conn)
    }

    fn has_item(&self, id: &ItemId) -> StorageResult<bool> {
        SqliteStore::item_exists(&self.conn, id)
    }

    fn all_metadata(&self, id: &ItemId) -> StorageResult<Vec<MetadataValue>> {
        SqliteStore::fetch_all(&self.conn, id)
    }
}

impl WorkUnit for SqliteUnit<'_> {
    fn commit(mut self) -> StorageResult<()> {
        self.conn.execute_batch("COMMIT")?;
        self.open = false;
        Ok(())
    }

    fn rollback(mut self) -> StorageResult<()> {
        self.open = false;
        self.conn.execute_batch("ROLLBACK")?;
        Ok(())
    }
}

impl Drop for SqliteUnit<'_> {
    fn drop(&mut self) {
        if self.open {
            if let Err(e) = self.conn.execute_batch("ROLLBACK") {
                tracing::warn!(error = %e, "rollback of abandoned unit of work failed");
            }
        }
    }
}
