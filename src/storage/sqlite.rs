use rusqlite::{Connection, Row, params};

use super::ApodStore;
use super::models::{ApodRecord, NewApod};
use super::schema;
use crate::errors::{ApodError, Result};

const BASE_SELECT: &str = "
    SELECT id, title, explanation, file_path, sha256
    FROM apod_images
";

pub struct SqliteStorage {
    conn: Connection,
}

fn row_to_record(row: &Row) -> rusqlite::Result<ApodRecord> {
    Ok(ApodRecord {
        id: row.get(0)?,
        title: row.get(1)?,
        explanation: row.get(2)?,
        file_path: row.get(3)?,
        sha256: row.get(4)?,
    })
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error {
                code: rusqlite::ErrorCode::ConstraintViolation,
                ..
            },
            _,
        )
    )
}

impl SqliteStorage {
    /// Schema creation is idempotent and runs on every open; an existing
    /// index is never wiped.
    pub fn new(conn: Connection) -> Result<Self> {
        conn.execute(schema::CREATE_APOD_TABLE, [])?;
        conn.execute(schema::CREATE_INDEX_SHA256, [])?;
        Ok(Self { conn })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::new(conn)
    }

    #[cfg(test)]
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

impl ApodStore for SqliteStorage {
    fn insert(&self, apod: NewApod) -> Result<ApodRecord> {
        let result = self.conn.execute(
            "INSERT INTO apod_images (title, explanation, file_path, sha256)
             VALUES (?, ?, ?, ?)",
            params![apod.title, apod.explanation, apod.file_path, apod.sha256],
        );
        match result {
            Ok(_) => {
                let id = self.conn.last_insert_rowid();
                self.get_by_id(id)
            }
            Err(e) if is_constraint_violation(&e) => Err(ApodError::Duplicate(format!(
                "image with digest {} or path {} is already cached",
                apod.sha256, apod.file_path
            ))),
            Err(e) => Err(ApodError::Index(e)),
        }
    }

    fn get_by_id(&self, id: i64) -> Result<ApodRecord> {
        let sql = format!("{} WHERE id = ?", BASE_SELECT);
        self.conn
            .query_row(&sql, params![id], row_to_record)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => {
                    ApodError::NotFound(format!("APOD with id {} not found", id))
                }
                other => ApodError::Index(other),
            })
    }

    fn find_by_sha256(&self, sha256: &str) -> Result<Option<ApodRecord>> {
        let sql = format!("{} WHERE sha256 = ?", BASE_SELECT);
        match self.conn.query_row(&sql, params![sha256], row_to_record) {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(ApodError::Index(e)),
        }
    }

    fn list(&self) -> Result<Vec<ApodRecord>> {
        let sql = format!("{} ORDER BY id", BASE_SELECT);
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map([], row_to_record)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn list_titles(&self) -> Result<Vec<String>> {
        let mut stmt = self.conn.prepare("SELECT title FROM apod_images")?;
        let titles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(titles)
    }

    fn count(&self) -> Result<i64> {
        let n = self
            .conn
            .query_row("SELECT COUNT(*) FROM apod_images", [], |row| row.get(0))?;
        Ok(n)
    }
}
