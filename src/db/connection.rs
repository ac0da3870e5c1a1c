use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};

use super::properties::{select_all_sql, TableName};
use crate::domain::PropertyRecord;
use crate::errors::{MigrationError, MigrationResult};

/// The local database we copy from. Opened read-only, used once, closed once.
pub struct SourceDatabase {
    path: PathBuf,
    conn: Connection,
}

impl SourceDatabase {
    /// Opens an existing SQLite file. A missing file is an error rather
    /// than a fresh empty database.
    pub fn open(path: impl AsRef<Path>) -> MigrationResult<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(MigrationError::Connection(format!(
                "Source database not found: {}",
                path.display()
            )));
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| MigrationError::Connection(format!("Open source DB failed: {e}")))?;

        // Opening is lazy in SQLite; touch the schema so an unreadable file fails here.
        conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
            row.get::<_, i64>(0)
        })
        .map_err(|e| MigrationError::Connection(format!("Source DB unreadable: {e}")))?;

        tracing::debug!(path = %path.display(), "Opened source database");

        Ok(Self {
            path: path.to_path_buf(),
            conn,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole table into memory before returning.
    pub fn read_all_records(&self, table: &TableName) -> MigrationResult<Vec<PropertyRecord>> {
        let mut stmt = self
            .conn
            .prepare(&select_all_sql(table))
            .map_err(|e| MigrationError::Read(format!("Query on {table} failed: {e}")))?;

        let rows = stmt.query_map([], |row| PropertyRecord::from_row(row))?;

        let mut records = Vec::new();
        for r in rows {
            records.push(r?);
        }
        Ok(records)
    }

    pub fn close(self) -> MigrationResult<()> {
        self.conn
            .close()
            .map_err(|(_, e)| MigrationError::Connection(format!("Close source DB failed: {e}")))
    }
}
