mod schema;

use std::path::Path;

use anyhow::{Context, Result, bail};
use rusqlite::Connection;

use schema::{INITIAL_SCHEMA, SCHEMA_VERSION};

/// SQLite database holding locally stored review tags.
///
/// Opening a database enables foreign keys, which the cascading subtree
/// delete depends on, and creates the schema when missing.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens an in-memory database with a fresh schema.
    pub fn in_memory() -> Result<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    /// Opens (or creates) the database file at `path`.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or was written by a newer schema.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open(path)
            .with_context(|| format!("cannot open {}", path.display()))?;
        Self::prepare(conn)
    }

    fn prepare(conn: Connection) -> Result<Self> {
        conn.execute("PRAGMA foreign_keys = ON", [])?;

        let found: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
        if found > SCHEMA_VERSION {
            bail!(
                "database schema version {found} is newer than supported version {SCHEMA_VERSION}"
            );
        }

        conn.execute_batch(INITIAL_SCHEMA)?;
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        Ok(Self { conn })
    }

    /// Schema version stamped into the file.
    pub fn schema_version(&self) -> rusqlite::Result<i64> {
        self.conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))
    }

    /// Runs `f` in a transaction that commits only when `f` succeeds.
    ///
    /// Queries issued through [`Self::connection`] inside `f` see and join
    /// the transaction.
    pub fn atomically<T, E>(&self, f: impl FnOnce() -> Result<T, E>) -> Result<T, E>
    where
        E: From<rusqlite::Error>,
    {
        let tx = self.conn.unchecked_transaction()?;
        let value = f()?;
        tx.commit()?;
        Ok(value)
    }

    /// Returns the underlying connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn fresh_database_is_stamped_with_schema_version() {
        let db = Database::in_memory().unwrap();
        assert_eq!(db.schema_version().unwrap(), SCHEMA_VERSION);
    }

    #[test]
    fn newer_schema_is_refused() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("tags.db");
        Connection::open(&db_path)
            .unwrap()
            .pragma_update(None, "user_version", SCHEMA_VERSION + 1)
            .unwrap();

        let err = Database::open(&db_path).err().unwrap();

        assert!(err.to_string().contains("newer"));
    }

    #[test]
    fn failed_transaction_rolls_back() {
        let db = Database::in_memory().unwrap();

        let result: Result<(), rusqlite::Error> = db.atomically(|| {
            db.connection()
                .execute("INSERT INTO tags (review_id, name) VALUES (1, 'gone')", [])?;
            Err(rusqlite::Error::QueryReturnedNoRows)
        });

        assert!(result.is_err());
        let count: i64 = db
            .connection()
            .query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn schema_tables_exist() {
        let db = Database::in_memory().unwrap();

        let tables: Vec<String> = db
            .connection()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"tags".to_string()));
        assert!(tables.contains(&"study_tags".to_string()));
    }

    #[test]
    fn foreign_keys_enabled() {
        let db = Database::in_memory().unwrap();

        let fk_enabled: i32 = db
            .connection()
            .query_row("PRAGMA foreign_keys", [], |row| row.get(0))
            .unwrap();

        assert_eq!(fk_enabled, 1);
    }

    #[test]
    fn deleting_parent_cascades_to_children() {
        let db = Database::in_memory().unwrap();
        let conn = db.connection();
        conn.execute("INSERT INTO tags (review_id, name) VALUES (1, 'a')", [])
            .unwrap();
        let parent = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO tags (review_id, name, parent_tag) VALUES (1, 'b', ?1)",
            [parent],
        )
        .unwrap();

        conn.execute("DELETE FROM tags WHERE id = ?1", [parent]).unwrap();

        let remaining: i64 = conn
            .query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))
            .unwrap();
        assert_eq!(remaining, 0);
    }

    #[test]
    fn reopen_is_idempotent() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("tags.db");

        {
            let db = Database::open(&db_path).unwrap();
            db.connection()
                .execute("INSERT INTO tags (review_id, name) VALUES (1, 'kept')", [])
                .unwrap();
        }

        let db2 = Database::open(&db_path);
        assert!(db2.is_ok());

        let count: i32 = db2
            .unwrap()
            .connection()
            .query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);
    }
}
