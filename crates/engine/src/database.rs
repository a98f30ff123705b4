//! The in-memory database handle.

use crate::error::{ErrorKind, Result};
use crate::{Params, Row, Value, snapshot};
use exn::ResultExt;
use rusqlite::{Batch, Connection};
use rusqlite::types::Value as SqlValue;
use tracing::instrument;

/// A live in-memory SQLite database.
///
/// Owns its connection exclusively. Dropping a `Database` closes it;
/// [`close()`](Self::close) does the same but reports failures.
#[derive(Debug)]
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open a new, empty in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().or_raise(|| ErrorKind::Open)?;
        Ok(Self { conn })
    }

    /// Open a new in-memory database filled from a snapshot image.
    ///
    /// An empty image yields an empty database. Anything else must be a valid
    /// SQLite image or [`CorruptSnapshot`](ErrorKind::CorruptSnapshot) is
    /// returned.
    #[instrument(skip(image), fields(bytes = image.len()))]
    pub fn from_snapshot(image: &[u8]) -> Result<Self> {
        let mut db = Self::open_in_memory()?;
        if !image.is_empty() {
            snapshot::restore(&mut db.conn, image)?;
        }
        Ok(db)
    }

    /// Serialize the whole database into a snapshot image.
    #[instrument(skip(self))]
    pub fn snapshot(&self) -> Result<Vec<u8>> {
        let image = snapshot::serialize(&self.conn)?;
        tracing::trace!(bytes = image.len(), "Serialized database");
        Ok(image)
    }

    /// Run one statement and collect its result rows.
    ///
    /// `sql` must hold exactly one statement; text after it (other than
    /// whitespace and comments) is rejected before anything runs. Statements
    /// that produce no rows (DDL, DML without `RETURNING`, transaction
    /// control) return an empty vector, and so does text with no statement.
    #[instrument(level = "debug", skip(self, params))]
    pub fn query(&self, sql: &str, params: &Params) -> Result<Vec<Row>> {
        let mut batch = Batch::new(&self.conn, sql);
        let Some(mut statement) = batch.next().map_err(Self::statement_error)? else {
            return Ok(Vec::new());
        };
        if !matches!(batch.next(), Ok(None)) {
            exn::bail!(ErrorKind::Statement(
                "multiple statements in one call; send them one at a time".to_string()
            ));
        }
        let columns: Vec<String> = statement.column_names().into_iter().map(String::from).collect();
        params.bind(&mut statement)?;

        let mut rows = statement.raw_query();
        let mut results = Vec::new();
        while let Some(row) = rows.next().map_err(Self::statement_error)? {
            let mut values = Vec::with_capacity(columns.len());
            for (index, name) in columns.iter().enumerate() {
                let value: SqlValue = row.get(index).map_err(Self::statement_error)?;
                values.push((name.clone(), Value::from(value)));
            }
            results.push(Row::new(values));
        }
        tracing::trace!(rows = results.len(), "Statement complete");
        Ok(results)
    }

    /// Whether SQLite itself considers a transaction open.
    pub fn in_transaction(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Close the database, releasing its memory.
    pub fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, err)| err).or_raise(|| ErrorKind::Close)
    }

    fn statement_error(err: rusqlite::Error) -> ErrorKind {
        ErrorKind::Statement(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        db.query("CREATE TABLE t (id INTEGER PRIMARY KEY, name TEXT, score REAL)", &Params::None).unwrap();
        db.query("INSERT INTO t (name, score) VALUES ('one', 1.5), ('two', NULL)", &Params::None).unwrap();
        db
    }

    #[test]
    fn test_query_returns_rows_in_column_order() {
        let rows = seeded().query("SELECT name, id FROM t ORDER BY id", &Params::None).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].columns().collect::<Vec<_>>(), ["name", "id"]);
        assert_eq!(rows[0].get("name"), Some(&Value::from("one")));
        assert_eq!(rows[1].get("id"), Some(&Value::Integer(2)));
    }

    #[test]
    fn test_query_without_rows() {
        let rows = seeded().query("UPDATE t SET score = 0", &Params::None).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_positional_params() {
        let db = seeded();
        db.query("INSERT INTO t (name, score) VALUES (?, ?)", &Params::positional([Value::from("three"), Value::Real(3.0)]))
            .unwrap();
        let rows = db.query("SELECT score FROM t WHERE name = ?1", &Params::positional(["three"])).unwrap();
        assert_eq!(rows[0].get("score"), Some(&Value::Real(3.0)));
    }

    #[test]
    fn test_named_params_with_and_without_prefix() {
        let db = seeded();
        let rows = db.query("SELECT id FROM t WHERE name = :name", &Params::named([("name", "two")])).unwrap();
        assert_eq!(rows[0].get("id"), Some(&Value::Integer(2)));
        let rows = db.query("SELECT id FROM t WHERE name = @name", &Params::named([("@name", "one")])).unwrap();
        assert_eq!(rows[0].get("id"), Some(&Value::Integer(1)));
    }

    #[test]
    fn test_parameter_mismatch() {
        let db = seeded();
        let err = db.query("SELECT * FROM t WHERE id = ?", &Params::None).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Parameters(_)));
        let err = db.query("SELECT * FROM t WHERE id = :id", &Params::named([("nope", 1i64)])).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Parameters(_)));
    }

    #[test]
    fn test_multiple_statements_are_rejected() {
        let db = seeded();
        let err = db.query("CREATE TABLE a (x); CREATE TABLE b (y)", &Params::None).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Statement(message) if message.contains("multiple statements")));

        // Nothing ran, not even the first statement.
        let tables = db.query("SELECT name FROM sqlite_master WHERE name IN ('a', 'b')", &Params::None).unwrap();
        assert!(tables.is_empty());

        let err = db.query("BEGIN; INSERT INTO t (name) VALUES ('x'); COMMIT", &Params::None).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Statement(_)));
        assert!(!db.in_transaction());
    }

    #[test]
    fn test_trailing_separator_and_comment_are_allowed() {
        let db = seeded();
        let rows = db.query("SELECT count(*) AS n FROM t; -- two rows\n", &Params::None).unwrap();
        assert_eq!(rows[0].get("n"), Some(&Value::Integer(2)));
        assert!(db.query("  ", &Params::None).unwrap().is_empty());
    }

    #[test]
    fn test_statement_error_carries_message() {
        let err = seeded().query("SELECT * FROM missing", &Params::None).unwrap_err();
        match &*err {
            ErrorKind::Statement(message) => assert!(message.contains("no such table"), "{message}"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_snapshot_round_trip() {
        let original = seeded();
        original.query("CREATE INDEX t_name ON t (name)", &Params::None).unwrap();
        let image = original.snapshot().unwrap();
        let restored = Database::from_snapshot(&image).unwrap();
        let select = "SELECT * FROM t ORDER BY id";
        assert_eq!(restored.query(select, &Params::None).unwrap(), original.query(select, &Params::None).unwrap());
        let indexes = restored.query("SELECT name FROM sqlite_master WHERE type = 'index'", &Params::None).unwrap();
        assert_eq!(indexes[0].get("name"), Some(&Value::from("t_name")));
    }

    #[test]
    fn test_empty_snapshot_is_empty_database() {
        let db = Database::from_snapshot(&[]).unwrap();
        let rows = db.query("SELECT count(*) AS n FROM sqlite_master", &Params::None).unwrap();
        assert_eq!(rows[0].get("n"), Some(&Value::Integer(0)));
    }

    #[test]
    fn test_corrupt_snapshot() {
        let err = Database::from_snapshot(b"SQLite format 3\0but the rest is garbage").unwrap_err();
        assert!(matches!(&*err, ErrorKind::CorruptSnapshot));
    }

    #[test]
    fn test_in_transaction() {
        let db = seeded();
        assert!(!db.in_transaction());
        db.query("BEGIN", &Params::None).unwrap();
        assert!(db.in_transaction());
        db.query("ROLLBACK", &Params::None).unwrap();
        assert!(!db.in_transaction());
        db.close().unwrap();
    }
}
