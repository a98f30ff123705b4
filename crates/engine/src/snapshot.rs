//! Moving database images in and out of an in-memory connection.
//!
//! Both directions use `sqlite3_serialize` / `sqlite3_deserialize`, so the
//! image is exactly what SQLite itself would write to disk and never touches
//! the filesystem.

use crate::error::{ErrorKind, Result};
use exn::ResultExt;
use rusqlite::serialize::OwnedData;
use rusqlite::{Connection, DatabaseName, ffi};
use std::ptr::NonNull;

const HEADER: &[u8; 16] = b"SQLite format 3\0";

/// Replace the main database of `conn` with the given image.
///
/// SQLite accepts any buffer here, so the schema is read once afterwards to
/// make sure the image is actually usable.
pub(crate) fn restore(conn: &mut Connection, image: &[u8]) -> Result<()> {
    if !image.starts_with(HEADER) {
        exn::bail!(ErrorKind::CorruptSnapshot);
    }
    let data = sqlite_copy(image)?;
    conn.deserialize(DatabaseName::Main, data, false).or_raise(|| ErrorKind::CorruptSnapshot)?;
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| row.get::<_, i64>(0))
        .or_raise(|| ErrorKind::CorruptSnapshot)?;
    Ok(())
}

/// Serialize the main database of `conn` into an image.
pub(crate) fn serialize(conn: &Connection) -> Result<Vec<u8>> {
    let data = conn.serialize(DatabaseName::Main).or_raise(|| ErrorKind::Serialize)?;
    Ok(data.to_vec())
}

/// Copy `image` into a buffer owned by SQLite's allocator, which
/// `sqlite3_deserialize` takes ownership of.
fn sqlite_copy(image: &[u8]) -> Result<OwnedData> {
    let len = u64::try_from(image.len()).or_raise(|| ErrorKind::Allocation)?;
    // SAFETY: `sqlite3_malloc64` has no preconditions; a null return is
    // handled below.
    let ptr = unsafe { ffi::sqlite3_malloc64(len) }.cast::<u8>();
    let ptr = NonNull::new(ptr).ok_or_else(|| exn::Exn::from(ErrorKind::Allocation))?;
    // SAFETY: `ptr` points to `image.len()` freshly allocated bytes that
    // cannot overlap `image`, and it came from `sqlite3_malloc64` as
    // `OwnedData` requires.
    unsafe {
        std::ptr::copy_nonoverlapping(image.as_ptr(), ptr.as_ptr(), image.len());
        Ok(OwnedData::from_raw_nonnull(ptr, image.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_restore_rejects_non_sqlite() {
        let mut conn = Connection::open_in_memory().unwrap();
        let err = restore(&mut conn, b"definitely not a database").unwrap_err();
        assert!(matches!(&*err, ErrorKind::CorruptSnapshot));
    }

    #[test]
    fn test_restore_rejects_truncated_image() {
        let source = Connection::open_in_memory().unwrap();
        source.execute_batch("CREATE TABLE t (x INTEGER)").unwrap();
        let image = serialize(&source).unwrap();

        let mut conn = Connection::open_in_memory().unwrap();
        let err = restore(&mut conn, &image[..64]).unwrap_err();
        assert!(matches!(&*err, ErrorKind::CorruptSnapshot));
    }

    #[test]
    fn test_serialize_starts_with_header() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (x INTEGER)").unwrap();
        let image = serialize(&conn).unwrap();
        assert!(image.starts_with(HEADER));
        assert_eq!(image.len() % 512, 0);
    }

    #[test]
    fn test_restored_database_is_writable() {
        let source = Connection::open_in_memory().unwrap();
        source.execute_batch("PRAGMA page_size = 8192; CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (1)").unwrap();
        let image = serialize(&source).unwrap();

        let mut conn = Connection::open_in_memory().unwrap();
        restore(&mut conn, &image).unwrap();
        conn.execute_batch("INSERT INTO t VALUES (2)").unwrap();
        let count: i64 = conn.query_row("SELECT count(*) FROM t", [], |row| row.get(0)).unwrap();
        assert_eq!(count, 2);
        let page_size: i64 = conn.query_row("PRAGMA page_size", [], |row| row.get(0)).unwrap();
        assert_eq!(page_size, 8192);
    }
}
