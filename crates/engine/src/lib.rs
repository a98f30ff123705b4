//! In-memory SQLite handle.
//!
//! This crate owns the one piece of the system that actually runs SQL: an
//! in-memory SQLite database that can be filled from a snapshot image and
//! serialized back into one. It knows nothing about where snapshots come
//! from or when they should be written; that is the caller's business.
//!
//! # Snapshot format
//! A snapshot is a plain SQLite database image (`SQLite format 3\0` header),
//! byte-for-byte what `sqlite3 app.db .backup` would produce. Anything that
//! can open a SQLite file can open a snapshot. Images move in and out of the
//! connection without a staging file.

mod database;
pub mod error;
mod params;
mod row;
mod snapshot;
mod value;

pub use crate::database::Database;
pub use crate::params::Params;
pub use crate::row::Row;
pub use crate::value::Value;
