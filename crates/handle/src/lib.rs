//! A consistency-aware caching handle over a SQLite snapshot kept in a blob
//! store.
//!
//! Reads run against a local in-memory copy. Before every statement the
//! remote version is checked and the copy is reloaded when it changed.
//! Mutating statements outside an explicit transaction write the whole
//! database back.
//!
//! ```
//! use sqlblob_engine::{Params, Value};
//! use sqlblob_handle::{CachedHandle, Options};
//! use sqlblob_storage::backend::MemoryBlob;
//! use std::sync::Arc;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let blob = Arc::new(MemoryBlob::default());
//! let mut handle = CachedHandle::from_blob(blob.clone(), Options::default()).await;
//!
//! handle.query("CREATE TABLE notes (body TEXT)", &Params::None).await.unwrap();
//! handle.query("INSERT INTO notes VALUES (?)", &Params::positional(["hello"])).await.unwrap();
//! assert_eq!(blob.store_count(), 2);
//!
//! let rows = handle.query("SELECT body FROM notes", &Params::None).await.unwrap();
//! assert_eq!(rows[0].get("body"), Some(&Value::from("hello")));
//! # }
//! ```

mod classify;
pub mod error;
mod handle;
mod options;
mod transaction;

pub use classify::{Classification, Detection};
pub use handle::{CachedHandle, Outcome, Persistence};
pub use options::{AbsentTag, Options};
pub use transaction::TransactionState;
