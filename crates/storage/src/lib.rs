//! Remote storage collaborators for a cached database handle.
//!
//! A cached handle needs three capabilities from wherever its snapshot
//! lives: fetch the current bytes ([`BlobSource`]), push new bytes
//! ([`BlobSink`]) and cheaply ask whether anything changed
//! ([`VersionOracle`]). Backends in [`backend`] implement all three for one
//! object; the adapters in this crate turn plain async closures into any one
//! of them.

pub mod backend;
pub mod error;
mod func;
mod key;
mod tag;

pub use crate::backend::{Blob, BlobSink, BlobSource, VersionOracle};
pub use crate::func::{FnOracle, FnSink, FnSource, oracle_fn, sink_fn, source_fn};
pub use crate::key::validate as validate_key;
pub use crate::tag::VersionTag;
use std::sync::Arc;

pub type BlobHandle = Arc<dyn Blob>;
pub type SourceHandle = Arc<dyn BlobSource>;
pub type SinkHandle = Arc<dyn BlobSink>;
pub type OracleHandle = Arc<dyn VersionOracle>;
