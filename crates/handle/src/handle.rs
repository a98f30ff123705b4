use crate::error::{Error, ErrorKind, Result};
use crate::{AbsentTag, Options, TransactionState};
use exn::ResultExt;
use sqlblob_engine::error::ErrorKind as EngineErrorKind;
use sqlblob_engine::{Database, Params, Row};
use sqlblob_storage::error::ErrorKind as StorageErrorKind;
use sqlblob_storage::{BlobHandle, OracleHandle, SinkHandle, SourceHandle, VersionTag};
use std::time::Instant;
use tracing::instrument;

/// What happened to the snapshot after a statement ran.
#[derive(Debug, Default)]
pub enum Persistence {
    /// The statement did not call for a write: it was read-only, failed, or
    /// ran inside an open transaction.
    #[default]
    Skipped,
    /// A snapshot of the database was handed to the sink.
    Stored,
    /// The sink (or serialization) failed. Local state is ahead of remote.
    Failed(Error),
}

/// Rows returned by a statement together with the persistence outcome.
#[derive(Debug)]
pub struct Outcome {
    pub rows: Vec<Row>,
    pub persistence: Persistence,
}

/// An in-memory database kept consistent with a snapshot held elsewhere.
///
/// Before every statement the version oracle is consulted. When the remote
/// tag differs from the cached one (or either is unknown) the local database
/// is thrown away and rebuilt from a freshly fetched snapshot. After a
/// mutating statement outside an explicit transaction, the whole database is
/// serialized and handed to the sink.
///
/// Statements are processed one at a time: every operation takes
/// `&mut self`.
pub struct CachedHandle {
    source: SourceHandle,
    sink: SinkHandle,
    oracle: Option<OracleHandle>,
    options: Options,
    database: Option<Database>,
    tag: Option<VersionTag>,
    transaction: TransactionState,
    generation: u64,
}

impl CachedHandle {
    /// Build a handle with default [`Options`] and load the initial snapshot.
    ///
    /// Never fails: a corrupt initial snapshot leaves the handle without a
    /// database, and statements report [`ErrorKind::MissingDatabase`] until
    /// the remote version changes.
    pub async fn open(source: SourceHandle, sink: SinkHandle, oracle: Option<OracleHandle>) -> Self {
        Self::open_with(source, sink, oracle, Options::default()).await
    }

    #[instrument(skip_all, fields(oracle = oracle.is_some()))]
    pub async fn open_with(
        source: SourceHandle,
        sink: SinkHandle,
        oracle: Option<OracleHandle>,
        options: Options,
    ) -> Self {
        let mut handle = Self {
            source,
            sink,
            oracle,
            options,
            database: None,
            tag: None,
            transaction: TransactionState::Idle,
            generation: 0,
        };
        handle.tag = read_tag(handle.oracle.as_ref()).await;
        if let Err(err) = handle.reload().await {
            tracing::warn!(error = ?err, "Initial snapshot could not be loaded");
        }
        handle
    }

    /// Use one backend as source, sink and oracle.
    pub async fn from_blob(blob: BlobHandle, options: Options) -> Self {
        let source: SourceHandle = blob.clone();
        let sink: SinkHandle = blob.clone();
        let oracle: OracleHandle = blob;
        Self::open_with(source, sink, Some(oracle), options).await
    }

    /// Run a statement and return its rows.
    ///
    /// A failed write-back is reported as [`ErrorKind::Persistence`] even
    /// though the statement itself took effect locally. Use
    /// [`execute()`](Self::execute) to get the rows regardless.
    pub async fn query(&mut self, statement: &str, params: &Params) -> Result<Vec<Row>> {
        let outcome = self.execute(statement, params).await?;
        match outcome.persistence {
            Persistence::Failed(err) => Err(err),
            Persistence::Skipped | Persistence::Stored => Ok(outcome.rows),
        }
    }

    /// Run a statement and report rows and persistence separately.
    #[instrument(skip(self, params), fields(generation))]
    pub async fn execute(&mut self, statement: &str, params: &Params) -> Result<Outcome> {
        self.ensure_fresh().await?;
        tracing::Span::current().record("generation", self.generation);

        let database = self.database.as_ref().ok_or_else(|| Error::from(ErrorKind::MissingDatabase))?;
        let result = database.query(statement, params);

        let class = self.options.detection.classify(statement);
        let previous = self.transaction;
        self.transaction = previous.next(class);
        if previous != self.transaction {
            tracing::debug!(from = ?previous, to = ?self.transaction, "Transaction state changed");
        }
        if database.in_transaction() == self.transaction.is_idle() {
            tracing::warn!(
                flag = ?self.transaction,
                engine = database.in_transaction(),
                "Transaction flag disagrees with the database"
            );
        }

        let rows = match result {
            Ok(rows) => rows,
            Err(err) => {
                let kind = ErrorKind::Execution {
                    statement: statement.to_string(),
                    message: (*err).to_string(),
                };
                return Err(err.raise(kind));
            },
        };

        let persistence = if class.mutates && self.transaction.is_idle() {
            self.persist().await
        } else {
            Persistence::Skipped
        };
        Ok(Outcome { rows, persistence })
    }

    /// The loaded database, if the last reload succeeded.
    pub fn database(&self) -> Option<&Database> {
        self.database.as_ref()
    }

    /// The version tag the local database is believed to match.
    pub fn version_tag(&self) -> Option<&VersionTag> {
        self.tag.as_ref()
    }

    pub fn transaction(&self) -> TransactionState {
        self.transaction
    }

    /// Number of successful reloads, including the initial load.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    /// Close the local database. Nothing is written back.
    pub fn close(mut self) -> Result<()> {
        match self.database.take() {
            Some(database) => database.close().or_raise(|| ErrorKind::Close),
            None => Ok(()),
        }
    }

    #[instrument(level = "debug", skip(self), fields(cached = ?self.tag))]
    async fn ensure_fresh(&mut self) -> Result<()> {
        let current = read_tag(self.oracle.as_ref()).await;
        let stale = match (&current, &self.tag) {
            (Some(current), Some(cached)) => current != cached,
            _ => true,
        };
        let keep = current.is_none() && self.options.absent_tag == AbsentTag::ReloadAndKeep;
        if !keep {
            self.tag = current;
        }
        if stale {
            self.reload().await?;
        }
        Ok(())
    }

    /// Replace the local database with one built from the current snapshot.
    ///
    /// The old database is closed before fetching. A failed fetch counts as
    /// an empty snapshot, unless the backend read the object and found it
    /// corrupt. A snapshot that cannot be loaded leaves the handle without a
    /// database.
    #[instrument(skip(self), fields(generation = self.generation))]
    async fn reload(&mut self) -> Result<()> {
        let started = Instant::now();
        if let Some(previous) = self.database.take()
            && let Err(err) = previous.close()
        {
            tracing::warn!(error = ?err, "Closing the previous database failed");
        }
        if !self.transaction.is_idle() {
            // The flag only follows statement text, so it stays set until the
            // caller's COMMIT or ROLLBACK arrives.
            tracing::warn!("Reloading inside a transaction; uncommitted statements are discarded");
        }

        let image = match self.source.fetch().await {
            Ok(Some(image)) => image,
            Ok(None) => Vec::new(),
            Err(err) if matches!(&*err, StorageErrorKind::Corrupt) => {
                return Err(err.raise(ErrorKind::CorruptSnapshot));
            },
            Err(err) => {
                tracing::warn!(error = ?err, "Snapshot fetch failed; starting from an empty database");
                Vec::new()
            },
        };

        let database = Database::from_snapshot(&image).map_err(|err| {
            let kind = match &*err {
                EngineErrorKind::CorruptSnapshot => ErrorKind::CorruptSnapshot,
                _ => ErrorKind::Reload,
            };
            err.raise(kind)
        })?;
        self.database = Some(database);
        self.generation += 1;
        tracing::debug!(
            generation = self.generation,
            bytes = image.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Reloaded database"
        );
        Ok(())
    }

    async fn persist(&mut self) -> Persistence {
        match self.store().await {
            Ok(()) => Persistence::Stored,
            Err(err) => {
                tracing::warn!(error = ?err, "Snapshot was not persisted");
                Persistence::Failed(err)
            },
        }
    }

    #[instrument(level = "debug", skip(self))]
    async fn store(&mut self) -> Result<()> {
        let image = match &self.database {
            Some(database) => database.snapshot().or_raise(|| ErrorKind::Persistence)?,
            None => exn::bail!(ErrorKind::MissingDatabase),
        };
        self.sink.store(&image).await.or_raise(|| ErrorKind::Persistence)?;
        tracing::debug!(bytes = image.len(), "Stored snapshot");

        if self.options.refresh_tag_after_store
            && let Some(tag) = read_tag(self.oracle.as_ref()).await
        {
            self.tag = Some(tag);
        }
        Ok(())
    }
}

/// Ask the oracle for the current tag. Failures and a missing oracle both
/// mean "unknown".
async fn read_tag(oracle: Option<&OracleHandle>) -> Option<VersionTag> {
    let oracle = oracle?;
    match oracle.version().await {
        Ok(tag) => tag,
        Err(err) => {
            tracing::warn!(error = ?err, "Version check failed");
            None
        },
    }
}
