pub mod blobs;
pub mod cache;
pub mod error;
pub mod feed;
mod migrations;
mod queries;
mod rows;

mod boards;
mod notes;
mod workspaces;

pub use blobs::{BlobStore, board_background_key, note_image_key};
pub use boards::Boards;
pub use cache::{CacheKey, CachedList, Clock, DEFAULT_TTL, ManualClock, QueryCache, SystemClock};
pub use error::{ErrorKind, StoreError};
pub use feed::ChangeFeed;
pub use notes::Notes;
pub use workspaces::Workspaces;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::info;

use crate::error::RawError;

/// Handle to the SQLite-backed document store.
///
/// The connection is wrapped in a `Mutex` and shared between clones;
/// queries go through `with_conn`. WAL mode keeps concurrent reads cheap.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)
            .map_err(|e| RawError::from(e).tag("store-open-error"))?;
        let db = Self::init(conn)?;
        info!("Database opened at {}", path.display());
        Ok(db)
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| RawError::from(e).tag("store-open-error"))?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        let setup = || -> Result<(), rusqlite::Error> {
            // WAL mode for concurrent reads
            conn.pragma_update(None, "journal_mode", "WAL")?;
            migrations::run(&conn)
        };
        setup().map_err(|e| RawError::from(e).tag("store-open-error"))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub(crate) fn with_conn<T, F>(&self, f: F) -> Result<T, RawError>
    where
        F: FnOnce(&Connection) -> Result<T, RawError>,
    {
        let conn: MutexGuard<'_, Connection> =
            self.conn.lock().map_err(|_| RawError::Poisoned)?;
        f(&conn)
    }
}

/// The data-access layer: entity services sharing one database handle,
/// one query cache, and one change feed.
#[derive(Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

pub(crate) struct StoreInner {
    pub(crate) db: Database,
    pub(crate) cache: QueryCache,
    pub(crate) feed: ChangeFeed,
}

impl Store {
    pub fn new(db: Database) -> Self {
        Self::with_cache(db, QueryCache::new())
    }

    /// Build a store around an injected cache. Tests pass a cache driven
    /// by a [`ManualClock`].
    pub fn with_cache(db: Database, cache: QueryCache) -> Self {
        Self {
            inner: Arc::new(StoreInner {
                db,
                cache,
                feed: ChangeFeed::new(),
            }),
        }
    }

    pub fn workspaces(&self) -> Workspaces {
        Workspaces {
            inner: self.inner.clone(),
        }
    }

    pub fn boards(&self) -> Boards {
        Boards {
            inner: self.inner.clone(),
        }
    }

    pub fn notes(&self) -> Notes {
        Notes {
            inner: self.inner.clone(),
        }
    }
}
