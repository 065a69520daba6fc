use pinwall_types::models::EntityKind;
use thiserror::Error;
use uuid::Uuid;

/// Failure category, for callers that branch on behavior rather than on
/// the exact code string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The target document does not exist.
    NotFound,
    /// The underlying document store failed.
    Database,
    /// A stored document or cursor could not be decoded.
    Corrupt,
    /// The blob store failed.
    Storage,
}

/// Structured error for every store operation: a fixed machine-readable
/// code plus a human-readable message. Failures are terminal for the call;
/// nothing in this layer retries.
#[derive(Debug, Error)]
#[error("{message} [{code}]")]
pub struct StoreError {
    code: &'static str,
    message: String,
    kind: ErrorKind,
    #[source]
    source: Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == ErrorKind::NotFound
    }

    pub(crate) fn not_found(entity: EntityKind, id: Uuid) -> Self {
        let code = match entity {
            EntityKind::Workspace => "workspace-not-found",
            EntityKind::Board => "board-not-found",
            EntityKind::Note => "note-not-found",
        };
        Self {
            code,
            message: format!("{} {} does not exist", entity.as_str(), id),
            kind: ErrorKind::NotFound,
            source: None,
        }
    }

    pub(crate) fn blob_not_found(key: &str) -> Self {
        Self {
            code: "blob-not-found",
            message: format!("blob {key} does not exist"),
            kind: ErrorKind::NotFound,
            source: None,
        }
    }

    pub(crate) fn storage(code: &'static str, source: std::io::Error) -> Self {
        Self {
            code,
            message: "blob storage operation failed".into(),
            kind: ErrorKind::Storage,
            source: Some(Box::new(source)),
        }
    }

    pub(crate) fn invalid(code: &'static str, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            kind: ErrorKind::Corrupt,
            source: None,
        }
    }

    pub(crate) fn join(source: tokio::task::JoinError) -> Self {
        Self {
            code: "task-join-error",
            message: "background task failed".into(),
            kind: ErrorKind::Database,
            source: Some(Box::new(source)),
        }
    }
}

/// Low-level failure from the SQLite layer, before an operation code is
/// attached. Query helpers return this; the public operations tag it.
#[derive(Debug, Error)]
pub(crate) enum RawError {
    #[error(transparent)]
    Db(#[from] rusqlite::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Id(#[from] uuid::Error),
    #[error(transparent)]
    Time(#[from] chrono::ParseError),
    #[error("database lock poisoned")]
    Poisoned,
}

impl RawError {
    pub(crate) fn tag(self, code: &'static str) -> StoreError {
        let (kind, source): (
            ErrorKind,
            Option<Box<dyn std::error::Error + Send + Sync + 'static>>,
        ) = match self {
            Self::Db(e) => (ErrorKind::Database, Some(Box::new(e))),
            Self::Json(e) => (ErrorKind::Corrupt, Some(Box::new(e))),
            Self::Id(e) => (ErrorKind::Corrupt, Some(Box::new(e))),
            Self::Time(e) => (ErrorKind::Corrupt, Some(Box::new(e))),
            Self::Poisoned => (ErrorKind::Database, None),
        };
        let message = match kind {
            ErrorKind::Database => "document store operation failed",
            ErrorKind::Corrupt => "stored document could not be decoded",
            // Storage and NotFound never come through RawError.
            ErrorKind::Storage | ErrorKind::NotFound => "store operation failed",
        };
        StoreError {
            code,
            message: message.into(),
            kind,
            source,
        }
    }
}
