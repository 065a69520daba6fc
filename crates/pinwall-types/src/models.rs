use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role label the store assigns to the owning member. Member roles are
/// free-text in the stored documents; this is the only label produced today.
pub const ROLE_OWNER: &str = "owner";

/// Top-level container owning boards and members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workspace {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub color: String,
    /// Identity-provider uid of the owning user. Identity lives outside
    /// the store, so member keys are opaque strings rather than entity ids.
    pub owner_id: String,
    /// uid -> role label. The owner is always present with role "owner".
    pub members: HashMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A canvas of notes, scoped to one workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Board {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub workspace_id: Uuid,
    pub owner_id: String,
    pub members: HashMap<String, String>,
    pub is_starred: bool,
    pub background_image: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Canvas coordinates of a note.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

/// A single content unit (text, image references) placed on a board.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub id: Uuid,
    pub content: String,
    pub position: Position,
    pub color: String,
    pub board_id: Uuid,
    pub owner_id: String,
    pub is_pinned: bool,
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The three persisted entity kinds. Used for cache tagging and for the
/// `<entity>-not-found` error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Workspace,
    Board,
    Note,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Workspace => "workspace",
            Self::Board => "board",
            Self::Note => "note",
        }
    }
}
