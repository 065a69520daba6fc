use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Position;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWorkspace {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub color: String,
    pub owner_id: String,
}

/// Partial-field merge: only the fields that are `Some` are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateWorkspace {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
    pub members: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBoard {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub workspace_id: Uuid,
    pub owner_id: String,
    #[serde(default)]
    pub is_starred: bool,
    #[serde(default)]
    pub background_image: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateBoard {
    pub name: Option<String>,
    pub description: Option<String>,
    pub members: Option<HashMap<String, String>>,
    pub is_starred: Option<bool>,
    pub background_image: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateNote {
    pub content: String,
    pub position: Position,
    pub color: String,
    pub board_id: Uuid,
    pub owner_id: String,
    #[serde(default)]
    pub is_pinned: bool,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateNote {
    pub content: Option<String>,
    pub position: Option<Position>,
    pub color: Option<String>,
    pub is_pinned: Option<bool>,
    pub images: Option<Vec<String>>,
}

/// One page of a paginated listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Opaque cursor for the next page; `None` on the last page. Cursors
    /// are tied to the newest-first sort order and are not portable
    /// across sort changes.
    pub next_cursor: Option<String>,
}
