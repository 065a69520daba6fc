use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Board, Note, Workspace};

/// Message published on the internal change bus after every completed
/// mutation. Carries only the scope whose materialized list changed;
/// watchers re-query and deliver full snapshots, never diffs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// The workspace list of this owner changed.
    Workspaces { owner_id: String },

    /// The board list of this workspace changed.
    Boards { workspace_id: Uuid },

    /// The note list of this board changed.
    Notes { board_id: Uuid },
}

impl ChangeEvent {
    /// The scope identifier this event invalidates, as a string.
    pub fn scope(&self) -> String {
        match self {
            Self::Workspaces { owner_id } => owner_id.clone(),
            Self::Boards { workspace_id } => workspace_id.to_string(),
            Self::Notes { board_id } => board_id.to_string(),
        }
    }
}

/// Commands sent FROM client TO server over the WebSocket gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Watch the workspace list of an owner.
    WatchWorkspaces { owner_id: String },

    /// Watch the board list of a workspace.
    WatchBoards { workspace_id: Uuid },

    /// Watch the note list of a board.
    WatchNotes { board_id: Uuid },
}

/// Events sent over the WebSocket gateway: fully re-materialized,
/// newest-first snapshots of the watched scope.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    WorkspaceSnapshot {
        owner_id: String,
        workspaces: Vec<Workspace>,
    },

    BoardSnapshot {
        workspace_id: Uuid,
        boards: Vec<Board>,
    },

    NoteSnapshot {
        board_id: Uuid,
        notes: Vec<Note>,
    },
}
