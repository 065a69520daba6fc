use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};
use pinwall_types::models::{Board, Note, Position, Workspace};

use crate::error::RawError;

/// Timestamp text as persisted: RFC 3339 with microseconds, so that the
/// lexicographic order of the column matches chronological order and a
/// parse/format round trip reproduces the stored text exactly (cursors
/// depend on this).
pub(crate) fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_ts(raw: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    raw.parse::<DateTime<Utc>>().or_else(|_| {
        // Second-granularity "YYYY-MM-DD HH:MM:SS" from rows written by
        // other tools; parse as naive UTC.
        chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|ndt| ndt.and_utc())
    })
}

pub(crate) fn members_to_json(members: &HashMap<String, String>) -> Result<String, RawError> {
    Ok(serde_json::to_string(members)?)
}

pub(crate) fn images_to_json(images: &[String]) -> Result<String, RawError> {
    Ok(serde_json::to_string(images)?)
}

/// Raw row shapes as read from SQLite. JSON document fields are decoded
/// in the `into_*` conversions.
#[derive(Debug, Clone)]
pub(crate) struct WorkspaceRow {
    pub id: String,
    pub name: String,
    pub description: String,
    pub color: String,
    pub owner_id: String,
    pub members: String,
    pub created_at: String,
    pub updated_at: String,
}

impl WorkspaceRow {
    pub(crate) fn from_sql(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            color: row.get(3)?,
            owner_id: row.get(4)?,
            members: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    pub(crate) fn into_workspace(self) -> Result<Workspace, RawError> {
        Ok(Workspace {
            id: self.id.parse()?,
            name: self.name,
            description: self.description,
            color: self.color,
            owner_id: self.owner_id,
            members: serde_json::from_str(&self.members)?,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

/// `rowid` rides along on reads: it breaks creation-timestamp ties in the
/// newest-first sort and anchors pagination cursors.
#[derive(Debug, Clone)]
pub(crate) struct BoardRow {
    pub rowid: i64,
    pub id: String,
    pub name: String,
    pub description: String,
    pub workspace_id: String,
    pub owner_id: String,
    pub members: String,
    pub is_starred: bool,
    pub background_image: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl BoardRow {
    pub(crate) fn from_sql(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            rowid: row.get(0)?,
            id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            workspace_id: row.get(4)?,
            owner_id: row.get(5)?,
            members: row.get(6)?,
            is_starred: row.get(7)?,
            background_image: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    pub(crate) fn into_board(self) -> Result<Board, RawError> {
        Ok(Board {
            id: self.id.parse()?,
            name: self.name,
            description: self.description,
            workspace_id: self.workspace_id.parse()?,
            owner_id: self.owner_id,
            members: serde_json::from_str(&self.members)?,
            is_starred: self.is_starred,
            background_image: self.background_image,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NoteRow {
    pub id: String,
    pub content: String,
    pub pos_x: f64,
    pub pos_y: f64,
    pub color: String,
    pub board_id: String,
    pub owner_id: String,
    pub is_pinned: bool,
    pub images: String,
    pub created_at: String,
    pub updated_at: String,
}

impl NoteRow {
    pub(crate) fn from_sql(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            content: row.get(1)?,
            pos_x: row.get(2)?,
            pos_y: row.get(3)?,
            color: row.get(4)?,
            board_id: row.get(5)?,
            owner_id: row.get(6)?,
            is_pinned: row.get(7)?,
            images: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    pub(crate) fn into_note(self) -> Result<Note, RawError> {
        Ok(Note {
            id: self.id.parse()?,
            content: self.content,
            position: Position {
                x: self.pos_x,
                y: self.pos_y,
            },
            color: self.color,
            board_id: self.board_id.parse()?,
            owner_id: self.owner_id,
            is_pinned: self.is_pinned,
            images: serde_json::from_str(&self.images)?,
            created_at: parse_ts(&self.created_at)?,
            updated_at: parse_ts(&self.updated_at)?,
        })
    }
}
