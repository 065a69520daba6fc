use pinwall_types::api::{Page, UpdateBoard, UpdateNote, UpdateWorkspace};
use pinwall_types::models::{Board, EntityKind, Note, Workspace};
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::Database;
use crate::error::{RawError, StoreError};
use crate::rows::{
    BoardRow, NoteRow, WorkspaceRow, fmt_ts, images_to_json, members_to_json,
};

/// Opaque keyset cursor: the (created_at, rowid) pair of the last document
/// of the previous page. Valid only for the newest-first sort order.
#[derive(Debug, Clone)]
pub(crate) struct PageCursor {
    created_at: String,
    rowid: i64,
}

impl PageCursor {
    pub(crate) fn encode(created_at: &str, rowid: i64) -> String {
        format!("{created_at}|{rowid}")
    }

    pub(crate) fn decode(raw: &str) -> Option<Self> {
        let (created_at, rowid) = raw.split_once('|')?;
        let rowid = rowid.parse().ok()?;
        (!created_at.is_empty()).then(|| Self {
            created_at: created_at.to_string(),
            rowid,
        })
    }
}

/// Result of a cascading board delete.
pub(crate) struct BoardDeletion {
    pub workspace_id: Uuid,
    pub notes_deleted: usize,
}

/// Result of a workspace delete. The cascade stops at boards; any notes
/// under those boards are left behind and only counted here.
pub(crate) struct WorkspaceDeletion {
    pub owner_id: String,
    pub boards_deleted: usize,
    pub notes_orphaned: usize,
}

impl Database {
    // -- Workspaces --

    pub(crate) fn list_workspaces(&self, owner_id: &str) -> Result<Vec<Workspace>, StoreError> {
        self.with_conn(|conn| query_workspaces(conn, owner_id))
            .map_err(|e| e.tag("workspace-list-error"))
    }

    pub(crate) fn insert_workspace(&self, ws: &Workspace) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO workspaces (id, name, description, color, owner_id, members, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    ws.id.to_string(),
                    ws.name,
                    ws.description,
                    ws.color,
                    ws.owner_id,
                    members_to_json(&ws.members)?,
                    fmt_ts(ws.created_at),
                    fmt_ts(ws.updated_at),
                ],
            )?;
            Ok(())
        })
        .map_err(|e| e.tag("workspace-create-error"))
    }

    /// Merge the provided fields; returns the owner id for cache scoping.
    /// A zero-rows-affected update surfaces as not-found; there is no
    /// read-before-write existence check.
    pub(crate) fn update_workspace(
        &self,
        id: Uuid,
        updates: &UpdateWorkspace,
    ) -> Result<String, StoreError> {
        self.with_conn(|conn| {
            let members = updates.members.as_ref().map(members_to_json).transpose()?;
            let affected = conn.execute(
                "UPDATE workspaces SET
                    name        = COALESCE(?2, name),
                    description = COALESCE(?3, description),
                    color       = COALESCE(?4, color),
                    members     = COALESCE(?5, members),
                    updated_at  = ?6
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    updates.name,
                    updates.description,
                    updates.color,
                    members,
                    fmt_ts(chrono::Utc::now()),
                ],
            )?;
            if affected == 0 {
                return Ok(None);
            }
            let owner_id = conn.query_row(
                "SELECT owner_id FROM workspaces WHERE id = ?1",
                [id.to_string()],
                |row| row.get(0),
            )?;
            Ok(Some(owner_id))
        })
        .map_err(|e| e.tag("workspace-update-error"))?
        .ok_or_else(|| StoreError::not_found(EntityKind::Workspace, id))
    }

    /// Delete a workspace and its boards in one transaction. Notes under
    /// those boards are NOT touched, matching the persisted-data contract;
    /// the caller gets their count to flag the orphans.
    pub(crate) fn delete_workspace(&self, id: Uuid) -> Result<WorkspaceDeletion, StoreError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let owner_id: Option<String> = tx
                .query_row(
                    "SELECT owner_id FROM workspaces WHERE id = ?1",
                    [id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(owner_id) = owner_id else {
                return Ok(None);
            };
            let notes_orphaned: i64 = tx.query_row(
                "SELECT COUNT(*) FROM notes
                 WHERE board_id IN (SELECT id FROM boards WHERE workspace_id = ?1)",
                [id.to_string()],
                |row| row.get(0),
            )?;
            let boards_deleted =
                tx.execute("DELETE FROM boards WHERE workspace_id = ?1", [id.to_string()])?;
            tx.execute("DELETE FROM workspaces WHERE id = ?1", [id.to_string()])?;
            tx.commit()?;
            Ok(Some(WorkspaceDeletion {
                owner_id,
                boards_deleted,
                notes_orphaned: notes_orphaned as usize,
            }))
        })
        .map_err(|e| e.tag("workspace-delete-error"))?
        .ok_or_else(|| StoreError::not_found(EntityKind::Workspace, id))
    }

    // -- Boards --

    /// Full (unpaginated) board list of a workspace, used by watchers.
    pub(crate) fn list_boards(&self, workspace_id: Uuid) -> Result<Vec<Board>, StoreError> {
        self.with_conn(|conn| {
            let rows = query_board_rows(conn, workspace_id, None, None)?;
            rows.into_iter().map(BoardRow::into_board).collect()
        })
        .map_err(|e| e.tag("board-list-error"))
    }

    pub(crate) fn list_boards_page(
        &self,
        workspace_id: Uuid,
        limit: usize,
        cursor: Option<PageCursor>,
    ) -> Result<Page<Board>, StoreError> {
        self.with_conn(|conn| {
            // Fetch one extra row to learn whether another page exists.
            let mut rows =
                query_board_rows(conn, workspace_id, Some(limit + 1), cursor.as_ref())?;
            let has_more = rows.len() > limit;
            rows.truncate(limit);
            let next_cursor = if has_more {
                rows.last()
                    .map(|row| PageCursor::encode(&row.created_at, row.rowid))
            } else {
                None
            };
            let items = rows
                .into_iter()
                .map(BoardRow::into_board)
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Page { items, next_cursor })
        })
        .map_err(|e| e.tag("board-list-error"))
    }

    pub(crate) fn get_board(&self, id: Uuid) -> Result<Board, StoreError> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT rowid, id, name, description, workspace_id, owner_id, members,
                            is_starred, background_image, created_at, updated_at
                     FROM boards WHERE id = ?1",
                    [id.to_string()],
                    BoardRow::from_sql,
                )
                .optional()?;
            row.map(BoardRow::into_board).transpose()
        })
        .map_err(|e| e.tag("board-get-error"))?
        .ok_or_else(|| StoreError::not_found(EntityKind::Board, id))
    }

    pub(crate) fn insert_board(&self, board: &Board) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO boards (id, name, description, workspace_id, owner_id, members,
                                     is_starred, background_image, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    board.id.to_string(),
                    board.name,
                    board.description,
                    board.workspace_id.to_string(),
                    board.owner_id,
                    members_to_json(&board.members)?,
                    board.is_starred,
                    board.background_image,
                    fmt_ts(board.created_at),
                    fmt_ts(board.updated_at),
                ],
            )?;
            Ok(())
        })
        .map_err(|e| e.tag("board-create-error"))
    }

    /// Merge update; returns the parent workspace id for cache scoping.
    pub(crate) fn update_board(&self, id: Uuid, updates: &UpdateBoard) -> Result<Uuid, StoreError> {
        self.with_conn(|conn| {
            let members = updates.members.as_ref().map(members_to_json).transpose()?;
            let affected = conn.execute(
                "UPDATE boards SET
                    name             = COALESCE(?2, name),
                    description      = COALESCE(?3, description),
                    members          = COALESCE(?4, members),
                    is_starred       = COALESCE(?5, is_starred),
                    background_image = COALESCE(?6, background_image),
                    updated_at       = ?7
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    updates.name,
                    updates.description,
                    members,
                    updates.is_starred,
                    updates.background_image,
                    fmt_ts(chrono::Utc::now()),
                ],
            )?;
            if affected == 0 {
                return Ok(None);
            }
            let workspace_id: String = conn.query_row(
                "SELECT workspace_id FROM boards WHERE id = ?1",
                [id.to_string()],
                |row| row.get(0),
            )?;
            Ok(Some(workspace_id.parse()?))
        })
        .map_err(|e| e.tag("board-update-error"))?
        .ok_or_else(|| StoreError::not_found(EntityKind::Board, id))
    }

    /// Atomic cascade: assert the board exists, delete it, delete every
    /// note under it, all in one transaction, so a partial failure rolls
    /// the whole thing back.
    pub(crate) fn delete_board(&self, id: Uuid) -> Result<BoardDeletion, StoreError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let workspace_id: Option<String> = tx
                .query_row(
                    "SELECT workspace_id FROM boards WHERE id = ?1",
                    [id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(workspace_id) = workspace_id else {
                return Ok(None);
            };
            let notes_deleted =
                tx.execute("DELETE FROM notes WHERE board_id = ?1", [id.to_string()])?;
            tx.execute("DELETE FROM boards WHERE id = ?1", [id.to_string()])?;
            tx.commit()?;
            Ok(Some(BoardDeletion {
                workspace_id: workspace_id.parse()?,
                notes_deleted,
            }))
        })
        .map_err(|e| e.tag("board-delete-error"))?
        .ok_or_else(|| StoreError::not_found(EntityKind::Board, id))
    }

    // -- Notes --

    pub(crate) fn list_notes(&self, board_id: Uuid) -> Result<Vec<Note>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, content, pos_x, pos_y, color, board_id, owner_id, is_pinned,
                        images, created_at, updated_at
                 FROM notes WHERE board_id = ?1
                 ORDER BY created_at DESC, rowid DESC",
            )?;
            let rows = stmt
                .query_map([board_id.to_string()], NoteRow::from_sql)?
                .collect::<Result<Vec<_>, _>>()?;
            rows.into_iter().map(NoteRow::into_note).collect()
        })
        .map_err(|e| e.tag("note-list-error"))
    }

    pub(crate) fn insert_note(&self, note: &Note) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO notes (id, content, pos_x, pos_y, color, board_id, owner_id,
                                    is_pinned, images, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    note.id.to_string(),
                    note.content,
                    note.position.x,
                    note.position.y,
                    note.color,
                    note.board_id.to_string(),
                    note.owner_id,
                    note.is_pinned,
                    images_to_json(&note.images)?,
                    fmt_ts(note.created_at),
                    fmt_ts(note.updated_at),
                ],
            )?;
            Ok(())
        })
        .map_err(|e| e.tag("note-create-error"))
    }

    /// Merge update; returns the parent board id for cache scoping.
    pub(crate) fn update_note(&self, id: Uuid, updates: &UpdateNote) -> Result<Uuid, StoreError> {
        self.with_conn(|conn| {
            let images = updates.images.as_deref().map(images_to_json).transpose()?;
            let affected = conn.execute(
                "UPDATE notes SET
                    content    = COALESCE(?2, content),
                    pos_x      = COALESCE(?3, pos_x),
                    pos_y      = COALESCE(?4, pos_y),
                    color      = COALESCE(?5, color),
                    is_pinned  = COALESCE(?6, is_pinned),
                    images     = COALESCE(?7, images),
                    updated_at = ?8
                 WHERE id = ?1",
                params![
                    id.to_string(),
                    updates.content,
                    updates.position.map(|p| p.x),
                    updates.position.map(|p| p.y),
                    updates.color,
                    updates.is_pinned,
                    images,
                    fmt_ts(chrono::Utc::now()),
                ],
            )?;
            if affected == 0 {
                return Ok(None);
            }
            let board_id: String = conn.query_row(
                "SELECT board_id FROM notes WHERE id = ?1",
                [id.to_string()],
                |row| row.get(0),
            )?;
            Ok(Some(board_id.parse()?))
        })
        .map_err(|e| e.tag("note-update-error"))?
        .ok_or_else(|| StoreError::not_found(EntityKind::Note, id))
    }

    /// Delete one note; returns the parent board id for cache scoping.
    pub(crate) fn delete_note(&self, id: Uuid) -> Result<Uuid, StoreError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let board_id: Option<String> = tx
                .query_row(
                    "SELECT board_id FROM notes WHERE id = ?1",
                    [id.to_string()],
                    |row| row.get(0),
                )
                .optional()?;
            let Some(board_id) = board_id else {
                return Ok(None);
            };
            tx.execute("DELETE FROM notes WHERE id = ?1", [id.to_string()])?;
            tx.commit()?;
            Ok(Some(board_id.parse()?))
        })
        .map_err(|e| e.tag("note-delete-error"))?
        .ok_or_else(|| StoreError::not_found(EntityKind::Note, id))
    }
}

fn query_workspaces(conn: &Connection, owner_id: &str) -> Result<Vec<Workspace>, RawError> {
    let mut stmt = conn.prepare(
        "SELECT id, name, description, color, owner_id, members, created_at, updated_at
         FROM workspaces WHERE owner_id = ?1
         ORDER BY created_at DESC, rowid DESC",
    )?;
    let rows = stmt
        .query_map([owner_id], WorkspaceRow::from_sql)?
        .collect::<Result<Vec<_>, _>>()?;
    rows.into_iter().map(WorkspaceRow::into_workspace).collect()
}

fn query_board_rows(
    conn: &Connection,
    workspace_id: Uuid,
    limit: Option<usize>,
    cursor: Option<&PageCursor>,
) -> Result<Vec<BoardRow>, RawError> {
    let limit = limit.map(|n| n as i64).unwrap_or(-1);
    let rows = match cursor {
        None => {
            let mut stmt = conn.prepare(
                "SELECT rowid, id, name, description, workspace_id, owner_id, members,
                        is_starred, background_image, created_at, updated_at
                 FROM boards WHERE workspace_id = ?1
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?2",
            )?;
            stmt.query_map(params![workspace_id.to_string(), limit], BoardRow::from_sql)?
                .collect::<Result<Vec<_>, _>>()?
        }
        Some(cursor) => {
            let mut stmt = conn.prepare(
                "SELECT rowid, id, name, description, workspace_id, owner_id, members,
                        is_starred, background_image, created_at, updated_at
                 FROM boards WHERE workspace_id = ?1
                   AND (created_at < ?2 OR (created_at = ?2 AND rowid < ?3))
                 ORDER BY created_at DESC, rowid DESC
                 LIMIT ?4",
            )?;
            stmt.query_map(
                params![
                    workspace_id.to_string(),
                    cursor.created_at,
                    cursor.rowid,
                    limit
                ],
                BoardRow::from_sql,
            )?
            .collect::<Result<Vec<_>, _>>()?
        }
    };
    Ok(rows)
}
