use rusqlite::Connection;
use tracing::info;

/// The modeled document store is schemaless and enforces no referential
/// integrity; cascades are explicit in the delete operations, so no
/// foreign keys are declared here. Member maps and image lists are stored
/// as JSON text, timestamps as RFC 3339 text written by the store layer.
pub fn run(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS workspaces (
            id          TEXT PRIMARY KEY,
            name        TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            color       TEXT NOT NULL DEFAULT '',
            owner_id    TEXT NOT NULL,
            members     TEXT NOT NULL DEFAULT '{}',
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_workspaces_owner
            ON workspaces(owner_id, created_at);

        CREATE TABLE IF NOT EXISTS boards (
            id               TEXT PRIMARY KEY,
            name             TEXT NOT NULL,
            description      TEXT NOT NULL DEFAULT '',
            workspace_id     TEXT NOT NULL,
            owner_id         TEXT NOT NULL,
            members          TEXT NOT NULL DEFAULT '{}',
            is_starred       INTEGER NOT NULL DEFAULT 0,
            background_image TEXT,
            created_at       TEXT NOT NULL,
            updated_at       TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_boards_workspace
            ON boards(workspace_id, created_at);

        CREATE TABLE IF NOT EXISTS notes (
            id          TEXT PRIMARY KEY,
            content     TEXT NOT NULL,
            pos_x       REAL NOT NULL DEFAULT 0,
            pos_y       REAL NOT NULL DEFAULT 0,
            color       TEXT NOT NULL DEFAULT '',
            board_id    TEXT NOT NULL,
            owner_id    TEXT NOT NULL,
            is_pinned   INTEGER NOT NULL DEFAULT 0,
            images      TEXT NOT NULL DEFAULT '[]',
            created_at  TEXT NOT NULL,
            updated_at  TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_notes_board
            ON notes(board_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
