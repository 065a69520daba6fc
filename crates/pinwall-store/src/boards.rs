use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures_util::stream::BoxStream;
use pinwall_types::api::{CreateBoard, Page, UpdateBoard};
use pinwall_types::events::ChangeEvent;
use pinwall_types::models::{Board, EntityKind, ROLE_OWNER};
use tracing::info;
use uuid::Uuid;

use crate::StoreInner;
use crate::cache::{CacheKey, CachedList};
use crate::error::StoreError;
use crate::feed;
use crate::queries::PageCursor;

/// Hard ceiling on one page of boards.
const MAX_PAGE_SIZE: usize = 200;

/// Board operations. Listings are paginated per workspace; each page is
/// cached under its own cursor.
#[derive(Clone)]
pub struct Boards {
    pub(crate) inner: Arc<StoreInner>,
}

impl Boards {
    pub const DEFAULT_PAGE_SIZE: usize = 50;

    /// One page of the workspace's boards, newest first. Pass the cursor
    /// from the previous page's `next_cursor` to continue.
    pub async fn list(
        &self,
        workspace_id: Uuid,
        limit: usize,
        cursor: Option<String>,
    ) -> Result<Page<Board>, StoreError> {
        let limit = limit.clamp(1, MAX_PAGE_SIZE);
        let decoded = match cursor.as_deref() {
            None => None,
            Some(raw) => Some(PageCursor::decode(raw).ok_or_else(|| {
                StoreError::invalid("invalid-cursor", format!("unrecognized page cursor {raw:?}"))
            })?),
        };
        let key = CacheKey::page(EntityKind::Board, workspace_id.to_string(), cursor);
        if let Some(CachedList::Boards(page)) = self.inner.cache.get(&key) {
            return Ok(page);
        }
        let db = self.inner.db.clone();
        let page = tokio::task::spawn_blocking(move || db.list_boards_page(workspace_id, limit, decoded))
            .await
            .map_err(StoreError::join)??;
        self.inner
            .cache
            .insert(key, CachedList::Boards(page.clone()));
        Ok(page)
    }

    /// Point read, always from the database.
    pub async fn get(&self, id: Uuid) -> Result<Board, StoreError> {
        let db = self.inner.db.clone();
        tokio::task::spawn_blocking(move || db.get_board(id))
            .await
            .map_err(StoreError::join)?
    }

    pub async fn create(&self, req: CreateBoard) -> Result<Board, StoreError> {
        let now = Utc::now();
        let mut members = HashMap::new();
        members.insert(req.owner_id.clone(), ROLE_OWNER.to_string());
        let board = Board {
            id: Uuid::new_v4(),
            name: req.name,
            description: req.description,
            workspace_id: req.workspace_id,
            owner_id: req.owner_id,
            members,
            is_starred: req.is_starred,
            background_image: req.background_image,
            created_at: now,
            updated_at: now,
        };
        let db = self.inner.db.clone();
        let record = board.clone();
        tokio::task::spawn_blocking(move || db.insert_board(&record))
            .await
            .map_err(StoreError::join)??;
        info!(
            "Board {} created in workspace {}",
            board.id, board.workspace_id
        );
        self.changed(board.workspace_id);
        Ok(board)
    }

    pub async fn update(&self, id: Uuid, updates: UpdateBoard) -> Result<(), StoreError> {
        let db = self.inner.db.clone();
        let workspace_id = tokio::task::spawn_blocking(move || db.update_board(id, &updates))
            .await
            .map_err(StoreError::join)??;
        self.changed(workspace_id);
        Ok(())
    }

    /// Delete the board and every note on it atomically.
    pub async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let db = self.inner.db.clone();
        let deletion = tokio::task::spawn_blocking(move || db.delete_board(id))
            .await
            .map_err(StoreError::join)??;
        info!("Board {} deleted with {} notes", id, deletion.notes_deleted);
        self.inner
            .cache
            .invalidate_scope(EntityKind::Note, &id.to_string());
        self.inner.feed.publish(ChangeEvent::Notes { board_id: id });
        self.changed(deletion.workspace_id);
        Ok(())
    }

    /// Live snapshots of the workspace's full (unpaginated) board list.
    /// Drop the stream to unsubscribe.
    pub fn watch(&self, workspace_id: Uuid) -> BoxStream<'static, Vec<Board>> {
        let rx = self.inner.feed.subscribe();
        let db = self.inner.db.clone();
        feed::snapshots(
            rx,
            move |event| {
                matches!(event, ChangeEvent::Boards { workspace_id: id } if *id == workspace_id)
            },
            move || {
                let db = db.clone();
                async move {
                    tokio::task::spawn_blocking(move || db.list_boards(workspace_id))
                        .await
                        .map_err(StoreError::join)?
                }
            },
        )
    }

    fn changed(&self, workspace_id: Uuid) {
        self.inner
            .cache
            .invalidate_scope(EntityKind::Board, &workspace_id.to_string());
        self.inner
            .feed
            .publish(ChangeEvent::Boards { workspace_id });
    }
}
