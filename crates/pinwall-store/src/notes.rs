use std::sync::Arc;

use chrono::Utc;
use futures_util::stream::BoxStream;
use pinwall_types::api::{CreateNote, UpdateNote};
use pinwall_types::events::ChangeEvent;
use pinwall_types::models::{EntityKind, Note};
use tracing::info;
use uuid::Uuid;

use crate::StoreInner;
use crate::cache::{CacheKey, CachedList};
use crate::error::StoreError;
use crate::feed;

/// Note operations, scoped to a board.
#[derive(Clone)]
pub struct Notes {
    pub(crate) inner: Arc<StoreInner>,
}

impl Notes {
    /// All notes on the board, newest first.
    pub async fn list(&self, board_id: Uuid) -> Result<Vec<Note>, StoreError> {
        let key = CacheKey::list(EntityKind::Note, board_id.to_string());
        if let Some(CachedList::Notes(items)) = self.inner.cache.get(&key) {
            return Ok(items);
        }
        let db = self.inner.db.clone();
        let items = tokio::task::spawn_blocking(move || db.list_notes(board_id))
            .await
            .map_err(StoreError::join)??;
        self.inner
            .cache
            .insert(key, CachedList::Notes(items.clone()));
        Ok(items)
    }

    pub async fn create(&self, req: CreateNote) -> Result<Note, StoreError> {
        let now = Utc::now();
        let note = Note {
            id: Uuid::new_v4(),
            content: req.content,
            position: req.position,
            color: req.color,
            board_id: req.board_id,
            owner_id: req.owner_id,
            is_pinned: req.is_pinned,
            images: req.images,
            created_at: now,
            updated_at: now,
        };
        let db = self.inner.db.clone();
        let record = note.clone();
        tokio::task::spawn_blocking(move || db.insert_note(&record))
            .await
            .map_err(StoreError::join)??;
        info!("Note {} created on board {}", note.id, note.board_id);
        self.changed(note.board_id);
        Ok(note)
    }

    pub async fn update(&self, id: Uuid, updates: UpdateNote) -> Result<(), StoreError> {
        let db = self.inner.db.clone();
        let board_id = tokio::task::spawn_blocking(move || db.update_note(id, &updates))
            .await
            .map_err(StoreError::join)??;
        self.changed(board_id);
        Ok(())
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let db = self.inner.db.clone();
        let board_id = tokio::task::spawn_blocking(move || db.delete_note(id))
            .await
            .map_err(StoreError::join)??;
        self.changed(board_id);
        Ok(())
    }

    /// Live snapshots of the board's note list. Drop the stream to
    /// unsubscribe.
    pub fn watch(&self, board_id: Uuid) -> BoxStream<'static, Vec<Note>> {
        let rx = self.inner.feed.subscribe();
        let service = self.clone();
        feed::snapshots(
            rx,
            move |event| matches!(event, ChangeEvent::Notes { board_id: id } if *id == board_id),
            move || {
                let service = service.clone();
                async move { service.list(board_id).await }
            },
        )
    }

    fn changed(&self, board_id: Uuid) {
        self.inner
            .cache
            .invalidate_scope(EntityKind::Note, &board_id.to_string());
        self.inner.feed.publish(ChangeEvent::Notes { board_id });
    }
}
