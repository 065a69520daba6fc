use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures_util::stream::BoxStream;
use pinwall_types::api::{CreateWorkspace, UpdateWorkspace};
use pinwall_types::events::ChangeEvent;
use pinwall_types::models::{EntityKind, ROLE_OWNER, Workspace};
use tracing::{info, warn};
use uuid::Uuid;

use crate::StoreInner;
use crate::cache::{CacheKey, CachedList};
use crate::error::StoreError;
use crate::feed;

/// Workspace operations. Listings are scoped to an owner uid and served
/// from the query cache when fresh.
#[derive(Clone)]
pub struct Workspaces {
    pub(crate) inner: Arc<StoreInner>,
}

impl Workspaces {
    /// All workspaces owned by `owner_id`, newest first.
    pub async fn list(&self, owner_id: &str) -> Result<Vec<Workspace>, StoreError> {
        let key = CacheKey::list(EntityKind::Workspace, owner_id);
        if let Some(CachedList::Workspaces(items)) = self.inner.cache.get(&key) {
            return Ok(items);
        }
        let db = self.inner.db.clone();
        let owner = owner_id.to_string();
        let items = tokio::task::spawn_blocking(move || db.list_workspaces(&owner))
            .await
            .map_err(StoreError::join)??;
        self.inner
            .cache
            .insert(key, CachedList::Workspaces(items.clone()));
        Ok(items)
    }

    /// The creator becomes the sole member with role "owner".
    pub async fn create(&self, req: CreateWorkspace) -> Result<Workspace, StoreError> {
        let now = Utc::now();
        let mut members = HashMap::new();
        members.insert(req.owner_id.clone(), ROLE_OWNER.to_string());
        let ws = Workspace {
            id: Uuid::new_v4(),
            name: req.name,
            description: req.description,
            color: req.color,
            owner_id: req.owner_id,
            members,
            created_at: now,
            updated_at: now,
        };
        let db = self.inner.db.clone();
        let record = ws.clone();
        tokio::task::spawn_blocking(move || db.insert_workspace(&record))
            .await
            .map_err(StoreError::join)??;
        info!("Workspace {} created by {}", ws.id, ws.owner_id);
        self.changed(&ws.owner_id);
        Ok(ws)
    }

    /// Merge the `Some` fields into the stored workspace.
    pub async fn update(&self, id: Uuid, updates: UpdateWorkspace) -> Result<(), StoreError> {
        let db = self.inner.db.clone();
        let owner_id = tokio::task::spawn_blocking(move || db.update_workspace(id, &updates))
            .await
            .map_err(StoreError::join)??;
        self.changed(&owner_id);
        Ok(())
    }

    /// Delete the workspace and its boards. Notes under those boards stay
    /// behind unreferenced; the log line below is the only trace of them.
    pub async fn delete(&self, id: Uuid) -> Result<(), StoreError> {
        let db = self.inner.db.clone();
        let deletion = tokio::task::spawn_blocking(move || db.delete_workspace(id))
            .await
            .map_err(StoreError::join)??;
        if deletion.notes_orphaned > 0 {
            warn!(
                "Workspace {} deleted with {} boards; {} notes left orphaned",
                id, deletion.boards_deleted, deletion.notes_orphaned
            );
        } else {
            info!(
                "Workspace {} deleted with {} boards",
                id, deletion.boards_deleted
            );
        }
        self.inner
            .cache
            .invalidate_scope(EntityKind::Board, &id.to_string());
        self.inner
            .feed
            .publish(ChangeEvent::Boards { workspace_id: id });
        self.changed(&deletion.owner_id);
        Ok(())
    }

    /// Live snapshots of the owner's workspace list: one immediately, then
    /// one after every workspace change under that owner. Drop the stream
    /// to unsubscribe.
    pub fn watch(&self, owner_id: &str) -> BoxStream<'static, Vec<Workspace>> {
        let rx = self.inner.feed.subscribe();
        let owner = owner_id.to_string();
        let watched = owner.clone();
        let service = self.clone();
        feed::snapshots(
            rx,
            move |event| {
                matches!(event, ChangeEvent::Workspaces { owner_id } if *owner_id == watched)
            },
            move || {
                let service = service.clone();
                let owner = owner.clone();
                async move { service.list(&owner).await }
            },
        )
    }

    fn changed(&self, owner_id: &str) {
        self.inner
            .cache
            .invalidate_scope(EntityKind::Workspace, owner_id);
        self.inner.feed.publish(ChangeEvent::Workspaces {
            owner_id: owner_id.to_string(),
        });
    }
}
