use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use pinwall_types::api::Page;
use pinwall_types::models::{Board, EntityKind, Note, Workspace};
use tracing::debug;

/// How long a cached listing stays servable.
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Time source for cache expiry. Production uses [`SystemClock`]; tests
/// drive expiry deterministically with a [`ManualClock`].
pub trait Clock: Send + Sync + 'static {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug, Clone)]
pub struct ManualClock {
    base: Instant,
    offset_us: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset_us: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset_us
            .fetch_add(by.as_micros() as u64, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + Duration::from_micros(self.offset_us.load(Ordering::SeqCst))
    }
}

/// Identifies one cached listing: which entity kind, under which parent
/// scope (owner uid for workspaces, workspace id for boards, board id for
/// notes), and at which page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub kind: EntityKind,
    pub scope: String,
    pub cursor: Option<String>,
}

impl CacheKey {
    pub fn list(kind: EntityKind, scope: impl Into<String>) -> Self {
        Self {
            kind,
            scope: scope.into(),
            cursor: None,
        }
    }

    pub fn page(kind: EntityKind, scope: impl Into<String>, cursor: Option<String>) -> Self {
        Self {
            kind,
            scope: scope.into(),
            cursor,
        }
    }
}

/// Cached listing payloads, one variant per entity kind.
#[derive(Debug, Clone)]
pub enum CachedList {
    Workspaces(Vec<Workspace>),
    Boards(Page<Board>),
    Notes(Vec<Note>),
}

struct Entry {
    value: CachedList,
    inserted_at: Instant,
}

/// TTL cache over listing queries. Mutations never patch cached values;
/// they drop every entry under the touched scope and let the next read
/// repopulate from the database.
pub struct QueryCache {
    entries: Mutex<HashMap<CacheKey, Entry>>,
    clock: Arc<dyn Clock>,
    ttl: Duration,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::with_clock(SystemClock, DEFAULT_TTL)
    }

    pub fn with_clock(clock: impl Clock, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            clock: Arc::new(clock),
            ttl,
        }
    }

    /// Fresh value for `key`, or `None` on a miss or an expired entry.
    /// Expired entries are removed on the way out. The cache is
    /// best-effort: a poisoned lock reads as a miss.
    pub fn get(&self, key: &CacheKey) -> Option<CachedList> {
        let mut entries = self.entries.lock().ok()?;
        let entry = entries.get(key)?;
        if self.clock.now().duration_since(entry.inserted_at) >= self.ttl {
            entries.remove(key);
            debug!(kind = key.kind.as_str(), scope = %key.scope, "cache entry expired");
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn insert(&self, key: CacheKey, value: CachedList) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(
                key,
                Entry {
                    value,
                    inserted_at: self.clock.now(),
                },
            );
        }
    }

    /// Drop every entry (all pages) cached for one kind under one scope.
    /// Other scopes are untouched.
    pub fn invalidate_scope(&self, kind: EntityKind, scope: &str) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.retain(|key, _| key.kind != kind || key.scope != scope);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(content: &str) -> Note {
        use pinwall_types::models::Position;
        Note {
            id: uuid::Uuid::new_v4(),
            content: content.to_string(),
            position: Position { x: 0.0, y: 0.0 },
            color: "yellow".to_string(),
            board_id: uuid::Uuid::new_v4(),
            owner_id: "uid-1".to_string(),
            is_pinned: false,
            images: Vec::new(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn hit_within_ttl_miss_after() {
        let clock = ManualClock::new();
        let cache = QueryCache::with_clock(clock.clone(), DEFAULT_TTL);
        let key = CacheKey::list(EntityKind::Note, "board-1");

        cache.insert(key.clone(), CachedList::Notes(vec![note("hello")]));
        assert!(cache.get(&key).is_some());

        clock.advance(DEFAULT_TTL - Duration::from_secs(1));
        assert!(cache.get(&key).is_some(), "entry should survive until TTL");

        clock.advance(Duration::from_secs(1));
        assert!(cache.get(&key).is_none(), "entry should expire at TTL");
        assert_eq!(cache.len(), 0, "expired entry should be evicted");
    }

    #[test]
    fn invalidate_scope_is_surgical() {
        let cache = QueryCache::with_clock(ManualClock::new(), DEFAULT_TTL);
        let board_a = CacheKey::list(EntityKind::Note, "board-a");
        let board_a_page = CacheKey::page(
            EntityKind::Note,
            "board-a",
            Some("2026-01-01T00:00:00.000000Z|7".to_string()),
        );
        let board_b = CacheKey::list(EntityKind::Note, "board-b");
        let workspaces = CacheKey::list(EntityKind::Workspace, "board-a");

        cache.insert(board_a.clone(), CachedList::Notes(vec![]));
        cache.insert(board_a_page.clone(), CachedList::Notes(vec![]));
        cache.insert(board_b.clone(), CachedList::Notes(vec![]));
        cache.insert(workspaces.clone(), CachedList::Workspaces(vec![]));

        cache.invalidate_scope(EntityKind::Note, "board-a");

        assert!(cache.get(&board_a).is_none());
        assert!(cache.get(&board_a_page).is_none(), "all pages drop together");
        assert!(cache.get(&board_b).is_some(), "sibling scope untouched");
        assert!(
            cache.get(&workspaces).is_some(),
            "same scope string under another kind untouched"
        );
    }

    #[test]
    fn insert_refreshes_ttl() {
        let clock = ManualClock::new();
        let cache = QueryCache::with_clock(clock.clone(), DEFAULT_TTL);
        let key = CacheKey::list(EntityKind::Note, "board-1");

        cache.insert(key.clone(), CachedList::Notes(vec![]));
        clock.advance(Duration::from_secs(200));
        cache.insert(key.clone(), CachedList::Notes(vec![note("v2")]));
        clock.advance(Duration::from_secs(200));

        match cache.get(&key) {
            Some(CachedList::Notes(notes)) => assert_eq!(notes.len(), 1),
            other => panic!("expected refreshed entry, got {other:?}"),
        }
    }
}
