use std::future::Future;

use async_stream::stream;
use futures_util::stream::BoxStream;
use pinwall_types::events::ChangeEvent;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use crate::error::StoreError;

/// Fan-out bus for entity change notifications. Every mutation publishes
/// one event naming the scope it touched; watchers refetch on matching
/// events. Publishing with no subscribers is a no-op.
#[derive(Clone)]
pub struct ChangeFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    pub fn publish(&self, event: ChangeEvent) {
        // Err here only means nobody is listening.
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn a change-feed receiver into a stream of full listing snapshots:
/// one immediately, then one after every event `matches` accepts. Query
/// failures are logged and skipped so a transient error never kills the
/// subscription; dropping the stream unsubscribes.
pub(crate) fn snapshots<T, M, F, Fut>(
    mut rx: broadcast::Receiver<ChangeEvent>,
    matches: M,
    fetch: F,
) -> BoxStream<'static, Vec<T>>
where
    T: Send + 'static,
    M: Fn(&ChangeEvent) -> bool + Send + 'static,
    F: Fn() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Vec<T>, StoreError>> + Send,
{
    Box::pin(stream! {
        match fetch().await {
            Ok(items) => yield items,
            Err(e) => warn!("Watch snapshot query failed: {e}"),
        }
        loop {
            match rx.recv().await {
                Ok(event) if matches(&event) => match fetch().await {
                    Ok(items) => yield items,
                    Err(e) => warn!("Watch snapshot query failed: {e}"),
                },
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    // Missed events cannot be replayed; one fresh snapshot
                    // covers whatever they would have triggered.
                    warn!("Change feed receiver lagged by {skipped} events, refetching");
                    match fetch().await {
                        Ok(items) => yield items,
                        Err(e) => warn!("Watch snapshot query failed: {e}"),
                    }
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
