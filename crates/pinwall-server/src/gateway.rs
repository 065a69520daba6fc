use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use pinwall_store::Store;
use pinwall_types::events::{GatewayCommand, GatewayEvent};

/// Handle a single WebSocket connection. Each watch command starts a
/// snapshot stream for its scope; re-watching the same scope replaces the
/// previous stream, and closing the socket drops them all, which is what
/// unsubscribes the watchers from the change feed.
pub async fn handle_socket(socket: WebSocket, store: Store) {
    let (mut sender, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::channel::<GatewayEvent>(64);

    info!("Gateway client connected");

    // Forward snapshot events -> client
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to encode gateway event: {}", e);
                    continue;
                }
            };
            if sender.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Read watch commands from client
    let mut recv_task = tokio::spawn(async move {
        let mut watches: HashMap<(&'static str, String), JoinHandle<()>> = HashMap::new();
        while let Some(Ok(msg)) = receiver.next().await {
            match msg {
                Message::Text(text) => match serde_json::from_str::<GatewayCommand>(&text) {
                    Ok(cmd) => start_watch(&store, &tx, &mut watches, cmd),
                    Err(e) => {
                        warn!(
                            "Bad gateway command: {} -- raw: {}",
                            e,
                            &text[..text.len().min(200)]
                        );
                    }
                },
                Message::Close(_) => break,
                _ => {}
            }
        }
        for handle in watches.into_values() {
            handle.abort();
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    info!("Gateway client disconnected");
}

fn start_watch(
    store: &Store,
    tx: &mpsc::Sender<GatewayEvent>,
    watches: &mut HashMap<(&'static str, String), JoinHandle<()>>,
    cmd: GatewayCommand,
) {
    let tx = tx.clone();
    let (key, handle) = match cmd {
        GatewayCommand::WatchWorkspaces { owner_id } => {
            info!("Gateway client watching workspaces of {}", owner_id);
            let mut stream = store.workspaces().watch(&owner_id);
            let key = ("workspaces", owner_id.clone());
            let handle = tokio::spawn(async move {
                while let Some(workspaces) = stream.next().await {
                    let event = GatewayEvent::WorkspaceSnapshot {
                        owner_id: owner_id.clone(),
                        workspaces,
                    };
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
            });
            (key, handle)
        }
        GatewayCommand::WatchBoards { workspace_id } => {
            info!("Gateway client watching boards of {}", workspace_id);
            let mut stream = store.boards().watch(workspace_id);
            let key = ("boards", workspace_id.to_string());
            let handle = tokio::spawn(async move {
                while let Some(boards) = stream.next().await {
                    let event = GatewayEvent::BoardSnapshot {
                        workspace_id,
                        boards,
                    };
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
            });
            (key, handle)
        }
        GatewayCommand::WatchNotes { board_id } => {
            info!("Gateway client watching notes of {}", board_id);
            let mut stream = store.notes().watch(board_id);
            let key = ("notes", board_id.to_string());
            let handle = tokio::spawn(async move {
                while let Some(notes) = stream.next().await {
                    let event = GatewayEvent::NoteSnapshot { board_id, notes };
                    if tx.send(event).await.is_err() {
                        break;
                    }
                }
            });
            (key, handle)
        }
    };
    if let Some(old) = watches.insert(key, handle) {
        old.abort();
    }
}
