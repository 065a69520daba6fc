use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router,
    extract::{DefaultBodyLimit, State, WebSocketUpgrade},
    response::IntoResponse,
    routing::{delete, get, patch, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

mod gateway;
mod routes;

use pinwall_store::{BlobStore, Database, Store};

use crate::routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pinwall=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("PINWALL_DB_PATH").unwrap_or_else(|_| "pinwall.db".into());
    let blob_dir = std::env::var("PINWALL_BLOB_DIR").unwrap_or_else(|_| "blobs".into());
    let host = std::env::var("PINWALL_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("PINWALL_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;

    // Shared state
    let db = Database::open(&PathBuf::from(&db_path))?;
    let store = Store::new(db);
    let blobs = Arc::new(BlobStore::new(PathBuf::from(&blob_dir)).await?);
    let state = AppState {
        store: store.clone(),
        blobs,
    };

    // Routes
    let api_routes = Router::new()
        .route("/workspaces", get(routes::list_workspaces))
        .route("/workspaces", post(routes::create_workspace))
        .route("/workspaces/{id}", patch(routes::update_workspace))
        .route("/workspaces/{id}", delete(routes::delete_workspace))
        .route("/workspaces/{id}/boards", get(routes::list_boards))
        .route("/boards", post(routes::create_board))
        .route("/boards/{id}", get(routes::get_board))
        .route("/boards/{id}", patch(routes::update_board))
        .route("/boards/{id}", delete(routes::delete_board))
        .route("/boards/{id}/notes", get(routes::list_notes))
        .route("/boards/{id}/background", post(routes::upload_background))
        .route(
            "/boards/{board_id}/notes/{note_id}/images",
            post(routes::upload_note_image),
        )
        .route("/notes", post(routes::create_note))
        .route("/notes/{id}", patch(routes::update_note))
        .route("/notes/{id}", delete(routes::delete_note))
        .route("/blobs/{*key}", get(routes::download_blob))
        .route("/blobs/{*key}", delete(routes::delete_blob))
        // Image uploads arrive as raw bytes; cap them at 50 MB.
        .layer(DefaultBodyLimit::max(50 * 1024 * 1024))
        .with_state(state);

    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(store);

    let app = Router::new()
        .merge(api_routes)
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Pinwall server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(store): State<Store>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| gateway::handle_socket(socket, store))
}
