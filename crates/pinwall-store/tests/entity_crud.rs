use std::collections::HashMap;

use pinwall_store::{Database, Store};
use pinwall_types::api::{
    CreateBoard, CreateNote, CreateWorkspace, UpdateBoard, UpdateNote, UpdateWorkspace,
};
use pinwall_types::models::{Board, Note, Position, ROLE_OWNER, Workspace};
use uuid::Uuid;

fn store() -> Store {
    Store::new(Database::open_in_memory().expect("in-memory database"))
}

async fn make_workspace(store: &Store, name: &str, owner: &str) -> Workspace {
    store
        .workspaces()
        .create(CreateWorkspace {
            name: name.to_string(),
            description: String::new(),
            color: "#336699".to_string(),
            owner_id: owner.to_string(),
        })
        .await
        .expect("create workspace")
}

async fn make_board(store: &Store, workspace_id: Uuid, name: &str) -> Board {
    store
        .boards()
        .create(CreateBoard {
            name: name.to_string(),
            description: String::new(),
            workspace_id,
            owner_id: "uid-1".to_string(),
            is_starred: false,
            background_image: None,
        })
        .await
        .expect("create board")
}

async fn make_note(store: &Store, board_id: Uuid, content: &str) -> Note {
    store
        .notes()
        .create(CreateNote {
            content: content.to_string(),
            position: Position { x: 10.0, y: 20.0 },
            color: "yellow".to_string(),
            board_id,
            owner_id: "uid-1".to_string(),
            is_pinned: false,
            images: Vec::new(),
        })
        .await
        .expect("create note")
}

#[tokio::test]
async fn workspace_create_sets_owner_membership() {
    let store = store();
    let ws = make_workspace(&store, "Home", "uid-1").await;

    assert_eq!(ws.owner_id, "uid-1");
    assert_eq!(ws.members.get("uid-1").map(String::as_str), Some(ROLE_OWNER));
    assert_eq!(ws.members.len(), 1);
    assert_eq!(ws.created_at, ws.updated_at);
}

#[tokio::test]
async fn workspace_list_is_newest_first_and_owner_scoped() {
    let store = store();
    let first = make_workspace(&store, "first", "uid-1").await;
    let second = make_workspace(&store, "second", "uid-1").await;
    make_workspace(&store, "other", "uid-2").await;

    let listed = store.workspaces().list("uid-1").await.unwrap();
    assert_eq!(
        listed.iter().map(|w| w.id).collect::<Vec<_>>(),
        vec![second.id, first.id]
    );

    let other = store.workspaces().list("uid-2").await.unwrap();
    assert_eq!(other.len(), 1);
    assert_eq!(other[0].name, "other");
}

#[tokio::test]
async fn workspace_update_merges_only_provided_fields() {
    let store = store();
    let ws = make_workspace(&store, "Home", "uid-1").await;

    store
        .workspaces()
        .update(
            ws.id,
            UpdateWorkspace {
                name: Some("Renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let listed = store.workspaces().list("uid-1").await.unwrap();
    assert_eq!(listed[0].name, "Renamed");
    assert_eq!(listed[0].color, "#336699", "untouched field survives");
    assert!(listed[0].updated_at > ws.updated_at);
}

#[tokio::test]
async fn workspace_update_missing_is_not_found() {
    let store = store();
    let err = store
        .workspaces()
        .update(Uuid::new_v4(), UpdateWorkspace::default())
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.code(), "workspace-not-found");
}

#[tokio::test]
async fn workspace_delete_removes_boards_but_not_notes() {
    let store = store();
    let ws = make_workspace(&store, "Home", "uid-1").await;
    let board = make_board(&store, ws.id, "Board").await;
    let note = make_note(&store, board.id, "still here").await;

    store.workspaces().delete(ws.id).await.unwrap();

    assert!(store.workspaces().list("uid-1").await.unwrap().is_empty());
    let err = store.boards().get(board.id).await.unwrap_err();
    assert_eq!(err.code(), "board-not-found");

    // The cascade stops at boards; the note row survives unreferenced.
    let orphans = store.notes().list(board.id).await.unwrap();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].id, note.id);
}

#[tokio::test]
async fn workspace_delete_missing_is_not_found() {
    let store = store();
    let err = store.workspaces().delete(Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.code(), "workspace-not-found");
}

#[tokio::test]
async fn board_pagination_walks_without_overlap() {
    let store = store();
    let ws = make_workspace(&store, "Home", "uid-1").await;
    let mut created = Vec::new();
    for i in 0..5 {
        created.push(make_board(&store, ws.id, &format!("board-{i}")).await.id);
    }
    created.reverse(); // newest first

    let mut seen = Vec::new();
    let mut cursor = None;
    loop {
        let page = store.boards().list(ws.id, 2, cursor).await.unwrap();
        assert!(page.items.len() <= 2);
        seen.extend(page.items.iter().map(|b| b.id));
        match page.next_cursor {
            Some(next) => cursor = Some(next),
            None => break,
        }
    }
    assert_eq!(seen, created);
}

#[tokio::test]
async fn board_page_without_more_has_no_cursor() {
    let store = store();
    let ws = make_workspace(&store, "Home", "uid-1").await;
    make_board(&store, ws.id, "only").await;

    let page = store.boards().list(ws.id, 10, None).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert!(page.next_cursor.is_none());
}

#[tokio::test]
async fn board_list_rejects_garbage_cursor() {
    let store = store();
    let ws = make_workspace(&store, "Home", "uid-1").await;

    let err = store
        .boards()
        .list(ws.id, 10, Some("not-a-cursor".to_string()))
        .await
        .unwrap_err();
    assert_eq!(err.code(), "invalid-cursor");
}

#[tokio::test]
async fn board_update_merges_and_keeps_flags() {
    let store = store();
    let ws = make_workspace(&store, "Home", "uid-1").await;
    let board = make_board(&store, ws.id, "Board").await;

    store
        .boards()
        .update(
            board.id,
            UpdateBoard {
                is_starred: Some(true),
                background_image: Some("boards/x/backgrounds/background_1_sky.png".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let fetched = store.boards().get(board.id).await.unwrap();
    assert!(fetched.is_starred);
    assert_eq!(fetched.name, "Board");
    assert_eq!(
        fetched.background_image.as_deref(),
        Some("boards/x/backgrounds/background_1_sky.png")
    );
}

#[tokio::test]
async fn board_delete_cascades_notes() {
    let store = store();
    let ws = make_workspace(&store, "Home", "uid-1").await;
    let board = make_board(&store, ws.id, "Board").await;
    make_note(&store, board.id, "a").await;
    make_note(&store, board.id, "b").await;

    store.boards().delete(board.id).await.unwrap();

    let err = store.boards().get(board.id).await.unwrap_err();
    assert_eq!(err.code(), "board-not-found");
    assert!(store.notes().list(board.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn note_crud_round_trip() {
    let store = store();
    let ws = make_workspace(&store, "Home", "uid-1").await;
    let board = make_board(&store, ws.id, "Board").await;

    let first = make_note(&store, board.id, "first").await;
    let second = make_note(&store, board.id, "second").await;

    let listed = store.notes().list(board.id).await.unwrap();
    assert_eq!(
        listed.iter().map(|n| n.id).collect::<Vec<_>>(),
        vec![second.id, first.id],
        "notes list newest first"
    );

    store
        .notes()
        .update(
            first.id,
            UpdateNote {
                position: Some(Position { x: 5.0, y: -3.5 }),
                is_pinned: Some(true),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let listed = store.notes().list(board.id).await.unwrap();
    let updated = listed.iter().find(|n| n.id == first.id).unwrap();
    assert_eq!(updated.position, Position { x: 5.0, y: -3.5 });
    assert!(updated.is_pinned);
    assert_eq!(updated.content, "first", "untouched field survives");

    store.notes().delete(second.id).await.unwrap();
    let listed = store.notes().list(board.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, first.id);
}

#[tokio::test]
async fn note_update_missing_is_not_found() {
    let store = store();
    let err = store
        .notes()
        .update(Uuid::new_v4(), UpdateNote::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "note-not-found");
}

#[tokio::test]
async fn full_wall_lifecycle() {
    let store = store();
    let ws = make_workspace(&store, "Home", "uid-1").await;
    let board = make_board(&store, ws.id, "Ideas").await;
    let note = make_note(&store, board.id, "hello").await;

    let listed = store.notes().list(board.id).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, note.id);
    assert_eq!(listed[0].content, "hello");

    store.boards().delete(board.id).await.unwrap();

    assert!(store.notes().list(board.id).await.unwrap().is_empty());
    let err = store.boards().get(board.id).await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.code(), "board-not-found");

    // Deleting again reports not-found and changes nothing.
    let err = store.boards().delete(board.id).await.unwrap_err();
    assert_eq!(err.code(), "board-not-found");
}

#[tokio::test]
async fn members_map_round_trips_through_storage() {
    let store = store();
    let ws = make_workspace(&store, "Home", "uid-1").await;

    let mut members = HashMap::new();
    members.insert("uid-1".to_string(), ROLE_OWNER.to_string());
    members.insert("uid-2".to_string(), "editor".to_string());
    store
        .workspaces()
        .update(
            ws.id,
            UpdateWorkspace {
                members: Some(members.clone()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let listed = store.workspaces().list("uid-1").await.unwrap();
    assert_eq!(listed[0].members, members);
}
