use super::*;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message as WsMessage, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::Notify;

use shared::domain::{ItemId, ItemStatus};
use shared::protocol::InventoryItem;

use crate::channel::NoReconnect;
use crate::snapshot::GraphqlSnapshotSource;
use crate::status::TracingStatusSink;

#[derive(Clone)]
struct Backend {
    snapshot: serde_json::Value,
    frames: Arc<Vec<String>>,
}

async fn graphql(State(backend): State<Backend>) -> Json<serde_json::Value> {
    Json(backend.snapshot.clone())
}

async fn ws(State(backend): State<Backend>, upgrade: WebSocketUpgrade) -> impl IntoResponse {
    upgrade.on_upgrade(move |socket| push_frames(socket, backend))
}

async fn push_frames(mut socket: WebSocket, backend: Backend) {
    for frame in backend.frames.iter() {
        if socket.send(WsMessage::Text(frame.clone())).await.is_err() {
            return;
        }
    }
    // Hold the connection open; the client releases it on teardown.
    while let Some(Ok(_)) = socket.recv().await {}
}

async fn spawn_backend(backend: Backend) -> Url {
    let app = Router::new()
        .route("/api_zoho/graphql/", post(graphql))
        .route("/ws/inventory_items/", get(ws))
        .with_state(backend);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    Url::parse(&format!("http://{addr}")).unwrap()
}

#[derive(Default)]
struct RecordingSink {
    successes: std::sync::Mutex<Vec<String>>,
}

impl StatusSink for RecordingSink {
    fn loading(&self, _active: bool) {}

    fn notify_success(&self, message: &str) {
        self.successes.lock().unwrap().push(message.to_string());
    }

    fn notify_error(&self, _message: &str) {}
}

struct FixedSource {
    rows: Vec<InventoryItem>,
}

#[async_trait]
impl SnapshotSource<InventoryItem> for FixedSource {
    async fn fetch(&self, _query: &SnapshotQuery) -> Result<Vec<InventoryItem>, SyncError> {
        Ok(self.rows.clone())
    }
}

struct GatedSource {
    release: Arc<Notify>,
    rows: Vec<InventoryItem>,
}

#[async_trait]
impl SnapshotSource<InventoryItem> for GatedSource {
    async fn fetch(&self, _query: &SnapshotQuery) -> Result<Vec<InventoryItem>, SyncError> {
        self.release.notified().await;
        Ok(self.rows.clone())
    }
}

fn item(id: i64, name: &str, status: ItemStatus, stock: i64) -> InventoryItem {
    InventoryItem {
        item_id: ItemId(id),
        sku: format!("SKU-{id}"),
        name: name.into(),
        status,
        stock_on_hand: stock,
    }
}

fn item_json(id: i64, name: &str, status: &str, stock: i64) -> serde_json::Value {
    json!({
        "itemId": id,
        "sku": format!("SKU-{id}"),
        "name": name,
        "status": status,
        "stockOnHand": stock,
    })
}

fn frame(kind: &str, item: serde_json::Value) -> String {
    json!({"type": kind, "item": item}).to_string()
}

fn options(server: Url) -> SessionOptions {
    SessionOptions::new(
        Resource::InventoryItems,
        server,
        SortState::ascending("name"),
    )
}

fn open_fixed(
    server: Url,
    rows: Vec<InventoryItem>,
    sink: Arc<RecordingSink>,
) -> Arc<TableSession<InventoryItem>> {
    TableSession::open(
        options(server),
        Arc::new(FixedSource { rows }),
        sink,
        Arc::new(NoReconnect),
    )
    .unwrap()
}

/// Polls until the condition holds; panics after five seconds.
async fn eventually<'a, F>(what: &str, mut check: F)
where
    F: FnMut() -> Pin<Box<dyn Future<Output = bool> + 'a>>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if check().await {
            return;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "timed out waiting for: {what}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

/// An unreachable server: the channel fails fast and stays down, which is
/// enough for tests that only exercise local behaviour.
fn unreachable_server() -> Url {
    Url::parse("http://127.0.0.1:1").unwrap()
}

#[tokio::test]
async fn merges_snapshot_and_push_updates_end_to_end() {
    let server = spawn_backend(Backend {
        snapshot: json!({"data": {"allZohoInventoryItems": [
            item_json(1, "Widget", "active", 4),
            item_json(2, "Gadget", "inactive", 9),
        ]}}),
        frames: Arc::new(vec![
            frame("updated", item_json(2, "Gadget", "active", 99)),
            frame("created", item_json(3, "Sprocket", "active", 1)),
        ]),
    })
    .await;

    let sink = Arc::new(RecordingSink::default());
    let session = TableSession::<InventoryItem>::open(
        options(server.clone()),
        Arc::new(GraphqlSnapshotSource::new(&server, Resource::InventoryItems)),
        Arc::clone(&sink) as Arc<dyn StatusSink>,
        Arc::new(NoReconnect),
    )
    .unwrap();

    eventually("snapshot and push events merged", || {
        let session = Arc::clone(&session);
        Box::pin(async move {
            let rows = session.rows().await;
            rows.len() == 3
                && rows
                    .iter()
                    .any(|row| row.item_id == ItemId(2) && row.stock_on_hand == 99)
        })
    })
    .await;
    assert_eq!(session.load_state().await, LoadState::Ready);

    let mut events = session.events();
    session.delete_one(&ItemId(1)).await;
    assert_eq!(session.rows().await.len(), 2);
    assert_eq!(
        sink.successes.lock().unwrap().as_slice(),
        ["Delete success!"]
    );

    // The delete is observable through the event stream as well.
    let received = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(TableEvent::Changed) => break true,
                Ok(_) => continue,
                Err(_) => break false,
            }
        }
    })
    .await
    .unwrap();
    assert!(received);

    session.close().await;
    assert_eq!(session.channel_state().await, ChannelState::Closed);
}

#[tokio::test]
async fn snapshot_failure_is_a_blocking_error() {
    let server = spawn_backend(Backend {
        snapshot: json!({"data": {}}),
        frames: Arc::new(Vec::new()),
    })
    .await;

    let session = TableSession::<InventoryItem>::open(
        options(server.clone()),
        Arc::new(GraphqlSnapshotSource::new(&server, Resource::InventoryItems)),
        Arc::new(TracingStatusSink),
        Arc::new(NoReconnect),
    )
    .unwrap();

    eventually("load failure surfaced", || {
        let session = Arc::clone(&session);
        Box::pin(async move { matches!(session.load_state().await, LoadState::Failed(_)) })
    })
    .await;
    assert!(session.rows().await.is_empty());
}

#[tokio::test]
async fn push_arriving_before_the_snapshot_survives_the_merge() {
    let server = spawn_backend(Backend {
        snapshot: json!({"data": {"allZohoInventoryItems": []}}),
        frames: Arc::new(vec![
            frame("updated", item_json(2, "Gadget", "active", 99)),
            frame("created", item_json(9, "Flange", "active", 2)),
        ]),
    })
    .await;

    let release = Arc::new(Notify::new());
    let session: Arc<TableSession<InventoryItem>> = TableSession::open(
        options(server),
        Arc::new(GatedSource {
            release: Arc::clone(&release),
            rows: vec![
                item(1, "Widget", ItemStatus::Active, 4),
                item(2, "Gadget", ItemStatus::Inactive, 9),
                item(3, "Sprocket", ItemStatus::Active, 1),
            ],
        }),
        Arc::new(TracingStatusSink),
        Arc::new(NoReconnect),
    )
    .unwrap();

    eventually("push events applied while the snapshot is in flight", || {
        let session = Arc::clone(&session);
        Box::pin(async move { session.rows().await.len() == 2 })
    })
    .await;
    assert_eq!(session.load_state().await, LoadState::Loading);

    release.notify_one();
    eventually("snapshot resolved", || {
        let session = Arc::clone(&session);
        Box::pin(async move { session.load_state().await == LoadState::Ready })
    })
    .await;

    let keys: Vec<i64> = session.rows().await.iter().map(|row| row.item_id.0).collect();
    // Push-derived rows stay in front with their newer values; the snapshot
    // only fills in the keys it alone knows about.
    assert_eq!(keys, vec![9, 2, 1, 3]);
    let rows = session.rows().await;
    let gadget = rows.iter().find(|row| row.item_id == ItemId(2)).unwrap();
    assert_eq!(gadget.stock_on_hand, 99);
    assert_eq!(gadget.status, ItemStatus::Active);
}

#[tokio::test]
async fn stale_snapshot_resolving_after_close_is_ignored() {
    let server = spawn_backend(Backend {
        snapshot: json!({"data": {"allZohoInventoryItems": []}}),
        frames: Arc::new(Vec::new()),
    })
    .await;

    let release = Arc::new(Notify::new());
    let session: Arc<TableSession<InventoryItem>> = TableSession::open(
        options(server),
        Arc::new(GatedSource {
            release: Arc::clone(&release),
            rows: vec![item(1, "Widget", ItemStatus::Active, 4)],
        }),
        Arc::new(TracingStatusSink),
        Arc::new(NoReconnect),
    )
    .unwrap();

    session.close().await;
    release.notify_one();
    tokio::time::sleep(Duration::from_millis(100)).await;

    assert!(session.rows().await.is_empty());
    assert_ne!(session.load_state().await, LoadState::Ready);
}

#[tokio::test]
async fn deleting_the_only_row_of_the_last_page_steps_back() {
    let sink = Arc::new(RecordingSink::default());
    let session = open_fixed(
        unreachable_server(),
        vec![
            item(1, "Alpha", ItemStatus::Active, 1),
            item(2, "Beta", ItemStatus::Active, 2),
            item(3, "Gamma", ItemStatus::Active, 3),
        ],
        Arc::clone(&sink),
    );

    eventually("baseline loaded", || {
        let session = Arc::clone(&session);
        Box::pin(async move { session.load_state().await == LoadState::Ready })
    })
    .await;

    session.set_rows_per_page(2).await;
    session.set_page(1).await;
    let view = session.view().await;
    assert_eq!(view.rows.len(), 1);
    assert_eq!(view.rows[0].item_id, ItemId(3));

    session.delete_one(&ItemId(3)).await;
    assert_eq!(session.page_state().await.page, 0);
    assert_eq!(session.view().await.rows.len(), 2);
}

#[tokio::test]
async fn select_all_then_filter_prunes_the_selection() {
    let session = open_fixed(
        unreachable_server(),
        vec![
            item(1, "Widget", ItemStatus::Active, 1),
            item(2, "Gadget", ItemStatus::Inactive, 2),
            item(3, "Widget Pro", ItemStatus::Active, 3),
        ],
        Arc::new(RecordingSink::default()),
    );

    eventually("baseline loaded", || {
        let session = Arc::clone(&session);
        Box::pin(async move { session.load_state().await == LoadState::Ready })
    })
    .await;

    session.select_all(true).await;
    assert_eq!(session.selected_keys().await.len(), 3);

    session
        .set_status(StatusFilter::Only("active".into()))
        .await;
    let selected = session.selected_keys().await;
    assert_eq!(selected.len(), 2);
    assert!(!selected.contains(&ItemId(2)));
}

#[tokio::test]
async fn bulk_delete_clears_the_table_and_returns_to_the_first_page() {
    let sink = Arc::new(RecordingSink::default());
    let session = open_fixed(
        unreachable_server(),
        (1..=5)
            .map(|id| item(id, &format!("Item {id}"), ItemStatus::Active, id))
            .collect(),
        Arc::clone(&sink),
    );

    eventually("baseline loaded", || {
        let session = Arc::clone(&session);
        Box::pin(async move { session.load_state().await == LoadState::Ready })
    })
    .await;

    session.set_rows_per_page(2).await;
    session.set_page(2).await;
    session.select_all(true).await;
    session.delete_selected().await;

    let view = session.view().await;
    assert!(view.rows.is_empty());
    assert!(view.not_found);
    assert_eq!(session.page_state().await.page, 0);
    assert_eq!(
        sink.successes.lock().unwrap().as_slice(),
        ["Delete success!"]
    );
}
