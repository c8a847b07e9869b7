//! Per-view table session: one store, one push channel, one snapshot load.
//!
//! A session is created when a list view mounts and discarded when it
//! unmounts. It exclusively owns its `EntityStore`; the snapshot load and
//! the push channel race freely because every mutation serialises through
//! the store lock, and the snapshot reconciliation keeps push-derived state.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use tokio::sync::{broadcast, watch, Mutex};
use tokio::task::AbortHandle;
use tracing::warn;
use url::Url;

use shared::protocol::{Resource, SnapshotQuery};

use crate::channel::{run_channel, ChannelState, ReconnectPolicy};
use crate::selection::SelectionController;
use crate::snapshot::SnapshotSource;
use crate::status::StatusSink;
use crate::store::{EntityStore, TableRecord};
use crate::view::{
    compute_view, DateRange, FilterState, PageState, SortState, StatusFilter, TableView,
};
use crate::SyncError;

#[derive(Debug, Clone)]
pub enum TableEvent {
    /// The canonical collection changed; derived views must be recomputed.
    Changed,
    ChannelStateChanged(ChannelState),
    Error(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Loading,
    Ready,
    /// The snapshot load failed; the view shows a blocking error and no
    /// partial data.
    Failed(String),
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub resource: Resource,
    /// http(s) base of the dashboard backend.
    pub server: Url,
    /// Bounds forwarded to the snapshot query (honoured by the sales order
    /// resource only).
    pub query: SnapshotQuery,
    pub sort: SortState,
}

impl SessionOptions {
    pub fn new(resource: Resource, server: Url, sort: SortState) -> Self {
        Self {
            resource,
            server,
            query: SnapshotQuery::default(),
            sort,
        }
    }
}

struct SessionInner<R: TableRecord> {
    filters: FilterState,
    sort: SortState,
    page: PageState,
    selection: SelectionController<R::Key>,
    load_state: LoadState,
    closed: bool,
}

pub struct TableSession<R: TableRecord> {
    store: Arc<Mutex<EntityStore<R>>>,
    inner: Mutex<SessionInner<R>>,
    events: broadcast::Sender<TableEvent>,
    channel_rx: watch::Receiver<ChannelState>,
    channel_task: AbortHandle,
    sink: Arc<dyn StatusSink>,
}

impl<R> TableSession<R>
where
    R: TableRecord + DeserializeOwned,
{
    /// Opens the session: spawns the push channel task and the snapshot
    /// load concurrently. Must be called from within a tokio runtime. The
    /// returned handle is the view's only way at the collection; `close`
    /// (or drop) releases the channel on every exit path.
    pub fn open(
        options: SessionOptions,
        source: Arc<dyn SnapshotSource<R>>,
        sink: Arc<dyn StatusSink>,
        reconnect: Arc<dyn ReconnectPolicy>,
    ) -> Result<Arc<Self>, SyncError> {
        let ws_url = push_channel_url(&options.server, options.resource)?;
        let (events, _) = broadcast::channel(256);
        let (state_tx, channel_rx) = watch::channel(ChannelState::Connecting);
        let store = Arc::new(Mutex::new(EntityStore::new()));

        let channel_task = tokio::spawn(run_channel(
            ws_url,
            Arc::clone(&store),
            events.clone(),
            state_tx,
            reconnect,
        ))
        .abort_handle();

        let session = Arc::new(Self {
            store,
            inner: Mutex::new(SessionInner {
                filters: FilterState::default(),
                sort: options.sort,
                page: PageState::default(),
                selection: SelectionController::new(),
                load_state: LoadState::Loading,
                closed: false,
            }),
            events,
            channel_rx,
            channel_task,
            sink,
        });

        let loader = Arc::clone(&session);
        let query = options.query;
        tokio::spawn(async move {
            loader.sink.loading(true);
            let result = source.fetch(&query).await;
            loader.sink.loading(false);
            loader.finish_snapshot(result).await;
        });

        Ok(session)
    }

    async fn finish_snapshot(&self, result: Result<Vec<R>, SyncError>) {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            // A response resolving after teardown is dropped, never applied
            // to a disposed store.
            return;
        }
        match result {
            Ok(rows) => {
                self.store.lock().await.apply_snapshot(rows);
                inner.load_state = LoadState::Ready;
                let _ = self.events.send(TableEvent::Changed);
            }
            Err(err) => {
                warn!("snapshot load failed: {err}");
                inner.load_state = LoadState::Failed(err.to_string());
                let _ = self.events.send(TableEvent::Error(err.to_string()));
            }
        }
    }
}

impl<R: TableRecord> TableSession<R> {
    pub async fn load_state(&self) -> LoadState {
        self.inner.lock().await.load_state.clone()
    }

    pub fn events(&self) -> broadcast::Receiver<TableEvent> {
        self.events.subscribe()
    }

    pub async fn channel_state(&self) -> ChannelState {
        if self.inner.lock().await.closed {
            return ChannelState::Closed;
        }
        *self.channel_rx.borrow()
    }

    /// Frozen copy of the canonical collection (the tab strip counts read
    /// this, unfiltered).
    pub async fn rows(&self) -> Vec<R> {
        self.store.lock().await.snapshot()
    }

    /// Recomputes the rendered view and prunes the selection against it, so
    /// the selection stays a subset of the filtered collection after every
    /// operation.
    pub async fn view(&self) -> TableView<R> {
        let mut inner = self.inner.lock().await;
        self.view_locked(&mut inner).await
    }

    async fn view_locked(&self, inner: &mut SessionInner<R>) -> TableView<R> {
        let rows = self.store.lock().await.snapshot();
        let view = compute_view(rows, &inner.filters, &inner.sort, &inner.page);
        inner.selection.retain_visible(&view.filtered_keys);
        view
    }

    pub async fn filters(&self) -> FilterState {
        self.inner.lock().await.filters.clone()
    }

    pub async fn page_state(&self) -> PageState {
        self.inner.lock().await.page
    }

    pub async fn set_query(&self, query: impl Into<String> + Send) {
        let mut inner = self.inner.lock().await;
        inner.filters.query = query.into();
        inner.page.reset();
        self.view_locked(&mut inner).await;
        let _ = self.events.send(TableEvent::Changed);
    }

    pub async fn set_status(&self, status: StatusFilter) {
        let mut inner = self.inner.lock().await;
        inner.filters.status = status;
        inner.page.reset();
        self.view_locked(&mut inner).await;
        let _ = self.events.send(TableEvent::Changed);
    }

    pub async fn set_date_range(&self, range: DateRange) {
        let mut inner = self.inner.lock().await;
        inner.filters.date_range = range;
        inner.page.reset();
        self.view_locked(&mut inner).await;
        let _ = self.events.send(TableEvent::Changed);
    }

    pub async fn reset_filters(&self) {
        let mut inner = self.inner.lock().await;
        inner.filters = FilterState::default();
        inner.page.reset();
        self.view_locked(&mut inner).await;
        let _ = self.events.send(TableEvent::Changed);
    }

    /// Sorting by the current column flips direction; a new column starts
    /// ascending. The page is left alone.
    pub async fn sort_by(&self, field: &str) {
        let mut inner = self.inner.lock().await;
        inner.sort.toggle(field);
        let _ = self.events.send(TableEvent::Changed);
    }

    pub async fn set_page(&self, page: usize) {
        self.inner.lock().await.page.page = page;
        let _ = self.events.send(TableEvent::Changed);
    }

    pub async fn set_rows_per_page(&self, rows_per_page: usize) {
        self.inner.lock().await.page.set_rows_per_page(rows_per_page);
        let _ = self.events.send(TableEvent::Changed);
    }

    pub async fn set_dense(&self, dense: bool) {
        self.inner.lock().await.page.dense = dense;
    }

    /// Checked selects the whole filtered collection, not just the current
    /// page; unchecked clears.
    pub async fn select_all(&self, checked: bool) {
        let mut inner = self.inner.lock().await;
        let view = self.view_locked(&mut inner).await;
        inner.selection.select_all(checked, &view.filtered_keys);
    }

    pub async fn toggle_selection(&self, key: R::Key) {
        let mut inner = self.inner.lock().await;
        inner.selection.toggle(key);
        self.view_locked(&mut inner).await;
    }

    pub async fn selected_keys(&self) -> Vec<R::Key> {
        self.inner.lock().await.selection.keys().cloned().collect()
    }

    /// Local-only removal: the server is never asked to delete, so a later
    /// resync can resurrect the row. Always reports success.
    pub async fn delete_one(&self, key: &R::Key) {
        let mut inner = self.inner.lock().await;
        self.store.lock().await.remove(key);
        inner.selection.remove(key);
        let view = self.view_locked(&mut inner).await;
        inner.page.adjust_after_delete(view.rows.len());
        self.sink.notify_success("Delete success!");
        let _ = self.events.send(TableEvent::Changed);
    }

    /// Bulk variant of [`TableSession::delete_one`] over the current
    /// selection.
    pub async fn delete_selected(&self) {
        let mut inner = self.inner.lock().await;
        let doomed: Vec<R::Key> = inner.selection.keys().cloned().collect();
        if doomed.is_empty() {
            return;
        }
        self.store.lock().await.remove_all(doomed.iter());
        inner.selection.clear();
        let view = self.view_locked(&mut inner).await;
        inner
            .page
            .adjust_after_bulk_delete(view.rows.len(), view.total_filtered());
        self.sink.notify_success("Delete success!");
        let _ = self.events.send(TableEvent::Changed);
    }

    /// Idempotent teardown: releases the push channel and marks the session
    /// disposed so late snapshot responses are ignored. Drop does the same.
    pub async fn close(&self) {
        let mut inner = self.inner.lock().await;
        if inner.closed {
            return;
        }
        inner.closed = true;
        self.channel_task.abort();
    }
}

impl<R: TableRecord> Drop for TableSession<R> {
    fn drop(&mut self) {
        self.channel_task.abort();
    }
}

fn push_channel_url(server: &Url, resource: Resource) -> Result<String, SyncError> {
    let scheme = match server.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => {
            return Err(SyncError::InvalidServerUrl(format!(
                "unsupported scheme {other}: {server}"
            )))
        }
    };
    let mut url = server.clone();
    if url.set_scheme(scheme).is_err() {
        return Err(SyncError::InvalidServerUrl(server.to_string()));
    }
    url.set_path(resource.ws_path());
    Ok(url.to_string())
}

#[cfg(test)]
#[path = "tests/session_tests.rs"]
mod tests;
