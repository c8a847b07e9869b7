//! Live update channel: a scoped websocket subscription feeding the store.

use std::sync::Arc;
use std::time::Duration;

use futures::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use tokio::sync::{broadcast, watch, Mutex};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{info, warn};

use shared::protocol::{PushEnvelope, PushKind};

use crate::session::TableEvent;
use crate::store::{EntityStore, TableRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Connecting,
    Open,
    /// The server closed the connection or the session released it.
    Closed,
    Failed,
}

/// Retry schedule consulted after every disconnect.
pub trait ReconnectPolicy: Send + Sync {
    /// Delay before reconnect attempt `attempt` (1-based); `None` gives up.
    fn retry_delay(&self, attempt: u32) -> Option<Duration>;
}

/// Default policy: a dropped connection stays down until the view remounts.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReconnect;

impl ReconnectPolicy for NoReconnect {
    fn retry_delay(&self, _attempt: u32) -> Option<Duration> {
        None
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedBackoff {
    pub delay: Duration,
    pub max_attempts: u32,
}

impl ReconnectPolicy for FixedBackoff {
    fn retry_delay(&self, attempt: u32) -> Option<Duration> {
        (attempt <= self.max_attempts).then_some(self.delay)
    }
}

/// Applies one push envelope to the store. Created and updated both resolve
/// to the same upsert because the transport guarantees neither ordering nor
/// at-most-once delivery, making the merge idempotent per key; deleted
/// removes the row (a no-op when the key is already gone).
pub(crate) async fn apply_envelope<R: TableRecord>(
    store: &Mutex<EntityStore<R>>,
    envelope: PushEnvelope<R>,
) {
    let mut store = store.lock().await;
    match envelope.kind {
        PushKind::Created | PushKind::Updated => store.upsert(envelope.item),
        PushKind::Deleted => {
            store.remove(&envelope.item.key());
        }
    }
}

fn publish_state(
    state_tx: &watch::Sender<ChannelState>,
    events: &broadcast::Sender<TableEvent>,
    state: ChannelState,
) {
    let _ = state_tx.send(state);
    let _ = events.send(TableEvent::ChannelStateChanged(state));
}

/// Connection loop for one resource's push channel. Runs until the policy
/// gives up or the owning session aborts the task.
pub(crate) async fn run_channel<R>(
    ws_url: String,
    store: Arc<Mutex<EntityStore<R>>>,
    events: broadcast::Sender<TableEvent>,
    state_tx: watch::Sender<ChannelState>,
    policy: Arc<dyn ReconnectPolicy>,
) where
    R: TableRecord + DeserializeOwned,
{
    let mut attempt = 0u32;
    loop {
        publish_state(&state_tx, &events, ChannelState::Connecting);
        match connect_async(&ws_url).await {
            Ok((ws_stream, _)) => {
                attempt = 0;
                publish_state(&state_tx, &events, ChannelState::Open);
                let (_, reader) = ws_stream.split();
                let closed_cleanly = read_frames(reader, &store, &events).await;
                let state = if closed_cleanly {
                    ChannelState::Closed
                } else {
                    ChannelState::Failed
                };
                publish_state(&state_tx, &events, state);
            }
            Err(err) => {
                warn!("push channel connect failed: {ws_url}: {err}");
                publish_state(&state_tx, &events, ChannelState::Failed);
            }
        }
        attempt += 1;
        match policy.retry_delay(attempt) {
            Some(delay) => {
                info!(attempt, "push channel reconnecting in {delay:?}");
                tokio::time::sleep(delay).await;
            }
            None => break,
        }
    }
}

async fn read_frames<R, S>(
    mut reader: S,
    store: &Mutex<EntityStore<R>>,
    events: &broadcast::Sender<TableEvent>,
) -> bool
where
    R: TableRecord + DeserializeOwned,
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while let Some(frame) = reader.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<PushEnvelope<R>>(&text) {
                Ok(envelope) => {
                    apply_envelope(store, envelope).await;
                    let _ = events.send(TableEvent::Changed);
                }
                Err(err) => warn!("skipping undecodable push frame: {err}"),
            },
            Ok(Message::Close(_)) => return true,
            Ok(_) => {}
            Err(err) => {
                let _ = events.send(TableEvent::Error(format!(
                    "push channel receive failed: {err}"
                )));
                return false;
            }
        }
    }
    true
}

#[cfg(test)]
#[path = "tests/channel_tests.rs"]
mod tests;
