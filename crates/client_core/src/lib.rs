//! Live table engine for the inventory dashboard.
//!
//! Merges a one-shot bulk snapshot with an unordered stream of push events
//! into one canonical, uniquely-keyed, order-stable collection per view, and
//! derives filtered/sorted/paginated selectable slices over it while local
//! deletes and remote mutations interleave.

use shared::error::ApiError;
use thiserror::Error;

pub mod channel;
mod records;
pub mod resync;
pub mod selection;
pub mod session;
pub mod snapshot;
pub mod status;
pub mod store;
pub mod view;

pub use channel::{ChannelState, FixedBackoff, NoReconnect, ReconnectPolicy};
pub use resync::ResyncClient;
pub use selection::SelectionController;
pub use session::{LoadState, SessionOptions, TableEvent, TableSession};
pub use snapshot::{GraphqlSnapshotSource, SnapshotSource};
pub use status::{StatusSink, TracingStatusSink};
pub use store::{EntityStore, TableRecord};
pub use view::{
    compute_view, status_counts, DateRange, FilterState, PageState, SortDirection, SortState,
    StatusFilter, TableView,
};

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("payload decode failed: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("snapshot response is missing data field {0}")]
    MalformedSnapshot(&'static str),
    #[error("invalid server url: {0}")]
    InvalidServerUrl(String),
    #[error(transparent)]
    Api(#[from] ApiError),
}
