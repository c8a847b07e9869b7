//! Server-side resynchronisation trigger.

use std::sync::Arc;

use serde_json::json;
use tracing::info;
use url::Url;

use shared::{
    error::ApiError,
    protocol::{Resource, SnapshotQuery},
};

use crate::status::StatusSink;
use crate::SyncError;

/// Asks the backend to refresh a resource from the upstream inventory API.
/// The request mutates nothing locally; refreshed entities arrive later
/// through the push channel. Rows deleted locally may come back.
pub struct ResyncClient {
    http: reqwest::Client,
    base: Url,
    sink: Arc<dyn StatusSink>,
}

impl ResyncClient {
    pub fn new(base: Url, sink: Arc<dyn StatusSink>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base,
            sink,
        }
    }

    pub async fn trigger(
        &self,
        resource: Resource,
        query: Option<&SnapshotQuery>,
    ) -> Result<(), SyncError> {
        self.sink.loading(true);
        let result = self.request(resource, query).await;
        self.sink.loading(false);
        match &result {
            Ok(()) => info!(path = resource.load_path(), "resync accepted"),
            Err(err) => self
                .sink
                .notify_error(&format!("There was an error fetching the updates: {err}")),
        }
        result
    }

    async fn request(
        &self,
        resource: Resource,
        query: Option<&SnapshotQuery>,
    ) -> Result<(), SyncError> {
        let mut url = self.base.clone();
        url.set_path(resource.load_path());

        let mut request = self.http.post(url);
        if let Some(query) = query {
            // The load endpoints take snake_case bounds in the body.
            request = request.json(&json!({
                "start_date": query.start_date,
                "end_date": query.end_date,
            }));
        }

        let response = request.send().await?;
        if let Err(err) = response.error_for_status_ref() {
            if let Ok(api_error) = response.json::<ApiError>().await {
                return Err(SyncError::Api(api_error));
            }
            return Err(err.into());
        }
        Ok(())
    }
}
