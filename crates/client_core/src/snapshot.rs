//! One-shot bulk reads establishing a view's baseline collection.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::json;
use url::Url;

use shared::protocol::{Resource, SnapshotQuery};

use crate::SyncError;

#[async_trait]
pub trait SnapshotSource<R>: Send + Sync {
    async fn fetch(&self, query: &SnapshotQuery) -> Result<Vec<R>, SyncError>;
}

const ITEMS_QUERY: &str =
    "{ allZohoInventoryItems { itemId sku name status stockOnHand } }";

const ORDERS_QUERY: &str = "query GetSalesOrders($startDate: String, $endDate: String) \
     { allZohoInventorySalesOrders(startDate: $startDate, endDate: $endDate) \
     { salesorderId salesorderNumber date status lineItems } }";

/// Bulk reads via the dashboard backend's GraphQL endpoint.
pub struct GraphqlSnapshotSource {
    http: reqwest::Client,
    endpoint: Url,
    resource: Resource,
}

impl GraphqlSnapshotSource {
    pub fn new(base: &Url, resource: Resource) -> Self {
        let mut endpoint = base.clone();
        endpoint.set_path("/api_zoho/graphql/");
        Self {
            http: reqwest::Client::new(),
            endpoint,
            resource,
        }
    }

    fn query_document(&self) -> &'static str {
        match self.resource {
            Resource::InventoryItems => ITEMS_QUERY,
            Resource::SalesOrders => ORDERS_QUERY,
        }
    }
}

#[async_trait]
impl<R> SnapshotSource<R> for GraphqlSnapshotSource
where
    R: DeserializeOwned + Send + Sync + 'static,
{
    async fn fetch(&self, query: &SnapshotQuery) -> Result<Vec<R>, SyncError> {
        let body = json!({
            "query": self.query_document(),
            "variables": query,
        });
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let payload: serde_json::Value = response.json().await?;
        let rows = payload
            .get("data")
            .and_then(|data| data.get(self.resource.graphql_field()))
            .cloned()
            .ok_or_else(|| SyncError::MalformedSnapshot(self.resource.graphql_field()))?;
        Ok(serde_json::from_value(rows)?)
    }
}
