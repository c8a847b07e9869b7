use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::domain::{ItemId, ItemStatus, OrderStatus, SalesOrderId};

/// Dashboard resources that expose a snapshot query, a push channel and a
/// resync endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    InventoryItems,
    SalesOrders,
}

impl Resource {
    pub fn ws_path(self) -> &'static str {
        match self {
            Self::InventoryItems => "/ws/inventory_items/",
            Self::SalesOrders => "/ws/inventory_sales_order/",
        }
    }

    pub fn load_path(self) -> &'static str {
        match self {
            Self::InventoryItems => "/api_zoho/load/inventory_items/",
            Self::SalesOrders => "/api_zoho/load/inventory_shipment_orders/",
        }
    }

    pub fn graphql_field(self) -> &'static str {
        match self {
            Self::InventoryItems => "allZohoInventoryItems",
            Self::SalesOrders => "allZohoInventorySalesOrders",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    pub item_id: ItemId,
    pub sku: String,
    pub name: String,
    pub status: ItemStatus,
    pub stock_on_hand: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sku: String,
    #[serde(default)]
    pub quantity_shipped: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesOrder {
    pub salesorder_id: SalesOrderId,
    pub salesorder_number: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub status: OrderStatus,
    #[serde(default, deserialize_with = "deserialize_line_items")]
    pub line_items: Vec<LineItem>,
}

/// Line items arrive either as a structured array or as a JSON-encoded
/// string, depending on which upstream path produced the record. Both forms
/// normalise to a `Vec<LineItem>`; anything undecodable becomes an empty
/// list rather than a deserialization error.
pub fn parse_line_items(value: Value) -> Vec<LineItem> {
    match value {
        Value::Null => Vec::new(),
        Value::String(raw) => serde_json::from_str(&raw).unwrap_or_else(|err| {
            warn!("discarding undecodable line items payload: {err}");
            Vec::new()
        }),
        other => serde_json::from_value(other).unwrap_or_else(|err| {
            warn!("discarding malformed line items payload: {err}");
            Vec::new()
        }),
    }
}

fn deserialize_line_items<'de, D>(deserializer: D) -> Result<Vec<LineItem>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(parse_line_items(value))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushKind {
    Created,
    Updated,
    Deleted,
}

/// Wire envelope for one push notification: `{"type": "...", "item": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushEnvelope<R> {
    #[serde(rename = "type")]
    pub kind: PushKind,
    pub item: R,
}

/// Parameters of the bulk snapshot query. Only the sales order resource
/// honours the date bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl SnapshotQuery {
    pub fn bounded(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date: Some(start_date),
            end_date: Some(end_date),
        }
    }
}

#[cfg(test)]
#[path = "tests/protocol_tests.rs"]
mod tests;
