//! Table bindings for the dashboard's entity schemas.

use std::cmp::Ordering;

use chrono::NaiveDate;

use shared::{
    domain::{ItemId, SalesOrderId},
    protocol::{InventoryItem, SalesOrder},
};

use crate::store::TableRecord;

impl TableRecord for InventoryItem {
    type Key = ItemId;

    fn key(&self) -> ItemId {
        self.item_id
    }

    fn search_text(&self) -> &str {
        &self.name
    }

    fn status_label(&self) -> &'static str {
        self.status.label()
    }

    fn compare_field(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "itemId" => self.item_id.0.cmp(&other.item_id.0),
            "sku" => self.sku.cmp(&other.sku),
            "name" => self.name.cmp(&other.name),
            "status" => self.status.label().cmp(other.status.label()),
            "stockOnHand" => self.stock_on_hand.cmp(&other.stock_on_hand),
            _ => Ordering::Equal,
        }
    }
}

impl TableRecord for SalesOrder {
    type Key = SalesOrderId;

    fn key(&self) -> SalesOrderId {
        self.salesorder_id.clone()
    }

    fn search_text(&self) -> &str {
        &self.salesorder_number
    }

    fn status_label(&self) -> &'static str {
        self.status.label()
    }

    fn event_date(&self) -> Option<NaiveDate> {
        self.date
    }

    fn compare_field(&self, other: &Self, field: &str) -> Ordering {
        match field {
            "salesorderId" => self.salesorder_id.0.cmp(&other.salesorder_id.0),
            "salesorderNumber" => self.salesorder_number.cmp(&other.salesorder_number),
            "date" => self.date.cmp(&other.date),
            "status" => self.status.label().cmp(other.status.label()),
            _ => Ordering::Equal,
        }
    }
}
