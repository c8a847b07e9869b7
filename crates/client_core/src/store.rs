//! Canonical keyed collection backing one live table.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt::Debug;
use std::hash::Hash;

use chrono::NaiveDate;

/// Binds an entity schema to the table engine: key extraction, filter
/// targets and per-column comparators. One implementation per entity type
/// replaces the per-table copies of the merge/filter/sort logic.
pub trait TableRecord: Clone + Send + Sync + 'static {
    type Key: Clone + Eq + Hash + Debug + Send + Sync + 'static;

    fn key(&self) -> Self::Key;

    /// Text field targeted by the toolbar search filter.
    fn search_text(&self) -> &str;

    /// Wire label of the record's status, matched exactly by the status tabs.
    fn status_label(&self) -> &'static str;

    /// Date used by the range filter. Records without one never match a
    /// bounded range.
    fn event_date(&self) -> Option<NaiveDate> {
        None
    }

    /// Comparator backing sortable columns, keyed by column id. Unknown
    /// fields compare equal, which leaves the incoming order untouched.
    fn compare_field(&self, other: &Self, field: &str) -> Ordering;
}

/// Ordered collection of entities, unique by key. Newly created entities are
/// prepended; updated entities keep their position.
#[derive(Debug, Clone)]
pub struct EntityStore<R: TableRecord> {
    rows: Vec<R>,
}

impl<R: TableRecord> Default for EntityStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: TableRecord> EntityStore<R> {
    pub fn new() -> Self {
        Self { rows: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Last-applied-wins merge of one entity: replaces in place when the key
    /// is already present, otherwise inserts at the front.
    pub fn upsert(&mut self, entity: R) {
        let key = entity.key();
        match self.rows.iter().position(|row| row.key() == key) {
            Some(index) => self.rows[index] = entity,
            None => self.rows.insert(0, entity),
        }
    }

    /// Removes the entity with the given key; no-op when absent.
    pub fn remove(&mut self, key: &R::Key) -> bool {
        let before = self.rows.len();
        self.rows.retain(|row| row.key() != *key);
        self.rows.len() != before
    }

    pub fn remove_all<'a, I>(&mut self, keys: I)
    where
        I: IntoIterator<Item = &'a R::Key>,
        R::Key: 'a,
    {
        let doomed: HashSet<&R::Key> = keys.into_iter().collect();
        if doomed.is_empty() {
            return;
        }
        self.rows.retain(|row| !doomed.contains(&row.key()));
    }

    /// Establishes the snapshot baseline. Rows already present were applied
    /// from push events after the view mounted and are at least as fresh as
    /// the bulk read, so they win; snapshot rows with unseen keys are
    /// appended in snapshot order.
    pub fn apply_snapshot(&mut self, baseline: Vec<R>) {
        if self.rows.is_empty() {
            self.rows = baseline;
            return;
        }
        let seen: HashSet<R::Key> = self.rows.iter().map(TableRecord::key).collect();
        for row in baseline {
            if !seen.contains(&row.key()) {
                self.rows.push(row);
            }
        }
    }

    /// Frozen copy of the collection; no live reference escapes the store.
    pub fn snapshot(&self) -> Vec<R> {
        self.rows.clone()
    }
}

#[cfg(test)]
#[path = "tests/store_tests.rs"]
mod tests;
