//! Row selection, constrained to the currently visible filtered collection.

use std::collections::HashSet;
use std::hash::Hash;

#[derive(Debug, Clone)]
pub struct SelectionController<K: Clone + Eq + Hash> {
    selected: HashSet<K>,
}

impl<K: Clone + Eq + Hash> Default for SelectionController<K> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Clone + Eq + Hash> SelectionController<K> {
    pub fn new() -> Self {
        Self {
            selected: HashSet::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.selected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_empty()
    }

    pub fn is_selected(&self, key: &K) -> bool {
        self.selected.contains(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.selected.iter()
    }

    /// Checked selects exactly the filtered collection's keys (not just the
    /// current page); unchecked clears the selection.
    pub fn select_all(&mut self, checked: bool, visible_keys: &[K]) {
        if checked {
            self.selected = visible_keys.iter().cloned().collect();
        } else {
            self.selected.clear();
        }
    }

    pub fn toggle(&mut self, key: K) {
        if !self.selected.remove(&key) {
            self.selected.insert(key);
        }
    }

    pub fn remove(&mut self, key: &K) {
        self.selected.remove(key);
    }

    pub fn clear(&mut self) {
        self.selected.clear();
    }

    /// Drops selections referring to rows no longer visible, keeping the
    /// selection a subset of the filtered collection.
    pub fn retain_visible(&mut self, visible_keys: &[K]) {
        let visible: HashSet<&K> = visible_keys.iter().collect();
        self.selected.retain(|key| visible.contains(key));
    }
}

#[cfg(test)]
#[path = "tests/selection_tests.rs"]
mod tests;
