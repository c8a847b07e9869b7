//! Derived table views: sort → filter → paginate over a frozen collection.

use chrono::NaiveDate;

use crate::store::TableRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortState {
    /// Column id, matching the wire field names of the sortable columns.
    pub field: String,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(field: impl Into<String>, direction: SortDirection) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    pub fn ascending(field: impl Into<String>) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    /// Repeated sorts on the same column flip the direction; a new column
    /// starts ascending.
    pub fn toggle(&mut self, field: &str) {
        if self.field == field {
            self.direction = match self.direction {
                SortDirection::Asc => SortDirection::Desc,
                SortDirection::Desc => SortDirection::Asc,
            };
        } else {
            self.field = field.to_string();
            self.direction = SortDirection::Asc;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum StatusFilter {
    /// Matches every status value.
    #[default]
    All,
    /// Exact match on the wire status label.
    Only(String),
}

impl StatusFilter {
    pub fn matches(&self, label: &str) -> bool {
        match self {
            Self::All => true,
            Self::Only(wanted) => wanted == label,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Both bounds set with the end before the start. The toolbar surfaces
    /// this as a field error and the range filters nothing until corrected.
    pub fn is_inverted(&self) -> bool {
        matches!((self.start, self.end), (Some(start), Some(end)) if end < start)
    }

    pub fn contains(&self, date: Option<NaiveDate>) -> bool {
        if self.is_unbounded() || self.is_inverted() {
            return true;
        }
        let Some(date) = date else {
            return false;
        };
        if self.start.is_some_and(|start| date < start) {
            return false;
        }
        if self.end.is_some_and(|end| date > end) {
            return false;
        }
        true
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterState {
    /// Case-insensitive substring matched against the record's search text.
    pub query: String,
    pub status: StatusFilter,
    pub date_range: DateRange,
}

impl FilterState {
    /// True when any filter differs from its default. Drives the reset
    /// affordance and lets callers distinguish "no data" from "no matches".
    pub fn can_reset(&self) -> bool {
        !self.query.is_empty()
            || self.status != StatusFilter::All
            || !self.date_range.is_unbounded()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageState {
    pub page: usize,
    pub rows_per_page: usize,
    pub dense: bool,
}

impl Default for PageState {
    fn default() -> Self {
        Self {
            page: 0,
            rows_per_page: 5,
            dense: false,
        }
    }
}

impl PageState {
    pub fn reset(&mut self) {
        self.page = 0;
    }

    pub fn set_rows_per_page(&mut self, rows_per_page: usize) {
        self.rows_per_page = rows_per_page.max(1);
        self.page = 0;
    }

    /// After a single-row delete: if the removal emptied the current page
    /// and a previous page exists, step back one page.
    pub fn adjust_after_delete(&mut self, rows_remaining_on_page: usize) {
        if self.page > 0 && rows_remaining_on_page == 0 {
            self.page -= 1;
        }
    }

    /// After a bulk delete, with post-deletion counts: the single-delete
    /// boundary rule, then a clamp to the new last page.
    pub fn adjust_after_bulk_delete(
        &mut self,
        rows_remaining_on_page: usize,
        total_rows_filtered: usize,
    ) {
        self.adjust_after_delete(rows_remaining_on_page);
        let last_page = if total_rows_filtered == 0 {
            0
        } else {
            (total_rows_filtered - 1) / self.rows_per_page
        };
        if self.page > last_page {
            self.page = last_page;
        }
    }
}

/// One rendered slice of the collection plus the counters the table chrome
/// needs.
#[derive(Debug, Clone, PartialEq)]
pub struct TableView<R: TableRecord> {
    /// Rows of the current page, post sort and filter.
    pub rows: Vec<R>,
    /// Keys of the whole filtered collection, in display order. Select-all
    /// targets these, not just the current page.
    pub filtered_keys: Vec<R::Key>,
    pub can_reset: bool,
    pub not_found: bool,
    /// Padding rows needed to keep the last page the same height as a full
    /// one.
    pub empty_rows: usize,
}

impl<R: TableRecord> TableView<R> {
    pub fn total_filtered(&self) -> usize {
        self.filtered_keys.len()
    }
}

/// Stable sort by the configured column; ties keep their collection order
/// (std's `sort_by` is stable), so equal sort keys render deterministically.
pub fn sort_rows<R: TableRecord>(mut rows: Vec<R>, sort: &SortState) -> Vec<R> {
    match sort.direction {
        SortDirection::Asc => rows.sort_by(|a, b| a.compare_field(b, &sort.field)),
        SortDirection::Desc => rows.sort_by(|a, b| b.compare_field(a, &sort.field)),
    }
    rows
}

pub fn filter_rows<R: TableRecord>(rows: Vec<R>, filters: &FilterState) -> Vec<R> {
    let needle = filters.query.to_lowercase();
    rows.into_iter()
        .filter(|row| {
            (needle.is_empty() || row.search_text().to_lowercase().contains(&needle))
                && filters.status.matches(row.status_label())
                && filters.date_range.contains(row.event_date())
        })
        .collect()
}

pub fn paginate<R: Clone>(filtered: &[R], page: &PageState) -> Vec<R> {
    let start = page
        .page
        .saturating_mul(page.rows_per_page)
        .min(filtered.len());
    let end = (start + page.rows_per_page).min(filtered.len());
    filtered[start..end].to_vec()
}

pub fn empty_rows(page: usize, rows_per_page: usize, total_filtered: usize) -> usize {
    if page == 0 {
        return 0;
    }
    ((page + 1) * rows_per_page).saturating_sub(total_filtered)
}

/// The full pipeline, applied in this fixed order: sort → filter → paginate.
pub fn compute_view<R: TableRecord>(
    collection: Vec<R>,
    filters: &FilterState,
    sort: &SortState,
    page: &PageState,
) -> TableView<R> {
    let filtered = filter_rows(sort_rows(collection, sort), filters);
    let rows = paginate(&filtered, page);
    TableView {
        empty_rows: empty_rows(page.page, page.rows_per_page, filtered.len()),
        not_found: filtered.is_empty(),
        can_reset: filters.can_reset(),
        filtered_keys: filtered.iter().map(TableRecord::key).collect(),
        rows,
    }
}

/// Per-status row counts for the tab strip, computed over the unfiltered
/// collection.
pub fn status_counts<R: TableRecord>(
    rows: &[R],
    labels: &[&'static str],
) -> Vec<(&'static str, usize)> {
    labels
        .iter()
        .map(|label| {
            (
                *label,
                rows.iter().filter(|row| row.status_label() == *label).count(),
            )
        })
        .collect()
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod tests;
