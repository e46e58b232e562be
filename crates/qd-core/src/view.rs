//! Derived queue views
//!
//! A visible queue is always recomputed from scratch: drop the viewer's
//! watched items, apply the service filter, then stable-sort. Watched state
//! is per viewer and never touches the items themselves.

use qd_models::{ItemId, QueueItem, QueueView, SortOption};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashSet};

pub fn visible_queue(queue: &[QueueItem], watched: &[ItemId], view: &QueueView) -> Vec<QueueItem> {
    let watched: HashSet<&ItemId> = watched.iter().collect();

    let mut visible: Vec<QueueItem> = queue
        .iter()
        .filter(|item| !watched.contains(&item.id))
        .filter(|item| view.service.matches(&item.service))
        .cloned()
        .collect();

    // slice::sort_by is stable, so ties keep array order
    visible.sort_by(|a, b| compare(a, b, view.sort));
    visible
}

fn compare(a: &QueueItem, b: &QueueItem, sort: SortOption) -> Ordering {
    // A missing addedAt sorts as the oldest possible item
    match sort {
        SortOption::DateAsc => a.added_at.cmp(&b.added_at),
        SortOption::DateDesc => b.added_at.cmp(&a.added_at),
        SortOption::ServiceAsc => a.service.cmp(&b.service),
        SortOption::ServiceDesc => b.service.cmp(&a.service),
    }
}

/// Distinct non-empty services present in `items`, for a filter selector
pub fn services_in(items: &[QueueItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| item.service.as_str())
        .filter(|service| !service.trim().is_empty())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}
