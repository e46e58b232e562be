//! Group discovery browser
//!
//! Holds what the join screen shows: the groups loaded so far, the
//! continuation cursor, and the active search term. Searching replaces the
//! list; clearing the term goes back to the default first page.

use crate::error::QueueError;
use crate::groups::{GroupPage, GroupRegistry};
use qd_models::{Group, GroupCursor};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace};

pub struct GroupDirectory {
    registry: Arc<GroupRegistry>,
    groups: Vec<Group>,
    cursor: Option<GroupCursor>,
    has_more: bool,
    search_term: String,
}

impl GroupDirectory {
    pub fn new(registry: Arc<GroupRegistry>) -> Self {
        Self {
            registry,
            groups: Vec::new(),
            cursor: None,
            has_more: false,
            search_term: String::new(),
        }
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn search_term(&self) -> &str {
        &self.search_term
    }

    /// Drop everything loaded and fetch the newest page
    pub async fn load_first_page(&mut self) -> Result<&[Group], QueueError> {
        let page = self.registry.list_groups(None).await?;
        self.search_term.clear();
        self.replace(page);
        Ok(&self.groups)
    }

    /// Append the next page. Does nothing when there is no next page or a
    /// search is active. Returns how many groups were added.
    pub async fn load_more(&mut self) -> Result<usize, QueueError> {
        if !self.has_more || !self.search_term.is_empty() {
            trace!("load_more skipped (has_more={}, searching={})", self.has_more, !self.search_term.is_empty());
            return Ok(0);
        }

        let page = self.registry.list_groups(self.cursor.as_ref()).await?;
        let added = page.groups.len();
        self.groups.extend(page.groups);
        self.cursor = page.cursor;
        self.has_more = page.has_more;
        Ok(added)
    }

    /// Search by name; a blank term resets to the first page
    pub async fn search(&mut self, term: &str) -> Result<&[Group], QueueError> {
        if term.trim().is_empty() {
            return self.load_first_page().await;
        }
        let page = self.registry.search_by_name(term).await?;
        self.show_search_results(term, page);
        Ok(&self.groups)
    }

    /// Install results produced by a [`DebouncedSearch`]
    pub fn show_search_results(&mut self, term: &str, page: GroupPage) {
        self.search_term = term.trim().to_string();
        self.replace(page);
    }

    /// Handle for running debounced searches against the same registry
    pub fn debounced(&self) -> DebouncedSearch {
        let delay = Duration::from_millis(self.registry.discovery().search_debounce_ms);
        DebouncedSearch::new(self.registry.clone(), delay)
    }

    fn replace(&mut self, page: GroupPage) {
        self.groups = page.groups;
        self.cursor = page.cursor;
        self.has_more = page.has_more;
    }
}

/// Quiet-period gate: each call waits out the delay and only proceeds if no
/// newer call started in the meantime.
#[derive(Clone)]
pub struct SearchDebouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
}

impl SearchDebouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Returns `false` if a newer call superseded this one
    pub async fn settle(&self) -> bool {
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        tokio::time::sleep(self.delay).await;
        self.generation.load(Ordering::SeqCst) == ticket
    }
}

/// Search-as-you-type: only the most recent pending term hits the store
#[derive(Clone)]
pub struct DebouncedSearch {
    registry: Arc<GroupRegistry>,
    debouncer: SearchDebouncer,
}

impl DebouncedSearch {
    pub fn new(registry: Arc<GroupRegistry>, delay: Duration) -> Self {
        Self {
            registry,
            debouncer: SearchDebouncer::new(delay),
        }
    }

    /// `None` when a later keystroke superseded this term
    pub async fn search(&self, term: &str) -> Option<Result<GroupPage, QueueError>> {
        if !self.debouncer.settle().await {
            trace!("Search '{}' superseded", term);
            return None;
        }
        debug!("Running debounced search '{}'", term);
        Some(self.registry.search_by_name(term).await)
    }
}
