use std::cmp::Reverse;

use crate::constants::PAGE_SIZE;
use crate::models::{FeedError, FeedSnapshot, Notification, NotificationPage};

/// Local edit applied before the server confirms it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OptimisticEdit<'a> {
    MarkRead(&'a str),
    MarkAllRead,
}

/// What `merge_push` did with a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Prepended to `items`
    Merged,
    /// Id already present; payload dropped without touching state
    Duplicate,
    /// Belongs to another scope; only counters moved
    CrossScope,
}

/// Canonical feed state. Every method is a synchronous reducer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeedStore {
    items: Vec<Notification>,
    total: u64,
    cross_scope_unread: u64,
    error: Option<FeedError>,
}

impl FeedStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Back to the empty session state.
    pub fn reset(&mut self) {
        self.items.clear();
        self.total = 0;
        self.cross_scope_unread = 0;
        self.error = None;
    }

    // ===== Getters =====

    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    pub fn total(&self) -> u64 {
        self.total
    }

    pub fn cross_scope_unread(&self) -> u64 {
        self.cross_scope_unread
    }

    pub fn error(&self) -> Option<&FeedError> {
        self.error.as_ref()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.items.iter().any(|i| i.same_id(Some(id)))
    }

    /// Unread items in the list plus unread arrivals for other scopes.
    pub fn unread_count(&self) -> u64 {
        self.items.iter().filter(|i| i.is_unread()).count() as u64 + self.cross_scope_unread
    }

    pub fn has_more(&self) -> bool {
        self.total > self.items.len() as u64
    }

    pub fn snapshot(&self, loading: bool) -> FeedSnapshot {
        FeedSnapshot {
            items: self.items.clone(),
            total: self.total,
            unread_count: self.unread_count(),
            cross_scope_unread: self.cross_scope_unread,
            has_more: self.has_more(),
            loading,
            error: self.error.clone(),
        }
    }

    // ===== Reducers =====

    /// Replace local state with a freshly pulled first page.
    pub fn apply_authoritative(&mut self, page: NotificationPage) {
        let mut items = page.items;
        items.sort_by_key(|i| Reverse(i.sort_key()));
        self.total = page.total.unwrap_or(items.len() as u64);
        self.items = items;
        self.cross_scope_unread = 0;
        self.error = None;
    }

    /// Append a follow-up page to the tail.
    pub fn append_page(&mut self, page: NotificationPage) {
        self.items.extend(page.items);
        self.total = page.total.unwrap_or(self.items.len() as u64);
        self.error = None;
    }

    /// Stamp `read_at` locally. Existing `read_at` values are never overwritten.
    /// Returns how many items changed.
    pub fn apply_optimistic(&mut self, edit: OptimisticEdit<'_>, now: &str) -> usize {
        match edit {
            OptimisticEdit::MarkRead(id) => {
                match self
                    .items
                    .iter_mut()
                    .find(|i| i.same_id(Some(id)) && i.is_unread())
                {
                    Some(item) => {
                        item.read_at = Some(now.to_string());
                        1
                    }
                    None => 0,
                }
            }
            OptimisticEdit::MarkAllRead => {
                let mut changed = 0;
                for item in self.items.iter_mut().filter(|i| i.is_unread()) {
                    item.read_at = Some(now.to_string());
                    changed += 1;
                }
                self.cross_scope_unread = 0;
                changed
            }
        }
    }

    /// Merge one pushed notification.
    ///
    /// Invitations and items for `active_scope` enter the list (deduplicated by
    /// id, trimmed to the page window from the tail). Anything else only bumps
    /// `total` and, when unread, the cross-scope counter.
    pub fn merge_push(
        &mut self,
        payload: Notification,
        active_scope: Option<&str>,
    ) -> MergeOutcome {
        let in_scope = payload.kind.is_invitation()
            || (payload.scope.is_some() && payload.scope.as_deref() == active_scope);

        if !in_scope {
            if payload.is_unread() {
                self.cross_scope_unread += 1;
            }
            self.total += 1;
            return MergeOutcome::CrossScope;
        }

        if let Some(id) = payload.id.as_deref() {
            if self.contains(id) {
                return MergeOutcome::Duplicate;
            }
        }

        self.items.insert(0, payload);
        self.items.truncate(PAGE_SIZE);
        self.total += 1;
        MergeOutcome::Merged
    }

    pub fn record_error(&mut self, error: FeedError) {
        self.error = Some(error);
    }
}
