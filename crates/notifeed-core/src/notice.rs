// Transient user-facing notices raised for push arrivals and rejected edits,
// plus an in-memory presenter queue with priorities, auto-dismiss and
// duplicate suppression.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::constants::DEFAULT_NOTICE_TITLE;
use crate::models::{FeedError, Notification};

/// Notice priority levels (higher = more important)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum NoticeVariant {
    /// Push arrivals
    Info,
    /// Edits the server rejected
    Warning,
}

impl NoticeVariant {
    pub fn icon(&self) -> &'static str {
        match self {
            NoticeVariant::Info => "ℹ",
            NoticeVariant::Warning => "⚠",
        }
    }

    fn default_duration(&self) -> Duration {
        match self {
            NoticeVariant::Info => Duration::from_secs(3),
            NoticeVariant::Warning => Duration::from_secs(4),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub message: String,
    pub variant: NoticeVariant,
}

impl Notice {
    /// Notice for a pushed notification. The title names the originating
    /// organization only when `qualify_scope` is set.
    pub fn for_arrival(payload: &Notification, qualify_scope: bool) -> Self {
        let title = match (qualify_scope, origin_name(payload)) {
            (true, Some(origin)) => format!("{} from {}", DEFAULT_NOTICE_TITLE, origin),
            _ => DEFAULT_NOTICE_TITLE.to_string(),
        };
        Self {
            title,
            message: payload.display_message().to_string(),
            variant: NoticeVariant::Info,
        }
    }

    /// Warning for an edit that was rolled back
    pub fn for_failure(title: &str, error: &FeedError) -> Self {
        Self {
            title: title.to_string(),
            message: error.message.clone(),
            variant: NoticeVariant::Warning,
        }
    }
}

fn origin_name(payload: &Notification) -> Option<&str> {
    payload.organization_name().or(payload.scope.as_deref())
}

#[derive(Debug, thiserror::Error)]
pub enum NoticeError {
    #[error("Notice presenter unavailable: {0}")]
    Unavailable(String),
}

/// Displays transient notices. Failures are reported, never retried.
pub trait NoticePresenter: Send + Sync {
    fn show(&self, notice: Notice) -> Result<(), NoticeError>;
}

/// A notice waiting in or shown by the queue
#[derive(Debug, Clone)]
pub struct QueuedNotice {
    pub notice: Notice,
    /// Monotonic sequence number assigned on push
    pub seq: u64,
    pub duration: Duration,
    pub shown_at: Option<Instant>,
}

impl QueuedNotice {
    pub fn is_expired(&self) -> bool {
        self.shown_at
            .map(|shown| shown.elapsed() >= self.duration)
            .unwrap_or(false)
    }

    fn mark_shown(&mut self) {
        if self.shown_at.is_none() {
            self.shown_at = Some(Instant::now());
        }
    }
}

/// Queue of notices with priority handling
#[derive(Debug, Default)]
pub struct NoticeQueue {
    /// Pending notices (front = next to show)
    queue: VecDeque<QueuedNotice>,
    current: Option<QueuedNotice>,
    /// Recently pushed (title, message) pairs with their suppression deadline
    recent: Vec<(String, String, Instant)>,
    next_seq: u64,
}

impl NoticeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a notice. Higher priority replaces the current one (which is dropped);
    /// identical notices within two seconds are suppressed.
    pub fn push(&mut self, notice: Notice) {
        let now = Instant::now();
        self.recent.retain(|(_, _, expiry)| *expiry > now);

        if self
            .recent
            .iter()
            .any(|(title, message, _)| *title == notice.title && *message == notice.message)
        {
            return;
        }
        self.recent.push((
            notice.title.clone(),
            notice.message.clone(),
            now + Duration::from_secs(2),
        ));

        self.next_seq += 1;
        let entry = QueuedNotice {
            duration: notice.variant.default_duration(),
            notice,
            seq: self.next_seq,
            shown_at: None,
        };

        let outranks_current = self
            .current
            .as_ref()
            .map(|current| entry.notice.variant > current.notice.variant);

        match outranks_current {
            Some(false) => {
                let pos = self
                    .queue
                    .iter()
                    .position(|n| n.notice.variant < entry.notice.variant)
                    .unwrap_or(self.queue.len());
                self.queue.insert(pos, entry);
            }
            // nothing showing, or a higher priority drops the current one
            Some(true) | None => {
                let mut entry = entry;
                entry.mark_shown();
                self.current = Some(entry);
            }
        }
    }

    pub fn current(&self) -> Option<&QueuedNotice> {
        self.current.as_ref()
    }

    pub fn dismiss(&mut self) {
        self.current = None;
        self.advance();
    }

    /// Advance past an expired current notice
    pub fn tick(&mut self) {
        if self.current.as_ref().is_some_and(|c| c.is_expired()) {
            self.current = None;
            self.advance();
        }
    }

    fn advance(&mut self) {
        if self.current.is_none() {
            if let Some(mut next) = self.queue.pop_front() {
                next.mark_shown();
                self.current = Some(next);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none() && self.queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.queue.len() + usize::from(self.current.is_some())
    }

    pub fn clear(&mut self) {
        self.current = None;
        self.queue.clear();
    }
}

/// Thread-safe wrapper for the notice queue
#[derive(Debug, Clone, Default)]
pub struct SharedNoticeQueue {
    inner: Arc<Mutex<NoticeQueue>>,
}

impl SharedNoticeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expire the current notice if due and return what is showing now
    pub fn tick(&self) -> Option<QueuedNotice> {
        let mut queue = self.inner.lock();
        queue.tick();
        queue.current().cloned()
    }

    pub fn dismiss(&self) {
        self.inner.lock().dismiss();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }
}

impl NoticePresenter for SharedNoticeQueue {
    fn show(&self, notice: Notice) -> Result<(), NoticeError> {
        self.inner.lock().push(notice);
        Ok(())
    }
}
