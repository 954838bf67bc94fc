//! Reconciliation engine.
//!
//! Owns the canonical [`FeedStore`] and combines the two data sources:
//! pulled pages replace the list wholesale, pushed items are merged one at a
//! time. Every state change is a synchronous reducer run under a short write
//! guard that is never held across an `.await`; each async operation awaits
//! exactly one remote call.
//!
//! Mutations are optimistic. When the remote call fails the engine does not
//! undo the local edit, it pulls a fresh first page instead (rollback by
//! refetch), so concurrent edits can never be inverted out of order.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{SecondsFormat, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::accessor::FeedAccessor;
use crate::constants::{MARK_ALL_READ_FAILED_TITLE, MARK_READ_FAILED_TITLE, PAGE_SIZE};
use crate::lifecycle::{ConnectionState, Subscription};
use crate::models::{FeedError, FeedSnapshot, MutationOutcome, Notification, RefreshFilter};
use crate::notice::{Notice, NoticePresenter};
use crate::store::{FeedStore, MergeOutcome, OptimisticEdit};
use crate::transport::{ListQuery, NotificationApi, PushChannel, PushEvent, TransportError};

/// Authenticated user the feed belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

#[derive(Debug, Default)]
pub(crate) struct Session {
    pub(crate) identity: Option<Identity>,
    pub(crate) scope: Option<String>,
    /// Filter of the last refresh, reused by load-more and rollbacks
    pub(crate) filter: RefreshFilter,
}

pub(crate) struct EngineInner {
    pub(crate) api: Arc<dyn NotificationApi>,
    pub(crate) push: Arc<dyn PushChannel>,
    notices: Arc<dyn NoticePresenter>,
    pub(crate) store: RwLock<FeedStore>,
    pub(crate) session: RwLock<Session>,
    /// Bumped whenever the identity changes; pulls started under an older
    /// identity are discarded on completion
    pub(crate) identity_epoch: AtomicU64,
    pulls_in_flight: AtomicUsize,
    pub(crate) connection: Mutex<ConnectionState>,
    pub(crate) subscription: Mutex<Option<Subscription>>,
    revision: watch::Sender<u64>,
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        self.subscription.get_mut().take();
        if *self.connection.get_mut() != ConnectionState::Disconnected {
            self.push.disconnect();
        }
    }
}

/// Marks one pull as in flight for as long as it lives.
struct PullGuard {
    inner: Arc<EngineInner>,
}

impl PullGuard {
    fn begin(inner: &Arc<EngineInner>) -> Self {
        inner.pulls_in_flight.fetch_add(1, Ordering::SeqCst);
        inner.bump_revision();
        Self {
            inner: inner.clone(),
        }
    }

    /// Only succeeds when no other pull is running
    fn begin_exclusive(inner: &Arc<EngineInner>) -> Option<Self> {
        inner
            .pulls_in_flight
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        inner.bump_revision();
        Some(Self {
            inner: inner.clone(),
        })
    }
}

impl Drop for PullGuard {
    fn drop(&mut self) {
        self.inner.pulls_in_flight.fetch_sub(1, Ordering::SeqCst);
        self.inner.bump_revision();
    }
}

impl EngineInner {
    fn bump_revision(&self) {
        self.revision.send_modify(|revision| *revision += 1);
    }
}

/// Handle to the reconciliation engine. Cheap to clone; all clones share state.
#[derive(Clone)]
pub struct FeedEngine {
    pub(crate) inner: Arc<EngineInner>,
}

impl FeedEngine {
    pub fn new(
        api: Arc<dyn NotificationApi>,
        push: Arc<dyn PushChannel>,
        notices: Arc<dyn NoticePresenter>,
    ) -> Self {
        let (revision, _) = watch::channel(0);
        Self {
            inner: Arc::new(EngineInner {
                api,
                push,
                notices,
                store: RwLock::new(FeedStore::new()),
                session: RwLock::new(Session::default()),
                identity_epoch: AtomicU64::new(0),
                pulls_in_flight: AtomicUsize::new(0),
                connection: Mutex::new(ConnectionState::Disconnected),
                subscription: Mutex::new(None),
                revision,
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<EngineInner>) -> Self {
        Self { inner }
    }

    /// Read-only façade for presentation code
    pub fn accessor(&self) -> FeedAccessor {
        FeedAccessor::new(self.clone())
    }

    // ===== Getters =====

    pub fn snapshot(&self) -> FeedSnapshot {
        self.inner.store.read().snapshot(self.is_loading())
    }

    pub fn is_loading(&self) -> bool {
        self.inner.pulls_in_flight.load(Ordering::SeqCst) > 0
    }

    /// Revision counter bumped after every state change
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.inner.revision.subscribe()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.inner.session.read().identity.clone()
    }

    pub fn active_scope(&self) -> Option<String> {
        self.inner.session.read().scope.clone()
    }

    pub fn current_filter(&self) -> RefreshFilter {
        self.inner.session.read().filter
    }

    pub fn connection_state(&self) -> ConnectionState {
        *self.inner.connection.lock()
    }

    // ===== Operations =====

    /// Pull the first page for the active scope and replace the list with it.
    pub async fn refresh(&self, filter: RefreshFilter) {
        let Some(scope) = self.pull_scope() else {
            debug!("refresh skipped: no identity or no active scope");
            return;
        };
        self.inner.session.write().filter = filter;

        let epoch = self.inner.identity_epoch.load(Ordering::SeqCst);
        let query = ListQuery {
            scope: Some(scope),
            unread_only: filter.unread_only,
            limit: PAGE_SIZE,
            skip: 0,
        };

        let _pull = PullGuard::begin(&self.inner);
        let result = self.inner.api.list(query).await;

        if !self.same_identity(epoch) {
            debug!("discarding refresh result from a previous identity");
            return;
        }
        match result {
            Ok(page) => {
                debug!(items = page.items.len(), total = ?page.total, "refresh applied");
                self.update(|store| store.apply_authoritative(page));
            }
            Err(e) => {
                warn!("refresh failed: {}", e);
                self.record_error(&e);
            }
        }
    }

    /// Pull the page after the currently loaded items and append it.
    /// No-op while any other pull is in flight.
    pub async fn load_more(&self) {
        let Some(scope) = self.pull_scope() else {
            debug!("load_more skipped: no identity or no active scope");
            return;
        };
        let Some(_pull) = PullGuard::begin_exclusive(&self.inner) else {
            debug!("load_more skipped: a pull is already in flight");
            return;
        };

        let epoch = self.inner.identity_epoch.load(Ordering::SeqCst);
        let skip = self.inner.store.read().items().len();
        let query = ListQuery {
            scope: Some(scope),
            unread_only: self.current_filter().unread_only,
            limit: PAGE_SIZE,
            skip,
        };

        let result = self.inner.api.list(query).await;
        if !self.same_identity(epoch) {
            return;
        }
        match result {
            Ok(page) => self.update(|store| store.append_page(page)),
            Err(e) => {
                warn!("load_more failed: {}", e);
                self.record_error(&e);
            }
        }
    }

    /// Mark one notification read, optimistically.
    ///
    /// On failure the error is recorded, a warning notice is raised and the
    /// first page is pulled again; the returned outcome keeps the failure
    /// even after that refetch clears the stored error.
    pub async fn mark_read(&self, id: &str) -> MutationOutcome {
        if id.trim().is_empty() {
            debug!("mark_read skipped: empty id");
            return MutationOutcome::Skipped;
        }

        let now = now_timestamp();
        let changed = self.update(|store| store.apply_optimistic(OptimisticEdit::MarkRead(id), &now));
        debug!(id, changed, "optimistic mark_read");

        match self.inner.api.mark_one_read(id).await {
            Ok(()) => MutationOutcome::Applied,
            Err(e) => {
                warn!(id, "mark_read failed, refetching: {}", e);
                self.rollback(MARK_READ_FAILED_TITLE, &e).await
            }
        }
    }

    /// Mark everything in the active scope read, optimistically.
    pub async fn mark_all_read(&self) -> MutationOutcome {
        let Some(scope) = self.active_scope() else {
            debug!("mark_all_read skipped: no active scope");
            return MutationOutcome::Skipped;
        };

        let now = now_timestamp();
        let changed = self.update(|store| store.apply_optimistic(OptimisticEdit::MarkAllRead, &now));
        debug!(%scope, changed, "optimistic mark_all_read");

        match self.inner.api.mark_all_read(Some(&scope)).await {
            Ok(()) => MutationOutcome::Applied,
            Err(e) => {
                warn!(%scope, "mark_all_read failed, refetching: {}", e);
                self.rollback(MARK_ALL_READ_FAILED_TITLE, &e).await
            }
        }
    }

    /// Merge one pushed notification and raise a notice for it.
    pub fn on_push_arrival(&self, payload: Notification) {
        let scope = self.active_scope();
        let for_notice = payload.clone();
        let outcome = self.update(|store| store.merge_push(payload, scope.as_deref()));
        debug!(id = ?for_notice.id, ?outcome, "push arrival");

        let notice = Notice::for_arrival(&for_notice, outcome == MergeOutcome::CrossScope);
        self.raise_notice(notice);
    }

    pub(crate) async fn handle_push_event(&self, event: PushEvent) {
        match event {
            PushEvent::Connected => self.set_connection(ConnectionState::Connected),
            PushEvent::Reconnecting => self.set_connection(ConnectionState::Reconnecting),
            PushEvent::Reconnected => {
                self.set_connection(ConnectionState::Connected);
                // refresh records its own failure; nothing propagates from here
                let filter = self.current_filter();
                self.refresh(filter).await;
            }
            PushEvent::ItemArrived(payload) => self.on_push_arrival(payload),
        }
    }

    // ===== Internals =====

    async fn rollback(&self, title: &str, error: &TransportError) -> MutationOutcome {
        let error = FeedError::from_display(error);
        self.update(|store| store.record_error(error.clone()));
        self.raise_notice(Notice::for_failure(title, &error));

        let filter = self.current_filter();
        self.refresh(filter).await;
        MutationOutcome::RolledBack(error)
    }

    /// Scope to pull for, if a pull is allowed at all
    fn pull_scope(&self) -> Option<String> {
        let session = self.inner.session.read();
        session.identity.as_ref()?;
        session.scope.clone()
    }

    fn same_identity(&self, epoch: u64) -> bool {
        self.inner.identity_epoch.load(Ordering::SeqCst) == epoch
    }

    pub(crate) fn update<R>(&self, reducer: impl FnOnce(&mut FeedStore) -> R) -> R {
        let result = {
            let mut store = self.inner.store.write();
            reducer(&mut store)
        };
        self.inner.bump_revision();
        result
    }

    fn record_error(&self, error: &TransportError) {
        let error = FeedError::from_display(error);
        self.update(|store| store.record_error(error));
    }

    pub(crate) fn set_connection(&self, state: ConnectionState) {
        let previous = std::mem::replace(&mut *self.inner.connection.lock(), state);
        if previous != state {
            debug!(?previous, ?state, "connection state changed");
            self.inner.bump_revision();
        }
    }

    fn raise_notice(&self, notice: Notice) {
        let notices = &self.inner.notices;
        match catch_unwind(AssertUnwindSafe(|| notices.show(notice))) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => debug!("notice dropped: {}", e),
            Err(_) => debug!("notice presenter panicked; ignored"),
        }
    }
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}
