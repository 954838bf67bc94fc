use tokio::sync::watch;

use crate::engine::FeedEngine;
use crate::models::{FeedError, FeedSnapshot, MutationOutcome, Notification, RefreshFilter};

/// Read-only view of the feed for presentation code.
///
/// Holds no state of its own: every getter reads the engine, every mutation
/// is forwarded to it.
#[derive(Clone)]
pub struct FeedAccessor {
    engine: FeedEngine,
}

impl FeedAccessor {
    pub(crate) fn new(engine: FeedEngine) -> Self {
        Self { engine }
    }

    pub fn snapshot(&self) -> FeedSnapshot {
        self.engine.snapshot()
    }

    pub fn items(&self) -> Vec<Notification> {
        self.engine.inner.store.read().items().to_vec()
    }

    pub fn total(&self) -> u64 {
        self.engine.inner.store.read().total()
    }

    pub fn unread_count(&self) -> u64 {
        self.engine.inner.store.read().unread_count()
    }

    pub fn loading(&self) -> bool {
        self.engine.is_loading()
    }

    pub fn error(&self) -> Option<FeedError> {
        self.engine.inner.store.read().error().cloned()
    }

    pub fn has_more(&self) -> bool {
        self.engine.inner.store.read().has_more()
    }

    /// Revision counter that changes whenever the feed does
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.engine.changes()
    }

    pub async fn refresh(&self, filter: Option<RefreshFilter>) {
        let filter = filter.unwrap_or_default();
        self.engine.refresh(filter).await;
    }

    pub async fn load_more(&self) {
        self.engine.load_more().await;
    }

    pub async fn mark_read(&self, id: &str) -> MutationOutcome {
        self.engine.mark_read(id).await
    }

    pub async fn mark_all_read(&self) -> MutationOutcome {
        self.engine.mark_all_read().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::tests::{make_engine, make_notification, sign_in_quietly, FakeApi, FakePush};

    #[tokio::test]
    async fn test_accessor_reflects_engine_state() {
        let api = FakeApi::with_items(vec![
            make_notification(Some("a"), "org", Some("2026-02-14"), None),
            make_notification(Some("b"), "org", Some("2026-02-13"), None),
        ]);
        let engine = make_engine(api.clone(), FakePush::new());
        sign_in_quietly(&engine, "org");
        let feed = engine.accessor();

        feed.refresh(None).await;
        assert_eq!(feed.items().len(), 2);
        assert_eq!(feed.total(), 2);
        assert_eq!(feed.unread_count(), 2);
        assert!(!feed.has_more());
        assert!(!feed.loading());
        assert!(feed.error().is_none());

        feed.mark_read("a").await;
        assert_eq!(feed.unread_count(), 1);
        assert_eq!(*api.mark_read_calls.lock(), vec!["a"]);

        feed.mark_all_read().await;
        assert_eq!(feed.unread_count(), 0);
        assert_eq!(feed.snapshot(), engine.snapshot());
    }

    #[tokio::test]
    async fn test_accessor_forwards_filter_and_paging() {
        let api = FakeApi::with_items(vec![make_notification(Some("a"), "org", None, None)]);
        let engine = make_engine(api.clone(), FakePush::new());
        sign_in_quietly(&engine, "org");
        let feed = engine.accessor();

        feed.refresh(Some(RefreshFilter::unread_only())).await;
        feed.load_more().await;

        let calls = api.list_calls.lock();
        assert_eq!(calls.len(), 2);
        assert!(calls[0].unread_only);
        assert_eq!(calls[1].skip, 1);
    }

    #[tokio::test]
    async fn test_accessor_surfaces_errors_without_failing() {
        let api = FakeApi::with_items(vec![]);
        api.fail_list.store(true, std::sync::atomic::Ordering::SeqCst);
        let engine = make_engine(api, FakePush::new());
        sign_in_quietly(&engine, "org");
        let feed = engine.accessor();

        feed.refresh(None).await;
        assert!(feed.error().is_some());
        assert!(feed.items().is_empty());
    }

    #[tokio::test]
    async fn test_accessor_forwards_mutation_outcome() {
        let api = FakeApi::with_items(vec![make_notification(Some("a"), "org", None, None)]);
        let engine = make_engine(api.clone(), FakePush::new());
        sign_in_quietly(&engine, "org");
        let feed = engine.accessor();
        feed.refresh(None).await;

        api.fail_mutations.store(true, std::sync::atomic::Ordering::SeqCst);
        assert!(feed.mark_read("a").await.failure().is_some());
        assert!(feed.mark_all_read().await.failure().is_some());
        assert!(feed.error().is_none());
    }
}
