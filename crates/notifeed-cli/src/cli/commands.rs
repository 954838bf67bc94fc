use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use notifeed_core::notice::QueuedNotice;
use notifeed_core::{
    CoreConfig, FeedAccessor, FeedEngine, Identity, MutationOutcome, RefreshFilter,
    SharedNoticeQueue,
};
use serde_json::{json, Value};
use tracing::info;

use super::output::print_json;

/// How often `watch` polls the notice queue
const NOTICE_POLL_INTERVAL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedCommand {
    List { unread: bool, pages: usize },
    Read { id: String },
    ReadAll,
    Watch,
}

/// A signed-in engine plus the notice queue it reports arrivals to
struct Session {
    engine: FeedEngine,
    feed: FeedAccessor,
    notices: SharedNoticeQueue,
}

impl Session {
    async fn open(config: &CoreConfig) -> Result<Self> {
        let identity = config
            .identity()
            .ok_or_else(|| anyhow!("No user configured; set userId in the config file or pass --user"))?;
        let scope = config
            .organization_id
            .clone()
            .filter(|org| !org.is_empty())
            .ok_or_else(|| {
                anyhow!("No organization configured; set organizationId in the config file or pass --org")
            })?;

        let notices = SharedNoticeQueue::new();
        let engine = config.build_engine(Arc::new(notices.clone()));
        Ok(Self::start(engine, notices, identity, scope).await)
    }

    async fn start(
        engine: FeedEngine,
        notices: SharedNoticeQueue,
        identity: Identity,
        scope: String,
    ) -> Self {
        engine.set_scope(Some(scope)).await;
        engine.set_identity(Some(identity)).await;
        let feed = engine.accessor();
        Self { engine, feed, notices }
    }

    fn close(self) {
        self.engine.sign_out();
    }
}

pub async fn run_command(command: FeedCommand, config: CoreConfig, pretty: bool) -> Result<()> {
    let session = Session::open(&config).await?;
    let result = execute(&session, command, pretty).await;
    session.close();

    if let Some(output) = result? {
        print_json(&output, pretty)?;
    }
    Ok(())
}

/// Run one command; one-shot commands return their output, `watch` prints as
/// it goes.
async fn execute(session: &Session, command: FeedCommand, pretty: bool) -> Result<Option<Value>> {
    match command {
        FeedCommand::List { unread, pages } => list(session, unread, pages).await.map(Some),
        FeedCommand::Read { id } => read(session, &id).await.map(Some),
        FeedCommand::ReadAll => read_all(session).await.map(Some),
        FeedCommand::Watch => watch(session, pretty).await.map(|()| None),
    }
}

fn ensure_no_error(feed: &FeedAccessor, action: &str) -> Result<()> {
    match feed.error() {
        Some(error) => bail!("Failed to {}: {}", action, error),
        None => Ok(()),
    }
}

/// The stored error is cleared by the rollback refetch, so mutations are
/// judged by their outcome instead.
fn ensure_applied(outcome: MutationOutcome, action: &str) -> Result<()> {
    match outcome {
        MutationOutcome::Applied => Ok(()),
        MutationOutcome::Skipped => bail!("Nothing to {}", action),
        MutationOutcome::RolledBack(error) => bail!("Failed to {}: {}", action, error),
    }
}

async fn list(session: &Session, unread: bool, pages: usize) -> Result<Value> {
    let feed = &session.feed;
    if unread {
        feed.refresh(Some(RefreshFilter::unread_only())).await;
    }
    for _ in 1..pages.max(1) {
        if !feed.has_more() {
            break;
        }
        feed.load_more().await;
    }
    ensure_no_error(feed, "load notifications")?;
    serde_json::to_value(feed.snapshot()).context("Failed to serialize feed")
}

async fn read(session: &Session, id: &str) -> Result<Value> {
    let feed = &session.feed;
    ensure_no_error(feed, "load notifications")?;
    ensure_applied(feed.mark_read(id).await, "mark notification read")?;
    Ok(json!({ "id": id, "unreadCount": feed.unread_count() }))
}

async fn read_all(session: &Session) -> Result<Value> {
    let feed = &session.feed;
    ensure_no_error(feed, "load notifications")?;
    ensure_applied(feed.mark_all_read().await, "mark all notifications read")?;
    Ok(json!({ "unreadCount": feed.unread_count() }))
}

/// Print a summary line per feed revision and each new notice until Ctrl-C.
async fn watch(session: &Session, pretty: bool) -> Result<()> {
    let mut changes = session.feed.changes();
    let mut ticker = tokio::time::interval(NOTICE_POLL_INTERVAL);
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    let mut last_notice: Option<u64> = None;

    print_revision(session, *changes.borrow_and_update(), pretty)?;
    info!("watching notifications; press Ctrl-C to stop");

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let revision = *changes.borrow_and_update();
                print_revision(session, revision, pretty)?;
            }
            _ = ticker.tick() => {
                if let Some(queued) = session.notices.tick() {
                    if last_notice != Some(queued.seq) {
                        last_notice = Some(queued.seq);
                        print_notice(&queued, pretty)?;
                    }
                }
            }
        }
    }
    Ok(())
}

fn print_revision(session: &Session, revision: u64, pretty: bool) -> Result<()> {
    let snapshot = session.feed.snapshot();
    print_json(
        &json!({
            "revision": revision,
            "connection": format!("{:?}", session.engine.connection_state()),
            "items": snapshot.items.len(),
            "total": snapshot.total,
            "unreadCount": snapshot.unread_count,
            "crossScopeUnread": snapshot.cross_scope_unread,
            "loading": snapshot.loading,
            "error": snapshot.error,
        }),
        pretty,
    )
}

fn print_notice(queued: &QueuedNotice, pretty: bool) -> Result<()> {
    let notice = &queued.notice;
    print_json(
        &json!({
            "notice": {
                "icon": notice.variant.icon(),
                "title": notice.title,
                "message": notice.message,
            }
        }),
        pretty,
    )
}
