//! Session and push-channel lifecycle.
//!
//! `Disconnected → Connecting → Connected`, with `Reconnecting` re-entering
//! `Connected`. The channel follows the identity only: a scope change while
//! signed in refreshes the feed but leaves the channel alone.

use std::sync::atomic::Ordering;
use std::sync::{Arc, Weak};

use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::engine::{EngineInner, FeedEngine, Identity};
use crate::models::RefreshFilter;
use crate::transport::PushEvent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

/// Listener attached to one push channel instance. Dropping it detaches the
/// listener.
pub(crate) struct Subscription {
    task: JoinHandle<()>,
}

impl Subscription {
    fn spawn(engine: Weak<EngineInner>, events: broadcast::Receiver<PushEvent>) -> Option<Self> {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(e) => {
                warn!("cannot listen to push events outside a tokio runtime: {}", e);
                return None;
            }
        };
        Some(Self {
            task: runtime.spawn(pump(engine, events)),
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Apply push events to the engine in receipt order.
async fn pump(engine: Weak<EngineInner>, mut events: broadcast::Receiver<PushEvent>) {
    loop {
        let event = match events.recv().await {
            Ok(event) => event,
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "push listener lagged; events dropped");
                continue;
            }
            Err(RecvError::Closed) => break,
        };

        let Some(inner) = engine.upgrade() else {
            break;
        };
        debug!(event = event.name(), "push event");
        FeedEngine::from_inner(inner).handle_push_event(event).await;
    }
}

impl FeedEngine {
    /// Feed the current authenticated identity into the engine.
    ///
    /// Gaining an identity opens the channel and refreshes; losing it tears
    /// everything down; switching identities does both. Repeating the current
    /// identity only makes sure the listener is attached.
    pub async fn set_identity(&self, identity: Option<Identity>) {
        let previous = self.identity();
        match (previous, identity) {
            (None, None) => {}
            (Some(_), None) => self.sign_out(),
            (Some(old), Some(new)) if old == new => self.ensure_subscribed(),
            (previous, Some(new)) => {
                if previous.is_some() {
                    self.sign_out();
                }
                self.sign_in(new);
                let filter = self.current_filter();
                self.refresh(filter).await;
            }
        }
    }

    /// Feed the active organization into the engine. Refreshes when it
    /// changes while signed in; never touches the channel.
    pub async fn set_scope(&self, scope: Option<String>) {
        let changed = {
            let mut session = self.inner.session.write();
            if session.scope == scope {
                false
            } else {
                info!(from = ?session.scope, to = ?scope, "active scope changed");
                session.scope = scope;
                true
            }
        };

        if changed && self.identity().is_some() {
            let filter = self.current_filter();
            self.refresh(filter).await;
        }
    }

    fn sign_in(&self, identity: Identity) {
        info!(user_id = %identity.user_id, "signed in; opening push channel");
        {
            let mut session = self.inner.session.write();
            session.identity = Some(identity);
            session.filter = RefreshFilter::default();
        }
        self.inner.identity_epoch.fetch_add(1, Ordering::SeqCst);

        // listener first so the channel's Connected event is not missed
        self.ensure_subscribed();
        if self.connection_state() == ConnectionState::Disconnected {
            self.set_connection(ConnectionState::Connecting);
            self.inner.push.connect();
        }
    }

    /// Drop the session synchronously: detach, disconnect, empty the feed.
    pub fn sign_out(&self) {
        info!("signed out; tearing down feed");
        {
            let mut session = self.inner.session.write();
            session.identity = None;
            session.filter = RefreshFilter::default();
        }
        self.inner.identity_epoch.fetch_add(1, Ordering::SeqCst);

        self.inner.subscription.lock().take();
        self.inner.push.disconnect();
        self.set_connection(ConnectionState::Disconnected);
        self.update(|store| store.reset());
    }

    /// Attach the push listener unless one is already attached.
    fn ensure_subscribed(&self) {
        let mut subscription = self.inner.subscription.lock();
        if subscription.is_some() {
            return;
        }
        let events = self.inner.push.subscribe();
        *subscription = Subscription::spawn(Arc::downgrade(&self.inner), events);
    }

    pub fn is_subscribed(&self) -> bool {
        self.inner.subscription.lock().is_some()
    }
}
