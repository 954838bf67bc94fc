//! Transport collaborators: the paginated pull API and the live push channel.
//!
//! The engine only sees the two traits below; `http` and `socket` hold the
//! default network adapters.

pub mod http;
pub mod socket;
pub mod types;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::constants::events;
use crate::models::{Notification, NotificationPage};

pub use http::HttpNotificationApi;
pub use socket::SocketPushChannel;
pub use types::WireFrame;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Invalid endpoint URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),
}

/// Parameters of one pull request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub scope: Option<String>,
    pub unread_only: bool,
    pub limit: usize,
    pub skip: usize,
}

/// Request/response side of the notification collection.
#[async_trait]
pub trait NotificationApi: Send + Sync {
    async fn list(&self, query: ListQuery) -> Result<NotificationPage, TransportError>;

    async fn mark_one_read(&self, id: &str) -> Result<(), TransportError>;

    async fn mark_all_read(&self, scope: Option<&str>) -> Result<(), TransportError>;
}

/// Events delivered by a push channel, in receipt order.
#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    Connected,
    /// The link dropped and the channel is retrying
    Reconnecting,
    Reconnected,
    ItemArrived(Notification),
}

impl PushEvent {
    pub fn name(&self) -> &'static str {
        match self {
            PushEvent::Connected => events::CONNECTED,
            PushEvent::Reconnecting => "reconnecting",
            PushEvent::Reconnected => events::RECONNECTED,
            PushEvent::ItemArrived(_) => events::ITEM_ARRIVED,
        }
    }
}

/// Live channel. Scope-agnostic: scoping happens in the merge.
///
/// Subscribers should call `subscribe` before `connect` so the first
/// `Connected` event is not missed.
pub trait PushChannel: Send + Sync {
    fn connect(&self);

    fn disconnect(&self);

    fn subscribe(&self) -> broadcast::Receiver<PushEvent>;
}
