use serde::{Deserialize, Serialize};

use super::Notification;

/// Options for a full pull-refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshFilter {
    #[serde(default)]
    pub unread_only: bool,
}

impl RefreshFilter {
    pub fn unread_only() -> Self {
        Self { unread_only: true }
    }
}

/// One page as returned by the pull API. `total` may be omitted by the server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationPage {
    pub items: Vec<Notification>,
    pub total: Option<u64>,
}

/// Normalized failure stored in feed state. Always carries a message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize)]
#[error("{message}")]
pub struct FeedError {
    pub message: String,
}

impl FeedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Normalize any displayable failure into a `FeedError`
    pub fn from_display(err: &impl std::fmt::Display) -> Self {
        let message = err.to_string();
        if message.is_empty() {
            Self::new("Unknown error")
        } else {
            Self::new(message)
        }
    }
}

/// Result of an optimistic mutation as seen by the caller.
///
/// The feed state is the same either way once the call returns; this only
/// tells whether the server accepted the edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    /// A guard rejected the call; nothing was sent
    Skipped,
    Applied,
    /// The server rejected the edit and the feed was refetched
    RolledBack(FeedError),
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, MutationOutcome::Applied)
    }

    pub fn failure(&self) -> Option<&FeedError> {
        match self {
            MutationOutcome::RolledBack(error) => Some(error),
            _ => None,
        }
    }
}

/// Point-in-time copy of the feed handed to presentation code.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSnapshot {
    pub items: Vec<Notification>,
    pub total: u64,
    pub unread_count: u64,
    pub cross_scope_unread: u64,
    pub has_more: bool,
    pub loading: bool,
    pub error: Option<FeedError>,
}
