use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::PushEvent;
use crate::constants::events;
use crate::models::{Notification, NotificationPage};

/// One newline-delimited JSON frame read from the push socket
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WireFrame {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

impl WireFrame {
    /// Decode the payload of an arrival frame.
    ///
    /// Link-state frames (`connected`, `reconnected`) are ignored here: the
    /// socket adapter derives those from the connection itself.
    pub fn into_push_event(self) -> Result<Option<PushEvent>, serde_json::Error> {
        match self.event.as_str() {
            events::ITEM_ARRIVED | events::NOTIFICATION => {
                let notification: Notification = serde_json::from_value(self.data)?;
                Ok(Some(PushEvent::ItemArrived(notification)))
            }
            _ => Ok(None),
        }
    }
}

/// Body of `GET /notifications`. Older deployments answer with a bare array.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListResponse {
    Paged {
        #[serde(alias = "data")]
        items: Vec<Notification>,
        #[serde(default)]
        total: Option<u64>,
    },
    Bare(Vec<Notification>),
}

impl From<ListResponse> for NotificationPage {
    fn from(response: ListResponse) -> Self {
        match response {
            ListResponse::Paged { items, total } => NotificationPage { items, total },
            ListResponse::Bare(items) => NotificationPage { items, total: None },
        }
    }
}
