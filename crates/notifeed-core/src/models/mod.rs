pub mod feed;
pub mod notification;

pub use feed::{FeedError, FeedSnapshot, MutationOutcome, NotificationPage, RefreshFilter};
pub use notification::{parse_timestamp, Notification, NotificationKind};
