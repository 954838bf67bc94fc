//! Notification feed synchronization for the document client.
//!
//! A [`FeedEngine`] keeps one list of notifications consistent across the
//! paginated pull API and the live push channel; [`FeedAccessor`] is the
//! read-only surface handed to presentation code.

pub mod accessor;
pub mod config;
pub mod constants;
pub mod engine;
pub mod lifecycle;
pub mod models;
pub mod notice;
pub mod store;
pub mod transport;

pub use accessor::FeedAccessor;
pub use config::{ConfigError, CoreConfig};
pub use engine::{FeedEngine, Identity};
pub use lifecycle::ConnectionState;
pub use models::{
    FeedError, FeedSnapshot, MutationOutcome, Notification, NotificationKind, RefreshFilter,
};
pub use notice::{Notice, NoticePresenter, NoticeVariant, SharedNoticeQueue};
