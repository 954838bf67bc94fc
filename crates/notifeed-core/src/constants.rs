//! Feed-wide constants
//!
//! Centralized location for the page window, wire paths and default strings
//! shared by the engine, the transports and the notice presenter.

/// Size of one pulled page and the cap applied to `items` on push arrival.
pub const PAGE_SIZE: usize = 20;

/// Text shown in place of an absent notification message. Never stored.
pub const DEFAULT_NOTICE_MESSAGE: &str = "You have a new notification";

/// Title for notices about items in the active scope (or invitations).
pub const DEFAULT_NOTICE_TITLE: &str = "New notification";

/// Warning titles raised when the server rejects an optimistic edit.
pub const MARK_READ_FAILED_TITLE: &str = "Could not mark notification read";
pub const MARK_ALL_READ_FAILED_TITLE: &str = "Could not mark notifications read";

/// Metadata key naming the organization that owns a notification.
pub const METADATA_ORGANIZATION_NAME: &str = "organizationName";

/// Default REST endpoint of the document service.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";

/// Default push channel address (host:port).
pub const DEFAULT_PUSH_ADDRESS: &str = "127.0.0.1:3001";

/// Delay between push reconnect attempts.
pub const DEFAULT_RECONNECT_DELAY_MS: u64 = 2_000;

// Push channel event names
pub mod events {
    pub const CONNECTED: &str = "connected";
    pub const RECONNECTED: &str = "reconnected";
    pub const ITEM_ARRIVED: &str = "item-arrived";
    /// Alias used by older servers for `item-arrived`
    pub const NOTIFICATION: &str = "notification";
}
