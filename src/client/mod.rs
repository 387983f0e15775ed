//! Client-side logic for the single-page app: what a signed-in user may
//! navigate to, and how status changes reach them.

pub mod api;
pub mod nav;
pub mod sse;
pub mod watcher;

pub use api::{ApiClient, ClientError, DashboardPoller, ReviewEvents, Session, POLL_INTERVAL};
pub use nav::{nav_items, NavItem};
pub use sse::{SseDecoder, SseFrame};
pub use watcher::{Notification, StatusWatcher};
