//! Operator notification: per-region summary messages delivered through
//! rate-limited webhooks.
//!
//! Every completed region batch produces exactly one message — including an
//! all-clear when nothing is broken, so operators get positive confirmation
//! that monitoring is alive.

pub mod dispatcher;
pub mod message;
pub mod webhook;

pub use dispatcher::{DispatchStats, Dispatcher, RegionNotification};
pub use message::RegionSummary;
pub use webhook::{WebhookError, WebhookNotifier};
