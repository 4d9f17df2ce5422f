//! Periodic change detection.
//!
//! A [`Monitor`] owns a [`Poller`] and runs it once per tick on its own
//! thread, publishing every delta it reports. Nothing runs until the first
//! subscriber attaches. A write becomes visible to subscribers within one
//! tick of landing on disk; callers that judge liveness add slack on top.

mod content;
mod core;
mod membership;

pub use self::core::{Monitor, Poller};
pub use content::{ContentMonitor, ContentPoller};
pub use membership::{MembershipChange, MembershipMonitor, MembershipPoller};
