//! `keepsake-entitlement` — derives paid feature access from purchase history.
//!
//! The resolver is the refresh/poll primitive: it is called after every app
//! foreground and after payment return, performs only reads, and re-derives
//! everything from the backend on each call.

pub mod event;
pub mod resolver;

pub use event::{Event, EventKind, EventStore, ShareCode};
pub use resolver::{Entitlement, EntitlementError, EntitlementResolver};
