//! Infrastructure layer: in-memory backends and the session composition root.
//!
//! The in-memory implementations are for tests/dev; a hosted backend slots in
//! behind the same traits.

pub mod catalog;
pub mod event_store;
pub mod gateway;
pub mod media_store;
pub mod purchase_store;
pub mod session;


pub use catalog::InMemoryCatalog;
pub use event_store::InMemoryEventStore;
pub use gateway::LocalGateway;
pub use media_store::{InMemoryMediaFeed, InMemoryMediaStore, InMemoryObjectStorage};
pub use purchase_store::InMemoryPurchaseStore;
pub use session::EventSession;
