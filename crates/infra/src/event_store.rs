//! In-memory event records.

use std::sync::RwLock;

use async_trait::async_trait;

use keepsake_core::{DataAccessError, UserId};
use keepsake_entitlement::{Event, EventStore};

/// In-memory event rows. Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    rows: RwLock<Vec<Event>>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, event: Event) {
        if let Ok(mut rows) = self.rows.write() {
            rows.push(event);
        }
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn latest_for_owner(&self, owner: UserId) -> Result<Option<Event>, DataAccessError> {
        let rows = self
            .rows
            .read()
            .map_err(|_| DataAccessError::read("lock poisoned"))?;
        Ok(rows
            .iter()
            .filter(|e| e.owner_id == owner)
            .max_by_key(|e| e.created_at)
            .cloned())
    }
}
