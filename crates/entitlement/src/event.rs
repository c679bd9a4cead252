//! The couple's event record and its read contract.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use keepsake_core::{DataAccessError, EventId, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Wedding,
    Engagement,
}

/// Guest-access share code printed on the QR card. Zero-or-one per event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShareCode {
    pub code: String,
    pub is_active: bool,
    pub scan_count: u64,
}

/// A couple's wedding/engagement record. Owns purchases and media.
///
/// Created at onboarding and mutated by edit screens (out of scope here);
/// the resolver only rewrites `storage_limit_bytes` on the copy it returns,
/// never on the stored row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub owner_id: UserId,
    pub kind: EventKind,
    pub partner_one: String,
    pub partner_two: String,
    pub event_date: Option<NaiveDate>,
    pub venue: Option<String>,
    pub city: Option<String>,
    pub description: Option<String>,
    pub storage_used_bytes: u64,
    pub storage_limit_bytes: u64,
    pub is_active: bool,
    pub share_code: Option<ShareCode>,
    pub created_at: DateTime<Utc>,
}

/// Backend access to event records.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Most recently created event owned by the user, if any.
    async fn latest_for_owner(&self, owner: UserId) -> Result<Option<Event>, DataAccessError>;
}

#[async_trait]
impl<S> EventStore for Arc<S>
where
    S: EventStore + ?Sized,
{
    async fn latest_for_owner(&self, owner: UserId) -> Result<Option<Event>, DataAccessError> {
        (**self).latest_for_owner(owner).await
    }
}
