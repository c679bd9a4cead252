//! Purchase persistence contract.

use std::sync::Arc;

use async_trait::async_trait;

use keepsake_core::{DataAccessError, EventId, PurchaseId};

use crate::purchase::{Purchase, PurchaseItem, ShippingDetails};

/// Backend access to purchases and their line items.
///
/// All reads are scoped by event or purchase id; server-side authorization
/// (a user only reads/writes rows tied to their own event) is the backend's
/// responsibility, not modeled here.
#[async_trait]
pub trait PurchaseStore: Send + Sync {
    /// Persist one purchase and its items as a single logical unit: either
    /// everything is stored or nothing is. Callers retry by re-attempting
    /// the whole creation, never by patching items onto a previous attempt.
    async fn create_with_items(
        &self,
        purchase: Purchase,
        items: Vec<PurchaseItem>,
    ) -> Result<(), DataAccessError>;

    async fn get(&self, id: PurchaseId) -> Result<Option<Purchase>, DataAccessError>;

    /// Most recently created purchase for the event, paid or not.
    async fn latest_for_event(&self, event_id: EventId)
        -> Result<Option<Purchase>, DataAccessError>;

    /// Most recently created purchase for the event matching the "paid"
    /// predicate, if any. This is the fallback scan behind the two-tier
    /// entitlement lookup.
    async fn latest_paid_for_event(
        &self,
        event_id: EventId,
    ) -> Result<Option<Purchase>, DataAccessError>;

    async fn items_for(&self, id: PurchaseId) -> Result<Vec<PurchaseItem>, DataAccessError>;

    async fn update_shipping(
        &self,
        id: PurchaseId,
        shipping: ShippingDetails,
    ) -> Result<(), DataAccessError>;

    /// Attach the gateway correlation id to the purchase.
    async fn set_gateway_ref(
        &self,
        id: PurchaseId,
        reference: &str,
    ) -> Result<(), DataAccessError>;

    /// Delete the purchase and (cascading) its items.
    async fn delete_with_items(&self, id: PurchaseId) -> Result<(), DataAccessError>;
}

#[async_trait]
impl<S> PurchaseStore for Arc<S>
where
    S: PurchaseStore + ?Sized,
{
    async fn create_with_items(
        &self,
        purchase: Purchase,
        items: Vec<PurchaseItem>,
    ) -> Result<(), DataAccessError> {
        (**self).create_with_items(purchase, items).await
    }

    async fn get(&self, id: PurchaseId) -> Result<Option<Purchase>, DataAccessError> {
        (**self).get(id).await
    }

    async fn latest_for_event(
        &self,
        event_id: EventId,
    ) -> Result<Option<Purchase>, DataAccessError> {
        (**self).latest_for_event(event_id).await
    }

    async fn latest_paid_for_event(
        &self,
        event_id: EventId,
    ) -> Result<Option<Purchase>, DataAccessError> {
        (**self).latest_paid_for_event(event_id).await
    }

    async fn items_for(&self, id: PurchaseId) -> Result<Vec<PurchaseItem>, DataAccessError> {
        (**self).items_for(id).await
    }

    async fn update_shipping(
        &self,
        id: PurchaseId,
        shipping: ShippingDetails,
    ) -> Result<(), DataAccessError> {
        (**self).update_shipping(id, shipping).await
    }

    async fn set_gateway_ref(
        &self,
        id: PurchaseId,
        reference: &str,
    ) -> Result<(), DataAccessError> {
        (**self).set_gateway_ref(id, reference).await
    }

    async fn delete_with_items(&self, id: PurchaseId) -> Result<(), DataAccessError> {
        (**self).delete_with_items(id).await
    }
}
