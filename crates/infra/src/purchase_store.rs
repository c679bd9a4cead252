//! In-memory purchase rows.

use std::sync::RwLock;

use async_trait::async_trait;

use keepsake_core::{DataAccessError, EventId, PurchaseId};
use keepsake_orders::{PaymentStatus, Purchase, PurchaseItem, PurchaseStore, ShippingDetails};

/// In-memory purchases plus line items. Intended for tests/dev.
///
/// `mark_paid` stands in for the server-side payment callback, which is the
/// only writer of payment status in production.
#[derive(Debug, Default)]
pub struct InMemoryPurchaseStore {
    purchases: RwLock<Vec<Purchase>>,
    items: RwLock<Vec<PurchaseItem>>,
}

fn read_poisoned() -> DataAccessError {
    DataAccessError::read("lock poisoned")
}

fn write_poisoned() -> DataAccessError {
    DataAccessError::write("lock poisoned")
}

impl InMemoryPurchaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate the gateway callback marking the order paid.
    pub fn mark_paid(&self, id: PurchaseId) {
        if let Ok(mut rows) = self.purchases.write() {
            if let Some(p) = rows.iter_mut().find(|p| p.id == id) {
                p.payment_status = PaymentStatus::Paid;
            }
        }
    }

    pub fn purchase_count(&self) -> usize {
        self.purchases.read().map(|rows| rows.len()).unwrap_or(0)
    }
}

#[async_trait]
impl PurchaseStore for InMemoryPurchaseStore {
    async fn create_with_items(
        &self,
        purchase: Purchase,
        items: Vec<PurchaseItem>,
    ) -> Result<(), DataAccessError> {
        // Both locks held across the insert so a reader never sees a
        // purchase without its items.
        let mut purchases = self.purchases.write().map_err(|_| write_poisoned())?;
        let mut existing_items = self.items.write().map_err(|_| write_poisoned())?;
        purchases.push(purchase);
        existing_items.extend(items);
        Ok(())
    }

    async fn get(&self, id: PurchaseId) -> Result<Option<Purchase>, DataAccessError> {
        let rows = self.purchases.read().map_err(|_| read_poisoned())?;
        Ok(rows.iter().find(|p| p.id == id).cloned())
    }

    async fn latest_for_event(
        &self,
        event_id: EventId,
    ) -> Result<Option<Purchase>, DataAccessError> {
        let rows = self.purchases.read().map_err(|_| read_poisoned())?;
        Ok(rows
            .iter()
            .filter(|p| p.event_id == event_id)
            .max_by_key(|p| p.created_at)
            .cloned())
    }

    async fn latest_paid_for_event(
        &self,
        event_id: EventId,
    ) -> Result<Option<Purchase>, DataAccessError> {
        let rows = self.purchases.read().map_err(|_| read_poisoned())?;
        Ok(rows
            .iter()
            .filter(|p| p.event_id == event_id && p.is_paid())
            .max_by_key(|p| p.created_at)
            .cloned())
    }

    async fn items_for(&self, id: PurchaseId) -> Result<Vec<PurchaseItem>, DataAccessError> {
        let rows = self.items.read().map_err(|_| read_poisoned())?;
        Ok(rows.iter().filter(|i| i.purchase_id == id).cloned().collect())
    }

    async fn update_shipping(
        &self,
        id: PurchaseId,
        shipping: ShippingDetails,
    ) -> Result<(), DataAccessError> {
        let mut rows = self.purchases.write().map_err(|_| write_poisoned())?;
        let purchase = rows
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| DataAccessError::write("no such purchase"))?;
        purchase.shipping = Some(shipping);
        Ok(())
    }

    async fn set_gateway_ref(
        &self,
        id: PurchaseId,
        reference: &str,
    ) -> Result<(), DataAccessError> {
        let mut rows = self.purchases.write().map_err(|_| write_poisoned())?;
        let purchase = rows
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| DataAccessError::write("no such purchase"))?;
        purchase.gateway_ref = Some(reference.to_string());
        Ok(())
    }

    async fn delete_with_items(&self, id: PurchaseId) -> Result<(), DataAccessError> {
        let mut purchases = self.purchases.write().map_err(|_| write_poisoned())?;
        let mut items = self.items.write().map_err(|_| write_poisoned())?;
        purchases.retain(|p| p.id != id);
        items.retain(|i| i.purchase_id != id);
        Ok(())
    }
}
