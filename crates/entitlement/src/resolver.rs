//! Two-tier entitlement resolution.

use thiserror::Error;
use tracing::{debug, warn};

use keepsake_catalog::{CatalogReader, StorageLimit};
use keepsake_core::{DataAccessError, UserId};
use keepsake_orders::{Purchase, PurchaseItem, PurchaseStore};

use crate::event::{Event, EventStore};

/// Derived access state for the user's current event.
#[derive(Debug, Clone, PartialEq)]
pub struct Entitlement {
    /// The event, with `storage_limit_bytes` rewritten to the effective
    /// limit on this copy (the stored row is untouched).
    pub event: Event,
    /// Most recent purchase, paid or not. The pending-payment UI needs to
    /// show what is owed.
    pub purchase: Option<Purchase>,
    pub purchase_items: Vec<PurchaseItem>,
    pub has_active_package: bool,
    pub effective_storage_limit: StorageLimit,
    /// Set when a purchase/catalog read failed and the result degraded to a
    /// safe default instead of crashing the screen.
    pub purchase_read_degraded: bool,
}

impl Entitlement {
    /// Media is only fetched once a package is active; gated content is
    /// never loaded.
    pub fn media_enabled(&self) -> bool {
        self.has_active_package
    }
}

/// Resolution failure. Only the event read is fatal; purchase-side failures
/// degrade into the returned [`Entitlement`].
#[derive(Debug, Error)]
pub enum EntitlementError {
    /// The user has no event at all: a terminal, fully-gated state.
    #[error("no event found for user")]
    NoEvent,

    #[error(transparent)]
    Data(#[from] DataAccessError),
}

/// Derives the current entitlement from a user's purchase history.
///
/// Read-only and idempotent: safe to call on every refresh, foreground, and
/// payment return. No caching between calls.
#[derive(Debug)]
pub struct EntitlementResolver<E, P, C> {
    events: E,
    purchases: P,
    catalog: C,
}

impl<E, P, C> EntitlementResolver<E, P, C>
where
    E: EventStore,
    P: PurchaseStore,
    C: CatalogReader,
{
    pub fn new(events: E, purchases: P, catalog: C) -> Self {
        Self {
            events,
            purchases,
            catalog,
        }
    }

    /// Resolve entitlement for `user_id`.
    ///
    /// Two-tier lookup: the most recent purchase governs when it is paid and
    /// carries a resolvable package; otherwise the entire history is scanned
    /// for any paid purchase, so a customer with one completed package keeps
    /// access while a later add-on order is still pending. This must stay
    /// two queries; collapsing it to "latest row wins" regresses exactly
    /// that case.
    pub async fn resolve(&self, user_id: UserId) -> Result<Entitlement, EntitlementError> {
        let event = self
            .events
            .latest_for_owner(user_id)
            .await?
            .ok_or(EntitlementError::NoEvent)?;

        let mut entitlement = Entitlement {
            effective_storage_limit: StorageLimit::Bytes(event.storage_limit_bytes),
            event,
            purchase: None,
            purchase_items: Vec::new(),
            has_active_package: false,
            purchase_read_degraded: false,
        };

        let latest = match self.purchases.latest_for_event(entitlement.event.id).await {
            Ok(latest) => latest,
            Err(e) => {
                warn!(event_id = %entitlement.event.id, error = %e, "purchase read failed; degrading to not entitled");
                entitlement.purchase_read_degraded = true;
                return Ok(entitlement);
            }
        };
        let Some(latest) = latest else {
            return Ok(entitlement);
        };

        // Tier one: the latest purchase, when paid and carrying a package.
        let mut settled = false;
        if latest.is_paid() {
            if let Some(package_id) = latest.package_id {
                match self.catalog.get_package(package_id).await {
                    Ok(Some(package)) => {
                        entitlement.has_active_package = true;
                        entitlement.effective_storage_limit = package.storage_limit;
                        settled = true;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        // The purchase is known paid; only the limit is unknown.
                        warn!(package_id = %package_id, error = %e, "package read failed; keeping event default limit");
                        entitlement.has_active_package = true;
                        entitlement.purchase_read_degraded = true;
                        settled = true;
                    }
                }
            }
        }

        // Tier two: fall back to any paid purchase in the event's history.
        if !settled {
            match self.purchases.latest_paid_for_event(entitlement.event.id).await {
                Ok(Some(paid)) => {
                    entitlement.has_active_package = true;
                    if let Some(package_id) = paid.package_id {
                        match self.catalog.get_package(package_id).await {
                            Ok(Some(package)) => {
                                entitlement.effective_storage_limit = package.storage_limit;
                            }
                            Ok(None) => {}
                            Err(e) => {
                                warn!(package_id = %package_id, error = %e, "package read failed; keeping event default limit");
                                entitlement.purchase_read_degraded = true;
                            }
                        }
                    }
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(event_id = %entitlement.event.id, error = %e, "paid-purchase scan failed");
                    entitlement.purchase_read_degraded = true;
                }
            }
        }

        match self.purchases.items_for(latest.id).await {
            Ok(items) => entitlement.purchase_items = items,
            Err(e) => {
                warn!(purchase_id = %latest.id, error = %e, "purchase items read failed");
                entitlement.purchase_read_degraded = true;
            }
        }
        entitlement.purchase = Some(latest);

        if let Some(bytes) = entitlement.effective_storage_limit.as_bytes() {
            entitlement.event.storage_limit_bytes = bytes;
        }

        debug!(
            event_id = %entitlement.event.id,
            has_active_package = entitlement.has_active_package,
            "entitlement resolved"
        );
        Ok(entitlement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use chrono::{Duration, Utc};
    use proptest::prelude::*;

    use keepsake_catalog::{Package, Product, ProductCategory};
    use keepsake_core::{CategoryId, EventId, Money, PackageId, ProductId, PurchaseId};
    use keepsake_orders::{PaymentStatus, PurchaseStatus, ShippingDetails};

    struct FixedEvents {
        event: Option<Event>,
        fail: bool,
    }

    #[async_trait]
    impl EventStore for FixedEvents {
        async fn latest_for_owner(
            &self,
            _owner: UserId,
        ) -> Result<Option<Event>, DataAccessError> {
            if self.fail {
                return Err(DataAccessError::read("events unavailable"));
            }
            Ok(self.event.clone())
        }
    }

    #[derive(Default)]
    struct MemPurchases {
        purchases: Mutex<Vec<Purchase>>,
        items: Mutex<Vec<PurchaseItem>>,
        fail_reads: bool,
    }

    #[async_trait]
    impl PurchaseStore for MemPurchases {
        async fn create_with_items(
            &self,
            purchase: Purchase,
            items: Vec<PurchaseItem>,
        ) -> Result<(), DataAccessError> {
            self.purchases.lock().unwrap().push(purchase);
            self.items.lock().unwrap().extend(items);
            Ok(())
        }

        async fn get(&self, id: PurchaseId) -> Result<Option<Purchase>, DataAccessError> {
            Ok(self.purchases.lock().unwrap().iter().find(|p| p.id == id).cloned())
        }

        async fn latest_for_event(
            &self,
            event_id: EventId,
        ) -> Result<Option<Purchase>, DataAccessError> {
            if self.fail_reads {
                return Err(DataAccessError::read("purchases unavailable"));
            }
            Ok(self
                .purchases
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.event_id == event_id)
                .max_by_key(|p| p.created_at)
                .cloned())
        }

        async fn latest_paid_for_event(
            &self,
            event_id: EventId,
        ) -> Result<Option<Purchase>, DataAccessError> {
            if self.fail_reads {
                return Err(DataAccessError::read("purchases unavailable"));
            }
            Ok(self
                .purchases
                .lock()
                .unwrap()
                .iter()
                .filter(|p| p.event_id == event_id && p.is_paid())
                .max_by_key(|p| p.created_at)
                .cloned())
        }

        async fn items_for(&self, id: PurchaseId) -> Result<Vec<PurchaseItem>, DataAccessError> {
            Ok(self
                .items
                .lock()
                .unwrap()
                .iter()
                .filter(|i| i.purchase_id == id)
                .cloned()
                .collect())
        }

        async fn update_shipping(
            &self,
            _id: PurchaseId,
            _shipping: ShippingDetails,
        ) -> Result<(), DataAccessError> {
            unimplemented!("not used by resolver tests")
        }

        async fn set_gateway_ref(
            &self,
            _id: PurchaseId,
            _reference: &str,
        ) -> Result<(), DataAccessError> {
            unimplemented!("not used by resolver tests")
        }

        async fn delete_with_items(&self, id: PurchaseId) -> Result<(), DataAccessError> {
            self.purchases.lock().unwrap().retain(|p| p.id != id);
            self.items.lock().unwrap().retain(|i| i.purchase_id != id);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MemCatalog {
        packages: Vec<Package>,
        fail_packages: bool,
    }

    #[async_trait]
    impl CatalogReader for MemCatalog {
        async fn list_packages(&self) -> Result<Vec<Package>, DataAccessError> {
            Ok(self.packages.clone())
        }

        async fn get_package(
            &self,
            id: PackageId,
        ) -> Result<Option<Package>, DataAccessError> {
            if self.fail_packages {
                return Err(DataAccessError::read("packages unavailable"));
            }
            Ok(self.packages.iter().find(|p| p.id == id).cloned())
        }

        async fn list_categories(&self) -> Result<Vec<ProductCategory>, DataAccessError> {
            Ok(vec![])
        }

        async fn list_products(
            &self,
            _category: Option<CategoryId>,
        ) -> Result<Vec<Product>, DataAccessError> {
            Ok(vec![])
        }

        async fn get_product(
            &self,
            _id: ProductId,
        ) -> Result<Option<Product>, DataAccessError> {
            Ok(None)
        }
    }

    const MB: u64 = 1024 * 1024;

    fn event(owner: UserId) -> Event {
        Event {
            id: EventId::new(),
            owner_id: owner,
            kind: crate::event::EventKind::Wedding,
            partner_one: "Ada".to_string(),
            partner_two: "Banu".to_string(),
            event_date: None,
            venue: None,
            city: None,
            description: None,
            storage_used_bytes: 0,
            storage_limit_bytes: 100 * MB,
            is_active: true,
            share_code: None,
            created_at: Utc::now(),
        }
    }

    fn package(name: &str, limit_mb: u64) -> Package {
        Package {
            id: PackageId::new(),
            name: name.to_string(),
            price: Money::from_cents(49_900),
            storage_limit: StorageLimit::Bytes(limit_mb * MB),
            features: vec![],
        }
    }

    fn purchase(
        event_id: EventId,
        package_id: Option<PackageId>,
        paid: bool,
        age_minutes: i64,
    ) -> Purchase {
        Purchase {
            id: PurchaseId::new(),
            event_id,
            package_id,
            status: PurchaseStatus::Pending,
            payment_status: if paid {
                PaymentStatus::Paid
            } else {
                PaymentStatus::Pending
            },
            total_amount: Money::from_cents(49_900),
            currency: "TRY".to_string(),
            shipping: None,
            gateway_ref: None,
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    fn resolver(
        event: Option<Event>,
        purchases: Vec<Purchase>,
        items: Vec<PurchaseItem>,
        packages: Vec<Package>,
    ) -> EntitlementResolver<FixedEvents, MemPurchases, MemCatalog> {
        EntitlementResolver::new(
            FixedEvents { event, fail: false },
            MemPurchases {
                purchases: Mutex::new(purchases),
                items: Mutex::new(items),
                fail_reads: false,
            },
            MemCatalog {
                packages,
                fail_packages: false,
            },
        )
    }

    #[tokio::test]
    async fn no_purchases_means_no_package_and_default_limit() {
        let user = UserId::new();
        let ev = event(user);
        let resolved = resolver(Some(ev.clone()), vec![], vec![], vec![])
            .resolve(user)
            .await
            .unwrap();

        assert!(!resolved.has_active_package);
        assert_eq!(
            resolved.effective_storage_limit,
            StorageLimit::Bytes(ev.storage_limit_bytes)
        );
        assert!(resolved.purchase.is_none());
    }

    #[tokio::test]
    async fn paid_latest_purchase_grants_package_limit() {
        let user = UserId::new();
        let ev = event(user);
        let pkg = package("Basic", 500);
        let p = purchase(ev.id, Some(pkg.id), true, 10);

        let resolved = resolver(Some(ev), vec![p], vec![], vec![pkg.clone()])
            .resolve(user)
            .await
            .unwrap();

        assert!(resolved.has_active_package);
        assert_eq!(resolved.effective_storage_limit, pkg.storage_limit);
        assert_eq!(resolved.event.storage_limit_bytes, 500 * MB);
    }

    #[tokio::test]
    async fn pending_addon_after_paid_package_keeps_access() {
        // Basic (500 MB) paid earlier, then an add-on order still pending.
        let user = UserId::new();
        let ev = event(user);
        let pkg = package("Basic", 500);
        let paid = purchase(ev.id, Some(pkg.id), true, 60);
        let pending_addon = purchase(ev.id, None, false, 5);
        let pending_id = pending_addon.id;

        let resolved = resolver(
            Some(ev),
            vec![paid, pending_addon],
            vec![],
            vec![pkg.clone()],
        )
        .resolve(user)
        .await
        .unwrap();

        assert!(resolved.has_active_package);
        assert_eq!(resolved.effective_storage_limit, StorageLimit::Bytes(500 * MB));
        // The latest (unpaid) purchase is still surfaced for the pending UI.
        assert_eq!(resolved.purchase.unwrap().id, pending_id);
    }

    #[tokio::test]
    async fn pending_only_history_surfaces_purchase_without_access() {
        let user = UserId::new();
        let ev = event(user);
        let pkg = package("Basic", 500);
        let pending = purchase(ev.id, Some(pkg.id), false, 5);
        let item = PurchaseItem {
            purchase_id: pending.id,
            product_id: ProductId::new(),
            quantity: 2,
            unit_price: Money::from_cents(1000),
            customization_text: None,
            product_name_snapshot: "Candles".to_string(),
        };

        let resolved = resolver(Some(ev.clone()), vec![pending.clone()], vec![item], vec![pkg])
            .resolve(user)
            .await
            .unwrap();

        assert!(!resolved.has_active_package);
        assert_eq!(resolved.purchase.unwrap().id, pending.id);
        assert_eq!(resolved.purchase_items.len(), 1);
        assert_eq!(
            resolved.effective_storage_limit,
            StorageLimit::Bytes(ev.storage_limit_bytes)
        );
    }

    #[tokio::test]
    async fn paid_purchase_without_resolvable_package_falls_back_to_scan() {
        // Paid, but the package row is gone: access is still granted via the
        // history scan; the limit stays at the event default.
        let user = UserId::new();
        let ev = event(user);
        let p = purchase(ev.id, Some(PackageId::new()), true, 10);

        let resolved = resolver(Some(ev.clone()), vec![p], vec![], vec![])
            .resolve(user)
            .await
            .unwrap();

        assert!(resolved.has_active_package);
        assert_eq!(
            resolved.effective_storage_limit,
            StorageLimit::Bytes(ev.storage_limit_bytes)
        );
    }

    #[tokio::test]
    async fn catalog_failure_during_scan_grants_access_but_marks_degraded() {
        // The latest purchase is pending, so the history scan finds the
        // earlier paid package; its catalog read fails mid-scan.
        let user = UserId::new();
        let ev = event(user);
        let paid = purchase(ev.id, Some(PackageId::new()), true, 60);
        let pending = purchase(ev.id, None, false, 5);

        let r = EntitlementResolver::new(
            FixedEvents {
                event: Some(ev.clone()),
                fail: false,
            },
            MemPurchases {
                purchases: Mutex::new(vec![paid, pending]),
                items: Mutex::new(vec![]),
                fail_reads: false,
            },
            MemCatalog {
                packages: vec![],
                fail_packages: true,
            },
        );

        let resolved = r.resolve(user).await.unwrap();
        assert!(resolved.has_active_package);
        assert!(resolved.purchase_read_degraded);
        assert_eq!(
            resolved.effective_storage_limit,
            StorageLimit::Bytes(ev.storage_limit_bytes)
        );
    }

    #[tokio::test]
    async fn unlimited_package_limit_passes_through() {
        let user = UserId::new();
        let ev = event(user);
        let mut pkg = package("Forever", 0);
        pkg.storage_limit = StorageLimit::Unlimited;
        let default_bytes = ev.storage_limit_bytes;
        let p = purchase(ev.id, Some(pkg.id), true, 1);

        let resolved = resolver(Some(ev), vec![p], vec![], vec![pkg])
            .resolve(user)
            .await
            .unwrap();

        assert!(resolved.has_active_package);
        assert_eq!(resolved.effective_storage_limit, StorageLimit::Unlimited);
        // No byte count to rewrite; the event copy keeps its stored value.
        assert_eq!(resolved.event.storage_limit_bytes, default_bytes);
    }

    #[tokio::test]
    async fn purchase_read_failure_degrades_to_not_entitled() {
        let user = UserId::new();
        let ev = event(user);
        let r = EntitlementResolver::new(
            FixedEvents {
                event: Some(ev),
                fail: false,
            },
            MemPurchases {
                purchases: Mutex::new(vec![]),
                items: Mutex::new(vec![]),
                fail_reads: true,
            },
            MemCatalog::default(),
        );

        let resolved = r.resolve(user).await.unwrap();
        assert!(!resolved.has_active_package);
        assert!(resolved.purchase_read_degraded);
    }

    #[tokio::test]
    async fn event_read_failure_is_fatal() {
        let user = UserId::new();
        let r = EntitlementResolver::new(
            FixedEvents {
                event: None,
                fail: true,
            },
            MemPurchases::default(),
            MemCatalog::default(),
        );

        assert!(matches!(
            r.resolve(user).await.unwrap_err(),
            EntitlementError::Data(_)
        ));
    }

    #[tokio::test]
    async fn missing_event_is_terminal() {
        let user = UserId::new();
        let r = EntitlementResolver::new(
            FixedEvents {
                event: None,
                fail: false,
            },
            MemPurchases::default(),
            MemCatalog::default(),
        );

        assert!(matches!(
            r.resolve(user).await.unwrap_err(),
            EntitlementError::NoEvent
        ));
    }

    #[tokio::test]
    async fn resolve_is_idempotent() {
        let user = UserId::new();
        let ev = event(user);
        let pkg = package("Basic", 500);
        let p = purchase(ev.id, Some(pkg.id), true, 10);
        let r = resolver(Some(ev), vec![p], vec![], vec![pkg]);

        let first = r.resolve(user).await.unwrap();
        let second = r.resolve(user).await.unwrap();
        assert_eq!(first, second);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        /// Property: any history containing at least one paid package
        /// purchase grants access, regardless of the payment status of any
        /// later purchase.
        #[test]
        fn one_paid_package_purchase_always_grants_access(
            later_paid_flags in prop::collection::vec(any::<bool>(), 0..6)
        ) {
            let rt = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();
            rt.block_on(async move {
                let user = UserId::new();
                let ev = event(user);
                let pkg = package("Basic", 500);

                let mut purchases = vec![purchase(ev.id, Some(pkg.id), true, 1000)];
                for (i, paid) in later_paid_flags.iter().enumerate() {
                    purchases.push(purchase(ev.id, None, *paid, 900 - i as i64));
                }

                let resolved = resolver(Some(ev), purchases, vec![], vec![pkg])
                    .resolve(user)
                    .await
                    .unwrap();
                assert!(resolved.has_active_package);
            });
        }
    }
}
