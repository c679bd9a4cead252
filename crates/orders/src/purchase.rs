//! Purchase (order) and line-item records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keepsake_core::{DomainError, DomainResult, EventId, Money, PackageId, ProductId, PurchaseId};

/// Order status lifecycle. `Completed`/`Cancelled`/`Refunded` are written by
/// server-side processes; this engine only ever creates `Pending` orders and
/// deletes them while still pending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PurchaseStatus {
    Pending,
    Completed,
    Cancelled,
    Refunded,
}

/// Payment status as reported by the gateway callback handler.
///
/// Both `Completed` and `Paid` appear in live data; treat them identically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Completed,
    Failed,
    Paid,
}

/// Shipping fields captured during checkout. All fields are required before
/// the pipeline will advance past address capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingDetails {
    pub recipient_name: String,
    pub recipient_phone: String,
    pub address: String,
    pub city: String,
    pub district: String,
}

impl ShippingDetails {
    pub fn validate(&self) -> DomainResult<()> {
        let fields = [
            ("recipient_name", &self.recipient_name),
            ("recipient_phone", &self.recipient_phone),
            ("address", &self.address),
            ("city", &self.city),
            ("district", &self.district),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(DomainError::missing_field(
                    name,
                    format!("{name} must not be blank"),
                ));
            }
        }
        Ok(())
    }
}

/// A transaction record tying an event to an optional package and line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub event_id: EventId,
    pub package_id: Option<PackageId>,
    pub status: PurchaseStatus,
    pub payment_status: PaymentStatus,
    /// Computed and persisted at creation time; never recomputed from
    /// possibly-changed catalog prices.
    pub total_amount: Money,
    pub currency: String,
    pub shipping: Option<ShippingDetails>,
    /// Correlation id issued by the payment gateway, persisted before the
    /// hosted-page handoff so the asynchronous callback can be matched back
    /// to this order.
    pub gateway_ref: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Purchase {
    /// The "paid" predicate used by entitlement resolution.
    pub fn is_paid(&self) -> bool {
        self.status == PurchaseStatus::Completed
            || matches!(
                self.payment_status,
                PaymentStatus::Completed | PaymentStatus::Paid
            )
    }

    /// Cancellation is only legal while both statuses are still pending.
    pub fn is_cancellable(&self) -> bool {
        self.status == PurchaseStatus::Pending && self.payment_status == PaymentStatus::Pending
    }
}

/// One order line, snapshotted at order time. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseItem {
    pub purchase_id: PurchaseId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Unit price frozen at order time; must not track live catalog prices.
    pub unit_price: Money,
    pub customization_text: Option<String>,
    /// Product name frozen at order time, with any customization folded in
    /// as `"{name} ({customization})"`.
    pub product_name_snapshot: String,
}

impl PurchaseItem {
    pub fn line_total(&self) -> Money {
        self.unit_price.times(self.quantity)
    }
}
