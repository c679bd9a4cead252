//! Add-on products and their categories.

use serde::{Deserialize, Serialize};

use keepsake_core::{CategoryId, Money, ProductId};

/// A product category used to group shop listings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductCategory {
    pub id: CategoryId,
    pub name: String,
    pub sort_order: u32,
    pub is_active: bool,
}

/// An add-on product. Immutable catalog data.
///
/// Quantity rules: `min_quantity` is the smallest orderable quantity and the
/// default on add-to-cart; quantity changes move in steps of
/// `increment_amount`. Both default to 1 when the catalog leaves them unset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub price: Money,
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub min_quantity: Option<u32>,
    #[serde(default)]
    pub increment_amount: Option<u32>,
    #[serde(default)]
    pub customization_required: bool,
    #[serde(default)]
    pub customization_prompt: Option<String>,
    #[serde(default)]
    pub image_urls: Vec<String>,
    pub is_active: bool,
}

impl Product {
    /// Smallest orderable quantity (never below 1).
    pub fn min_quantity(&self) -> u32 {
        self.min_quantity.unwrap_or(1).max(1)
    }

    /// Step size for quantity changes (never below 1).
    pub fn quantity_step(&self) -> u32 {
        self.increment_amount.unwrap_or(1).max(1)
    }

    /// Apply `steps` increments/decrements to `current`, clamped so the
    /// result never falls below the minimum. A decrement that would land
    /// below the minimum leaves the quantity unchanged.
    pub fn adjust_quantity(&self, current: u32, steps: i32) -> u32 {
        let delta = i64::from(steps) * i64::from(self.quantity_step());
        let next = i64::from(current) + delta;
        if next < i64::from(self.min_quantity()) {
            current
        } else {
            next as u32
        }
    }
}
