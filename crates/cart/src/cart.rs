//! Keyed cart lines with quantity rules and totals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use keepsake_catalog::Product;
use keepsake_core::{DomainError, Money, ProductId};

/// Key of a cart line: product plus normalized customization text.
///
/// Two additions of the same product with the same customization merge into
/// one line; differing customization produces an independent line.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct LineKey {
    pub product_id: ProductId,
    pub customization: Option<String>,
}

/// One selected product with quantity and optional customization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartLine {
    pub product: Product,
    pub quantity: u32,
    pub customization: Option<String>,
}

impl CartLine {
    pub fn line_total(&self) -> Money {
        self.product.price.times(self.quantity)
    }
}

/// In-memory cart: a keyed mapping of lines.
///
/// `BTreeMap` keeps iteration order deterministic, which keeps downstream
/// order items and gateway baskets stable across runs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: BTreeMap<LineKey, CartLine>,
}

fn normalize(customization: Option<&str>) -> Option<String> {
    customization
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Number of distinct lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Total units across all lines (cart badge count).
    pub fn item_count(&self) -> u32 {
        self.lines.values().map(|l| l.quantity).sum()
    }

    pub fn lines(&self) -> impl Iterator<Item = &CartLine> {
        self.lines.values()
    }

    pub fn get(&self, key: &LineKey) -> Option<&CartLine> {
        self.lines.get(key)
    }

    /// Add a product to the cart.
    ///
    /// Defaults the quantity to the product's minimum unless overridden;
    /// explicit quantities are clamped up to the minimum. A product that
    /// requires customization cannot be added without non-empty text; the
    /// error carries the product's prompt as the user-facing message.
    pub fn add(
        &mut self,
        product: Product,
        quantity: Option<u32>,
        customization: Option<&str>,
    ) -> Result<LineKey, DomainError> {
        let customization = normalize(customization);

        if product.customization_required && customization.is_none() {
            let message = product
                .customization_prompt
                .clone()
                .unwrap_or_else(|| "customization text is required".to_string());
            return Err(DomainError::missing_field("customization_text", message));
        }

        let quantity = quantity
            .unwrap_or_else(|| product.min_quantity())
            .max(product.min_quantity());

        let key = LineKey {
            product_id: product.id,
            customization: customization.clone(),
        };

        self.lines
            .entry(key.clone())
            .and_modify(|line| line.quantity += quantity)
            .or_insert(CartLine {
                product,
                quantity,
                customization,
            });

        Ok(key)
    }

    /// Move a line's quantity by `steps` increments of the product's step
    /// size. The result is clamped so it never falls below the product's
    /// minimum: a decrement that would cross it is a no-op, not a removal.
    ///
    /// Returns the quantity after the change.
    pub fn update_quantity(&mut self, key: &LineKey, steps: i32) -> Result<u32, DomainError> {
        let line = self.lines.get_mut(key).ok_or(DomainError::NotFound)?;
        line.quantity = line.product.adjust_quantity(line.quantity, steps);
        Ok(line.quantity)
    }

    pub fn remove(&mut self, key: &LineKey) -> Option<CartLine> {
        self.lines.remove(key)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// `Σ quantity × unit price`, recomputed on every call.
    pub fn total(&self) -> Money {
        self.lines.values().map(CartLine::line_total).sum()
    }
}
