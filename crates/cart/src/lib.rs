//! `keepsake-cart` — in-memory cart aggregation.
//!
//! Ephemeral, client-only state: a keyed mapping of selected products to
//! quantity and customization. No IO.

pub mod cart;

pub use cart::{Cart, CartLine, LineKey};
