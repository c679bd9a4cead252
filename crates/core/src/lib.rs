//! `keepsake-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod error;
pub mod id;
pub mod money;

pub use error::{DataAccessError, DomainError, DomainResult};
pub use id::{CategoryId, EventId, MediaId, PackageId, ProductId, PurchaseId, UserId};
pub use money::Money;
