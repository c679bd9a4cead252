//! `keepsake-catalog` — read-only access to packages, categories, and products.
//!
//! Catalog rows are immutable from this engine's point of view; the only
//! operation is fetching them. Pricing and quantity rules live on the rows
//! themselves so the cart and pipeline can evaluate them without extra reads.

pub mod package;
pub mod product;
pub mod reader;

pub use package::{Package, StorageLimit};
pub use product::{Product, ProductCategory};
pub use reader::CatalogReader;
