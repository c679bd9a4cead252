//! Read-only catalog access.

use std::sync::Arc;

use async_trait::async_trait;

use keepsake_core::{CategoryId, DataAccessError, PackageId, ProductId};

use crate::package::Package;
use crate::product::{Product, ProductCategory};

/// Read-only access to catalog rows.
///
/// Implementations must return only active rows from the listing methods:
/// categories ascending by `sort_order`, products ascending by price.
/// `get_*` lookups ignore the active flag so existing orders can still
/// resolve their rows.
#[async_trait]
pub trait CatalogReader: Send + Sync {
    async fn list_packages(&self) -> Result<Vec<Package>, DataAccessError>;

    async fn get_package(&self, id: PackageId) -> Result<Option<Package>, DataAccessError>;

    async fn list_categories(&self) -> Result<Vec<ProductCategory>, DataAccessError>;

    /// Active products, ascending by price, optionally limited to a category.
    async fn list_products(
        &self,
        category: Option<CategoryId>,
    ) -> Result<Vec<Product>, DataAccessError>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, DataAccessError>;
}

#[async_trait]
impl<R> CatalogReader for Arc<R>
where
    R: CatalogReader + ?Sized,
{
    async fn list_packages(&self) -> Result<Vec<Package>, DataAccessError> {
        (**self).list_packages().await
    }

    async fn get_package(&self, id: PackageId) -> Result<Option<Package>, DataAccessError> {
        (**self).get_package(id).await
    }

    async fn list_categories(&self) -> Result<Vec<ProductCategory>, DataAccessError> {
        (**self).list_categories().await
    }

    async fn list_products(
        &self,
        category: Option<CategoryId>,
    ) -> Result<Vec<Product>, DataAccessError> {
        (**self).list_products(category).await
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, DataAccessError> {
        (**self).get_product(id).await
    }
}
