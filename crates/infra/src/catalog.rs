//! In-memory catalog.

use std::sync::RwLock;

use async_trait::async_trait;

use keepsake_catalog::{CatalogReader, Package, Product, ProductCategory};
use keepsake_core::{CategoryId, DataAccessError, PackageId, ProductId};

/// In-memory catalog rows.
///
/// Intended for tests/dev. Seeded via the `add_*` methods.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    packages: RwLock<Vec<Package>>,
    categories: RwLock<Vec<ProductCategory>>,
    products: RwLock<Vec<Product>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_package(&self, package: Package) {
        if let Ok(mut rows) = self.packages.write() {
            rows.push(package);
        }
    }

    pub fn add_category(&self, category: ProductCategory) {
        if let Ok(mut rows) = self.categories.write() {
            rows.push(category);
        }
    }

    pub fn add_product(&self, product: Product) {
        if let Ok(mut rows) = self.products.write() {
            rows.push(product);
        }
    }
}

fn poisoned() -> DataAccessError {
    DataAccessError::read("lock poisoned")
}

#[async_trait]
impl CatalogReader for InMemoryCatalog {
    async fn list_packages(&self) -> Result<Vec<Package>, DataAccessError> {
        let rows = self.packages.read().map_err(|_| poisoned())?;
        Ok(rows.clone())
    }

    async fn get_package(&self, id: PackageId) -> Result<Option<Package>, DataAccessError> {
        let rows = self.packages.read().map_err(|_| poisoned())?;
        Ok(rows.iter().find(|p| p.id == id).cloned())
    }

    async fn list_categories(&self) -> Result<Vec<ProductCategory>, DataAccessError> {
        let rows = self.categories.read().map_err(|_| poisoned())?;
        let mut out: Vec<ProductCategory> =
            rows.iter().filter(|c| c.is_active).cloned().collect();
        out.sort_by_key(|c| c.sort_order);
        Ok(out)
    }

    async fn list_products(
        &self,
        category: Option<CategoryId>,
    ) -> Result<Vec<Product>, DataAccessError> {
        let rows = self.products.read().map_err(|_| poisoned())?;
        let mut out: Vec<Product> = rows
            .iter()
            .filter(|p| p.is_active)
            .filter(|p| category.is_none() || p.category_id == category)
            .cloned()
            .collect();
        out.sort_by_key(|p| p.price);
        Ok(out)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, DataAccessError> {
        let rows = self.products.read().map_err(|_| poisoned())?;
        Ok(rows.iter().find(|p| p.id == id).cloned())
    }
}
