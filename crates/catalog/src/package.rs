//! Purchasable storage/feature tiers.

use serde::{Deserialize, Serialize};

use keepsake_core::{Money, PackageId};

/// Storage quota granted by a package.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageLimit {
    /// Quota in bytes.
    Bytes(u64),
    /// No quota enforced.
    Unlimited,
}

impl StorageLimit {
    pub fn as_bytes(&self) -> Option<u64> {
        match self {
            StorageLimit::Bytes(b) => Some(*b),
            StorageLimit::Unlimited => None,
        }
    }
}

/// A purchasable package tier. Immutable catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Package {
    pub id: PackageId,
    pub name: String,
    pub price: Money,
    pub storage_limit: StorageLimit,
    pub features: Vec<String>,
}
