use serde::{Deserialize, Serialize};

use stockroom_core::{ProductCode, Version};

/// A stocked product; holds the authoritative current balance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    code: ProductCode,
    description: String,
    stock_quantity: i64,
    version: Version,
}

impl Product {
    pub fn new(
        code: ProductCode,
        description: impl Into<String>,
        stock_quantity: i64,
        version: Version,
    ) -> Self {
        Self {
            code,
            description: description.into(),
            stock_quantity,
            version,
        }
    }

    pub fn code(&self) -> ProductCode {
        self.code
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn stock_quantity(&self) -> i64 {
        self.stock_quantity
    }

    /// Version read together with the row; the store's conditional write
    /// compares against it.
    pub fn version(&self) -> Version {
        self.version
    }

    pub fn set_stock_quantity(&mut self, quantity: i64) {
        self.stock_quantity = quantity;
    }

    /// Copy of this product as stored after a successful conditional write.
    pub fn with_version(mut self, version: Version) -> Self {
        self.version = version;
        self
    }
}
