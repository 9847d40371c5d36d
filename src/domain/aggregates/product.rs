//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Catalog entry. `stock` mirrors the quantity of the product's inventory record
/// and is only written through the inventory ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    pub stock: i64,
    #[serde(default)]
    pub category: Option<Uuid>,
    #[serde(default)]
    pub images: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    pub fn create(name: impl Into<String>, price: Decimal, stock: i64) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(), name: name.into(), description: None, price, stock,
            category: None, images: vec![], created_at: now, updated_at: now,
        }
    }

    pub fn with_category(mut self, category: Option<Uuid>) -> Self { self.category = category; self }
    pub fn with_description(mut self, description: Option<String>) -> Self { self.description = description; self }
    pub fn with_images(mut self, images: Vec<String>) -> Self { self.images = images; self }
}
