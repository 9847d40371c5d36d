//! Categories and products. Product stock is never written here directly;
//! creation and stock edits go through the inventory ledger.

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::inventory::InventoryLedger;
use crate::domain::aggregates::{Category, Product};
use crate::store::{Collection, Filter, SharedStore, Update};
use crate::{EcommerceError, Result};

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewProduct {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    #[validate(range(min = 0, max = 1000000000))]
    pub stock: i64,
    #[serde(default)]
    pub category: Option<Uuid>,
    #[serde(default)]
    pub images: Vec<String>,
}

/// Partial product update; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProductChanges {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    #[validate(range(min = 0, max = 1000000000))]
    pub stock: Option<i64>,
    pub category: Option<Uuid>,
    pub images: Option<Vec<String>>,
}

fn check_price(price: Decimal) -> Result<()> {
    if price < Decimal::ZERO {
        return Err(EcommerceError::Validation("price must not be negative".into()));
    }
    Ok(())
}

#[derive(Clone)]
pub struct CatalogService {
    categories: Collection<Category>,
    products: Collection<Product>,
    ledger: InventoryLedger,
}

impl CatalogService {
    pub fn new(store: SharedStore, ledger: InventoryLedger) -> Self {
        Self {
            categories: Collection::new(store.clone()),
            products: Collection::new(store),
            ledger,
        }
    }

    // -- categories ---------------------------------------------------------

    pub async fn create_category(&self, input: CategoryInput) -> Result<Category> {
        input.validate()?;
        let category = Category::create(input.name.trim(), input.description);
        self.categories.save(&category).await?;
        tracing::info!(category_id = %category.id, name = %category.name, "category created");
        Ok(category)
    }

    pub async fn list_categories(&self) -> Result<Vec<Category>> {
        self.categories.find(&Filter::all()).await
    }

    pub async fn get_category(&self, id: Uuid) -> Result<Category> {
        self.categories.get(id).await
    }

    pub async fn update_category(&self, id: Uuid, input: CategoryInput) -> Result<Category> {
        input.validate()?;
        let update = Update::new().set("name", input.name.trim()).set("description", input.description);
        self.categories
            .find_by_id_and_update(id, &Filter::all(), &update)
            .await?
            .ok_or(EcommerceError::NotFound("Category"))
    }

    pub async fn delete_category(&self, id: Uuid) -> Result<Category> {
        let category = self.categories.find_by_id_and_delete(id).await?.ok_or(EcommerceError::NotFound("Category"))?;
        tracing::info!(category_id = %id, "category deleted");
        Ok(category)
    }

    // -- products -----------------------------------------------------------

    async fn ensure_category(&self, category: Option<Uuid>) -> Result<()> {
        match category {
            Some(id) => self.categories.get(id).await.map(|_| ()),
            None => Ok(()),
        }
    }

    /// Persist the product with zero stock, then set stock and inventory together.
    pub async fn create_product(&self, input: NewProduct) -> Result<Product> {
        input.validate()?;
        check_price(input.price)?;
        self.ensure_category(input.category).await?;

        let product = Product::create(input.name.trim(), input.price, 0)
            .with_description(input.description)
            .with_category(input.category)
            .with_images(input.images);
        self.products.save(&product).await?;
        self.ledger.set_quantity(product.id, input.stock).await?;
        tracing::info!(product_id = %product.id, name = %product.name, stock = input.stock, "product created");
        self.products.get(product.id).await
    }

    pub async fn list_products(&self, category: Option<Uuid>) -> Result<Vec<Product>> {
        let filter = match category {
            Some(c) => Filter::all().eq("category", c),
            None => Filter::all(),
        };
        self.products.find(&filter).await
    }

    pub async fn get_product(&self, id: Uuid) -> Result<Product> {
        self.products.get(id).await
    }

    pub async fn update_product(&self, id: Uuid, changes: ProductChanges) -> Result<Product> {
        changes.validate()?;
        if let Some(price) = changes.price {
            check_price(price)?;
        }
        self.ensure_category(changes.category).await?;

        let mut update = Update::new();
        if let Some(name) = &changes.name { update = update.set("name", name.trim()); }
        if let Some(description) = &changes.description { update = update.set("description", description); }
        if let Some(price) = changes.price { update = update.set("price", price); }
        if let Some(category) = changes.category { update = update.set("category", category); }
        if let Some(images) = &changes.images { update = update.set("images", images); }

        if update.is_empty() {
            self.products.get(id).await?;
        } else {
            self.products
                .find_by_id_and_update(id, &Filter::all(), &update.set("updatedAt", Utc::now()))
                .await?
                .ok_or(EcommerceError::NotFound("Product"))?;
        }
        if let Some(stock) = changes.stock {
            self.ledger.set_quantity(id, stock).await?;
        }
        tracing::info!(product_id = %id, "product updated");
        self.products.get(id).await
    }

    /// Removes the product and its inventory record. Orders keep their line items.
    pub async fn delete_product(&self, id: Uuid) -> Result<Product> {
        let product = self.products.find_by_id_and_delete(id).await?.ok_or(EcommerceError::NotFound("Product"))?;
        self.ledger.remove_for_product(id).await?;
        tracing::info!(product_id = %id, "product deleted");
        Ok(product)
    }
}
