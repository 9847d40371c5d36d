//! Inventory ledger: per-product available quantity, kept equal to `Product::stock`.
//!
//! `reserve`, `release` and `set_quantity` each run as one store transaction
//! over the product and its inventory record, so concurrent requests for the
//! same product are serialised.

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::events::EventPublisher;
use crate::domain::aggregates::{Inventory, Product, StockOp};
use crate::domain::events::{DomainEvent, InventoryEvent};
use crate::store::{Collection, Filter, SharedStore};
use crate::{EcommerceError, Result};

/// Inventory record with its product populated.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryView {
    #[serde(flatten)]
    pub inventory: Inventory,
    pub product_details: Option<Product>,
}

#[derive(Clone)]
pub struct InventoryLedger {
    store: SharedStore,
    inventory: Collection<Inventory>,
    products: Collection<Product>,
    events: EventPublisher,
}

impl InventoryLedger {
    pub fn new(store: SharedStore, events: EventPublisher) -> Self {
        Self {
            inventory: Collection::new(store.clone()),
            products: Collection::new(store.clone()),
            store,
            events,
        }
    }

    /// Take `qty` units out of inventory and product stock. A product with no
    /// record yet is seeded from its current stock first. Any shortfall or a
    /// missing product fails with `InsufficientStock`.
    pub async fn reserve(&self, product_id: Uuid, qty: i64) -> Result<Inventory> {
        self.adjust(product_id, StockOp::Reserve(qty)).await.map_err(|e| match e {
            EcommerceError::InsufficientInventory { product, available, requested } => {
                EcommerceError::InsufficientStock { product, available, requested }
            }
            EcommerceError::ProductNotFound(id) => {
                EcommerceError::InsufficientStock { product: id.to_string(), available: 0, requested: qty }
            }
            other => other,
        })
    }

    /// Put `qty` units back. A product with no record starts from zero.
    pub async fn release(&self, product_id: Uuid, qty: i64) -> Result<Inventory> {
        self.adjust(product_id, StockOp::Release(qty)).await
    }

    /// Absolute set of both the inventory quantity and the product stock.
    pub async fn set_quantity(&self, product_id: Uuid, qty: i64) -> Result<Inventory> {
        self.adjust(product_id, StockOp::Set(qty)).await
    }

    async fn adjust(&self, product_id: Uuid, op: StockOp) -> Result<Inventory> {
        let levels = self.store.adjust_stock(product_id, op).await?;
        let remaining = levels.inventory.quantity;
        let event = match op {
            StockOp::Reserve(quantity) => InventoryEvent::Reserved { product_id, quantity, remaining },
            StockOp::Release(quantity) => InventoryEvent::Released { product_id, quantity, remaining },
            StockOp::Set(quantity) => InventoryEvent::Set { product_id, quantity },
        };
        tracing::info!(%product_id, ?op, remaining, "inventory adjusted");
        self.events.publish([DomainEvent::Inventory(event)]).await;
        Ok(levels.inventory)
    }

    pub async fn find_by_product(&self, product_id: Uuid) -> Result<Option<Inventory>> {
        self.inventory.find_one(&Filter::all().eq("product", product_id)).await
    }

    /// Get-or-create: a missing record is created from `product.stock`.
    pub async fn ensure(&self, product: &Product) -> Result<Inventory> {
        if let Some(existing) = self.find_by_product(product.id).await? {
            return Ok(existing);
        }
        let fresh = Inventory::seeded_from(product, Utc::now());
        match self.inventory.save(&fresh).await {
            Ok(()) => {
                tracing::info!(product_id = %product.id, quantity = fresh.quantity, "created inventory record");
                Ok(fresh)
            }
            // Lost a creation race; the winner's record is authoritative.
            Err(EcommerceError::AlreadyExists(_)) => {
                self.find_by_product(product.id).await?.ok_or(EcommerceError::NotFound("Inventory"))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn get_by_product(&self, product_id: Uuid) -> Result<InventoryView> {
        let inventory = self.find_by_product(product_id).await?.ok_or(EcommerceError::NotFound("Inventory"))?;
        self.populate(inventory).await
    }

    pub async fn list(&self) -> Result<Vec<InventoryView>> {
        let mut views = Vec::new();
        for inventory in self.inventory.find(&Filter::all()).await? {
            views.push(self.populate(inventory).await?);
        }
        Ok(views)
    }

    async fn populate(&self, inventory: Inventory) -> Result<InventoryView> {
        let product_details = self.products.find_by_id(inventory.product).await?;
        Ok(InventoryView { inventory, product_details })
    }

    /// Create the missing record for every product. Returns how many were created.
    pub async fn backfill(&self) -> Result<usize> {
        let mut created = 0;
        for product in self.products.find(&Filter::all()).await? {
            if self.find_by_product(product.id).await?.is_none() {
                self.ensure(&product).await?;
                created += 1;
            }
        }
        tracing::info!(created, "inventory backfill completed");
        Ok(created)
    }

    pub async fn remove_for_product(&self, product_id: Uuid) -> Result<()> {
        if let Some(inventory) = self.find_by_product(product_id).await? {
            self.inventory.find_by_id_and_delete(inventory.id).await?;
        }
        Ok(())
    }
}
