//! In-memory document store for tests, local demos, and running without Postgres.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{check_unique, DocumentStore, Filter, Update, INVENTORY, PRODUCTS};
use crate::domain::aggregates::{inventory, Inventory, Product, StockLevels, StockOp};
use crate::{EcommerceError, Result};

type Collections = HashMap<String, BTreeMap<Uuid, Value>>;

/// Every operation holds the single lock for its whole duration, so each call
/// (including the two-document `adjust_stock`) is atomic.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Collections>,
}

impl InMemoryStore {
    pub fn new() -> Self { Self::default() }
}

fn insert(state: &mut Collections, collection: &str, id: Uuid, doc: Value) -> Result<()> {
    let docs = state.entry(collection.to_string()).or_default();
    check_unique(collection, id, &doc, docs.iter())?;
    docs.insert(id, doc);
    Ok(())
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Value>> {
        let state = self.inner.read().await;
        Ok(state.get(collection).and_then(|docs| docs.get(&id)).cloned())
    }

    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>> {
        filter.check()?;
        let state = self.inner.read().await;
        Ok(state
            .get(collection)
            .map(|docs| docs.values().filter(|d| filter.matches(d)).cloned().collect())
            .unwrap_or_default())
    }

    async fn save(&self, collection: &str, id: Uuid, doc: Value) -> Result<()> {
        let mut state = self.inner.write().await;
        insert(&mut state, collection, id, doc)
    }

    async fn find_by_id_and_update(&self, collection: &str, id: Uuid, guard: &Filter, update: &Update) -> Result<Option<Value>> {
        guard.check()?;
        let mut state = self.inner.write().await;
        let Some(current) = state.get(collection).and_then(|docs| docs.get(&id)) else {
            return Ok(None);
        };
        if !guard.matches(current) {
            return Ok(None);
        }
        let mut next = current.clone();
        update.apply(&mut next)?;
        insert(&mut state, collection, id, next.clone())?;
        Ok(Some(next))
    }

    async fn find_by_id_and_delete(&self, collection: &str, id: Uuid) -> Result<Option<Value>> {
        let mut state = self.inner.write().await;
        Ok(state.get_mut(collection).and_then(|docs| docs.remove(&id)))
    }

    async fn adjust_stock(&self, product_id: Uuid, op: StockOp) -> Result<StockLevels> {
        let mut state = self.inner.write().await;
        let mut product: Product = match state.get(PRODUCTS).and_then(|docs| docs.get(&product_id)) {
            Some(doc) => serde_json::from_value(doc.clone())?,
            None => return Err(EcommerceError::ProductNotFound(product_id)),
        };
        let by_product = Filter::all().eq("product", product_id);
        let existing: Option<Inventory> = state
            .get(INVENTORY)
            .and_then(|docs| docs.values().find(|d| by_product.matches(d)))
            .map(|d| serde_json::from_value(d.clone()))
            .transpose()?;

        let inventory = inventory::apply_stock(op, &mut product, existing, Utc::now())?;

        insert(&mut state, INVENTORY, inventory.id, serde_json::to_value(&inventory)?)?;
        insert(&mut state, PRODUCTS, product.id, serde_json::to_value(&product)?)?;
        Ok(StockLevels { product, inventory })
    }
}
