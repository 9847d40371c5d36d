//! Document store boundary.
//!
//! Documents are JSON values keyed by `(collection, id)`. [`DocumentStore`] is
//! object safe and untyped; [`Collection`] layers serde on top for each
//! aggregate type.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::aggregates::{Category, Inventory, Order, Product, StockLevels, StockOp, User};
use crate::{EcommerceError, Result};

pub use memory::InMemoryStore;
pub use postgres::PgDocumentStore;

pub const USERS: &str = "users";
pub const CATEGORIES: &str = "categories";
pub const PRODUCTS: &str = "products";
pub const INVENTORY: &str = "inventory";
pub const ORDERS: &str = "orders";

/// Fields that must be unique within a collection.
pub fn unique_fields(collection: &str) -> &'static [&'static str] {
    match collection {
        USERS => &["username", "email"],
        INVENTORY => &["product"],
        _ => &[],
    }
}

pub trait Document: Serialize + DeserializeOwned + Send + Sync + 'static {
    const COLLECTION: &'static str;
    const NAME: &'static str;
    fn id(&self) -> Uuid;
}

impl Document for User {
    const COLLECTION: &'static str = USERS;
    const NAME: &'static str = "User";
    fn id(&self) -> Uuid { self.id }
}

impl Document for Category {
    const COLLECTION: &'static str = CATEGORIES;
    const NAME: &'static str = "Category";
    fn id(&self) -> Uuid { self.id }
}

impl Document for Product {
    const COLLECTION: &'static str = PRODUCTS;
    const NAME: &'static str = "Product";
    fn id(&self) -> Uuid { self.id }
}

impl Document for Inventory {
    const COLLECTION: &'static str = INVENTORY;
    const NAME: &'static str = "Inventory";
    fn id(&self) -> Uuid { self.id }
}

impl Document for Order {
    const COLLECTION: &'static str = ORDERS;
    const NAME: &'static str = "Order";
    fn id(&self) -> Uuid { self.id }
}

// =============================================================================
// Filters and updates
// =============================================================================

#[derive(Clone, Debug, PartialEq)]
pub enum Clause {
    Eq(String, Value),
    In(String, Vec<Value>),
}

/// Conjunction of top-level field clauses. A value that cannot be encoded
/// poisons the filter: it matches nothing and [`Filter::check`] fails.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Filter {
    clauses: Vec<Clause>,
    invalid: Option<String>,
}

impl Filter {
    pub fn all() -> Self { Self::default() }

    pub fn eq(mut self, field: &str, value: impl Serialize) -> Self {
        match encode(field, value) {
            Ok(v) => self.clauses.push(Clause::Eq(field.to_string(), v)),
            Err(e) => { self.invalid.get_or_insert(e); }
        }
        self
    }

    pub fn any_of<T: Serialize>(mut self, field: &str, values: impl IntoIterator<Item = T>) -> Self {
        match values.into_iter().map(|v| encode(field, v)).collect::<std::result::Result<Vec<_>, _>>() {
            Ok(vs) => self.clauses.push(Clause::In(field.to_string(), vs)),
            Err(e) => { self.invalid.get_or_insert(e); }
        }
        self
    }

    pub fn clauses(&self) -> &[Clause] { &self.clauses }

    pub fn check(&self) -> Result<()> { poisoned(&self.invalid) }

    pub fn matches(&self, doc: &Value) -> bool {
        self.invalid.is_none() && self.clauses.iter().all(|clause| match clause {
            Clause::Eq(field, expected) => doc.get(field) == Some(expected),
            Clause::In(field, options) => doc.get(field).is_some_and(|v| options.contains(v)),
        })
    }
}

/// Field assignments applied atomically to one document. Like [`Filter`], an
/// unencodable value makes the whole update fail when applied.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Update {
    fields: Vec<(String, Value)>,
    invalid: Option<String>,
}

impl Update {
    pub fn new() -> Self { Self::default() }

    pub fn set(mut self, field: &str, value: impl Serialize) -> Self {
        match encode(field, value) {
            Ok(v) => self.fields.push((field.to_string(), v)),
            Err(e) => { self.invalid.get_or_insert(e); }
        }
        self
    }

    pub fn is_empty(&self) -> bool { self.fields.is_empty() && self.invalid.is_none() }

    pub fn apply(&self, doc: &mut Value) -> Result<()> {
        poisoned(&self.invalid)?;
        let obj = doc
            .as_object_mut()
            .ok_or_else(|| EcommerceError::Storage("document is not an object".into()))?;
        for (field, value) in &self.fields {
            obj.insert(field.clone(), value.clone());
        }
        Ok(())
    }
}

fn encode(field: &str, value: impl Serialize) -> std::result::Result<Value, String> {
    serde_json::to_value(value).map_err(|e| {
        tracing::warn!(field, error = %e, "value cannot be encoded as JSON");
        format!("cannot encode value for '{field}': {e}")
    })
}

fn poisoned(invalid: &Option<String>) -> Result<()> {
    match invalid {
        Some(reason) => Err(EcommerceError::Internal(reason.clone())),
        None => Ok(()),
    }
}

/// Reject `doc` if another document in `existing` already holds one of its unique field values.
pub(crate) fn check_unique<'a>(collection: &str, id: Uuid, doc: &Value, existing: impl IntoIterator<Item = (&'a Uuid, &'a Value)>) -> Result<()> {
    let fields = unique_fields(collection);
    if fields.is_empty() { return Ok(()); }
    for (other_id, other) in existing {
        if *other_id == id { continue; }
        for field in fields {
            if let Some(v) = doc.get(*field) {
                if !v.is_null() && other.get(*field) == Some(v) {
                    return Err(EcommerceError::AlreadyExists(format!("{collection}.{field} {v}")));
                }
            }
        }
    }
    Ok(())
}

// =============================================================================
// Store trait
// =============================================================================

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn find_by_id(&self, collection: &str, id: Uuid) -> Result<Option<Value>>;

    /// Matching documents in id (creation) order.
    async fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Value>>;

    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Value>> {
        Ok(self.find(collection, filter).await?.into_iter().next())
    }

    /// Insert or replace. Unique field violations fail with `AlreadyExists`.
    async fn save(&self, collection: &str, id: Uuid, doc: Value) -> Result<()>;

    /// Apply `update` only if the current document matches `guard`. `None` when the
    /// document is missing or the guard did not match.
    async fn find_by_id_and_update(&self, collection: &str, id: Uuid, guard: &Filter, update: &Update) -> Result<Option<Value>>;

    async fn find_by_id_and_delete(&self, collection: &str, id: Uuid) -> Result<Option<Value>>;

    /// Mutate a product's inventory record and stock mirror in one transaction.
    async fn adjust_stock(&self, product_id: Uuid, op: StockOp) -> Result<StockLevels>;
}

pub type SharedStore = Arc<dyn DocumentStore>;

/// Typed view of one collection.
pub struct Collection<D> {
    store: SharedStore,
    _doc: PhantomData<fn() -> D>,
}

impl<D> Clone for Collection<D> {
    fn clone(&self) -> Self { Self { store: self.store.clone(), _doc: PhantomData } }
}

impl<D: Document> Collection<D> {
    pub fn new(store: SharedStore) -> Self { Self { store, _doc: PhantomData } }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<D>> {
        self.store.find_by_id(D::COLLECTION, id).await?.map(decode).transpose()
    }

    /// Like `find_by_id`, but a missing document is `NotFound`.
    pub async fn get(&self, id: Uuid) -> Result<D> {
        self.find_by_id(id).await?.ok_or(EcommerceError::NotFound(D::NAME))
    }

    pub async fn find_one(&self, filter: &Filter) -> Result<Option<D>> {
        self.store.find_one(D::COLLECTION, filter).await?.map(decode).transpose()
    }

    pub async fn find(&self, filter: &Filter) -> Result<Vec<D>> {
        self.store.find(D::COLLECTION, filter).await?.into_iter().map(decode).collect()
    }

    pub async fn save(&self, doc: &D) -> Result<()> {
        self.store.save(D::COLLECTION, doc.id(), serde_json::to_value(doc)?).await
    }

    pub async fn find_by_id_and_update(&self, id: Uuid, guard: &Filter, update: &Update) -> Result<Option<D>> {
        self.store.find_by_id_and_update(D::COLLECTION, id, guard, update).await?.map(decode).transpose()
    }

    pub async fn find_by_id_and_delete(&self, id: Uuid) -> Result<Option<D>> {
        self.store.find_by_id_and_delete(D::COLLECTION, id).await?.map(decode).transpose()
    }
}

fn decode<D: DeserializeOwned>(value: Value) -> Result<D> {
    Ok(serde_json::from_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::collections::HashMap;

    #[test]
    fn test_filter_matches() {
        let doc = json!({"user": "u1", "status": "pending", "stock": 3});
        assert!(Filter::all().matches(&doc));
        assert!(Filter::all().eq("user", "u1").matches(&doc));
        assert!(!Filter::all().eq("user", "u2").matches(&doc));
        assert!(Filter::all().any_of("status", ["pending", "processed"]).matches(&doc));
        assert!(!Filter::all().any_of("status", ["shipped"]).matches(&doc));
        assert!(!Filter::all().eq("missing", 1).matches(&doc));
    }

    #[test]
    fn test_update_apply() {
        let mut doc = json!({"quantity": 5, "name": "x"});
        Update::new().set("name", "y").set("fresh", 4).apply(&mut doc).unwrap();
        assert_eq!(doc, json!({"quantity": 5, "name": "y", "fresh": 4}));
        assert!(Update::new().set("name", "z").apply(&mut json!([1])).is_err());
    }

    /// Maps with non-string keys have no JSON form.
    fn unencodable() -> HashMap<(i32, i32), i32> { HashMap::from([((1, 2), 3)]) }

    #[test]
    fn test_unencodable_values_surface() {
        let filter = Filter::all().eq("user", "u1").eq("shape", unencodable());
        assert!(matches!(filter.check(), Err(EcommerceError::Internal(_))));
        assert!(!filter.matches(&json!({"user": "u1", "shape": null})));
        assert!(Filter::all().any_of("shape", [unencodable()]).check().is_err());

        let update = Update::new().set("name", "y").set("shape", unencodable());
        assert!(!update.is_empty());
        let mut doc = json!({"name": "x"});
        assert!(matches!(update.apply(&mut doc), Err(EcommerceError::Internal(_))));
        assert_eq!(doc, json!({"name": "x"}));
    }

    #[test]
    fn test_check_unique() {
        let a = Uuid::now_v7();
        let b = Uuid::now_v7();
        let existing = json!({"username": "jane", "email": "jane@example.com"});
        let clash = json!({"username": "jane", "email": "other@example.com"});
        let rows = [(a, existing.clone())];
        let iter = || rows.iter().map(|(id, v)| (id, v));
        assert!(matches!(check_unique(USERS, b, &clash, iter()), Err(EcommerceError::AlreadyExists(_))));
        assert!(check_unique(USERS, a, &clash, iter()).is_ok());
        assert!(check_unique(PRODUCTS, b, &existing, iter()).is_ok());
    }
}
