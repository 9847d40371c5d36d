//! Order lifecycle: checkout with stock checks, cancellation, returns and
//! role-gated status transitions, with the inventory side effects each implies.
//!
//! Orders and inventory are not updated in one transaction. An order is
//! persisted before its items are reserved; if a reservation then fails the
//! order stays and the failure is logged and returned.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use super::events::EventPublisher;
use super::inventory::InventoryLedger;
use crate::domain::aggregates::{LineItem, Order, OrderScope, OrderStatus, Product, User, UserProfile};
use crate::domain::value_objects::{Actor, Quantity};
use crate::store::{Collection, Filter, SharedStore, Update};
use crate::{EcommerceError, Result};

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct NewOrder {
    #[validate(length(min = 1, message = "order must contain at least one product"))]
    pub products: Vec<OrderLine>,
    pub total_amount: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLine {
    pub product: Uuid,
    pub quantity: i64,
}

/// Line item with its product populated. `productDetails` is null once the
/// product has been deleted.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemView {
    #[serde(flatten)]
    pub item: LineItem,
    pub product_details: Option<Product>,
}

/// Order as returned by reads: line-item products and the owner populated.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderView {
    #[serde(flatten)]
    pub order: Order,
    pub products: Vec<LineItemView>,
    pub user_details: Option<UserProfile>,
}

#[derive(Clone)]
pub struct OrderService {
    orders: Collection<Order>,
    products: Collection<Product>,
    users: Collection<User>,
    ledger: InventoryLedger,
    events: EventPublisher,
}

impl OrderService {
    pub fn new(store: SharedStore, ledger: InventoryLedger, events: EventPublisher) -> Self {
        Self {
            orders: Collection::new(store.clone()),
            products: Collection::new(store.clone()),
            users: Collection::new(store),
            ledger,
            events,
        }
    }

    pub async fn create_order(&self, actor: &Actor, input: NewOrder) -> Result<Order> {
        input.validate()?;
        let requested = merge_lines(&input.products)?;

        let mut items = Vec::with_capacity(requested.len());
        for (product_id, quantity) in requested {
            let product = self.products.find_by_id(product_id).await?
                .ok_or(EcommerceError::ProductNotFound(product_id))?;
            let wanted = quantity.as_i64();
            if product.stock < wanted {
                tracing::warn!(%product_id, stock = product.stock, wanted, "order rejected: insufficient stock");
                return Err(EcommerceError::InsufficientStock { product: product.name, available: product.stock, requested: wanted });
            }
            let inventory = self.ledger.ensure(&product).await?;
            if !inventory.covers(wanted) {
                tracing::warn!(%product_id, inventory = inventory.quantity, stock = product.stock, wanted, "order rejected: inventory drifted below stock");
                return Err(EcommerceError::InsufficientInventory { product: product.name, available: inventory.quantity, requested: wanted });
            }
            items.push(LineItem { product: product_id, quantity, unit_price: product.price });
        }

        let mut order = Order::place(actor.id, items, input.total_amount)?;
        self.orders.save(&order).await?;
        tracing::info!(order_id = %order.id, user_id = %actor.id, items = order.items.len(), "order placed");

        for item in &order.items {
            if let Err(e) = self.ledger.reserve(item.product, item.quantity.as_i64()).await {
                tracing::error!(order_id = %order.id, product_id = %item.product, error = %e, "reservation failed after order was persisted");
                return Err(e);
            }
        }
        self.events.publish(order.take_events()).await;
        Ok(order)
    }

    pub async fn cancel_order(&self, actor: &Actor, order_id: Uuid) -> Result<Order> {
        let mut order = self.orders.get(order_id).await?;
        let previous = order.status;
        order.cancel(actor)?;
        let mut order = self.persist_status(order, previous).await?;
        tracing::info!(order_id = %order.id, by = %actor.id, "order cancelled");
        self.restock(&order).await?;
        self.events.publish(order.take_events()).await;
        Ok(order)
    }

    pub async fn request_return(&self, actor: &Actor, order_id: Uuid) -> Result<Order> {
        let mut order = self.orders.get(order_id).await?;
        let previous = order.status;
        order.request_return(actor)?;
        let mut order = self.persist_status(order, previous).await?;
        tracing::info!(order_id = %order.id, "return requested");
        self.events.publish(order.take_events()).await;
        Ok(order)
    }

    pub async fn update_order_status(&self, actor: &Actor, order_id: Uuid, target: OrderStatus) -> Result<Order> {
        let mut order = self.orders.get(order_id).await?;
        let previous = order.status;
        let restocks = order.transition(actor.role, target)?;
        let mut order = self.persist_status(order, previous).await?;
        tracing::info!(order_id = %order.id, from = %previous, to = %target, role = %actor.role, "order status changed");
        if restocks {
            self.restock(&order).await?;
        }
        self.events.publish(order.take_events()).await;
        Ok(order)
    }

    pub async fn get_orders(&self, actor: &Actor) -> Result<Vec<OrderView>> {
        let filter = match OrderScope::for_actor(actor) {
            OrderScope::Owner(user) => Filter::all().eq("user", user),
            OrderScope::Statuses(statuses) => Filter::all().any_of("status", statuses.iter()),
            OrderScope::All => Filter::all(),
        };
        let orders = self.orders.find(&filter).await?;
        let mut products = HashMap::new();
        let mut users = HashMap::new();
        let mut views = Vec::with_capacity(orders.len());
        for order in orders {
            views.push(self.populate(order, &mut products, &mut users).await?);
        }
        Ok(views)
    }

    pub async fn get_order_by_id(&self, actor: &Actor, order_id: Uuid) -> Result<OrderView> {
        let order = self.orders.get(order_id).await?;
        order.ensure_readable_by(actor)?;
        self.populate(order, &mut HashMap::new(), &mut HashMap::new()).await
    }

    /// Attach products and owner. Lookups are cached across one listing.
    async fn populate(
        &self,
        order: Order,
        products: &mut HashMap<Uuid, Option<Product>>,
        users: &mut HashMap<Uuid, Option<UserProfile>>,
    ) -> Result<OrderView> {
        let mut lines = Vec::with_capacity(order.items.len());
        for item in &order.items {
            if !products.contains_key(&item.product) {
                let found = self.products.find_by_id(item.product).await?;
                products.insert(item.product, found);
            }
            let product_details = products.get(&item.product).cloned().flatten();
            lines.push(LineItemView { item: item.clone(), product_details });
        }
        if !users.contains_key(&order.user) {
            let found = self.users.find_by_id(order.user).await?.map(|u| u.profile());
            users.insert(order.user, found);
        }
        let user_details = users.get(&order.user).cloned().flatten();
        Ok(OrderView { order, products: lines, user_details })
    }

    /// Write the mutable fields of `order` only if its stored status is still
    /// `previous`. Raised events are carried over to the returned order.
    async fn persist_status(&self, mut order: Order, previous: OrderStatus) -> Result<Order> {
        let guard = Filter::all().eq("status", previous);
        let update = Update::new()
            .set("status", order.status)
            .set("returnRequest", order.return_request)
            .set("updatedAt", order.updated_at);
        let Some(mut stored) = self.orders.find_by_id_and_update(order.id, &guard, &update).await? else {
            tracing::warn!(order_id = %order.id, expected = %previous, "order changed concurrently");
            return Err(EcommerceError::Conflict(format!("order {} was modified concurrently", order.id)));
        };
        stored.carry_events(order.take_events());
        Ok(stored)
    }

    /// Put every line item back into stock. Products deleted since the order
    /// was placed are skipped.
    async fn restock(&self, order: &Order) -> Result<()> {
        for item in &order.items {
            match self.ledger.release(item.product, item.quantity.as_i64()).await {
                Ok(_) => {}
                Err(EcommerceError::ProductNotFound(product_id)) => {
                    tracing::warn!(order_id = %order.id, %product_id, "skipping restock of deleted product");
                }
                Err(e) => {
                    tracing::error!(order_id = %order.id, product_id = %item.product, error = %e, "restock failed");
                    return Err(e);
                }
            }
        }
        Ok(())
    }
}

/// One entry per product, in first-seen order, with repeated quantities summed.
fn merge_lines(lines: &[OrderLine]) -> Result<Vec<(Uuid, Quantity)>> {
    let mut merged: Vec<(Uuid, i64)> = Vec::with_capacity(lines.len());
    let mut index: HashMap<Uuid, usize> = HashMap::new();
    for line in lines {
        Quantity::new(line.quantity).map_err(|e| EcommerceError::Validation(e.to_string()))?;
        match index.get(&line.product) {
            Some(&i) => merged[i].1 += line.quantity,
            None => {
                index.insert(line.product, merged.len());
                merged.push((line.product, line.quantity));
            }
        }
    }
    merged
        .into_iter()
        .map(|(product, qty)| {
            Quantity::new(qty)
                .map(|q| (product, q))
                .map_err(|e| EcommerceError::Validation(e.to_string()))
        })
        .collect()
}
