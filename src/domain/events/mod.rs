//! Domain events
use crate::domain::aggregates::OrderStatus;
use serde::Serialize;
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "aggregate", rename_all = "snake_case")]
pub enum DomainEvent {
    Order(OrderEvent),
    Inventory(InventoryEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OrderEvent {
    Placed { order_id: Uuid, user_id: Uuid, items: usize },
    Cancelled { order_id: Uuid, by: Uuid },
    ReturnRequested { order_id: Uuid },
    StatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InventoryEvent {
    Reserved { product_id: Uuid, quantity: i64, remaining: i64 },
    Released { product_id: Uuid, quantity: i64, remaining: i64 },
    Set { product_id: Uuid, quantity: i64 },
}

impl DomainEvent {
    /// NATS subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Order(OrderEvent::Placed { .. }) => "commerce.order.placed",
            Self::Order(OrderEvent::Cancelled { .. }) => "commerce.order.cancelled",
            Self::Order(OrderEvent::ReturnRequested { .. }) => "commerce.order.return_requested",
            Self::Order(OrderEvent::StatusChanged { .. }) => "commerce.order.status_changed",
            Self::Inventory(InventoryEvent::Reserved { .. }) => "commerce.inventory.reserved",
            Self::Inventory(InventoryEvent::Released { .. }) => "commerce.inventory.released",
            Self::Inventory(InventoryEvent::Set { .. }) => "commerce.inventory.set",
        }
    }
}
