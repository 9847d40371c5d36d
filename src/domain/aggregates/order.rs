//! Order Aggregate
//!
//! Status state machine. Which role may move an order between which statuses
//! is fixed by [`TransitionRule::for_role`]; stock side effects are returned to
//! the caller rather than performed here.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::value_objects::{Actor, Quantity, Role};
use crate::{EcommerceError, Result};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    #[default]
    Pending,
    Processed,
    Shipped,
    Delivered,
    Returned,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 6] = [
        OrderStatus::Pending, OrderStatus::Processed, OrderStatus::Shipped,
        OrderStatus::Delivered, OrderStatus::Returned, OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Processed => "processed",
            Self::Shipped => "shipped",
            Self::Delivered => "delivered",
            Self::Returned => "returned",
            Self::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for OrderStatus {
    type Err = EcommerceError;
    fn from_str(s: &str) -> Result<Self> {
        OrderStatus::ALL
            .into_iter()
            .find(|st| st.as_str() == s)
            .ok_or_else(|| EcommerceError::Validation(format!("unknown order status '{s}'")))
    }
}

/// Statuses a role may move an order out of, and into.
#[derive(Debug, PartialEq, Eq)]
pub struct TransitionRule {
    pub from: &'static [OrderStatus],
    pub to: &'static [OrderStatus],
}

use OrderStatus::*;

static WAREHOUSE_MANAGER_RULE: TransitionRule = TransitionRule { from: &[Pending], to: &[Processed, Cancelled] };
static DELIVERY_AGENT_RULE: TransitionRule = TransitionRule { from: &[Processed, Shipped], to: &[Delivered, Returned] };
static ADMIN_RULE: TransitionRule = TransitionRule { from: &OrderStatus::ALL, to: &OrderStatus::ALL };

impl TransitionRule {
    pub fn for_role(role: Role) -> Option<&'static TransitionRule> {
        match role {
            Role::Admin => Some(&ADMIN_RULE),
            Role::WarehouseManager => Some(&WAREHOUSE_MANAGER_RULE),
            Role::DeliveryAgent => Some(&DELIVERY_AGENT_RULE),
            Role::User => None,
        }
    }

    pub fn permits(&self, from: OrderStatus, to: OrderStatus) -> bool {
        self.from.contains(&from) && self.to.contains(&to)
    }
}

/// Which orders a role may list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OrderScope {
    Owner(Uuid),
    Statuses(&'static [OrderStatus]),
    All,
}

impl OrderScope {
    pub fn for_actor(actor: &Actor) -> Self {
        match actor.role {
            Role::User => Self::Owner(actor.id),
            Role::WarehouseManager => Self::Statuses(&[Pending, Processed]),
            Role::DeliveryAgent => Self::Statuses(&[Processed, Shipped]),
            Role::Admin => Self::All,
        }
    }

    pub fn includes(&self, order: &Order) -> bool {
        match self {
            Self::Owner(id) => order.user == *id,
            Self::Statuses(statuses) => statuses.contains(&order.status),
            Self::All => true,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product: Uuid,
    pub quantity: Quantity,
    /// Product price when the order was placed.
    pub unit_price: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: Uuid,
    pub user: Uuid,
    pub items: Vec<LineItem>,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub return_request: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

impl PartialEq for Order {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.user == other.user && self.items == other.items
            && self.total_amount == other.total_amount && self.status == other.status
            && self.return_request == other.return_request
    }
}

impl Order {
    /// New `pending` order. Stock checks are the caller's job; this only validates shape.
    pub fn place(user: Uuid, items: Vec<LineItem>, total_amount: Decimal) -> Result<Self> {
        if items.is_empty() {
            return Err(EcommerceError::Validation("order must contain at least one product".into()));
        }
        if total_amount <= Decimal::ZERO {
            return Err(EcommerceError::Validation("totalAmount must be positive".into()));
        }
        let now = Utc::now();
        let mut order = Self {
            id: Uuid::now_v7(), user, items, total_amount, status: Pending, return_request: false,
            created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Placed { order_id: order.id, user_id: user, items: order.items.len() }));
        Ok(order)
    }

    pub fn is_owned_by(&self, actor: &Actor) -> bool { self.user == actor.id }

    pub fn ensure_readable_by(&self, actor: &Actor) -> Result<()> {
        if actor.is(Role::Admin) || self.is_owned_by(actor) { Ok(()) }
        else { Err(EcommerceError::AccessDenied("order belongs to another user".into())) }
    }

    /// Cancel a pending order. Owners may cancel their own; warehouse managers and admins any.
    /// The caller must release every line item afterwards.
    pub fn cancel(&mut self, actor: &Actor) -> Result<()> {
        let allowed = match actor.role {
            Role::User => self.is_owned_by(actor),
            Role::WarehouseManager | Role::Admin => true,
            Role::DeliveryAgent => false,
        };
        if !allowed {
            return Err(EcommerceError::AccessDenied(format!("{} may not cancel this order", actor.role)));
        }
        if self.status != Pending {
            return Err(EcommerceError::AccessDenied(format!("cannot cancel a {} order", self.status)));
        }
        self.status = Cancelled;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::Cancelled { order_id: self.id, by: actor.id }));
        Ok(())
    }

    pub fn request_return(&mut self, actor: &Actor) -> Result<()> {
        if !actor.is(Role::User) || !self.is_owned_by(actor) || self.status != Delivered {
            return Err(EcommerceError::AccessDenied("cannot request return".into()));
        }
        self.return_request = true;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::ReturnRequested { order_id: self.id }));
        Ok(())
    }

    /// Move to `target` under the role's transition rule. Returns true when the
    /// transition restocks the line items (a return).
    pub fn transition(&mut self, role: Role, target: OrderStatus) -> Result<bool> {
        let rule = TransitionRule::for_role(role)
            .ok_or_else(|| EcommerceError::AccessDenied(format!("{role} may not change order status")))?;
        if !rule.permits(self.status, target) {
            return Err(EcommerceError::AccessDenied(format!("{role} may not move an order from {} to {target}", self.status)));
        }
        if self.status == target {
            return Err(EcommerceError::AccessDenied(format!("order is already {target}")));
        }
        if target == Returned && !self.return_request {
            return Err(EcommerceError::ReturnNotRequested);
        }
        let from = self.status;
        self.status = target;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, from, to: target }));
        Ok(target == Returned)
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    /// Re-attach events taken from another copy of this order.
    pub fn carry_events(&mut self, events: Vec<DomainEvent>) { self.events.extend(events); }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}
