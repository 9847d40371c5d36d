//! Inventory Aggregate
//!
//! One record per product. Every stock-affecting event goes through
//! [`apply_stock`], which mutates the inventory record and the product's
//! `stock` mirror together; the store runs it inside a single transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::aggregates::Product;
use crate::{EcommerceError, Result};

/// Upper bound for an absolute stock level.
pub const MAX_STOCK: i64 = 1_000_000_000;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inventory {
    pub id: Uuid,
    pub product: Uuid,
    pub quantity: i64,
    pub last_updated: DateTime<Utc>,
}

/// A stock mutation for one product.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "quantity", rename_all = "snake_case")]
pub enum StockOp {
    /// Take `n` units out for an order.
    Reserve(i64),
    /// Put `n` units back after a cancellation or return.
    Release(i64),
    /// Absolute set from an admin inventory or product-stock edit.
    Set(i64),
}

/// Product and inventory record after a stock mutation.
#[derive(Clone, Debug, PartialEq)]
pub struct StockLevels {
    pub product: Product,
    pub inventory: Inventory,
}

impl Inventory {
    /// Default get-or-create policy: a missing record starts from the product's current stock.
    pub fn seeded_from(product: &Product, now: DateTime<Utc>) -> Self {
        Self::with_quantity(product.id, product.stock, now)
    }

    pub fn with_quantity(product: Uuid, quantity: i64, now: DateTime<Utc>) -> Self {
        Self { id: Uuid::now_v7(), product, quantity, last_updated: now }
    }

    pub fn covers(&self, requested: i64) -> bool { self.quantity >= requested }
}

impl StockOp {
    fn validate(&self) -> Result<()> {
        match *self {
            Self::Reserve(n) | Self::Release(n) if n <= 0 => Err(EcommerceError::InvalidQuantity(n)),
            Self::Set(n) if !(0..=MAX_STOCK).contains(&n) => Err(EcommerceError::InvalidQuantity(n)),
            _ => Ok(()),
        }
    }

    /// Record to start from when the product has none yet.
    fn initial_record(&self, product: &Product, now: DateTime<Utc>) -> Inventory {
        match self {
            Self::Reserve(_) => Inventory::seeded_from(product, now),
            Self::Release(_) | Self::Set(_) => Inventory::with_quantity(product.id, 0, now),
        }
    }
}

/// Apply `op` to `product` and its inventory record (`existing`, or a lazily
/// created one). Rejections happen before anything is mutated.
pub fn apply_stock(op: StockOp, product: &mut Product, existing: Option<Inventory>, now: DateTime<Utc>) -> Result<Inventory> {
    op.validate()?;
    if let Some(inv) = &existing {
        if inv.product != product.id {
            return Err(EcommerceError::Internal(format!("inventory {} does not belong to product {}", inv.id, product.id)));
        }
    }
    let mut inventory = existing.unwrap_or_else(|| op.initial_record(product, now));

    let next = match op {
        StockOp::Reserve(n) => {
            if product.stock < n {
                return Err(EcommerceError::InsufficientStock { product: product.name.clone(), available: product.stock, requested: n });
            }
            if !inventory.covers(n) {
                return Err(EcommerceError::InsufficientInventory { product: product.name.clone(), available: inventory.quantity, requested: n });
            }
            (inventory.quantity - n, product.stock - n)
        }
        StockOp::Release(n) => match (inventory.quantity.checked_add(n), product.stock.checked_add(n)) {
            (Some(quantity), Some(stock)) => (quantity, stock),
            _ => return Err(EcommerceError::InvalidQuantity(n)),
        },
        StockOp::Set(n) => (n, n),
    };

    inventory.quantity = next.0;
    inventory.last_updated = now;
    product.stock = next.1;
    product.updated_at = now;
    Ok(inventory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;

    fn product(stock: i64) -> Product { Product::create("Widget", Decimal::new(10, 0), stock) }

    #[test]
    fn test_reserve_lazily_seeds_from_stock() {
        let mut p = product(10);
        let inv = apply_stock(StockOp::Reserve(4), &mut p, None, Utc::now()).unwrap();
        assert_eq!(inv.product, p.id);
        assert_eq!(inv.quantity, 6);
        assert_eq!(p.stock, 6);
    }

    #[test]
    fn test_release_creates_empty_record_then_adds() {
        let mut p = product(2);
        let inv = apply_stock(StockOp::Release(3), &mut p, None, Utc::now()).unwrap();
        assert_eq!(inv.quantity, 3);
        assert_eq!(p.stock, 5);
    }

    #[test]
    fn test_reserve_rejects_before_mutation() {
        let mut p = product(3);
        let existing = Inventory::with_quantity(p.id, 3, Utc::now());
        let err = apply_stock(StockOp::Reserve(5), &mut p, Some(existing), Utc::now()).unwrap_err();
        assert!(matches!(err, EcommerceError::InsufficientStock { available: 3, requested: 5, .. }));
        assert_eq!(p.stock, 3);
    }

    #[test]
    fn test_inventory_checked_independently_of_stock() {
        let mut p = product(10);
        let drifted = Inventory::with_quantity(p.id, 2, Utc::now());
        let err = apply_stock(StockOp::Reserve(5), &mut p, Some(drifted), Utc::now()).unwrap_err();
        assert!(matches!(err, EcommerceError::InsufficientInventory { available: 2, requested: 5, .. }));
        assert_eq!(p.stock, 10);
    }

    #[test]
    fn test_set_is_absolute_and_syncs_stock() {
        let mut p = product(10);
        let existing = Inventory::with_quantity(p.id, 7, Utc::now());
        let inv = apply_stock(StockOp::Set(42), &mut p, Some(existing), Utc::now()).unwrap();
        assert_eq!((inv.quantity, p.stock), (42, 42));
        assert!(matches!(apply_stock(StockOp::Set(-1), &mut p, Some(inv), Utc::now()), Err(EcommerceError::InvalidQuantity(-1))));
    }

    #[test]
    fn test_non_positive_adjustments_rejected() {
        let mut p = product(10);
        assert!(matches!(apply_stock(StockOp::Reserve(0), &mut p, None, Utc::now()), Err(EcommerceError::InvalidQuantity(0))));
        assert!(matches!(apply_stock(StockOp::Release(-3), &mut p, None, Utc::now()), Err(EcommerceError::InvalidQuantity(-3))));
    }

    #[test]
    fn test_set_above_cap_rejected() {
        let mut p = product(1);
        assert!(matches!(apply_stock(StockOp::Set(MAX_STOCK + 1), &mut p, None, Utc::now()), Err(EcommerceError::InvalidQuantity(_))));
        assert!(apply_stock(StockOp::Set(MAX_STOCK), &mut p, None, Utc::now()).is_ok());
    }

    #[test]
    fn test_release_overflow_rejected_before_mutation() {
        let mut p = product(i64::MAX - 1);
        let full = Inventory::with_quantity(p.id, i64::MAX - 1, Utc::now());
        let err = apply_stock(StockOp::Release(5), &mut p, Some(full), Utc::now()).unwrap_err();
        assert!(matches!(err, EcommerceError::InvalidQuantity(5)));
        assert_eq!(p.stock, i64::MAX - 1);
    }

    #[test]
    fn test_foreign_record_rejected() {
        let mut p = product(10);
        let other = Inventory::with_quantity(Uuid::now_v7(), 10, Utc::now());
        assert!(matches!(apply_stock(StockOp::Reserve(1), &mut p, Some(other), Utc::now()), Err(EcommerceError::Internal(_))));
    }

    proptest! {
        #[test]
        fn reserve_then_release_restores_levels(start in 0i64..10_000, n in 1i64..10_000) {
            let mut p = product(start);
            let inv = Inventory::with_quantity(p.id, start, Utc::now());
            match apply_stock(StockOp::Reserve(n), &mut p, Some(inv.clone()), Utc::now()) {
                Ok(reserved) => {
                    prop_assert_eq!(reserved.quantity, start - n);
                    prop_assert!(reserved.quantity >= 0);
                    let restored = apply_stock(StockOp::Release(n), &mut p, Some(reserved), Utc::now()).unwrap();
                    prop_assert_eq!(restored.quantity, start);
                    prop_assert_eq!(p.stock, start);
                }
                Err(_) => {
                    prop_assert!(n > start);
                    prop_assert_eq!(p.stock, start);
                }
            }
        }
    }
}
