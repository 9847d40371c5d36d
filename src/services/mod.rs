//! Application services: each operation runs to completion against the store
//! and returns a typed failure on any rule violation.

pub mod accounts;
pub mod catalog;
pub mod events;
pub mod inventory;
pub mod orders;

pub use accounts::{AccountService, AuthToken, Credentials, NewAccount, UserChanges};
pub use catalog::{CatalogService, CategoryInput, NewProduct, ProductChanges};
pub use events::EventPublisher;
pub use inventory::{InventoryLedger, InventoryView};
pub use orders::{LineItemView, NewOrder, OrderLine, OrderService, OrderView};

use crate::auth::{AccessGate, TokenService};
use crate::store::SharedStore;

/// Everything a request handler needs, cheap to clone.
#[derive(Clone)]
pub struct Services {
    pub gate: AccessGate,
    pub accounts: AccountService,
    pub catalog: CatalogService,
    pub ledger: InventoryLedger,
    pub orders: OrderService,
}

impl Services {
    pub fn new(store: SharedStore, tokens: TokenService, events: EventPublisher) -> Self {
        let ledger = InventoryLedger::new(store.clone(), events.clone());
        Self {
            gate: AccessGate::new(tokens.clone(), store.clone()),
            accounts: AccountService::new(store.clone(), tokens),
            catalog: CatalogService::new(store.clone(), ledger.clone()),
            orders: OrderService::new(store, ledger.clone(), events),
            ledger,
        }
    }
}
