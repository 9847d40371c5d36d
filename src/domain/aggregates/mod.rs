//! Aggregates module
pub mod category;
pub mod inventory;
pub mod order;
pub mod product;
pub mod user;

pub use category::Category;
pub use inventory::{Inventory, StockLevels, StockOp, MAX_STOCK};
pub use order::{LineItem, Order, OrderScope, OrderStatus, TransitionRule};
pub use product::Product;
pub use user::{User, UserProfile};
