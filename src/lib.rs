//! Shopkeep E-commerce Backend
//!
//! REST backend for a small storefront with a document-store persistence layer.
//!
//! ## Features
//! - Accounts with role-based access (admin, warehouse manager, delivery agent, user)
//! - Category and product catalog
//! - Inventory ledger kept in lockstep with product stock
//! - Order lifecycle with a role-gated status state machine

pub mod auth;
pub mod config;
pub mod domain;
pub mod http;
pub mod seed;
pub mod services;
pub mod store;

use thiserror::Error;
use uuid::Uuid;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum EcommerceError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Product not found: {0}")]
    ProductNotFound(Uuid),

    #[error("Insufficient stock for {product} (Stock: {available}, Requested: {requested})")]
    InsufficientStock {
        product: String,
        available: i64,
        requested: i64,
    },

    #[error("Insufficient inventory for {product} (Inventory: {available}, Requested: {requested})")]
    InsufficientInventory {
        product: String,
        available: i64,
        requested: i64,
    },

    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),

    #[error("Cannot return without request")]
    ReturnNotRequested,

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl EcommerceError {
    /// True for failures the caller cannot fix by changing the request.
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::Internal(_))
    }
}

impl From<sqlx::Error> for EcommerceError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &e {
            if db.is_unique_violation() {
                return Self::AlreadyExists(db.message().to_string());
            }
        }
        Self::Storage(e.to_string())
    }
}

impl From<sqlx::migrate::MigrateError> for EcommerceError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        Self::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for EcommerceError {
    fn from(e: serde_json::Error) -> Self {
        Self::Storage(format!("document encoding: {e}"))
    }
}

impl From<validator::ValidationErrors> for EcommerceError {
    fn from(e: validator::ValidationErrors) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for EcommerceError {
    fn from(e: jsonwebtoken::errors::Error) -> Self {
        Self::Unauthorized(format!("invalid token: {e}"))
    }
}

pub type Result<T> = std::result::Result<T, EcommerceError>;
