//! REST surface. Handlers authenticate through [`extract::Authenticated`],
//! apply the route's role allow-list, then call into [`Services`].

pub mod accounts;
pub mod catalog;
pub mod error;
pub mod extract;
pub mod inventory;
pub mod orders;

use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::services::Services;
use crate::EcommerceError;

pub type ApiResult<T> = std::result::Result<T, EcommerceError>;

pub fn router(services: Services) -> Router {
    let api = Router::new()
        .nest("/auth", accounts::auth())
        .nest("/users", accounts::users())
        .nest("/categories", catalog::categories())
        .nest("/products", catalog::products())
        .nest("/inventory", inventory::router())
        .nest("/orders", orders::router());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(services)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "healthy", "service": "shopkeep" }))
}
