use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{Authenticated, Payload};
use super::ApiResult;
use crate::domain::aggregates::Inventory;
use crate::domain::value_objects::Role;
use crate::services::{InventoryView, Services};

const STAFF: &[Role] = &[Role::Admin, Role::WarehouseManager];

pub fn router() -> Router<Services> {
    Router::new()
        .route("/", get(list_inventory).put(set_inventory))
        .route("/:product_id", get(get_inventory))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetInventory {
    pub product_id: Uuid,
    pub quantity: i64,
}

async fn set_inventory(
    State(services): State<Services>,
    Authenticated(actor): Authenticated,
    Payload(body): Payload<SetInventory>,
) -> ApiResult<Json<Inventory>> {
    actor.require(STAFF)?;
    Ok(Json(services.ledger.set_quantity(body.product_id, body.quantity).await?))
}

async fn list_inventory(State(services): State<Services>, Authenticated(actor): Authenticated) -> ApiResult<Json<Vec<InventoryView>>> {
    actor.require(STAFF)?;
    Ok(Json(services.ledger.list().await?))
}

async fn get_inventory(
    State(services): State<Services>,
    Authenticated(actor): Authenticated,
    Path(product_id): Path<Uuid>,
) -> ApiResult<Json<InventoryView>> {
    actor.require(STAFF)?;
    Ok(Json(services.ledger.get_by_product(product_id).await?))
}
