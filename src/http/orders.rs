use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{Authenticated, Payload};
use super::ApiResult;
use crate::domain::aggregates::{Order, OrderStatus};
use crate::domain::value_objects::Role;
use crate::services::{NewOrder, OrderView, Services};

pub fn router() -> Router<Services> {
    Router::new()
        .route("/", get(list_orders).post(create_order))
        .route("/:id", get(get_order))
        .route("/:id/cancel", put(cancel_order))
        .route("/:id/return", put(request_return))
        .route("/:id/status", put(update_status))
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: String,
}

async fn create_order(
    State(services): State<Services>,
    Authenticated(actor): Authenticated,
    Payload(body): Payload<NewOrder>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    actor.require(&[Role::User])?;
    let order = services.orders.create_order(&actor, body).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

async fn list_orders(State(services): State<Services>, Authenticated(actor): Authenticated) -> ApiResult<Json<Vec<OrderView>>> {
    Ok(Json(services.orders.get_orders(&actor).await?))
}

async fn get_order(
    State(services): State<Services>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<OrderView>> {
    Ok(Json(services.orders.get_order_by_id(&actor, id).await?))
}

async fn cancel_order(
    State(services): State<Services>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Order>> {
    actor.require(&[Role::User, Role::WarehouseManager, Role::Admin])?;
    Ok(Json(services.orders.cancel_order(&actor, id).await?))
}

async fn request_return(
    State(services): State<Services>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Order>> {
    actor.require(&[Role::User, Role::DeliveryAgent])?;
    Ok(Json(services.orders.request_return(&actor, id).await?))
}

async fn update_status(
    State(services): State<Services>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
    Payload(body): Payload<StatusChange>,
) -> ApiResult<Json<Order>> {
    actor.require(&[Role::Admin, Role::WarehouseManager, Role::DeliveryAgent])?;
    let target: OrderStatus = body.status.parse()?;
    Ok(Json(services.orders.update_order_status(&actor, id, target).await?))
}
