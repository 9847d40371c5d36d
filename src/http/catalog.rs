use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{Authenticated, Payload};
use super::ApiResult;
use crate::domain::aggregates::{Category, Product};
use crate::domain::value_objects::Role;
use crate::services::{CategoryInput, NewProduct, ProductChanges, Services};

const EDITORS: &[Role] = &[Role::Admin, Role::WarehouseManager];

pub fn categories() -> Router<Services> {
    Router::new()
        .route("/", get(list_categories).post(create_category))
        .route("/:id", get(get_category).put(update_category).delete(delete_category))
}

pub fn products() -> Router<Services> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/:id", get(get_product).put(update_product).delete(delete_product))
}

// -- categories -------------------------------------------------------------

async fn create_category(
    State(services): State<Services>,
    Authenticated(actor): Authenticated,
    Payload(body): Payload<CategoryInput>,
) -> ApiResult<(StatusCode, Json<Category>)> {
    actor.require(EDITORS)?;
    Ok((StatusCode::CREATED, Json(services.catalog.create_category(body).await?)))
}

async fn list_categories(State(services): State<Services>) -> ApiResult<Json<Vec<Category>>> {
    Ok(Json(services.catalog.list_categories().await?))
}

async fn get_category(State(services): State<Services>, Path(id): Path<Uuid>) -> ApiResult<Json<Category>> {
    Ok(Json(services.catalog.get_category(id).await?))
}

async fn update_category(
    State(services): State<Services>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
    Payload(body): Payload<CategoryInput>,
) -> ApiResult<Json<Category>> {
    actor.require(EDITORS)?;
    Ok(Json(services.catalog.update_category(id, body).await?))
}

async fn delete_category(
    State(services): State<Services>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Category>> {
    actor.require(EDITORS)?;
    Ok(Json(services.catalog.delete_category(id).await?))
}

// -- products ---------------------------------------------------------------

#[derive(Debug, Default, Deserialize)]
pub struct ProductQuery {
    pub category: Option<Uuid>,
}

async fn create_product(
    State(services): State<Services>,
    Authenticated(actor): Authenticated,
    Payload(body): Payload<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    actor.require(EDITORS)?;
    Ok((StatusCode::CREATED, Json(services.catalog.create_product(body).await?)))
}

async fn list_products(State(services): State<Services>, Query(query): Query<ProductQuery>) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(services.catalog.list_products(query.category).await?))
}

async fn get_product(State(services): State<Services>, Path(id): Path<Uuid>) -> ApiResult<Json<Product>> {
    Ok(Json(services.catalog.get_product(id).await?))
}

async fn update_product(
    State(services): State<Services>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
    Payload(body): Payload<ProductChanges>,
) -> ApiResult<Json<Product>> {
    actor.require(EDITORS)?;
    Ok(Json(services.catalog.update_product(id, body).await?))
}

async fn delete_product(
    State(services): State<Services>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Product>> {
    actor.require(EDITORS)?;
    Ok(Json(services.catalog.delete_product(id).await?))
}
