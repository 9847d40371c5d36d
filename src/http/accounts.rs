use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use uuid::Uuid;

use super::extract::{Authenticated, Payload};
use super::ApiResult;
use crate::domain::aggregates::UserProfile;
use crate::domain::value_objects::Role;
use crate::services::{AuthToken, Credentials, NewAccount, Services, UserChanges};

pub fn auth() -> Router<Services> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
}

pub fn users() -> Router<Services> {
    Router::new()
        .route("/", get(list_users))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
        .route("/:id/role", put(change_role))
        .route("/username/:username", get(get_by_username))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleChange {
    pub role_name: String,
}

async fn register(State(services): State<Services>, Payload(body): Payload<NewAccount>) -> ApiResult<(StatusCode, Json<AuthToken>)> {
    Ok((StatusCode::CREATED, Json(services.accounts.register(body).await?)))
}

async fn login(State(services): State<Services>, Payload(body): Payload<Credentials>) -> ApiResult<Json<AuthToken>> {
    Ok(Json(services.accounts.login(body).await?))
}

async fn list_users(State(services): State<Services>, Authenticated(actor): Authenticated) -> ApiResult<Json<Vec<UserProfile>>> {
    actor.require(&[Role::Admin])?;
    Ok(Json(services.accounts.list_users().await?))
}

async fn get_user(
    State(services): State<Services>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(services.accounts.get_user(&actor, id).await?))
}

async fn get_by_username(
    State(services): State<Services>,
    Authenticated(_actor): Authenticated,
    Path(username): Path<String>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(services.accounts.get_by_username(&username).await?.profile()))
}

async fn update_user(
    State(services): State<Services>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
    Payload(body): Payload<UserChanges>,
) -> ApiResult<Json<UserProfile>> {
    Ok(Json(services.accounts.update_user(&actor, id, body).await?))
}

async fn delete_user(
    State(services): State<Services>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<UserProfile>> {
    actor.require(&[Role::Admin])?;
    Ok(Json(services.accounts.delete_user(id).await?))
}

async fn change_role(
    State(services): State<Services>,
    Authenticated(actor): Authenticated,
    Path(id): Path<Uuid>,
    Payload(body): Payload<RoleChange>,
) -> ApiResult<Json<UserProfile>> {
    actor.require(&[Role::Admin])?;
    Ok(Json(services.accounts.change_role(id, &body.role_name).await?))
}
