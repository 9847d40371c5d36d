//! Request extractors that fail with [`EcommerceError`] instead of axum's
//! plain-text rejections.

use axum::extract::{FromRequest, FromRequestParts, Request};
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::Json;
use serde::de::DeserializeOwned;

use crate::domain::value_objects::Actor;
use crate::services::Services;
use crate::EcommerceError;

/// Caller resolved from the `Authorization: Bearer` header.
#[derive(Debug, Clone, Copy)]
pub struct Authenticated(pub Actor);

fn bearer(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    Some(value.strip_prefix("Bearer ").unwrap_or(value).trim())
}

#[axum::async_trait]
impl FromRequestParts<Services> for Authenticated {
    type Rejection = EcommerceError;

    async fn from_request_parts(parts: &mut Parts, services: &Services) -> Result<Self, Self::Rejection> {
        services.gate.authenticate(bearer(&parts.headers)).await.map(Self)
    }
}

/// JSON body; malformed input is a validation failure.
#[derive(Debug, Clone)]
pub struct Payload<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for Payload<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = EcommerceError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| EcommerceError::Validation(e.body_text()))?;
        Ok(Self(value))
    }
}
