//! Mapping of [`EcommerceError`] onto HTTP responses with a `{"msg": ...}` body.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::EcommerceError;

impl EcommerceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::InsufficientStock { .. }
            | Self::InsufficientInventory { .. }
            | Self::InvalidQuantity(_)
            | Self::AlreadyExists(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::AccessDenied(_) | Self::ReturnNotRequested => StatusCode::FORBIDDEN,
            Self::NotFound(_) | Self::ProductNotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::Storage(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for EcommerceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let msg = if self.is_server_error() {
            tracing::error!(error = %self, "request failed");
            "Server error".to_string()
        } else {
            self.to_string()
        };
        json_error(status, msg)
    }
}

pub fn json_error(status: StatusCode, msg: impl Into<String>) -> Response {
    (status, Json(json!({ "msg": msg.into() }))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let stock = EcommerceError::InsufficientStock { product: "Lamp".into(), available: 1, requested: 2 };
        assert_eq!(stock.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(EcommerceError::Unauthorized("No token".into()).status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(EcommerceError::ReturnNotRequested.status_code(), StatusCode::FORBIDDEN);
        assert_eq!(EcommerceError::ProductNotFound(Uuid::nil()).status_code(), StatusCode::NOT_FOUND);
        assert_eq!(EcommerceError::Conflict("x".into()).status_code(), StatusCode::CONFLICT);
    }

    #[test]
    fn test_server_errors_are_masked() {
        let response = EcommerceError::Storage("connection refused".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
