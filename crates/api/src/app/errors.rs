use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use stockwise_infra::{AdjustError, StoreError};

pub fn adjust_error_to_response(err: AdjustError) -> axum::response::Response {
    match err {
        AdjustError::InvalidInput(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        AdjustError::VariantNotFound(_) => {
            json_error(StatusCode::NOT_FOUND, "variant_not_found", err.to_string())
        }
        AdjustError::InventoryMetadataMissing(missing) => {
            json_error(StatusCode::NOT_FOUND, "inventory_not_found", missing.to_string())
        }
        AdjustError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        AdjustError::Timeout { .. } => json_error(StatusCode::GATEWAY_TIMEOUT, "timeout", err.to_string()),
        AdjustError::Store(e) => store_error_to_response(e),
    }
}

pub fn store_error_to_response(err: StoreError) -> axum::response::Response {
    match err {
        StoreError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
        StoreError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", msg),
        StoreError::Unavailable(_) => {
            tracing::error!(error = %err, "store unavailable");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_unavailable", err.to_string())
        }
        StoreError::Backend(_) => {
            tracing::error!(error = %err, "store failure");
            json_error(StatusCode::INTERNAL_SERVER_ERROR, "store_error", err.to_string())
        }
    }
}

pub fn body_rejection_to_response(rejection: JsonRejection) -> axum::response::Response {
    json_error(StatusCode::BAD_REQUEST, "invalid_body", rejection.body_text())
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
