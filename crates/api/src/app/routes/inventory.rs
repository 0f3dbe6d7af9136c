use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};
use serde_json::{json, Value as JsonValue};

use stockwise_core::ProductId;
use stockwise_infra::EMPTY_BATCH_MESSAGE;
use stockwise_inventory::RawAdjustment;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_inventory).post(adjust_stock))
        .route("/batch", put(adjust_stock_batch))
        .route("/:id", get(get_product_inventory))
}

/// Every variant with its aggregated stock.
pub async fn list_inventory(Extension(services): Extension<Arc<AppServices>>) -> axum::response::Response {
    let entries = match services.list_variants().await {
        Ok(entries) => entries,
        Err(e) => return errors::store_error_to_response(e),
    };

    let inventory: Vec<dto::InventoryRow> = entries.iter().map(dto::inventory_row).collect();
    (
        StatusCode::OK,
        Json(json!({
            "count": inventory.len(),
            "inventory": inventory,
        })),
    )
        .into_response()
}

/// Stock of one product, broken down by variant and inventory record.
pub async fn get_product_inventory(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let product_id = match ProductId::parse(id) {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "product id is required"),
    };

    match services.find_product(&product_id).await {
        Ok(Some(product)) => (StatusCode::OK, Json(dto::product_inventory_view(&product))).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "product not found"),
        Err(e) => errors::store_error_to_response(e),
    }
}

pub async fn adjust_stock(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<RawAdjustment>, JsonRejection>,
) -> axum::response::Response {
    let Json(raw) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::body_rejection_to_response(rejection),
    };

    match services.adjust(&raw).await {
        Ok(outcome) => (StatusCode::OK, Json(dto::adjustment_to_json(&outcome))).into_response(),
        Err(e) => errors::adjust_error_to_response(e),
    }
}

pub async fn adjust_stock_batch(
    Extension(services): Extension<Arc<AppServices>>,
    body: Result<Json<JsonValue>, JsonRejection>,
) -> axum::response::Response {
    let Json(body) = match body {
        Ok(body) => body,
        Err(rejection) => return errors::body_rejection_to_response(rejection),
    };

    let Some(items) = dto::batch_items(&body) else {
        return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", EMPTY_BATCH_MESSAGE);
    };

    match services.adjust_batch(&items).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => errors::adjust_error_to_response(e),
    }
}
