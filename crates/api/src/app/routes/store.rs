use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;

use stockwise_core::SellerId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};

pub fn router() -> Router {
    Router::new().route("/:id", get(list_store_products))
}

/// Published products of one seller, with stock and normalized prices.
pub async fn list_store_products(
    Extension(services): Extension<Arc<AppServices>>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let seller = match SellerId::parse(id) {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "store id is required"),
    };

    let catalog = match services.list_products().await {
        Ok(products) => products,
        Err(e) => return errors::store_error_to_response(e),
    };

    let products: Vec<dto::StoreProductView> = catalog
        .iter()
        .filter(|p| p.listed_by(&seller))
        .map(dto::store_product_view)
        .collect();
    tracing::info!(store_id = %seller, listed = products.len(), scanned = catalog.len(), "store products listed");

    (
        StatusCode::OK,
        Json(json!({
            "products": products,
            "count": products.len(),
            "store_id": seller.as_str(),
        })),
    )
        .into_response()
}
