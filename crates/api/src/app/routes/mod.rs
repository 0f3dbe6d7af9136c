use axum::Router;

pub mod inventory;
pub mod products;
pub mod store;
pub mod system;

/// Router for the catalog and stock endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/inventory", inventory::router())
        .nest("/products", products::router())
        .nest("/store", store::router())
}
