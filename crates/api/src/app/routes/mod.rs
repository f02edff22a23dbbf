use axum::{Router, routing::get};

pub mod admin;
pub mod orders;
pub mod products;
pub mod system;

/// Storefront endpoints that need no token.
pub fn public_router() -> Router {
    Router::new().nest("/products", products::router())
}

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .nest("/orders", orders::router())
        .nest("/admin", admin::router())
}
