//! Admin-only endpoints: order fulfilment and catalog maintenance.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
    Json, Router,
};

use shopfront_auth::Permission;
use shopfront_core::{OrderId, ProductId};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::authz::authorize_request;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/orders", get(list_orders))
        .route("/orders/:id/status", patch(update_order_status))
        .route("/products", post(create_product))
        .route("/products/:id", axum::routing::put(update_product).delete(delete_product))
}

fn bad_body(e: JsonRejection) -> axum::response::Response {
    errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.body_text())
}

pub async fn list_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &[Permission::ORDERS_READ_ALL]) {
        return errors::authz_error_to_response(e);
    }
    match services.all_orders().await {
        Ok(orders) => {
            let items = orders.iter().map(dto::order_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_order_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateOrderStatusRequest>, JsonRejection>,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &[Permission::ORDERS_UPDATE_STATUS]) {
        return errors::authz_error_to_response(e);
    }
    let order_id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"),
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return bad_body(e),
    };
    let status = match body.status() {
        Ok(s) => s,
        Err(resp) => return resp,
    };

    match services
        .update_order_status(order_id, status, body.tracking_number)
        .await
    {
        Ok(order) => (StatusCode::OK, Json(dto::order_to_json(&order))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn create_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::CreateProductRequest>, JsonRejection>,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &[Permission::PRODUCTS_WRITE]) {
        return errors::authz_error_to_response(e);
    }
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return bad_body(e),
    };
    let input = match body.into_new_product() {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match services.create_product(input).await {
        Ok(product) => (StatusCode::CREATED, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn update_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
    body: Result<Json<dto::UpdateProductRequest>, JsonRejection>,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &[Permission::PRODUCTS_WRITE]) {
        return errors::authz_error_to_response(e);
    }
    let product_id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"),
    };
    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return bad_body(e),
    };
    let patch = match body.into_patch() {
        Ok(p) => p,
        Err(resp) => return resp,
    };

    match services.update_product(product_id, patch).await {
        Ok(product) => (StatusCode::OK, Json(dto::product_to_json(&product))).into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}

pub async fn delete_product(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &[Permission::PRODUCTS_WRITE]) {
        return errors::authz_error_to_response(e);
    }
    let product_id: ProductId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid product id"),
    };

    match services.delete_product(product_id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => errors::service_error_to_response(e),
    }
}
