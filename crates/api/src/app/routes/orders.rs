use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use shopfront_auth::Permission;
use shopfront_core::{OrderId, UserId};

use crate::app::{dto, errors};
use crate::app::services::AppServices;
use crate::authz::authorize_request;
use crate::context::PrincipalContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(place_order))
        .route("/my-orders", get(my_orders))
        .route("/:id", get(get_order))
}

pub async fn place_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    body: Result<Json<dto::PlaceOrderRequest>, JsonRejection>,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &[Permission::ORDERS_CREATE]) {
        return errors::authz_error_to_response(e);
    }

    let Json(body) = match body {
        Ok(b) => b,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.body_text()),
    };

    let user_id = match body.user_id.as_deref() {
        None => principal.user_id().clone(),
        Some(requested) if requested == principal.user_id().as_str() => principal.user_id().clone(),
        Some(requested) => {
            if let Err(e) = authorize_request(&principal, &[Permission::ORDERS_CREATE_FOR_OTHERS]) {
                return errors::authz_error_to_response(e);
            }
            match UserId::new(requested) {
                Ok(u) => u,
                Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "validation_error", e.to_string()),
            }
        }
    };

    let cmd = match body.into_command(user_id) {
        Ok(c) => c,
        Err(resp) => return resp,
    };

    match services.place_order(cmd).await {
        Ok(order) => (StatusCode::CREATED, Json(dto::order_to_json(&order))).into_response(),
        Err(e) => errors::order_error_to_response(e),
    }
}

pub async fn my_orders(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> axum::response::Response {
    if let Err(e) = authorize_request(&principal, &[Permission::ORDERS_READ_OWN]) {
        return errors::authz_error_to_response(e);
    }
    match services.orders_for_user(principal.user_id()).await {
        Ok(orders) => {
            let items = orders.iter().map(dto::order_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::service_error_to_response(e),
    }
}

/// Owners and admins see the order; everyone else gets the same 404 as for a
/// missing order.
pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    let order_id: OrderId = match id.parse() {
        Ok(v) => v,
        Err(_) => return errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", "invalid order id"),
    };

    let order = match services.order(order_id).await {
        Ok(o) => o,
        Err(e) => return errors::service_error_to_response(e),
    };

    let visible = order.is_owned_by(principal.user_id())
        || authorize_request(&principal, &[Permission::ORDERS_READ_ALL]).is_ok();
    if !visible {
        return errors::json_error(StatusCode::NOT_FOUND, "not_found", format!("order {order_id} not found"));
    }

    (StatusCode::OK, Json(dto::order_to_json(&order))).into_response()
}
