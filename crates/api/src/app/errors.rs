use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;
use tracing::error;

use shopfront_auth::AuthzError;
use shopfront_infra::{OrderError, ServiceError};

pub fn order_error_to_response(err: OrderError) -> axum::response::Response {
    match err {
        OrderError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        OrderError::NotFound(product_id) => json_error_with(
            StatusCode::NOT_FOUND,
            "product_not_found",
            format!("product {product_id} not found"),
            json!({ "productId": product_id.to_string() }),
        ),
        OrderError::InsufficientStock {
            product_id,
            requested,
            available,
        } => json_error_with(
            StatusCode::UNPROCESSABLE_ENTITY,
            "insufficient_stock",
            format!("insufficient stock for product {product_id}"),
            json!({
                "productId": product_id.to_string(),
                "requested": requested,
                "available": available,
            }),
        ),
        OrderError::Conflict(msg) => json_error_with(
            StatusCode::CONFLICT,
            "conflict",
            msg,
            json!({ "retryable": true }),
        ),
        OrderError::Store(e) => {
            error!(error = %e, "order placement failed in store");
            json_error_with(
                StatusCode::SERVICE_UNAVAILABLE,
                "store_unavailable",
                "order could not be placed, please retry",
                json!({ "retryable": true }),
            )
        }
    }
}

pub fn service_error_to_response(err: ServiceError) -> axum::response::Response {
    match err {
        ServiceError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        ServiceError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        ServiceError::NotFound(msg) => json_error(StatusCode::NOT_FOUND, "not_found", format!("{msg} not found")),
        ServiceError::Conflict(msg) => json_error_with(
            StatusCode::CONFLICT,
            "conflict",
            msg,
            json!({ "retryable": true }),
        ),
        ServiceError::Store(e) => {
            error!(error = %e, "store operation failed");
            json_error_with(
                StatusCode::SERVICE_UNAVAILABLE,
                "store_unavailable",
                "store unavailable, please retry",
                json!({ "retryable": true }),
            )
        }
    }
}

pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string())
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

/// Like [`json_error`], with extra top-level fields merged into the body.
pub fn json_error_with(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
    details: serde_json::Value,
) -> axum::response::Response {
    let mut body = json!({
        "error": code,
        "message": message.into(),
    });
    if let (Some(body), serde_json::Value::Object(details)) = (body.as_object_mut(), details) {
        body.extend(details);
    }
    (status, axum::Json(body)).into_response()
}
