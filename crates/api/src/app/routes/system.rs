use axum::{
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::context::PrincipalContext;

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(principal): Extension<PrincipalContext>) -> impl IntoResponse {
    Json(serde_json::json!({
        "userId": principal.user_id().as_str(),
        "email": principal.email(),
        "name": principal.display_name(),
        "admin": principal.is_admin(),
        "roles": principal.roles().iter().map(|r| r.as_str()).collect::<Vec<_>>(),
    }))
}
