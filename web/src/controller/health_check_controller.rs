use axum::http::StatusCode;
use axum::response::IntoResponse;

/// GET liveness of the login service
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Login service is up and responding to requests", body = String),
    )
)]
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "healthy")
}
