use crate::controller::{azure_auth_controller, health_check_controller};
use crate::AppState;
use axum::{routing::get, Router};
use tower_cookies::CookieManagerLayer;

use utoipa::OpenApi;
use utoipa_rapidoc::RapiDoc;

// This is the global definition of our OpenAPI spec. To be a part
// of the rendered spec, a path and schema must be listed here.
#[derive(OpenApi)]
#[openapi(
        info(
            title = "Azure Login API"
        ),
        paths(
            azure_auth_controller::login,
            azure_auth_controller::callback,
            health_check_controller::health_check,
        ),
        tags(
            (name = "azure_login", description = "Azure AD sign-in with Authorization Code + PKCE")
        )
    )]
struct ApiDoc;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(azure_auth_routes(app_state))
        .merge(health_routes())
        // FIXME: protect the OpenAPI web UI
        .merge(RapiDoc::with_openapi("/api-docs/openapi.json", ApiDoc::openapi()).path("/rapidoc"))
        .layer(CookieManagerLayer::new())
}

fn azure_auth_routes(app_state: AppState) -> Router {
    Router::new()
        .route("/login", get(azure_auth_controller::login))
        .route(
            azure_auth_controller::CALLBACK_PATH,
            get(azure_auth_controller::callback),
        )
        .with_state(app_state)
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}
