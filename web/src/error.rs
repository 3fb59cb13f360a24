use std::error::Error as StdError;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::*;
use serde_json::json;

use auth::error::{Error as AuthError, ErrorKind as AuthErrorKind};

/// Failure of a non-redirecting endpoint.
///
/// Only `/login` returns this; `/callback` always answers with a redirect.
#[derive(Debug)]
pub struct Error(AuthError);

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        Some(&self.0)
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> core::result::Result<(), std::fmt::Error> {
        write!(fmt, "{self:?}")
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self.0.error_kind {
            AuthErrorKind::Config => warn!("Login is not configured correctly: {:?}", self.0),
            AuthErrorKind::OAuth(_) | AuthErrorKind::Store(_) | AuthErrorKind::Http(_) => {
                error!("Azure login redirect error: {:?}", self.0)
            }
        }

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": "Failed to redirect to login" })),
        )
            .into_response()
    }
}

impl<E> From<E> for Error
where
    E: Into<AuthError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use auth::error::config_error;

    #[tokio::test]
    async fn test_error_renders_json_500() {
        let response = Error::from(config_error("missing host")).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body, json!({ "error": "Failed to redirect to login" }));
    }
}
