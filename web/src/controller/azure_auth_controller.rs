//! Controller for the Azure AD login flow.
//!
//! Both endpoints are reached by top-level browser navigation, so they answer with
//! redirects. `/callback` never answers with anything else: every failure becomes a
//! redirect to `/?error=<code>`.

use crate::cookie_store::{issue_session_cookies, CookieStore};
use crate::params::azure_auth::{callback_params, LoginParams};
use crate::{AppState, Error};

use auth::error::config_error;
use auth::login::{self as login_flow, CallbackError, Completion};
use axum::extract::{Query, RawQuery, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use log::*;
use service::config::Config;
use tower_cookies::Cookies;
use url::{Position, Url};

/// Path the identity provider redirects back to; part of the registered redirect URI.
pub const CALLBACK_PATH: &str = "/callback";

/// Origin used only to resolve relative redirect targets; never sent to the browser.
const RESOLVE_BASE: &str = "http://localhost";

/// `location` as a header value: absolute URLs as serialized by `url`, relative
/// targets resolved the way a browser would, percent-encoded and kept as a path
/// on the current origin.
fn location_value(location: &str) -> Option<HeaderValue> {
    let serialized = match Url::parse(location) {
        Ok(url) => url.to_string(),
        Err(_) => {
            let url = Url::parse(RESOLVE_BASE).ok()?.join(location).ok()?;
            url[Position::BeforePath..].to_string()
        }
    };
    HeaderValue::from_str(&serialized).ok()
}

/// `302 Found` to `location`, falling back to the generic callback error page when
/// `location` cannot be carried in a header.
fn found(location: &str) -> Response {
    let location = location_value(location).unwrap_or_else(|| {
        warn!("Redirect target is not a valid header value: {location:?}");
        HeaderValue::from_static("/?error=callback_error")
    });
    (StatusCode::FOUND, [(header::LOCATION, location)]).into_response()
}

fn error_redirect(error: CallbackError) -> Response {
    found(&format!("/?error={}", error.code()))
}

/// The host the browser used for this request.
fn request_host<'a>(headers: &'a HeaderMap, uri: &'a Uri) -> Option<&'a str> {
    headers
        .get(header::HOST)
        .and_then(|host| host.to_str().ok())
        .or_else(|| uri.authority().map(|authority| authority.as_str()))
        .filter(|host| !host.is_empty())
}

/// The OAuth redirect URI for this request: configured scheme, request host, callback path.
///
/// `/login` and `/callback` both derive it this way, so the token exchange repeats
/// the exact value sent in the authorization request.
fn redirect_uri(config: &Config, headers: &HeaderMap, uri: &Uri) -> Option<String> {
    request_host(headers, uri)
        .map(|host| format!("{}://{}{}", config.redirect_scheme(), host, CALLBACK_PATH))
}

/// GET /login
///
/// Starts the Authorization Code + PKCE flow by redirecting to Azure AD.
#[utoipa::path(
    get,
    path = "/login",
    params(LoginParams),
    responses(
        (status = 302, description = "Redirect to the Azure AD authorize endpoint"),
        (status = 500, description = "Failed to redirect to login"),
    )
)]
pub async fn login(
    State(app_state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    uri: Uri,
    Query(params): Query<LoginParams>,
) -> Result<impl IntoResponse, Error> {
    let redirect_uri = redirect_uri(&app_state.config, &headers, &uri)
        .ok_or_else(|| config_error("request carries no Host to build the redirect URI from"))?;

    let store = CookieStore::new(cookies, &app_state.config);
    let url = login_flow::begin(
        &store,
        &app_state.authorization_endpoint(),
        &redirect_uri,
        params.return_url.as_deref(),
    )?;

    Ok(found(&url))
}

/// GET /callback
///
/// Handles Azure AD's redirect back after the user signed in. On success, sets the
/// `azureToken` (and `refresh_token`) cookies and redirects to the path the login
/// was started with.
#[utoipa::path(
    get,
    path = "/callback",
    params(
        ("code" = Option<String>, Query, description = "Authorization code from Azure AD"),
        ("state" = Option<String>, Query, description = "State echoed back from /login"),
    ),
    responses(
        (status = 302, description = "Redirect to the original destination, or to /?error=<code> \
            with code one of no_code, invalid_state, missing_verifier, token_exchange, \
            token_missing, callback_error"),
    )
)]
pub async fn callback(
    State(app_state): State<AppState>,
    cookies: Cookies,
    headers: HeaderMap,
    uri: Uri,
    RawQuery(query): RawQuery,
) -> Response {
    let params = callback_params(query.as_deref());
    let redirect_uri = redirect_uri(&app_state.config, &headers, &uri);
    let store = CookieStore::new(cookies.clone(), &app_state.config);

    match login_flow::complete(
        &store,
        app_state.token_exchanger.as_ref(),
        &params,
        redirect_uri.as_deref(),
    )
    .await
    {
        Ok(Completion {
            destination,
            tokens,
        }) => {
            issue_session_cookies(&cookies, &tokens, &app_state.config);
            debug!("Redirecting to: {destination}");
            found(&destination)
        }
        Err(error) => error_redirect(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_uri_uses_host_header() {
        let config = crate::tests::test_config(&[]);
        let mut headers = HeaderMap::new();
        headers.insert(header::HOST, HeaderValue::from_static("app.example:8443"));

        assert_eq!(
            redirect_uri(&config, &headers, &Uri::from_static("/login")),
            Some("https://app.example:8443/callback".to_string())
        );
    }

    #[test]
    fn test_redirect_uri_falls_back_to_uri_authority() {
        let config = crate::tests::test_config(&["--redirect-scheme", "http"]);
        let uri = Uri::from_static("http://localhost:4000/login");

        assert_eq!(
            redirect_uri(&config, &HeaderMap::new(), &uri),
            Some("http://localhost:4000/callback".to_string())
        );
    }

    #[test]
    fn test_redirect_uri_without_host() {
        let config = crate::tests::test_config(&[]);
        assert_eq!(
            redirect_uri(&config, &HeaderMap::new(), &Uri::from_static("/login")),
            None
        );
    }

    #[test]
    fn test_found_percent_encodes_non_ascii_paths() {
        let response = found("/über?tab=1");
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers()[header::LOCATION], "/%C3%BCber?tab=1");
    }

    #[test]
    fn test_found_keeps_error_query_and_absolute_urls() {
        assert_eq!(
            found("/?error=invalid_state").headers()[header::LOCATION],
            "/?error=invalid_state"
        );
        assert_eq!(
            found("https://login.microsoftonline.com/common/oauth2/v2.0/authorize?state=Lw%3D%3D")
                .headers()[header::LOCATION],
            "https://login.microsoftonline.com/common/oauth2/v2.0/authorize?state=Lw%3D%3D"
        );
    }

    #[test]
    fn test_found_stays_on_current_origin() {
        // Resolving drops the tab, leaving `//evil.example`.
        let response = found("/\t/evil.example");
        assert_eq!(response.headers()[header::LOCATION], "/");
    }
}
