//! Query parameters of the Azure AD login endpoints.

use auth::login::CallbackParams;
use serde::Deserialize;
use utoipa::IntoParams;

/// Parameters accepted by `GET /login`
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub(crate) struct LoginParams {
    /// Relative path to return to after a successful login. Defaults to `/`.
    #[serde(rename = "returnUrl")]
    #[param(example = "/dashboard")]
    pub(crate) return_url: Option<String>,
}

/// Read `code` and `state` from the callback's raw query string.
///
/// Parsing never fails: malformed or missing parameters simply come back as `None`
/// and are classified by the callback flow. The first occurrence of a repeated key wins.
pub(crate) fn callback_params(raw_query: Option<&str>) -> CallbackParams {
    let mut params = CallbackParams::default();

    for (key, value) in url::form_urlencoded::parse(raw_query.unwrap_or_default().as_bytes()) {
        match &*key {
            "code" if params.code.is_none() => params.code = Some(value.into_owned()),
            "state" if params.state.is_none() => params.state = Some(value.into_owned()),
            _ => {}
        }
    }

    params
}
