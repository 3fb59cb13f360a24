//! Browser cookies as the storage behind the login flow.
//!
//! The PKCE verifier and the login state live in the browser between `/login` and
//! `/callback`; the tokens end up there as session cookies. Integrity rests on the
//! cookie attributes (HttpOnly, SameSite=Lax, Secure in production), not on signing.

use auth::oauth::{EphemeralStore, StoreKey, Tokens};
use auth::Error as AuthError;
use secrecy::ExposeSecret;
use service::config::Config;
use time::Duration;
use tower_cookies::cookie::{Cookie, SameSite};
use tower_cookies::Cookies;

/// Cookie holding the access token.
pub const ACCESS_TOKEN_COOKIE: &str = "azureToken";
/// Cookie holding the refresh token, when the provider issued one.
pub const REFRESH_TOKEN_COOKIE: &str = "refresh_token";

fn cookie(name: &'static str, value: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .max_age(max_age)
        .path("/")
        .build()
}

/// [`EphemeralStore`] backed by the request's cookie jar.
///
/// Values are written as `Set-Cookie` on the response; reads come from the request
/// and each read queues a removal cookie.
pub struct CookieStore {
    cookies: Cookies,
    max_age: Duration,
    secure: bool,
}

impl CookieStore {
    pub fn new(cookies: Cookies, config: &Config) -> Self {
        Self {
            cookies,
            max_age: Duration::seconds(config.pkce_cookie_max_age_secs),
            secure: config.is_production(),
        }
    }
}

impl EphemeralStore for CookieStore {
    fn store(&self, key: StoreKey, value: &str) -> Result<(), AuthError> {
        self.cookies.add(cookie(
            key.as_str(),
            value.to_string(),
            self.max_age,
            self.secure,
        ));
        Ok(())
    }

    fn retrieve_and_consume(&self, key: StoreKey) -> Result<Option<String>, AuthError> {
        let value = self
            .cookies
            .get(key.as_str())
            .map(|cookie| cookie.value().to_string());

        if value.is_some() {
            self.cookies
                .remove(Cookie::build((key.as_str(), "")).path("/").build());
        }

        Ok(value)
    }
}

/// Write the access token, and the refresh token if present, as session cookies.
///
/// Max-Age is the configured session length, not the provider's `expires_in`.
pub fn issue_session_cookies(cookies: &Cookies, tokens: &Tokens, config: &Config) {
    let max_age = Duration::seconds(config.session_cookie_max_age_secs);
    let secure = config.is_production();

    cookies.add(cookie(
        ACCESS_TOKEN_COOKIE,
        tokens.access_token.expose_secret().clone(),
        max_age,
        secure,
    ));

    if let Some(refresh_token) = &tokens.refresh_token {
        cookies.add(cookie(
            REFRESH_TOKEN_COOKIE,
            refresh_token.expose_secret().clone(),
            max_age,
            secure,
        ));
    }
}
