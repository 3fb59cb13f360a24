//! OAuth token types.

use std::collections::HashMap;

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::{oauth_error, Error, OAuthErrorKind};

/// Tokens returned by a successful authorization code exchange.
///
/// Only lives long enough to be written into the session cookies.
#[derive(Debug, Clone)]
pub struct Tokens {
    /// Access token for API requests.
    pub access_token: SecretString,
    /// Refresh token, when the `offline_access` scope was granted.
    pub refresh_token: Option<SecretString>,
    /// Lifetime of the access token in seconds, as reported by the provider.
    pub expires_in: Option<u64>,
    /// Token type (usually "Bearer").
    pub token_type: Option<String>,
    /// Granted scopes, space separated.
    pub scope: Option<String>,
    /// Provider-specific fields (`id_token`, `ext_expires_in`, ...).
    pub extra: HashMap<String, serde_json::Value>,
}

/// Raw token endpoint body. Every field is optional so that a body which is valid
/// JSON but lacks `access_token` can be told apart from an unparseable one.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(flatten)]
    extra: HashMap<String, serde_json::Value>,
}

impl TryFrom<TokenResponse> for Tokens {
    type Error = Error;

    fn try_from(response: TokenResponse) -> Result<Self, Self::Error> {
        let access_token = response
            .access_token
            .filter(|token| !token.is_empty())
            .ok_or_else(|| {
                oauth_error(
                    OAuthErrorKind::TokenMissing,
                    "token response did not contain an access_token",
                )
            })?;

        Ok(Tokens {
            access_token: SecretString::new(access_token),
            refresh_token: response
                .refresh_token
                .filter(|token| !token.is_empty())
                .map(SecretString::new),
            expires_in: response.expires_in,
            token_type: response.token_type,
            scope: response.scope,
            extra: response.extra,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use secrecy::ExposeSecret;
    use serde_json::json;

    fn parse(body: serde_json::Value) -> Result<Tokens, Error> {
        let response: TokenResponse = serde_json::from_value(body).unwrap();
        Tokens::try_from(response)
    }

    #[test]
    fn test_full_response_is_kept() {
        let tokens = parse(json!({
            "access_token": "AT1",
            "refresh_token": "RT1",
            "expires_in": 3600,
            "token_type": "Bearer",
            "scope": "openid profile",
            "id_token": "ID1"
        }))
        .unwrap();

        assert_eq!(tokens.access_token.expose_secret(), "AT1");
        assert_eq!(
            tokens.refresh_token.as_ref().map(|t| t.expose_secret().as_str()),
            Some("RT1")
        );
        assert_eq!(tokens.expires_in, Some(3600));
        assert_eq!(tokens.token_type.as_deref(), Some("Bearer"));
        assert_eq!(tokens.extra.get("id_token"), Some(&json!("ID1")));
    }

    #[test]
    fn test_refresh_token_is_optional() {
        let tokens = parse(json!({ "access_token": "AT1", "expires_in": 3600 })).unwrap();
        assert!(tokens.refresh_token.is_none());
    }

    #[test]
    fn test_missing_access_token_is_token_missing() {
        let err = parse(json!({ "refresh_token": "RT1", "expires_in": 3600 })).unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::OAuth(OAuthErrorKind::TokenMissing));
    }

    #[test]
    fn test_empty_access_token_is_token_missing() {
        let err = parse(json!({ "access_token": "" })).unwrap_err();
        assert_eq!(err.error_kind, ErrorKind::OAuth(OAuthErrorKind::TokenMissing));
    }
}
