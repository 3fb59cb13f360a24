//! Token exchange capability and the authorization request builder.

use async_trait::async_trait;
use url::Url;

use super::pkce::{PkceChallenge, PkceVerifier};
use super::token::Tokens;
use crate::error::{Error, ErrorKind, OAuthErrorKind};

/// Exchanges an authorization code for tokens at the provider's token endpoint.
///
/// Handlers receive an implementation instead of reaching for a shared client,
/// so tests can substitute a fake.
#[async_trait]
pub trait TokenExchanger: Send + Sync {
    /// Perform a single `authorization_code` grant.
    ///
    /// # Arguments
    ///
    /// * `code` - Authorization code from the OAuth callback
    /// * `redirect_uri` - Must match the `redirect_uri` of the authorization request exactly
    /// * `verifier` - The PKCE verifier whose challenge was sent at authorization time
    ///
    /// # Returns
    ///
    /// The provider's tokens, or an error with kind `OAuth(TokenMissing)` when the
    /// provider answered successfully but without an access token.
    async fn exchange(
        &self,
        code: &str,
        redirect_uri: &str,
        verifier: &PkceVerifier,
    ) -> Result<Tokens, Error>;
}

/// Static part of the authorization request: where to send the browser and as whom.
#[derive(Debug, Clone)]
pub struct AuthorizationEndpoint {
    /// The provider's authorize endpoint.
    pub url: String,
    /// OAuth client identifier.
    pub client_id: String,
    /// Requested scopes, joined with spaces in the request.
    pub scopes: Vec<String>,
}

impl AuthorizationEndpoint {
    pub fn new(url: impl Into<String>, client_id: impl Into<String>, scopes: Vec<String>) -> Self {
        Self {
            url: url.into(),
            client_id: client_id.into(),
            scopes,
        }
    }

    /// Build the authorization URL for one login attempt.
    ///
    /// Always requests `response_type=code`, `response_mode=query` and
    /// `code_challenge_method=S256`.
    pub fn authorization_url(
        &self,
        redirect_uri: &str,
        challenge: &PkceChallenge,
        state: &str,
    ) -> Result<Url, Error> {
        let mut url = Url::parse(&self.url).map_err(|e| Error {
            source: Some(Box::new(e)),
            error_kind: ErrorKind::OAuth(OAuthErrorKind::AuthorizationUrl),
        })?;

        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", redirect_uri)
            .append_pair("scope", &self.scopes.join(" "))
            .append_pair("response_mode", "query")
            .append_pair("code_challenge", challenge.as_str())
            .append_pair("code_challenge_method", PkceChallenge::METHOD)
            .append_pair("state", state);

        Ok(url)
    }
}
