//! Azure AD (Microsoft identity platform v2.0) token client.

use std::time::Duration;

use async_trait::async_trait;
use log::*;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::error::{oauth_error, Error, ErrorKind, HttpErrorKind, OAuthErrorKind};
use crate::http::HttpClientBuilder;
use crate::oauth::token::{TokenResponse, Tokens};
use crate::oauth::{PkceVerifier, TokenExchanger};

/// Form body of the `authorization_code` grant.
#[derive(Serialize)]
struct TokenExchangeRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    grant_type: &'a str,
    code: &'a str,
    redirect_uri: &'a str,
    code_verifier: &'a str,
}

/// Confidential client for the tenant's `/oauth2/v2.0/token` endpoint.
pub struct TokenClient {
    client_id: String,
    client_secret: SecretString,
    token_url: String,
    http_client: reqwest::Client,
}

impl TokenClient {
    /// Create a new Azure token client.
    ///
    /// # Arguments
    ///
    /// * `client_id` - Application (client) ID
    /// * `client_secret` - Client secret, sent only to the token endpoint
    /// * `token_url` - The tenant's token endpoint
    /// * `timeout` - Upper bound for the whole exchange, after which it is aborted
    pub fn new(
        client_id: String,
        client_secret: SecretString,
        token_url: String,
        timeout: Duration,
    ) -> Result<Self, Error> {
        let http_client = HttpClientBuilder::new().with_timeout(timeout).build()?;

        Ok(Self {
            client_id,
            client_secret,
            token_url,
            http_client,
        })
    }
}

#[async_trait]
impl TokenExchanger for TokenClient {
    async fn exchange(
        &self,
        code: &str,
        redirect_uri: &str,
        verifier: &PkceVerifier,
    ) -> Result<Tokens, Error> {
        let request = TokenExchangeRequest {
            client_id: &self.client_id,
            client_secret: self.client_secret.expose_secret(),
            grant_type: "authorization_code",
            code,
            redirect_uri,
            code_verifier: verifier.as_str(),
        };

        debug!("Exchanging Azure AD authorization code for tokens");

        let response = self
            .http_client
            .post(&self.token_url)
            .form(&request)
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to reach Azure AD token endpoint: {:?}", e);
                Error::from(e)
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            warn!("Azure AD token endpoint returned {}: {}", status, error_text);
            return Err(oauth_error(
                OAuthErrorKind::TokenExchangeFailed,
                &format!("token endpoint returned {status}"),
            ));
        }

        let body: TokenResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse Azure AD token response: {:?}", e);
            let error_kind = if e.is_timeout() {
                ErrorKind::Http(HttpErrorKind::Timeout)
            } else {
                ErrorKind::OAuth(OAuthErrorKind::InvalidResponse)
            };
            Error {
                source: Some(Box::new(e)),
                error_kind,
            }
        })?;

        let tokens = Tokens::try_from(body).inspect_err(|_| {
            warn!("Azure AD token response did not include an access token");
        })?;
        info!("Successfully exchanged Azure AD authorization code for tokens");
        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use secrecy::ExposeSecret;
    use std::io::Write;

    const TOKEN_PATH: &str = "/tenant/oauth2/v2.0/token";

    fn client(server_url: &str, timeout: Duration) -> TokenClient {
        TokenClient::new(
            "client-123".to_string(),
            SecretString::new("s3cret".to_string()),
            format!("{server_url}{TOKEN_PATH}"),
            timeout,
        )
        .unwrap()
    }

    fn verifier() -> PkceVerifier {
        PkceVerifier::from_string("v".repeat(64))
    }

    #[tokio::test]
    async fn test_exchange_posts_form_and_returns_tokens() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", TOKEN_PATH)
            .match_header("content-type", "application/x-www-form-urlencoded")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("client_id".into(), "client-123".into()),
                Matcher::UrlEncoded("client_secret".into(), "s3cret".into()),
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "code-1".into()),
                Matcher::UrlEncoded(
                    "redirect_uri".into(),
                    "https://app.example/callback".into(),
                ),
                Matcher::UrlEncoded("code_verifier".into(), "v".repeat(64)),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token":"AT1","refresh_token":"RT1","expires_in":3600,"token_type":"Bearer"}"#)
            .create_async()
            .await;

        let tokens = client(&server.url(), Duration::from_secs(5))
            .exchange("code-1", "https://app.example/callback", &verifier())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(tokens.access_token.expose_secret(), "AT1");
        assert_eq!(
            tokens.refresh_token.as_ref().map(|t| t.expose_secret().as_str()),
            Some("RT1")
        );
        assert_eq!(tokens.expires_in, Some(3600));
    }

    #[tokio::test]
    async fn test_non_success_status_is_exchange_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", TOKEN_PATH)
            .with_status(400)
            .with_body(r#"{"error":"invalid_grant"}"#)
            .create_async()
            .await;

        let err = client(&server.url(), Duration::from_secs(5))
            .exchange("code-1", "https://app.example/callback", &verifier())
            .await
            .unwrap_err();

        assert_eq!(
            err.error_kind,
            ErrorKind::OAuth(OAuthErrorKind::TokenExchangeFailed)
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_response() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", TOKEN_PATH)
            .with_status(200)
            .with_body("<html>not json</html>")
            .create_async()
            .await;

        let err = client(&server.url(), Duration::from_secs(5))
            .exchange("code-1", "https://app.example/callback", &verifier())
            .await
            .unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::OAuth(OAuthErrorKind::InvalidResponse));
    }

    #[tokio::test]
    async fn test_body_without_access_token_is_token_missing() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", TOKEN_PATH)
            .with_status(200)
            .with_body(r#"{"token_type":"Bearer","expires_in":3600}"#)
            .create_async()
            .await;

        let err = client(&server.url(), Duration::from_secs(5))
            .exchange("code-1", "https://app.example/callback", &verifier())
            .await
            .unwrap_err();

        assert_eq!(err.error_kind, ErrorKind::OAuth(OAuthErrorKind::TokenMissing));
    }

    #[tokio::test]
    async fn test_slow_token_endpoint_times_out() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", TOKEN_PATH)
            .with_status(200)
            .with_chunked_body(|w| {
                std::thread::sleep(std::time::Duration::from_millis(500));
                w.write_all(br#"{"access_token":"AT1"}"#)
            })
            .create_async()
            .await;

        let err = client(&server.url(), Duration::from_millis(100))
            .exchange("code-1", "https://app.example/callback", &verifier())
            .await
            .unwrap_err();

        // Depending on whether headers were flushed before the stall, the abort
        // surfaces while sending or while reading the body.
        assert!(matches!(
            err.error_kind,
            ErrorKind::Http(HttpErrorKind::Timeout)
                | ErrorKind::OAuth(OAuthErrorKind::InvalidResponse)
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_http_error() {
        let err = client("http://127.0.0.1:9", Duration::from_secs(5))
            .exchange("code-1", "https://app.example/callback", &verifier())
            .await
            .unwrap_err();

        assert!(matches!(err.error_kind, ErrorKind::Http(_)));
    }
}
