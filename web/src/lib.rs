use auth::oauth::{AuthorizationEndpoint, TokenExchanger};
use axum::http::{HeaderValue, Method};
use log::*;
use service::config::Config;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

mod controller;
mod cookie_store;
mod error;
pub(crate) mod params;
mod router;

pub use self::error::Error;

// Needs to implement Clone to be able to be passed into Router as State
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub token_exchanger: Arc<dyn TokenExchanger>,
}

impl AppState {
    pub fn new(app_config: Config, token_exchanger: Arc<dyn TokenExchanger>) -> Self {
        Self {
            config: app_config,
            token_exchanger,
        }
    }

    /// Authorization endpoint, client ID and scopes as currently configured.
    pub fn authorization_endpoint(&self) -> AuthorizationEndpoint {
        AuthorizationEndpoint::new(
            self.config.azure_authorize_url(),
            self.config.azure_client_id(),
            self.config.azure_scopes().to_vec(),
        )
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let allowed_origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {origin}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_methods([Method::GET])
        .allow_credentials(true)
        .allow_origin(allowed_origins)
}

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let config = &app_state.config;
    let interface = config.interface.as_deref().unwrap_or("127.0.0.1");
    let listen_addr = format!("{}:{}", interface, config.port);

    info!(
        "Server starting... listening for connections on http://{}",
        listen_addr
    );
    info!("Azure authority: {}", config.azure_authority_url());
    info!("Azure tenant: {}", config.azure_tenant_id());
    if config.azure_client_id().is_empty() {
        warn!("AZURE_CLIENT_ID is not set; Azure AD will reject authorization requests");
    }

    let cors = cors_layer(config);
    let listener = TcpListener::bind(&listen_addr).await?;

    let app = router::define_routes(app_state).layer(cors);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received, stopping server"),
        Err(e) => error!("Failed to listen for the shutdown signal: {e}"),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use auth::error::{oauth_error, OAuthErrorKind};
    use auth::oauth::{PkceVerifier, Tokens};
    use clap::Parser;
    use secrecy::SecretString;
    use std::collections::HashMap;
    use std::sync::Mutex;

    pub(crate) fn test_config(args: &[&str]) -> Config {
        let mut argv = vec![
            "azure_login_rs",
            "--azure-client-id",
            "client-123",
            "--azure-tenant-id",
            "tenant-456",
        ];
        argv.extend_from_slice(args);
        Config::parse_from(argv)
    }

    pub(crate) fn tokens(access_token: &str, refresh_token: Option<&str>) -> Tokens {
        Tokens {
            access_token: SecretString::new(access_token.to_string()),
            refresh_token: refresh_token.map(|token| SecretString::new(token.to_string())),
            expires_in: Some(3599),
            token_type: Some("Bearer".to_string()),
            scope: None,
            extra: HashMap::new(),
        }
    }

    /// Exchange call as seen by [`FakeExchanger`]: code, redirect URI, verifier.
    pub(crate) type ExchangeCall = (String, String, String);

    /// Stands in for the Azure token endpoint and records what it was asked.
    pub(crate) struct FakeExchanger {
        result: fn() -> core::result::Result<Tokens, auth::Error>,
        calls: Mutex<Vec<ExchangeCall>>,
    }

    impl FakeExchanger {
        pub(crate) fn new(result: fn() -> core::result::Result<Tokens, auth::Error>) -> Self {
            Self {
                result,
                calls: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn succeeding() -> Self {
            Self::new(|| Ok(tokens("AT1", Some("RT1"))))
        }

        pub(crate) fn failing() -> Self {
            Self::new(|| Err(oauth_error(OAuthErrorKind::TokenExchangeFailed, "HTTP 400")))
        }

        pub(crate) fn without_token() -> Self {
            Self::new(|| Err(oauth_error(OAuthErrorKind::TokenMissing, "no access_token")))
        }

        pub(crate) fn calls(&self) -> Vec<ExchangeCall> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl TokenExchanger for FakeExchanger {
        async fn exchange(
            &self,
            code: &str,
            redirect_uri: &str,
            verifier: &PkceVerifier,
        ) -> core::result::Result<Tokens, auth::Error> {
            self.calls.lock().unwrap().push((
                code.to_string(),
                redirect_uri.to_string(),
                verifier.as_str().to_string(),
            ));
            (self.result)()
        }
    }

    #[test]
    fn test_authorization_endpoint_follows_config() {
        let app_state = AppState::new(
            test_config(&["--azure-authority-url", "http://127.0.0.1:9999/"]),
            Arc::new(FakeExchanger::succeeding()),
        );

        let endpoint = app_state.authorization_endpoint();
        assert_eq!(
            endpoint.url,
            "http://127.0.0.1:9999/tenant-456/oauth2/v2.0/authorize"
        );
        assert_eq!(endpoint.client_id, "client-123");
        assert_eq!(endpoint.scopes, vec!["openid", "profile", "offline_access"]);
    }
}
