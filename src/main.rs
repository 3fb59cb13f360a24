use auth::oauth::providers::azure::TokenClient;
use log::{error, info, warn};
use secrecy::SecretString;
use service::{config::Config, logging::Logger};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config as &Config);

    info!("Starting Azure login service ({})", config.runtime_env());

    let client_secret = config.azure_client_secret().unwrap_or_else(|| {
        warn!("AZURE_CLIENT_SECRET is not set; token exchanges will be rejected by Azure AD");
        SecretString::new(String::new())
    });

    let token_client = match TokenClient::new(
        config.azure_client_id().to_string(),
        client_secret,
        config.azure_token_url(),
        config.token_exchange_timeout(),
    ) {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to build the Azure token client: {e}");
            std::process::exit(1);
        }
    };

    let app_state = web::AppState::new(config, Arc::new(token_client));

    if let Err(e) = web::init_server(app_state).await {
        error!("Server stopped with error: {e}");
        std::process::exit(1);
    }
}
