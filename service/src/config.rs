use clap::builder::TypedValueParser as _;
use clap::Parser;
use dotenvy::dotenv;
use log::LevelFilter;
use secrecy::SecretString;
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default Microsoft identity platform authority used when `AZURE_AUTHORITY_URL` is not set.
pub const DEFAULT_AZURE_AUTHORITY_URL: &str = "https://login.microsoftonline.com";

#[derive(Clone, Debug, PartialEq)]
pub enum RustEnv {
    Development,
    Production,
    Staging,
}

#[derive(Debug, PartialEq, Eq)]
pub struct RustEnvParseError;

impl FromStr for RustEnv {
    type Err = RustEnvParseError;
    fn from_str(level: &str) -> Result<RustEnv, Self::Err> {
        match level.to_lowercase().as_str() {
            "development" => Ok(RustEnv::Development),
            "production" => Ok(RustEnv::Production),
            "staging" => Ok(RustEnv::Staging),
            _ => Err(RustEnvParseError),
        }
    }
}

impl fmt::Display for RustEnv {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RustEnv::Development => write!(f, "development"),
            RustEnv::Production => write!(f, "production"),
            RustEnv::Staging => write!(f, "staging"),
        }
    }
}

fn parse_secret(value: &str) -> Result<SecretString, Infallible> {
    Ok(SecretString::new(value.to_string()))
}

#[derive(Clone, Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// A list of full CORS origin URLs that allowed to receive server responses.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "http://localhost:3000,https://localhost:3000"
    )]
    pub allowed_origins: Vec<String>,

    /// The application (client) ID registered with Azure AD.
    #[arg(long, env, default_value = "")]
    azure_client_id: String,

    /// The Azure AD tenant (directory) ID, or one of `common`, `organizations`, `consumers`.
    #[arg(long, env, default_value = "common")]
    azure_tenant_id: String,

    /// The confidential client secret sent to the token endpoint. Never exposed to the browser.
    #[arg(long, env, value_parser = parse_secret)]
    azure_client_secret: Option<SecretString>,

    /// Scopes requested at authorization time.
    #[arg(
        long,
        env,
        value_delimiter = ',',
        use_value_delimiter = true,
        default_value = "openid,profile,offline_access"
    )]
    azure_scopes: Vec<String>,

    /// Base URL of the identity provider. Override in tests to point at a mock server.
    #[arg(long, env, default_value = DEFAULT_AZURE_AUTHORITY_URL)]
    azure_authority_url: String,

    /// Scheme used when rebuilding the OAuth redirect URI from the inbound Host header.
    #[arg(
        long,
        env,
        default_value = "https",
        value_parser = clap::builder::PossibleValuesParser::new(["http", "https"])
    )]
    redirect_scheme: String,

    /// Seconds to wait for the token endpoint before aborting the code exchange
    #[arg(long, env, default_value_t = 120)]
    pub token_exchange_timeout_secs: u64,

    /// Max-Age in seconds of the `azureToken` and `refresh_token` cookies (default: 45 minutes).
    /// Deliberately independent of the provider's `expires_in`.
    #[arg(long, env, default_value_t = 2700)]
    pub session_cookie_max_age_secs: i64,

    /// Max-Age in seconds of the `pkce_verifier` and `auth_state` cookies (default: 10 minutes)
    #[arg(long, env, default_value_t = 600)]
    pub pkce_cookie_max_age_secs: i64,

    /// The host interface to listen for incoming connections
    #[arg(short, long, env, default_value = "127.0.0.1")]
    pub interface: Option<String>,

    /// The host TCP port to listen for incoming connections
    #[arg(short, long, env, default_value_t = 4000)]
    pub port: u16,

    /// Set the log level verbosity threshold (level) to control what gets displayed on console output
    #[arg(
        short,
        long,
        env,
        default_value_t = LevelFilter::Info,
        value_parser = clap::builder::PossibleValuesParser::new(["OFF", "ERROR", "WARN", "INFO", "DEBUG", "TRACE"])
            .map(|s| s.parse::<LevelFilter>().unwrap()),
        )]
    pub log_level_filter: LevelFilter,

    /// Set the Rust runtime environment to use.
    #[arg(
    short,
    long,
    env,
    default_value_t = RustEnv::Development,
    value_parser = clap::builder::PossibleValuesParser::new([
        "DEVELOPMENT", "PRODUCTION", "STAGING",
        "development", "production", "staging"
    ])
        .map(|s| s.parse::<RustEnv>().unwrap()),
    )]
    pub runtime_env: RustEnv,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        // Load .env file first
        dotenv().ok();
        // Then parse the command line parameters and flags
        Config::parse()
    }

    pub fn azure_client_id(&self) -> &str {
        &self.azure_client_id
    }

    pub fn azure_tenant_id(&self) -> &str {
        &self.azure_tenant_id
    }

    /// Returns the Azure client secret, if configured.
    pub fn azure_client_secret(&self) -> Option<SecretString> {
        self.azure_client_secret.clone()
    }

    pub fn azure_scopes(&self) -> &[String] {
        &self.azure_scopes
    }

    /// Returns the authority base URL without a trailing slash.
    pub fn azure_authority_url(&self) -> &str {
        self.azure_authority_url.trim_end_matches('/')
    }

    /// The tenant's OAuth 2.0 v2 authorization endpoint.
    pub fn azure_authorize_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/authorize",
            self.azure_authority_url(),
            self.azure_tenant_id
        )
    }

    /// The tenant's OAuth 2.0 v2 token endpoint.
    pub fn azure_token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.azure_authority_url(),
            self.azure_tenant_id
        )
    }

    pub fn redirect_scheme(&self) -> &str {
        &self.redirect_scheme
    }

    pub fn token_exchange_timeout(&self) -> Duration {
        Duration::from_secs(self.token_exchange_timeout_secs)
    }

    pub fn runtime_env(&self) -> RustEnv {
        self.runtime_env.clone()
    }

    pub fn is_production(&self) -> bool {
        self.runtime_env() == RustEnv::Production
    }
}
