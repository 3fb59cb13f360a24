//! The two halves of the Authorization Code + PKCE login.
//!
//! [`begin`] runs when the browser asks to log in and produces the provider URL to
//! redirect to. [`complete`] runs when the provider redirects back and produces either
//! the tokens plus the original destination, or a [`CallbackError`] naming why not.
//! Both are independent of how the ephemeral values are stored and of how the code
//! is exchanged.

use std::fmt;

use log::*;

use crate::error::{Error, ErrorKind, OAuthErrorKind};
use crate::oauth::state::{destination_from_state, encode_return_path, DEFAULT_RETURN_PATH};
use crate::oauth::{
    AuthorizationEndpoint, EphemeralStore, PkceVerifier, StoreKey, TokenExchanger, Tokens,
};

/// Start a login: store a fresh verifier and the state, then build the authorization URL.
///
/// `return_url` defaults to `/` when absent or empty.
pub fn begin<S>(
    store: &S,
    endpoint: &AuthorizationEndpoint,
    redirect_uri: &str,
    return_url: Option<&str>,
) -> Result<String, Error>
where
    S: EphemeralStore + ?Sized,
{
    let return_url = return_url
        .filter(|url| !url.is_empty())
        .unwrap_or(DEFAULT_RETURN_PATH);

    let verifier = PkceVerifier::generate();
    let challenge = verifier.challenge();
    store.store(StoreKey::PkceVerifier, verifier.as_str())?;

    let state = encode_return_path(return_url);
    store.store(StoreKey::AuthState, &state)?;

    let url = endpoint.authorization_url(redirect_uri, &challenge, &state)?;
    debug!("Redirecting to authorization endpoint {}", endpoint.url);
    Ok(url.into())
}

/// Query parameters the provider sends back to the callback.
#[derive(Debug, Clone, Default)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
}

/// Why a callback did not end in a logged-in session.
///
/// Each variant maps to the `error` query value the browser is redirected with.
#[derive(Debug, PartialEq)]
pub enum CallbackError {
    NoCode,
    InvalidState,
    MissingVerifier,
    TokenExchange,
    TokenMissing,
    Unexpected,
}

impl CallbackError {
    /// Machine-readable error code for the `error` query parameter.
    pub fn code(&self) -> &'static str {
        match self {
            CallbackError::NoCode => "no_code",
            CallbackError::InvalidState => "invalid_state",
            CallbackError::MissingVerifier => "missing_verifier",
            CallbackError::TokenExchange => "token_exchange",
            CallbackError::TokenMissing => "token_missing",
            CallbackError::Unexpected => "callback_error",
        }
    }
}

impl fmt::Display for CallbackError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

impl std::error::Error for CallbackError {}

/// A successful callback: where to send the browser and what to put in its cookies.
#[derive(Debug)]
pub struct Completion {
    pub destination: String,
    pub tokens: Tokens,
}

/// Finish a login started by [`begin`].
///
/// The stored state and verifier are consumed before anything is validated, so
/// they are gone whatever the outcome. `redirect_uri` must be the one used by
/// [`begin`]; `None` means it could not be rebuilt from the request.
pub async fn complete<S, T>(
    store: &S,
    exchanger: &T,
    params: &CallbackParams,
    redirect_uri: Option<&str>,
) -> Result<Completion, CallbackError>
where
    S: EphemeralStore + ?Sized,
    T: TokenExchanger + ?Sized,
{
    // An empty value counts as absent.
    let stored_state = store
        .retrieve_and_consume(StoreKey::AuthState)
        .map_err(unexpected)?
        .filter(|state| !state.is_empty());
    let stored_verifier = store
        .retrieve_and_consume(StoreKey::PkceVerifier)
        .map_err(unexpected)?
        .filter(|verifier| !verifier.is_empty());

    let Some(code) = params.code.as_deref().filter(|code| !code.is_empty()) else {
        error!("No authorization code received from Azure AD");
        return Err(CallbackError::NoCode);
    };

    let received_state = params.state.as_deref().filter(|state| !state.is_empty());
    let state = match (stored_state, received_state) {
        (Some(stored), Some(received)) if stored == received => stored,
        (stored, received) => {
            error!(
                "State validation failed: stored present={}, received={:?}",
                stored.is_some(),
                received
            );
            return Err(CallbackError::InvalidState);
        }
    };

    let Some(verifier) = stored_verifier else {
        error!("No PKCE code verifier found");
        return Err(CallbackError::MissingVerifier);
    };
    let verifier = PkceVerifier::from_string(verifier);

    let Some(redirect_uri) = redirect_uri else {
        error!("Cannot rebuild the OAuth redirect URI for this request");
        return Err(CallbackError::Unexpected);
    };

    let tokens = exchanger
        .exchange(code, redirect_uri, &verifier)
        .await
        .map_err(|e| {
            warn!("Authorization code exchange failed: {e:?}");
            match e.error_kind {
                ErrorKind::OAuth(OAuthErrorKind::TokenMissing) => CallbackError::TokenMissing,
                _ => CallbackError::TokenExchange,
            }
        })?;

    let destination = destination_from_state(&state);
    info!("Login complete, redirecting to {destination}");

    Ok(Completion {
        destination,
        tokens,
    })
}

fn unexpected(e: Error) -> CallbackError {
    error!("Error in Azure AD callback: {e:?}");
    CallbackError::Unexpected
}
