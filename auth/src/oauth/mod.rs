//! OAuth 2.0 authorization code flow building blocks.
//!
//! PKCE pair generation, the anti-CSRF state codec, consume-on-read storage and
//! the token exchange with the identity provider.

mod pkce;
mod provider;
mod store;
mod token;

pub mod providers;
pub mod state;

pub use pkce::{PkceChallenge, PkceVerifier, DEFAULT_VERIFIER_LEN, MAX_VERIFIER_LEN, MIN_VERIFIER_LEN};
pub use provider::{AuthorizationEndpoint, TokenExchanger};
pub use store::{EphemeralStore, MemoryStore, StoreKey};
pub use token::Tokens;
