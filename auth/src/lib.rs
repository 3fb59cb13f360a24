//! # auth
//!
//! Everything needed to log a browser in through Azure AD with the OAuth 2.0
//! Authorization Code flow and PKCE:
//! - PKCE verifier/challenge generation
//! - Anti-CSRF state encoding and destination recovery
//! - Consume-on-read ephemeral storage contract
//! - Token exchange against the provider's token endpoint
//! - The login/callback sequence tying them together
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auth::{
//!     login::{self, CallbackParams},
//!     oauth::{providers::azure::TokenClient, AuthorizationEndpoint},
//! };
//! ```

pub mod error;
pub mod http;
pub mod login;
pub mod oauth;

// Re-export commonly used types
pub use error::{Error, ErrorKind};
