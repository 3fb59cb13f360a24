//! PKCE (Proof Key for Code Exchange) support for OAuth 2.0.
//!
//! Implements the S256 method of RFC 7636. Only the challenge is ever sent to
//! the authorization endpoint; the verifier stays server-side until the code exchange.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Shortest verifier allowed by RFC 7636.
pub const MIN_VERIFIER_LEN: usize = 43;
/// Longest verifier allowed by RFC 7636.
pub const MAX_VERIFIER_LEN: usize = 128;
/// Length of verifiers produced by [`PkceVerifier::generate`].
pub const DEFAULT_VERIFIER_LEN: usize = 64;

/// PKCE code verifier (random string).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceVerifier(String);

impl PkceVerifier {
    /// Generate a new random verifier of [`DEFAULT_VERIFIER_LEN`] characters.
    pub fn generate() -> Self {
        Self::generate_with_length(DEFAULT_VERIFIER_LEN)
    }

    /// Generate a new random verifier of `len` url-safe characters.
    ///
    /// `len` is clamped into `43..=128`.
    pub fn generate_with_length(len: usize) -> Self {
        let len = len.clamp(MIN_VERIFIER_LEN, MAX_VERIFIER_LEN);
        // Every 3 random bytes yield 4 base64url characters.
        let mut random_bytes = vec![0u8; len.div_ceil(4) * 3];
        rand::thread_rng().fill_bytes(&mut random_bytes);

        let mut verifier = URL_SAFE_NO_PAD.encode(random_bytes);
        verifier.truncate(len);
        Self(verifier)
    }

    /// Create a PKCE verifier from an existing string, e.g. one read back from storage.
    pub fn from_string(verifier: String) -> Self {
        Self(verifier)
    }

    /// Get the verifier string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Generate the corresponding code challenge.
    pub fn challenge(&self) -> PkceChallenge {
        PkceChallenge::from_verifier(self)
    }
}

/// PKCE code challenge (SHA256 hash of verifier).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PkceChallenge(String);

impl PkceChallenge {
    /// The `code_challenge_method` value for this challenge.
    pub const METHOD: &'static str = "S256";

    /// Create a code challenge from a verifier.
    ///
    /// base64url(SHA256(verifier)) without padding.
    pub fn from_verifier(verifier: &PkceVerifier) -> Self {
        let hash = Sha256::digest(verifier.as_str().as_bytes());
        Self(URL_SAFE_NO_PAD.encode(hash))
    }

    /// Get the challenge string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}
