//! PKCE (Proof Key for Code Exchange) implementation for OAuth 2.0
//!
//! Implements RFC 7636 for authorization without a client secret. The
//! verifier stays on this machine; only its SHA-256 challenge travels with
//! the authorization request.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use super::error::AuthError;

/// Characters a verifier is drawn from (a subset of RFC 7636 "unreserved").
pub const VERIFIER_CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

/// Shortest verifier RFC 7636 allows.
pub const MIN_VERIFIER_LENGTH: usize = 43;

/// Longest verifier RFC 7636 allows, and the length used by default.
pub const MAX_VERIFIER_LENGTH: usize = 128;

pub const DEFAULT_VERIFIER_LENGTH: usize = MAX_VERIFIER_LENGTH;

// Largest multiple of the charset size that fits in a byte; bytes at or above
// it are rejected so every character is equally likely.
const ACCEPT_BELOW: u8 = (256 - 256 % VERIFIER_CHARSET.len()) as u8;

/// Generate a cryptographically random code verifier
///
/// Returns exactly `length` characters from `[A-Za-z0-9]`, sampled from the
/// operating system's randomness source.
///
/// # Errors
/// - `AuthError::InvalidVerifierLength` if `length` is outside 43..=128
/// - `AuthError::RandomnessUnavailable` if the OS source cannot be read
pub fn generate_code_verifier(length: usize) -> Result<String, AuthError> {
    if !(MIN_VERIFIER_LENGTH..=MAX_VERIFIER_LENGTH).contains(&length) {
        return Err(AuthError::InvalidVerifierLength(length));
    }

    let mut verifier = String::with_capacity(length);
    let mut buf = [0u8; 64];
    while verifier.len() < length {
        OsRng
            .try_fill_bytes(&mut buf)
            .map_err(|e| AuthError::RandomnessUnavailable(e.to_string()))?;

        for byte in buf.iter().copied().filter(|b| *b < ACCEPT_BELOW) {
            if verifier.len() == length {
                break;
            }
            verifier.push(char::from(VERIFIER_CHARSET[usize::from(byte) % VERIFIER_CHARSET.len()]));
        }
    }

    Ok(verifier)
}

/// Derive the code challenge for a verifier
///
/// BASE64URL(SHA256(UTF-8(verifier))) with padding stripped. Pure and
/// deterministic.
#[must_use]
pub fn generate_code_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// PKCE verifier/challenge pair for one authorization attempt
///
/// The verifier is persisted until the redirect returns; the challenge is
/// sent in the authorization request.
#[derive(Clone)]
pub struct PKCEChallenge {
    /// Random string kept secret until token exchange
    pub code_verifier: String,

    /// SHA256 hash of `code_verifier`, base64url encoded
    pub code_challenge: String,
}

impl PKCEChallenge {
    /// Generate a new pair with a verifier of `length` characters.
    ///
    /// # Examples
    /// ```
    /// use tunestats_common::auth::pkce::{PKCEChallenge, DEFAULT_VERIFIER_LENGTH};
    ///
    /// let pair = PKCEChallenge::generate(DEFAULT_VERIFIER_LENGTH).unwrap();
    /// assert_eq!(pair.code_verifier.len(), 128);
    /// ```
    ///
    /// # Errors
    /// See [`generate_code_verifier`].
    pub fn generate(length: usize) -> Result<Self, AuthError> {
        let code_verifier = generate_code_verifier(length)?;
        let code_challenge = generate_code_challenge(&code_verifier);

        Ok(Self { code_verifier, code_challenge })
    }

    /// Get the challenge method (always "S256" for SHA256)
    #[must_use]
    pub fn challenge_method(&self) -> &'static str {
        "S256"
    }
}

impl std::fmt::Debug for PKCEChallenge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PKCEChallenge")
            .field("code_verifier", &"<redacted>")
            .field("code_challenge", &self.code_challenge)
            .finish()
    }
}
