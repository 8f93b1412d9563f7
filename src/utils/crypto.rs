// Cryptographic utilities for session keys, secrets and authentication tokens

use base64::{engine::general_purpose, Engine as _};
use rand::{rngs::OsRng, TryRngCore};
use sha2::{Digest, Sha256};

use crate::error::SessionError;

/// Number of random bytes behind every session key and secret (256 bits)
pub const KEY_SIZE: usize = 32;

/// Generate a cryptographically secure session key
///
/// Draws [`KEY_SIZE`] bytes from the operating system RNG and encodes them with the
/// URL-safe base64 alphabet, so the result can travel in cookies and query strings
/// unchanged. Used both for entry keys (session ids) and for rotation secrets.
///
/// # Errors
///
/// Returns [`SessionError::Randomness`] if the operating system RNG fails. The
/// failure is not retried.
pub fn generate_session_key() -> Result<String, SessionError> {
    let mut key = [0u8; KEY_SIZE];
    OsRng
        .try_fill_bytes(&mut key)
        .map_err(|e| SessionError::Randomness(e.to_string()))?;
    Ok(general_purpose::URL_SAFE.encode(key))
}

/// SHA-256 of `input`, base64url encoded (padded)
#[must_use]
pub fn sha256_base64url(input: &[u8]) -> String {
    let digest = Sha256::digest(input);
    general_purpose::URL_SAFE.encode(digest)
}

/// Compare two tokens without short-circuiting on the first differing byte
#[must_use]
pub fn tokens_match(presented: &str, expected: &str) -> bool {
    let a = presented.as_bytes();
    let b = expected.as_bytes();
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
