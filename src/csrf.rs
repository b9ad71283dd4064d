use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::TryRngCore;
use rand::rngs::OsRng;

use crate::error::Error;

/// Number of random bytes behind every state value and session id (256 bits).
pub const RANDOM_BYTES: usize = 32;

/// Generates the anti-forgery `state` parameter for an authorization request.
///
/// Returns a 43-character URL-safe string (32 random bytes → base64url, no padding),
/// so it survives query encoding unchanged.
///
/// # Errors
///
/// Returns [`Error::Random`] if the operating system RNG fails.
pub fn generate_state() -> Result<String, Error> {
    random_token()
}

/// Generates an opaque session identifier with the same entropy as [`generate_state`].
///
/// # Errors
///
/// Returns [`Error::Random`] if the operating system RNG fails.
pub fn generate_session_id() -> Result<String, Error> {
    random_token()
}

fn random_token() -> Result<String, Error> {
    let mut bytes = [0u8; RANDOM_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::Random(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(bytes))
}
