//! Secret generation from the operating system random source.

use std::fmt;

use rand::RngCore;
use rand::rngs::OsRng;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{ApiTokenError, Result};

/// Length of every generated secret in bytes.
pub const SECRET_LEN: usize = 32;

/// A freshly generated bearer secret.
///
/// Not `Clone`: there is exactly one copy, wiped when it drops.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct Secret([u8; SECRET_LEN]);

impl Secret {
    #[cfg(test)]
    pub(crate) fn from_bytes(bytes: [u8; SECRET_LEN]) -> Self {
        Self(bytes)
    }

    /// Get a reference to the secret bytes.
    pub fn as_bytes(&self) -> &[u8; SECRET_LEN] {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// Generate a new 32-byte secret from `OsRng`.
///
/// Fails with [`ApiTokenError::EntropyUnavailable`] when the OS source cannot
/// deliver; there is no fallback generator.
pub fn generate() -> Result<Secret> {
    let mut bytes = [0u8; SECRET_LEN];
    if let Err(e) = OsRng.try_fill_bytes(&mut bytes) {
        bytes.zeroize();
        return Err(ApiTokenError::EntropyUnavailable(e.to_string()));
    }
    Ok(Secret(bytes))
}
