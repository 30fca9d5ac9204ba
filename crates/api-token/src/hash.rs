//! bcrypt hashing for token secrets.

use crate::data::Verifier;
use crate::error::{ApiTokenError, Result};
use crate::secret::Secret;

/// Work factor used for every new verifier.
pub const WORK_FACTOR: u32 = 12;

/// bcrypt's floor for the work factor. Only meant for tests.
pub const MIN_WORK_FACTOR: u32 = 4;

/// bcrypt consumes at most this many bytes of input.
pub const MAX_SECRET_LEN: usize = 72;

/// Derives salted verifiers from secrets and checks candidates against them.
#[derive(Debug, Clone, Copy)]
pub struct CredentialHasher {
    cost: u32,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialHasher {
    /// Hasher at [`WORK_FACTOR`].
    pub fn new() -> Self {
        Self { cost: WORK_FACTOR }
    }

    /// Hasher at an explicit work factor. Out of range values surface as
    /// [`ApiTokenError::HashingFailed`] on the first `hash` call.
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    /// Hash a generated secret. Consumes it so the plaintext is wiped as
    /// soon as the verifier exists.
    pub fn hash(&self, secret: Secret) -> Result<Verifier> {
        self.hash_bytes(secret.as_bytes())
    }

    /// Hash arbitrary bytes. Inputs over [`MAX_SECRET_LEN`] are rejected
    /// instead of being truncated.
    pub fn hash_bytes(&self, secret: &[u8]) -> Result<Verifier> {
        if secret.len() > MAX_SECRET_LEN {
            return Err(ApiTokenError::SecretTooLong {
                len: secret.len(),
                max: MAX_SECRET_LEN,
            });
        }

        let hashed = bcrypt::hash(secret, self.cost)
            .map_err(|e| ApiTokenError::HashingFailed(e.to_string()))?;
        Ok(Verifier::from(hashed))
    }

    /// Check a candidate against a stored verifier.
    ///
    /// Comparison happens inside bcrypt, in constant time. A mismatch is
    /// `Ok(false)`; only a verifier that cannot be parsed is an error.
    pub fn verify(&self, candidate: &[u8], verifier: &Verifier) -> Result<bool> {
        let encoded = std::str::from_utf8(verifier.as_bytes())
            .map_err(|_| ApiTokenError::VerifierCorrupt("not valid UTF-8".to_string()))?;

        let matched = bcrypt::verify(candidate, encoded)
            .map_err(|e| ApiTokenError::VerifierCorrupt(e.to_string()))?;

        // bcrypt truncates at 72 bytes; nothing that long was ever hashed here.
        Ok(matched && candidate.len() <= MAX_SECRET_LEN)
    }
}
