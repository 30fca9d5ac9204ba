//! Token formatting and one-shot issuance.

use std::fmt;

use data_encoding::BASE32_NOPAD;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::config::TokenConfig;
use crate::data::TokenId;
use crate::error::{ApiTokenError, Result};
use crate::hash::CredentialHasher;
use crate::secret::{SECRET_LEN, Secret, generate};
use crate::store::CredentialStore;

/// Current version of the token format.
pub const CURRENT_VERSION: i16 = 1;

/// Payload is the identifier (8 bytes, big endian) followed by the secret.
pub(crate) const PAYLOAD_LEN: usize = 8 + SECRET_LEN;

/// A token handed to the operator. Shown once, wiped on drop.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct IssuedToken {
    #[zeroize(skip)]
    id: TokenId,
    token: String,
}

impl IssuedToken {
    /// The store identifier embedded in the token.
    pub fn id(&self) -> TokenId {
        self.id
    }

    /// The full token string (prefix + version + encoded payload).
    pub fn token(&self) -> &str {
        &self.token
    }
}

impl fmt::Debug for IssuedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IssuedToken")
            .field("id", &self.id)
            .field("token", &"<redacted>")
            .finish()
    }
}

/// Build the token string: `{prefix}_v{version}_{base32(id || secret)}`.
///
/// 40 payload bytes encode to exactly 64 lowercase base32 characters.
pub fn format_token(prefix: &str, id: TokenId, secret: &Secret) -> String {
    let mut payload = [0u8; PAYLOAD_LEN];
    payload[..8].copy_from_slice(&id.get().to_be_bytes());
    payload[8..].copy_from_slice(secret.as_bytes());

    let mut encoded = BASE32_NOPAD.encode(&payload);
    encoded.make_ascii_lowercase();
    let token = format!("{}_v{}_{}", prefix, CURRENT_VERSION, encoded);

    payload.zeroize();
    encoded.zeroize();
    token
}

/// Provision a new token: generate, hash, persist, format.
///
/// The secret never leaves this function except inside the returned token.
/// Any failure aborts issuance; no token is produced from a partial run.
pub fn issue(
    store: &dyn CredentialStore,
    hasher: &CredentialHasher,
    config: &TokenConfig,
) -> Result<IssuedToken> {
    if !TokenConfig::is_valid_prefix(&config.prefix) {
        return Err(ApiTokenError::InvalidPrefix {
            expected: "non-empty alphanumeric prefix".to_string(),
            got: config.prefix.clone(),
        });
    }

    let secret = generate()?;
    let verifier = hasher.hash_bytes(secret.as_bytes())?;
    let id = store.put(&verifier)?;
    let token = format_token(&config.prefix, id, &secret);
    drop(secret);

    log::info!("Issued token id={} (work factor {})", id, hasher.cost());

    Ok(IssuedToken { id, token })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::MIN_WORK_FACTOR;
    use crate::store::MemoryCredentialStore;

    fn hasher() -> CredentialHasher {
        CredentialHasher::with_cost(MIN_WORK_FACTOR)
    }

    #[test]
    fn test_format_token_shape() {
        let secret = generate().unwrap();
        let token = format_token("vi", TokenId(1), &secret);

        let parts: Vec<&str> = token.split('_').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "vi");
        assert_eq!(parts[1], "v1");
        // 40 bytes -> 64 base32 chars
        assert_eq!(parts[2].len(), 64);
        assert_eq!(parts[2], parts[2].to_lowercase());
    }

    #[test]
    fn test_issue_persists_verifier() {
        let store = MemoryCredentialStore::new();
        let issued = issue(&store, &hasher(), &TokenConfig::default()).unwrap();

        assert_eq!(issued.id(), TokenId(1));
        assert!(issued.token().starts_with("vi_v1_"));

        let verifier = store.get_by_identifier(issued.id()).unwrap().unwrap();
        assert!(!verifier.as_bytes().is_empty());
        // The stored blob never contains the token text.
        let stored = String::from_utf8_lossy(verifier.as_bytes()).to_string();
        assert!(!stored.contains(issued.token()));
    }

    #[test]
    fn test_issue_unique_ids() {
        let store = MemoryCredentialStore::new();
        let config = TokenConfig::new("test");
        let t1 = issue(&store, &hasher(), &config).unwrap();
        let t2 = issue(&store, &hasher(), &config).unwrap();
        assert_ne!(t1.id(), t2.id());
        assert_ne!(t1.token(), t2.token());
    }

    #[test]
    fn test_issue_rejects_bad_prefix() {
        let store = MemoryCredentialStore::new();
        let result = issue(&store, &hasher(), &TokenConfig::new("bad_prefix"));
        assert!(matches!(result, Err(ApiTokenError::InvalidPrefix { .. })));
        assert!(store.is_empty());
    }

    #[test]
    fn test_issue_aborts_on_hash_failure() {
        let store = MemoryCredentialStore::new();
        let result = issue(&store, &CredentialHasher::with_cost(99), &TokenConfig::default());
        assert!(matches!(result, Err(ApiTokenError::HashingFailed(_))));
        assert!(store.is_empty());
    }

    #[test]
    fn test_issued_token_debug_is_redacted() {
        let store = MemoryCredentialStore::new();
        let issued = issue(&store, &hasher(), &TokenConfig::default()).unwrap();
        let rendered = format!("{:?}", issued);
        assert!(!rendered.contains(issued.token()));
    }
}
