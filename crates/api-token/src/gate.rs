//! Request-time allow/deny decisions.
//!
//! The gate never returns an error: every failure becomes a [`Decision::Denied`]
//! whose reason is for logs and metrics only. Callers answer every denial the
//! same way.

use std::fmt;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::config::TokenConfig;
use crate::data::{TokenId, Verifier};
use crate::error::Result;
use crate::hash::CredentialHasher;
use crate::parse::parse;
use crate::secret::generate;
use crate::store::CredentialStore;

/// Why a request was denied. Internal diagnostics only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenyReason {
    MissingCredential,
    MalformedCredential,
    UnknownCredential,
    InvalidCredential,
    CorruptVerifier,
    LookupFailed,
    WorkerUnavailable,
}

impl DenyReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenyReason::MissingCredential => "missing_credential",
            DenyReason::MalformedCredential => "malformed_credential",
            DenyReason::UnknownCredential => "unknown_credential",
            DenyReason::InvalidCredential => "invalid_credential",
            DenyReason::CorruptVerifier => "corrupt_verifier",
            DenyReason::LookupFailed => "lookup_failed",
            DenyReason::WorkerUnavailable => "worker_unavailable",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one authentication attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed(TokenId),
    Denied(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed(_))
    }

    pub fn token_id(&self) -> Option<TokenId> {
        match self {
            Decision::Allowed(id) => Some(*id),
            Decision::Denied(_) => None,
        }
    }
}

/// Pull the credential out of an `Authorization` header value.
///
/// Accepts a bare token or `Bearer <token>` (scheme is case-insensitive).
/// Blank values count as missing.
pub fn extract_credential(header: Option<&str>) -> Option<&str> {
    let value = header?.trim();
    let value = match value.get(..7) {
        Some(scheme) if scheme.eq_ignore_ascii_case("bearer ") => value[7..].trim(),
        _ => value,
    };
    if value.is_empty() || value.eq_ignore_ascii_case("bearer") {
        None
    } else {
        Some(value)
    }
}

/// Short, non-reversible tag for a presented credential, safe to log.
pub fn fingerprint(presented: &str) -> String {
    let digest = Sha256::digest(presented.as_bytes());
    hex::encode(&digest[..6])
}

/// Decides whether a presented credential is allowed.
pub struct AuthGate {
    store: Arc<dyn CredentialStore>,
    hasher: CredentialHasher,
    prefix: String,
    // Verified against when the identifier is unknown so every well-formed
    // credential costs one full hash. bcrypt verifies at the cost embedded in
    // each stored verifier, so the decoy only matches verifiers minted at
    // `hasher.cost()`. Reissue tokens after changing the work factor.
    decoy: Verifier,
}

impl AuthGate {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        hasher: CredentialHasher,
        config: &TokenConfig,
    ) -> Result<Self> {
        let decoy = hasher.hash(generate()?)?;
        Ok(Self {
            store,
            hasher,
            prefix: config.prefix.clone(),
            decoy,
        })
    }

    /// Run the full check for one request. Blocks for the duration of a
    /// hash; async callers should go through a worker pool.
    pub fn decide(&self, header: Option<&str>) -> Decision {
        let Some(presented) = extract_credential(header) else {
            log::info!("auth denied: {}", DenyReason::MissingCredential);
            return Decision::Denied(DenyReason::MissingCredential);
        };

        let fp = fingerprint(presented);
        let decision = self.check(presented, &fp);
        match decision {
            Decision::Allowed(id) => log::debug!("auth allowed: id={} fp={}", id, fp),
            Decision::Denied(reason) => log::info!("auth denied: {} fp={}", reason, fp),
        }
        decision
    }

    fn check(&self, presented: &str, fp: &str) -> Decision {
        let parsed = match parse(presented, &self.prefix) {
            Ok(parsed) => parsed,
            Err(_) => return Decision::Denied(DenyReason::MalformedCredential),
        };

        let stored = match self.store.get_by_identifier(parsed.id) {
            Ok(Some(verifier)) => verifier,
            Ok(None) => {
                self.burn(parsed.secret());
                return Decision::Denied(DenyReason::UnknownCredential);
            }
            Err(e) => {
                log::error!("credential lookup failed: id={} fp={}: {}", parsed.id, fp, e);
                self.burn(parsed.secret());
                return Decision::Denied(DenyReason::LookupFailed);
            }
        };

        match self.hasher.verify(parsed.secret(), &stored) {
            Ok(true) => Decision::Allowed(parsed.id),
            Ok(false) => Decision::Denied(DenyReason::InvalidCredential),
            Err(e) => {
                log::error!("stored verifier is corrupt: id={}: {}", parsed.id, e);
                Decision::Denied(DenyReason::CorruptVerifier)
            }
        }
    }

    fn burn(&self, candidate: &[u8]) {
        let _ = self.hasher.verify(candidate, &self.decoy);
    }
}
