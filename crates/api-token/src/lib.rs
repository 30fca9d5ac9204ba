//! Bearer token issuance and verification.
//!
//! This crate provides functionality for:
//! - Generating 256-bit secrets from the operating system random source
//! - Hashing secrets into salted bcrypt verifiers for storage
//! - Formatting and parsing tokens that carry a store identifier next to the secret
//! - Deciding allow/deny for a presented credential in roughly constant effort
//!
//! # Token Format
//!
//! Tokens follow the format: `{prefix}_v{version}_{base32(id || secret)}`
//!
//! Example: `vi_v1_aaaaaaaaaaaaaaaj3q6m...`
//!
//! The identifier selects the stored verifier; the secret is only ever
//! compared through bcrypt.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use api_token::{
//!     AuthGate, CredentialHasher, Decision, MemoryCredentialStore, TokenConfig, issue,
//!     MIN_WORK_FACTOR,
//! };
//!
//! let store = Arc::new(MemoryCredentialStore::new());
//! let hasher = CredentialHasher::with_cost(MIN_WORK_FACTOR);
//! let config = TokenConfig::default();
//!
//! // Provision once and hand the token to the operator.
//! let issued = issue(store.as_ref(), &hasher, &config).unwrap();
//! println!("Your token: {}", issued.token());
//!
//! // Later, on each request.
//! let gate = AuthGate::new(store, hasher, &config).unwrap();
//! assert!(matches!(gate.decide(Some(issued.token())), Decision::Allowed(_)));
//! ```

mod config;
mod data;
mod error;
mod gate;
mod hash;
mod parse;
mod secret;
mod store;
mod token;

// Public re-exports
pub use config::{DEFAULT_PREFIX, TokenConfig};
pub use data::{TokenId, Verifier};
pub use error::{ApiTokenError, Result, StoreError};
pub use gate::{AuthGate, Decision, DenyReason, extract_credential, fingerprint};
pub use hash::{CredentialHasher, MAX_SECRET_LEN, MIN_WORK_FACTOR, WORK_FACTOR};
pub use parse::{ParsedToken, parse};
pub use secret::{SECRET_LEN, Secret, generate};
pub use store::{CredentialStore, MemoryCredentialStore};
pub use token::{CURRENT_VERSION, IssuedToken, format_token, issue};
