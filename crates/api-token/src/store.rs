//! Credential storage seam.

use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::data::{TokenId, Verifier};
use crate::error::StoreError;

/// Durable home for verifiers.
///
/// Implementations own their concurrency: callers share one instance behind
/// an `Arc` and never hold a lock of their own.
pub trait CredentialStore: Send + Sync {
    /// Persist a verifier and return its freshly allocated identifier.
    /// Must not return before the write is durable.
    fn put(&self, verifier: &Verifier) -> Result<TokenId, StoreError>;

    /// Fetch the verifier for an identifier, `None` when unknown.
    fn get_by_identifier(&self, id: TokenId) -> Result<Option<Verifier>, StoreError>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    next_id: i64,
    verifiers: BTreeMap<i64, Verifier>,
}

/// Process-local store. Identifiers start at 1 like an autoincrement column.
#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    inner: RwLock<MemoryInner>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner
            .read()
            .map(|inner| inner.verifiers.len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn put(&self, verifier: &Verifier) -> Result<TokenId, StoreError> {
        let mut inner = self.inner.write().map_err(|_| StoreError::Poisoned)?;
        inner.next_id += 1;
        let id = inner.next_id;
        inner.verifiers.insert(id, verifier.clone());
        Ok(TokenId(id))
    }

    fn get_by_identifier(&self, id: TokenId) -> Result<Option<Verifier>, StoreError> {
        let inner = self.inner.read().map_err(|_| StoreError::Poisoned)?;
        Ok(inner.verifiers.get(&id.get()).cloned())
    }
}
