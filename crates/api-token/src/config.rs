//! Configuration for token issuance and parsing.

/// Default prefix for issued tokens ("vi" produces "vi_v1_...").
pub const DEFAULT_PREFIX: &str = "vi";

/// Configuration for token issuance and parsing.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// Prefix for token strings. Alphanumeric only.
    pub prefix: String,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl TokenConfig {
    /// Create a new config with the given prefix.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// A prefix must be non-empty ASCII alphanumeric so it can never
    /// collide with the `_` separator.
    pub fn is_valid_prefix(prefix: &str) -> bool {
        !prefix.is_empty() && prefix.bytes().all(|b| b.is_ascii_alphanumeric())
    }
}
