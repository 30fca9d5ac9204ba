//! Token parsing.

use std::fmt;

use data_encoding::BASE32_NOPAD;
use zeroize::Zeroize;

use crate::data::TokenId;
use crate::error::{ApiTokenError, Result};
use crate::secret::SECRET_LEN;
use crate::token::{CURRENT_VERSION, PAYLOAD_LEN};

/// Parsed components from a token string.
pub struct ParsedToken {
    /// The store identifier.
    pub id: TokenId,
    /// Token format version.
    pub version: i16,
    /// The secret (32 bytes).
    secret: [u8; SECRET_LEN],
}

impl ParsedToken {
    /// Get a reference to the secret bytes.
    pub fn secret(&self) -> &[u8; SECRET_LEN] {
        &self.secret
    }
}

impl fmt::Debug for ParsedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParsedToken")
            .field("id", &self.id)
            .field("version", &self.version)
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl Drop for ParsedToken {
    fn drop(&mut self) {
        // Clear secret from memory when dropped
        self.secret.zeroize();
    }
}

/// Parse a token string into its components.
///
/// # Arguments
/// * `token` - The full token string (e.g., "vi_v1_...")
/// * `expected_prefix` - The expected prefix (e.g., "vi")
///
/// # Returns
/// * `ParsedToken` containing id, version, and secret
/// * Error if token format is invalid
pub fn parse(token: &str, expected_prefix: &str) -> Result<ParsedToken> {
    // prefix_v{version}_{payload}
    let mut parts = token.split('_');
    let (Some(prefix), Some(version_str), Some(payload_str), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(ApiTokenError::InvalidFormat);
    };

    if prefix != expected_prefix {
        return Err(ApiTokenError::InvalidPrefix {
            expected: expected_prefix.to_string(),
            got: prefix.to_string(),
        });
    }

    // "v" followed by plain decimal digits, no sign or leading zero
    let version = version_str
        .strip_prefix('v')
        .filter(|v| is_canonical_number(v))
        .and_then(|v| v.parse::<i16>().ok())
        .ok_or(ApiTokenError::InvalidFormat)?;

    if version != CURRENT_VERSION {
        return Err(ApiTokenError::UnsupportedVersion(version));
    }

    // Decode base32 payload (case-insensitive)
    let mut upper = payload_str.to_ascii_uppercase();
    let decoded = BASE32_NOPAD.decode(upper.as_bytes());
    upper.zeroize();
    let mut payload = decoded.map_err(|_| ApiTokenError::InvalidEncoding)?;

    if payload.len() != PAYLOAD_LEN {
        payload.zeroize();
        return Err(ApiTokenError::InvalidFormat);
    }

    let mut id_bytes = [0u8; 8];
    id_bytes.copy_from_slice(&payload[..8]);
    let id = TokenId(i64::from_be_bytes(id_bytes));

    let mut secret = [0u8; SECRET_LEN];
    secret.copy_from_slice(&payload[8..]);
    payload.zeroize();

    Ok(ParsedToken {
        id,
        version,
        secret,
    })
}

fn is_canonical_number(digits: &str) -> bool {
    !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit())
        && (digits == "0" || !digits.starts_with('0'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::{Secret, generate};
    use crate::token::format_token;

    #[test]
    fn test_parse_valid_token() {
        let secret = generate().unwrap();
        let token = format_token("vi", TokenId(17), &secret);

        let parsed = parse(&token, "vi").unwrap();
        assert_eq!(parsed.id, TokenId(17));
        assert_eq!(parsed.version, CURRENT_VERSION);
        assert_eq!(parsed.secret(), secret.as_bytes());
    }

    #[test]
    fn test_parse_is_case_insensitive() {
        let secret = generate().unwrap();
        let token = format_token("vi", TokenId(3), &secret);
        let (head, payload) = token.split_at(6);
        let shouting = format!("{}{}", head, payload.to_uppercase());

        let parsed = parse(&shouting, "vi").unwrap();
        assert_eq!(parsed.id, TokenId(3));
    }

    #[test]
    fn test_parse_invalid_prefix() {
        let secret = generate().unwrap();
        let token = format_token("vi", TokenId(1), &secret);

        let result = parse(&token, "wrong");
        assert!(matches!(result, Err(ApiTokenError::InvalidPrefix { .. })));
    }

    #[test]
    fn test_parse_invalid_format() {
        assert!(matches!(
            parse("invalid_token", "vi"),
            Err(ApiTokenError::InvalidFormat)
        ));
        assert!(matches!(
            parse("vi_v1_aaaa_extra", "vi"),
            Err(ApiTokenError::InvalidFormat)
        ));
        assert!(matches!(
            parse("vi_x1_aaaa", "vi"),
            Err(ApiTokenError::InvalidFormat)
        ));
        assert!(matches!(parse("", "vi"), Err(ApiTokenError::InvalidFormat)));
    }

    #[test]
    fn test_parse_unsupported_version() {
        let result = parse("vi_v2_aaaa", "vi");
        assert!(matches!(result, Err(ApiTokenError::UnsupportedVersion(2))));
    }

    #[test]
    fn test_parse_invalid_encoding() {
        // 1, 8, 9, 0 are not in the base32 alphabet
        let result = parse("vi_v1_1890", "vi");
        assert!(matches!(
            result,
            Err(ApiTokenError::InvalidEncoding) | Err(ApiTokenError::InvalidFormat)
        ));
    }

    #[test]
    fn test_parse_short_payload() {
        let short = BASE32_NOPAD.encode(&[0u8; 16]).to_lowercase();
        let result = parse(&format!("vi_v1_{}", short), "vi");
        assert!(matches!(result, Err(ApiTokenError::InvalidFormat)));
    }

    #[test]
    fn test_parse_rejects_non_canonical_version() {
        let secret = generate().unwrap();
        let token = format_token("vi", TokenId(1), &secret);
        let payload = token.rsplit('_').next().unwrap();

        for version in ["v+1", "v+01", "v01", "v-1", "v 1", "v"] {
            let candidate = format!("vi_{}_{}", version, payload);
            assert!(
                matches!(parse(&candidate, "vi"), Err(ApiTokenError::InvalidFormat)),
                "{} should be rejected",
                version
            );
        }
        assert!(parse(&format!("vi_v1_{}", payload), "vi").is_ok());
    }

    #[test]
    fn test_debug_is_redacted() {
        let secret = Secret::from_bytes([0xAB; SECRET_LEN]);
        let token = format_token("vi", TokenId(1), &secret);

        let parsed = parse(&token, "vi").unwrap();
        let rendered = format!("{:?}", parsed);
        assert!(rendered.contains("<redacted>"));
        assert!(rendered.contains("TokenId(1)"));
        assert!(!rendered.contains("171"));
    }
}
