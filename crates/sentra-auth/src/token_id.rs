//! Opaque token identifier minting.
//!
//! Identifiers issued here track tokens through the registry and rotation
//! engine without the core ever seeing the encoded token itself.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;

/// Generates a cryptographically secure random token identifier.
///
/// Returns a 256-bit random value encoded as base64url (43 characters).
#[must_use]
pub fn generate() -> String {
    let mut bytes = [0u8; 32];
    rand::Rng::fill(&mut rand::thread_rng(), &mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_shape() {
        let id = generate();

        // 32 bytes base64url encoded = 43 characters
        assert_eq!(id.len(), 43);
        assert!(
            id.chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        );
    }

    #[test]
    fn test_generate_uniqueness() {
        let ids: Vec<String> = (0..100).map(|_| generate()).collect();

        let mut unique = ids.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(ids.len(), unique.len());
    }
}
