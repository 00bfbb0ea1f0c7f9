//! Opaque user identifiers for cross-device tracking

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use sha2::{Digest, Sha256};

/// Hash a user identifier with the site salt.
///
/// The raw identifier never leaves the site; the analytics provider only
/// sees a stable, salted digest.
pub fn hash_user_id(salt: &str, user_id: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(b":");
    hasher.update(user_id.as_bytes());
    URL_SAFE_NO_PAD.encode(hasher.finalize())
}
