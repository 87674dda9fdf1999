//! Content hashing using SHA-1.
//!
//! Every stored object — blob bytes and serialized commits — is keyed
//! by its 160-bit digest, rendered as 40 lowercase hex characters.

use sha1::{Digest, Sha1};

/// Compute the SHA-1 digest of arbitrary bytes as a hex string.
pub fn sha1_hex(data: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(data);
    let digest = hasher.finalize();
    digest.iter().map(|b| format!("{b:02x}")).collect()
}
