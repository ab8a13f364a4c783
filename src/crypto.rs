//! Public key token derivation.

use sha1::{Digest, Sha1};

/// Compute the public key token from a public key.
///
/// The public key token is the last 8 bytes of the SHA-1 hash, reversed.
#[must_use]
pub fn public_key_token(public_key: &[u8]) -> [u8; 8] {
    let hash = Sha1::digest(public_key);
    let mut token = [0u8; 8];
    for (dst, src) in token.iter_mut().zip(hash.iter().rev()) {
        *dst = *src;
    }
    token
}
