//! Opaque unique identifiers.

use rand::RngCore;
use rand::rngs::OsRng;

const ID_BYTES: usize = 16;

/// Generate a namespaced random identifier, e.g. `req_3fa9…`.
///
/// Callers only rely on "opaque unique string"; the namespace prefix is for
/// operators reading logs and blobs.
pub fn generate(prefix: &str) -> String {
    let mut bytes = [0u8; ID_BYTES];
    OsRng.fill_bytes(&mut bytes);
    format!("{prefix}_{}", hex::encode(bytes))
}
