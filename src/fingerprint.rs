//! Deterministic request identity, used for both caching and coalescing.

use sha2::{Digest, Sha256};

use crate::descriptor::RequestDescriptor;

/// Derives the fingerprint of a request.
///
/// Pure function of the descriptor, its encoded body, and the auth bucket.
/// Fields are length-prefixed before hashing so no combination of field
/// contents can collide with another field boundary. Volatile inputs
/// (timestamps, nonces) are never part of the digest.
pub fn fingerprint(
    descriptor: &RequestDescriptor,
    body: Option<&[u8]>,
    auth_bucket: &str,
) -> String {
    let mut hasher = Sha256::new();
    update_field(&mut hasher, descriptor.method.as_str().as_bytes());
    update_field(&mut hasher, descriptor.url.as_bytes());
    update_field(&mut hasher, body.unwrap_or_default());
    update_field(&mut hasher, descriptor.response_type.as_str().as_bytes());
    update_field(&mut hasher, auth_bucket.as_bytes());
    hex::encode(hasher.finalize())
}

fn update_field(hasher: &mut Sha256, field: &[u8]) {
    hasher.update((field.len() as u64).to_le_bytes());
    hasher.update(field);
}

/// Buckets the current auth state without leaking the token.
///
/// Changing the token moves every subsequent request into a different bucket,
/// so cache entries and in-flight operations computed under the old auth
/// state are never reused across a token change.
pub fn auth_bucket(token: Option<&str>) -> String {
    match token {
        None => "anon".to_owned(),
        Some(token) => {
            let digest = Sha256::digest(token.as_bytes());
            hex::encode(&digest[..6])
        }
    }
}
