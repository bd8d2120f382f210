//! Salted password digests for users and admins.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use uuid::Uuid;

/// Digest and salt pair as persisted in the `password` and `salt` columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaltedPassword {
    pub digest: String,
    pub salt: String,
}

/// Hash a plaintext password with a freshly generated salt.
pub fn hash_password(plain: &str) -> SaltedPassword {
    let salt = Uuid::new_v4().simple().to_string();
    let digest = digest_with_salt(plain, &salt);
    SaltedPassword { digest, salt }
}

pub fn digest_with_salt(plain: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(plain.as_bytes());
    hasher.update(salt.as_bytes());
    hex::encode(hasher.finalize().to_vec())
}

/// Compare a candidate password against a stored digest in constant time.
pub fn verify_password(plain: &str, salt: &str, digest: &str) -> bool {
    let candidate = digest_with_salt(plain, salt);
    candidate.as_bytes().ct_eq(digest.as_bytes()).into()
}
