//! HMAC-SHA-256 signing of audit entries (spec §4.7).

use crate::error::{AuditError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

/// The server-side HMAC key. Never derived from anything in the audit log
/// itself — it must come from deployment configuration (e.g. an
/// environment variable), so a compromised database alone cannot forge a
/// valid chain.
pub struct AuditSigningKey(Vec<u8>);

impl AuditSigningKey {
    pub fn new(key_bytes: Vec<u8>) -> Result<Self> {
        if key_bytes.is_empty() {
            return Err(AuditError::EmptyKey);
        }
        Ok(Self(key_bytes))
    }

    pub fn from_env(var: &str) -> Result<Self> {
        let raw = std::env::var(var).unwrap_or_default();
        Self::new(raw.into_bytes())
    }
}

pub fn sign(key: &AuditSigningKey, payload: &[u8]) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(&key.0).expect("HMAC accepts any key length");
    mac.update(payload);
    hex::encode(mac.finalize().into_bytes())
}

pub fn hash_entry(entry_bytes: &[u8]) -> String {
    use sha2::Digest;
    let mut hasher = Sha256::new();
    hasher.update(entry_bytes);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_is_deterministic_for_same_key_and_payload() {
        let key = AuditSigningKey::new(b"secret".to_vec()).unwrap();
        assert_eq!(sign(&key, b"payload"), sign(&key, b"payload"));
    }

    #[test]
    fn signature_diverges_across_keys() {
        let a = AuditSigningKey::new(b"secret-a".to_vec()).unwrap();
        let b = AuditSigningKey::new(b"secret-b".to_vec()).unwrap();
        assert_ne!(sign(&a, b"payload"), sign(&b, b"payload"));
    }

    #[test]
    fn empty_key_is_rejected() {
        assert!(matches!(AuditSigningKey::new(Vec::new()), Err(AuditError::EmptyKey)));
    }
}
