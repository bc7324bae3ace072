//! Cryptographic primitives: Ed25519 signing/verification and SHA3-256 hashing.
//!
//! Key distribution and rotation are out of scope; attestors present a
//! verifying key at registration and keep their signing key to themselves.

use crate::core::{Error, Hash256, Result};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use sha3::{Digest, Sha3_256};

/// An Ed25519 keypair held by a signing party (e.g. an attestor node).
#[derive(Clone)]
pub struct SigningSuite {
    signing_key: SigningKey,
}

impl SigningSuite {
    /// Generate a fresh random keypair.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut csprng = rand::rngs::OsRng;
        let mut secret = [0u8; 32];
        csprng.fill_bytes(&mut secret);
        Self {
            signing_key: SigningKey::from_bytes(&secret),
        }
    }

    /// Restore a suite from existing secret key bytes.
    pub fn from_bytes(bytes: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(bytes),
        }
    }

    /// The verifying (public) half of the keypair.
    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Sign a message, returning the 64-byte signature.
    pub fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.signing_key.sign(message).to_bytes().to_vec()
    }
}

/// Verify a signature against a public key.
pub fn verify(public_key: &VerifyingKey, message: &[u8], signature: &[u8]) -> Result<()> {
    let sig_bytes: [u8; 64] = signature
        .try_into()
        .map_err(|_| Error::InvalidKeyFormat("invalid signature length".into()))?;
    let sig = Signature::from_bytes(&sig_bytes);
    public_key.verify(message, &sig)?;
    Ok(())
}

/// SHA3-256 hash of a byte slice.
pub fn sha3_256(data: &[u8]) -> Hash256 {
    let mut hasher = Sha3_256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&result);
    Hash256::new(bytes)
}

/// SHA3-256 hash over multiple chunks, fed in order.
pub fn sha3_256_multi(chunks: &[&[u8]]) -> Hash256 {
    let mut hasher = Sha3_256::new();
    for chunk in chunks {
        hasher.update(chunk);
    }
    let result = hasher.finalize();
    let mut bytes = [0u8; 32];
    bytes.copy_from_slice(&result);
    Hash256::new(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let suite = SigningSuite::generate();
        let message = b"sealed record hash";
        let signature = suite.sign(message);
        assert!(verify(&suite.verifying_key(), message, &signature).is_ok());
    }

    #[test]
    fn test_verify_rejects_wrong_message() {
        let suite = SigningSuite::generate();
        let signature = suite.sign(b"original");
        assert!(verify(&suite.verifying_key(), b"tampered", &signature).is_err());
    }

    #[test]
    fn test_verify_rejects_wrong_key() {
        let signer = SigningSuite::generate();
        let other = SigningSuite::generate();
        let signature = signer.sign(b"record");
        assert!(verify(&other.verifying_key(), b"record", &signature).is_err());
    }

    #[test]
    fn test_sha3_deterministic() {
        assert_eq!(sha3_256(b"payload"), sha3_256(b"payload"));
        assert_ne!(sha3_256(b"payload"), sha3_256(b"payloae"));
    }

    #[test]
    fn test_multi_chunk_matches_concat() {
        let joined = sha3_256(b"abcdef");
        let chunked = sha3_256_multi(&[b"abc", b"def"]);
        assert_eq!(joined, chunked);
    }

    #[test]
    fn test_suite_restore_from_bytes() {
        let suite = SigningSuite::generate();
        let restored = SigningSuite::from_bytes(&suite.signing_key.to_bytes());
        assert_eq!(
            suite.verifying_key().to_bytes(),
            restored.verifying_key().to_bytes()
        );
    }
}
