//! Local Ed25519 signer and offline signature verification.
//!
//! `Ed25519Signer` keeps the key in process memory.  Deployments that keep
//! the key in an HSM implement `EventSigner` themselves; the ledger only
//! depends on the trait.

use async_trait::async_trait;
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;

use vcp_contracts::{
    error::{VcpError, VcpResult},
    event::SignAlgo,
};

use crate::traits::EventSigner;

/// In-memory Ed25519 key.
pub struct Ed25519Signer {
    key: SigningKey,
}

impl Ed25519Signer {
    /// Fresh random key from the OS RNG.
    pub fn generate() -> Self {
        Self {
            key: SigningKey::generate(&mut OsRng),
        }
    }

    /// Deterministic key from a 32-byte seed.
    pub fn from_seed(seed: [u8; 32]) -> Self {
        Self {
            key: SigningKey::from_bytes(&seed),
        }
    }

    /// Key from a hex-encoded 32-byte seed, as stored in node configuration.
    pub fn from_seed_hex(seed_hex: &str) -> VcpResult<Self> {
        let bytes = hex::decode(seed_hex.trim()).map_err(|e| VcpError::ConfigError {
            reason: format!("signing seed is not hex: {e}"),
        })?;
        let seed: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| VcpError::ConfigError {
            reason: format!("signing seed must be 32 bytes, got {}", b.len()),
        })?;
        Ok(Self::from_seed(seed))
    }
}

impl std::fmt::Debug for Ed25519Signer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519Signer")
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl EventSigner for Ed25519Signer {
    fn algorithm(&self) -> SignAlgo {
        SignAlgo::Ed25519
    }

    fn public_key_hex(&self) -> String {
        hex::encode(self.key.verifying_key().to_bytes())
    }

    async fn sign(&self, digest: &[u8; 32]) -> VcpResult<Vec<u8>> {
        Ok(self.key.sign(digest).to_bytes().to_vec())
    }
}

/// Check a hex Ed25519 signature over `digest` against a hex public key.
///
/// Malformed keys or signatures verify as `false`; this is used by offline
/// certificate checks where the answer, not the reason, is reported.
pub fn verify_signature(public_key_hex: &str, digest: &[u8; 32], signature_hex: &str) -> bool {
    let Ok(key_bytes) = hex::decode(public_key_hex) else {
        return false;
    };
    let Ok(key_bytes) = <[u8; 32]>::try_from(key_bytes.as_slice()) else {
        return false;
    };
    let Ok(key) = VerifyingKey::from_bytes(&key_bytes) else {
        return false;
    };
    let Ok(sig_bytes) = hex::decode(signature_hex) else {
        return false;
    };
    let Ok(signature) = Signature::from_slice(&sig_bytes) else {
        return false;
    };
    key.verify(digest, &signature).is_ok()
}
