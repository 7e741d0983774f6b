//! RS256 signing key management.
//!
//! Tokens are signed with a single process-wide RSA key pair, loaded once
//! at startup and shared read-only. Resolution order mirrors the rest of
//! the configuration: explicit env PEM → env file path → persisted dev key
//! → freshly generated key persisted for next start.

use std::path::PathBuf;

use jsonwebtoken::{DecodingKey, EncodingKey};
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use tracing::info;

use super::AuthError;

/// Dev keys are 2048-bit; production deployments provide their own PEM.
const RSA_KEY_BITS: usize = 2048;

/// Process-wide RS256 key pair.
pub struct SigningKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    kid: String,
}

impl SigningKeys {
    /// Build a key pair from a PKCS#8 private-key PEM; the public half is
    /// derived from it.
    pub fn from_private_pem(private_pem: &str) -> Result<Self, AuthError> {
        let private_key = RsaPrivateKey::from_pkcs8_pem(private_pem)
            .map_err(|e| AuthError::SigningKey(format!("parse private key PEM: {e}")))?;
        let public_pem = RsaPublicKey::from(&private_key)
            .to_public_key_pem(LineEnding::LF)
            .map_err(|e| AuthError::SigningKey(format!("encode public key PEM: {e}")))?;

        let encoding = EncodingKey::from_rsa_pem(private_pem.as_bytes())
            .map_err(|e| AuthError::SigningKey(format!("build encoding key: {e}")))?;
        let decoding = DecodingKey::from_rsa_pem(public_pem.as_bytes())
            .map_err(|e| AuthError::SigningKey(format!("build decoding key: {e}")))?;

        Ok(Self {
            encoding,
            decoding,
            kid: fingerprint(&public_pem),
        })
    }

    /// Generate a fresh key pair, returning it with the private PEM so the
    /// caller can persist it.
    pub fn generate() -> Result<(Self, String), AuthError> {
        let mut rng = rand_core::OsRng;
        let private_key = RsaPrivateKey::new(&mut rng, RSA_KEY_BITS)
            .map_err(|e| AuthError::SigningKey(format!("generate RSA key: {e}")))?;
        let private_pem = private_key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| AuthError::SigningKey(format!("encode private key PEM: {e}")))?
            .to_string();
        let keys = Self::from_private_pem(&private_pem)?;
        Ok((keys, private_pem))
    }

    /// Resolve the signing key: env var `TESSERA_SIGNING_KEY_PEM` →
    /// `TESSERA_SIGNING_KEY_FILE` → persisted dev key → generate & persist.
    pub fn resolve() -> Result<Self, AuthError> {
        if let Ok(pem) = std::env::var("TESSERA_SIGNING_KEY_PEM")
            && !pem.is_empty()
        {
            return Self::from_private_pem(&pem);
        }
        if let Ok(path) = std::env::var("TESSERA_SIGNING_KEY_FILE")
            && !path.is_empty()
        {
            let pem = std::fs::read_to_string(&path)
                .map_err(|e| AuthError::SigningKey(format!("read {path}: {e}")))?;
            return Self::from_private_pem(&pem);
        }

        let key_path = signing_key_path();
        if let Ok(existing) = std::fs::read_to_string(&key_path) {
            let trimmed = existing.trim();
            if !trimmed.is_empty() {
                return Self::from_private_pem(trimmed);
            }
        }

        let (keys, private_pem) = Self::generate()?;
        if let Some(parent) = key_path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = std::fs::write(&key_path, &private_pem);
        info!(path = %key_path.display(), kid = %keys.kid, "generated new signing key");
        Ok(keys)
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding
    }

    pub fn decoding_key(&self) -> &DecodingKey {
        &self.decoding
    }

    /// Key id stamped into token headers, stable per public key.
    pub fn kid(&self) -> &str {
        &self.kid
    }
}

/// Path to the persisted dev signing key.
fn signing_key_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tessera")
        .join("signing-key.pem")
}

/// First 16 hex chars of the public PEM's SHA-256.
fn fingerprint(public_pem: &str) -> String {
    let digest = Sha256::digest(public_pem.as_bytes());
    let hex = format!("{digest:x}");
    hex[..16].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_keys_round_trip_through_pem() {
        let (keys, private_pem) = SigningKeys::generate().unwrap();
        let reloaded = SigningKeys::from_private_pem(&private_pem).unwrap();
        // Same key material yields the same fingerprint
        assert_eq!(keys.kid(), reloaded.kid());
        assert_eq!(keys.kid().len(), 16);
    }
}
