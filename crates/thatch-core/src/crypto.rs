//! Node identity and message signatures.
//!
//! Every node holds one Ed25519 signing key. The identity token other nodes
//! know it by is the lowercase hex of the verifying key, so anyone holding a
//! token can check a signature without a separate key exchange.
//!
//! The secret is stored hex-encoded at a configurable path (mode 0600) and
//! zeroized when dropped.

use std::io::Write;
use std::path::Path;

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::rngs::OsRng;
use rand::RngCore;
use thiserror::Error;
use zeroize::Zeroizing;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("identity token is not a valid public key")]
    InvalidIdentity,
    #[error("signature is malformed")]
    MalformedSignature,
    #[error("signature does not match")]
    BadSignature,
    #[error("keypair file {path}: {reason}")]
    KeyFile { path: String, reason: String },
}

/// A node's long-term signing identity.
pub struct Identity {
    signing_key: SigningKey,
}

impl Identity {
    /// Generate a fresh random identity.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn from_secret_bytes(secret: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(secret),
        }
    }

    /// Load the identity stored at `path`, creating and persisting a new one
    /// if the file does not exist yet.
    pub fn load_or_create(path: &Path) -> Result<Self, CryptoError> {
        let key_err = |reason: String| CryptoError::KeyFile {
            path: path.display().to_string(),
            reason,
        };

        match std::fs::read_to_string(path) {
            Ok(text) => {
                let bytes = Zeroizing::new(
                    hex::decode(text.trim()).map_err(|e| key_err(e.to_string()))?,
                );
                let secret: [u8; 32] = bytes
                    .as_slice()
                    .try_into()
                    .map_err(|_| key_err("expected 32 bytes".into()))?;
                let secret = Zeroizing::new(secret);
                Ok(Self::from_secret_bytes(&secret))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let identity = Self::generate();
                identity.save(path).map_err(|e| key_err(e.to_string()))?;
                Ok(identity)
            }
            Err(e) => Err(key_err(e.to_string())),
        }
    }

    fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let text = Zeroizing::new(hex::encode(self.signing_key.as_bytes()));

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let mut file = options.open(path)?;
        file.write_all(text.as_bytes())?;
        file.sync_all()
    }

    /// Hex-encoded verifying key.
    pub fn token(&self) -> String {
        hex::encode(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign `message`, returning the hex-encoded signature.
    pub fn sign(&self, message: &[u8]) -> String {
        hex::encode(self.signing_key.sign(message).to_bytes())
    }
}

/// 16 random bytes, hex encoded.
pub fn random_nonce() -> String {
    let mut bytes = [0u8; 16];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Check a hex signature over `message` against the key encoded in `token`.
pub fn verify(token: &str, message: &[u8], signature: &str) -> Result<(), CryptoError> {
    let key_bytes: [u8; 32] = hex::decode(token)
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or(CryptoError::InvalidIdentity)?;
    let key = VerifyingKey::from_bytes(&key_bytes).map_err(|_| CryptoError::InvalidIdentity)?;

    let sig_bytes: [u8; 64] = hex::decode(signature)
        .ok()
        .and_then(|b| b.try_into().ok())
        .ok_or(CryptoError::MalformedSignature)?;
    let signature = Signature::from_bytes(&sig_bytes);

    key.verify(message, &signature)
        .map_err(|_| CryptoError::BadSignature)
}
