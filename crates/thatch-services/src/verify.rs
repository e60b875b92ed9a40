//! Signature verification for peer-originated requests.
//!
//! Two modes, picked from config:
//! - `none`:    trust on first use, every signature accepted (insecure)
//! - `ed25519`: the signature must verify against the asserted identity token

use std::sync::Arc;

use thatch_core::config::VerificationMode;
use thatch_core::crypto;

/// Decides whether `signature` over `message` was produced by `identity`.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, signature: &str, message: &[u8], identity: &str) -> bool;

    fn mode(&self) -> VerificationMode;
}

/// Accepts everything. Matches the behaviour of nodes that never sign.
pub struct AcceptAll;

impl SignatureVerifier for AcceptAll {
    fn verify(&self, _signature: &str, _message: &[u8], _identity: &str) -> bool {
        true
    }

    fn mode(&self) -> VerificationMode {
        VerificationMode::None
    }
}

pub struct Ed25519Verifier;

impl SignatureVerifier for Ed25519Verifier {
    fn verify(&self, signature: &str, message: &[u8], identity: &str) -> bool {
        match crypto::verify(identity, message, signature) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(
                    peer = crate::short(identity),
                    error = %e,
                    "signature rejected"
                );
                false
            }
        }
    }

    fn mode(&self) -> VerificationMode {
        VerificationMode::Ed25519
    }
}

pub fn verifier_for(mode: VerificationMode) -> Arc<dyn SignatureVerifier> {
    match mode {
        VerificationMode::None => Arc::new(AcceptAll),
        VerificationMode::Ed25519 => Arc::new(Ed25519Verifier),
    }
}
