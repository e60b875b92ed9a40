//! Errors surfaced by the registries, the node and the peer client.

use thatch_core::wire::{ErrorBody, ErrorKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// A chat, user or peer is absent from its registry.
    #[error("{what} not found: {key}")]
    NotFound { what: &'static str, key: String },

    /// A signature did not verify, or a peer refused ours.
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// A dial, resolve or transport exchange with a peer failed.
    #[error("peer {addr} unreachable: {reason}")]
    Unreachable { addr: String, reason: String },

    /// The request itself is malformed or conflicts with existing state.
    #[error("invalid request: {0}")]
    Invalid(String),
}

impl ServiceError {
    pub fn not_found(what: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            what,
            key: key.into(),
        }
    }

    pub fn unreachable(addr: impl ToString, reason: impl ToString) -> Self {
        Self::Unreachable {
            addr: addr.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AuthenticationFailed(_) => ErrorKind::AuthenticationFailed,
            Self::Unreachable { .. } => ErrorKind::Unreachable,
            Self::Invalid(_) => ErrorKind::Invalid,
        }
    }

    pub fn to_body(&self) -> ErrorBody {
        ErrorBody {
            kind: self.kind(),
            message: self.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;
