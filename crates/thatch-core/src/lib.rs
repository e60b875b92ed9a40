//! thatch-core: shared data model, wire types, configuration and identity.
//! All other thatch crates depend on this one.

pub mod config;
pub mod crypto;
pub mod model;
pub mod wire;

pub use model::{Chat, Message, User};
