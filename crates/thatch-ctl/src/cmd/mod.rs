//! CLI command modules.

pub mod chats;
pub mod control;
pub mod http;
pub mod users;
