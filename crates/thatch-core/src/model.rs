//! Node-local data model: users, chats and the messages inside them.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Separator between a display handle and its discriminator, e.g. `alice#3f9a`.
pub const DISCRIMINATOR_SEPARATOR: char = '#';

/// A display identity.
///
/// `id` is the identity token (hex Ed25519 verifying key). `name` is what the
/// owner chose to be called and may carry a discriminator suffix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    pub id: String,
}

impl User {
    pub fn new(name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: id.into(),
        }
    }

    /// The display name without its discriminator.
    pub fn handle(&self) -> &str {
        self.name
            .split(DISCRIMINATOR_SEPARATOR)
            .next()
            .unwrap_or(&self.name)
    }
}

/// A single chat line. Immutable once appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Identity token of the author.
    pub sender: String,
    pub text: String,
}

/// A conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    /// Identity tokens of every participant, this node's own included.
    pub members: BTreeSet<String>,
    /// Messages in arrival order.
    pub messages: Vec<Message>,
}

impl Chat {
    pub fn new(id: impl Into<String>, members: BTreeSet<String>) -> Self {
        Self {
            id: id.into(),
            members,
            messages: Vec::new(),
        }
    }

    pub fn has_member(&self, identity: &str) -> bool {
        self.members.contains(identity)
    }

    /// Members other than `own_identity`.
    pub fn others<'a>(&'a self, own_identity: &'a str) -> impl Iterator<Item = &'a String> + 'a {
        self.members.iter().filter(move |m| m.as_str() != own_identity)
    }
}
