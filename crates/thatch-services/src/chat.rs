//! Every conversation this node takes part in.
//!
//! Appends to one chat serialise on that chat's shard lock, so the message
//! order observed by `get` is the order appends acquired the lock.

use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use rand::RngCore;
use thatch_core::{Chat, Message};

use crate::error::{Result, ServiceError};

/// Generate a random 128-bit chat id, hex-encoded.
pub fn new_chat_id() -> String {
    let mut bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[derive(Clone, Default)]
pub struct ChatRegistry {
    chats: Arc<DashMap<String, Chat>>,
}

impl ChatRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty chat with a fresh unique id.
    pub fn create(&self, members: BTreeSet<String>) -> Chat {
        loop {
            let id = new_chat_id();
            if let Entry::Vacant(slot) = self.chats.entry(id.clone()) {
                let chat = Chat::new(id, members);
                slot.insert(chat.clone());
                return chat;
            }
        }
    }

    /// Create a chat under a caller-chosen id, or return the existing one if
    /// it already has exactly these members.
    pub fn open(&self, id: &str, members: BTreeSet<String>) -> Result<Chat> {
        match self.chats.entry(id.to_string()) {
            Entry::Occupied(existing) if existing.get().members == members => {
                Ok(existing.get().clone())
            }
            Entry::Occupied(_) => Err(ServiceError::Invalid(format!(
                "chat id {id} already in use"
            ))),
            Entry::Vacant(slot) => {
                let chat = Chat::new(id, members);
                slot.insert(chat.clone());
                Ok(chat)
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<Chat> {
        self.chats.get(id).map(|c| c.value().clone())
    }

    /// Unordered snapshot of chat ids.
    pub fn ids(&self) -> Vec<String> {
        self.chats.iter().map(|c| c.key().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.chats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chats.is_empty()
    }

    pub fn has_member(&self, id: &str, identity: &str) -> bool {
        self.chats
            .get(id)
            .map(|c| c.has_member(identity))
            .unwrap_or(false)
    }

    /// Id of a chat `identity` belongs to, preferring the lowest id so the
    /// choice is stable.
    pub fn find_by_member(&self, identity: &str) -> Option<String> {
        self.chats
            .iter()
            .filter(|c| c.has_member(identity))
            .map(|c| c.key().clone())
            .min()
    }

    /// Append a message, returning its index. Never creates a chat.
    pub fn append(&self, id: &str, sender: &str, text: &str) -> Result<usize> {
        let mut chat = self
            .chats
            .get_mut(id)
            .ok_or_else(|| ServiceError::not_found("chat", id))?;
        chat.messages.push(Message {
            sender: sender.to_string(),
            text: text.to_string(),
        });
        Ok(chat.messages.len() - 1)
    }
}
