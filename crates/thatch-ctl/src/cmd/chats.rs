//! Chat commands.

use anyhow::Result;

use thatch_core::wire::{
    ChatResponse, ChatsResponse, SendMessageRequest, SendMessageResponse, StartChatRequest,
    StartChatResponse, UsersResponse,
};

use super::http::Control;
use super::users::resolve_user;

pub async fn cmd_chats(ctl: &Control) -> Result<()> {
    let resp: ChatsResponse = ctl.get("/chats").await?;
    if resp.chat_ids.is_empty() {
        println!("No chats yet.");
        return Ok(());
    }
    for id in &resp.chat_ids {
        println!("  {id}");
    }
    Ok(())
}

pub async fn cmd_chat(ctl: &Control, id: &str) -> Result<()> {
    let chat: ChatResponse = ctl.get(&format!("/chats/{id}")).await?;
    let users: UsersResponse = ctl.get("/users").await?;
    let name_of = |identity: &str| {
        users
            .users
            .iter()
            .find(|u| u.id == identity)
            .map(|u| u.name.clone())
            .unwrap_or_else(|| identity.get(..16).unwrap_or(identity).to_string())
    };

    println!("═══════════════════════════════════════");
    println!("  Chat {}", chat.id);
    println!(
        "  Members: {}",
        chat.members.iter().map(|m| name_of(m)).collect::<Vec<_>>().join(", ")
    );
    println!("═══════════════════════════════════════");
    if chat.messages.is_empty() {
        println!("  No messages.");
    }
    for m in &chat.messages {
        println!("  <{}> {}", name_of(&m.sender), m.text);
    }
    Ok(())
}

pub async fn cmd_start(ctl: &Control, user: &str) -> Result<()> {
    let target = resolve_user(ctl, user).await?;
    let resp: StartChatResponse = ctl
        .post_body("/chats", &StartChatRequest { target })
        .await?;
    println!("Chat started: {}", resp.chat_id);
    Ok(())
}

pub async fn cmd_send(ctl: &Control, chat_id: &str, text: &str) -> Result<()> {
    let resp: SendMessageResponse = ctl
        .post_body(
            &format!("/chats/{chat_id}/messages"),
            &SendMessageRequest {
                text: text.to_string(),
            },
        )
        .await?;
    println!("Sent to {} (#{})", resp.chat_id, resp.index);
    Ok(())
}
