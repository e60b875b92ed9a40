//! thatch-ctl: command-line client for the thatch daemon.

use std::path::PathBuf;

use anyhow::{Context, Result};

use thatch_core::config::ThatchConfig;

mod cmd;

use cmd::http::Control;

fn print_usage() {
    println!("Usage: thatch-ctl [--socket <path>] <command>");
    println!();
    println!("Commands:");
    println!("  status                 Show node identity and registry counts");
    println!("  users                  List known users");
    println!("  chats                  List chat ids");
    println!("  chat <id>              Show a chat and its messages");
    println!("  start <user>           Start a chat (identity, name or handle)");
    println!("  send <chat> <text..>   Send a message to a chat");
    println!("  scan                   Sweep the local subnet for peers");
    println!("  kill                   Shut the daemon down");
    println!();
    println!("Options:");
    println!("  --socket <path>   Control socket (default: from config)");
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    let mut socket: Option<PathBuf> = None;
    let mut remaining: Vec<&str> = Vec::new();
    let mut i = 0;
    while i < args.len() {
        if args[i] == "--socket" {
            i += 1;
            socket = Some(PathBuf::from(
                args.get(i).context("--socket requires a value")?,
            ));
        } else {
            remaining.push(&args[i]);
        }
        i += 1;
    }

    let socket = match socket {
        Some(path) => path,
        None => ThatchConfig::load().unwrap_or_default().control.socket_path,
    };
    let ctl = Control::new(&socket)?;

    match remaining.as_slice() {
        ["status"] | []                    => cmd::control::cmd_status(&ctl).await,
        ["users"]                          => cmd::users::cmd_users(&ctl).await,
        ["chats"]                          => cmd::chats::cmd_chats(&ctl).await,
        ["chat", id]                       => cmd::chats::cmd_chat(&ctl, id).await,
        ["start", user]                    => cmd::chats::cmd_start(&ctl, user).await,
        ["send", chat, text @ ..] if !text.is_empty() => {
            cmd::chats::cmd_send(&ctl, chat, &text.join(" ")).await
        }
        ["scan"]                           => cmd::control::cmd_scan(&ctl).await,
        ["kill"]                           => cmd::control::cmd_kill(&ctl).await,
        ["help"] | ["--help"] | ["-h"]     => { print_usage(); Ok(()) }
        other => {
            eprintln!("Unknown command: {}", other.join(" "));
            eprintln!();
            print_usage();
            std::process::exit(1);
        }
    }
}
