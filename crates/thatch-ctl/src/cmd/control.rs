//! Daemon status, scan and shutdown commands.

use anyhow::Result;

use thatch_core::wire::{KillResponse, ScanResponse, StatusResponse};

use super::http::Control;

pub async fn cmd_status(ctl: &Control) -> Result<()> {
    let resp: StatusResponse = ctl.get("/status").await?;

    println!("═══════════════════════════════════════");
    println!("  thatch Node Status");
    println!("═══════════════════════════════════════");
    println!("  Name         : {}", resp.name);
    println!("  Identity     : {}", resp.id);
    println!("  Users known  : {}", resp.users);
    println!("  Peers        : {}", resp.peers);
    println!("  Chats        : {}", resp.chats);
    println!("  Verification : {}", resp.verification);
    Ok(())
}

pub async fn cmd_scan(ctl: &Control) -> Result<()> {
    let resp: ScanResponse = ctl.post("/scan").await?;
    if resp.queued {
        println!("Scan queued. Run `thatch-ctl users` shortly to see who answered.");
    } else {
        println!("Scan not queued: the daemon is shutting down.");
    }
    Ok(())
}

pub async fn cmd_kill(ctl: &Control) -> Result<()> {
    let resp: KillResponse = ctl.post("/kill").await?;
    println!("{}", resp.message);
    Ok(())
}
