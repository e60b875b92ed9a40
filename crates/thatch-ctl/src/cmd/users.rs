//! User listing and lookup.

use anyhow::{Result, bail};

use thatch_core::User;
use thatch_core::wire::UsersResponse;

use super::http::Control;

pub async fn cmd_users(ctl: &Control) -> Result<()> {
    let resp: UsersResponse = ctl.get("/users").await?;

    println!("═══════════════════════════════════════");
    println!("  Known Users ({})", resp.users.len());
    println!("═══════════════════════════════════════");
    for u in &resp.users {
        println!("  {:<24} {}", u.name, u.id);
    }
    Ok(())
}

/// Resolve an identity token, full name or bare handle to an identity token.
pub async fn resolve_user(ctl: &Control, query: &str) -> Result<String> {
    let resp: UsersResponse = ctl.get("/users").await?;
    pick(&resp.users, query)
}

fn pick(users: &[User], query: &str) -> Result<String> {
    if let Some(u) = users.iter().find(|u| u.id == query || u.name == query) {
        return Ok(u.id.clone());
    }
    let by_handle: Vec<&User> = users.iter().filter(|u| u.handle() == query).collect();
    match by_handle.as_slice() {
        [one] => Ok(one.id.clone()),
        [] => bail!("no known user matches {query:?}; try `thatch-ctl scan`"),
        many => bail!(
            "{query:?} is ambiguous: {}",
            many.iter().map(|u| u.name.as_str()).collect::<Vec<_>>().join(", ")
        ),
    }
}
