use anyhow::{Context, Result};
use colored::Colorize;
use std::path::Path;

use super::Environment;

pub async fn add_template(env: &Environment, topo_id: u64, file: &Path) -> Result<()> {
    let topology = tokio::fs::read_to_string(file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;

    env.store.add_template(topo_id, &topology).await?;
    println!("{}", format!("Stored template {}", topo_id).green());
    Ok(())
}

pub async fn add_user(env: &Environment, name: &str) -> Result<()> {
    env.store.add_user(name).await?;
    println!("{}", format!("Registered user {}", name.trim()).green());
    Ok(())
}

pub async fn list_sessions(env: &Environment) -> Result<()> {
    let sessions = env.store.list_sessions().await?;
    if sessions.is_empty() {
        println!("{}", "No sessions".bright_black());
        return Ok(());
    }

    println!("{}", format!("{:>6}  {:>6}  {}", "ID", "TOPO", "USER").bold());
    for session in sessions {
        println!("{:>6}  {:>6}  {}", session.id.to_string(), session.topo_id, session.user_id);
    }
    Ok(())
}
