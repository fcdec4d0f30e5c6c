//! Servers command handlers

use crate::cli::output::{format_servers_json, format_servers_table};
use crate::cli::ServersListArgs;
use crate::registry::{ServerKind, ServerRegistry};

/// Handle `rotor servers list` command
pub fn handle_servers_list(
    args: &ServersListArgs,
    registry: &ServerRegistry,
) -> Result<String, Box<dyn std::error::Error>> {
    let servers = match args.kind.as_deref() {
        Some("proxy") => registry.get_servers(ServerKind::Proxy),
        Some("relay") => registry.get_servers(ServerKind::Relay),
        Some(other) => return Err(format!("Unknown pool: {} (use proxy or relay)", other).into()),
        None => registry.get_all_servers(),
    };

    if args.json {
        Ok(format_servers_json(&servers))
    } else if servers.is_empty() {
        Ok("No servers configured.".to_string())
    } else {
        Ok(format_servers_table(&servers))
    }
}
