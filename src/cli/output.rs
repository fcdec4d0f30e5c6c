//! Output formatting helpers for CLI commands

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, Cell, ContentArrangement, Table};
use serde_json::json;

use crate::registry::ServerView;

/// Format server pools as a table
pub fn format_servers_table(servers: &[ServerView]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        "Id", "Kind", "Address", "Protocol", "Active", "Health", "Sends", "Success", "Latency",
    ]);

    for s in servers {
        let health_str = if s.is_healthy {
            format!("{} Healthy", health_icon(true)).green().to_string()
        } else {
            format!("{} Unhealthy", health_icon(false)).red().to_string()
        };
        let active_str = if s.is_active { "yes" } else { "no" };

        table.add_row(vec![
            Cell::new(&s.id),
            Cell::new(s.kind),
            Cell::new(format!("{}:{}", s.host, s.port)),
            Cell::new(format!("{:?}", s.protocol).to_lowercase()),
            Cell::new(active_str),
            Cell::new(health_str),
            Cell::new(s.total_requests),
            Cell::new(format!("{:.1}%", s.success_rate() * 100.0)),
            Cell::new(format!("{}ms", s.avg_response_time_ms)),
        ]);
    }

    table.to_string()
}

/// Format server pools as JSON
pub fn format_servers_json(servers: &[ServerView]) -> String {
    serde_json::to_string_pretty(&json!({
        "servers": servers
    }))
    .unwrap_or_else(|_| "{}".to_string())
}

/// Get status icon for a server's health
pub fn health_icon(is_healthy: bool) -> &'static str {
    if is_healthy {
        "✓"
    } else {
        "✗"
    }
}
