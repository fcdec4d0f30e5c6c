//! Static pool member definitions.

use serde::{Deserialize, Serialize};

use crate::registry::ServerProtocol;

/// A statically configured pool member (`[[proxies]]` or `[[relays]]`).
///
/// The pool a server lands in is determined by which array it appears in;
/// when `protocol` is omitted it defaults to HTTP for proxies and SMTP for
/// relays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Registry id; defaults to "host:port" when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Hostname or IP
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Wire protocol override
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<ServerProtocol>,
    /// Optional credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    /// Admin enable flag
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}
