use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};

/// Which pool a server belongs to.
///
/// Proxies front the connection to the carrier gateway; relays are the
/// outbound SMTP servers that deliver the actual message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerKind {
    /// HTTP/SOCKS proxy used to tunnel outbound connections
    Proxy,
    /// SMTP relay used to deliver via carrier SMTP-to-SMS gateways
    Relay,
}

impl std::fmt::Display for ServerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerKind::Proxy => write!(f, "proxy"),
            ServerKind::Relay => write!(f, "relay"),
        }
    }
}

/// Wire protocol spoken by a pool member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerProtocol {
    /// Plain SMTP (STARTTLS negotiated by the sender)
    Smtp,
    /// SMTP over implicit TLS
    Smtps,
    /// HTTP CONNECT proxy
    Http,
    /// SOCKS5 proxy
    Socks5,
}

/// A member of the proxy or relay pool.
///
/// Contains both configuration and runtime state. Lifetime counters are
/// atomic so concurrent send workers can update them without locking the
/// whole record; health fields are plain and mutated only under the
/// registry's per-entry lock.
///
/// Ownership rules: `is_healthy` and `consecutive_health_failures` are
/// written only through health-check results, send-outcome recording writes
/// the request counters. Selection code never mutates a record.
#[derive(Debug)]
pub struct ServerRecord {
    /// Unique identifier (config name, or "host:port" when unnamed)
    pub id: String,
    /// Pool this server belongs to
    pub kind: ServerKind,
    /// Hostname or IP
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Protocol spoken by this server
    pub protocol: ServerProtocol,
    /// Optional credentials
    pub username: Option<String>,
    pub password: Option<String>,
    /// Admin-controlled enable flag
    pub is_active: bool,
    /// Derived health flag, written only from probe results
    pub is_healthy: bool,
    /// Consecutive failed probes since the last success
    pub consecutive_health_failures: u32,
    /// When the last probe completed
    pub last_health_check: Option<DateTime<Utc>>,
    /// Last probe error (if any)
    pub last_error: Option<String>,
    /// Lifetime send attempts routed through this server (atomic)
    pub total_requests: AtomicU64,
    /// Lifetime successful sends (atomic)
    pub successful_requests: AtomicU64,
    /// Lifetime failed sends (atomic)
    pub failed_requests: AtomicU64,
    /// Rolling average response time in milliseconds (atomic, EMA)
    pub avg_response_time_ms: AtomicU32,
}

impl ServerRecord {
    /// Create a new record with zeroed counters.
    ///
    /// A freshly added active server starts healthy: the pool must be usable
    /// before the first probe cycle completes, and probes will demote it if
    /// it turns out to be dead.
    pub fn new(
        id: String,
        kind: ServerKind,
        host: String,
        port: u16,
        protocol: ServerProtocol,
        username: Option<String>,
        password: Option<String>,
    ) -> Self {
        Self {
            id,
            kind,
            host,
            port,
            protocol,
            username,
            password,
            is_active: true,
            is_healthy: true,
            consecutive_health_failures: 0,
            last_health_check: None,
            last_error: None,
            total_requests: AtomicU64::new(0),
            successful_requests: AtomicU64::new(0),
            failed_requests: AtomicU64::new(0),
            avg_response_time_ms: AtomicU32::new(0),
        }
    }

    /// Fold a response-time sample into the rolling average.
    ///
    /// EMA with alpha=0.2 in integer math: new = (sample + 4*old) / 5.
    /// The first sample sets the initial value directly.
    pub fn update_response_time(&self, sample_ms: u32) {
        loop {
            let current = self.avg_response_time_ms.load(Ordering::SeqCst);
            let new_val = if current == 0 {
                sample_ms
            } else {
                (sample_ms + 4 * current) / 5
            };
            match self.avg_response_time_ms.compare_exchange(
                current,
                new_val,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return,
                Err(_) => continue,
            }
        }
    }
}

/// Snapshot of a [`ServerRecord`] with atomic fields flattened.
///
/// Selection, stats views, and JSON output all work on views; the live
/// record stays inside the registry. Credentials are carried so the caller
/// can open the actual connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerView {
    pub id: String,
    pub kind: ServerKind,
    pub host: String,
    pub port: u16,
    pub protocol: ServerProtocol,
    pub username: Option<String>,
    pub password: Option<String>,
    pub is_active: bool,
    pub is_healthy: bool,
    pub consecutive_health_failures: u32,
    pub last_health_check: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub total_requests: u64,
    pub successful_requests: u64,
    pub failed_requests: u64,
    pub avg_response_time_ms: u32,
}

impl From<&ServerRecord> for ServerView {
    fn from(server: &ServerRecord) -> Self {
        Self {
            id: server.id.clone(),
            kind: server.kind,
            host: server.host.clone(),
            port: server.port,
            protocol: server.protocol,
            username: server.username.clone(),
            password: server.password.clone(),
            is_active: server.is_active,
            is_healthy: server.is_healthy,
            consecutive_health_failures: server.consecutive_health_failures,
            last_health_check: server.last_health_check,
            last_error: server.last_error.clone(),
            total_requests: server.total_requests.load(Ordering::SeqCst),
            successful_requests: server.successful_requests.load(Ordering::SeqCst),
            failed_requests: server.failed_requests.load(Ordering::SeqCst),
            avg_response_time_ms: server.avg_response_time_ms.load(Ordering::SeqCst),
        }
    }
}

impl ServerView {
    /// Lifetime success rate over completed sends, in [0, 1].
    pub fn success_rate(&self) -> f64 {
        let attempts = self.successful_requests + self.failed_requests;
        self.successful_requests as f64 / attempts.max(1) as f64
    }
}
