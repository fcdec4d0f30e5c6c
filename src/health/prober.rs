//! Probe transport for health checks.

use async_trait::async_trait;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;

use crate::registry::ServerView;

use super::ProbeError;

/// Opens a liveness probe against one server.
///
/// The checker is generic over this trait so tests can substitute scripted
/// probers instead of real sockets.
#[async_trait]
pub trait Prober: Send + Sync {
    /// Probe a server, returning the round-trip time in milliseconds.
    async fn probe(&self, server: &ServerView) -> Result<u32, ProbeError>;
}

/// Default prober: a TCP connect to the server's host and port.
///
/// A completed handshake within the timeout counts as alive. No protocol
/// banner is read; SMTP relays and HTTP/SOCKS proxies all accept the same
/// cheap probe.
pub struct TcpProber {
    timeout: Duration,
}

impl TcpProber {
    pub fn new(timeout_seconds: u64) -> Self {
        Self {
            timeout: Duration::from_secs(timeout_seconds),
        }
    }
}

#[async_trait]
impl Prober for TcpProber {
    async fn probe(&self, server: &ServerView) -> Result<u32, ProbeError> {
        let addr = format!("{}:{}", server.host, server.port);
        let started = Instant::now();

        match tokio::time::timeout(self.timeout, TcpStream::connect(&addr)).await {
            Ok(Ok(_stream)) => Ok(started.elapsed().as_millis().min(u128::from(u32::MAX)) as u32),
            Ok(Err(e)) => Err(ProbeError::ConnectionFailed(e.to_string())),
            Err(_) => Err(ProbeError::Timeout(self.timeout.as_secs())),
        }
    }
}
