//! Server registry module.
//!
//! Thread-safe in-memory storage of proxy and relay pool members with their
//! live health state and lifetime counters. Insertion order is preserved per
//! pool so round-robin cursors index a stable sequence.

mod error;
mod server;

pub use error::*;
pub use server::*;

use dashmap::DashMap;
use std::sync::atomic::Ordering;
use std::sync::RwLock;

use crate::config::{EngineConfig, ServerConfig};

/// Health transition resulting from a probe, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthTransition {
    Unchanged,
    BecameHealthy,
    BecameUnhealthy,
}

/// The server registry stores all pool members.
///
/// Uses a lock-free concurrent map (DashMap) keyed by server id, plus an
/// insertion-order index guarded by an RwLock. The index is read on every
/// selection and written only when servers are added or removed, so the lock
/// is effectively uncontended on the send path.
#[derive(Debug)]
pub struct ServerRegistry {
    servers: DashMap<String, ServerRecord>,
    order: RwLock<Vec<String>>,
    failure_threshold: u32,
}

impl ServerRegistry {
    /// Create an empty registry with the default unhealthy threshold (3).
    pub fn new() -> Self {
        Self::with_failure_threshold(3)
    }

    /// Create an empty registry with a custom consecutive-failure threshold.
    pub fn with_failure_threshold(failure_threshold: u32) -> Self {
        Self {
            servers: DashMap::new(),
            order: RwLock::new(Vec::new()),
            failure_threshold,
        }
    }

    /// Add a server to the registry.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::DuplicateServer` if the id is already taken.
    pub fn add_server(&self, server: ServerRecord) -> Result<(), RegistryError> {
        let id = server.id.clone();
        if self.servers.contains_key(&id) {
            return Err(RegistryError::DuplicateServer(id));
        }

        self.servers.insert(id.clone(), server);
        self.order
            .write()
            .expect("registry order lock poisoned")
            .push(id);
        Ok(())
    }

    /// Remove a server, returning its final state.
    ///
    /// # Errors
    ///
    /// Returns `RegistryError::ServerNotFound` if the id is unknown.
    pub fn remove_server(&self, id: &str) -> Result<ServerRecord, RegistryError> {
        let server = self
            .servers
            .remove(id)
            .map(|(_, server)| server)
            .ok_or_else(|| RegistryError::ServerNotFound(id.to_string()))?;

        self.order
            .write()
            .expect("registry order lock poisoned")
            .retain(|sid| sid != id);
        Ok(server)
    }

    /// Get a snapshot of a server by id.
    pub fn get_server(&self, id: &str) -> Option<ServerView> {
        self.servers.get(id).map(|entry| entry.value().into())
    }

    /// Snapshots of all servers in insertion order.
    pub fn get_all_servers(&self) -> Vec<ServerView> {
        let order = self.order.read().expect("registry order lock poisoned");
        order
            .iter()
            .filter_map(|id| self.get_server(id))
            .collect()
    }

    /// Snapshots of all servers of one pool in insertion order.
    pub fn get_servers(&self, kind: ServerKind) -> Vec<ServerView> {
        self.get_all_servers()
            .into_iter()
            .filter(|s| s.kind == kind)
            .collect()
    }

    /// Ordered snapshots of the servers eligible for selection.
    ///
    /// Only servers with `is_active` and `is_healthy` are returned. The
    /// ordering is stable across calls (registry insertion order) so the
    /// round-robin cursor cycles deterministically.
    pub fn get_active_healthy_servers(&self, kind: ServerKind) -> Vec<ServerView> {
        self.get_servers(kind)
            .into_iter()
            .filter(|s| s.is_active && s.is_healthy)
            .collect()
    }

    /// Number of registered servers across both pools.
    pub fn server_count(&self) -> usize {
        self.servers.len()
    }

    /// Flip the admin enable flag.
    pub fn set_active(&self, id: &str, active: bool) -> Result<(), RegistryError> {
        let mut server = self
            .servers
            .get_mut(id)
            .ok_or_else(|| RegistryError::ServerNotFound(id.to_string()))?;
        server.is_active = active;
        Ok(())
    }

    /// Apply a probe result to a server's health state.
    ///
    /// On success the failure counter resets and the server is immediately
    /// healthy again. On failure the counter increments, and the server is
    /// demoted once it reaches the configured threshold. This is the only
    /// code path that writes `is_healthy`; send outcomes never do.
    pub fn mark_health_check_result(
        &self,
        id: &str,
        success: bool,
        response_time_ms: Option<u32>,
        error: Option<String>,
    ) -> Result<HealthTransition, RegistryError> {
        let mut server = self
            .servers
            .get_mut(id)
            .ok_or_else(|| RegistryError::ServerNotFound(id.to_string()))?;

        server.last_health_check = Some(chrono::Utc::now());

        if success {
            let was_healthy = server.is_healthy;
            server.consecutive_health_failures = 0;
            server.is_healthy = true;
            server.last_error = None;
            if let Some(ms) = response_time_ms {
                server.update_response_time(ms);
            }
            if was_healthy {
                Ok(HealthTransition::Unchanged)
            } else {
                Ok(HealthTransition::BecameHealthy)
            }
        } else {
            server.consecutive_health_failures += 1;
            server.last_error = error;
            if server.is_healthy && server.consecutive_health_failures >= self.failure_threshold {
                server.is_healthy = false;
                Ok(HealthTransition::BecameUnhealthy)
            } else {
                Ok(HealthTransition::Unchanged)
            }
        }
    }

    /// Record the outcome of an actual send routed through a server.
    ///
    /// Updates lifetime counters and the rolling response time. A send
    /// failure does not touch `is_healthy` (a slow carrier gateway must not
    /// silently depopulate the pool); a send success does reset the
    /// consecutive probe-failure counter.
    pub fn record_send_outcome(
        &self,
        id: &str,
        success: bool,
        response_time_ms: u32,
    ) -> Result<(), RegistryError> {
        let mut server = self
            .servers
            .get_mut(id)
            .ok_or_else(|| RegistryError::ServerNotFound(id.to_string()))?;

        server.total_requests.fetch_add(1, Ordering::SeqCst);
        if success {
            server.successful_requests.fetch_add(1, Ordering::SeqCst);
            server.consecutive_health_failures = 0;
        } else {
            server.failed_requests.fetch_add(1, Ordering::SeqCst);
        }
        server.update_response_time(response_time_ms);
        Ok(())
    }
}

impl Default for ServerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Load the static proxy and relay pools from config into a registry.
///
/// Returns the number of servers added.
pub fn load_servers_from_config(
    config: &EngineConfig,
    registry: &ServerRegistry,
) -> Result<usize, RegistryError> {
    let mut added = 0;
    for proxy in &config.proxies {
        registry.add_server(server_from_config(proxy, ServerKind::Proxy))?;
        added += 1;
    }
    for relay in &config.relays {
        registry.add_server(server_from_config(relay, ServerKind::Relay))?;
        added += 1;
    }
    Ok(added)
}

fn server_from_config(entry: &ServerConfig, kind: ServerKind) -> ServerRecord {
    let id = entry
        .name
        .clone()
        .unwrap_or_else(|| format!("{}:{}", entry.host, entry.port));
    let protocol = entry.protocol.unwrap_or(match kind {
        ServerKind::Proxy => ServerProtocol::Http,
        ServerKind::Relay => ServerProtocol::Smtp,
    });
    let mut server = ServerRecord::new(
        id,
        kind,
        entry.host.clone(),
        entry.port,
        protocol,
        entry.username.clone(),
        entry.password.clone(),
    );
    server.is_active = entry.active;
    server
}
