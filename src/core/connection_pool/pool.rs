//! Connection pool implementation

use super::types::{ConnectionInfo, PoolError, PoolStats, PooledHandle, ProviderStats};
use crate::config::ConnectionPoolConfig;
use crate::core::clock::{Clock, system_clock};
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Bookkeeping for one provider
///
/// `handles` holds every live handle; `available` is the subset that is not
/// leased, most recently returned last. A handle is in exactly one of the
/// two states, tracked by `PooledHandle::in_use`.
#[derive(Debug, Default)]
pub(super) struct ProviderConnections {
    pub(super) handles: HashMap<String, PooledHandle>,
    pub(super) available: Vec<String>,
    pub(super) total_created: u64,
    pub(super) total_checkouts: u64,
    pub(super) total_closed: u64,
}

impl ProviderConnections {
    fn in_use(&self) -> usize {
        self.handles.len() - self.available.len()
    }

    fn remove(&mut self, id: &str) -> Option<PooledHandle> {
        let handle = self.handles.remove(id)?;
        if !handle.in_use {
            self.available.retain(|candidate| candidate != id);
        }
        self.total_closed += 1;
        Some(handle)
    }
}

/// Per-provider bounded pool of connection handles
///
/// Operations on one provider serialize on that provider's mutex; providers
/// never contend with each other.
pub struct ConnectionPool {
    /// Per-provider bookkeeping, created on first request
    pub(super) providers: DashMap<String, Arc<Mutex<ProviderConnections>>>,
    /// Handle id -> owning provider
    pub(super) index: DashMap<String, String>,
    pub(super) max_connections_per_provider: usize,
    /// Available handles idle this long are closed by the sweep
    pub(super) idle_timeout: Duration,
    /// Source of unique handle ids
    pub(super) next_id: AtomicU64,
    pub(super) clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("providers", &self.providers.len())
            .field("handles", &self.index.len())
            .field(
                "max_connections_per_provider",
                &self.max_connections_per_provider,
            )
            .field("idle_timeout", &self.idle_timeout)
            .finish()
    }
}

impl ConnectionPool {
    /// Create a pool allowing `max_connections_per_provider` handles per provider
    pub fn new(max_connections_per_provider: usize) -> Self {
        Self::with_clock(max_connections_per_provider, system_clock())
    }

    /// Create a pool from configuration
    pub fn from_config(config: &ConnectionPoolConfig) -> Self {
        Self::from_config_with_clock(config, system_clock())
    }

    /// Create a pool from configuration, reading time from `clock`
    pub fn from_config_with_clock(config: &ConnectionPoolConfig, clock: Arc<dyn Clock>) -> Self {
        Self::with_clock(config.max_connections_per_provider, clock)
            .with_idle_timeout(Duration::from_secs(config.idle_timeout_secs))
    }

    /// Create a pool reading time from `clock`, with the default idle timeout
    pub fn with_clock(max_connections_per_provider: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            providers: DashMap::new(),
            index: DashMap::new(),
            max_connections_per_provider,
            idle_timeout: Duration::from_secs(ConnectionPoolConfig::default().idle_timeout_secs),
            next_id: AtomicU64::new(0),
            clock,
        }
    }

    /// Set the idle timeout used by [`close_idle_expired`](Self::close_idle_expired)
    pub fn with_idle_timeout(mut self, idle_timeout: Duration) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Lease a handle for `provider`
    ///
    /// Reuses the most recently returned handle when one is available and
    /// only mints a new id while the provider is below capacity.
    pub fn get_connection(&self, provider: &str) -> Result<String, PoolError> {
        let now = self.clock.now_ms();
        let connections = self.provider_entry(provider);
        let mut connections = connections.lock();

        if let Some(id) = connections.available.pop() {
            if let Some(handle) = connections.handles.get_mut(&id) {
                handle.mark_used(now);
            }
            connections.total_checkouts += 1;
            debug!("Reused connection {} for provider {}", id, provider);
            return Ok(id);
        }

        if connections.handles.len() >= self.max_connections_per_provider {
            warn!(
                "Connection pool exhausted for provider {} ({} in use)",
                provider,
                connections.in_use()
            );
            return Err(PoolError::Exhausted {
                provider: provider.to_string(),
                max: self.max_connections_per_provider,
            });
        }

        let seq = self.next_id.fetch_add(1, Ordering::Relaxed);
        let id = format!("{}_{}", provider, seq);
        connections
            .handles
            .insert(id.clone(), PooledHandle::leased(now));
        connections.total_created += 1;
        connections.total_checkouts += 1;
        self.index.insert(id.clone(), provider.to_string());

        debug!("Created connection {} for provider {}", id, provider);
        Ok(id)
    }

    /// Return a leased handle for reuse
    ///
    /// Returns `false` for unknown, closed, or already available handles.
    pub fn return_connection(&self, handle_id: &str) -> bool {
        let Some(connections) = self.connections_for(handle_id) else {
            return false;
        };
        let now = self.clock.now_ms();
        let mut connections = connections.lock();

        let Some(handle) = connections.handles.get_mut(handle_id) else {
            return false;
        };
        if !handle.in_use {
            debug!("Connection {} returned twice", handle_id);
            return false;
        }
        handle.in_use = false;
        handle.last_used_ms = now;
        connections.available.push(handle_id.to_string());
        true
    }

    /// Permanently remove a handle, leased or available
    pub fn close_connection(&self, handle_id: &str) -> bool {
        let Some(connections) = self.connections_for(handle_id) else {
            return false;
        };
        let mut connections = connections.lock();

        if connections.remove(handle_id).is_none() {
            return false;
        }
        self.index.remove(handle_id);
        debug!("Closed connection {}", handle_id);
        true
    }

    /// Close available handles unused for longer than `max_idle`
    ///
    /// Leased handles are never touched. Returns the number closed.
    pub fn close_idle(&self, max_idle: Duration) -> usize {
        let now = self.clock.now_ms();
        let max_idle_ms = max_idle.as_millis() as u64;
        let providers: Vec<_> = self
            .providers
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut closed = 0;
        for connections in providers {
            let mut connections = connections.lock();
            let idle: Vec<String> = connections
                .handles
                .iter()
                .filter(|(_, handle)| handle.is_idle(now, max_idle_ms))
                .map(|(id, _)| id.clone())
                .collect();

            for id in idle {
                connections.remove(&id);
                self.index.remove(&id);
                closed += 1;
            }
        }

        if closed > 0 {
            info!("Closed {} idle connections", closed);
        }
        closed
    }

    /// Close available handles idle for longer than the configured timeout
    pub fn close_idle_expired(&self) -> usize {
        self.close_idle(self.idle_timeout)
    }

    /// Start background idle sweep task
    ///
    /// Runs [`close_idle_expired`](Self::close_idle_expired) once per idle
    /// timeout (at least once a second). Must be called from within a tokio
    /// runtime.
    pub fn start_idle_sweep_task(self: Arc<Self>) -> tokio::task::JoinHandle<()> {
        let pool = self.clone();
        let period = self.idle_timeout.max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                pool.close_idle_expired();
            }
        })
    }

    /// Pool-wide statistics
    pub fn get_pool_stats(&self) -> PoolStats {
        let mut stats = PoolStats {
            max_connections_per_provider: self.max_connections_per_provider,
            ..PoolStats::default()
        };

        for entry in self.providers.iter() {
            let connections = entry.value().lock();
            stats.providers += 1;
            stats.total_available += connections.available.len();
            stats.total_in_use += connections.in_use();
        }
        stats
    }

    /// Snapshot for one provider, `None` if it never requested a connection
    pub fn get_provider_stats(&self, provider: &str) -> Option<ProviderStats> {
        let connections = self.providers.get(provider).map(|e| Arc::clone(e.value()))?;
        let connections = connections.lock();

        Some(ProviderStats {
            provider: provider.to_string(),
            available: connections.available.len(),
            in_use: connections.in_use(),
            total_created: connections.total_created,
            total_checkouts: connections.total_checkouts,
            total_closed: connections.total_closed,
        })
    }

    /// Metadata for a live handle
    pub fn connection_info(&self, handle_id: &str) -> Result<ConnectionInfo, PoolError> {
        let not_found = || PoolError::HandleNotFound(handle_id.to_string());
        let provider = self
            .index
            .get(handle_id)
            .map(|p| p.value().clone())
            .ok_or_else(not_found)?;
        let connections = self
            .providers
            .get(&provider)
            .map(|e| Arc::clone(e.value()))
            .ok_or_else(not_found)?;
        let connections = connections.lock();
        let handle = connections.handles.get(handle_id).ok_or_else(not_found)?;

        Ok(ConnectionInfo {
            id: handle_id.to_string(),
            provider,
            created_at_ms: handle.created_at_ms,
            last_used_ms: handle.last_used_ms,
            use_count: handle.use_count,
            in_use: handle.in_use,
        })
    }

    pub fn max_connections_per_provider(&self) -> usize {
        self.max_connections_per_provider
    }

    pub fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Verify a scratch provider can lease, return and close a handle
    ///
    /// Each call uses its own provider, so concurrent checks never share
    /// capacity or remove each other's bookkeeping.
    pub fn health_check(&self) -> bool {
        if self.max_connections_per_provider == 0 {
            return false;
        }

        let seq = self.next_id.fetch_add(1, Ordering::Relaxed);
        let scratch = format!("__health_check_{}__", seq);
        let healthy = match self.get_connection(&scratch) {
            Ok(id) => self.return_connection(&id) && self.close_connection(&id),
            Err(_) => false,
        };
        self.providers.remove(&scratch);
        healthy
    }

    fn provider_entry(&self, provider: &str) -> Arc<Mutex<ProviderConnections>> {
        // Avoid String allocation if provider already exists
        if let Some(connections) = self.providers.get(provider) {
            return Arc::clone(connections.value());
        }

        let entry = self.providers.entry(provider.to_string()).or_default();
        Arc::clone(entry.value())
    }

    fn connections_for(&self, handle_id: &str) -> Option<Arc<Mutex<ProviderConnections>>> {
        let provider = self.index.get(handle_id).map(|p| p.value().clone())?;
        self.providers.get(&provider).map(|e| Arc::clone(e.value()))
    }
}

impl Default for ConnectionPool {
    fn default() -> Self {
        Self::from_config(&ConnectionPoolConfig::default())
    }
}

/// Health check for the connection pool component
pub fn connection_pool_health_check() -> bool {
    info!("Connection pool health check called");
    ConnectionPool::default().health_check()
}
