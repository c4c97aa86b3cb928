//! Bounded per-provider pool of connection handles
//!
//! The pool does not open sockets. It leases opaque handle ids that stand for
//! connection slots, so callers doing the real I/O can bound concurrency per
//! provider and reuse warm slots instead of minting new ones.

mod pool;
mod types;


pub use pool::{ConnectionPool, connection_pool_health_check};
pub use types::{ConnectionInfo, PoolError, PoolStats, ProviderStats};
