//! Core components
//!
//! Each component is independent of the others; the router optionally holds
//! a shared [`tokens::TokenCounter`] for usage accounting.

pub mod clock;
pub mod connection_pool; // Bounded per-provider handle pool
pub mod rate_limiter; // Sliding-window admission control
pub mod router;
pub mod tokens;
