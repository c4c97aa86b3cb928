//! Integration tests for fast-litellm
//!
//! These tests drive the public API the way the glue layer does and check
//! the observable properties of each component.

pub mod concurrency_tests;
pub mod config_tests;
pub mod limiter_pool_tests;
pub mod router_tests;
