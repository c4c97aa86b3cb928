//! Common test utilities for fast-litellm
//!
//! - Deployment and payload factories
//! - Components wired to a manual clock
//! - Custom assertions

pub mod assertions;
pub mod fixtures;

pub use fixtures::{DeploymentFactory, PayloadFactory, TestClock};
