//! Router error types

use crate::utils::error::ErrorKind;

/// Router error types
///
/// Defines errors that can occur during routing operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RouterError {
    /// A deployment with this `model_name` is already registered
    #[error("Deployment already exists: {0}")]
    DuplicateDeployment(String),

    /// No deployment registered under this name
    #[error("Deployment not found: {0}")]
    DeploymentNotFound(String),

    /// Every deployment for the model is cooling down, or none exist
    #[error("No healthy deployment available for model: {0}")]
    NoHealthyDeployment(String),

    /// Strategy name or id outside the known set
    #[error("Unknown routing strategy: {0}")]
    UnknownStrategy(String),
}

impl RouterError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            RouterError::DuplicateDeployment(_) => ErrorKind::Duplicate,
            RouterError::DeploymentNotFound(_) => ErrorKind::NotFound,
            RouterError::NoHealthyDeployment(_) => ErrorKind::Unavailable,
            RouterError::UnknownStrategy(_) => ErrorKind::Invalid,
        }
    }
}
