//! Controller-specific error types.
//!
//! This module defines error types specific to the cluster controller
//! that are not covered by upstream library errors.

use thiserror::Error;

/// Errors that can occur in the cluster controller.
#[derive(Debug, Error)]
pub enum ControllerError {
    /// Kubernetes API error
    #[error("Kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Transport failure talking to the platform
    #[error("Transport error: {0}")]
    #[allow(dead_code)] // Raised by test doubles; the kube client reports via Kube
    Transport(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The descriptor lacks the identity child resources are owned by
    #[error("Cluster has no recorded identity: {0}")]
    MissingIdentity(String),

    /// Resource watch failed
    #[error("Resource watch failed: {0}")]
    #[allow(dead_code)] // Reserved for future use
    Watch(String),
}
