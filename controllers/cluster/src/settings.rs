//! Process-wide configuration.
//!
//! Resolved from the environment exactly once at startup and passed into
//! the reconciler as an immutable value. A missing `PROJECT` is the one
//! configuration failure that stops the process rather than being retried.

use crate::error::ControllerError;
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::env;

/// Immutable operator configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Cloud project the workload identities live in. Required.
    pub project: String,

    /// Hint selecting how bot volumes are bound ("gce", "pvc", or empty
    /// for the default binding). Unrecognised values fall back silently
    /// to the default.
    ///
    /// For instance, on GCP we want GCE disks, whereas locally we might
    /// actually want claim-backed volumes.
    pub volume_type: String,

    /// Capacity requested for bot storage claims.
    pub volume_size: Quantity,
}

impl Settings {
    /// Resolves settings from the process environment.
    pub fn from_env() -> Result<Self, ControllerError> {
        Self::resolve(|key| env::var(key).ok())
    }

    fn resolve(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ControllerError> {
        let project = match lookup("PROJECT") {
            Some(p) if !p.is_empty() => p,
            _ => {
                return Err(ControllerError::InvalidConfig(
                    "PROJECT environment variable not set or empty".to_string(),
                ));
            }
        };

        Ok(Self {
            project,
            volume_type: lookup("VOLUME_TYPE").unwrap_or_default(),
            volume_size: Quantity(lookup("VOLUME_SIZE").unwrap_or_else(|| "100Mi".to_string())),
        })
    }
}
