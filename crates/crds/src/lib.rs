//! GEC CRD Definitions
//!
//! Kubernetes Custom Resource Definitions for the GEC cluster operator,
//! plus the per-application policy derived from them (container images,
//! resource tiers, volume bindings, child resource names).

pub mod app;
pub mod cluster;

pub use app::*;
pub use cluster::*;
