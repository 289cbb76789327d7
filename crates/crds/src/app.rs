//! Per-application policy
//!
//! `ClusterApp` enumerates the apps a `Cluster` manages and carries the
//! static policy derived from the kind: container image base, resource
//! tier, volume requirements, and the short name child resources are
//! built from.

use k8s_openapi::api::core::v1::{
    GCEPersistentDiskVolumeSource, PersistentVolumeClaimVolumeSource, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use std::collections::BTreeMap;
use std::fmt;

const BOT_IMAGE: &str = "ghcr.io/gender-equality-community/gec-bot";
const PROCESSOR_IMAGE: &str = "ghcr.io/gender-equality-community/gec-processor";
const SLACKER_IMAGE: &str = "ghcr.io/gender-equality-community/gec-slacker";

// Default resources are used for smaller containers, largely written in go
const DEFAULT_CPU: &str = "100m";
const DEFAULT_MEM: &str = "64Mi";

// Data resources are used for containers which perform data-y tasks, such
// as taggers and labelers
const DATA_CPU: &str = "1";
const DATA_MEM: &str = "4Gi";

/// The apps a cluster manages, plus the meta pseudo-app the operator
/// writes its deploy summary under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ClusterApp {
    /// Sentinel for kinds we do not recognise; resolves to the default
    /// tier with no volume
    #[default]
    Unknown,
    /// The WhatsApp bot
    Bot,
    /// The message processor
    Processor,
    /// The slack responder
    Slacker,
    /// Deploy summary metadata, not a workload
    Meta,
}

impl fmt::Display for ClusterApp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClusterApp::Bot => "gec-bot",
            ClusterApp::Processor => "gec-processor",
            ClusterApp::Slacker => "gec-slacker",
            ClusterApp::Meta => "meta",
            ClusterApp::Unknown => "unknown",
        };

        f.write_str(s)
    }
}

impl ClusterApp {
    /// Base container image for the app, without a tag. None for kinds
    /// that run no container.
    pub fn image_base(self) -> Option<&'static str> {
        match self {
            ClusterApp::Bot => Some(BOT_IMAGE),
            ClusterApp::Processor => Some(PROCESSOR_IMAGE),
            ClusterApp::Slacker => Some(SLACKER_IMAGE),
            ClusterApp::Unknown | ClusterApp::Meta => None,
        }
    }

    /// CPU/memory for the app's containers, used as both request and
    /// limit. The processor does the data-heavy work and gets the data
    /// tier; everything else gets the default tier.
    pub fn resources(self) -> BTreeMap<String, Quantity> {
        let (cpu, mem) = match self {
            ClusterApp::Processor => (DATA_CPU, DATA_MEM),
            _ => (DEFAULT_CPU, DEFAULT_MEM),
        };

        BTreeMap::from([
            ("cpu".to_string(), Quantity(cpu.to_string())),
            ("memory".to_string(), Quantity(mem.to_string())),
        ])
    }

    /// Volume mounts for the app's containers. Only the bot persists
    /// anything (its message database), mounted at a fixed path.
    pub fn volume_mounts(self, name: &str) -> Vec<VolumeMount> {
        if self != ClusterApp::Bot {
            return Vec::new();
        }

        vec![VolumeMount {
            name: name.to_string(),
            mount_path: "/database/".to_string(),
            ..Default::default()
        }]
    }

    /// Pod volumes for the app, bound per the process-wide volume type
    /// hint. Only the bot carries a volume.
    pub fn volumes(self, name: &str, volume_type: &str) -> Vec<Volume> {
        if self != ClusterApp::Bot {
            return Vec::new();
        }

        match volume_type {
            "gce" => gce_volume(name),
            "pvc" => pvc_volume(name),
            _ => default_volume(name),
        }
    }
}

// The default binding is the claim-backed one today; kept as its own path
// so local and cloud policy can diverge without touching callers.
fn default_volume(name: &str) -> Vec<Volume> {
    pvc_volume(name)
}

fn gce_volume(name: &str) -> Vec<Volume> {
    vec![Volume {
        name: name.to_string(),
        gce_persistent_disk: Some(GCEPersistentDiskVolumeSource {
            pd_name: name.to_string(),
            ..Default::default()
        }),
        ..Default::default()
    }]
}

fn pvc_volume(name: &str) -> Vec<Volume> {
    vec![Volume {
        name: name.to_string(),
        persistent_volume_claim: Some(PersistentVolumeClaimVolumeSource {
            claim_name: name.to_string(),
            ..Default::default()
        }),
        ..Default::default()
    }]
}
