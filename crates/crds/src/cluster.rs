//! Cluster CRD
//!
//! The single declarative descriptor for a GEC deployment: three managed
//! applications (bot, processor, slacker) pinned to versions, plus the
//! shared configuration they all consume.

use crate::app::ClusterApp;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Public key the future signature check will verify release artefacts
/// against.
#[allow(dead_code, reason = "verification key for the signature check still to come")]
const COSIGN_PUB_KEY: &str = "-----BEGIN PUBLIC KEY-----
MFkwEwYHKoZIzj0CAQYIKoZIzj0DAQcDQgAEfh98reV6VTLXq2TzyekyybK1sPiD
7ndQ+oC6kjGsQawwMUCFU7oCpW2hmjXA/Zj4x6A4zPZl/3nvRTVDsIMxHA==
-----END PUBLIC KEY-----
";

#[derive(CustomResource, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "app.gec",
    version = "v1alpha1",
    kind = "Cluster",
    namespaced,
    status = "ClusterStatus"
)]
/// Desired state of a GEC cluster.
pub struct ClusterSpec {
    /// The WhatsApp bot
    pub bot: AppSpec,

    /// The message processor/tagger
    pub processor: AppSpec,

    /// The slack responder
    pub slacker: AppSpec,

    /// Configuration shared by every app in the cluster
    pub config: SharedConfig,
}

/// A single managed application, pinned to a release.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AppSpec {
    /// Release version. Strict semver, prefixed with `v` to match our git
    /// and container tags (the CRD manifest enforces the semver pattern).
    pub version: String,
}

/// Settings every app in the cluster shares.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SharedConfig {
    /// Address of the redis instance the apps stream messages through
    pub redis_url: String,
}

/// Observed state of a GEC cluster. No fields yet; everything the
/// operator records lives in the meta ConfigMap.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ClusterStatus {}

impl Cluster {
    /// Deterministic name for the child resources of one app of this
    /// cluster: `<cluster-name>-<app-short-name>`, e.g. `testing-gec-bot`.
    ///
    /// Unique per (cluster, app) pair; every child resource kind of an app
    /// shares it so that later pipeline steps can reference earlier ones
    /// by name.
    pub fn child_name(&self, app: ClusterApp) -> String {
        format!("{}-{}", self.name(), app)
    }

    /// The spec of one managed app, if `app` names one.
    pub fn app(&self, app: ClusterApp) -> Option<&AppSpec> {
        match app {
            ClusterApp::Bot => Some(&self.spec.bot),
            ClusterApp::Processor => Some(&self.spec.processor),
            ClusterApp::Slacker => Some(&self.spec.slacker),
            ClusterApp::Unknown | ClusterApp::Meta => None,
        }
    }

    /// Container image reference for one app: `<base-image>:<version>`.
    ///
    /// Empty for kinds that run no container (meta, unknown).
    pub fn image(&self, app: ClusterApp) -> String {
        match (app.image_base(), self.app(app)) {
            (Some(base), Some(spec)) => tagged_image(base, &spec.version),
            _ => String::new(),
        }
    }

    /// URL of the software bill-of-materials published alongside the
    /// app's release.
    pub fn sbom_url(&self, app: ClusterApp) -> String {
        match (app.image_base(), self.app(app)) {
            (Some(base), Some(spec)) => sbom_url(base, &spec.version),
            _ => String::new(),
        }
    }

    /// Whether the app's release artefacts carry a valid signature.
    ///
    /// Always true today; placeholder for cosign verification against
    /// `COSIGN_PUB_KEY`.
    pub fn has_valid_signature(&self, _app: ClusterApp) -> bool {
        true
    }

    fn name(&self) -> &str {
        self.metadata.name.as_deref().unwrap_or_default()
    }
}

fn tagged_image(image: &str, tag: &str) -> String {
    format!("{image}:{tag}")
}

fn sbom_url(image: &str, tag: &str) -> String {
    let repo = image.rsplit('/').next().unwrap_or(image);

    format!("https://github.com/gender-equality-community/{repo}/releases/download/{tag}/bom.json")
}
