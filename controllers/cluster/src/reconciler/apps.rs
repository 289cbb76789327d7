//! Per-application pipelines.
//!
//! Each app is reconciled by a fixed, ordered list of upsert steps. Order
//! matters: the workload step references the config object by the name
//! the config step just upserted, so steps never reorder and pipelines
//! never run speculatively.

use crds::{Cluster, ClusterApp};
use kube::ResourceExt;
use std::collections::BTreeMap;

/// One upsert step of an app's pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    ServiceAccount,
    ConfigMap,
    StorageClaim,
    Deployment,
}

/// The bot persists its message database, so it alone carries a claim.
pub(crate) const BOT_STEPS: &[Step] = &[
    Step::ServiceAccount,
    Step::ConfigMap,
    Step::StorageClaim,
    Step::Deployment,
];

pub(crate) const PROCESSOR_STEPS: &[Step] = &[
    Step::ServiceAccount,
    Step::ConfigMap,
    Step::Deployment,
];

pub(crate) const SLACKER_STEPS: &[Step] = &[
    Step::ServiceAccount,
    Step::ConfigMap,
    Step::Deployment,
];

/// Labels the app's pods are selected by.
pub(crate) fn selectors(cluster: &Cluster, app: ClusterApp) -> BTreeMap<String, String> {
    let app_label = match app {
        ClusterApp::Meta => "metadata".to_string(),
        other => other.to_string(),
    };

    BTreeMap::from([
        ("cluster".to_string(), cluster.name_any()),
        ("app".to_string(), app_label),
    ])
}

/// Labels stamped on everything the app owns: the selectors plus the
/// deployed version.
pub(crate) fn labels(cluster: &Cluster, app: ClusterApp) -> BTreeMap<String, String> {
    let mut labels = selectors(cluster, app);
    if let Some(spec) = cluster.app(app) {
        labels.insert("version".to_string(), spec.version.clone());
    }

    labels
}

/// The environment injected into one app's config object. Opaque to the
/// upsert machinery; only this table knows what each app reads.
pub(crate) fn injected_config(cluster: &Cluster, app: ClusterApp) -> BTreeMap<String, String> {
    let redis_url = &cluster.spec.config.redis_url;

    match app {
        ClusterApp::Bot => BTreeMap::from([
            ("REDIS_ADDR".to_string(), redis_url.clone()),
            ("DATABASE".to_string(), "/database/bot.db".to_string()),
        ]),
        ClusterApp::Processor => BTreeMap::from([(
            "REDIS_HOSTNAME".to_string(),
            redis_hostname(redis_url),
        )]),
        ClusterApp::Slacker => BTreeMap::from([
            ("REDIS_ADDR".to_string(), redis_url.clone()),
            ("INCOMING_STREAM".to_string(), "gec-processed".to_string()),
            ("OUTGOING_STREAM".to_string(), "gec-responses".to_string()),
        ]),
        ClusterApp::Unknown | ClusterApp::Meta => BTreeMap::new(),
    }
}

/// Host part of the shared redis address: scheme and port stripped.
pub(crate) fn redis_hostname(address: &str) -> String {
    let rest = address
        .split_once("://")
        .map_or(address, |(_, rest)| rest);
    let host_port = rest.split(['/', '?']).next().unwrap_or(rest);

    match host_port.rsplit_once(':') {
        Some((host, port)) if !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit()) => {
            host.to_string()
        }
        _ => host_port.to_string(),
    }
}
