//! Child resource synthesizers.
//!
//! Pure functions from (descriptor, app kind, labels/selectors, injected
//! config) to the desired shape of one child resource. Nothing here talks
//! to the platform; the upsert primitive does that.

use crds::{Cluster, ClusterApp};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::api::core::v1::{
    Capabilities, ConfigMap, ConfigMapEnvSource, Container, EnvFromSource, LocalObjectReference,
    PersistentVolumeClaim, PersistentVolumeClaimSpec, PodSecurityContext, PodSpec,
    PodTemplateSpec, ResourceRequirements, SeccompProfile, SecretEnvSource, SecurityContext,
    ServiceAccount, VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use kube::ResourceExt;
use std::collections::BTreeMap;

fn object_meta(cluster: &Cluster, app: ClusterApp, labels: &BTreeMap<String, String>) -> ObjectMeta {
    ObjectMeta {
        name: Some(cluster.child_name(app)),
        namespace: cluster.namespace(),
        labels: Some(labels.clone()),
        ..Default::default()
    }
}

/// Workload identity for one app: annotated with the cloud service
/// account it impersonates, carrying the registry pull secret.
pub(crate) fn service_account(
    cluster: &Cluster,
    app: ClusterApp,
    labels: &BTreeMap<String, String>,
    project: &str,
) -> ServiceAccount {
    let mut metadata = object_meta(cluster, app, labels);
    metadata.annotations = Some(BTreeMap::from([(
        "iam.gke.io/gcp-service-account".to_string(),
        cloud_service_account(&cluster.child_name(app), project),
    )]));

    ServiceAccount {
        metadata,
        image_pull_secrets: Some(vec![LocalObjectReference {
            name: Some("ecr-pull".to_string()),
        }]),
        ..Default::default()
    }
}

fn cloud_service_account(name: &str, project: &str) -> String {
    format!("{name}@{project}.iam.gserviceaccount.com")
}

/// Environment for one app. The data is whatever the pipeline injects;
/// the controller compares and replaces it wholesale, never interpreting
/// individual keys.
pub(crate) fn config_map(
    cluster: &Cluster,
    app: ClusterApp,
    labels: &BTreeMap<String, String>,
    config: &BTreeMap<String, String>,
) -> ConfigMap {
    ConfigMap {
        metadata: object_meta(cluster, app, labels),
        data: Some(config.clone()),
        ..Default::default()
    }
}

/// Storage claim for the bot's database volume.
pub(crate) fn persistent_volume_claim(
    cluster: &Cluster,
    app: ClusterApp,
    labels: &BTreeMap<String, String>,
    size: &Quantity,
) -> PersistentVolumeClaim {
    PersistentVolumeClaim {
        metadata: object_meta(cluster, app, labels),
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteMany".to_string()]),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    size.clone(),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// The app's workload: one replica of its derived image, wired to the
/// config map the previous pipeline step upserted, with the hardened
/// defaults every GEC container runs under.
pub(crate) fn deployment(
    cluster: &Cluster,
    app: ClusterApp,
    labels: &BTreeMap<String, String>,
    selectors: &BTreeMap<String, String>,
    volume_type: &str,
) -> Deployment {
    let name = cluster.child_name(app);

    Deployment {
        metadata: object_meta(cluster, app, labels),
        spec: Some(DeploymentSpec {
            replicas: Some(1),
            selector: LabelSelector {
                match_labels: Some(selectors.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels.clone()),
                    ..Default::default()
                }),
                spec: Some(pod_spec(cluster, app, &name, volume_type)),
            },
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn pod_spec(cluster: &Cluster, app: ClusterApp, name: &str, volume_type: &str) -> PodSpec {
    PodSpec {
        service_account_name: Some(name.to_string()),
        containers: vec![Container {
            image: Some(cluster.image(app)),
            name: name.to_string(),
            resources: Some(ResourceRequirements {
                limits: Some(app.resources()),
                requests: Some(app.resources()),
                ..Default::default()
            }),
            volume_mounts: some_or_none(app.volume_mounts(name)),
            env_from: Some(env_sources(name)),
            termination_message_path: Some("/dev/termination-log".to_string()),
            termination_message_policy: Some("File".to_string()),
            tty: Some(true),
            image_pull_policy: Some("IfNotPresent".to_string()),
            security_context: Some(container_security_context()),
            ..Default::default()
        }],
        restart_policy: Some("Always".to_string()),
        termination_grace_period_seconds: Some(30),
        dns_policy: Some("ClusterFirst".to_string()),
        security_context: Some(PodSecurityContext::default()),
        scheduler_name: Some("default-scheduler".to_string()),
        volumes: some_or_none(app.volumes(name, volume_type)),
        enable_service_links: Some(false),
        automount_service_account_token: Some(false),
        ..Default::default()
    }
}

/// The environment sources attach in a fixed order: the app's own config
/// map (required), then an operator-user-supplied override config map and
/// secret, both tolerated absent.
fn env_sources(name: &str) -> Vec<EnvFromSource> {
    vec![
        EnvFromSource {
            config_map_ref: Some(ConfigMapEnvSource {
                name: Some(name.to_string()),
                optional: None,
            }),
            ..Default::default()
        },
        EnvFromSource {
            config_map_ref: Some(ConfigMapEnvSource {
                name: Some(format!("{name}-override")),
                optional: Some(true),
            }),
            ..Default::default()
        },
        EnvFromSource {
            secret_ref: Some(SecretEnvSource {
                name: Some(format!("{name}-override")),
                optional: Some(true),
            }),
            ..Default::default()
        },
    ]
}

fn container_security_context() -> SecurityContext {
    SecurityContext {
        read_only_root_filesystem: Some(true),
        privileged: Some(false),
        capabilities: Some(Capabilities {
            drop: Some(vec!["ALL".to_string()]),
            ..Default::default()
        }),
        allow_privilege_escalation: Some(false),
        run_as_non_root: Some(true),
        seccomp_profile: Some(SeccompProfile {
            type_: "RuntimeDefault".to_string(),
            ..Default::default()
        }),
        ..Default::default()
    }
}

fn some_or_none<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() { None } else { Some(items) }
}
