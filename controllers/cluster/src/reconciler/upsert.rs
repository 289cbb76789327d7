//! The upsert primitive.
//!
//! One state machine, applied uniformly to every child resource kind:
//! build desired, own it, then get → (create | compare → update-or-noop).
//! An update requests a short requeue so the next cycle observes the
//! settled state; a create is terminal for the step. Comparison is deep
//! structural equality on the per-kind subset that matters, so
//! server-populated defaults never cause churn.

use crate::error::ControllerError;
use crate::platform::ObjectOps;
use crds::Cluster;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, ServiceAccount};
use kube::{Resource, ResourceExt};
use std::time::Duration;
use tracing::{debug, info};

/// How long to wait before re-observing a resource we just updated.
pub(crate) const DRIFT_REQUEUE: Duration = Duration::from_secs(1);

/// Upserts one child resource, returning the requeue delay the step asks
/// for (zero when nothing more needs observing).
pub(crate) async fn upsert<K, C>(
    platform: &C,
    cluster: &Cluster,
    mut desired: K,
    differs: fn(&K, &K) -> bool,
) -> Result<Duration, ControllerError>
where
    K: Resource<DynamicType = ()> + Clone + Send + Sync,
    C: ObjectOps<K> + ?Sized,
{
    own(cluster, &mut desired)?;

    let name = desired.name_any();
    let namespace = desired.namespace().unwrap_or_default();
    let kind = K::kind(&());

    match platform.get(&namespace, &name).await? {
        None => {
            info!("Creating {} {}/{}", kind, namespace, name);
            platform.create(&desired).await?;

            Ok(Duration::ZERO)
        }
        Some(found) => {
            if differs(&found, &desired) {
                info!("{} {}/{} drifted, updating", kind, namespace, name);
                desired.meta_mut().resource_version = found.resource_version();
                platform.update(&desired).await?;

                Ok(DRIFT_REQUEUE)
            } else {
                debug!("{} {}/{} unchanged", kind, namespace, name);

                Ok(Duration::ZERO)
            }
        }
    }
}

/// Tags the child with a controller owner reference so the platform
/// garbage-collects it with the descriptor.
fn own<K>(cluster: &Cluster, child: &mut K) -> Result<(), ControllerError>
where
    K: Resource<DynamicType = ()>,
{
    let owner = cluster
        .controller_owner_ref(&())
        .ok_or_else(|| ControllerError::MissingIdentity(cluster.name_any()))?;
    child.meta_mut().owner_references = Some(vec![owner]);

    Ok(())
}

// Per-kind drift comparisons. Each names the subset of fields this
// controller is authoritative for.

pub(crate) fn service_account_differs(found: &ServiceAccount, desired: &ServiceAccount) -> bool {
    found.image_pull_secrets != desired.image_pull_secrets
}

pub(crate) fn config_map_differs(found: &ConfigMap, desired: &ConfigMap) -> bool {
    found.data != desired.data
}

// Claim specs are immutable once bound; a claim that exists is a claim
// we leave alone.
pub(crate) fn claim_differs(_found: &PersistentVolumeClaim, _desired: &PersistentVolumeClaim) -> bool {
    false
}

pub(crate) fn deployment_differs(found: &Deployment, desired: &Deployment) -> bool {
    let pod = |d: &Deployment| d.spec.as_ref().map(|s| s.template.spec.clone());

    pod(found) != pod(desired)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockPlatform, testing_cluster};
    use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
    use std::collections::BTreeMap;

    fn desired_config_map(data: &str) -> ConfigMap {
        ConfigMap {
            metadata: ObjectMeta {
                name: Some("testing-gec-bot".to_string()),
                namespace: Some("default".to_string()),
                ..Default::default()
            },
            data: Some(BTreeMap::from([("KEY".to_string(), data.to_string())])),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_upsert_creates_when_not_found() {
        let platform = MockPlatform::new();
        let cluster = testing_cluster();

        let requeue = upsert(&platform, &cluster, desired_config_map("a"), config_map_differs)
            .await
            .unwrap();

        assert_eq!(requeue, Duration::ZERO);
        assert_eq!(platform.creates(), vec!["ConfigMap/default/testing-gec-bot"]);
        assert!(platform.updates().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_noops_when_identical() {
        let platform = MockPlatform::new();
        let cluster = testing_cluster();
        upsert(&platform, &cluster, desired_config_map("a"), config_map_differs)
            .await
            .unwrap();

        let requeue = upsert(&platform, &cluster, desired_config_map("a"), config_map_differs)
            .await
            .unwrap();

        assert_eq!(requeue, Duration::ZERO);
        assert_eq!(platform.creates().len(), 1);
        assert!(platform.updates().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_updates_and_requeues_on_drift() {
        let platform = MockPlatform::new();
        let cluster = testing_cluster();
        upsert(&platform, &cluster, desired_config_map("a"), config_map_differs)
            .await
            .unwrap();

        let requeue = upsert(&platform, &cluster, desired_config_map("b"), config_map_differs)
            .await
            .unwrap();

        assert!(requeue > Duration::ZERO);
        assert_eq!(requeue, DRIFT_REQUEUE);
        assert_eq!(platform.creates().len(), 1);
        assert_eq!(platform.updates(), vec!["ConfigMap/default/testing-gec-bot"]);

        let stored: ConfigMap = platform.stored("default", "testing-gec-bot").unwrap();
        assert_eq!(stored.data.unwrap()["KEY"], "b");
    }

    #[tokio::test]
    async fn test_upsert_tags_the_owner() {
        let platform = MockPlatform::new();
        let cluster = testing_cluster();

        upsert(&platform, &cluster, desired_config_map("a"), config_map_differs)
            .await
            .unwrap();

        let stored: ConfigMap = platform.stored("default", "testing-gec-bot").unwrap();
        let owners = stored.metadata.owner_references.unwrap();
        assert_eq!(owners.len(), 1);
        assert_eq!(owners[0].kind, "Cluster");
        assert_eq!(owners[0].name, "testing");
        assert_eq!(owners[0].controller, Some(true));
    }

    #[tokio::test]
    async fn test_upsert_fails_without_owner_identity() {
        let platform = MockPlatform::new();
        let mut cluster = testing_cluster();
        cluster.metadata.uid = None;

        let err = upsert(&platform, &cluster, desired_config_map("a"), config_map_differs)
            .await
            .unwrap_err();

        assert!(matches!(err, ControllerError::MissingIdentity(_)));
        assert!(platform.creates().is_empty());
    }

    #[tokio::test]
    async fn test_upsert_propagates_transport_errors() {
        let platform = MockPlatform::new();
        platform.break_transport("ConfigMap/default/testing-gec-bot");
        let cluster = testing_cluster();

        let err = upsert(&platform, &cluster, desired_config_map("a"), config_map_differs)
            .await
            .unwrap_err();

        assert!(matches!(err, ControllerError::Transport(_)));
        assert!(platform.creates().is_empty());
        assert!(platform.updates().is_empty());
    }

    #[test]
    fn test_claims_never_drift() {
        let found = PersistentVolumeClaim::default();
        let desired = PersistentVolumeClaim::default();

        assert!(!claim_differs(&found, &desired));
    }

    #[test]
    fn test_deployment_drift_is_the_pod_spec() {
        use k8s_openapi::api::apps::v1::DeploymentSpec;
        use k8s_openapi::api::core::v1::{Container, PodSpec};
        use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;

        let with_image = |image: &str| Deployment {
            spec: Some(DeploymentSpec {
                selector: LabelSelector::default(),
                template: k8s_openapi::api::core::v1::PodTemplateSpec {
                    metadata: None,
                    spec: Some(PodSpec {
                        containers: vec![Container {
                            name: "app".to_string(),
                            image: Some(image.to_string()),
                            ..Default::default()
                        }],
                        ..Default::default()
                    }),
                },
                ..Default::default()
            }),
            ..Default::default()
        };

        assert!(!deployment_differs(&with_image("a:1"), &with_image("a:1")));
        assert!(deployment_differs(&with_image("a:1"), &with_image("a:2")));
    }
}
