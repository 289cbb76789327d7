//! Platform client seam.
//!
//! The reconciler only ever needs three verbs per child resource kind:
//! get (with not-found surfaced as `None`), create, and update. Putting
//! them behind a trait keeps the upsert primitive a pure function of its
//! inputs and lets tests substitute an in-memory platform.

use crate::error::ControllerError;
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, ServiceAccount};
use kube::api::PostParams;
use kube::core::NamespaceResourceScope;
use kube::{Api, Client, Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt::Debug;

/// Get/create/update for one child resource kind.
///
/// `get` maps the platform's not-found response to `Ok(None)`; any other
/// failure is a transport error and propagates.
#[async_trait]
pub trait ObjectOps<K>: Send + Sync {
    /// Fetches the observed resource by name, `None` if it does not exist.
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, ControllerError>;

    /// Creates the resource.
    async fn create(&self, desired: &K) -> Result<(), ControllerError>;

    /// Replaces the resource with the desired state.
    async fn update(&self, desired: &K) -> Result<(), ControllerError>;
}

/// The full set of child resource kinds the reconciler manages.
pub trait PlatformClient:
    ObjectOps<ServiceAccount>
    + ObjectOps<ConfigMap>
    + ObjectOps<PersistentVolumeClaim>
    + ObjectOps<Deployment>
{
}

impl<T> PlatformClient for T where
    T: ObjectOps<ServiceAccount>
        + ObjectOps<ConfigMap>
        + ObjectOps<PersistentVolumeClaim>
        + ObjectOps<Deployment>
{
}

/// [`PlatformClient`] backed by the real Kubernetes API.
#[derive(Clone)]
pub struct KubePlatform {
    client: Client,
}

impl KubePlatform {
    /// Wraps a Kubernetes client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: Resource<Scope = NamespaceResourceScope>,
        K::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }
}

impl Debug for KubePlatform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubePlatform").finish_non_exhaustive()
    }
}

#[async_trait]
impl<K> ObjectOps<K> for KubePlatform
where
    K: Resource<Scope = NamespaceResourceScope>
        + Clone
        + Serialize
        + DeserializeOwned
        + Debug
        + Send
        + Sync,
    K::DynamicType: Default,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, ControllerError> {
        match self.api::<K>(namespace).get(name).await {
            Ok(found) => Ok(Some(found)),
            Err(kube::Error::Api(ae)) if ae.code == 404 => Ok(None),
            Err(e) => Err(ControllerError::Kube(e)),
        }
    }

    async fn create(&self, desired: &K) -> Result<(), ControllerError> {
        let namespace = desired.namespace().unwrap_or_default();
        self.api::<K>(&namespace)
            .create(&PostParams::default(), desired)
            .await?;

        Ok(())
    }

    async fn update(&self, desired: &K) -> Result<(), ControllerError> {
        let namespace = desired.namespace().unwrap_or_default();
        self.api::<K>(&namespace)
            .replace(&desired.name_any(), &PostParams::default(), desired)
            .await?;

        Ok(())
    }
}
