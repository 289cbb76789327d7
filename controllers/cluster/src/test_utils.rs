//! Test utilities for unit testing the reconciler.
//!
//! Provides the descriptor fixture and an in-memory platform that
//! records every get/create/update and can fail on demand.

use crate::error::ControllerError;
use crate::platform::ObjectOps;
use crate::settings::Settings;
use async_trait::async_trait;
use crds::{AppSpec, Cluster, ClusterSpec, SharedConfig};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use kube::{Resource, ResourceExt};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::sync::Mutex;

/// The descriptor every test reconciles: cluster `testing`, all apps at
/// v0.1.0.
pub fn testing_cluster() -> Cluster {
    Cluster {
        metadata: ObjectMeta {
            name: Some("testing".to_string()),
            namespace: Some("default".to_string()),
            uid: Some("8f9c54f3-70a1-45e2-a0cc-2ad42d1f7c21".to_string()),
            ..Default::default()
        },
        spec: ClusterSpec {
            bot: AppSpec { version: "v0.1.0".to_string() },
            processor: AppSpec { version: "v0.1.0".to_string() },
            slacker: AppSpec { version: "v0.1.0".to_string() },
            config: SharedConfig { redis_url: "redis:6379".to_string() },
        },
        status: None,
    }
}

/// Settings tests run under.
pub fn testing_settings() -> Settings {
    Settings {
        project: "gec-testing".to_string(),
        volume_type: String::new(),
        volume_size: Quantity("100Mi".to_string()),
    }
}

/// In-memory [`crate::platform::PlatformClient`].
///
/// Objects are stored as JSON keyed by `<Kind>/<namespace>/<name>`; each
/// verb records the keys it was invoked with, and any key can be marked
/// broken to simulate a transport failure.
#[derive(Debug, Default)]
pub struct MockPlatform {
    objects: Mutex<BTreeMap<String, serde_json::Value>>,
    creates: Mutex<Vec<String>>,
    updates: Mutex<Vec<String>>,
    broken: Mutex<BTreeSet<String>>,
}

impl MockPlatform {
    pub fn new() -> Self {
        Self::default()
    }

    fn key<K: Resource>(namespace: &str, name: &str) -> String
    where
        K::DynamicType: Default,
    {
        format!("{}/{namespace}/{name}", K::kind(&K::DynamicType::default()))
    }

    fn object_key<K: Resource>(obj: &K) -> String
    where
        K::DynamicType: Default,
    {
        Self::key::<K>(&obj.namespace().unwrap_or_default(), &obj.name_any())
    }

    /// Puts an object in the store without recording a create.
    pub fn seed<K>(&self, obj: &K)
    where
        K: Resource + Serialize,
        K::DynamicType: Default,
    {
        self.objects
            .lock()
            .unwrap()
            .insert(Self::object_key(obj), serde_json::to_value(obj).unwrap());
    }

    /// Reads an object back out of the store.
    pub fn stored<K>(&self, namespace: &str, name: &str) -> Option<K>
    where
        K: Resource + DeserializeOwned,
        K::DynamicType: Default,
    {
        self.objects
            .lock()
            .unwrap()
            .get(&Self::key::<K>(namespace, name))
            .map(|value| serde_json::from_value(value.clone()).unwrap())
    }

    /// Makes every verb fail for the given `<Kind>/<namespace>/<name>` key.
    pub fn break_transport(&self, key: &str) {
        self.broken.lock().unwrap().insert(key.to_string());
    }

    /// Keys created so far, in call order.
    pub fn creates(&self) -> Vec<String> {
        self.creates.lock().unwrap().clone()
    }

    /// Keys updated so far, in call order.
    pub fn updates(&self) -> Vec<String> {
        self.updates.lock().unwrap().clone()
    }

    fn fail_if_broken(&self, key: &str) -> Result<(), ControllerError> {
        if self.broken.lock().unwrap().contains(key) {
            return Err(ControllerError::Transport(format!(
                "injected failure for {key}"
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl<K> ObjectOps<K> for MockPlatform
where
    K: Resource + Clone + Serialize + DeserializeOwned + Debug + Send + Sync,
    K::DynamicType: Default,
{
    async fn get(&self, namespace: &str, name: &str) -> Result<Option<K>, ControllerError> {
        let key = Self::key::<K>(namespace, name);
        self.fail_if_broken(&key)?;

        Ok(self
            .objects
            .lock()
            .unwrap()
            .get(&key)
            .map(|value| serde_json::from_value(value.clone()).unwrap()))
    }

    async fn create(&self, desired: &K) -> Result<(), ControllerError> {
        let key = Self::object_key(desired);
        self.fail_if_broken(&key)?;

        self.creates.lock().unwrap().push(key.clone());
        self.objects
            .lock()
            .unwrap()
            .insert(key, serde_json::to_value(desired).unwrap());

        Ok(())
    }

    async fn update(&self, desired: &K) -> Result<(), ControllerError> {
        let key = Self::object_key(desired);
        self.fail_if_broken(&key)?;

        self.updates.lock().unwrap().push(key.clone());
        self.objects
            .lock()
            .unwrap()
            .insert(key, serde_json::to_value(desired).unwrap());

        Ok(())
    }
}
