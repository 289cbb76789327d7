//! Controller wiring.
//!
//! Watches Cluster descriptors and the child resource kinds they own,
//! and translates the reconciler's requeue contract into scheduler
//! actions. Everything interesting happens in [`crate::reconciler`];
//! this module is plumbing.

use crate::error::ControllerError;
use crate::platform::KubePlatform;
use crate::reconciler::Reconciler;
use crate::settings::Settings;
use crds::Cluster;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::Deployment;
use k8s_openapi::api::core::v1::{ConfigMap, PersistentVolumeClaim, ServiceAccount};
use kube::{Api, Client};
use kube_runtime::{Controller, controller::Action, watcher};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Requeue applied when a cycle fails outright.
const ERROR_REQUEUE: Duration = Duration::from_secs(60);

/// Runs the controller until the watch stream ends.
pub async fn run(settings: Settings) -> Result<(), ControllerError> {
    let client = Client::try_default().await?;
    let clusters: Api<Cluster> = Api::all(client.clone());
    let reconciler = Arc::new(Reconciler::new(KubePlatform::new(client.clone()), settings));

    info!("Cluster controller running");

    Controller::new(clusters, watcher::Config::default())
        .owns(Api::<Deployment>::all(client.clone()), watcher::Config::default())
        .owns(Api::<ServiceAccount>::all(client.clone()), watcher::Config::default())
        .owns(Api::<ConfigMap>::all(client.clone()), watcher::Config::default())
        .owns(Api::<PersistentVolumeClaim>::all(client), watcher::Config::default())
        .run(reconcile, error_policy, reconciler)
        .for_each(|result| async move {
            match result {
                Ok((cluster, _)) => info!("Reconciled {:?}", cluster),
                Err(e) => warn!("Reconciliation failed: {}", e),
            }
        })
        .await;

    Ok(())
}

async fn reconcile(
    cluster: Arc<Cluster>,
    ctx: Arc<Reconciler<KubePlatform>>,
) -> Result<Action, ControllerError> {
    let requeue = ctx.reconcile(&cluster).await?;

    if requeue.is_zero() {
        Ok(Action::await_change())
    } else {
        Ok(Action::requeue(requeue))
    }
}

fn error_policy(
    _cluster: Arc<Cluster>,
    error: &ControllerError,
    _ctx: Arc<Reconciler<KubePlatform>>,
) -> Action {
    error!("Reconciliation error: {}", error);

    Action::requeue(ERROR_REQUEUE)
}
