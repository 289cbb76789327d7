//! Reconciliation engine for the Cluster descriptor.
//!
//! One synchronous pass per cycle: the bot, processor, and slacker
//! pipelines run strictly in that order, each an ordered list of upsert
//! steps, and the cycle short-circuits on the first error or the first
//! step that asks to be re-observed. Only a fully clean pass writes the
//! meta summary. Nothing is carried between cycles; desired state is
//! recomputed from the descriptor every time, so a failed cycle retries
//! from the top.

mod apps;
mod resources;
mod upsert;


use crate::error::ControllerError;
use crate::platform::PlatformClient;
use crate::settings::Settings;
use apps::{BOT_STEPS, PROCESSOR_STEPS, SLACKER_STEPS, Step};
use chrono::Utc;
use crds::{Cluster, ClusterApp};
use kube::ResourceExt;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info};
use upsert::upsert;

/// Reconciles Cluster descriptors against observed platform state.
pub struct Reconciler<P: PlatformClient> {
    platform: P,
    settings: Settings,
}

impl<P: PlatformClient> Reconciler<P> {
    /// Creates a new reconciler instance.
    pub fn new(platform: P, settings: Settings) -> Self {
        Self { platform, settings }
    }

    /// Runs one reconciliation cycle.
    ///
    /// Returns the requeue delay the cycle asks for: zero means the
    /// cluster converged, anything else means re-invoke after that long.
    /// Errors abort the cycle and are left to the caller's backoff.
    pub async fn reconcile(&self, cluster: &Cluster) -> Result<Duration, ControllerError> {
        debug!("Reconciling Cluster {}/{}", cluster.namespace().unwrap_or_default(), cluster.name_any());

        let pipelines = [
            (ClusterApp::Bot, BOT_STEPS),
            (ClusterApp::Processor, PROCESSOR_STEPS),
            (ClusterApp::Slacker, SLACKER_STEPS),
        ];

        for (app, steps) in pipelines {
            let requeue = self.run_pipeline(cluster, app, steps).await?;
            if !requeue.is_zero() {
                return Ok(requeue);
            }
        }

        self.write_summary(cluster).await
    }

    async fn run_pipeline(
        &self,
        cluster: &Cluster,
        app: ClusterApp,
        steps: &[Step],
    ) -> Result<Duration, ControllerError> {
        let labels = apps::labels(cluster, app);
        let selectors = apps::selectors(cluster, app);
        let config = apps::injected_config(cluster, app);

        for step in steps {
            let requeue = self
                .run_step(cluster, app, *step, &labels, &selectors, &config)
                .await?;
            if !requeue.is_zero() {
                return Ok(requeue);
            }
        }

        Ok(Duration::ZERO)
    }

    async fn run_step(
        &self,
        cluster: &Cluster,
        app: ClusterApp,
        step: Step,
        labels: &BTreeMap<String, String>,
        selectors: &BTreeMap<String, String>,
        config: &BTreeMap<String, String>,
    ) -> Result<Duration, ControllerError> {
        match step {
            Step::ServiceAccount => {
                let desired =
                    resources::service_account(cluster, app, labels, &self.settings.project);

                upsert(&self.platform, cluster, desired, upsert::service_account_differs).await
            }
            Step::ConfigMap => {
                let desired = resources::config_map(cluster, app, labels, config);

                upsert(&self.platform, cluster, desired, upsert::config_map_differs).await
            }
            Step::StorageClaim => {
                let desired = resources::persistent_volume_claim(
                    cluster,
                    app,
                    labels,
                    &self.settings.volume_size,
                );

                upsert(&self.platform, cluster, desired, upsert::claim_differs).await
            }
            Step::Deployment => {
                let desired = resources::deployment(
                    cluster,
                    app,
                    labels,
                    selectors,
                    &self.settings.volume_type,
                );

                upsert(&self.platform, cluster, desired, upsert::deployment_differs).await
            }
        }
    }

    /// The meta summary: written only after every app pipeline completes
    /// cleanly, recording what was deployed and from where.
    async fn write_summary(&self, cluster: &Cluster) -> Result<Duration, ControllerError> {
        let summary = BTreeMap::from([
            ("bot_sbom".to_string(), cluster.sbom_url(ClusterApp::Bot)),
            ("processor_sbom".to_string(), cluster.sbom_url(ClusterApp::Processor)),
            ("slacker_sbom".to_string(), cluster.sbom_url(ClusterApp::Slacker)),
            ("last_deploy".to_string(), Utc::now().to_rfc3339()),
            ("version".to_string(), env!("CARGO_PKG_VERSION").to_string()),
            ("project".to_string(), self.settings.project.clone()),
        ]);

        let labels = apps::labels(cluster, ClusterApp::Meta);
        let desired = resources::config_map(cluster, ClusterApp::Meta, &labels, &summary);

        let requeue = upsert(&self.platform, cluster, desired, upsert::config_map_differs).await?;
        if requeue.is_zero() {
            info!("Cluster {} converged", cluster.name_any());
        }

        Ok(requeue)
    }
}
