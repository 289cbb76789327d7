//! Cluster Controller
//!
//! Reconciles Cluster descriptors into the per-app resources the
//! platform runs:
//! - a ServiceAccount, ConfigMap, and Deployment for each of the bot,
//!   processor, and slacker apps
//! - a PersistentVolumeClaim for the bot's message database
//! - a meta ConfigMap summarising what was deployed and from where
//!
//! Configuration comes from the environment; see [`settings::Settings`].

mod controller;
mod error;
mod platform;
mod reconciler;
mod settings;

#[cfg(test)]
mod test_utils;

use crate::error::ControllerError;
use crate::settings::Settings;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), ControllerError> {
    tracing_subscriber::fmt::init();

    info!("Starting Cluster Controller");

    let settings = Settings::from_env()?;

    info!("Configuration:");
    info!("  Project: {}", settings.project);
    info!("  Volume type: {}", settings.volume_type);
    info!("  Volume size: {}", settings.volume_size.0);

    controller::run(settings).await
}
