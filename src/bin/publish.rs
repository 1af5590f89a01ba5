//! Script to publish the deployment folder to a hub Space.

use dotenvy::dotenv;
use std::path::PathBuf;

use tourism_predict::config::PublishConfig;
use tourism_predict::integrations::{hub_client::HubClient, publisher::Publisher};

/// Main entry point for the publish script.
///
/// Uploads every file of the deployment folder (first argument, `DEPLOY_DIR`,
/// or `deployment/`) to the configured repository in a single commit and
/// prints its public address.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt::init();

    let config = PublishConfig::from_env(std::env::args().nth(1).map(PathBuf::from))?;
    let hub = HubClient::new(config.hub_endpoint.clone(), Some(config.hub_token.clone()))?;

    let report = Publisher::new(hub)
        .publish(
            &config.deploy_dir,
            &config.repo,
            &config.revision,
            &config.path_in_repo,
        )
        .await?;

    tracing::info!(
        "Published {} file(s), {} bytes at {}",
        report.files,
        report.bytes,
        report.completed_at.to_rfc3339()
    );
    if let Some(commit_url) = &report.commit_url {
        tracing::info!("Commit: {}", commit_url);
    }
    println!("Pushed deployment folder to: {}", report.url);

    Ok(())
}
