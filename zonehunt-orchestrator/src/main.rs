use anyhow::{bail, Context};
use tracing_subscriber::EnvFilter;
use zonehunt_common::Settings;

mod backoff;
mod classifier;
mod provider_manager;
mod reporter;
mod scheduler;
mod zone_pass;

#[cfg(test)]
mod test_support;

use provider_manager::ProviderManager;
use scheduler::Launch;
use zonehunt_providers::CloudProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let settings = Settings::from_env().context("invalid configuration")?;
    init_tracing(&settings);

    let provider = ProviderManager::get_provider(&settings)?;
    let launch = start(&settings, provider.as_ref()).await?;
    reporter::launched(&launch);
    Ok(())
}

/// List the zones once, then run the loop until a launch succeeds. A failed
/// or empty zone listing is fatal: nothing is attempted.
async fn start(settings: &Settings, provider: &dyn CloudProvider) -> anyhow::Result<Launch> {
    // Zones are listed once; the run never refreshes them.
    let zones = provider
        .list_zones()
        .await
        .context("failed to list availability domains")?;
    if zones.is_empty() {
        bail!(
            "no availability domains returned for tenancy {} in {}",
            settings.tenancy_id,
            settings.region
        );
    }

    reporter::starting(settings, &zones, provider.name());
    Ok(scheduler::run(provider, &zones, settings).await)
}

/// `RUST_LOG` wins when set; otherwise the validated `LOG_LEVEL` applies.
fn init_tracing(settings: &Settings) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(settings.log_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
