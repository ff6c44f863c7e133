use anyhow::Result;
use zonehunt_common::{ProviderKind, Settings};
use zonehunt_providers::CloudProvider;

pub struct ProviderManager;

impl ProviderManager {
    /// Build the provider named by `PROVIDER`. For OCI this loads the API key,
    /// so a bad key fails here, before any zone is listed.
    pub fn get_provider(settings: &Settings) -> Result<Box<dyn CloudProvider>> {
        tracing::info!("🔌 [provider] using {}", settings.provider.as_str());
        match settings.provider {
            ProviderKind::Oci => oci(settings),
            ProviderKind::Mock => mock(settings),
        }
    }
}

#[cfg(feature = "provider-oci")]
fn oci(settings: &Settings) -> Result<Box<dyn CloudProvider>> {
    use anyhow::Context;
    let provider = zonehunt_providers::oci::OciProvider::new(settings)
        .context("failed to set up OCI authentication")?;
    Ok(Box::new(provider))
}

#[cfg(not(feature = "provider-oci"))]
fn oci(_settings: &Settings) -> Result<Box<dyn CloudProvider>> {
    anyhow::bail!("PROVIDER=oci requires the provider-oci feature")
}

#[cfg(feature = "provider-mock")]
fn mock(settings: &Settings) -> Result<Box<dyn CloudProvider>> {
    Ok(Box::new(
        zonehunt_providers::mock::MockProvider::capacity_then_success(settings.mock_failures),
    ))
}

#[cfg(not(feature = "provider-mock"))]
fn mock(_settings: &Settings) -> Result<Box<dyn CloudProvider>> {
    anyhow::bail!("PROVIDER=mock requires the provider-mock feature")
}
