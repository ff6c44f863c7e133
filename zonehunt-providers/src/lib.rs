use anyhow::Result;
use async_trait::async_trait;
use zonehunt_common::{LaunchRequest, LaunchedInstance, Zone};

/// The two provider calls the launch loop needs.
///
/// Errors are returned as text-bearing `anyhow` errors. Callers only look at
/// the rendered message, so implementations must keep the provider's error
/// code and message in it.
#[async_trait]
pub trait CloudProvider: Send + Sync {
    /// Short provider code used in logs ("oci", "mock").
    fn name(&self) -> &'static str;

    /// Zone directory: availability domains of the configured tenancy, in
    /// provider order. Called once at startup.
    async fn list_zones(&self) -> Result<Vec<Zone>>;

    /// Submit one launch. `Ok` means the provider accepted the instance.
    async fn launch_instance(&self, request: &LaunchRequest) -> Result<LaunchedInstance>;
}

/// Render a provider error the way the OCI SDKs do, so that error markers
/// such as `Out of host capacity` or `TooManyRequests` can be matched on the
/// resulting text regardless of which provider produced it.
pub fn service_error_text(
    code: &str,
    message: &str,
    status: u16,
    opc_request_id: Option<&str>,
) -> String {
    format!(
        "Service error:{}. {}. http status code: {}. Opc request id: {}",
        code,
        message.trim_end_matches('.'),
        status,
        opc_request_id.unwrap_or("-")
    )
}

#[cfg(feature = "mock")]
pub mod mock;

#[cfg(feature = "oci")]
pub mod oci;

#[cfg(feature = "oci")]
pub mod signer;
