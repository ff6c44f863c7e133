use crate::signer::RequestSigner;
use crate::{service_error_text, CloudProvider};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method, Response, Url};
use serde::Deserialize;
use std::time::Duration;
use zonehunt_common::{LaunchRequest, LaunchedInstance, Settings, Zone};

const API_VERSION: &str = "20160918";

pub struct OciProvider {
    client: Client,
    signer: RequestSigner,
    tenancy_id: String,
    identity_endpoint: String,
    compute_endpoint: String,
}

#[derive(Deserialize)]
struct AvailabilityDomain {
    id: Option<String>,
    name: String,
}

#[derive(Deserialize, Default)]
struct ServiceErrorBody {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

impl OciProvider {
    /// Reads the API key from `settings.key_path`. A missing or unusable key
    /// is an authentication failure and aborts startup.
    pub fn new(settings: &Settings) -> Result<Self> {
        let signer = RequestSigner::from_key_file(settings.key_id(), &settings.key_path)?;
        Self::with_signer(settings, signer)
    }

    pub fn with_signer(settings: &Settings, signer: RequestSigner) -> Result<Self> {
        // Default reqwest client has no overall timeout. A stalled launch call would block the loop.
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(30))
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            signer,
            tenancy_id: settings.tenancy_id.clone(),
            identity_endpoint: format!("https://identity.{}.oraclecloud.com", settings.region),
            compute_endpoint: format!("https://iaas.{}.oraclecloud.com", settings.region),
        })
    }

    /// Point both services at another base URL (tests, proxies).
    pub fn with_endpoints(mut self, identity: impl Into<String>, compute: impl Into<String>) -> Self {
        self.identity_endpoint = identity.into().trim_end_matches('/').to_string();
        self.compute_endpoint = compute.into().trim_end_matches('/').to_string();
        self
    }

    async fn send(&self, method: Method, url: Url, body: Option<Vec<u8>>) -> Result<Response> {
        let headers = self.signer.sign(&method, &url, body.as_deref())?;
        tracing::debug!("[OCI API] {} {}", method, url);

        let mut req = self.client.request(method.clone(), url.clone()).headers(headers);
        if let Some(body) = body {
            req = req.body(body);
        }
        let resp = req
            .send()
            .await
            .with_context(|| format!("{} {} failed", method, url))?;

        let status = resp.status();
        if status.is_success() {
            tracing::debug!("[OCI API] {} {} succeeded: status={}", method, url, status.as_u16());
            return Ok(resp);
        }

        let opc_request_id = resp
            .headers()
            .get("opc-request-id")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());
        let text = resp.text().await.unwrap_or_default();
        let parsed: ServiceErrorBody = serde_json::from_str(&text).unwrap_or_default();
        let code = if parsed.code.is_empty() {
            status.canonical_reason().unwrap_or("Unknown").replace(' ', "")
        } else {
            parsed.code
        };
        let message = if parsed.message.is_empty() { text } else { parsed.message };

        tracing::debug!(
            "[OCI API] {} {} failed: status={} code={}",
            method,
            url,
            status.as_u16(),
            code
        );
        Err(anyhow!(service_error_text(
            &code,
            &message,
            status.as_u16(),
            opc_request_id.as_deref()
        )))
    }
}

#[async_trait]
impl CloudProvider for OciProvider {
    fn name(&self) -> &'static str {
        "oci"
    }

    async fn list_zones(&self) -> Result<Vec<Zone>> {
        let url = Url::parse_with_params(
            &format!("{}/{}/availabilityDomains", self.identity_endpoint, API_VERSION),
            &[("compartmentId", self.tenancy_id.as_str())],
        )
        .context("invalid identity endpoint")?;

        let resp = self
            .send(Method::GET, url, None)
            .await
            .context("ListAvailabilityDomains failed")?;
        let domains: Vec<AvailabilityDomain> = resp
            .json()
            .await
            .context("unexpected ListAvailabilityDomains response")?;

        Ok(domains
            .into_iter()
            .map(|d| Zone {
                id: d.id.unwrap_or_else(|| d.name.clone()),
                name: d.name,
            })
            .collect())
    }

    async fn launch_instance(&self, request: &LaunchRequest) -> Result<LaunchedInstance> {
        let url = Url::parse(&format!("{}/{}/instances/", self.compute_endpoint, API_VERSION))
            .context("invalid compute endpoint")?;
        let body = serde_json::to_vec(request)?;

        let resp = self.send(Method::POST, url, Some(body)).await?;
        let instance: LaunchedInstance = resp
            .json()
            .await
            .context("unexpected LaunchInstance response")?;
        Ok(instance)
    }
}
