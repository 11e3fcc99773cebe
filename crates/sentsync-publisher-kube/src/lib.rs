// # Kubernetes Endpoints Publisher
//
// This crate provides the Kubernetes implementation of `EndpointPublisher`.
//
// ## API Call
//
// ```http
// PATCH /api/v1/namespaces/:namespace/endpoints/:service
// Content-Type: application/json-patch+json
// Authorization: Bearer <token>
//
// [{"op": "replace", "path": "/subsets", "value": [
//   {"addresses": [{"ip": "10.20.30.40"}],
//    "ports": [{"name": "redis", "port": 6379, "protocol": "TCP"}]}
// ]}]
// ```
//
// One successful PATCH atomically replaces the resource's subsets with
// exactly the given address.
//
// ## Credentials
//
// Bearer token, namespace and CA certificate are read from the
// service-account directory on EVERY call, never cached, so externally
// rotated credentials take effect without a restart. The HTTPS client trusts
// exactly the loaded CA; the system trust store is disabled.
//
// ## Security
//
// The bearer token never appears in logs or in `Debug` output.

use async_trait::async_trait;
use sentsync_core::traits::EndpointPublisher;
use sentsync_core::{Error, Result};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Where Kubernetes mounts service-account material inside a pod
const DEFAULT_SECRETS_DIR: &str = "/var/run/secrets/kubernetes.io/serviceaccount";

/// Port name tagged onto the single published port entry
const PORT_NAME: &str = "redis";

/// Transport protocol tagged onto the single published port entry
const PORT_PROTOCOL: &str = "TCP";

/// Request timeout; a publish call must never stall the reconciliation loop
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(2);

/// Kubernetes Endpoints publisher
///
/// Stateless per call: credentials are read, used and discarded inside each
/// `publish()`; the HTTPS client is rebuilt around the freshly loaded CA.
pub struct KubeEndpointPublisher {
    /// API server address (host:port)
    api_addr: String,

    /// Name of the Endpoints resource to patch
    service_name: String,

    /// Directory holding `token`, `namespace` and `ca.crt`
    secrets_dir: PathBuf,

    /// Per-request timeout
    request_timeout: Duration,
}

impl std::fmt::Debug for KubeEndpointPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KubeEndpointPublisher")
            .field("api_addr", &self.api_addr)
            .field("service_name", &self.service_name)
            .field("secrets_dir", &self.secrets_dir)
            .finish()
    }
}

/// Service-account material, read fresh per publish call
///
/// Ownership is transient: loaded, used for one request, dropped.
#[derive(Debug)]
struct Credentials {
    token: String,
    namespace: String,
    ca_pem: Vec<u8>,
}

impl KubeEndpointPublisher {
    /// Create a publisher using the in-pod service-account directory
    pub fn new(api_addr: impl Into<String>, service_name: impl Into<String>) -> Self {
        Self {
            api_addr: api_addr.into(),
            service_name: service_name.into(),
            secrets_dir: PathBuf::from(DEFAULT_SECRETS_DIR),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Override the credential directory
    pub fn with_secrets_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.secrets_dir = dir.into();
        self
    }

    /// Override the per-request timeout
    pub fn with_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

#[async_trait]
impl EndpointPublisher for KubeEndpointPublisher {
    async fn publish(&self, addr: SocketAddr) -> Result<()> {
        let creds = load_credentials(&self.secrets_dir).await?;

        let trust_anchor = reqwest::Certificate::from_pem(&creds.ca_pem)
            .map_err(|e| Error::credential(format!("invalid CA certificate: {e}")))?;

        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .tls_built_in_root_certs(false)
            .add_root_certificate(trust_anchor)
            .timeout(self.request_timeout)
            .build()
            .map_err(|e| Error::transport(format!("failed to build HTTPS client: {e}")))?;

        let url = endpoints_url(&self.api_addr, &creds.namespace, &self.service_name);
        let patch = subsets_patch(addr);
        tracing::debug!(%url, body = %patch, "patching endpoints resource");

        let response = client
            .patch(&url)
            .header("Content-Type", "application/json-patch+json")
            .bearer_auth(&creds.token)
            .json(&patch)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    Error::transport(format!(
                        "endpoints patch timed out after {:?}",
                        self.request_timeout
                    ))
                } else {
                    Error::transport(format!("endpoints patch failed: {e}"))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read error response".to_string());
            return Err(Error::http(status.as_u16(), message));
        }

        tracing::debug!(%addr, service = %self.service_name, "endpoints resource patched");
        Ok(())
    }
}

/// Read the bearer token, namespace and CA certificate from `dir`
///
/// Token and namespace are trimmed; a trailing newline in the token file
/// would otherwise corrupt the Authorization header.
async fn load_credentials(dir: &Path) -> Result<Credentials> {
    let token = tokio::fs::read_to_string(dir.join("token"))
        .await
        .map_err(|e| Error::credential(format!("can't read bearer token: {e}")))?;
    let namespace = tokio::fs::read_to_string(dir.join("namespace"))
        .await
        .map_err(|e| Error::credential(format!("can't read namespace: {e}")))?;
    let ca_pem = tokio::fs::read(dir.join("ca.crt"))
        .await
        .map_err(|e| Error::credential(format!("can't read CA certificate: {e}")))?;

    Ok(Credentials {
        token: token.trim().to_string(),
        namespace: namespace.trim().to_string(),
        ca_pem,
    })
}

/// URL of the Endpoints resource on the API server
fn endpoints_url(api_addr: &str, namespace: &str, service_name: &str) -> String {
    format!("https://{api_addr}/api/v1/namespaces/{namespace}/endpoints/{service_name}")
}

/// JSON patch replacing the resource's subsets with exactly one address
fn subsets_patch(addr: SocketAddr) -> serde_json::Value {
    serde_json::json!([{
        "op": "replace",
        "path": "/subsets",
        "value": [{
            "addresses": [{"ip": addr.ip().to_string()}],
            "ports": [{
                "name": PORT_NAME,
                "port": addr.port(),
                "protocol": PORT_PROTOCOL,
            }],
        }],
    }])
}
