// # Endpoint Publisher Trait
//
// Defines the interface for replacing the published endpoint set in the
// control plane with a single address.
//
// ## Implementations
//
// - Kubernetes Endpoints: `sentsync-publisher-kube` crate
// - Test doubles: `tests/common/mod.rs`

use async_trait::async_trait;
use std::net::SocketAddr;

/// Trait for endpoint publisher implementations
///
/// Implementations are stateless per call and must be bounded in time; a
/// publish call may never block the reconciliation loop indefinitely. Retry
/// is owned by the reconciler (implicitly, via the next cycle) and must not
/// be duplicated here.
#[async_trait]
pub trait EndpointPublisher: Send + Sync {
    /// Replace the published endpoint set with exactly this address
    ///
    /// On success the control plane's record for the configured resource is
    /// atomically replaced.
    async fn publish(&self, addr: SocketAddr) -> Result<(), crate::Error>;
}
