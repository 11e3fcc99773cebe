// # Master Source Trait
//
// Defines the interface for discovering the current master address from a
// failover-detection authority.
//
// ## Implementations
//
// - Redis Sentinel: `sentsync-source-sentinel` crate
// - Test doubles: `tests/common/mod.rs`

use async_trait::async_trait;
use std::net::SocketAddr;

/// Trait for master discovery implementations
///
/// Implementations are stateless per call: open, query, parse, close. They
/// make no decision about whether the answer warrants an update; that is the
/// reconciler's job. They must never report a loopback address as a usable
/// master (see [`crate::Error::StaleData`]).
#[async_trait]
pub trait MasterSource: Send + Sync {
    /// Query the authority once for the current master address
    ///
    /// # Returns
    ///
    /// - `Ok(SocketAddr)`: the master's address as reported right now
    /// - `Err(Error)`: transport, protocol, stale-data or parse failure
    async fn current_master(&self) -> Result<SocketAddr, crate::Error>;
}
