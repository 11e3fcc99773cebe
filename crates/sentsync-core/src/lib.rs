// # sentsync-core
//
// Core library for the sentinel-to-endpoint reconciliation system.
//
// ## Architecture Overview
//
// This library provides the core functionality for keeping a service
// endpoint pointed at the current master of a replicated data store:
// - **MasterSource**: trait for discovering the current master address
// - **EndpointPublisher**: trait for replacing the published endpoint set
// - **Reconciler**: the poll → decide → act loop that ties them together
//
// ## Design Principles
//
// 1. **Separation of Concerns**: the loop never speaks a wire protocol;
//    protocol clients never make update decisions
// 2. **Single Owner**: all mutable state lives in the reconciler, touched
//    once per cycle; there are no concurrent actors
// 3. **Failure Absorption**: a failed cycle is logged and skipped, never
//    fatal; retry is the next cycle at the same fixed cadence

pub mod config;
pub mod error;
pub mod reconciler;
pub mod traits;

// Re-export core types for convenience
pub use config::{LoopConfig, SyncConfig};
pub use error::{Error, Result};
pub use reconciler::{Reconciler, ReconcilerEvent, SyncState};
pub use traits::{EndpointPublisher, MasterSource};
