//! Trait seams between the reconciler and its two collaborators
//!
//! The reconciler only knows about these two interfaces:
//! - [`MasterSource`]: answers "where is the master right now?"
//! - [`EndpointPublisher`]: pushes one address to the system of record
//!
//! Concrete implementations live in their own crates
//! (`sentsync-source-sentinel`, `sentsync-publisher-kube`).

mod endpoint_publisher;
mod master_source;

pub use endpoint_publisher::EndpointPublisher;
pub use master_source::MasterSource;
