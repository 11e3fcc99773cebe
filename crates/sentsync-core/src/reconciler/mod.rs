//! Core reconciliation engine
//!
//! The Reconciler is responsible for:
//! - Discovering the current master address via MasterSource
//! - Deciding whether the published endpoint needs an update
//! - Pushing the new address via EndpointPublisher
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────┐   current_master()   ┌──────────────┐
//! │ MasterSource │ ◄─────────────────── │  Reconciler  │──── events ───►
//! └──────────────┘                      └──────────────┘
//!                                              │
//!                                       publish(addr)
//!                                              ▼
//!                                    ┌───────────────────┐
//!                                    │ EndpointPublisher │
//!                                    └───────────────────┘
//! ```
//!
//! ## Cycle Flow
//!
//! 1. Query the master source
//! 2. Compare against the last published address
//! 3. Changed → publish; unchanged → count stable cycles, force a resync
//!    publish once the stability threshold is reached
//! 4. Sleep the fixed interval and repeat, forever
//!
//! Every discovery or publish failure is logged and absorbed; a failed cycle
//! never terminates the loop. Retry is the next cycle, at the same cadence.

use crate::config::SyncConfig;
use crate::error::Result;
use crate::traits::{EndpointPublisher, MasterSource};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{error, info, warn};

/// Events emitted by the Reconciler
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcilerEvent {
    /// The loop started
    Started,

    /// A new master was discovered and published
    MasterChanged {
        new: SocketAddr,
        previous: Option<SocketAddr>,
    },

    /// The unchanged address was force re-published after the stability threshold
    Resynced { addr: SocketAddr },

    /// The master source failed this cycle
    DiscoveryFailed { error: String },

    /// A publish attempt failed this cycle
    PublishFailed { addr: SocketAddr, error: String },
}

/// Mutable loop state, owned exclusively by the reconciler
///
/// Initialized to "unknown" at process start, never persisted, touched once
/// per cycle. `stable_ticks` counts consecutive cycles where the discovered
/// address equaled `last_published`; it is capped at the resync threshold so
/// a failed resync is retried every cycle rather than every threshold-th one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncState {
    /// Address most recently confirmed applied to the control plane
    pub last_published: Option<SocketAddr>,
    /// Consecutive cycles with an unchanged discovered address
    pub stable_ticks: u32,
}

/// Core reconciliation engine
///
/// Single logical thread of control: one loop, strictly sequential
/// poll → decide → act → sleep. There are no concurrent in-flight calls to
/// the source or the publisher, and no shared mutable state.
///
/// ## Lifecycle
///
/// 1. Create with [`Reconciler::new()`]
/// 2. Start with [`Reconciler::run()`]
/// 3. The loop has no normal termination path; it runs until the process is
///    killed (tests inject a shutdown channel via [`Reconciler::run_with_shutdown()`])
pub struct Reconciler {
    /// Discovery client
    source: Box<dyn MasterSource>,

    /// Control-plane updater
    publisher: Box<dyn EndpointPublisher>,

    /// Fixed sleep between cycles
    interval: Duration,

    /// Consecutive unchanged cycles before a forced re-publish
    resync_threshold: u32,

    /// Loop state
    state: SyncState,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<ReconcilerEvent>,
}

impl Reconciler {
    /// Create a new reconciler
    ///
    /// # Returns
    ///
    /// A tuple of (reconciler, event_receiver) where event_receiver yields
    /// [`ReconcilerEvent`]s as cycles run.
    pub fn new(
        source: Box<dyn MasterSource>,
        publisher: Box<dyn EndpointPublisher>,
        config: &SyncConfig,
    ) -> Result<(Self, mpsc::Receiver<ReconcilerEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.loop_settings.event_channel_capacity);

        let reconciler = Self {
            source,
            publisher,
            interval: Duration::from_secs(config.loop_settings.interval_secs),
            resync_threshold: config.loop_settings.resync_threshold,
            state: SyncState::default(),
            event_tx: tx,
        };

        Ok((reconciler, rx))
    }

    /// The address most recently confirmed published, if any
    pub fn last_published(&self) -> Option<SocketAddr> {
        self.state.last_published
    }

    /// Consecutive cycles the discovered address has matched the published one
    pub fn stable_ticks(&self) -> u32 {
        self.state.stable_ticks
    }

    /// Run the loop until the process is killed
    pub async fn run(&mut self) -> Result<()> {
        self.run_internal(None).await
    }

    /// Run the loop with an injected shutdown signal
    ///
    /// **TESTING ONLY**: contract tests need a controlled shutdown. Production
    /// code should use [`Reconciler::run()`], which stops only on SIGINT.
    pub async fn run_with_shutdown(
        &mut self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.run_internal(shutdown_rx).await
    }

    async fn run_internal(
        &mut self,
        shutdown_rx: Option<tokio::sync::oneshot::Receiver<()>>,
    ) -> Result<()> {
        self.emit_event(ReconcilerEvent::Started);
        info!(
            interval_secs = self.interval.as_secs(),
            resync_threshold = self.resync_threshold,
            "reconciler started"
        );

        if let Some(mut rx) = shutdown_rx {
            loop {
                self.tick().await;
                tokio::select! {
                    _ = tokio::time::sleep(self.interval) => {}
                    _ = &mut rx => {
                        info!("shutdown signal received");
                        break;
                    }
                }
            }
        } else {
            loop {
                self.tick().await;
                tokio::select! {
                    _ = tokio::time::sleep(self.interval) => {}
                    _ = tokio::signal::ctrl_c() => {
                        info!("shutdown signal received");
                        break;
                    }
                }
            }
        }

        Ok(())
    }

    /// Run exactly one poll → decide → act cycle
    ///
    /// Public so embedders and tests can drive the loop deterministically;
    /// [`Reconciler::run()`] calls this on the fixed interval.
    pub async fn tick(&mut self) {
        let discovered = match self.source.current_master().await {
            Ok(addr) => addr,
            Err(e) => {
                // No usable answer: no state change, no publish this cycle.
                if e.is_transient() {
                    warn!("master discovery failed: {e}");
                } else {
                    error!("master discovery failed: {e}");
                }
                self.emit_event(ReconcilerEvent::DiscoveryFailed {
                    error: e.to_string(),
                });
                return;
            }
        };

        if self.state.last_published != Some(discovered) {
            match self.publisher.publish(discovered).await {
                Ok(()) => {
                    let previous = self.state.last_published;
                    self.state.last_published = Some(discovered);
                    self.state.stable_ticks = 0;
                    warn!("master endpoint changed to {discovered}");
                    self.emit_event(ReconcilerEvent::MasterChanged {
                        new: discovered,
                        previous,
                    });
                }
                Err(e) => {
                    // State untouched; next cycle retries the same transition.
                    error!("failed to publish endpoint {discovered}: {e}");
                    self.emit_event(ReconcilerEvent::PublishFailed {
                        addr: discovered,
                        error: e.to_string(),
                    });
                }
            }
        } else {
            if self.state.stable_ticks < self.resync_threshold {
                self.state.stable_ticks += 1;
            }
            if self.state.stable_ticks >= self.resync_threshold {
                // The Endpoints record can be reset behind our back while the
                // Sentinel answer stays constant; force a re-publish.
                match self.publisher.publish(discovered).await {
                    Ok(()) => {
                        self.state.stable_ticks = 0;
                        info!("synced endpoint to {discovered}");
                        self.emit_event(ReconcilerEvent::Resynced { addr: discovered });
                    }
                    Err(e) => {
                        // Counter stays at the threshold: the resync is
                        // retried every cycle until it lands.
                        error!("can't sync endpoint to {discovered}: {e}");
                        self.emit_event(ReconcilerEvent::PublishFailed {
                            addr: discovered,
                            error: e.to_string(),
                        });
                    }
                }
            }
        }
    }

    fn emit_event(&self, event: ReconcilerEvent) {
        use tokio::sync::mpsc::error::TrySendError;

        // Observation is best-effort; a slow or absent consumer must never
        // stall the loop.
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!("event channel full, dropping reconciler event");
            }
            Err(TrySendError::Closed(_)) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_state_starts_unknown() {
        let state = SyncState::default();
        assert_eq!(state.last_published, None);
        assert_eq!(state.stable_ticks, 0);
    }

    #[test]
    fn events_are_comparable() {
        let addr: SocketAddr = "10.0.0.1:6379".parse().unwrap();
        let event = ReconcilerEvent::Resynced { addr };
        assert_eq!(event.clone(), event);
    }
}
