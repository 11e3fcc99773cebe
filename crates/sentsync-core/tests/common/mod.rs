//! Test doubles and common utilities for reconciler contract tests
//!
//! The doubles share their counters through `Arc`s so a test can keep a
//! clone while the reconciler owns the boxed instance.

use async_trait::async_trait;
use sentsync_core::config::SyncConfig;
use sentsync_core::error::{Error, Result};
use sentsync_core::traits::{EndpointPublisher, MasterSource};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// One scripted discovery outcome
#[derive(Debug, Clone)]
pub enum Step {
    /// Report this address as the current master
    Master(SocketAddr),
    /// Fail the discovery call with a transport error
    TransportFail,
}

/// A master source that replays a script of outcomes
///
/// Steps are consumed front to back; the final step repeats forever, so a
/// script of `[A]` models a stable master and `[A, B]` models one failover.
#[derive(Clone)]
pub struct ScriptedMasterSource {
    script: Arc<std::sync::Mutex<VecDeque<Step>>>,
    call_count: Arc<AtomicUsize>,
}

impl ScriptedMasterSource {
    pub fn new(steps: impl IntoIterator<Item = Step>) -> Self {
        let script: VecDeque<Step> = steps.into_iter().collect();
        assert!(!script.is_empty(), "script must not be empty");
        Self {
            script: Arc::new(std::sync::Mutex::new(script)),
            call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A source that always reports the same master
    pub fn stable(addr: SocketAddr) -> Self {
        Self::new([Step::Master(addr)])
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MasterSource for ScriptedMasterSource {
    async fn current_master(&self) -> Result<SocketAddr> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let mut script = self.script.lock().unwrap();
        let step = if script.len() > 1 {
            script.pop_front().unwrap()
        } else {
            script.front().cloned().unwrap()
        };
        match step {
            Step::Master(addr) => Ok(addr),
            Step::TransportFail => Err(Error::transport("scripted discovery failure")),
        }
    }
}

/// A publisher that records every call and can be told to fail
#[derive(Clone)]
pub struct RecordingPublisher {
    calls: Arc<std::sync::Mutex<Vec<SocketAddr>>>,
    failing: Arc<AtomicBool>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self {
            calls: Arc::new(std::sync::Mutex::new(Vec::new())),
            failing: Arc::new(AtomicBool::new(false)),
        }
    }

    /// All addresses passed to `publish()`, in call order
    pub fn calls(&self) -> Vec<SocketAddr> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Make subsequent publish calls fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl EndpointPublisher for RecordingPublisher {
    async fn publish(&self, addr: SocketAddr) -> Result<()> {
        self.calls.lock().unwrap().push(addr);
        if self.failing.load(Ordering::SeqCst) {
            Err(Error::http(409, "scripted publish failure"))
        } else {
            Ok(())
        }
    }
}

/// Helper to create a minimal SyncConfig for testing
pub fn test_config() -> SyncConfig {
    SyncConfig::new("redis-master")
}

/// Shorthand for building addresses in tests
pub fn addr(s: &str) -> SocketAddr {
    s.parse().expect("valid socket address")
}
