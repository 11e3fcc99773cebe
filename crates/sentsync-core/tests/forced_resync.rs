//! Contract tests: periodic forced re-publication
//!
//! The Sentinel answer can stay constant while the Endpoints resource is
//! externally reset, so after enough consecutive unchanged cycles the loop
//! must re-publish the same address.
//!
//! Constraints verified:
//! - No resync before the threshold of consecutive unchanged cycles
//! - Exactly one resync publish when the threshold is reached
//! - The stability counter resets on success and holds at the threshold on
//!   failure, so a failed resync retries every cycle

mod common;

use common::*;
use sentsync_core::{Reconciler, ReconcilerEvent};

/// Default threshold from LoopConfig
const THRESHOLD: u32 = 15;

#[tokio::test]
async fn no_resync_below_threshold() {
    let source = ScriptedMasterSource::stable(addr("10.0.0.1:6379"));
    let publisher = RecordingPublisher::new();

    let (mut reconciler, _events) = Reconciler::new(
        Box::new(source),
        Box::new(publisher.clone()),
        &test_config(),
    )
    .unwrap();

    // Transition cycle plus threshold-1 unchanged cycles.
    for _ in 0..(1 + THRESHOLD - 1) {
        reconciler.tick().await;
    }

    assert_eq!(publisher.call_count(), 1);
    assert_eq!(reconciler.stable_ticks(), THRESHOLD - 1);
}

#[tokio::test]
async fn resync_fires_exactly_once_at_threshold() {
    let source = ScriptedMasterSource::stable(addr("10.0.0.1:6379"));
    let publisher = RecordingPublisher::new();

    let (mut reconciler, mut events) = Reconciler::new(
        Box::new(source),
        Box::new(publisher.clone()),
        &test_config(),
    )
    .unwrap();

    // One transition into the address, then exactly `THRESHOLD` unchanged
    // cycles: two publish calls total.
    for _ in 0..(1 + THRESHOLD) {
        reconciler.tick().await;
    }

    assert_eq!(
        publisher.calls(),
        vec![addr("10.0.0.1:6379"), addr("10.0.0.1:6379")]
    );
    assert_eq!(reconciler.stable_ticks(), 0, "counter resets after a successful resync");

    // First event is the transition, second the resync.
    assert!(matches!(
        events.try_recv().unwrap(),
        ReconcilerEvent::MasterChanged { .. }
    ));
    assert_eq!(
        events.try_recv().unwrap(),
        ReconcilerEvent::Resynced {
            addr: addr("10.0.0.1:6379")
        }
    );
}

#[tokio::test]
async fn resync_cadence_repeats_after_success() {
    let source = ScriptedMasterSource::stable(addr("10.0.0.1:6379"));
    let publisher = RecordingPublisher::new();

    let (mut reconciler, _events) = Reconciler::new(
        Box::new(source),
        Box::new(publisher.clone()),
        &test_config(),
    )
    .unwrap();

    // Transition + two full resync periods.
    for _ in 0..(1 + 2 * THRESHOLD) {
        reconciler.tick().await;
    }

    assert_eq!(publisher.call_count(), 3);
}

#[tokio::test]
async fn failed_resync_is_retried_every_cycle() {
    let source = ScriptedMasterSource::stable(addr("10.0.0.1:6379"));
    let publisher = RecordingPublisher::new();

    let (mut reconciler, _events) = Reconciler::new(
        Box::new(source),
        Box::new(publisher.clone()),
        &test_config(),
    )
    .unwrap();

    // Reach the threshold with the publisher broken for the resync.
    reconciler.tick().await;
    publisher.set_failing(true);
    for _ in 0..THRESHOLD {
        reconciler.tick().await;
    }
    assert_eq!(publisher.call_count(), 2, "transition plus one failed resync");
    assert_eq!(reconciler.stable_ticks(), THRESHOLD, "counter holds at the threshold");

    // Once behind, every cycle retries the resync, not every 15th.
    reconciler.tick().await;
    reconciler.tick().await;
    assert_eq!(publisher.call_count(), 4);

    // And the first success resets the cadence.
    publisher.set_failing(false);
    reconciler.tick().await;
    assert_eq!(publisher.call_count(), 5);
    assert_eq!(reconciler.stable_ticks(), 0);
}
