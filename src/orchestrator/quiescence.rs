//! Quiescence detector (§4.8): watches the Frontier Snapshot fingerprint
//! `(sumPendingBytes, newestMtime, claimLockCount)` on a fixed tick and
//! declares the run quiescent once pending work and outstanding claims both
//! hit zero and the fingerprint has held stable for long enough — or the
//! fleet has gone idle long enough — to rule out an in-flight batch.
//!
//! The background task this module spawns exists for observability: it
//! logs a telemetry event the moment quiescence is reached. The actual
//! run-completion signal the orchestrator waits on is every worker child
//! process exiting; this detector does not gate that wait.

use std::sync::Arc;
use std::time::Duration;

use crate::frontier::{Frontier, Snapshot};
use crate::telemetry::Hub;
use crate::utils::constants::{QUIESCENCE_STABLE_CYCLES, QUIESCENCE_TICK_MS, QUIESCENCE_WORKERS_IDLE};

pub struct QuiescenceDetector {
    last: Option<Snapshot>,
    stable_cycles: u32,
    idle_cycles: u32,
}

impl QuiescenceDetector {
    pub fn new() -> Self {
        QuiescenceDetector {
            last: None,
            stable_cycles: 0,
            idle_cycles: 0,
        }
    }

    /// Feed the latest snapshot in. Returns `true` once quiescence holds.
    pub fn tick(&mut self, snapshot: Snapshot) -> bool {
        let stable = self.last == Some(snapshot);
        self.stable_cycles = if stable { self.stable_cycles + 1 } else { 0 };
        self.idle_cycles = if snapshot.sum_pending_bytes == 0 {
            self.idle_cycles + 1
        } else {
            0
        };
        self.last = Some(snapshot);

        snapshot.sum_pending_bytes == 0
            && snapshot.claim_lock_count == 0
            && (self.stable_cycles >= QUIESCENCE_STABLE_CYCLES || self.idle_cycles >= QUIESCENCE_WORKERS_IDLE)
    }
}

impl Default for QuiescenceDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawn the background monitor task. Aborted by the caller once every
/// worker child has exited.
pub fn spawn_monitor(frontier: Arc<Frontier>, hub: Arc<Hub>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut detector = QuiescenceDetector::new();
        let mut declared = false;
        let mut ticker = tokio::time::interval(Duration::from_millis(QUIESCENCE_TICK_MS));
        loop {
            ticker.tick().await;
            let snapshot = frontier.snapshot();
            if detector.tick(snapshot) && !declared {
                declared = true;
                hub.apply(crate::telemetry::UpdateMessage::Event {
                    message: "frontier quiescent".to_string(),
                });
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snap(pending: u64, locks: usize) -> Snapshot {
        Snapshot {
            sum_pending_bytes: pending,
            newest_mtime_secs: 0,
            claim_lock_count: locks,
        }
    }

    #[test]
    fn declares_quiescent_after_stable_cycles() {
        let mut detector = QuiescenceDetector::new();
        for _ in 0..QUIESCENCE_STABLE_CYCLES - 1 {
            assert!(!detector.tick(snap(0, 0)));
        }
        assert!(detector.tick(snap(0, 0)));
    }

    #[test]
    fn never_quiescent_while_claims_are_outstanding() {
        let mut detector = QuiescenceDetector::new();
        for _ in 0..QUIESCENCE_STABLE_CYCLES + 5 {
            assert!(!detector.tick(snap(0, 1)));
        }
    }

    #[test]
    fn a_changed_fingerprint_resets_the_stable_counter() {
        let mut detector = QuiescenceDetector::new();
        detector.tick(snap(0, 0));
        detector.tick(snap(0, 0));
        assert!(!detector.tick(snap(100, 0)));
        assert_eq!(detector.stable_cycles, 0);
    }
}
