//! Dispatch counters for VirtualScheduler

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Snapshot of the scheduler's counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerMetrics {
    /// Callbacks accepted by `insert_schedule`
    pub inserted: u64,

    /// Successful cancellations
    pub cancelled: u64,

    /// Cancellations of unknown, fired or already cancelled handles
    pub cancel_misses: u64,

    /// Callbacks invoked
    pub dispatched: u64,

    /// Callbacks that came due while dispatch was disabled
    pub skipped: u64,

    /// Interval callbacks pushed forward after running
    pub rescheduled: u64,

    /// Completed `advance_time` calls
    pub advances: u64,
}

/// Counters shared by every clone of a scheduler
#[derive(Debug, Default)]
pub struct DispatchMetrics {
    inserted: AtomicU64,
    cancelled: AtomicU64,
    cancel_misses: AtomicU64,
    dispatched: AtomicU64,
    skipped: AtomicU64,
    rescheduled: AtomicU64,
    advances: AtomicU64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_insert(&self) {
        self.inserted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cancel(&self, found: bool) {
        if found {
            self.cancelled.fetch_add(1, Ordering::Relaxed);
        } else {
            self.cancel_misses.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_dispatch(&self, invoked: bool) {
        if invoked {
            self.dispatched.fetch_add(1, Ordering::Relaxed);
        } else {
            self.skipped.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn record_reschedule(&self) {
        self.rescheduled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_advance(&self) {
        self.advances.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics
    pub fn get_metrics(&self) -> SchedulerMetrics {
        SchedulerMetrics {
            inserted: self.inserted.load(Ordering::Relaxed),
            cancelled: self.cancelled.load(Ordering::Relaxed),
            cancel_misses: self.cancel_misses.load(Ordering::Relaxed),
            dispatched: self.dispatched.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            rescheduled: self.rescheduled.load(Ordering::Relaxed),
            advances: self.advances.load(Ordering::Relaxed),
        }
    }

    /// Reset all counters
    pub fn reset(&self) {
        for counter in [
            &self.inserted,
            &self.cancelled,
            &self.cancel_misses,
            &self.dispatched,
            &self.skipped,
            &self.rescheduled,
            &self.advances,
        ] {
            counter.store(0, Ordering::Relaxed);
        }
    }
}
