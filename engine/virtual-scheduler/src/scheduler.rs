//! Core VirtualScheduler implementation

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, TimeZone, Utc};
use parking_lot::Mutex;

use crate::config::SchedulerConfig;
use crate::error::{PastAction, Result, SchedulerError};
use crate::metrics::{DispatchMetrics, SchedulerMetrics};
use crate::time::{FastForward, Localizer, TimeSpec};
use crate::types::{Callback, DueCallback, Handle, Kwargs, PendingCallback, PendingSnapshot};

/// The VirtualScheduler - a discrete-event clock that replaces the platform's timer loop
///
/// Clones share the same clock and pending set, so callbacks can capture a clone and
/// schedule or cancel further work while they are being dispatched.
#[derive(Clone)]
pub struct VirtualScheduler {
    inner: Arc<Mutex<SchedulerInner>>,
    localizer: Localizer,
    metrics: Arc<DispatchMetrics>,
}

/// Internal state that can be mutated
struct SchedulerInner {
    /// Naive UTC
    current_time: NaiveDateTime,
    /// Naive UTC
    start_time: NaiveDateTime,
    pending: BTreeMap<u64, PendingCallback>,
    handles: HashMap<Handle, u64>,
    next_sequence: u64,
}

impl SchedulerInner {
    fn new(start_time: NaiveDateTime) -> Self {
        Self {
            current_time: start_time,
            start_time,
            pending: BTreeMap::new(),
            handles: HashMap::new(),
            next_sequence: 0,
        }
    }

    fn next_due(&self, target: NaiveDateTime) -> Option<&PendingCallback> {
        self.pending
            .values()
            .filter(|pending| pending.run_at <= target)
            .min_by_key(|pending| pending.dispatch_key())
    }
}

impl VirtualScheduler {
    /// Create a new VirtualScheduler
    pub fn new(config: SchedulerConfig) -> Result<Self> {
        let localizer = config.localizer()?;
        let start_time = localizer.localize(config.start_time)?.naive_utc();

        tracing::info!(
            start_time = %start_time,
            utc_offset_seconds = config.utc_offset_seconds,
            "Creating VirtualScheduler"
        );

        Ok(Self::with_localizer(localizer, start_time))
    }

    /// Scheduler in UTC starting at 2000-01-01 00:00
    pub fn utc() -> Self {
        Self::with_localizer(Localizer::utc(), crate::config::default_start_time())
    }

    fn with_localizer(localizer: Localizer, start_time: NaiveDateTime) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SchedulerInner::new(start_time))),
            localizer,
            metrics: Arc::new(DispatchMetrics::new()),
        }
    }

    pub fn localizer(&self) -> &Localizer {
        &self.localizer
    }

    /// Current simulated time in UTC
    pub fn now(&self) -> DateTime<Utc> {
        self.inner.lock().current_time.and_utc()
    }

    /// Current simulated time in the configured local offset
    pub fn now_local(&self) -> DateTime<FixedOffset> {
        self.localizer.to_local(&self.now())
    }

    /// Current local wall-clock time, zone stripped
    pub fn now_naive(&self) -> NaiveDateTime {
        self.localizer.make_naive(&self.now())
    }

    /// Current simulated time as epoch seconds
    pub fn now_as_timestamp(&self) -> f64 {
        let now = self.now();
        now.timestamp() as f64 + f64::from(now.timestamp_subsec_micros()) / 1_000_000.0
    }

    /// The time the simulation was last started at
    pub fn start_time(&self) -> DateTime<Utc> {
        self.inner.lock().start_time.and_utc()
    }

    /// Simulated time elapsed since the start time
    pub fn elapsed(&self) -> Duration {
        let inner = self.inner.lock();
        inner.current_time - inner.start_time
    }

    pub fn elapsed_seconds(&self) -> f64 {
        let elapsed = self.elapsed();
        elapsed.num_seconds() as f64 + f64::from(elapsed.subsec_nanos()) / 1_000_000_000.0
    }

    /// Set both the start time and the current time
    ///
    /// A time-of-day is combined with the current simulated local date. Only allowed while
    /// nothing is pending.
    pub fn set_start_time(&self, time: impl Into<TimeSpec>) -> Result<()> {
        let mut inner = self.inner.lock();
        if !inner.pending.is_empty() {
            return Err(SchedulerError::SchedulingState { pending: inner.pending.len() });
        }

        let start_time = time.into().resolve(inner.current_time, &self.localizer)?;
        inner.start_time = start_time;
        inner.current_time = start_time;

        tracing::info!(start_time = %start_time, "Simulation start time set");
        Ok(())
    }

    /// Register `callback` to run once simulated time reaches `target_time`
    ///
    /// With a non-zero `interval` the callback is pushed forward by that many seconds after
    /// every run instead of being removed.
    pub fn insert_schedule<Tz, F>(
        &self,
        target_time: DateTime<Tz>,
        callback: F,
        kwargs: Kwargs,
        interval: u64,
    ) -> Result<Handle>
    where
        Tz: TimeZone,
        F: Fn(&Kwargs) + Send + Sync + 'static,
    {
        self.insert_shared(target_time.naive_utc(), Arc::new(callback), kwargs, interval)
    }

    /// Same as `insert_schedule` for a callback that is already shared
    pub fn insert_callback<Tz: TimeZone>(
        &self,
        target_time: DateTime<Tz>,
        callback: Callback,
        kwargs: Kwargs,
        interval: u64,
    ) -> Result<Handle> {
        self.insert_shared(target_time.naive_utc(), callback, kwargs, interval)
    }

    fn insert_shared(
        &self,
        run_at: NaiveDateTime,
        callback: Callback,
        kwargs: Kwargs,
        interval: u64,
    ) -> Result<Handle> {
        let mut inner = self.inner.lock();
        if run_at < inner.current_time {
            return Err(SchedulerError::past(PastAction::Schedule, run_at, inner.current_time));
        }

        let handle = Handle::generate();
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;

        tracing::debug!(handle = %handle, run_at = %run_at, interval, "Callback scheduled");

        inner.handles.insert(handle.clone(), sequence);
        inner.pending.insert(
            sequence,
            PendingCallback { handle: handle.clone(), sequence, run_at, callback, kwargs, interval },
        );
        self.metrics.record_insert();

        Ok(handle)
    }

    /// Remove the pending callback for `handle`
    ///
    /// Returns false for unknown, already fired or already cancelled handles.
    pub fn cancel(&self, handle: &Handle) -> bool {
        let mut inner = self.inner.lock();
        let found = match inner.handles.remove(handle) {
            Some(sequence) => inner.pending.remove(&sequence).is_some(),
            None => false,
        };
        drop(inner);

        if found {
            tracing::debug!(handle = %handle, "Callback cancelled");
        } else {
            tracing::debug!(handle = %handle, "Cancel ignored, handle not pending");
        }
        self.metrics.record_cancel(found);
        found
    }

    /// Advance simulated time to `target_time`, dispatching everything due on the way
    ///
    /// Callbacks run strictly in `(run_at, insertion order)` order. The clock is moved to each
    /// callback's own run time before it is invoked, and callbacks scheduled during dispatch
    /// are picked up by the same call if they come due before `target_time`.
    pub fn advance_time<Tz: TimeZone>(&self, target_time: DateTime<Tz>, dispatch: bool) -> Result<()> {
        self.advance_to(target_time.naive_utc(), dispatch)
    }

    /// Resolve `request` against the current time and advance to it, dispatching callbacks
    pub fn fast_forward(&self, request: impl Into<FastForward>) -> Result<()> {
        let now = self.inner.lock().current_time;
        let target = request.into().resolve(now, &self.localizer)?;
        self.advance_to(target, true)
    }

    fn advance_to(&self, target: NaiveDateTime, dispatch: bool) -> Result<()> {
        {
            let inner = self.inner.lock();
            if target < inner.current_time {
                return Err(SchedulerError::past(PastAction::Advance, target, inner.current_time));
            }
        }

        while let Some(due) = self.take_next_due(target) {
            if dispatch {
                tracing::debug!(handle = %due.handle, run_at = %due.run_at, "Dispatching callback");
                (due.callback)(&due.kwargs);
            }
            self.metrics.record_dispatch(dispatch);
            self.settle(&due.handle);
        }

        self.inner.lock().current_time = target;
        self.metrics.record_advance();
        Ok(())
    }

    /// Pick the earliest callback due at or before `target` and move the clock to it
    ///
    /// The lock is released before the callback is invoked.
    fn take_next_due(&self, target: NaiveDateTime) -> Option<DueCallback> {
        let mut inner = self.inner.lock();
        let next = inner.next_due(target)?;
        let due = DueCallback {
            handle: next.handle.clone(),
            run_at: next.run_at,
            callback: Arc::clone(&next.callback),
            kwargs: next.kwargs.clone(),
        };
        inner.current_time = due.run_at;
        Some(due)
    }

    /// Reschedule or retire a callback that just came due
    fn settle(&self, handle: &Handle) {
        let mut inner = self.inner.lock();
        // Cancelled from inside its own dispatch
        let Some(sequence) = inner.handles.get(handle).copied() else {
            return;
        };

        // An interval whose next run is unrepresentable retires like a one-shot
        let rescheduled = match inner.pending.get_mut(&sequence) {
            Some(pending) if pending.interval > 0 => {
                let next = i64::try_from(pending.interval)
                    .ok()
                    .and_then(Duration::try_seconds)
                    .and_then(|interval| pending.run_at.checked_add_signed(interval));
                if let Some(next) = next {
                    pending.run_at = next;
                }
                next
            }
            _ => None,
        };

        match rescheduled {
            Some(run_at) => {
                tracing::debug!(handle = %handle, run_at = %run_at, "Interval callback rescheduled");
                self.metrics.record_reschedule();
            }
            None => {
                inner.pending.remove(&sequence);
                inner.handles.remove(handle);
            }
        }
    }

    /// Number of callbacks waiting to run
    pub fn pending_count(&self) -> usize {
        self.inner.lock().pending.len()
    }

    pub fn is_pending(&self, handle: &Handle) -> bool {
        self.inner.lock().handles.contains_key(handle)
    }

    /// Run time of the next callback that would be dispatched
    pub fn next_run_at(&self) -> Option<DateTime<Utc>> {
        let inner = self.inner.lock();
        inner.pending.values().min_by_key(|pending| pending.dispatch_key()).map(|p| p.run_at.and_utc())
    }

    /// Snapshot of the pending set in dispatch order
    pub fn pending(&self) -> Vec<PendingSnapshot> {
        let inner = self.inner.lock();
        let mut pending: Vec<&PendingCallback> = inner.pending.values().collect();
        pending.sort_by_key(|pending| pending.dispatch_key());
        pending.into_iter().map(PendingCallback::snapshot).collect()
    }

    /// Get current metrics
    pub fn metrics(&self) -> SchedulerMetrics {
        self.metrics.get_metrics()
    }

    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }
}

impl Default for VirtualScheduler {
    fn default() -> Self {
        Self::utc()
    }
}

impl fmt::Debug for VirtualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("VirtualScheduler")
            .field("current_time", &inner.current_time)
            .field("start_time", &inner.start_time)
            .field("pending", &inner.pending.len())
            .field("offset", &self.localizer.offset())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn noop(_: &Kwargs) {}

    #[test]
    fn test_scheduler_defaults_to_millennium() {
        let scheduler = VirtualScheduler::default();
        let expected = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
        assert_eq!(scheduler.now().naive_utc(), expected);
        assert_eq!(scheduler.start_time(), scheduler.now());
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[test]
    fn test_insert_then_cancel() {
        let scheduler = VirtualScheduler::default();
        let handle = scheduler
            .insert_schedule(scheduler.now() + Duration::seconds(10), noop, Kwargs::new(), 0)
            .unwrap();

        assert!(scheduler.is_pending(&handle));
        assert!(scheduler.cancel(&handle));
        assert!(!scheduler.is_pending(&handle));
        assert!(!scheduler.cancel(&handle));
    }

    #[test]
    fn test_clock_stops_at_callback_time_during_dispatch() {
        let scheduler = VirtualScheduler::default();
        let observed = Arc::new(Mutex::new(Vec::new()));

        let clock = scheduler.clone();
        let seen = Arc::clone(&observed);
        scheduler
            .insert_schedule(
                scheduler.now() + Duration::seconds(7),
                move |_| seen.lock().push(clock.now()),
                Kwargs::new(),
                0,
            )
            .unwrap();

        let start = scheduler.now();
        scheduler.fast_forward(Duration::seconds(60)).unwrap();

        assert_eq!(*observed.lock(), vec![start + Duration::seconds(7)]);
        assert_eq!(scheduler.now(), start + Duration::seconds(60));
    }

    #[test]
    fn test_advance_without_dispatch_retires_callbacks() {
        let scheduler = VirtualScheduler::default();
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        scheduler
            .insert_schedule(
                scheduler.now() + Duration::seconds(1),
                move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                },
                Kwargs::new(),
                0,
            )
            .unwrap();

        scheduler.advance_time(scheduler.now() + Duration::seconds(5), false).unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending_count(), 0);
        assert_eq!(scheduler.metrics().skipped, 1);
    }
}
