//! Moving simulated time from a test

use chrono::Duration;
use virtual_scheduler::{Result, VirtualScheduler};

/// Fast-forward the scheduler and check elapsed time
pub struct TimeTravel<'a> {
    scheduler: &'a VirtualScheduler,
}

impl<'a> TimeTravel<'a> {
    pub(crate) fn new(scheduler: &'a VirtualScheduler) -> Self {
        Self { scheduler }
    }

    pub fn fast_forward(&self, amount: i64) -> FastForwardBy<'a> {
        FastForwardBy { scheduler: self.scheduler, amount }
    }

    /// Check the time elapsed since the simulation started
    pub fn assert_current_time(&self, amount: i64) -> ElapsedCheck<'a> {
        ElapsedCheck { scheduler: self.scheduler, amount }
    }
}

pub struct FastForwardBy<'a> {
    scheduler: &'a VirtualScheduler,
    amount: i64,
}

impl FastForwardBy<'_> {
    pub fn seconds(self) -> Result<()> {
        self.scheduler.fast_forward(Duration::seconds(self.amount))
    }

    pub fn minutes(self) -> Result<()> {
        self.scheduler.fast_forward(Duration::minutes(self.amount))
    }

    pub fn hours(self) -> Result<()> {
        self.scheduler.fast_forward(Duration::hours(self.amount))
    }
}

pub struct ElapsedCheck<'a> {
    scheduler: &'a VirtualScheduler,
    amount: i64,
}

impl ElapsedCheck<'_> {
    #[track_caller]
    pub fn seconds(self) {
        self.check(Duration::seconds(self.amount), "seconds");
    }

    #[track_caller]
    pub fn minutes(self) {
        self.check(Duration::minutes(self.amount), "minutes");
    }

    #[track_caller]
    pub fn hours(self) {
        self.check(Duration::hours(self.amount), "hours");
    }

    #[track_caller]
    fn check(&self, expected: Duration, unit: &str) {
        let elapsed = self.scheduler.elapsed();
        assert_eq!(
            elapsed, expected,
            "expected {} {unit} since start, but {}s have elapsed",
            self.amount,
            elapsed.num_seconds()
        );
    }
}
