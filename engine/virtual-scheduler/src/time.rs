//! Conversion between the internal naive-UTC clock and the platform's local wall clock

use chrono::{DateTime, Duration, FixedOffset, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc};

use crate::error::{Result, SchedulerError};
use crate::MAX_UTC_OFFSET_SECONDS;

/// Converts between UTC and a single fixed local offset
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Localizer {
    offset: FixedOffset,
}

impl Localizer {
    /// Create a localizer for `utc_offset_seconds` east of UTC
    pub fn new(utc_offset_seconds: i32) -> Result<Self> {
        if utc_offset_seconds.abs() > MAX_UTC_OFFSET_SECONDS {
            return Err(SchedulerError::config(format!(
                "utc offset {utc_offset_seconds}s is outside +/-{MAX_UTC_OFFSET_SECONDS}s"
            )));
        }
        let offset = FixedOffset::east_opt(utc_offset_seconds).ok_or_else(|| {
            SchedulerError::config(format!("invalid utc offset {utc_offset_seconds}s"))
        })?;
        Ok(Self { offset })
    }

    /// Localizer whose local time is UTC
    pub fn utc() -> Self {
        Self { offset: Utc.fix() }
    }

    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// Interpret a naive local wall-clock time and return it as UTC
    ///
    /// Fails when the shifted time falls outside the representable range.
    pub fn localize(&self, naive_local: NaiveDateTime) -> Result<DateTime<Utc>> {
        let shift = Duration::seconds(i64::from(self.offset.local_minus_utc()));
        naive_local
            .checked_sub_signed(shift)
            .map(|utc| utc.and_utc())
            .ok_or_else(|| {
                SchedulerError::out_of_range(format!("{naive_local} at offset {} has no UTC equivalent", self.offset))
            })
    }

    /// Express any aware time in the local offset
    pub fn to_local<Tz: TimeZone>(&self, time: &DateTime<Tz>) -> DateTime<FixedOffset> {
        time.with_timezone(&self.offset)
    }

    /// Local wall-clock time with the zone stripped
    pub fn make_naive<Tz: TimeZone>(&self, time: &DateTime<Tz>) -> NaiveDateTime {
        self.to_local(time).naive_local()
    }

    /// Attach the local offset to a naive local time
    pub fn convert_naive(&self, naive_local: NaiveDateTime) -> Result<DateTime<FixedOffset>> {
        Ok(self.to_local(&self.localize(naive_local)?))
    }
}

impl Default for Localizer {
    fn default() -> Self {
        Self::utc()
    }
}

/// A new start time for the simulation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSpec {
    /// An absolute instant
    At(DateTime<Utc>),
    /// A naive local date-time
    Local(NaiveDateTime),
    /// A local time-of-day on the current simulated date
    TimeOfDay(NaiveTime),
}

impl TimeSpec {
    /// Resolve to naive UTC, relative to the current naive-UTC time
    pub(crate) fn resolve(self, now: NaiveDateTime, localizer: &Localizer) -> Result<NaiveDateTime> {
        match self {
            TimeSpec::At(at) => Ok(at.naive_utc()),
            TimeSpec::Local(local) => Ok(localizer.localize(local)?.naive_utc()),
            TimeSpec::TimeOfDay(time) => {
                let today = localizer.make_naive(&now.and_utc()).date();
                Ok(localizer.localize(today.and_time(time))?.naive_utc())
            }
        }
    }
}

impl From<DateTime<Utc>> for TimeSpec {
    fn from(at: DateTime<Utc>) -> Self {
        TimeSpec::At(at)
    }
}

impl From<DateTime<FixedOffset>> for TimeSpec {
    fn from(at: DateTime<FixedOffset>) -> Self {
        TimeSpec::At(at.with_timezone(&Utc))
    }
}

impl From<NaiveDateTime> for TimeSpec {
    fn from(local: NaiveDateTime) -> Self {
        TimeSpec::Local(local)
    }
}

impl From<NaiveTime> for TimeSpec {
    fn from(time: NaiveTime) -> Self {
        TimeSpec::TimeOfDay(time)
    }
}

/// A fast-forward request, resolved to an absolute target before advancing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FastForward {
    /// Jump forward by a duration
    By(Duration),
    /// Jump to an absolute instant
    To(DateTime<Utc>),
    /// Jump to a naive local date-time
    ToLocal(NaiveDateTime),
    /// Jump to the next occurrence of a local time-of-day
    ///
    /// A time-of-day not strictly after the current one lands on the following day.
    TimeOfDay(NaiveTime),
}

impl FastForward {
    /// Resolve to naive UTC, relative to the current naive-UTC time
    pub(crate) fn resolve(self, now: NaiveDateTime, localizer: &Localizer) -> Result<NaiveDateTime> {
        match self {
            FastForward::By(duration) => now.checked_add_signed(duration).ok_or_else(|| {
                SchedulerError::out_of_range(format!("{now} + {duration} overflows"))
            }),
            FastForward::To(at) => Ok(at.naive_utc()),
            FastForward::ToLocal(local) => Ok(localizer.localize(local)?.naive_utc()),
            FastForward::TimeOfDay(time) => {
                let local_now = localizer.make_naive(&now.and_utc());
                let date = if time > local_now.time() {
                    local_now.date()
                } else {
                    local_now.date().succ_opt().ok_or_else(|| {
                        SchedulerError::out_of_range(format!("no day after {}", local_now.date()))
                    })?
                };
                Ok(localizer.localize(date.and_time(time))?.naive_utc())
            }
        }
    }
}

impl From<Duration> for FastForward {
    fn from(duration: Duration) -> Self {
        FastForward::By(duration)
    }
}

impl From<std::time::Duration> for FastForward {
    fn from(duration: std::time::Duration) -> Self {
        FastForward::By(Duration::from_std(duration).unwrap_or(Duration::MAX))
    }
}

impl From<DateTime<Utc>> for FastForward {
    fn from(at: DateTime<Utc>) -> Self {
        FastForward::To(at)
    }
}

impl From<DateTime<FixedOffset>> for FastForward {
    fn from(at: DateTime<FixedOffset>) -> Self {
        FastForward::To(at.with_timezone(&Utc))
    }
}

impl From<NaiveDateTime> for FastForward {
    fn from(local: NaiveDateTime) -> Self {
        FastForward::ToLocal(local)
    }
}

impl From<NaiveTime> for FastForward {
    fn from(time: NaiveTime) -> Self {
        FastForward::TimeOfDay(time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d).unwrap().and_hms_opt(h, mi, 0).unwrap()
    }

    #[test]
    fn test_localize_round_trips_through_offset() {
        let localizer = Localizer::new(3 * 3600).unwrap();
        let utc = localizer.localize(at(2020, 3, 3, 11, 0)).unwrap();
        assert_eq!(utc.naive_utc(), at(2020, 3, 3, 8, 0));
        assert_eq!(localizer.make_naive(&utc), at(2020, 3, 3, 11, 0));
        assert_eq!(
            localizer.convert_naive(at(2020, 3, 3, 11, 0)).unwrap().to_rfc3339(),
            "2020-03-03T11:00:00+03:00"
        );
    }

    #[test]
    fn test_localize_at_range_edges_is_reported() {
        let east = Localizer::new(3600).unwrap();
        let west = Localizer::new(-3600).unwrap();

        assert!(matches!(east.localize(NaiveDateTime::MIN), Err(SchedulerError::OutOfRange(_))));
        assert!(matches!(west.localize(NaiveDateTime::MAX), Err(SchedulerError::OutOfRange(_))));
        assert!(matches!(west.convert_naive(NaiveDateTime::MAX), Err(SchedulerError::OutOfRange(_))));

        // Shifting away from the edge is fine
        assert_eq!(east.localize(NaiveDateTime::MAX).unwrap().naive_utc(), NaiveDateTime::MAX - Duration::hours(1));
        assert_eq!(Localizer::utc().localize(NaiveDateTime::MIN).unwrap().naive_utc(), NaiveDateTime::MIN);
    }

    #[test]
    fn test_local_start_time_out_of_range_is_reported() {
        let localizer = Localizer::new(3600).unwrap();
        let result = TimeSpec::Local(NaiveDateTime::MIN).resolve(at(2015, 1, 1, 0, 0), &localizer);
        assert!(matches!(result, Err(SchedulerError::OutOfRange(_))));
    }

    #[test]
    fn test_offset_out_of_range_is_rejected() {
        assert!(matches!(Localizer::new(90_000), Err(SchedulerError::Config(_))));
        assert!(Localizer::new(-MAX_UTC_OFFSET_SECONDS).is_ok());
    }

    #[test]
    fn test_time_of_day_later_today() {
        let target = FastForward::TimeOfDay(NaiveTime::from_hms_opt(14, 0, 0).unwrap())
            .resolve(at(2015, 1, 1, 12, 0), &Localizer::utc())
            .unwrap();
        assert_eq!(target, at(2015, 1, 1, 14, 0));
    }

    #[test]
    fn test_time_of_day_wraps_to_next_day() {
        let target = FastForward::TimeOfDay(NaiveTime::from_hms_opt(7, 0, 0).unwrap())
            .resolve(at(2015, 1, 1, 12, 0), &Localizer::utc())
            .unwrap();
        assert_eq!(target, at(2015, 1, 2, 7, 0));
    }

    #[test]
    fn test_time_of_day_equal_to_now_is_a_full_day_away() {
        let target = FastForward::TimeOfDay(NaiveTime::from_hms_opt(12, 0, 0).unwrap())
            .resolve(at(2015, 1, 1, 12, 0), &Localizer::utc())
            .unwrap();
        assert_eq!(target, at(2015, 1, 2, 12, 0));
    }

    #[test]
    fn test_time_of_day_uses_local_date() {
        // 23:30 UTC is already 01:30 on the next day at +02:00
        let localizer = Localizer::new(2 * 3600).unwrap();
        let target = FastForward::TimeOfDay(NaiveTime::from_hms_opt(6, 0, 0).unwrap())
            .resolve(at(2015, 1, 1, 23, 30), &localizer)
            .unwrap();
        assert_eq!(target, at(2015, 1, 2, 4, 0));
    }

    #[test]
    fn test_duration_overflow_is_reported() {
        let result = FastForward::from(std::time::Duration::MAX).resolve(at(2015, 1, 1, 0, 0), &Localizer::utc());
        assert!(matches!(result, Err(SchedulerError::OutOfRange(_))));
    }

    #[test]
    fn test_local_target_out_of_range_is_reported() {
        let localizer = Localizer::new(-3600).unwrap();
        let result = FastForward::ToLocal(NaiveDateTime::MAX).resolve(at(2015, 1, 1, 0, 0), &localizer);
        assert!(matches!(result, Err(SchedulerError::OutOfRange(_))));
    }
}
