//! Unit tests for configuration, errors and metrics

use chrono::{NaiveDate, NaiveDateTime};

use crate::config::default_start_time;
use crate::{
    PastAction, SchedulerConfig, SchedulerError, VirtualScheduler, DEFAULT_LOG_LEVEL,
    DEFAULT_UTC_OFFSET_SECONDS,
};

fn create_test_config() -> SchedulerConfig {
    SchedulerConfig {
        utc_offset_seconds: -5 * 3600,
        start_time: NaiveDate::from_ymd_opt(2021, 6, 15).unwrap().and_hms_opt(8, 30, 0).unwrap(),
        log_level: "debug".to_string(),
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn test_scheduler_config_default() {
        let config = SchedulerConfig::default();
        assert_eq!(config.utc_offset_seconds, DEFAULT_UTC_OFFSET_SECONDS);
        assert_eq!(config.start_time, default_start_time());
        assert_eq!(config.log_level, DEFAULT_LOG_LEVEL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_offset_fails_validation() {
        let config = SchedulerConfig::with_offset(100_000);
        assert!(matches!(config.validate(), Err(SchedulerError::Config(_))));
        assert!(VirtualScheduler::new(config).is_err());
    }

    #[test]
    fn test_start_time_is_local_wall_clock() {
        let scheduler = VirtualScheduler::new(create_test_config()).unwrap();
        assert_eq!(scheduler.now().to_rfc3339(), "2021-06-15T13:30:00+00:00");
        assert_eq!(scheduler.now_local().to_rfc3339(), "2021-06-15T08:30:00-05:00");
        assert_eq!(scheduler.now_naive(), create_test_config().start_time);
    }

    #[test]
    fn test_config_serialization() {
        let config = create_test_config();

        let serialized = serde_json::to_string(&config).unwrap();
        let deserialized: SchedulerConfig = serde_json::from_str(&serialized).unwrap();

        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = SchedulerConfig::from_toml_str("utc_offset_seconds = 3600\n").unwrap();
        assert_eq!(config.utc_offset_seconds, 3600);
        assert_eq!(config.start_time, default_start_time());

        assert!(SchedulerConfig::from_toml_str("utc_offset_seconds = 999999\n").is_err());
    }

    #[test]
    fn test_config_file_operations() {
        let config = create_test_config();
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("scheduler.toml");
        let path = path.to_str().unwrap();

        assert!(config.to_file(path).is_ok());

        let loaded_config = SchedulerConfig::from_file(path).unwrap();
        assert_eq!(config, loaded_config);
    }
}

#[cfg(test)]
mod error_handling_tests {
    use super::*;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2000, 1, 1).unwrap().and_hms_opt(hour, 0, 0).unwrap()
    }

    #[test]
    fn test_scheduling_state_display() {
        let error = SchedulerError::SchedulingState { pending: 2 };
        assert!(error.to_string().starts_with("cannot set start time while callbacks are scheduled"));
        assert!(error.to_string().contains('2'));
    }

    #[test]
    fn test_past_schedule_display() {
        let error = SchedulerError::past(PastAction::Schedule, at(1), at(2));
        assert!(error.to_string().starts_with("cannot schedule events in the past"));

        let error = SchedulerError::past(PastAction::Advance, at(1), at(2));
        assert!(error.to_string().starts_with("cannot advance to a time in the past"));
        assert!(error.to_string().contains("2000-01-01 01:00:00"));
    }

    #[test]
    fn test_config_error_display() {
        let error = SchedulerError::config("bad offset");
        assert!(error.to_string().contains("bad offset"));
    }
}

#[cfg(test)]
mod metrics_tests {
    use crate::metrics::DispatchMetrics;

    #[test]
    fn test_metrics_collector_creation() {
        let metrics = DispatchMetrics::new().get_metrics();
        assert_eq!(metrics.inserted, 0);
        assert_eq!(metrics.dispatched, 0);
        assert_eq!(metrics.advances, 0);
    }

    #[test]
    fn test_metrics_recording() {
        let collector = DispatchMetrics::new();
        collector.record_insert();
        collector.record_insert();
        collector.record_dispatch(true);
        collector.record_dispatch(false);
        collector.record_cancel(true);
        collector.record_cancel(false);
        collector.record_reschedule();

        let metrics = collector.get_metrics();
        assert_eq!(metrics.inserted, 2);
        assert_eq!(metrics.dispatched, 1);
        assert_eq!(metrics.skipped, 1);
        assert_eq!(metrics.cancelled, 1);
        assert_eq!(metrics.cancel_misses, 1);
        assert_eq!(metrics.rescheduled, 1);
    }

    #[test]
    fn test_metrics_reset() {
        let collector = DispatchMetrics::new();
        collector.record_insert();
        collector.record_advance();

        collector.reset();

        assert_eq!(collector.get_metrics(), Default::default());
    }
}
