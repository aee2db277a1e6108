//! The closed set of host operations an automation can invoke

use std::fmt;

/// Every operation of the host API
///
/// The set is closed: anything an automation can reach is listed here, and the few the
/// double does not model answer with [`crate::HassError::UnknownOperation`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    Log,
    Error,
    RunIn,
    RunOnce,
    RunAt,
    RunDaily,
    RunHourly,
    RunMinutely,
    RunEvery,
    RunAtSunrise,
    RunAtSunset,
    CancelTimer,
    GetNow,
    GetNowTs,
    Time,
    Date,
    NowIsBetween,
    ListenEvent,
    ListenState,
    CancelListenEvent,
    CancelListenState,
    GetState,
    GetAttribute,
    GetFullState,
    GetAllStates,
    SetState,
    EntityExists,
    CallService,
    TurnOn,
    TurnOff,
    Toggle,
    Notify,
    FireEvent,
    Args,
    Name,
    RegisterConstraint,
    ParseTime,
    ListenLog,
    GetApp,
}

impl Operation {
    pub const ALL: &'static [Operation] = &[
        Operation::Log,
        Operation::Error,
        Operation::RunIn,
        Operation::RunOnce,
        Operation::RunAt,
        Operation::RunDaily,
        Operation::RunHourly,
        Operation::RunMinutely,
        Operation::RunEvery,
        Operation::RunAtSunrise,
        Operation::RunAtSunset,
        Operation::CancelTimer,
        Operation::GetNow,
        Operation::GetNowTs,
        Operation::Time,
        Operation::Date,
        Operation::NowIsBetween,
        Operation::ListenEvent,
        Operation::ListenState,
        Operation::CancelListenEvent,
        Operation::CancelListenState,
        Operation::GetState,
        Operation::GetAttribute,
        Operation::GetFullState,
        Operation::GetAllStates,
        Operation::SetState,
        Operation::EntityExists,
        Operation::CallService,
        Operation::TurnOn,
        Operation::TurnOff,
        Operation::Toggle,
        Operation::Notify,
        Operation::FireEvent,
        Operation::Args,
        Operation::Name,
        Operation::RegisterConstraint,
        Operation::ParseTime,
        Operation::ListenLog,
        Operation::GetApp,
    ];

    /// The platform's name for the operation
    pub fn name(&self) -> &'static str {
        match self {
            Operation::Log => "log",
            Operation::Error => "error",
            Operation::RunIn => "run_in",
            Operation::RunOnce => "run_once",
            Operation::RunAt => "run_at",
            Operation::RunDaily => "run_daily",
            Operation::RunHourly => "run_hourly",
            Operation::RunMinutely => "run_minutely",
            Operation::RunEvery => "run_every",
            Operation::RunAtSunrise => "run_at_sunrise",
            Operation::RunAtSunset => "run_at_sunset",
            Operation::CancelTimer => "cancel_timer",
            Operation::GetNow => "get_now",
            Operation::GetNowTs => "get_now_ts",
            Operation::Time => "time",
            Operation::Date => "date",
            Operation::NowIsBetween => "now_is_between",
            Operation::ListenEvent => "listen_event",
            Operation::ListenState => "listen_state",
            Operation::CancelListenEvent => "cancel_listen_event",
            Operation::CancelListenState => "cancel_listen_state",
            Operation::GetState => "get_state",
            Operation::GetAttribute => "get_attribute",
            Operation::GetFullState => "get_full_state",
            Operation::GetAllStates => "get_all_states",
            Operation::SetState => "set_state",
            Operation::EntityExists => "entity_exists",
            Operation::CallService => "call_service",
            Operation::TurnOn => "turn_on",
            Operation::TurnOff => "turn_off",
            Operation::Toggle => "toggle",
            Operation::Notify => "notify",
            Operation::FireEvent => "fire_event",
            Operation::Args => "args",
            Operation::Name => "name",
            Operation::RegisterConstraint => "register_constraint",
            Operation::ParseTime => "parse_time",
            Operation::ListenLog => "listen_log",
            Operation::GetApp => "get_app",
        }
    }

    /// Whether the double models this operation
    pub fn is_supported(&self) -> bool {
        !matches!(self, Operation::ParseTime | Operation::ListenLog | Operation::GetApp)
    }

    /// Whether the operation registers a timer or a listener
    pub fn is_registration(&self) -> bool {
        matches!(
            self,
            Operation::RunIn
                | Operation::RunOnce
                | Operation::RunAt
                | Operation::RunDaily
                | Operation::RunHourly
                | Operation::RunMinutely
                | Operation::RunEvery
                | Operation::RunAtSunrise
                | Operation::RunAtSunset
                | Operation::ListenEvent
                | Operation::ListenState
        )
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_distinct() {
        let names: std::collections::HashSet<_> = Operation::ALL.iter().map(Operation::name).collect();
        assert_eq!(names.len(), Operation::ALL.len());
        assert_eq!(Operation::RunAtSunrise.to_string(), "run_at_sunrise");
    }

    #[test]
    fn test_unmodelled_operations() {
        let unsupported: Vec<_> = Operation::ALL.iter().filter(|op| !op.is_supported()).collect();
        assert_eq!(unsupported, vec![&Operation::ParseTime, &Operation::ListenLog, &Operation::GetApp]);
    }

    #[test]
    fn test_registrations() {
        assert!(Operation::RunAtSunset.is_registration());
        assert!(Operation::ListenState.is_registration());
        assert!(!Operation::CancelTimer.is_registration());
        assert!(!Operation::RegisterConstraint.is_registration());
        assert!(!Operation::TurnOn.is_registration());
    }
}
