//! Per-test context owning the double and the automations under test

use virtual_scheduler::{Kwargs, SchedulerConfig, DEFAULT_LOG_LEVEL};

use crate::assert_that::AssertThat;
use crate::calls::RecordedCall;
use crate::double::HassDouble;
use crate::error::{HassError, Result};
use crate::given_that::GivenThat;
use crate::logging::init_test_tracing;
use crate::time_travel::TimeTravel;
use crate::when::When;

/// An automation script
pub trait Automation {
    /// Register listeners and timers
    fn initialize(&mut self) -> Result<()>;
}

struct Registration {
    name: String,
    initialized: bool,
    /// Timers and listeners the automation registered while initializing
    init_registrations: Vec<RecordedCall>,
}

/// Test context: one double, any number of automations
///
/// Created at the start of a test and dropped at its end. Each automation gets its own
/// [`HassDouble`] view so recorded calls carry the automation's name.
pub struct AutomationHarness {
    double: HassDouble,
    automations: Vec<Registration>,
}

impl AutomationHarness {
    /// Harness on a UTC scheduler starting 2000-01-01 00:00
    pub fn new() -> Self {
        init_test_tracing(DEFAULT_LOG_LEVEL);
        Self { double: HassDouble::new(Default::default()), automations: Vec::new() }
    }

    pub fn with_config(config: SchedulerConfig) -> Result<Self> {
        init_test_tracing(&config.log_level);
        Ok(Self { double: HassDouble::with_config(config)?, automations: Vec::new() })
    }

    pub fn hass(&self) -> &HassDouble {
        &self.double
    }

    pub fn given_that(&self) -> GivenThat<'_> {
        self.double.given_that()
    }

    pub fn when(&self) -> When<'_> {
        self.double.when()
    }

    pub fn time_travel(&self) -> TimeTravel<'_> {
        self.double.time_travel()
    }

    /// Build and initialize an automation, then clear the call log
    pub fn automation<A, F>(&mut self, name: &str, args: Kwargs, build: F) -> Result<A>
    where
        A: Automation,
        F: FnOnce(HassDouble) -> A,
    {
        let mut automation = self.uninitialized_automation(name, args, build)?;
        self.initialize(name, &mut automation)?;
        Ok(automation)
    }

    /// Build an automation without initializing it
    ///
    /// Assertions refuse to run until [`AutomationHarness::initialize`] is called for it.
    pub fn uninitialized_automation<A, F>(&mut self, name: &str, args: Kwargs, build: F) -> Result<A>
    where
        A: Automation,
        F: FnOnce(HassDouble) -> A,
    {
        if self.automations.iter().any(|registration| registration.name == name) {
            return Err(HassError::invalid_argument(format!("automation '{name}' already exists")));
        }
        let automation = build(self.double.for_app(name, args));
        self.automations.push(Registration { name: name.to_string(), initialized: false, init_registrations: Vec::new() });
        Ok(automation)
    }

    pub fn initialize<A: Automation>(&mut self, name: &str, automation: &mut A) -> Result<()> {
        let index = self
            .automations
            .iter()
            .position(|registration| registration.name == name)
            .ok_or_else(|| HassError::invalid_argument(format!("unknown automation '{name}'")))?;

        automation.initialize()?;

        let registration = &mut self.automations[index];
        registration.initialized = true;
        registration.init_registrations = self
            .double
            .call_log()
            .for_app(name)
            .into_iter()
            .filter(|entry| entry.operation.is_registration())
            .collect();
        self.double.clear_calls();
        tracing::debug!(automation = name, "Automation initialized");
        Ok(())
    }

    /// Fails with every automation that has not been initialized
    pub fn ensure_initialized(&self) -> Result<()> {
        let missing: Vec<String> = self
            .automations
            .iter()
            .filter(|registration| !registration.initialized)
            .map(|registration| registration.name.clone())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(HassError::NotInitialized(missing))
        }
    }

    pub fn automation_names(&self) -> Vec<&str> {
        self.automations.iter().map(|registration| registration.name.as_str()).collect()
    }

    /// Assertions over calls since initialization; panics if an automation is uninitialized
    #[track_caller]
    pub fn assert_that(&self, thing: impl Into<String>) -> AssertThat {
        if let Err(error) = self.ensure_initialized() {
            panic!("{error}");
        }
        let calls = self.double.calls();
        let mut registrations: Vec<RecordedCall> =
            self.automations.iter().flat_map(|registration| registration.init_registrations.iter().cloned()).collect();
        registrations.extend(calls.iter().cloned());
        AssertThat::new(thing, calls, registrations)
    }
}

impl Default for AutomationHarness {
    fn default() -> Self {
        Self::new()
    }
}
