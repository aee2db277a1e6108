//! Towel heater toggled on a fixed interval for a limited number of cycles

use std::sync::Arc;

use chrono::Duration;
use hass_double::{Automation, Handle, HassApi, HassError, Kwargs, Result};
use parking_lot::Mutex;

use crate::entity_ids::bathroom;
use crate::log_failure;

pub const DEFAULT_INTERVAL_MINUTES: u64 = 15;
pub const DEFAULT_CYCLES: u64 = 4;

/// Toggles the towel heater every `interval_minutes`, `cycles` times, then switches it off
/// and cancels its own timer.
pub struct HeaterCycle<H> {
    hass: H,
    runs: Arc<Mutex<u64>>,
    timer: Arc<Mutex<Option<Handle>>>,
}

impl<H: HassApi + Clone + 'static> HeaterCycle<H> {
    pub fn new(hass: H) -> Self {
        Self { hass, runs: Arc::new(Mutex::new(0)), timer: Arc::new(Mutex::new(None)) }
    }

    pub fn runs(&self) -> u64 {
        *self.runs.lock()
    }

    pub fn is_running(&self) -> bool {
        self.timer.lock().is_some()
    }

    fn arg(&self, key: &str, default: u64) -> Result<u64> {
        match self.hass.args().get(key) {
            None => Ok(default),
            Some(value) => value
                .as_u64()
                .filter(|n| *n > 0)
                .ok_or_else(|| HassError::invalid_argument(format!("{key} must be a positive integer, got {value}"))),
        }
    }

    fn cycle(hass: &H, runs: &Mutex<u64>, timer: &Mutex<Option<Handle>>, cycles: u64) -> Result<()> {
        let run = {
            let mut runs = runs.lock();
            *runs += 1;
            *runs
        };
        hass.toggle(bathroom::TOWEL_HEATER, Kwargs::new())?;

        if run >= cycles {
            if let Some(handle) = timer.lock().take() {
                hass.cancel_timer(&handle);
            }
            hass.turn_off(bathroom::TOWEL_HEATER, Kwargs::new())?;
            hass.log(&format!("Towel heater cycle finished after {run} runs"));
        }
        Ok(())
    }
}

impl<H: HassApi + Clone + 'static> Automation for HeaterCycle<H> {
    fn initialize(&mut self) -> Result<()> {
        let interval_minutes = self.arg("interval_minutes", DEFAULT_INTERVAL_MINUTES)?;
        let cycles = self.arg("cycles", DEFAULT_CYCLES)?;
        let step = i64::try_from(interval_minutes)
            .ok()
            .and_then(Duration::try_minutes)
            .ok_or_else(|| HassError::invalid_argument(format!("interval of {interval_minutes} minutes is too long")))?;
        let start = self.hass.get_now().naive_local() + step;

        let (hass, runs, timer) = (self.hass.clone(), Arc::clone(&self.runs), Arc::clone(&self.timer));
        let handle = self.hass.run_every(
            Arc::new(move |_: &Kwargs| log_failure(&hass, "heater cycle", Self::cycle(&hass, &runs, &timer, cycles))),
            start,
            interval_minutes * 60,
            Kwargs::new(),
        )?;
        *self.timer.lock() = Some(handle);
        Ok(())
    }
}
