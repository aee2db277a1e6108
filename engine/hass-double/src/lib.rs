//! # HassDouble
//!
//! An in-memory stand-in for the home-automation host API that automation scripts are written
//! against.
//!
//! Automations receive a [`HassApi`] implementation instead of inheriting platform plumbing.
//! [`HassDouble`] records every interaction, keeps entity state in memory, dispatches state
//! and event listeners on demand, and routes all scheduling through a
//! [`virtual_scheduler::VirtualScheduler`] so tests control time explicitly.
//!
//! ## Usage
//!
//! ```rust
//! use hass_double::{kwargs, Automation, AutomationHarness, HassApi, HassDouble, HassError, Kwargs};
//! use std::sync::Arc;
//!
//! struct Porch {
//!     hass: HassDouble,
//! }
//!
//! impl Automation for Porch {
//!     fn initialize(&mut self) -> Result<(), HassError> {
//!         let hass = self.hass.clone();
//!         self.hass.run_in(
//!             Arc::new(move |_: &Kwargs| {
//!                 let _ = hass.turn_off("light.porch", kwargs! {});
//!             }),
//!             60,
//!             kwargs! {},
//!         )?;
//!         Ok(())
//!     }
//! }
//!
//! let mut harness = AutomationHarness::new();
//! let _porch = harness.automation("porch", kwargs! {}, |hass| Porch { hass }).unwrap();
//! harness.time_travel().fast_forward(1).minutes().unwrap();
//! harness.assert_that("light.porch").was().turned_off(kwargs! {});
//! ```

pub mod api;
pub mod assert_that;
pub mod calls;
pub mod double;
pub mod error;
pub mod given_that;
pub mod harness;
pub mod listeners;
pub mod logging;
pub mod operation;
pub mod state;
pub mod time_travel;
pub mod when;


pub use api::{HassApi, LogLevel};
pub use assert_that::AssertThat;
pub use calls::{CallLog, HostCall, RecordedCall};
pub use double::HassDouble;
pub use error::{HassError, Result};
pub use given_that::GivenThat;
pub use harness::{Automation, AutomationHarness};
pub use listeners::{EventCallback, EventFired, ListenerHandle, StateCallback, StateChange, StateListenOptions};
pub use operation::Operation;
pub use state::EntityState;
pub use time_travel::TimeTravel;
pub use when::When;

/// Re-export the scheduler types automations deal with
pub use virtual_scheduler::{Callback, Handle, Kwargs, SchedulerConfig, VirtualScheduler};

/// Name given to a double that was not created for a specific automation
pub const DEFAULT_APP_NAME: &str = "test_app";

/// Build a [`Kwargs`] map from `key => value` pairs
#[macro_export]
macro_rules! kwargs {
    () => {
        $crate::Kwargs::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut map = $crate::Kwargs::new();
        $(map.insert(($key).to_string(), ::serde_json::json!($value));)+
        map
    }};
}
