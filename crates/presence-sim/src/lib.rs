//! Presence Simulator
//!
//! Plays scripted scenarios against a [`presence_core::PresenceSession`] backed
//! by a simulated device, so the login gate can be exercised end to end
//! without a phone.

pub mod device;
pub mod error;
pub mod runner;
pub mod scenario;
pub mod sensors;

pub use device::SimDevice;
pub use error::{Result, SimError};
pub use runner::{run_scenario, LoginRecord, RunReport};
pub use scenario::{DeviceSetup, Expectation, Scenario, StatusChange, Step};
