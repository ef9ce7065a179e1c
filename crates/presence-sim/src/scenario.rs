//! Scenario files
//!
//! A scenario describes the initial device state and a list of steps that the
//! runner feeds to a session one at a time:
//!
//! ```toml
//! name = "reference"
//!
//! [device]
//! battery = 45
//!
//! [[steps]]
//! action = "resume"
//!
//! [[steps]]
//! action = "permission_result"
//! response = "granted"
//!
//! [[steps]]
//! action = "login"
//! password = "10s20w30q9"
//! expect = "success"
//! ```

use std::path::Path;

use presence_core::{
    AuthResult, ChargingState, FailureReason, GeoPoint, NetworkKind, PermissionResponse,
    SensorKind,
};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub device: DeviceSetup,

    #[serde(default)]
    pub steps: Vec<Step>,
}

/// Initial state of the simulated device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSetup {
    /// Precise location already granted
    pub fine: bool,
    /// Approximate location already granted
    pub coarse: bool,
    /// Platform offers a rationale before asking again
    pub rationale: bool,
    pub brightness: u32,
    pub max_brightness: u32,
    pub battery: u8,
    pub charging: ChargingState,
    pub network: NetworkKind,
    pub location_services: bool,
    pub last_known: Option<GeoPoint>,
}

impl Default for DeviceSetup {
    fn default() -> Self {
        Self {
            fine: false,
            coarse: false,
            rationale: true,
            brightness: 255,
            max_brightness: 255,
            battery: 45,
            charging: ChargingState::Charging,
            network: NetworkKind::Wifi,
            location_services: true,
            last_known: None,
        }
    }
}

/// Partial device update; absent fields are left alone
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusChange {
    pub fine: Option<bool>,
    pub coarse: Option<bool>,
    pub rationale: Option<bool>,
    pub brightness: Option<u32>,
    pub battery: Option<u8>,
    pub charging: Option<ChargingState>,
    pub network: Option<NetworkKind>,
    pub location_services: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Step {
    /// Login screen becomes visible
    Resume,

    /// Login screen goes away
    Pause,

    /// User answers the permission dialog
    PermissionResult { response: PermissionResponse },

    /// User accepted the rationale and the app asks again
    RequestPermission,

    /// User taps through to the app's permission settings
    OpenAppSettings,

    /// Raw sensor sample
    Sensor { sensor: SensorKind, values: [f64; 3] },

    /// Device held at the given angles (degrees)
    Orientation {
        #[serde(default)]
        azimuth: f64,
        #[serde(default)]
        pitch: f64,
        #[serde(default)]
        roll: f64,
    },

    /// Fix delivered by the location subscription
    Location {
        latitude: f64,
        longitude: f64,
        #[serde(default)]
        accuracy: Option<f64>,
    },

    /// Change battery, screen, network or permission state
    SetStatus(StatusChange),

    /// User presses login
    Login {
        password: String,
        #[serde(default)]
        expect: Option<Expectation>,
    },
}

impl Step {
    fn check(&self, index: usize) -> Result<()> {
        let invalid = |reason: &str| SimError::InvalidStep {
            index,
            reason: reason.to_string(),
        };

        match self {
            Step::Sensor { values, .. } if values.iter().any(|v| !v.is_finite()) => {
                Err(invalid("sensor values must be finite"))
            }
            Step::Orientation {
                azimuth,
                pitch,
                roll,
            } => {
                if ![azimuth, pitch, roll].iter().all(|v| v.is_finite()) {
                    return Err(invalid("angles must be finite"));
                }
                if pitch.abs() >= 90.0 {
                    return Err(invalid("pitch must be within (-90, 90)"));
                }
                Ok(())
            }
            Step::Location {
                latitude,
                longitude,
                ..
            } if !GeoPoint::new(*latitude, *longitude).is_valid() => {
                Err(invalid("coordinates out of range"))
            }
            Step::SetStatus(StatusChange {
                battery: Some(battery),
                ..
            }) if *battery > 100 => Err(invalid("battery must be at most 100")),
            _ => Ok(()),
        }
    }
}

/// Expected outcome of a login step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Expectation {
    Success,
    PermissionRequired,
    BrightnessTooLow,
    BadPassword,
    NoWifi,
    NotCharging,
    NotNearTarget,
    NotFlat,
    NotPointingNorth,
}

impl Expectation {
    pub fn matches(&self, result: &AuthResult) -> bool {
        match (self, result) {
            (Expectation::Success, AuthResult::Success) => true,
            (Expectation::PermissionRequired, AuthResult::PermissionRequired(_)) => true,
            (expected, AuthResult::Failure(reason)) => expected.reason() == Some(*reason),
            _ => false,
        }
    }

    fn reason(&self) -> Option<FailureReason> {
        match self {
            Expectation::Success | Expectation::PermissionRequired => None,
            Expectation::BrightnessTooLow => Some(FailureReason::BrightnessTooLow),
            Expectation::BadPassword => Some(FailureReason::BadPassword),
            Expectation::NoWifi => Some(FailureReason::NoWifi),
            Expectation::NotCharging => Some(FailureReason::NotCharging),
            Expectation::NotNearTarget => Some(FailureReason::NotNearTarget),
            Expectation::NotFlat => Some(FailureReason::NotFlat),
            Expectation::NotPointingNorth => Some(FailureReason::NotPointingNorth),
        }
    }
}

impl Scenario {
    /// Load and validate a scenario file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate scenario TOML
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let scenario: Self = toml::from_str(content)?;
        scenario.validate()?;
        Ok(scenario)
    }

    /// Reject steps the simulated device cannot act out
    pub fn validate(&self) -> Result<()> {
        if self.device.battery > 100 {
            return Err(SimError::Core(presence_core::Error::InvalidBatteryPercent(
                u32::from(self.device.battery),
            )));
        }

        self.steps
            .iter()
            .enumerate()
            .try_for_each(|(index, step)| step.check(index))
    }

    /// Number of login steps carrying an expectation
    pub fn expectations(&self) -> usize {
        self.steps
            .iter()
            .filter(|step| matches!(step, Step::Login { expect: Some(_), .. }))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use presence_core::PermissionState;
    use std::io::Write;

    const REFERENCE: &str = r#"
        name = "reference"

        [device]
        battery = 45
        brightness = 200

        [[steps]]
        action = "resume"

        [[steps]]
        action = "permission_result"
        response = "granted"

        [[steps]]
        action = "location"
        latitude = 32.08684812926745
        longitude = 34.7895403545493

        [[steps]]
        action = "orientation"
        azimuth = 5.0

        [[steps]]
        action = "sensor"
        sensor = "accelerometer"
        values = [0.0, 0.0, 9.81]

        [[steps]]
        action = "set_status"
        network = "cellular"

        [[steps]]
        action = "login"
        password = "10s20w30q9"
        expect = "no_wifi"

        [[steps]]
        action = "open_app_settings"
    "#;

    #[test]
    fn test_parse_reference() {
        let scenario = Scenario::from_toml_str(REFERENCE).unwrap();

        assert_eq!(scenario.name, "reference");
        assert_eq!(scenario.device.battery, 45);
        assert_eq!(scenario.device.brightness, 200);
        assert_eq!(scenario.device.max_brightness, 255);
        assert!(scenario.device.rationale);
        assert_eq!(scenario.steps.len(), 8);
        assert_eq!(scenario.steps[7], Step::OpenAppSettings);
        assert_eq!(scenario.steps[0], Step::Resume);
        assert_eq!(
            scenario.steps[1],
            Step::PermissionResult {
                response: PermissionResponse::Granted
            }
        );
        assert_eq!(
            scenario.steps[3],
            Step::Orientation {
                azimuth: 5.0,
                pitch: 0.0,
                roll: 0.0
            }
        );
        assert_eq!(
            scenario.steps[5],
            Step::SetStatus(StatusChange {
                network: Some(NetworkKind::Cellular),
                ..StatusChange::default()
            })
        );
        assert_eq!(scenario.expectations(), 1);
    }

    #[test]
    fn test_unknown_action_rejected() {
        let result = Scenario::from_toml_str("[[steps]]\naction = \"teleport\"\n");
        assert!(matches!(result, Err(SimError::ScenarioParse(_))));
    }

    #[test]
    fn test_invalid_steps_rejected() {
        let cases = [
            "[[steps]]\naction = \"location\"\nlatitude = 91.0\nlongitude = 0.0\n",
            "[[steps]]\naction = \"orientation\"\npitch = 90.0\n",
            "[[steps]]\naction = \"set_status\"\nbattery = 120\n",
        ];
        for toml in cases {
            let result = Scenario::from_toml_str(toml);
            assert!(
                matches!(result, Err(SimError::InvalidStep { index: 0, .. })),
                "expected rejection for {toml:?}"
            );
        }
    }

    #[test]
    fn test_device_battery_range() {
        let result = Scenario::from_toml_str("[device]\nbattery = 101\n");
        assert!(matches!(
            result,
            Err(SimError::Core(presence_core::Error::InvalidBatteryPercent(101)))
        ));
    }

    #[test]
    fn test_expectation_matches() {
        assert!(Expectation::Success.matches(&AuthResult::Success));
        assert!(Expectation::PermissionRequired
            .matches(&AuthResult::PermissionRequired(PermissionState::DeniedFinal)));
        assert!(Expectation::NotFlat.matches(&AuthResult::Failure(FailureReason::NotFlat)));
        assert!(!Expectation::NotFlat.matches(&AuthResult::Failure(FailureReason::NoWifi)));
        assert!(!Expectation::Success.matches(&AuthResult::Failure(FailureReason::NoWifi)));
        assert!(!Expectation::NoWifi.matches(&AuthResult::Success));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{REFERENCE}").unwrap();

        let scenario = Scenario::load(file.path()).unwrap();
        assert_eq!(scenario.name, "reference");
    }
}
