//! Login gate configuration
//!
//! Defaults reproduce the built-in constants. A config file only needs the
//! keys it overrides:
//!
//! ```toml
//! password_prefix = "10s20w30q"
//! denial_threshold = 2
//! distance_threshold_meters = 5000.0
//!
//! [[targets]]
//! label = "Arrabah"
//! latitude = 32.85254314059482
//! longitude = 35.33675279027549
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::gate::AuthenticationGate;
use crate::geofence::{GeofenceChecker, Target};
use crate::orientation::OrientationClassifier;
use crate::password::PasswordPolicy;
use crate::permission::PermissionStateMachine;
use crate::{
    Error, Result, ARRABAH, DENIAL_THRESHOLD, DISTANCE_THRESHOLD_METERS, FLAT_TOLERANCE_DEGREES,
    MIN_BRIGHTNESS_PERCENT, NORTH_TOLERANCE_DEGREES, PASSWORD_PREFIX, TEL_AVIV,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PresenceConfig {
    /// Fixed part of the battery-derived password
    pub password_prefix: String,

    /// Denials before the permission flow becomes final
    pub denial_threshold: u32,

    /// Minimum brightness as a percentage of the maximum
    pub min_brightness_percent: u8,

    /// Radius around each target (meters)
    pub distance_threshold_meters: f64,

    /// Places the user must be near
    pub targets: Vec<Target>,

    /// Maximum absolute pitch/roll for "flat" (degrees)
    pub flat_tolerance_degrees: f64,

    /// Maximum azimuth deviation from north (degrees)
    pub north_tolerance_degrees: f64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            password_prefix: PASSWORD_PREFIX.to_string(),
            denial_threshold: DENIAL_THRESHOLD,
            min_brightness_percent: MIN_BRIGHTNESS_PERCENT,
            distance_threshold_meters: DISTANCE_THRESHOLD_METERS,
            targets: vec![
                Target::new("Arrabah", ARRABAH),
                Target::new("Tel Aviv", TEL_AVIV),
            ],
            flat_tolerance_degrees: FLAT_TOLERANCE_DEGREES,
            north_tolerance_degrees: NORTH_TOLERANCE_DEGREES,
        }
    }
}

impl PresenceConfig {
    /// Load and validate configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the components cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.denial_threshold == 0 {
            return Err(Error::InvalidConfig(
                "denial_threshold must be at least 1".to_string(),
            ));
        }

        if self.min_brightness_percent > 100 {
            return Err(Error::InvalidConfig(format!(
                "min_brightness_percent {} exceeds 100",
                self.min_brightness_percent
            )));
        }

        if !self.distance_threshold_meters.is_finite() || self.distance_threshold_meters < 0.0 {
            return Err(Error::InvalidConfig(format!(
                "distance_threshold_meters {} must be a non-negative number",
                self.distance_threshold_meters
            )));
        }

        if self.targets.is_empty() {
            return Err(Error::InvalidConfig("at least one target is required".to_string()));
        }

        if let Some(target) = self.targets.iter().find(|t| !t.point.is_valid()) {
            return Err(Error::InvalidConfig(format!(
                "target {:?} has out-of-range coordinates",
                target.label
            )));
        }

        for (name, value) in [
            ("flat_tolerance_degrees", self.flat_tolerance_degrees),
            ("north_tolerance_degrees", self.north_tolerance_degrees),
        ] {
            if !(value > 0.0 && value <= 180.0) {
                return Err(Error::InvalidConfig(format!(
                    "{name} {value} must be within (0, 180]"
                )));
            }
        }

        Ok(())
    }

    pub fn password_policy(&self) -> PasswordPolicy {
        PasswordPolicy::new(self.password_prefix.clone())
    }

    pub fn geofence(&self) -> GeofenceChecker {
        GeofenceChecker::new(self.targets.clone(), self.distance_threshold_meters)
    }

    pub fn classifier(&self) -> OrientationClassifier {
        OrientationClassifier::new(self.flat_tolerance_degrees, self.north_tolerance_degrees)
    }

    pub fn permission_machine(&self) -> PermissionStateMachine {
        PermissionStateMachine::new(self.denial_threshold)
    }

    pub fn gate(&self) -> AuthenticationGate {
        AuthenticationGate::new(
            self.password_policy(),
            self.geofence(),
            self.min_brightness_percent,
        )
    }
}
