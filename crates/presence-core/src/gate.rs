//! Ordered multi-factor login gate
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. Precise location permission (branches to the permission flow)
//! 2. Screen brightness
//! 3. Battery-derived password
//! 4. Wi-Fi
//! 5. Charging
//! 6. Near a target
//! 7. Lying flat
//! 8. Pointing north
//!
//! The gate holds only immutable policy; the same context always produces
//! the same result.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::device::{Brightness, ChargingState, NetworkKind};
use crate::geofence::{GeofenceChecker, LocationFix};
use crate::orientation::OrientationReading;
use crate::password::PasswordPolicy;
use crate::permission::PermissionState;
use crate::MIN_BRIGHTNESS_PERCENT;

/// Why a login attempt was rejected, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum FailureReason {
    #[error("Screen brightness must be at least 50%")]
    BrightnessTooLow,

    #[error("Password must end with the sum of the battery level digits")]
    BadPassword,

    #[error("Device must be connected to a Wi-Fi network")]
    NoWifi,

    #[error("Device must be charging")]
    NotCharging,

    #[error("Device must be near one of the target locations")]
    NotNearTarget,

    #[error("Device must be lying flat")]
    NotFlat,

    #[error("Device must be pointing north")]
    NotPointingNorth,
}

impl FailureReason {
    /// All reasons in evaluation order
    pub const ALL: [FailureReason; 7] = [
        FailureReason::BrightnessTooLow,
        FailureReason::BadPassword,
        FailureReason::NoWifi,
        FailureReason::NotCharging,
        FailureReason::NotNearTarget,
        FailureReason::NotFlat,
        FailureReason::NotPointingNorth,
    ];
}

/// Outcome of a login attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "detail", rename_all = "snake_case")]
pub enum AuthResult {
    Success,
    Failure(FailureReason),
    /// Precise location is not granted; the permission flow decides what's next
    PermissionRequired(PermissionState),
}

impl AuthResult {
    pub fn is_success(&self) -> bool {
        matches!(self, AuthResult::Success)
    }

    pub fn failure(&self) -> Option<FailureReason> {
        match self {
            AuthResult::Failure(reason) => Some(*reason),
            _ => None,
        }
    }
}

/// Snapshot of everything the gate inspects
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AuthContext<'a> {
    pub permission: PermissionState,
    pub brightness: Brightness,
    pub password: &'a str,
    pub battery_percent: u8,
    pub network: NetworkKind,
    pub charging: ChargingState,
    pub location: Option<&'a LocationFix>,
    pub orientation: OrientationReading,
}

/// Stateless evaluator over an [`AuthContext`]
#[derive(Debug, Clone)]
pub struct AuthenticationGate {
    password: PasswordPolicy,
    geofence: GeofenceChecker,
    min_brightness_percent: u8,
}

impl Default for AuthenticationGate {
    fn default() -> Self {
        Self::new(
            PasswordPolicy::default(),
            GeofenceChecker::default(),
            MIN_BRIGHTNESS_PERCENT,
        )
    }
}

impl AuthenticationGate {
    pub fn new(
        password: PasswordPolicy,
        geofence: GeofenceChecker,
        min_brightness_percent: u8,
    ) -> Self {
        Self {
            password,
            geofence,
            min_brightness_percent,
        }
    }

    pub fn password_policy(&self) -> &PasswordPolicy {
        &self.password
    }

    pub fn geofence(&self) -> &GeofenceChecker {
        &self.geofence
    }

    /// Evaluate the checks in order and report the first failure
    pub fn attempt(&self, ctx: &AuthContext<'_>) -> AuthResult {
        if ctx.permission != PermissionState::GrantedPrecise {
            return AuthResult::PermissionRequired(ctx.permission);
        }

        match self.first_failure(ctx) {
            Some(reason) => {
                debug!(?reason, "login rejected");
                AuthResult::Failure(reason)
            }
            None => AuthResult::Success,
        }
    }

    fn first_failure(&self, ctx: &AuthContext<'_>) -> Option<FailureReason> {
        if !ctx.brightness.meets_percent(self.min_brightness_percent) {
            return Some(FailureReason::BrightnessTooLow);
        }

        if !self.password.validate(ctx.password, ctx.battery_percent) {
            return Some(FailureReason::BadPassword);
        }

        if ctx.network != NetworkKind::Wifi {
            return Some(FailureReason::NoWifi);
        }

        if !ctx.charging.is_plugged() {
            return Some(FailureReason::NotCharging);
        }

        if !self.geofence.is_near_any_target(ctx.location) {
            return Some(FailureReason::NotNearTarget);
        }

        if !ctx.orientation.flat {
            return Some(FailureReason::NotFlat);
        }

        if !ctx.orientation.pointing_north {
            return Some(FailureReason::NotPointingNorth);
        }

        None
    }
}
