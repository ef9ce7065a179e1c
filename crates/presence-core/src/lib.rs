//! Presence Core - Proof-of-presence login gate
//!
//! A user may log in only while the device is in a specific physical and
//! environmental situation: bright screen, battery-derived password, Wi-Fi,
//! charging, near one of the configured places, lying flat and facing north.
//!
//! Precise location is gated behind an operating-system permission flow, which
//! is modelled by [`PermissionStateMachine`]. Everything the core needs from the
//! host platform is reached through the capability traits in [`device`].

pub mod config;
pub mod device;
pub mod error;
pub mod gate;
pub mod geofence;
pub mod location;
pub mod orientation;
pub mod password;
pub mod permission;
pub mod session;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::PresenceConfig;
pub use device::{
    AdvisorySink, Brightness, ChargingState, Device, DeviceStatus, LocationProvider, NetworkKind,
    PermissionKind, PermissionService, PermissionStatus, SubscriptionHandle,
};
pub use error::{Error, Result};
pub use gate::{AuthContext, AuthResult, AuthenticationGate, FailureReason};
pub use geofence::{haversine_distance, GeoPoint, GeofenceChecker, LocationFix, Target};
pub use location::LocationTracker;
pub use orientation::{OrientationAngles, OrientationClassifier, OrientationReading, SensorKind};
pub use password::{digit_sum, PasswordPolicy};
pub use permission::{
    PermissionAction, PermissionProbe, PermissionResponse, PermissionSignal, PermissionState,
    PermissionStateMachine, SettingsPage,
};
pub use session::PresenceSession;

/// Prefix of the battery-derived password
pub const PASSWORD_PREFIX: &str = "10s20w30q";

/// Denials of the fine-location permission before the flow becomes final
pub const DENIAL_THRESHOLD: u32 = 2;

/// Minimum screen brightness, as a percentage of the maximum
pub const MIN_BRIGHTNESS_PERCENT: u8 = 50;

/// Radius around each target within which the user counts as present (meters)
pub const DISTANCE_THRESHOLD_METERS: f64 = 5000.0;

/// Maximum absolute pitch and roll for the device to count as flat (degrees)
pub const FLAT_TOLERANCE_DEGREES: f64 = 10.0;

/// Maximum deviation of the azimuth from north (degrees)
pub const NORTH_TOLERANCE_DEGREES: f64 = 15.0;

/// Arrabah target coordinates
pub const ARRABAH: GeoPoint = GeoPoint::new(32.85254314059482, 35.33675279027549);

/// Tel Aviv target coordinates
pub const TEL_AVIV: GeoPoint = GeoPoint::new(32.08684812926745, 34.7895403545493);
