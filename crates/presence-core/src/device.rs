//! Host platform capabilities
//!
//! The core never talks to the operating system directly. Permission dialogs,
//! location providers and status queries are injected through these traits,
//! which lets tests and the simulator substitute deterministic fakes.
//!
//! Requests are fire-and-forget: results come back later through the entry
//! points on [`crate::PresenceSession`].

use serde::{Deserialize, Serialize};

use crate::geofence::LocationFix;
use crate::permission::PermissionAction;

/// Location permission tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionKind {
    /// Precise, high-accuracy location
    FineLocation,
    /// Approximate location
    CoarseLocation,
}

/// Result of a permission query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    Granted,
    Denied,
}

impl PermissionStatus {
    pub fn is_granted(self) -> bool {
        self == PermissionStatus::Granted
    }
}

impl From<bool> for PermissionStatus {
    fn from(granted: bool) -> Self {
        if granted {
            PermissionStatus::Granted
        } else {
            PermissionStatus::Denied
        }
    }
}

/// Screen brightness reading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Brightness {
    /// Current level
    pub level: u32,
    /// Maximum level the platform reports
    pub max: u32,
}

impl Brightness {
    /// Brightness on the usual 0..=255 scale
    pub const fn of_255(level: u32) -> Self {
        Self { level, max: 255 }
    }

    /// Whether the level is at least `percent` of the maximum
    ///
    /// A zero maximum never qualifies.
    pub fn meets_percent(&self, percent: u8) -> bool {
        if self.max == 0 {
            return false;
        }
        u64::from(self.level) * 100 >= u64::from(self.max) * u64::from(percent)
    }
}

/// Battery charging state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChargingState {
    Charging,
    Full,
    Discharging,
    NotCharging,
}

impl ChargingState {
    /// Charging or already full
    pub fn is_plugged(self) -> bool {
        matches!(self, ChargingState::Charging | ChargingState::Full)
    }
}

/// Active network transport
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkKind {
    Wifi,
    Cellular,
    None,
}

/// Opaque handle of an outstanding location subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(pub u64);

/// Operating-system permission subsystem
pub trait PermissionService {
    /// Current status of a permission
    fn query(&self, kind: PermissionKind) -> PermissionStatus;

    /// Show the system permission dialog; the answer arrives later
    fn request(&mut self, kind: PermissionKind);

    /// Whether the platform wants an explanation shown before asking again
    fn should_show_rationale(&self, kind: PermissionKind) -> bool;
}

/// Location-fix provider
pub trait LocationProvider {
    /// Most recent fix the platform already has, if any
    fn last_known_location(&self) -> Option<LocationFix>;

    /// Start receiving fresh fixes
    fn subscribe_updates(&mut self) -> SubscriptionHandle;

    /// Stop a subscription returned by [`LocationProvider::subscribe_updates`]
    fn unsubscribe(&mut self, handle: SubscriptionHandle);

    /// Whether high-accuracy location services are switched on
    fn location_services_enabled(&self) -> bool;
}

/// Battery, screen and network status
pub trait DeviceStatus {
    fn brightness(&self) -> Brightness;
    fn battery_percent(&self) -> u8;
    fn charging_state(&self) -> ChargingState;
    fn network_kind(&self) -> NetworkKind;
}

/// Receiver of permission advisories
///
/// The UI layer acts on these: showing dialogs, opening settings pages
/// (`open_system_settings`, `open_location_source_settings`) or navigating to
/// the final instructions screen.
pub trait AdvisorySink {
    fn dispatch(&mut self, action: PermissionAction);
}

/// Everything a [`crate::PresenceSession`] needs from the host
pub trait Device: PermissionService + LocationProvider + DeviceStatus + AdvisorySink {}

impl<T> Device for T where T: PermissionService + LocationProvider + DeviceStatus + AdvisorySink {}
