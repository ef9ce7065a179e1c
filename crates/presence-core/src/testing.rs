//! In-memory device fake for tests
//!
//! Every capability call is recorded in a public field so tests can assert
//! on what the core asked the platform to do.

use crate::device::{
    AdvisorySink, Brightness, ChargingState, DeviceStatus, LocationProvider, NetworkKind,
    PermissionKind, PermissionService, PermissionStatus, SubscriptionHandle,
};
use crate::geofence::LocationFix;
use crate::permission::PermissionAction;

#[derive(Debug, Clone)]
pub struct FakeDevice {
    pub fine: PermissionStatus,
    pub coarse: PermissionStatus,
    pub rationale: bool,
    pub requests: Vec<PermissionKind>,

    pub last_known: Option<LocationFix>,
    pub location_services: bool,
    pub subscriptions: Vec<SubscriptionHandle>,
    pub unsubscribed: Vec<SubscriptionHandle>,

    pub brightness: Brightness,
    pub battery: u8,
    pub charging: ChargingState,
    pub network: NetworkKind,

    pub advisories: Vec<PermissionAction>,
}

impl Default for FakeDevice {
    /// Every login condition satisfied except location permission
    fn default() -> Self {
        Self {
            fine: PermissionStatus::Denied,
            coarse: PermissionStatus::Denied,
            rationale: false,
            requests: Vec::new(),
            last_known: None,
            location_services: true,
            subscriptions: Vec::new(),
            unsubscribed: Vec::new(),
            brightness: Brightness::of_255(255),
            battery: 45,
            charging: ChargingState::Charging,
            network: NetworkKind::Wifi,
            advisories: Vec::new(),
        }
    }
}

impl FakeDevice {
    /// Precise location already granted
    pub fn granted() -> Self {
        Self {
            fine: PermissionStatus::Granted,
            coarse: PermissionStatus::Granted,
            ..Self::default()
        }
    }

    /// Subscriptions that were never cancelled
    pub fn active_subscriptions(&self) -> Vec<SubscriptionHandle> {
        self.subscriptions
            .iter()
            .filter(|h| !self.unsubscribed.contains(h))
            .copied()
            .collect()
    }
}

impl PermissionService for FakeDevice {
    fn query(&self, kind: PermissionKind) -> PermissionStatus {
        match kind {
            PermissionKind::FineLocation => self.fine,
            PermissionKind::CoarseLocation => self.coarse,
        }
    }

    fn request(&mut self, kind: PermissionKind) {
        self.requests.push(kind);
    }

    fn should_show_rationale(&self, _kind: PermissionKind) -> bool {
        self.rationale
    }
}

impl LocationProvider for FakeDevice {
    fn last_known_location(&self) -> Option<LocationFix> {
        self.last_known
    }

    fn subscribe_updates(&mut self) -> SubscriptionHandle {
        let handle = SubscriptionHandle(self.subscriptions.len() as u64 + 1);
        self.subscriptions.push(handle);
        handle
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        self.unsubscribed.push(handle);
    }

    fn location_services_enabled(&self) -> bool {
        self.location_services
    }
}

impl DeviceStatus for FakeDevice {
    fn brightness(&self) -> Brightness {
        self.brightness
    }

    fn battery_percent(&self) -> u8 {
        self.battery
    }

    fn charging_state(&self) -> ChargingState {
        self.charging
    }

    fn network_kind(&self) -> NetworkKind {
        self.network
    }
}

impl AdvisorySink for FakeDevice {
    fn dispatch(&mut self, action: PermissionAction) {
        self.advisories.push(action);
    }
}
