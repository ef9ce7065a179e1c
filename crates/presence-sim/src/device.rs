//! Scripted device backing a simulated session

use presence_core::{
    AdvisorySink, Brightness, ChargingState, DeviceStatus, LocationFix,
    LocationProvider, NetworkKind, PermissionAction, PermissionKind, PermissionResponse,
    PermissionService, PermissionStatus, SubscriptionHandle,
};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::scenario::{DeviceSetup, StatusChange};

/// Device whose state is driven by scenario steps
///
/// Advisories are pushed onto a channel so the runner can record them after
/// each step.
#[derive(Debug)]
pub struct SimDevice {
    fine: PermissionStatus,
    coarse: PermissionStatus,
    rationale: bool,
    brightness: Brightness,
    battery: u8,
    charging: ChargingState,
    network: NetworkKind,
    location_services: bool,
    last_known: Option<LocationFix>,
    next_subscription: u64,
    active: Vec<SubscriptionHandle>,
    requests: Vec<PermissionKind>,
    advisories: mpsc::UnboundedSender<PermissionAction>,
}

impl SimDevice {
    pub fn new(setup: &DeviceSetup, advisories: mpsc::UnboundedSender<PermissionAction>) -> Self {
        Self {
            fine: PermissionStatus::from(setup.fine),
            coarse: PermissionStatus::from(setup.coarse || setup.fine),
            rationale: setup.rationale,
            brightness: Brightness {
                level: setup.brightness,
                max: setup.max_brightness,
            },
            battery: setup.battery,
            charging: setup.charging,
            network: setup.network,
            location_services: setup.location_services,
            last_known: setup.last_known.map(LocationFix::from),
            next_subscription: 0,
            active: Vec::new(),
            requests: Vec::new(),
            advisories,
        }
    }

    /// Reflect a dialog answer in the platform's permission table
    pub fn apply_response(&mut self, response: PermissionResponse) {
        match response {
            PermissionResponse::Granted => {
                self.fine = PermissionStatus::Granted;
                self.coarse = PermissionStatus::Granted;
            }
            PermissionResponse::GrantedApproximate => {
                self.coarse = PermissionStatus::Granted;
            }
            PermissionResponse::Denied => {}
        }
    }

    pub fn apply_status(&mut self, change: &StatusChange) {
        if let Some(fine) = change.fine {
            self.fine = PermissionStatus::from(fine);
        }
        if let Some(coarse) = change.coarse {
            self.coarse = PermissionStatus::from(coarse);
        }
        if let Some(rationale) = change.rationale {
            self.rationale = rationale;
        }
        if let Some(level) = change.brightness {
            self.brightness.level = level;
        }
        if let Some(battery) = change.battery {
            self.battery = battery;
        }
        if let Some(charging) = change.charging {
            self.charging = charging;
        }
        if let Some(network) = change.network {
            self.network = network;
        }
        if let Some(enabled) = change.location_services {
            self.location_services = enabled;
        }
        debug!(?change, "device status updated");
    }

    /// Permission dialogs shown so far
    pub fn requests(&self) -> &[PermissionKind] {
        &self.requests
    }

    pub fn active_subscriptions(&self) -> &[SubscriptionHandle] {
        &self.active
    }
}

impl PermissionService for SimDevice {
    fn query(&self, kind: PermissionKind) -> PermissionStatus {
        match kind {
            PermissionKind::FineLocation => self.fine,
            PermissionKind::CoarseLocation => self.coarse,
        }
    }

    fn request(&mut self, kind: PermissionKind) {
        debug!(?kind, "permission dialog shown");
        self.requests.push(kind);
    }

    fn should_show_rationale(&self, _kind: PermissionKind) -> bool {
        self.rationale
    }
}

impl LocationProvider for SimDevice {
    fn last_known_location(&self) -> Option<LocationFix> {
        self.last_known
    }

    fn subscribe_updates(&mut self) -> SubscriptionHandle {
        self.next_subscription += 1;
        let handle = SubscriptionHandle(self.next_subscription);
        self.active.push(handle);
        debug!(handle = handle.0, "location subscription started");
        handle
    }

    fn unsubscribe(&mut self, handle: SubscriptionHandle) {
        self.active.retain(|h| *h != handle);
        debug!(handle = handle.0, "location subscription stopped");
    }

    fn location_services_enabled(&self) -> bool {
        self.location_services
    }
}

impl DeviceStatus for SimDevice {
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

impl AdvisorySink for SimDevice {
    fn dispatch(&mut self, action: PermissionAction) {
        if self.advisories.send(action).is_err() {
            warn!(?action, "advisory receiver dropped");
        }
    }
}
