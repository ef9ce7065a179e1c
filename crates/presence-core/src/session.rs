//! Login session orchestration
//!
//! [`PresenceSession`] owns the mutable components (permission machine,
//! orientation classifier, location tracker) and the injected [`Device`].
//! The host delivers platform events one at a time through the `on_*`
//! methods and calls [`PresenceSession::attempt`] when the user presses login.
//! Every advisory the permission flow produces is forwarded to the device's
//! [`crate::AdvisorySink`].

use tracing::{debug, info, warn};

use crate::config::PresenceConfig;
use crate::device::{Device, PermissionKind};
use crate::gate::{AuthContext, AuthResult, AuthenticationGate, FailureReason};
use crate::geofence::LocationFix;
use crate::location::LocationTracker;
use crate::orientation::{OrientationClassifier, OrientationReading, SensorKind};
use crate::permission::{
    PermissionAction, PermissionProbe, PermissionResponse, PermissionSignal, PermissionState,
    PermissionStateMachine, SettingsPage,
};

pub struct PresenceSession<D: Device> {
    device: D,
    gate: AuthenticationGate,
    permission: PermissionStateMachine,
    orientation: OrientationClassifier,
    location: LocationTracker,
}

impl<D: Device> PresenceSession<D> {
    /// Session with the built-in policy
    pub fn new(device: D) -> Self {
        Self::with_config(device, &PresenceConfig::default())
    }

    pub fn with_config(device: D, config: &PresenceConfig) -> Self {
        Self {
            device,
            gate: config.gate(),
            permission: config.permission_machine(),
            orientation: config.classifier(),
            location: LocationTracker::new(),
        }
    }

    pub fn device(&self) -> &D {
        &self.device
    }

    pub fn device_mut(&mut self) -> &mut D {
        &mut self.device
    }

    pub fn into_device(self) -> D {
        self.device
    }

    pub fn permission_state(&self) -> PermissionState {
        self.permission.state()
    }

    pub fn permission(&self) -> &PermissionStateMachine {
        &self.permission
    }

    pub fn orientation(&self) -> OrientationReading {
        self.orientation.reading()
    }

    pub fn classifier(&self) -> &OrientationClassifier {
        &self.orientation
    }

    pub fn location(&self) -> &LocationTracker {
        &self.location
    }

    pub fn gate(&self) -> &AuthenticationGate {
        &self.gate
    }

    /// Silent permission check when the login screen becomes visible
    ///
    /// With precise location already granted this restarts location work,
    /// re-checking that location services are on.
    pub fn resume(&mut self) -> PermissionAction {
        let was_granted = self.permission.is_granted();
        let probe = PermissionProbe::from_service(&self.device);
        let action = self.signal(PermissionSignal::Probe(probe));

        if was_granted {
            if let Some(settings) = self.start_location() {
                self.device.dispatch(settings);
                return settings;
            }
        }
        action
    }

    /// Stop background location work when the screen goes away
    pub fn pause(&mut self) {
        self.location.cancel(&mut self.device);
    }

    /// Answer from a permission dialog
    pub fn on_permission_result(&mut self, response: PermissionResponse) -> PermissionAction {
        self.signal(PermissionSignal::Response(response))
    }

    /// Ask for precise location again, e.g. after the user accepted the rationale
    ///
    /// Does nothing once the flow has reached a terminal state.
    pub fn request_permission(&mut self) {
        if self.permission.state().is_terminal() {
            debug!(
                state = self.permission.state().as_str(),
                "permission request skipped"
            );
            return;
        }
        self.device.request(PermissionKind::FineLocation);
    }

    /// Send the user to this app's permission page
    ///
    /// Offered while precise location is missing but the user can still fix
    /// it by hand: approximate-only, retryable denial and the final screen.
    pub fn open_app_settings(&mut self) -> PermissionAction {
        match self.permission.state() {
            PermissionState::GrantedApproximateOnly
            | PermissionState::DeniedRetryable
            | PermissionState::DeniedFinal => {
                let action = PermissionAction::OpenSettings(SettingsPage::AppDetails);
                self.device.dispatch(action);
                action
            }
            state => {
                debug!(state = state.as_str(), "app settings not offered");
                PermissionAction::None
            }
        }
    }

    /// Raw accelerometer or magnetometer sample
    pub fn on_sensor_event(&mut self, kind: SensorKind, vector: [f64; 3]) {
        self.orientation.update(kind, vector);
    }

    /// Location fix delivered by the provider's subscription
    pub fn on_location_update(&mut self, fix: LocationFix) {
        self.location.on_location_update(&mut self.device, fix);
    }

    /// Run one login attempt with the current device snapshot
    pub fn attempt(&mut self, password: &str) -> AuthResult {
        if !self.permission.is_granted() {
            let probe = PermissionProbe::from_service(&self.device);
            self.signal(PermissionSignal::LoginAttempt(probe));

            if !self.permission.is_granted() {
                return AuthResult::PermissionRequired(self.permission.state());
            }
        }

        let battery_percent = self.battery_percent();
        let ctx = AuthContext {
            permission: self.permission.state(),
            brightness: self.device.brightness(),
            password,
            battery_percent,
            network: self.device.network_kind(),
            charging: self.device.charging_state(),
            location: self.location.fix(),
            orientation: self.orientation.reading(),
        };
        let result = self.gate.attempt(&ctx);

        match result {
            AuthResult::Success => info!("login successful"),
            AuthResult::Failure(FailureReason::NotNearTarget) if self.location.fix().is_none() => {
                debug!("no location fix yet, requesting one");
                if let Some(settings) = self.start_location() {
                    self.device.dispatch(settings);
                }
            }
            _ => {}
        }

        result
    }

    /// Feed a signal to the machine, act on the advisory and forward it
    fn signal(&mut self, signal: PermissionSignal) -> PermissionAction {
        let was_granted = self.permission.is_granted();
        let mut action = self.permission.handle(signal);

        if action == PermissionAction::RequestPermission {
            self.device.request(PermissionKind::FineLocation);
        }

        if !was_granted && self.permission.is_granted() {
            if let Some(settings) = self.start_location() {
                action = settings;
            }
        }

        if action != PermissionAction::None {
            self.device.dispatch(action);
        }
        action
    }

    /// Begin acquiring a fix once precise location is granted
    ///
    /// Returns the settings advisory instead when location services are off.
    fn start_location(&mut self) -> Option<PermissionAction> {
        if !self.device.location_services_enabled() {
            warn!("location services are disabled");
            self.location.cancel(&mut self.device);
            return Some(PermissionAction::OpenSettings(SettingsPage::LocationSource));
        }
        self.location.ensure_fix(&mut self.device);
        None
    }

    fn battery_percent(&self) -> u8 {
        let raw = self.device.battery_percent();
        if raw > 100 {
            warn!(raw, "battery percentage above 100, clamping");
            return 100;
        }
        raw
    }
}
