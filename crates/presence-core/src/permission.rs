//! Fine-location permission escalation
//!
//! The flow the user walks through before precise location is available:
//!
//! - One silent request is fired the first time the screen is shown
//! - A denial can be retried after an explanation (rationale)
//! - Approximate-only grants are asked to upgrade to precise
//! - After [`crate::DENIAL_THRESHOLD`] denials, or when the platform stops
//!   offering a rationale ("don't ask again"), the flow is final for the
//!   process lifetime and the user must fix permissions outside the app
//!
//! The machine never fails. Every signal produces a new state and an advisory
//! [`PermissionAction`] for the UI layer.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::device::{PermissionKind, PermissionService, PermissionStatus};
use crate::DENIAL_THRESHOLD;

/// Permission lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionState {
    /// Nothing asked yet this session
    #[default]
    Unrequested,
    /// The silent request is showing, waiting for the answer
    RequestPending,
    /// Precise location granted
    GrantedPrecise,
    /// Only approximate location granted
    GrantedApproximateOnly,
    /// Denied, but the user can still be asked again
    DeniedRetryable,
    /// Denied for good; recovery happens outside the app
    DeniedFinal,
}

impl PermissionState {
    /// No further caller action is possible in this session
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            PermissionState::GrantedPrecise | PermissionState::DeniedFinal
        )
    }

    /// Stable snake_case name, as used in logs and reports
    pub fn as_str(self) -> &'static str {
        match self {
            PermissionState::Unrequested => "unrequested",
            PermissionState::RequestPending => "request_pending",
            PermissionState::GrantedPrecise => "granted_precise",
            PermissionState::GrantedApproximateOnly => "granted_approximate_only",
            PermissionState::DeniedRetryable => "denied_retryable",
            PermissionState::DeniedFinal => "denied_final",
        }
    }
}

/// Settings screens the user can be sent to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingsPage {
    /// This app's permission page
    AppDetails,
    /// System location/GPS switch
    LocationSource,
}

/// What the UI layer should do next
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionAction {
    #[default]
    None,
    /// A fine-location permission dialog has been requested
    RequestPermission,
    /// Explain why precise location is needed before asking again
    ShowRationale,
    /// Send the user to a settings page
    OpenSettings(SettingsPage),
    /// Replace the login screen with the final instructions screen
    NavigateToFinalScreen,
}

/// Snapshot of the permission subsystem taken when a signal is produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionProbe {
    pub fine: PermissionStatus,
    pub coarse: PermissionStatus,
    pub should_show_rationale: bool,
}

impl PermissionProbe {
    /// Query the platform for the current location permissions
    pub fn from_service<S: PermissionService + ?Sized>(service: &S) -> Self {
        Self {
            fine: service.query(PermissionKind::FineLocation),
            coarse: service.query(PermissionKind::CoarseLocation),
            should_show_rationale: service.should_show_rationale(PermissionKind::FineLocation),
        }
    }

    /// Nothing granted and no rationale on offer
    pub fn denied() -> Self {
        Self {
            fine: PermissionStatus::Denied,
            coarse: PermissionStatus::Denied,
            should_show_rationale: false,
        }
    }

    /// Precise location granted
    pub fn granted() -> Self {
        Self {
            fine: PermissionStatus::Granted,
            coarse: PermissionStatus::Granted,
            should_show_rationale: false,
        }
    }

    fn coarse_only(&self) -> bool {
        self.coarse.is_granted() && !self.fine.is_granted()
    }
}

/// Answer delivered by the permission dialog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionResponse {
    /// Precise location granted
    Granted,
    /// The user picked approximate location instead of precise
    GrantedApproximate,
    Denied,
}

/// External events the machine reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionSignal {
    /// Silent check when the login screen (re)appears
    Probe(PermissionProbe),
    /// The user tried to log in without precise location
    LoginAttempt(PermissionProbe),
    /// Answer to a permission dialog
    Response(PermissionResponse),
}

/// Permission state plus denial bookkeeping for one session
#[derive(Debug, Clone)]
pub struct PermissionStateMachine {
    state: PermissionState,
    denials: u32,
    threshold: u32,
    silent_request_fired: bool,
}

impl Default for PermissionStateMachine {
    fn default() -> Self {
        Self::new(DENIAL_THRESHOLD)
    }
}

impl PermissionStateMachine {
    /// Create a machine that becomes final after `threshold` denials
    pub fn new(threshold: u32) -> Self {
        Self {
            state: PermissionState::Unrequested,
            denials: 0,
            threshold: threshold.max(1),
            silent_request_fired: false,
        }
    }

    /// Current state of the flow
    pub fn state(&self) -> PermissionState {
        self.state
    }

    /// Denial signals received since process start
    pub fn denials(&self) -> u32 {
        self.denials
    }

    /// Denials that make the flow final (at least 1)
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Precise location is available
    pub fn is_granted(&self) -> bool {
        self.state == PermissionState::GrantedPrecise
    }

    /// The flow is a dead end until permissions are fixed externally
    pub fn is_final(&self) -> bool {
        self.state == PermissionState::DeniedFinal
    }

    /// Whether the one silent request of this session has been used
    pub fn silent_request_fired(&self) -> bool {
        self.silent_request_fired
    }

    /// Apply one signal and return the advisory for the caller
    pub fn handle(&mut self, signal: PermissionSignal) -> PermissionAction {
        let from = self.state;

        let action = match self.state {
            PermissionState::DeniedFinal => self.on_final(signal),
            PermissionState::GrantedPrecise => PermissionAction::None,
            _ => match signal {
                PermissionSignal::Probe(probe) => self.on_probe(probe),
                PermissionSignal::LoginAttempt(probe) => self.on_login_attempt(probe),
                PermissionSignal::Response(response) => self.on_response(response),
            },
        };

        if from != self.state {
            debug!(
                from = from.as_str(),
                to = self.state.as_str(),
                denials = self.denials,
                ?action,
                "permission transition"
            );
            match self.state {
                PermissionState::GrantedPrecise => info!("precise location permission granted"),
                PermissionState::DeniedFinal => info!(
                    denials = self.denials,
                    "location permission denied for the rest of the session"
                ),
                _ => {}
            }
        }

        action
    }

    fn on_final(&mut self, signal: PermissionSignal) -> PermissionAction {
        match signal {
            PermissionSignal::Response(response) => {
                if response != PermissionResponse::Granted {
                    self.denials = self.denials.saturating_add(1);
                }
                PermissionAction::None
            }
            PermissionSignal::LoginAttempt(_) => PermissionAction::NavigateToFinalScreen,
            PermissionSignal::Probe(_) => PermissionAction::None,
        }
    }

    fn on_probe(&mut self, probe: PermissionProbe) -> PermissionAction {
        if probe.fine.is_granted() {
            self.state = PermissionState::GrantedPrecise;
            return PermissionAction::None;
        }

        match self.state {
            PermissionState::Unrequested => self.fire_silent_request(),
            PermissionState::DeniedRetryable if probe.coarse_only() => {
                self.state = PermissionState::GrantedApproximateOnly;
                PermissionAction::None
            }
            _ => PermissionAction::None,
        }
    }

    fn on_login_attempt(&mut self, probe: PermissionProbe) -> PermissionAction {
        if probe.fine.is_granted() {
            self.state = PermissionState::GrantedPrecise;
            return PermissionAction::None;
        }

        match self.state {
            PermissionState::Unrequested => self.fire_silent_request(),
            // The dialog is still up
            PermissionState::RequestPending => PermissionAction::None,
            _ => self.escalate(probe),
        }
    }

    fn on_response(&mut self, response: PermissionResponse) -> PermissionAction {
        match response {
            PermissionResponse::Granted => {
                self.state = PermissionState::GrantedPrecise;
                PermissionAction::None
            }
            PermissionResponse::GrantedApproximate => {
                self.record_denial(PermissionState::GrantedApproximateOnly)
            }
            PermissionResponse::Denied => {
                let next = if self.state == PermissionState::GrantedApproximateOnly {
                    PermissionState::GrantedApproximateOnly
                } else {
                    PermissionState::DeniedRetryable
                };
                self.record_denial(next)
            }
        }
    }

    /// A precise-location request is only fired once automatically
    fn fire_silent_request(&mut self) -> PermissionAction {
        if self.silent_request_fired {
            return PermissionAction::None;
        }
        self.silent_request_fired = true;
        self.state = PermissionState::RequestPending;
        PermissionAction::RequestPermission
    }

    fn record_denial(&mut self, next: PermissionState) -> PermissionAction {
        self.denials = self.denials.saturating_add(1);
        if self.denials >= self.threshold {
            self.state = PermissionState::DeniedFinal;
            return PermissionAction::NavigateToFinalScreen;
        }
        self.state = next;
        PermissionAction::None
    }

    /// Decide how to proceed after the user was refused precise location
    fn escalate(&mut self, probe: PermissionProbe) -> PermissionAction {
        if self.denials >= self.threshold {
            self.state = PermissionState::DeniedFinal;
            return PermissionAction::NavigateToFinalScreen;
        }

        if probe.coarse_only() {
            self.state = PermissionState::GrantedApproximateOnly;
            return PermissionAction::RequestPermission;
        }

        if probe.should_show_rationale {
            self.state = PermissionState::DeniedRetryable;
            return PermissionAction::ShowRationale;
        }

        // "Don't ask again", or the platform denied without a dialog
        self.state = PermissionState::DeniedFinal;
        PermissionAction::NavigateToFinalScreen
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rationale_probe() -> PermissionProbe {
        PermissionProbe {
            should_show_rationale: true,
            ..PermissionProbe::denied()
        }
    }

    fn coarse_probe() -> PermissionProbe {
        PermissionProbe {
            fine: PermissionStatus::Denied,
            coarse: PermissionStatus::Granted,
            should_show_rationale: true,
        }
    }

    #[test]
    fn test_initial_state() {
        let machine = PermissionStateMachine::default();
        assert_eq!(machine.state(), PermissionState::Unrequested);
        assert_eq!(machine.denials(), 0);
        assert_eq!(machine.threshold(), DENIAL_THRESHOLD);
        assert!(!machine.silent_request_fired());
    }

    #[test]
    fn test_probe_already_granted() {
        let mut machine = PermissionStateMachine::default();
        let action = machine.handle(PermissionSignal::Probe(PermissionProbe::granted()));

        assert_eq!(action, PermissionAction::None);
        assert!(machine.is_granted());
        assert!(!machine.silent_request_fired());
    }

    #[test]
    fn test_silent_request_fires_once() {
        let mut machine = PermissionStateMachine::default();

        let first = machine.handle(PermissionSignal::Probe(PermissionProbe::denied()));
        assert_eq!(first, PermissionAction::RequestPermission);
        assert_eq!(machine.state(), PermissionState::RequestPending);

        // Re-running the probe does not ask again
        let second = machine.handle(PermissionSignal::Probe(PermissionProbe::denied()));
        assert_eq!(second, PermissionAction::None);

        machine.handle(PermissionSignal::Response(PermissionResponse::Denied));
        let third = machine.handle(PermissionSignal::Probe(PermissionProbe::denied()));
        assert_eq!(third, PermissionAction::None);
        assert_eq!(machine.state(), PermissionState::DeniedRetryable);
    }

    #[test]
    fn test_pending_then_granted() {
        let mut machine = PermissionStateMachine::default();
        machine.handle(PermissionSignal::Probe(PermissionProbe::denied()));
        machine.handle(PermissionSignal::Response(PermissionResponse::Granted));

        assert!(machine.is_granted());
        assert!(machine.state().is_terminal());
    }

    #[test]
    fn test_two_denials_are_final() {
        let mut machine = PermissionStateMachine::default();
        machine.handle(PermissionSignal::Probe(PermissionProbe::denied()));

        let first = machine.handle(PermissionSignal::Response(PermissionResponse::Denied));
        assert_eq!(first, PermissionAction::None);
        assert_eq!(machine.state(), PermissionState::DeniedRetryable);

        let second = machine.handle(PermissionSignal::Response(PermissionResponse::Denied));
        assert_eq!(second, PermissionAction::NavigateToFinalScreen);
        assert!(machine.is_final());

        machine.handle(PermissionSignal::Response(PermissionResponse::Denied));
        assert!(machine.is_final());
        assert_eq!(machine.denials(), 3);
    }

    #[test]
    fn test_final_ignores_grants() {
        let mut machine = PermissionStateMachine::new(1);
        machine.handle(PermissionSignal::Response(PermissionResponse::Denied));
        assert!(machine.is_final());

        machine.handle(PermissionSignal::Response(PermissionResponse::Granted));
        machine.handle(PermissionSignal::Probe(PermissionProbe::granted()));
        assert!(machine.is_final());

        let action = machine.handle(PermissionSignal::LoginAttempt(PermissionProbe::granted()));
        assert_eq!(action, PermissionAction::NavigateToFinalScreen);
    }

    #[test]
    fn test_login_after_denial_shows_rationale() {
        let mut machine = PermissionStateMachine::default();
        machine.handle(PermissionSignal::Probe(PermissionProbe::denied()));
        machine.handle(PermissionSignal::Response(PermissionResponse::Denied));

        let action = machine.handle(PermissionSignal::LoginAttempt(rationale_probe()));
        assert_eq!(action, PermissionAction::ShowRationale);
        assert_eq!(machine.state(), PermissionState::DeniedRetryable);

        // Rationale accepted and the re-request granted
        machine.handle(PermissionSignal::Response(PermissionResponse::Granted));
        assert!(machine.is_granted());
    }

    #[test]
    fn test_login_without_rationale_is_final() {
        let mut machine = PermissionStateMachine::default();
        machine.handle(PermissionSignal::Probe(PermissionProbe::denied()));
        machine.handle(PermissionSignal::Response(PermissionResponse::Denied));

        let action = machine.handle(PermissionSignal::LoginAttempt(PermissionProbe::denied()));
        assert_eq!(action, PermissionAction::NavigateToFinalScreen);
        assert!(machine.is_final());
        assert_eq!(machine.denials(), 1);
    }

    #[test]
    fn test_login_while_pending_waits() {
        let mut machine = PermissionStateMachine::default();
        machine.handle(PermissionSignal::Probe(PermissionProbe::denied()));

        let action = machine.handle(PermissionSignal::LoginAttempt(PermissionProbe::denied()));
        assert_eq!(action, PermissionAction::None);
        assert_eq!(machine.state(), PermissionState::RequestPending);
    }

    #[test]
    fn test_login_before_probe_fires_silent_request() {
        let mut machine = PermissionStateMachine::default();
        let action = machine.handle(PermissionSignal::LoginAttempt(PermissionProbe::denied()));

        assert_eq!(action, PermissionAction::RequestPermission);
        assert_eq!(machine.state(), PermissionState::RequestPending);
        assert!(machine.silent_request_fired());
    }

    #[test]
    fn test_coarse_only_upgrade() {
        let mut machine = PermissionStateMachine::default();
        machine.handle(PermissionSignal::Probe(PermissionProbe::denied()));
        machine.handle(PermissionSignal::Response(PermissionResponse::Denied));

        let action = machine.handle(PermissionSignal::LoginAttempt(coarse_probe()));
        assert_eq!(action, PermissionAction::RequestPermission);
        assert_eq!(machine.state(), PermissionState::GrantedApproximateOnly);

        machine.handle(PermissionSignal::Response(PermissionResponse::Granted));
        assert!(machine.is_granted());
    }

    #[test]
    fn test_silent_probe_detects_coarse_only() {
        let mut machine = PermissionStateMachine::default();
        machine.handle(PermissionSignal::Probe(PermissionProbe::denied()));
        machine.handle(PermissionSignal::Response(PermissionResponse::Denied));

        let action = machine.handle(PermissionSignal::Probe(coarse_probe()));
        assert_eq!(action, PermissionAction::None);
        assert_eq!(machine.state(), PermissionState::GrantedApproximateOnly);
    }

    #[test]
    fn test_approximate_answer_counts_as_denial() {
        let mut machine = PermissionStateMachine::default();
        machine.handle(PermissionSignal::Probe(PermissionProbe::denied()));

        machine.handle(PermissionSignal::Response(PermissionResponse::GrantedApproximate));
        assert_eq!(machine.state(), PermissionState::GrantedApproximateOnly);
        assert_eq!(machine.denials(), 1);

        let action = machine.handle(PermissionSignal::Response(PermissionResponse::Denied));
        assert_eq!(action, PermissionAction::NavigateToFinalScreen);
        assert!(machine.is_final());
    }

    #[test]
    fn test_granted_precise_is_terminal() {
        let mut machine = PermissionStateMachine::default();
        machine.handle(PermissionSignal::Probe(PermissionProbe::granted()));

        let action = machine.handle(PermissionSignal::Response(PermissionResponse::Denied));
        assert_eq!(action, PermissionAction::None);
        assert!(machine.is_granted());
        assert_eq!(machine.denials(), 0);
    }

    #[test]
    fn test_zero_threshold_is_clamped() {
        let machine = PermissionStateMachine::new(0);
        assert_eq!(machine.threshold(), 1);
    }
}
