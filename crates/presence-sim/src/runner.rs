//! Scenario runner
//!
//! Steps are queued by a producer task and consumed one at a time by the
//! session loop. After every step the advisories the session dispatched are
//! drained and recorded.

use presence_core::{
    AuthResult, GeoPoint, LocationFix, OrientationAngles, PermissionAction, PermissionState,
    PresenceConfig, PresenceSession, SensorKind,
};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::device::SimDevice;
use crate::error::Result;
use crate::scenario::{Expectation, Scenario, Step};
use crate::sensors;

/// One login step and its outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoginRecord {
    /// Index of the step in the scenario
    pub step: usize,
    pub password: String,
    pub result: AuthResult,
    pub expected: Option<Expectation>,
}

impl LoginRecord {
    /// Unchecked logins always count as met
    pub fn met(&self) -> bool {
        self.expected
            .map_or(true, |expected| expected.matches(&self.result))
    }
}

/// Summary of a scenario run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub scenario: String,
    pub steps: usize,
    pub logins: Vec<LoginRecord>,
    pub advisories: Vec<PermissionAction>,
    pub permission_requests: usize,
    pub final_state: PermissionState,
}

impl RunReport {
    /// Every login expectation was met
    pub fn passed(&self) -> bool {
        self.logins.iter().all(LoginRecord::met)
    }

    pub fn mismatches(&self) -> impl Iterator<Item = &LoginRecord> {
        self.logins.iter().filter(|login| !login.met())
    }
}

/// Play a scenario against a fresh session
pub async fn run_scenario(scenario: Scenario, config: &PresenceConfig) -> Result<RunReport> {
    scenario.validate()?;

    let (advisory_tx, mut advisory_rx) = mpsc::unbounded_channel();
    let device = SimDevice::new(&scenario.device, advisory_tx);
    let mut session = PresenceSession::with_config(device, config);

    let (step_tx, mut step_rx) = mpsc::unbounded_channel::<(usize, Step)>();
    let steps = scenario.steps;
    let producer = tokio::spawn(async move {
        for (index, step) in steps.into_iter().enumerate() {
            if step_tx.send((index, step)).is_err() {
                break;
            }
        }
    });

    info!(scenario = %scenario.name, "running scenario");

    let mut steps = 0;
    let mut logins = Vec::new();
    let mut advisories = Vec::new();

    while let Some((index, step)) = step_rx.recv().await {
        debug!(index, ?step, "step");
        if let Some(record) = apply_step(&mut session, index, step) {
            logins.push(record);
        }
        steps += 1;

        while let Ok(action) = advisory_rx.try_recv() {
            info!(index, ?action, "advisory");
            advisories.push(action);
        }
    }

    producer.await?;

    let report = RunReport {
        scenario: scenario.name,
        steps,
        logins,
        advisories,
        permission_requests: session.device().requests().len(),
        final_state: session.permission_state(),
    };

    info!(
        steps = report.steps,
        logins = report.logins.len(),
        final_state = report.final_state.as_str(),
        passed = report.passed(),
        "scenario finished"
    );

    Ok(report)
}

fn apply_step(
    session: &mut PresenceSession<SimDevice>,
    index: usize,
    step: Step,
) -> Option<LoginRecord> {
    match step {
        Step::Resume => {
            session.resume();
        }
        Step::Pause => session.pause(),
        Step::PermissionResult { response } => {
            session.device_mut().apply_response(response);
            session.on_permission_result(response);
        }
        Step::RequestPermission => session.request_permission(),
        Step::OpenAppSettings => {
            session.open_app_settings();
        }
        Step::Sensor { sensor, values } => session.on_sensor_event(sensor, values),
        Step::Orientation {
            azimuth,
            pitch,
            roll,
        } => {
            let (accel, field) = sensors::synthesize(&OrientationAngles::new(azimuth, pitch, roll));
            session.on_sensor_event(SensorKind::Accelerometer, accel);
            session.on_sensor_event(SensorKind::Magnetometer, field);
        }
        Step::Location {
            latitude,
            longitude,
            accuracy,
        } => {
            let fix = LocationFix {
                point: GeoPoint::new(latitude, longitude),
                accuracy,
            };
            session.on_location_update(fix);
        }
        Step::SetStatus(change) => session.device_mut().apply_status(&change),
        Step::Login { password, expect } => {
            let result = session.attempt(&password);
            let record = LoginRecord {
                step: index,
                password,
                result,
                expected: expect,
            };

            if record.met() {
                info!(index, ?result, "login");
            } else {
                warn!(index, ?result, ?expect, "login outcome differs from expectation");
            }
            return Some(record);
        }
    }
    None
}
