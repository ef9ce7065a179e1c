//! Scenario files played through the simulator
//!
//! Every file under `demos/` must load, validate and meet all of its login
//! expectations.

use std::io::Write;
use std::path::PathBuf;

use presence_core::{
    AuthResult, FailureReason, PermissionAction, PermissionState, PresenceConfig,
};
use presence_sim::{run_scenario, Expectation, Scenario, SimError, Step};
use rstest::rstest;

fn demos_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../demos")
}

fn demo_config() -> PresenceConfig {
    PresenceConfig::load(&demos_dir().join("presence.toml")).unwrap()
}

#[rstest]
#[case::reference("reference.toml", PermissionState::GrantedPrecise)]
#[case::wrong_password("wrong_password.toml", PermissionState::GrantedPrecise)]
#[case::denied("denied.toml", PermissionState::DeniedFinal)]
#[case::approximate("approximate.toml", PermissionState::GrantedPrecise)]
#[tokio::test]
async fn test_demo_scenarios_pass(#[case] file: &str, #[case] final_state: PermissionState) {
    let scenario = Scenario::load(&demos_dir().join(file)).unwrap();
    let expected = scenario.expectations();
    assert!(expected > 0, "{file} checks nothing");

    let report = run_scenario(scenario, &demo_config()).await.unwrap();

    assert!(
        report.passed(),
        "{file}: {:?}",
        report.mismatches().collect::<Vec<_>>()
    );
    assert_eq!(report.final_state, final_state);
}

#[test]
fn test_demo_config_matches_defaults() {
    assert_eq!(demo_config(), PresenceConfig::default());
}

#[tokio::test]
async fn test_reference_report() {
    let scenario = Scenario::load(&demos_dir().join("reference.toml")).unwrap();
    let report = run_scenario(scenario, &PresenceConfig::default())
        .await
        .unwrap();

    assert_eq!(report.scenario, "reference");
    assert_eq!(report.logins.len(), 1);
    assert_eq!(report.logins[0].result, AuthResult::Success);
    assert_eq!(report.advisories, vec![PermissionAction::RequestPermission]);

    let json = report_json(&report);
    assert!(json.contains("\"outcome\": \"success\""));
    assert!(json.contains("\"final_state\": \"granted_precise\""));
}

#[tokio::test]
async fn test_denied_report_advisories() {
    let scenario = Scenario::load(&demos_dir().join("denied.toml")).unwrap();
    let report = run_scenario(scenario, &PresenceConfig::default())
        .await
        .unwrap();

    assert_eq!(report.permission_requests, 2);
    assert_eq!(
        report.advisories.last(),
        Some(&PermissionAction::NavigateToFinalScreen)
    );
    assert!(report
        .logins
        .iter()
        .all(|login| login.result == AuthResult::PermissionRequired(PermissionState::DeniedFinal)
            || login.result == AuthResult::PermissionRequired(PermissionState::DeniedRetryable)));
}

#[tokio::test]
async fn test_config_changes_outcome() {
    // Reference scenario with a different prefix fails on the password
    let scenario = Scenario::load(&demos_dir().join("reference.toml")).unwrap();
    let config = PresenceConfig::from_toml_str("password_prefix = \"other\"").unwrap();

    let report = run_scenario(scenario, &config).await.unwrap();

    assert!(!report.passed());
    assert_eq!(
        report.logins[0].result,
        AuthResult::Failure(FailureReason::BadPassword)
    );
}

#[tokio::test]
async fn test_scenario_from_temp_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        name = "far away"

        [device]
        fine = true
        last_known = {{ latitude = 48.8584, longitude = 2.2945 }}

        [[steps]]
        action = "resume"

        [[steps]]
        action = "orientation"

        [[steps]]
        action = "login"
        password = "10s20w30q9"
        expect = "not_near_target"
        "#
    )
    .unwrap();

    let scenario = Scenario::load(file.path()).unwrap();
    assert_eq!(scenario.steps[0], Step::Resume);

    let report = run_scenario(scenario, &PresenceConfig::default())
        .await
        .unwrap();
    assert!(report.passed());
    assert_eq!(report.logins[0].expected, Some(Expectation::NotNearTarget));
    // Permission was already granted, nothing to advise
    assert!(report.advisories.is_empty());
    assert_eq!(report.permission_requests, 0);
}

#[test]
fn test_invalid_scenario_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[[steps]]\naction = \"orientation\"\npitch = 95.0").unwrap();

    let result = Scenario::load(file.path());
    assert!(matches!(result, Err(SimError::InvalidStep { index: 0, .. })));
}

fn report_json(report: &presence_sim::RunReport) -> String {
    serde_json::to_string_pretty(report).unwrap()
}
