//! Configuration file effects on a running service

mod common;

use std::io::Write;

use common::{azimuth_options, north_east, session, station, TestHarness};
use rotation_common::config::{RotationConfig, CONFIG_ENV_VAR};
use rotation_common::Error;
use serial_test::serial;

const CONFIG: &str = r#"
rotation_replacement_azimuth_tolerance_deg = 2.0
valid_phases = ["P", "Lg"]

[logging]
level = "rotation_engine=debug"

[default_template]
lead_duration_secs = 10.0
duration_secs = 120.0
location_tolerance_km = 0.5
orientation_angle_tolerance_deg = 5.0
sample_rate_tolerance_hz = 0.5
"#;

fn load_from_env(dir: &tempfile::TempDir) -> RotationConfig {
    let path = dir.path().join("config.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(CONFIG.as_bytes()).unwrap();

    std::env::set_var(CONFIG_ENV_VAR, &path);
    let config = RotationConfig::load(None);
    std::env::remove_var(CONFIG_ENV_VAR);
    config.unwrap()
}

#[test]
#[serial]
fn test_config_is_found_through_environment() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_from_env(&dir);

    assert_eq!(config.rotation_replacement_azimuth_tolerance_deg, Some(2.0));
    assert_eq!(config.valid_phases, vec!["P".to_string(), "Lg".to_string()]);
    assert_eq!(config.logging.level, "rotation_engine=debug");
    assert_eq!(config.default_template.unwrap().duration_secs, 120.0);
}

/// **Given:** a station with no rotation templates and a configured default template
/// **When:** it is rotated for a phase the templates never mention
/// **Then:** the default template's tolerances let the rotation proceed
#[tokio::test]
#[serial]
async fn test_default_template_fills_missing_templates() {
    let dir = tempfile::tempdir().unwrap();
    let (n, e) = north_east("ASAR", "AS01");
    let mut harness = TestHarness::with_stations(vec![station("ASAR", vec![n, e])]);
    harness.templates.clear();
    harness.config = load_from_env(&dir);
    let running = harness.start();

    let results = running
        .service
        .rotate_2d_for_stations(&session(), &["ASAR".to_string()], "Lg", &azimuth_options(70.0))
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.phase == "Lg"));
    assert_eq!(running.templates.fetch_count(), 1);
}

/// **Given:** a phase list that leaves out S
/// **When:** a pair is rotated for S
/// **Then:** the phase is rejected before the kernel is called
#[tokio::test]
#[serial]
async fn test_configured_phase_list_is_enforced() {
    let dir = tempfile::tempdir().unwrap();
    let (n, e) = north_east("ASAR", "AS01");
    let mut harness = TestHarness::with_stations(vec![station("ASAR", vec![n.clone(), e.clone()])]);
    harness.config = load_from_env(&dir);
    let running = harness.start();

    let err = running
        .service
        .rotate_2d_for_channels(&session(), &[n, e], "S", &azimuth_options(70.0))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(running.kernel.call_count(), 0);
}
