//! Configuration loading, saving and validation

use std::path::PathBuf;
use thermal_head_tracker::{
    config::{Config, EXAMPLE_CONFIG},
    error::Error,
    frame::TemperatureUnit,
    roam::RoamMode,
    servo::Handedness,
};

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("thermal-head-tracker-{}-{}", std::process::id(), name))
}

/// Saving and loading a configuration preserves every section
#[test]
fn test_config_file_roundtrip() {
    let mut config = Config::default();
    config.servo.handedness = Handedness::HighToLowIsClockwise;
    config.servo.enabled = false;
    config.roam.mode = RoamMode::Random;
    config.roam.seed = Some(42);
    config.sensor.ambient_margin = Some(8.0);
    config.estimator.two_hit_single_column = true;

    let path = temp_path("roundtrip.yaml");
    config.to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(loaded, config);
    assert!(loaded.validate().is_ok());
}

/// The shipped example parses and validates
#[test]
fn test_example_config_is_valid() {
    let config: Config = serde_yaml::from_str(EXAMPLE_CONFIG).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.sensor.unit, TemperatureUnit::Fahrenheit);
    assert_eq!(config.tracker.person_hit_count, 4);
}

/// Celsius deployments configure thresholds in Celsius
#[test]
fn test_celsius_sections() {
    let yaml = "sensor:\n  unit: celsius\n  person_threshold: 26.0\n  burn_threshold: 38.0\n";
    let config: Config = serde_yaml::from_str(yaml).unwrap();
    assert_eq!(config.sensor.unit, TemperatureUnit::Celsius);
    assert!(config.validate().is_ok());
}

/// Missing files surface as I/O errors
#[test]
fn test_missing_file() {
    match Config::from_file(temp_path("does-not-exist.yaml")) {
        Err(Error::IoError(_)) => {}
        other => panic!("Expected IoError, got {other:?}"),
    }
}

/// Malformed YAML surfaces as a configuration error
#[test]
fn test_malformed_file() {
    let path = temp_path("malformed.yaml");
    std::fs::write(&path, "servo: [not, a, mapping").unwrap();
    let result = Config::from_file(&path);
    std::fs::remove_file(&path).ok();

    match result {
        Err(Error::ConfigError(msg)) => assert!(msg.contains("parse")),
        other => panic!("Expected ConfigError, got {other:?}"),
    }
}

/// Validation catches inconsistent settings
#[test]
fn test_validation_failures() {
    let cases: [(&str, fn(&mut Config)); 10] = [
        ("thresholds", |c| c.sensor.burn_threshold = c.sensor.person_threshold),
        ("limits", |c| c.servo.high_us = c.servo.low_us),
        ("center", |c| c.servo.center_us = 2400),
        ("granularity", |c| c.servo.low_us = 605),
        ("minimum error", |c| c.servo.minimum_error = -1.0),
        ("integrator", |c| c.servo.pid.integrator_min = 600.0),
        ("roam max", |c| c.roam.roam_max = 0),
        ("roam step", |c| c.roam.granularity_us = 0),
        ("wait", |c| c.timing.measurement_wait_secs = f64::NAN),
        ("settle", |c| c.timing.settle_factor = -0.5),
    ];

    for (name, mutate) in cases {
        let mut config = Config::default();
        mutate(&mut config);
        assert!(
            matches!(config.validate(), Err(Error::ConfigError(_))),
            "{name} should be rejected"
        );
    }
}
