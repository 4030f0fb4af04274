//! Integration tests for the classifier and monitor public API

use chrono::{Duration, TimeZone, Utc};
use gas_monitor_agent::core::WindowState;
use gas_monitor_agent::sensor::ReadingGenerator;
use gas_monitor_agent::{
    Assessment, Gas, GasMonitor, MonitorError, Reading, RiskLevel, SensorWindowClassifier,
    ThresholdSet,
};

fn so2_limits() -> ThresholdSet {
    ThresholdSet::new(300.0, 400.0, 700.0, 800.0)
}

#[test]
fn test_window_eviction_and_classification() {
    let classifier = SensorWindowClassifier::new(2, so2_limits()).unwrap();
    assert_eq!(classifier.classify(), Assessment::InsufficientData);
    assert_eq!(classifier.state(), WindowState::Empty);

    classifier.append(Reading::new(650.0));
    assert_eq!(classifier.classify(), Assessment::Risk(RiskLevel::Safe));

    classifier.append(Reading::new(750.0));
    assert_eq!(classifier.classify(), Assessment::Risk(RiskLevel::Warning));

    classifier.append(Reading::new(850.0));
    assert_eq!(classifier.classify(), Assessment::Risk(RiskLevel::Danger));

    let values: Vec<f64> = classifier.readings().iter().map(|r| r.value).collect();
    assert_eq!(values, vec![750.0, 850.0]);

    let summary = classifier.summary_statistics();
    assert_eq!(summary.count, 2);
    assert_eq!(summary.mean, Some(800.0));
    assert_eq!(summary.min, Some(750.0));
    assert_eq!(summary.max, Some(850.0));
    assert_eq!(summary.exceedances, 1);
}

#[test]
fn test_limits_are_exclusive() {
    let classifier = SensorWindowClassifier::new(5, so2_limits()).unwrap();

    classifier.append(Reading::new(700.0));
    assert_eq!(classifier.classify(), Assessment::Risk(RiskLevel::Safe));

    classifier.append(Reading::new(800.0));
    assert_eq!(classifier.classify(), Assessment::Risk(RiskLevel::Warning));

    // Below the lower limits is still Safe.
    classifier.append(Reading::new(10.0));
    assert_eq!(classifier.classify(), Assessment::Risk(RiskLevel::Safe));
}

#[test]
fn test_rejected_update_keeps_previous_limits() {
    let classifier = SensorWindowClassifier::new(5, so2_limits()).unwrap();
    classifier.append(Reading::new(750.0));

    let bad = ThresholdSet::new(300.0, 400.0, 900.0, 800.0);
    assert!(matches!(
        classifier.update_thresholds(bad),
        Err(MonitorError::InvalidThresholdOrdering { .. })
    ));
    assert_eq!(classifier.thresholds(), so2_limits());
    assert_eq!(classifier.classify(), Assessment::Risk(RiskLevel::Warning));

    let relaxed = ThresholdSet::new(300.0, 400.0, 760.0, 900.0);
    assert_eq!(classifier.update_thresholds(relaxed), Ok(relaxed));
    assert_eq!(classifier.classify(), Assessment::Risk(RiskLevel::Safe));
}

#[test]
fn test_windowed_mean_ignores_old_readings() {
    let classifier = SensorWindowClassifier::new(10, so2_limits()).unwrap();
    let start = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();

    classifier.append(Reading::at(start, 2000.0));
    classifier.append(Reading::at(start + Duration::hours(30), 500.0).with_zone("Zone A"));
    classifier.append(Reading::at(start + Duration::hours(31), 900.0).with_zone("Zone B"));

    let windowed = classifier.classify_windowed(Duration::hours(24));
    assert_eq!(windowed.count, 2);
    assert_eq!(windowed.mean, Some(700.0));
    assert_eq!(windowed.assessment, Assessment::Risk(RiskLevel::Safe));
    assert_eq!(windowed.worst_zone.as_deref(), Some("Zone B"));

    // The point rule still looks only at the latest reading.
    assert_eq!(classifier.classify(), Assessment::Risk(RiskLevel::Danger));
}

#[test]
fn test_monitor_overall_risk() {
    let monitor = GasMonitor::new(
        50,
        Gas::ALL.iter().map(|&gas| (gas, gas.default_thresholds())),
    )
    .unwrap();
    assert_eq!(monitor.overall(), Assessment::InsufficientData);

    monitor.record(Gas::Co2, Reading::new(1200.0)).unwrap();
    assert_eq!(monitor.overall(), Assessment::Risk(RiskLevel::Warning));

    monitor.record(Gas::Co, Reading::new(60.0)).unwrap();
    assert_eq!(monitor.overall(), Assessment::Risk(RiskLevel::Danger));

    let snapshot = monitor.snapshot();
    assert_eq!(snapshot.gases.len(), Gas::ALL.len());
    let o2 = snapshot.gases.iter().find(|s| s.gas == Gas::O2).unwrap();
    assert_eq!(o2.display, "N/A");
}

#[test]
fn test_seeded_history_fills_window() {
    let classifier = SensorWindowClassifier::new(100, Gas::So2.default_thresholds()).unwrap();
    let mut generator = ReadingGenerator::new(Some(7));
    classifier.extend(generator.history(Gas::So2, 150, Duration::minutes(1)));

    assert_eq!(classifier.len(), 100);
    let summary = classifier.summary_statistics();
    let mean = summary.mean.unwrap();
    assert!((400.0..=650.0).contains(&mean), "unexpected mean {mean}");
    assert!(!classifier.classify().is_insufficient());
}
