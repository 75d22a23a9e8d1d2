//! Unit tests for the heart-rate merge.

use chrono::{DateTime, TimeZone, Utc};
use workout_gpx::export::merge::merge_heart_rate;
use workout_gpx::{HeartRateSample, LocationFix};

fn at(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(1_500_000_000 + secs, 0).unwrap()
}

fn locations(times: &[i64]) -> Vec<LocationFix> {
    times
        .iter()
        .map(|&t| LocationFix::new(51.5, -0.12, 11.0, at(t)))
        .collect()
}

fn heart_rate(points: &[(f64, i64)]) -> Vec<HeartRateSample> {
    points
        .iter()
        .map(|&(bpm, t)| HeartRateSample::new(bpm, at(t)))
        .collect()
}

#[test]
fn test_scenario_a_carry_forward() {
    let locations = locations(&[10, 20, 30]);
    let hr = heart_rate(&[(60.0, 5), (70.0, 15)]);

    let values: Vec<_> = merge_heart_rate(&locations, &hr)
        .map(|p| p.heart_rate)
        .collect();
    assert_eq!(values, vec![Some(60.0), Some(70.0), Some(70.0)]);
}

#[test]
fn test_scenario_b_equal_timestamp_not_attributed() {
    let locations = locations(&[10]);
    let hr = heart_rate(&[(80.0, 10)]);

    let values: Vec<_> = merge_heart_rate(&locations, &hr)
        .map(|p| p.heart_rate)
        .collect();
    assert_eq!(values, vec![None]);
}

#[test]
fn test_equal_timestamp_goes_to_first_strictly_later_location() {
    let locations = locations(&[10, 20]);
    let hr = heart_rate(&[(80.0, 10), (90.0, 20)]);

    let values: Vec<_> = merge_heart_rate(&locations, &hr)
        .map(|p| p.heart_rate)
        .collect();
    assert_eq!(values, vec![None, Some(80.0)]);
}

#[test]
fn test_dense_heart_rate_only_latest_per_location_survives() {
    let locations = locations(&[10, 20]);
    let hr: Vec<_> = (0..20).map(|i| HeartRateSample::new(100.0 + i as f64, at(i))).collect();

    let values: Vec<_> = merge_heart_rate(&locations, &hr)
        .map(|p| p.heart_rate)
        .collect();
    assert_eq!(values, vec![Some(109.0), Some(119.0)]);
}

#[test]
fn test_cursor_monotonic_over_long_series() {
    let location_times: Vec<i64> = (0..200).map(|i| i * 3).collect();
    let locations = locations(&location_times);
    let hr: Vec<_> = (0..70)
        .map(|i| HeartRateSample::new(90.0 + (i % 40) as f64, at(i * 9 + 1)))
        .collect();

    let mut merge = merge_heart_rate(&locations, &hr);
    let mut previous = 0;
    let mut emitted = 0;
    while let Some(point) = merge.next() {
        assert!(merge.cursor() >= previous);
        previous = merge.cursor();
        assert_eq!(point.location.timestamp, locations[emitted].timestamp);
        emitted += 1;
    }
    assert_eq!(emitted, locations.len());
}

#[test]
fn test_output_length_independent_of_heart_rate() {
    let locations = locations(&[1, 2, 3]);

    for hr in [
        vec![],
        heart_rate(&[(60.0, 0)]),
        heart_rate(&[(60.0, 100), (61.0, 200), (62.0, 300), (63.0, 400)]),
    ] {
        assert_eq!(merge_heart_rate(&locations, &hr).count(), 3);
    }
}
