//! RotationService entry point tests
//!
//! Covers the three entry points, the open-stage requirement and per-unit
//! failure isolation.

mod common;

use common::{
    azimuth_options, north_east, session, signal_detection, station, TestHarness,
};
use rotation_common::events::RotationEvent;
use rotation_common::model::{ChannelOrientationType, VersionReference};
use rotation_common::Error;
use rotation_engine::collaborators::memory::PassThroughKernel;
use rotation_engine::RotationOptions;

/// **Given:** a session without an open stage
/// **When:** any entry point is called
/// **Then:** it fails before doing any work
#[tokio::test]
async fn test_rotation_requires_open_stage() {
    let (n, e) = north_east("ASAR", "AS01");
    let running = TestHarness::with_stations(vec![station("ASAR", vec![n.clone(), e.clone()])]).start();
    let mut closed = session();
    closed.stage_id = None;

    let by_channels = running
        .service
        .rotate_2d_for_channels(&closed, &[n, e], "P", &azimuth_options(15.0))
        .await
        .unwrap_err();
    let by_stations = running
        .service
        .rotate_2d_for_stations(&closed, &["ASAR".to_string()], "P", &RotationOptions::default())
        .await
        .unwrap_err();

    for err in [by_channels, by_stations] {
        assert_eq!(
            err.to_string(),
            "Validation error: No stage ID found, open interval before rotating"
        );
    }
    assert_eq!(running.kernel.call_count(), 0);
}

/// **Given:** a pair and a phase that is not configured
/// **When:** the pair is rotated
/// **Then:** the phase is rejected
#[tokio::test]
async fn test_unknown_phase_is_rejected() {
    let (n, e) = north_east("ASAR", "AS01");
    let mut harness = TestHarness::with_stations(vec![station("ASAR", vec![n.clone(), e.clone()])]);
    harness.templates.push(common::template("ASAR", "Q"));
    let running = harness.start();

    let err = running
        .service
        .rotate_2d_for_channels(&session(), &[n, e], "Q", &azimuth_options(15.0))
        .await
        .unwrap_err();

    assert_eq!(err.to_string(), "Validation error: Rotation error: Invalid phase Q.");
}

/// **Given:** channels from two different stations
/// **When:** they are rotated together
/// **Then:** the request is rejected as a validation error
#[tokio::test]
async fn test_cross_station_pair_is_rejected() {
    let (n, _) = north_east("ASAR", "AS01");
    let (_, e) = north_east("PDAR", "PD01");
    let running = TestHarness::with_stations(vec![
        station("ASAR", vec![n.clone()]),
        station("PDAR", vec![e.clone()]),
    ])
    .start();

    let err = running
        .service
        .rotate_2d_for_channels(&session(), &[n, e], "P", &azimuth_options(15.0))
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Validation(_)));
}

/// **Given:** a saved detection with an azimuth measurement at a station with one pair
/// **When:** rotation is requested for the detection
/// **Then:** the pair is rotated around the arrival toward the measured azimuth
#[tokio::test]
async fn test_signal_detection_rotation_uses_arrival_and_azimuth() {
    let (n, e) = north_east("ASAR", "AS01");
    let mut harness = TestHarness::with_stations(vec![station("ASAR", vec![n.clone(), e.clone()])]);
    let sd = signal_detection(
        "sd-1",
        "ASAR",
        100.0,
        "P",
        &VersionReference::new("ASAR.AS01.SHZ", None),
        None,
        Some(33.0),
    );
    harness.state.signal_detections.insert(sd.id.clone(), sd);
    let running = harness.start();

    let results = running
        .service
        .rotate_2d_for_signal_detections(
            &session(),
            &["sd-1".to_string(), "sd-unknown".to_string()],
            &RotationOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    for result in &results {
        assert_eq!(result.rotated_channel.steering_back_azimuth(), Some(33.0));
        let descriptor = result.rotated_ui_channel_segment.descriptor();
        // template lead 5 s, duration 60 s
        assert_eq!((descriptor.start_time, descriptor.end_time), (95.0, 160.0));
    }
    let state = running.service.store().snapshot().await;
    assert_eq!(state.channels.beamed.len(), 2);
}

/// **Given:** a detection whose phase has no rotation template
/// **When:** rotation is requested for it
/// **Then:** the detection contributes nothing and the failure is published
#[tokio::test]
async fn test_signal_detection_failure_is_isolated() {
    let (n, e) = north_east("ASAR", "AS01");
    let mut harness = TestHarness::with_stations(vec![station("ASAR", vec![n, e])]);
    for (id, phase) in [("sd-p", "P"), ("sd-s", "S")] {
        let sd = signal_detection(
            id,
            "ASAR",
            100.0,
            phase,
            &VersionReference::new("ASAR.AS01.SHZ", None),
            None,
            Some(33.0),
        );
        harness.state.signal_detections.insert(sd.id.clone(), sd);
    }
    let running = harness.start();
    let mut events = running.events.subscribe();

    let results = running
        .service
        .rotate_2d_for_signal_detections(
            &session(),
            &["sd-p".to_string(), "sd-s".to_string()],
            &RotationOptions::default(),
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results.iter().all(|r| r.phase == "P"));
    let mut errors = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let RotationEvent::Error { message, .. } = event {
            errors.push(message);
        }
    }
    assert_eq!(
        errors,
        vec!["Data unavailable: No rotation template available to rotate ASAR for phase S".to_string()]
    );
}

/// **Given:** one station with two channel groups and one unknown station
/// **When:** rotation is requested for both stations
/// **Then:** every pair of the known station is rotated and the unknown one is settled as a failure
#[tokio::test]
async fn test_station_rotation_settles_failures() {
    let (n1, e1) = north_east("ASAR", "AS01");
    let (n2, e2) = north_east("ASAR", "AS02");
    let running = TestHarness::with_stations(vec![station("ASAR", vec![n1, e1, n2, e2])]).start();
    let mut events = running.events.subscribe();

    let results = running
        .service
        .rotate_2d_for_stations(
            &session(),
            &["ASAR".to_string(), "NOPE".to_string()],
            "P",
            &azimuth_options(200.0),
        )
        .await
        .unwrap();

    assert_eq!(results.len(), 4);
    assert_eq!(running.kernel.call_count(), 2);
    let radial = results
        .iter()
        .filter(|r| r.rotated_channel.channel_orientation_type == ChannelOrientationType::Radial)
        .count();
    assert_eq!(radial, 2);

    let mut saw_error = false;
    while let Ok(event) = events.try_recv() {
        if let RotationEvent::Error { message, .. } = event {
            assert!(message.contains("Cannot find station NOPE"), "{}", message);
            saw_error = true;
        }
    }
    assert!(saw_error);

    let state = running.service.store().snapshot().await;
    assert_eq!(state.channels.beamed.len(), 4);
    assert_eq!(state.ui_channel_segments.len(), 4);
}

/// **Given:** a kernel that always fails
/// **When:** a station is rotated
/// **Then:** no results are produced but the (empty) transaction still commits
#[tokio::test]
async fn test_kernel_failure_produces_no_results() {
    let (n, e) = north_east("ASAR", "AS01");
    let running = TestHarness::with_stations(vec![station("ASAR", vec![n, e])])
        .start_with_kernel(PassThroughKernel::failing());

    let results = running
        .service
        .rotate_2d_for_stations(&session(), &["ASAR".to_string()], "P", &azimuth_options(10.0))
        .await
        .unwrap();

    assert!(results.is_empty());
    assert_eq!(running.kernel.call_count(), 1);
    assert!(running.service.store().snapshot().await.channels.beamed.is_empty());
    assert_eq!(running.templates.fetch_count(), 1);
}

/// Station ASAR with two channel groups, the AS02 north channel without waveform data
fn harness_with_one_broken_group() -> TestHarness {
    let (n1, e1) = north_east("ASAR", "AS01");
    let (n2, e2) = north_east("ASAR", "AS02");
    let mut harness = TestHarness::with_stations(vec![station("ASAR", vec![n1, e1, n2, e2])]);
    harness
        .segments
        .retain(|s| s.channel_segment_descriptor.channel.name != "ASAR.AS02.SHN");
    harness
}

fn error_messages(events: &mut tokio::sync::broadcast::Receiver<RotationEvent>) -> Vec<String> {
    let mut errors = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let RotationEvent::Error { message, .. } = event {
            errors.push(message);
        }
    }
    errors
}

/// **Given:** a detection at a station where one of two channel groups has no waveform data
/// **When:** rotation is requested for the detection
/// **Then:** the intact group is still rotated and stored, and the broken one is published
#[tokio::test]
async fn test_signal_detection_keeps_sibling_pairs() {
    let mut harness = harness_with_one_broken_group();
    let sd = signal_detection(
        "sd-1",
        "ASAR",
        100.0,
        "P",
        &VersionReference::new("ASAR.AS01.SHZ", None),
        None,
        Some(33.0),
    );
    harness.state.signal_detections.insert(sd.id.clone(), sd);
    let running = harness.start();
    let mut events = running.events.subscribe();

    let results = running
        .service
        .rotate_2d_for_signal_detections(&session(), &["sd-1".to_string()], &RotationOptions::default())
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results
        .iter()
        .all(|r| r.rotated_channel.name.starts_with("ASAR.AS01.")));
    assert_eq!(running.kernel.call_count(), 1);
    assert_eq!(
        error_messages(&mut events),
        vec!["Data unavailable: Cannot find channel segment for ASAR.AS02.SHN: missing waveform data".to_string()]
    );
    let state = running.service.store().snapshot().await;
    assert_eq!(state.channels.beamed.len(), 2);
}

/// **Given:** a station where one of two channel groups has no waveform data
/// **When:** the station is rotated
/// **Then:** the intact group's results survive the failed pair
#[tokio::test]
async fn test_station_rotation_keeps_sibling_pairs() {
    let running = harness_with_one_broken_group().start();
    let mut events = running.events.subscribe();

    let results = running
        .service
        .rotate_2d_for_stations(&session(), &["ASAR".to_string()], "P", &azimuth_options(200.0))
        .await
        .unwrap();

    assert_eq!(results.len(), 2);
    assert!(results
        .iter()
        .all(|r| r.rotated_channel.name.starts_with("ASAR.AS01.")));
    let errors = error_messages(&mut events);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("ASAR.AS02.SHN"), "{}", errors[0]);
}
