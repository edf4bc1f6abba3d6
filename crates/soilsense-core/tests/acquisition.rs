//! End-to-end acquisition tests against the mock transport.
//!
//! Every test runs on a paused clock, so the 6 s notification budget
//! elapses instantly and deterministically.

use std::time::Duration;

use soilsense_core::mock::{MockStep, MockTransport};
use soilsense_core::{
    AcquisitionConfig, Error, FallbackPolicy, RecommendationContext, RuleBook, SnapshotClient,
    SnapshotSource, TransportStage,
};
use uuid::Uuid;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("soilsense_core=debug")
        .with_test_writer()
        .try_init();
}

fn client(transport: MockTransport) -> SnapshotClient<MockTransport> {
    init_tracing();
    SnapshotClient::new(transport, AcquisitionConfig::default())
}

#[tokio::test(start_paused = true)]
async fn notification_before_timeout_skips_fallback_read() {
    let transport = MockTransport::builder()
        .notify(Duration::from_millis(150), vec![42, 17])
        .read_payload(vec![99, 99])
        .build();
    let client = client(transport);

    let snapshot = client.acquire_snapshot().await.unwrap();

    assert_eq!(snapshot.source, SnapshotSource::Notification);
    assert_eq!(snapshot.reading.moisture, 42.0);
    assert_eq!(snapshot.reading.tds, 17.0);
    assert_eq!(snapshot.reading.nitrogen, 17.0);
    assert_eq!(snapshot.reading.phosphorus, 17.0);
    assert_eq!(snapshot.reading.potassium, 17.0);
    assert_eq!(snapshot.reading.ph, 0.0);
    assert_eq!(snapshot.device_name.as_deref(), Some("ESP32-SoilSensor"));

    let mock = client.transport();
    assert_eq!(mock.read_count(), 0);
    assert_eq!(mock.unsubscribe_count(), 1);
    assert_eq!(mock.disconnect_count(), 1);
    assert!(!mock.is_connected());
}

#[tokio::test(start_paused = true)]
async fn silent_peripheral_triggers_exactly_one_fallback_read() {
    let transport = MockTransport::builder().read_payload(vec![30, 60]).build();
    let client = client(transport);

    let started = tokio::time::Instant::now();
    let snapshot = client.acquire_snapshot().await.unwrap();

    assert!(started.elapsed() >= Duration::from_millis(6000));
    assert_eq!(snapshot.source, SnapshotSource::FallbackRead);
    assert_eq!(snapshot.reading.moisture, 30.0);
    assert_eq!(snapshot.reading.potassium, 60.0);

    let mock = client.transport();
    assert_eq!(mock.read_count(), 1);
    assert_eq!(mock.disconnect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn late_notification_has_no_effect() {
    let transport = MockTransport::builder()
        .notify(Duration::from_millis(7000), vec![1, 1])
        .read_payload(vec![64, 32])
        .build();
    let client = client(transport);

    let snapshot = client.acquire_snapshot().await.unwrap();
    assert_eq!(snapshot.source, SnapshotSource::FallbackRead);
    assert_eq!(snapshot.reading.moisture, 64.0);

    // Let the late notification's deadline pass: nothing may change.
    tokio::time::sleep(Duration::from_secs(5)).await;
    let mock = client.transport();
    assert_eq!(mock.read_count(), 1);
    assert_eq!(mock.disconnect_count(), 1);
    assert_eq!(mock.unsubscribe_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn simultaneous_notification_and_timeout_resolve_once() {
    let transport = MockTransport::builder()
        .notify(Duration::from_millis(6000), vec![10, 20])
        .read_payload(vec![10, 20])
        .build();
    let client = client(transport);

    let snapshot = client.acquire_snapshot().await.unwrap();

    let mock = client.transport();
    match snapshot.source {
        SnapshotSource::Notification => assert_eq!(mock.read_count(), 0),
        SnapshotSource::FallbackRead => assert_eq!(mock.read_count(), 1),
    }
    assert_eq!(snapshot.reading.moisture, 10.0);
    assert_eq!(mock.disconnect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn fail_on_timeout_policy_skips_read() {
    init_tracing();
    let transport = MockTransport::builder().build();
    let config = AcquisitionConfig::default()
        .notify_timeout(Duration::from_millis(500))
        .fallback(FallbackPolicy::FailOnTimeout);
    let client = SnapshotClient::new(transport, config);

    let err = client.acquire().await.unwrap_err();

    match err {
        Error::AcquisitionTimeout { duration, cause } => {
            assert_eq!(duration, Duration::from_millis(500));
            assert!(cause.is_none());
        }
        other => panic!("expected AcquisitionTimeout, got {other:?}"),
    }
    assert_eq!(client.transport().read_count(), 0);
    assert_eq!(client.transport().disconnect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn failed_fallback_read_becomes_timeout_with_cause() {
    let transport = MockTransport::builder().fail_at(MockStep::Read).build();
    let client = client(transport);

    let err = client.acquire().await.unwrap_err();

    match &err {
        Error::AcquisitionTimeout {
            cause: Some(cause), ..
        } => assert_eq!(cause.stage(), Some(TransportStage::Read)),
        other => panic!("expected AcquisitionTimeout with cause, got {other:?}"),
    }
    assert!(err.is_retryable());
    assert_eq!(client.transport().read_count(), 1);
    assert_eq!(client.transport().disconnect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn malformed_notification_fails_after_teardown() {
    let transport = MockTransport::builder()
        .notify(Duration::from_millis(10), vec![1, 2, 3])
        .build();
    let client = client(transport);

    let err = client.acquire().await.unwrap_err();

    assert!(matches!(
        err,
        Error::InvalidPayload {
            expected: 2,
            actual: 3
        }
    ));
    assert!(!err.is_retryable());
    assert_eq!(client.transport().read_count(), 0);
    assert_eq!(client.transport().disconnect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn malformed_fallback_payload_is_invalid() {
    let transport = MockTransport::builder().read_payload(vec![7]).build();
    let client = client(transport);

    let err = client.acquire().await.unwrap_err();

    assert!(matches!(
        err,
        Error::InvalidPayload {
            expected: 2,
            actual: 1
        }
    ));
    assert_eq!(client.transport().disconnect_count(), 1);
}

#[tokio::test]
async fn unsupported_host_fails_before_picker() {
    let transport = MockTransport::builder().unsupported().build();
    let client = client(transport);

    let err = client.acquire().await.unwrap_err();

    assert!(matches!(err, Error::PlatformUnsupported));
    assert_eq!(client.transport().request_count(), 0);
    assert_eq!(client.transport().connect_count(), 0);
    assert_eq!(client.transport().disconnect_count(), 0);
}

#[tokio::test]
async fn dismissed_picker_is_device_not_selected() {
    let transport = MockTransport::builder().picker_dismissed().build();
    let client = client(transport);

    let err = client.acquire().await.unwrap_err();

    assert!(matches!(err, Error::DeviceNotSelected { .. }));
    assert!(err.is_retryable());
    assert_eq!(client.transport().connect_count(), 0);
    assert_eq!(client.transport().disconnect_count(), 0);
}

#[tokio::test]
async fn name_filter_comes_from_config() {
    init_tracing();
    let transport = MockTransport::builder()
        .name("Bench Probe")
        .notify(Duration::ZERO, vec![5, 6])
        .build();

    let default_client = SnapshotClient::new(transport.clone(), AcquisitionConfig::default());
    assert!(matches!(
        default_client.acquire().await,
        Err(Error::DeviceNotSelected { .. })
    ));

    let custom = SnapshotClient::new(
        transport,
        AcquisitionConfig::default().device_name("Bench Probe"),
    );
    let reading = custom.acquire().await.unwrap();
    assert_eq!(reading.moisture, 5.0);
}

#[tokio::test]
async fn connect_failure_skips_disconnect() {
    let transport = MockTransport::builder().fail_at(MockStep::Connect).build();
    let client = client(transport);

    let err = client.acquire().await.unwrap_err();

    assert_eq!(err.stage(), Some(TransportStage::Connect));
    assert_eq!(client.transport().disconnect_count(), 0);
    assert_eq!(client.transport().unsubscribe_count(), 0);
}

#[tokio::test]
async fn discovery_failure_disconnects() {
    let transport = MockTransport::builder().fail_at(MockStep::Discover).build();
    let client = client(transport);

    let err = client.acquire().await.unwrap_err();

    assert_eq!(err.stage(), Some(TransportStage::Discover));
    assert_eq!(client.transport().subscribe_count(), 0);
    assert_eq!(client.transport().unsubscribe_count(), 0);
    assert_eq!(client.transport().disconnect_count(), 1);
}

#[tokio::test]
async fn mismatched_characteristic_fails_at_discovery() {
    let transport = MockTransport::builder()
        .gatt(soilsense_core::uuid::SOIL_SERVICE, Uuid::from_u128(0xdead))
        .build();
    let client = client(transport);

    let err = client.acquire().await.unwrap_err();

    match err {
        Error::Transport { stage, source } => {
            assert_eq!(stage, TransportStage::Discover);
            assert!(matches!(*source, Error::CharacteristicNotFound { .. }));
        }
        other => panic!("expected Transport error, got {other:?}"),
    }
    assert_eq!(client.transport().disconnect_count(), 1);
}

#[tokio::test]
async fn subscribe_failure_disconnects_without_unsubscribe() {
    let transport = MockTransport::builder().fail_at(MockStep::Subscribe).build();
    let client = client(transport);

    let err = client.acquire().await.unwrap_err();

    assert_eq!(err.stage(), Some(TransportStage::Subscribe));
    assert_eq!(client.transport().unsubscribe_count(), 0);
    assert_eq!(client.transport().disconnect_count(), 1);
}

#[tokio::test]
async fn scan_failure_is_staged_not_raw() {
    let transport = MockTransport::builder().fail_at(MockStep::Scan).build();
    let client = client(transport);

    let err = client.acquire().await.unwrap_err();

    match &err {
        Error::Transport { stage, source } => {
            assert_eq!(*stage, TransportStage::Scan);
            assert!(matches!(**source, Error::Bluetooth(_)));
        }
        other => panic!("expected Transport error, got {other:?}"),
    }
    assert!(err.is_retryable());
    assert_eq!(client.transport().connect_count(), 0);
    assert_eq!(client.transport().disconnect_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn dropped_link_is_not_disconnected() {
    let transport = MockTransport::builder()
        .drops_connection()
        .notify(Duration::from_millis(20), vec![50, 50])
        .build();
    let client = client(transport);

    client.acquire().await.unwrap();

    assert_eq!(client.transport().unsubscribe_count(), 1);
    assert_eq!(client.transport().disconnect_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn teardown_failures_never_mask_the_result() {
    let transport = MockTransport::builder()
        .fail_at(MockStep::Unsubscribe)
        .fail_at(MockStep::Disconnect)
        .notify(Duration::from_millis(20), vec![33, 44])
        .build();
    let client = client(transport);

    let reading = client.acquire().await.unwrap();

    assert_eq!(reading.moisture, 33.0);
    assert_eq!(client.transport().unsubscribe_count(), 1);
    assert_eq!(client.transport().disconnect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn acquisitions_are_independent() {
    let transport = MockTransport::builder()
        .notify(Duration::from_millis(20), vec![12, 34])
        .build();
    let client = client(transport);

    let first = client.acquire().await.unwrap();
    let second = client.acquire().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(client.transport().connect_count(), 2);
    assert_eq!(client.transport().disconnect_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancelled_acquisition_still_releases_link() {
    let transport = MockTransport::builder().build();
    let client = client(transport);

    let outcome = tokio::time::timeout(Duration::from_millis(100), client.acquire()).await;
    assert!(outcome.is_err());

    // Give the best-effort cleanup task a chance to run.
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert_eq!(client.transport().read_count(), 0);
    assert_eq!(client.transport().unsubscribe_count(), 1);
    assert_eq!(client.transport().disconnect_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn acquired_reading_feeds_rule_engine() {
    let transport = MockTransport::builder()
        .notify(Duration::from_millis(20), vec![55, 60])
        .build();
    let client = client(transport);

    let reading = client.acquire().await.unwrap();
    let book = RuleBook::builtin();

    // Without a pH channel the pH-bounded Rice rule cannot match.
    let context = RecommendationContext::new("rainy", "kharif");
    assert!(book.recommend(&reading, &context).is_default());

    let with_ph = reading.with_ph(6.5);
    assert_eq!(
        book.recommend(&with_ph, &context).crops,
        vec!["Rice", "Paddy"]
    );
}

#[tokio::test]
#[ignore = "requires BLE hardware"]
async fn acquire_from_real_sensor() {
    init_tracing();
    let client = SnapshotClient::new(
        soilsense_core::BleTransport::new(),
        AcquisitionConfig::default(),
    );
    let snapshot = client.acquire_snapshot().await.unwrap();
    println!("{:?}: {}", snapshot.source, snapshot.reading);
}
