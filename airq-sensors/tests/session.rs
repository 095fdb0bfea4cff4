//! Measurement sessions against a scripted transport.
mod common;

use std::time::{Duration, Instant};

use airq_sensors::crc::crc8;
use airq_sensors::profile::{SEN55, SHT40, SPS30_FLOAT, SPS30_INTEGER, sen5x_for_product};
use airq_sensors::sht4x::Precision;
use airq_sensors::{
    CleaningInterlock, CleaningState, Error, MeasurementSession, MeasurementState, ProtocolError,
    SessionConfig,
};
use common::{
    MockError, MockTransport, RecordingDelay, framed, queue_sen5x_identity,
    queue_sht4x_identity, queue_sps30_identity,
};

type Session = MeasurementSession<MockTransport, RecordingDelay>;

fn open(
    profile: &'static airq_sensors::DeviceProfile,
    transport: &MockTransport,
    delay: &RecordingDelay,
    config: SessionConfig,
) -> Session {
    MeasurementSession::open(profile, transport.clone(), delay.clone(), config).unwrap()
}

/// Twenty words encoding 1.0 in every SPS30 float field.
fn sps30_ones() -> Vec<u8> {
    framed(&[[0x3F, 0x80], [0x00, 0x00]].repeat(10))
}

#[test]
fn sht40_end_to_end() {
    let transport = MockTransport::new();
    let delay = RecordingDelay::default();
    queue_sht4x_identity(&transport);
    let mut sht = open(&SHT40, &transport, &delay, SessionConfig::default());
    assert_eq!(sht.identity().serial_number.as_deref(), Some("256000000"));

    transport.queue_read(vec![0x66, 0x00, crc8([0x66, 0x00]), 0x81, 0x00, crc8([0x81, 0x00])]);
    let sample = sht.read_sample().unwrap();
    let t = sample.get("t").unwrap();
    let h = sample.get("h").unwrap();
    assert!((t - 24.728).abs() < 0.01, "t = {t}");
    assert!((h - 56.989).abs() < 0.01, "h = {h}");

    assert_eq!(transport.writes(), vec![vec![0x89], vec![0xFD]]);
    assert_eq!(delay.count(10), 1);
}

#[test]
fn sht40_low_precision() {
    let transport = MockTransport::new();
    let delay = RecordingDelay::default();
    queue_sht4x_identity(&transport);
    let mut sht = open(&SHT40, &transport, &delay, SessionConfig::default());
    transport.queue_words(&[[0x00, 0x00], [0xFF, 0xFF]]);
    let sample = sht.measure(Precision::Low).unwrap();
    assert_eq!(sample.get("t"), Some(-45.0));
    assert_eq!(sample.get("h"), Some(119.0));
    assert_eq!(transport.writes().last(), Some(&vec![0xE0]));
}

#[test]
fn sps30_identity_and_start() {
    let transport = MockTransport::new();
    let delay = RecordingDelay::default();
    queue_sps30_identity(&transport);
    let mut sps = open(&SPS30_FLOAT, &transport, &delay, SessionConfig::default());
    let identity = sps.identity();
    assert_eq!(identity.product_name.as_deref(), Some("00080000"));
    assert_eq!(identity.serial_number.as_deref(), Some("F3A1B2C4"));
    assert_eq!(identity.firmware_version.as_deref(), Some("2.2"));

    transport.clear_writes();
    sps.start().unwrap();
    assert_eq!(sps.state(), MeasurementState::Measuring);
    assert_eq!(transport.writes(), vec![vec![0x00, 0x10, 0x03, 0x00, 0xAC]]);
}

#[test]
fn sps30_reads_all_fields() {
    let transport = MockTransport::new();
    let delay = RecordingDelay::default();
    queue_sps30_identity(&transport);
    let mut sps = open(&SPS30_FLOAT, &transport, &delay, SessionConfig::default());
    sps.start().unwrap();
    transport.queue_read(sps30_ones());
    let sample = sps.read_sample().unwrap();
    let names: Vec<_> = sample.iter().map(|(name, _)| name).collect();
    assert_eq!(
        names,
        ["pm1", "pm2", "pm4", "pm10", "nc0", "nc1", "nc2", "nc4", "nc10", "tps"]
    );
    assert!(sample.iter().all(|(_, value)| value == 1.0));
    assert_eq!(transport.writes().last(), Some(&vec![0x03, 0x00]));
}

#[test]
fn sps30_integer_mode() {
    let transport = MockTransport::new();
    let delay = RecordingDelay::default();
    queue_sps30_identity(&transport);
    let mut sps = open(&SPS30_INTEGER, &transport, &delay, SessionConfig::default());
    transport.clear_writes();
    sps.start().unwrap();
    let start = &transport.writes()[0];
    assert_eq!(&start[..4], &[0x00, 0x10, 0x05, 0x00]);
    assert_eq!(start[4], crc8([0x05, 0x00]));

    let mut words = vec![[0x00, 0x07]; 9];
    words.push([0x02, 0x0D]); // 525 nm
    transport.queue_words(&words);
    let sample = sps.read_sample().unwrap();
    assert_eq!(sample.get("pm2"), Some(7.0));
    assert_eq!(sample.get("tps"), Some(0.525));
}

#[test]
fn sps30_checksum_failure_rejects_sample() {
    let transport = MockTransport::new();
    let delay = RecordingDelay::default();
    queue_sps30_identity(&transport);
    let mut sps = open(&SPS30_FLOAT, &transport, &delay, SessionConfig::default());
    sps.start().unwrap();
    let mut bytes = sps30_ones();
    bytes[3 * 3 + 2] ^= 0xFF;
    transport.queue_read(bytes);
    let err = sps.read_sample().unwrap_err();
    assert!(err.is_checksum_mismatch());
    assert!(matches!(
        err,
        Error::Protocol(ProtocolError::ChecksumMismatch { word: 3 })
    ));
}

#[test]
fn sen55_checksum_failure_substitutes_sentinel() {
    let transport = MockTransport::new();
    let delay = RecordingDelay::default();
    queue_sen5x_identity(&transport, b"SEN55");
    let mut sen = open(&SEN55, &transport, &delay, SessionConfig::default());
    assert_eq!(
        sen5x_for_product(sen.identity().product_name.as_deref().unwrap()).model,
        "SEN55"
    );
    sen.start().unwrap();

    let mut bytes = framed(&[
        [0x00, 0x0A],
        [0x00, 0x14],
        [0x00, 0x1E],
        [0x00, 0x28],
        [0x0F, 0xA0],
        [0x12, 0xC0],
        [0x01, 0xF4],
        [0x00, 0x0A],
    ]);
    // Corrupt the NOx checksum.
    bytes[23] ^= 0xFF;
    transport.queue_read(bytes);
    let sample = sen.read_sample().unwrap();
    assert_eq!(sample.len(), 8);
    assert_eq!(sample.get("pm1"), Some(1.0));
    assert_eq!(sample.get("pm10"), Some(4.0));
    assert_eq!(sample.get("h"), Some(40.0));
    assert_eq!(sample.get("t"), Some(24.0));
    assert_eq!(sample.get("voc"), Some(50.0));
    assert_eq!(sample.get("nox"), Some(-3264.1));
}

#[test]
fn short_response_is_incomplete_frame() {
    let transport = MockTransport::new();
    let delay = RecordingDelay::default();
    queue_sps30_identity(&transport);
    let mut sps = open(&SPS30_FLOAT, &transport, &delay, SessionConfig::default());
    sps.start().unwrap();
    let mut bytes = sps30_ones();
    bytes.pop();
    transport.queue_read(bytes);
    assert!(matches!(
        sps.read_sample(),
        Err(Error::Protocol(ProtocolError::IncompleteFrame {
            expected: 60,
            received: 59
        }))
    ));
}

#[test]
fn data_ready_waits_once() {
    let transport = MockTransport::new();
    let delay = RecordingDelay::default();
    queue_sps30_identity(&transport);
    let mut sps = open(&SPS30_FLOAT, &transport, &delay, SessionConfig::default());
    sps.start().unwrap();

    transport.queue_words(&[[0x00, 0x00]]);
    transport.queue_read(sps30_ones());
    sps.read_when_ready().unwrap();
    assert_eq!(delay.count(1_000), 1);

    transport.queue_words(&[[0x00, 0x01]]);
    transport.queue_read(sps30_ones());
    sps.read_when_ready().unwrap();
    assert_eq!(delay.count(1_000), 1);
}

#[test]
fn cleaning_rejected_while_measuring() {
    let transport = MockTransport::new();
    let delay = RecordingDelay::default();
    queue_sps30_identity(&transport);
    let config = SessionConfig {
        cleaning_interlock: CleaningInterlock::RejectWhileMeasuring,
        ..SessionConfig::default()
    };
    let mut sps = open(&SPS30_FLOAT, &transport, &delay, config);
    sps.start().unwrap();
    transport.clear_writes();
    assert!(matches!(sps.start_cleaning(), Err(Error::MeasuringInterlock)));
    assert!(transport.writes().is_empty());
    assert_eq!(sps.cleaning_state(), CleaningState::Idle);

    sps.stop().unwrap();
    sps.start_cleaning().unwrap();
    assert_eq!(sps.cleaning_state(), CleaningState::JustFinished);
    assert_eq!(transport.writes().last(), Some(&vec![0x56, 0x07]));
    assert_eq!(delay.count(12_000), 1);
}

#[test]
fn busy_while_cleaning() {
    let transport = MockTransport::new();
    let delay = RecordingDelay::default();
    queue_sps30_identity(&transport);
    let mut sps = open(&SPS30_FLOAT, &transport, &delay, SessionConfig::default());
    sps.start().unwrap();
    sps.begin_cleaning().unwrap();
    assert!(matches!(sps.read_sample(), Err(Error::DeviceBusy)));
    sps.finish_cleaning();
    transport.queue_read(sps30_ones());
    assert!(sps.read_sample().is_ok());
}

#[test]
fn auto_cleaning_interval_frame() {
    let transport = MockTransport::new();
    let delay = RecordingDelay::default();
    queue_sps30_identity(&transport);
    let mut sps = open(&SPS30_FLOAT, &transport, &delay, SessionConfig::default());
    transport.clear_writes();

    transport.queue_words(&[[0x00, 0x06], [0x97, 0x80]]);
    let set = sps
        .write_auto_cleaning_interval(Duration::from_secs(5 * 24 * 60 * 60))
        .unwrap();
    assert_eq!(set, Duration::from_secs(432_000));
    let writes = transport.writes();
    assert_eq!(
        writes[0],
        vec![
            0x80,
            0x04,
            0x00,
            0x06,
            crc8([0x00, 0x06]),
            0x97,
            0x80,
            crc8([0x97, 0x80])
        ]
    );
    assert_eq!(writes[1], vec![0x80, 0x04]);
}

#[test]
fn auto_cleaning_interval_too_long_is_rejected() {
    let transport = MockTransport::new();
    let delay = RecordingDelay::default();
    queue_sps30_identity(&transport);
    let mut sps = open(&SPS30_FLOAT, &transport, &delay, SessionConfig::default());
    transport.clear_writes();

    let too_long = Duration::from_secs(u64::from(u32::MAX) + 1);
    assert!(matches!(
        sps.write_auto_cleaning_interval(too_long),
        Err(Error::OutOfRange("auto-cleaning interval"))
    ));
    assert!(transport.writes().is_empty());
}

#[test]
fn status_register() {
    let transport = MockTransport::new();
    let delay = RecordingDelay::default();
    queue_sps30_identity(&transport);
    let mut sps = open(&SPS30_FLOAT, &transport, &delay, SessionConfig::default());
    transport.queue_words(&[[0x00, 0x00], [0x00, 0x10]]);
    let status = sps.read_status().unwrap();
    assert!(!status.ok());
    assert!(status.contains("fan"));
    assert_eq!(status.to_string(), "/fan-0rpm");
}

#[test]
fn close_after_failed_start() {
    let transport = MockTransport::new();
    let delay = RecordingDelay::default();
    queue_sps30_identity(&transport);
    let mut sps = open(&SPS30_FLOAT, &transport, &delay, SessionConfig::default());

    transport.set_write_error(true);
    assert!(matches!(sps.start(), Err(Error::Transport(MockError::Write))));
    assert_eq!(sps.state(), MeasurementState::Idle);

    // The stop command fails too, but the transport is still released.
    assert!(matches!(sps.close(), Err(Error::Transport(MockError::Write))));
    assert_eq!(transport.closed(), 1);
    assert_eq!(sps.state(), MeasurementState::Closed);

    assert!(sps.close().is_ok());
    drop(sps);
    assert_eq!(transport.closed(), 1);
}

#[test]
fn restart_after_delay() {
    let transport = MockTransport::new();
    let delay = RecordingDelay::default();
    queue_sps30_identity(&transport);
    let mut sps = open(&SPS30_FLOAT, &transport, &delay, SessionConfig::default());
    sps.start().unwrap();

    let now = Instant::now();
    sps.stop_and_restart_after(now, Duration::from_secs(135))
        .unwrap();
    assert_eq!(sps.state(), MeasurementState::Idle);
    assert_eq!(sps.restart_deadline(), Some(now + Duration::from_secs(135)));

    transport.clear_writes();
    assert!(!sps.service_restart(now + Duration::from_secs(134)).unwrap());
    assert!(transport.writes().is_empty());
    assert!(sps.service_restart(now + Duration::from_secs(135)).unwrap());
    assert_eq!(sps.state(), MeasurementState::Measuring);
    assert_eq!(transport.writes(), vec![vec![0x00, 0x10, 0x03, 0x00, 0xAC]]);
    assert!(sps.restart_deadline().is_none());
}

#[test]
fn close_cancels_pending_restart() {
    let transport = MockTransport::new();
    let delay = RecordingDelay::default();
    queue_sps30_identity(&transport);
    let mut sps = open(&SPS30_FLOAT, &transport, &delay, SessionConfig::default());
    let now = Instant::now();
    sps.schedule_restart(now, Duration::ZERO).unwrap();
    sps.close().unwrap();
    assert!(sps.restart_deadline().is_none());
    assert!(matches!(sps.service_restart(now), Err(Error::Closed)));
    assert_eq!(transport.writes().last(), Some(&vec![0x01, 0x04]));
}

#[test]
fn open_fails_on_corrupted_identity() {
    let transport = MockTransport::new();
    let delay = RecordingDelay::default();
    let mut name = common::padded(&[*b"00", *b"08"], 4);
    name[2] ^= 0xFF;
    transport.queue_read(name);
    let result = MeasurementSession::open(
        &SPS30_FLOAT,
        transport.clone(),
        delay,
        SessionConfig::default(),
    );
    assert!(matches!(
        result,
        Err(Error::Protocol(ProtocolError::ChecksumMismatch { word: 0 }))
    ));
    assert_eq!(transport.closed(), 1);
}

#[test]
fn sen5x_detects_model() {
    let transport = MockTransport::new();
    let delay = RecordingDelay::default();
    queue_sen5x_identity(&transport, b"SEN55");
    let mut sen =
        MeasurementSession::open_sen5x(transport.clone(), delay.clone(), SessionConfig::default())
            .unwrap();
    assert_eq!(sen.profile().model, "SEN55");
    assert_eq!(sen.identity().serial_number.as_deref(), Some("123456"));
    assert!(sen.read_nox_tuning().is_err());
    transport.queue_words(&[
        [0x00, 0x01],
        [0x00, 0x0C],
        [0x00, 0x0C],
        [0x02, 0xD0],
        [0x00, 0x32],
        [0x00, 0xE6],
    ]);
    assert_eq!(
        sen.read_nox_tuning().unwrap(),
        airq_sensors::sen5x::AlgorithmTuning::NOX_DEFAULT
    );

    let transport = MockTransport::new();
    queue_sen5x_identity(&transport, b"SEN54");
    let mut sen =
        MeasurementSession::open_sen5x(transport.clone(), delay, SessionConfig::default()).unwrap();
    assert_eq!(sen.profile().model, "SEN54");
    assert!(matches!(sen.read_nox_tuning(), Err(Error::Unsupported(_))));
}
