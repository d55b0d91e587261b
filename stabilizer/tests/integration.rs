//! Integration tests for the discovery → configuration pipeline.
//!
//! A recording broker stands in for the network so the tests can count
//! discovery calls, sessions and writes.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};

use serde_json::{Value, json};

use miniconf_client::{
    Broker, DevicePattern, DeviceSession, MiniconfError, ResolvedAddress, Response, Result,
    resolve, resolve_or_exact,
};
use stabilizer::units::sample_period;
use stabilizer::{Channel, FilterDesign, IirOutput, PidParameters, VoltageScale, iir, pid};

/// How the fake device answers writes.
#[derive(Debug, Clone, Copy)]
enum Behavior {
    Ack,
    Reject(i32),
    Silent,
}

#[derive(Debug, Default)]
struct Record {
    discover_calls: usize,
    open_calls: usize,
    closed_sessions: usize,
    writes: Vec<(String, String, Value)>,
}

#[derive(Debug, Clone)]
struct RecordingBroker {
    devices: BTreeSet<String>,
    reachable: bool,
    behavior: Behavior,
    record: Arc<Mutex<Record>>,
}

impl RecordingBroker {
    fn new(devices: &[&str]) -> Self {
        Self {
            devices: devices.iter().map(|d| d.to_string()).collect(),
            reachable: true,
            behavior: Behavior::Ack,
            record: Arc::default(),
        }
    }

    fn unreachable(mut self) -> Self {
        self.reachable = false;
        self
    }

    fn answering(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }

    fn record(&self) -> std::sync::MutexGuard<'_, Record> {
        self.record.lock().unwrap()
    }
}

struct RecordingSession {
    device: ResolvedAddress,
    behavior: Behavior,
    record: Arc<Mutex<Record>>,
}

impl Broker for RecordingBroker {
    type Session = RecordingSession;

    async fn discover(&self, _pattern: &DevicePattern) -> Result<BTreeSet<String>> {
        self.record().discover_calls += 1;
        Ok(self.devices.clone())
    }

    async fn open(&self, device: &ResolvedAddress) -> Result<RecordingSession> {
        self.record().open_calls += 1;
        if !self.reachable {
            return Err(MiniconfError::connection("broker unreachable"));
        }
        Ok(RecordingSession {
            device: device.clone(),
            behavior: self.behavior,
            record: self.record.clone(),
        })
    }
}

impl DeviceSession for RecordingSession {
    fn device(&self) -> &ResolvedAddress {
        &self.device
    }

    async fn set(&mut self, path: &str, value: &Value) -> Result<Response> {
        self.record.lock().unwrap().writes.push((
            self.device.to_string(),
            path.to_string(),
            value.clone(),
        ));

        match self.behavior {
            Behavior::Ack => Ok(Response::ok()),
            Behavior::Reject(code) => Ok(Response::error(code, "Invalid value")),
            Behavior::Silent => Err(MiniconfError::Timeout {
                path: path.to_string(),
            }),
        }
    }

    async fn close(self) {
        self.record.lock().unwrap().closed_sessions += 1;
    }
}

fn channel(index: u8) -> Channel {
    Channel::try_from(index).unwrap()
}

fn exact(address: &str) -> ResolvedAddress {
    ResolvedAddress::exact(&DevicePattern::new(address).unwrap()).unwrap()
}

fn example_parameters() -> PidParameters {
    PidParameters {
        p: 1.5,
        i: 0.2,
        d: 0.0,
        i_limit: 5.0,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_single_write_with_converted_values() {
    let broker = RecordingBroker::new(&[]);
    let device = exact("dt/sinara/dual-pid/01");

    let ack = pid::configure_with_scale(
        &broker,
        &device,
        channel(0),
        &example_parameters(),
        &VoltageScale::new(10.0, 32768.0),
    )
    .await
    .expect("configuration failed");

    assert_eq!(ack.path, "pid_ch/0");
    assert_eq!(ack.device, device);

    let record = broker.record();
    assert_eq!(record.writes.len(), 1);
    assert_eq!(record.closed_sessions, 1);

    let (target, path, value) = &record.writes[0];
    assert_eq!(target, "dt/sinara/dual-pid/01");
    assert_eq!(path, "pid_ch/0");
    assert_eq!(value["i_limit"], json!(16384));
    assert_eq!(value["p"], json!(1.5));
    assert_eq!(value["i"], json!(0.2));
    assert_eq!(value["d"], json!(0.0));
    assert_eq!(value["x_offset"], json!(0));
    assert_eq!(value["y_min"], json!(-32768));
    assert_eq!(value["y_max"], json!(32768));
}

#[tokio::test]
async fn test_skipping_discovery_never_discovers() {
    let broker = RecordingBroker::new(&["dt/sinara/dual-pid/other"]);
    let pattern = DevicePattern::new("dt/sinara/dual-pid/01").unwrap();

    let device = resolve_or_exact(&broker, &pattern, false).await.unwrap();
    pid::configure(&broker, &device, channel(1), &PidParameters::default())
        .await
        .unwrap();

    let record = broker.record();
    assert_eq!(record.discover_calls, 0);
    assert_eq!(record.writes[0].0, "dt/sinara/dual-pid/01");
    assert_eq!(record.writes[0].1, "pid_ch/1");
}

#[tokio::test]
async fn test_skipping_discovery_requires_exact_address() {
    let broker = RecordingBroker::new(&["dt/sinara/dual-pid/01"]);
    let pattern = DevicePattern::new("dt/sinara/dual-pid/+").unwrap();

    let result = resolve_or_exact(&broker, &pattern, false).await;

    assert!(matches!(result, Err(MiniconfError::InvalidAddress(_))));
    assert_eq!(broker.record().discover_calls, 0);
}

#[tokio::test]
async fn test_discovered_address_reaches_transactor_unchanged() {
    let broker = RecordingBroker::new(&["dt/sinara/dual-pid/04-91-62-d9-7e-5f"]);
    let pattern = DevicePattern::new("dt/sinara/dual-pid/+").unwrap();

    let device = resolve(&broker, &pattern).await.unwrap();
    assert_eq!(device.as_str(), "dt/sinara/dual-pid/04-91-62-d9-7e-5f");

    pid::configure(&broker, &device, channel(0), &example_parameters())
        .await
        .unwrap();

    let record = broker.record();
    assert_eq!(record.discover_calls, 1);
    assert_eq!(record.writes.len(), 1);
    assert_eq!(record.writes[0].0, "dt/sinara/dual-pid/04-91-62-d9-7e-5f");
}

#[tokio::test]
async fn test_no_device_found() {
    let broker = RecordingBroker::new(&[]);
    let pattern = DevicePattern::new("dt/sinara/dual-pid/+").unwrap();

    let result = resolve(&broker, &pattern).await;

    assert!(matches!(result, Err(MiniconfError::NoDeviceFound { .. })));
    assert_eq!(broker.record().open_calls, 0);
}

#[tokio::test]
async fn test_ambiguous_match_carries_all_candidates() {
    let broker = RecordingBroker::new(&[
        "dt/sinara/dual-pid/02",
        "dt/sinara/dual-pid/01",
        "dt/sinara/dual-pid/03",
    ]);
    let pattern = DevicePattern::new("dt/sinara/dual-pid/+").unwrap();

    match resolve(&broker, &pattern).await {
        Err(MiniconfError::AmbiguousDeviceMatch { matches, .. }) => {
            let expected: BTreeSet<String> = [
                "dt/sinara/dual-pid/01",
                "dt/sinara/dual-pid/02",
                "dt/sinara/dual-pid/03",
            ]
            .into_iter()
            .map(String::from)
            .collect();
            assert_eq!(matches, expected);
        }
        other => panic!("Expected ambiguous match, got {:?}", other),
    }
    assert_eq!(broker.record().open_calls, 0);
}

#[tokio::test]
async fn test_connection_failure_issues_no_write() {
    let broker = RecordingBroker::new(&[]).unreachable();
    let device = exact("dt/sinara/dual-pid/01");

    let result = pid::configure(&broker, &device, channel(0), &example_parameters()).await;

    assert!(matches!(result, Err(MiniconfError::ConnectionFailed(_))));
    let record = broker.record();
    assert_eq!(record.open_calls, 1);
    assert!(record.writes.is_empty());
}

#[tokio::test]
async fn test_rejected_write_is_not_retried() {
    let broker = RecordingBroker::new(&[]).answering(Behavior::Reject(3));
    let device = exact("dt/sinara/dual-pid/01");

    let result = pid::configure(&broker, &device, channel(0), &example_parameters()).await;

    match result {
        Err(MiniconfError::WriteRejected {
            path, value, code, ..
        }) => {
            assert_eq!(path, "pid_ch/0");
            assert_eq!(code, Some(3));
            assert!(value.contains("\"i_limit\""));
        }
        other => panic!("Expected rejection, got {:?}", other),
    }

    let record = broker.record();
    assert_eq!(record.open_calls, 1);
    assert_eq!(record.writes.len(), 1);
    assert_eq!(record.closed_sessions, 1);
}

#[tokio::test]
async fn test_timeout_releases_session() {
    let broker = RecordingBroker::new(&[]).answering(Behavior::Silent);
    let device = exact("dt/sinara/dual-pid/01");

    let result = pid::configure(&broker, &device, channel(1), &example_parameters()).await;

    assert!(matches!(result, Err(MiniconfError::Timeout { .. })));
    let record = broker.record();
    assert_eq!(record.writes.len(), 1);
    assert_eq!(record.closed_sessions, 1);
}

#[tokio::test]
async fn test_iir_stage_write() {
    let broker = RecordingBroker::new(&[]);
    let device = exact("dt/sinara/dual-iir/01");
    let design = FilterDesign::Lowpass { f0: 1e3, k: 1.0 };

    let ack = iir::configure(
        &broker,
        &device,
        channel(1),
        &design,
        sample_period(128),
        &IirOutput::default(),
    )
    .await
    .unwrap();

    assert_eq!(ack.path, "iir_ch/1/0");

    let record = broker.record();
    let (_, path, value) = &record.writes[0];
    assert_eq!(path, "iir_ch/1/0");
    assert_eq!(value["ba"].as_array().map(Vec::len), Some(5));
    assert_eq!(value["y_max"], json!(0x7FFF));
    assert_eq!(value["y_offset"], json!(0));
}
