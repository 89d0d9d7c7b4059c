//! healthbridge core library: per-device decoder sessions for wearable
//! telemetry.
//!
//! Several devices stream binary frames at once, each into its own stateful
//! decoder. This crate owns those decoders: the `registry` creates exactly one
//! session per device id and tears it down on request, the `dispatch` layer
//! validates frames and runs them through the device's decoder under that
//! device's lock, and the `bridge` exposes the whole thing as named method
//! calls for an application layer. The decoder itself is a capability
//! (`decoder::Decoder`); a deterministic reference implementation ships for
//! tests and the CLI simulator.
//!
//! Invariants:
//! - At most one decode is in flight per device; devices never wait on each
//!   other beyond a short map lookup.
//! - Exactly one decoder is constructed per device, even under concurrent
//!   first use.
//! - Invalid frames are rejected before any session is created.
//! - Decoder status codes are data, never errors.
//!
//! Version française (résumé):
//! Cette crate gère une session de décodage par appareil : création unique,
//! verrou dédié par appareil, validation des trames avant tout verrouillage,
//! et codes de statut du décodeur renvoyés comme données.
//!
//! # Examples
//! ```
//! use healthbridge_core::HealthBridge;
//! use healthbridge_core::decoder::{ReferenceDecoderFactory, ReferenceFrame};
//!
//! let bridge = HealthBridge::new(ReferenceDecoderFactory);
//! let frame = ReferenceFrame { heart_rate: 64, ..Default::default() }.encode();
//! let snapshot = bridge.split_package("band-1", &frame, None)?;
//! assert_eq!(snapshot.status_code, -1);
//! assert_eq!(snapshot.telemetry.heart_rate, 64);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};

pub mod bridge;
pub mod decoder;
pub mod dispatch;
pub mod frame;
pub mod registry;
mod replay;
mod source;

pub use bridge::{BridgeError, Envelope, HealthBridge, MethodCall, Reply};
pub use decoder::{DecodeStatus, Decoder, DecoderError, DecoderFactory, Telemetry};
pub use dispatch::{DispatchError, Dispatcher};
pub use registry::{
    DEFAULT_DECODER_TYPE, DeviceSession, DeviceStatus, RegistryStatus, SessionRegistry,
    StatusReport, TypeTarget,
};
pub use replay::{ReplayError, replay_capture_file, replay_source};
pub use source::{CaptureRecord, FrameEvent, FrameSource, JsonLinesSource, SourceError};

/// Current replay report schema version.
pub const REPORT_VERSION: u32 = 1;
/// Timestamp used when the clock cannot be formatted.
pub const DEFAULT_GENERATED_AT: &str = "1970-01-01T00:00:00Z";

/// Result of one dispatched frame: decoder telemetry plus dispatch metadata.
///
/// # Examples
/// ```
/// use healthbridge_core::{DecodeStatus, Telemetry, TelemetrySnapshot};
///
/// let snapshot = TelemetrySnapshot {
///     device_id: "A".to_string(),
///     processing_time_ms: 0.4,
///     status_code: -1,
///     status: DecodeStatus::Success,
///     mode: 3,
///     telemetry: Telemetry::default(),
/// };
/// let value = serde_json::to_value(&snapshot).unwrap();
/// assert_eq!(value["type"], 3);
/// assert_eq!(value["heart_rate"], 0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetrySnapshot {
    pub device_id: String,
    /// Wall-clock time spent inside the decoder call.
    pub processing_time_ms: f64,
    /// Raw decoder status code (`-1` on success).
    pub status_code: i32,
    pub status: DecodeStatus,
    /// Decoder mode at the time of the decode.
    #[serde(rename = "type")]
    pub mode: i32,
    #[serde(flatten)]
    pub telemetry: Telemetry,
}

/// Replay summary with devices in stable (sorted) order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayReport {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    pub tool: ToolInfo,
    /// RFC3339 timestamp of the replay.
    pub generated_at: String,
    pub input: InputInfo,
    pub frames_total: u64,
    pub devices: Vec<DeviceSummary>,
    /// Registry state once every device finished.
    pub registry: RegistryStatus,
}

impl ReplayReport {
    /// True if any frame was rejected, failed, or decoded to a non-success
    /// status.
    pub fn has_issues(&self) -> bool {
        self.devices.iter().any(DeviceSummary::has_issues)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    /// Input path as provided.
    pub path: String,
    pub bytes: u64,
}

/// Per-device replay counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceSummary {
    pub device_id: String,
    pub frames: u64,
    /// Frames decoded with status `-1`.
    pub decoded: u64,
    pub first_byte_mismatches: u64,
    pub checksum_mismatches: u64,
    pub unknown_status: u64,
    /// Frames that failed validation (empty or too short).
    pub rejected: u64,
    pub decode_failures: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_processing_time_ms: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_snapshot: Option<TelemetrySnapshot>,
}

impl DeviceSummary {
    pub fn empty(device_id: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            frames: 0,
            decoded: 0,
            first_byte_mismatches: 0,
            checksum_mismatches: 0,
            unknown_status: 0,
            rejected: 0,
            decode_failures: 0,
            mean_processing_time_ms: None,
            last_snapshot: None,
        }
    }

    pub fn has_issues(&self) -> bool {
        self.decoded != self.frames
    }
}

/// Build a report with base fields filled and no devices.
///
/// # Examples
/// ```
/// use healthbridge_core::make_stub_report;
///
/// let report = make_stub_report("capture.jsonl", 42);
/// assert_eq!(report.report_version, healthbridge_core::REPORT_VERSION);
/// assert!(report.devices.is_empty());
/// ```
pub fn make_stub_report(input_path: &str, input_bytes: u64) -> ReplayReport {
    ReplayReport {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: "healthbridge".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        generated_at: DEFAULT_GENERATED_AT.to_string(),
        input: InputInfo {
            path: input_path.to_string(),
            bytes: input_bytes,
        },
        frames_total: 0,
        devices: vec![],
        registry: RegistryStatus {
            total_instances: 0,
            device_ids: vec![],
            processing_devices: vec![],
        },
    }
}
