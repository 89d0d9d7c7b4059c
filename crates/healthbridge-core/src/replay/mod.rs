//! Capture replay.
//!
//! Frames are grouped per device in capture order, then every device is
//! replayed on its own thread against one shared bridge, which is how
//! frames arrive in production: one producer per connected device.

mod tally;

use std::collections::BTreeMap;
use std::path::Path;
use std::thread;

use thiserror::Error;
use time::{OffsetDateTime, format_description::well_known::Rfc3339};
use tracing::info;

use crate::bridge::HealthBridge;
use crate::decoder::DecoderFactory;
use crate::source::{FrameEvent, FrameSource, JsonLinesSource, SourceError};
use crate::{DEFAULT_GENERATED_AT, ReplayReport, make_stub_report};

use tally::DeviceTally;

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
    #[error("replay worker for device {device_id} panicked")]
    WorkerPanicked { device_id: String },
}

pub fn replay_capture_file<F: DecoderFactory>(
    path: &Path,
    bridge: &HealthBridge<F>,
) -> Result<ReplayReport, ReplayError> {
    let source = JsonLinesSource::open(path)?;
    replay_source(path, source, bridge)
}

pub fn replay_source<F: DecoderFactory, S: FrameSource>(
    path: &Path,
    mut source: S,
    bridge: &HealthBridge<F>,
) -> Result<ReplayReport, ReplayError> {
    let mut frames_total = 0u64;
    let mut per_device: BTreeMap<String, Vec<FrameEvent>> = BTreeMap::new();
    while let Some(event) = source.next_frame()? {
        frames_total += 1;
        per_device
            .entry(event.device_id.clone())
            .or_default()
            .push(event);
    }
    info!(frames_total, devices = per_device.len(), "replaying capture");

    let tallies = thread::scope(|scope| {
        let workers: Vec<_> = per_device
            .iter()
            .map(|(device_id, events)| {
                let handle = scope.spawn(move || replay_device(bridge, device_id, events));
                (device_id, handle)
            })
            .collect();

        workers
            .into_iter()
            .map(|(device_id, handle)| {
                handle.join().map_err(|_| ReplayError::WorkerPanicked {
                    device_id: device_id.clone(),
                })
            })
            .collect::<Result<Vec<_>, _>>()
    })?;

    let bytes = path.metadata().map(|meta| meta.len()).unwrap_or(0);
    let mut report = make_stub_report(&path.display().to_string(), bytes);
    report.generated_at = now_rfc3339();
    report.frames_total = frames_total;
    report.devices = tallies.into_iter().map(DeviceTally::into_summary).collect();
    report.registry = bridge.registry().registry_status();
    Ok(report)
}

fn replay_device<F: DecoderFactory>(
    bridge: &HealthBridge<F>,
    device_id: &str,
    events: &[FrameEvent],
) -> DeviceTally {
    let mut tally = DeviceTally::new(device_id);
    for event in events {
        tally.record(bridge.split_package(device_id, &event.frame, event.mode));
    }
    tally
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| DEFAULT_GENERATED_AT.to_string())
}
