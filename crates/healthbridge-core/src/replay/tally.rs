use crate::decoder::DecodeStatus;
use crate::dispatch::DispatchError;
use crate::{DeviceSummary, TelemetrySnapshot};

/// Running per-device counters for one replay.
#[derive(Debug)]
pub(crate) struct DeviceTally {
    summary: DeviceSummary,
    processing_time_ms: f64,
    timed: u64,
}

impl DeviceTally {
    pub(crate) fn new(device_id: &str) -> Self {
        Self {
            summary: DeviceSummary::empty(device_id),
            processing_time_ms: 0.0,
            timed: 0,
        }
    }

    pub(crate) fn record(&mut self, outcome: Result<TelemetrySnapshot, DispatchError>) {
        let summary = &mut self.summary;
        summary.frames += 1;
        match outcome {
            Ok(snapshot) => {
                match snapshot.status {
                    DecodeStatus::Success => summary.decoded += 1,
                    DecodeStatus::FirstByteMismatch => summary.first_byte_mismatches += 1,
                    DecodeStatus::ChecksumMismatch => summary.checksum_mismatches += 1,
                    DecodeStatus::Unknown(_) => summary.unknown_status += 1,
                }
                self.processing_time_ms += snapshot.processing_time_ms;
                self.timed += 1;
                summary.last_snapshot = Some(snapshot);
            }
            Err(DispatchError::Frame(_)) => summary.rejected += 1,
            Err(DispatchError::DecodeFailure { .. }) => summary.decode_failures += 1,
        }
    }

    pub(crate) fn into_summary(self) -> DeviceSummary {
        let mut summary = self.summary;
        if self.timed > 0 {
            summary.mean_processing_time_ms = Some(self.processing_time_ms / self.timed as f64);
        }
        summary
    }
}
