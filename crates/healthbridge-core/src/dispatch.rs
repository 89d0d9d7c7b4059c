use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;
use tracing::{debug, error, warn};

use crate::TelemetrySnapshot;
use crate::decoder::{DecodeStatus, Decoder, DecoderFactory};
use crate::frame::{FrameError, validate_frame};
use crate::registry::SessionRegistry;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("decode failed for device {device_id}: {message}")]
    DecodeFailure { device_id: String, message: String },
}

/// Validates frames and drives the owning device's decoder.
///
/// Cheap to clone; clones share one registry.
pub struct Dispatcher<F: DecoderFactory> {
    registry: Arc<SessionRegistry<F>>,
}

impl<F: DecoderFactory> Clone for Dispatcher<F> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<F: DecoderFactory> Dispatcher<F> {
    pub fn new(registry: Arc<SessionRegistry<F>>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SessionRegistry<F> {
        &self.registry
    }

    /// Decode one frame for `device_id`.
    ///
    /// Validation happens before any session is created or lock taken. The
    /// decoder's status code is returned inside the snapshot and never turned
    /// into an error; only a failing decoder call is.
    pub fn dispatch(
        &self,
        device_id: &str,
        frame: &[u8],
        mode: Option<i32>,
    ) -> Result<TelemetrySnapshot, DispatchError> {
        let frame = validate_frame(frame).inspect_err(|err| {
            warn!(device_id, error = %err, "frame rejected");
        })?;

        let session = panic::catch_unwind(AssertUnwindSafe(|| {
            self.registry.get_or_create(device_id, mode)
        }))
        .map_err(|payload| decode_failure(device_id, panic_message(&*payload)))?;
        let (code, telemetry, mode, elapsed) = {
            let mut decoder = session.lock();
            let started = Instant::now();
            let outcome =
                panic::catch_unwind(AssertUnwindSafe(|| decoder.consume(frame.as_bytes())));
            let elapsed = started.elapsed();

            let code = match outcome {
                Ok(Ok(code)) => code,
                Ok(Err(err)) => return Err(decode_failure(device_id, err.to_string())),
                Err(payload) => return Err(decode_failure(device_id, panic_message(&*payload))),
            };
            (code, decoder.telemetry().clone(), decoder.mode(), elapsed)
        };

        let status = DecodeStatus::from_code(code);
        let processing_time_ms = elapsed.as_secs_f64() * 1000.0;
        match status {
            DecodeStatus::Success => {
                debug!(device_id, processing_time_ms, "frame decoded");
            }
            DecodeStatus::FirstByteMismatch => {
                warn!(
                    device_id,
                    first_byte = frame.framing_byte(),
                    "framing byte mismatch"
                );
            }
            DecodeStatus::ChecksumMismatch => {
                warn!(device_id, checksum = frame.checksum(), "checksum mismatch");
            }
            DecodeStatus::Unknown(code) => {
                warn!(device_id, code, "unknown decoder status");
            }
        }

        Ok(TelemetrySnapshot {
            device_id: device_id.to_string(),
            processing_time_ms,
            status_code: code,
            status,
            mode,
            telemetry,
        })
    }
}

fn decode_failure(device_id: &str, message: String) -> DispatchError {
    error!(device_id, %message, "decoder call failed");
    DispatchError::DecodeFailure {
        device_id: device_id.to_string(),
        message,
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "decoder panicked".to_string()
    }
}
