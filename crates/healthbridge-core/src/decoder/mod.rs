//! Decoder capability.
//!
//! The native decoding library is modelled as two small traits so the
//! registry and dispatcher never depend on a concrete implementation:
//! [`DecoderFactory`] constructs one stateful decoder per device and
//! [`Decoder`] consumes frames and publishes cumulative [`Telemetry`].
//!
//! [`reference`] holds a deterministic implementation used by the CLI
//! simulator and by tests.

pub mod reference;
pub mod status;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use reference::{ReferenceDecoder, ReferenceDecoderFactory, ReferenceFrame};
pub use status::DecodeStatus;

/// Failure raised by the decoder call itself (as opposed to a status code).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecoderError {
    #[error("native decoder error: {message}")]
    Native { message: String },
}

impl DecoderError {
    pub fn native(message: impl Into<String>) -> Self {
        DecoderError::Native {
            message: message.into(),
        }
    }
}

/// Cumulative telemetry retained by a decoder across frames.
///
/// # Examples
/// ```
/// use healthbridge_core::decoder::Telemetry;
///
/// let telemetry = Telemetry::default();
/// assert!(telemetry.raw_data.is_empty());
/// assert!(!telemetry.is_wearing);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    /// Heart rate (bpm).
    pub heart_rate: i32,
    /// Breathing rate (breaths per minute).
    pub breath_rate: i32,
    /// Filtered heart waveform buffer.
    pub hr_filtered: Vec<f64>,
    /// Filtered breathing waveform buffer.
    pub br_filtered: Vec<f64>,
    /// Spectrum output, when the decoder publishes one.
    pub fft_out: Vec<f64>,
    pub gyro_x: f64,
    pub gyro_y: f64,
    pub gyro_z: f64,
    /// Relative humidity (%).
    pub humidity: f64,
    pub is_wearing: bool,
    pub pose: i32,
    /// Battery level (%).
    pub power: i32,
    /// Raw waveform buffer.
    pub raw_data: Vec<i32>,
    pub step_count: i64,
    /// Temperature (°C).
    pub temperature: f64,
    /// Device timestamp of the last accepted frame.
    pub timestamp: i64,
    /// RR interval (ms).
    pub rri_ms: f64,
}

/// A stateful decoder owned by exactly one device session.
///
/// `consume` returns the decoder's integer status code; non-success codes are
/// informational. An `Err` means the call itself failed.
pub trait Decoder: Send {
    fn consume(&mut self, frame: &[u8]) -> Result<i32, DecoderError>;

    fn mode(&self) -> i32;

    fn set_mode(&mut self, mode: i32);

    fn telemetry(&self) -> &Telemetry;
}

/// Constructs decoders for newly seen devices.
///
/// Any `Fn(i32) -> D` closure is a factory, which keeps test doubles short.
pub trait DecoderFactory: Send + Sync {
    type Decoder: Decoder;

    fn construct(&self, mode: i32) -> Self::Decoder;
}

impl<F, D> DecoderFactory for F
where
    F: Fn(i32) -> D + Send + Sync,
    D: Decoder,
{
    type Decoder = D;

    fn construct(&self, mode: i32) -> D {
        self(mode)
    }
}
