//! Reference decoder.
//!
//! A deterministic stand-in for the native library. It follows the same
//! status conventions (framing byte checked first, then checksum) and keeps
//! cumulative state across frames, so registry and dispatcher behaviour can
//! be exercised end to end without the vendor decoder.
//!
//! The byte layout is this crate's fixture format (see `layout`), not the
//! native protocol.

pub mod layout;
pub mod parser;

use std::collections::VecDeque;

use crate::frame::layout::{FRAMING_BYTE, MIN_FRAME_LEN};
use crate::frame::{FrameError, FrameReader, checksum};

use super::status::{STATUS_CHECKSUM_MISMATCH, STATUS_FIRST_BYTE_MISMATCH, STATUS_SUCCESS};
use super::{Decoder, DecoderError, DecoderFactory, Telemetry};

pub use parser::{ReferenceFrame, parse_reference_frame};

#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceDecoderFactory;

impl DecoderFactory for ReferenceDecoderFactory {
    type Decoder = ReferenceDecoder;

    fn construct(&self, mode: i32) -> ReferenceDecoder {
        ReferenceDecoder::new(mode)
    }
}

#[derive(Debug)]
pub struct ReferenceDecoder {
    mode: i32,
    telemetry: Telemetry,
    hr_history: VecDeque<f64>,
    br_history: VecDeque<f64>,
    raw: VecDeque<i32>,
}

impl ReferenceDecoder {
    pub fn new(mode: i32) -> Self {
        Self {
            mode,
            telemetry: Telemetry::default(),
            hr_history: VecDeque::with_capacity(layout::HISTORY_LEN),
            br_history: VecDeque::with_capacity(layout::HISTORY_LEN),
            raw: VecDeque::with_capacity(layout::RAW_BUFFER_LEN),
        }
    }

    fn apply(&mut self, frame: ReferenceFrame) {
        let t = &mut self.telemetry;
        t.heart_rate = i32::from(frame.heart_rate);
        t.breath_rate = i32::from(frame.breath_rate);
        t.temperature = frame.temperature;
        t.humidity = f64::from(frame.humidity);
        t.power = i32::from(frame.power);
        t.pose = i32::from(frame.pose);
        t.is_wearing = frame.is_wearing;
        t.gyro_x = f64::from(frame.gyro[0]);
        t.gyro_y = f64::from(frame.gyro[1]);
        t.gyro_z = f64::from(frame.gyro[2]);
        t.step_count += i64::from(frame.step_delta);
        t.timestamp = i64::from(frame.timestamp);
        t.rri_ms = if frame.heart_rate > 0 {
            60_000.0 / f64::from(frame.heart_rate)
        } else {
            0.0
        };

        push_smoothed(&mut self.hr_history, f64::from(frame.heart_rate));
        push_smoothed(&mut self.br_history, f64::from(frame.breath_rate));
        for sample in frame.samples {
            if self.raw.len() == layout::RAW_BUFFER_LEN {
                self.raw.pop_front();
            }
            self.raw.push_back(i32::from(sample));
        }

        t.hr_filtered = self.hr_history.iter().copied().collect();
        t.br_filtered = self.br_history.iter().copied().collect();
        t.raw_data = self.raw.iter().copied().collect();
    }
}

fn push_smoothed(history: &mut VecDeque<f64>, value: f64) {
    let next = match history.back() {
        Some(prev) => prev + layout::FILTER_ALPHA * (value - prev),
        None => value,
    };
    if history.len() == layout::HISTORY_LEN {
        history.pop_front();
    }
    history.push_back(next);
}

impl Decoder for ReferenceDecoder {
    fn consume(&mut self, frame: &[u8]) -> Result<i32, DecoderError> {
        let reader = FrameReader::new(frame);
        let native = |e: FrameError| DecoderError::native(e.to_string());
        reader.require_len(MIN_FRAME_LEN).map_err(native)?;

        if reader.read_framing_byte().map_err(native)? != FRAMING_BYTE {
            return Ok(STATUS_FIRST_BYTE_MISMATCH);
        }
        let carried = reader.read_checksum().map_err(native)?;
        if carried != checksum(reader.checksummed().map_err(native)?) {
            return Ok(STATUS_CHECKSUM_MISMATCH);
        }

        let parsed = parse_reference_frame(frame).map_err(native)?;
        self.apply(parsed);
        Ok(STATUS_SUCCESS)
    }

    fn mode(&self) -> i32 {
        self.mode
    }

    fn set_mode(&mut self, mode: i32) {
        self.mode = mode;
    }

    fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }
}
