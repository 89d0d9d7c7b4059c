use crate::frame::layout::{CHECKSUM_LEN, FRAMING_BYTE, MIN_FRAME_LEN};
use crate::frame::{FrameError, FrameReader, checksum};

use super::layout;

/// One frame of the reference layout, decoded into domain fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferenceFrame {
    pub timestamp: u32,
    pub is_wearing: bool,
    pub pose: u8,
    pub heart_rate: u8,
    pub breath_rate: u8,
    /// Degrees Celsius; encoded with two decimals.
    pub temperature: f64,
    pub humidity: u8,
    pub power: u8,
    pub gyro: [i8; 3],
    pub step_delta: u8,
    pub samples: Vec<u8>,
}

impl ReferenceFrame {
    /// Encode with a leading framing byte and a valid trailing checksum.
    ///
    /// # Examples
    /// ```
    /// use healthbridge_core::decoder::ReferenceFrame;
    /// use healthbridge_core::frame::validate_frame;
    ///
    /// let bytes = ReferenceFrame { heart_rate: 72, ..Default::default() }.encode();
    /// let frame = validate_frame(&bytes).unwrap();
    /// assert!(frame.has_framing_byte() && frame.checksum_matches());
    /// ```
    pub fn encode(&self) -> Vec<u8> {
        let mut bytes = vec![0u8; layout::HEADER_LEN];
        bytes[0] = FRAMING_BYTE;
        bytes[layout::FLAGS_OFFSET] = ((self.pose & layout::POSE_MASK) << layout::POSE_SHIFT)
            | if self.is_wearing {
                layout::WEARING_MASK
            } else {
                0
            };
        bytes[layout::TIMESTAMP_RANGE].copy_from_slice(&self.timestamp.to_le_bytes());
        bytes[layout::HEART_RATE_OFFSET] = self.heart_rate;
        bytes[layout::BREATH_RATE_OFFSET] = self.breath_rate;
        let centi = (self.temperature * layout::TEMPERATURE_SCALE).round() as i16;
        bytes[layout::TEMPERATURE_RANGE].copy_from_slice(&centi.to_le_bytes());
        bytes[layout::HUMIDITY_OFFSET] = self.humidity;
        bytes[layout::POWER_OFFSET] = self.power;
        bytes[layout::GYRO_X_OFFSET] = self.gyro[0] as u8;
        bytes[layout::GYRO_Y_OFFSET] = self.gyro[1] as u8;
        bytes[layout::GYRO_Z_OFFSET] = self.gyro[2] as u8;
        bytes[layout::STEP_DELTA_OFFSET] = self.step_delta;
        bytes.extend_from_slice(&self.samples);
        bytes.push(checksum(&bytes));
        bytes
    }
}

/// Decode the reference header and samples. Framing byte and checksum are
/// not judged here; the decoder turns them into status codes.
pub fn parse_reference_frame(bytes: &[u8]) -> Result<ReferenceFrame, FrameError> {
    let reader = FrameReader::new(bytes);
    reader.require_len(MIN_FRAME_LEN)?;

    let flags = reader.read_u8(layout::FLAGS_OFFSET)?;
    let centi = reader.read_i16_le(layout::TEMPERATURE_RANGE)?;
    let samples = reader.read_slice(layout::SAMPLES_OFFSET..bytes.len() - CHECKSUM_LEN)?;

    Ok(ReferenceFrame {
        timestamp: reader.read_u32_le(layout::TIMESTAMP_RANGE)?,
        is_wearing: flags & layout::WEARING_MASK != 0,
        pose: (flags >> layout::POSE_SHIFT) & layout::POSE_MASK,
        heart_rate: reader.read_u8(layout::HEART_RATE_OFFSET)?,
        breath_rate: reader.read_u8(layout::BREATH_RATE_OFFSET)?,
        temperature: f64::from(centi) / layout::TEMPERATURE_SCALE,
        humidity: reader.read_u8(layout::HUMIDITY_OFFSET)?,
        power: reader.read_u8(layout::POWER_OFFSET)?,
        gyro: [
            reader.read_i8(layout::GYRO_X_OFFSET)?,
            reader.read_i8(layout::GYRO_Y_OFFSET)?,
            reader.read_i8(layout::GYRO_Z_OFFSET)?,
        ],
        step_delta: reader.read_u8(layout::STEP_DELTA_OFFSET)?,
        samples: samples.to_vec(),
    })
}
