use super::error::FrameError;
use super::layout;

/// Bounded reader over a frame's bytes.
///
/// Every read is checked; out-of-range access reports the length that would
/// have been required instead of panicking.
pub struct FrameReader<'a> {
    bytes: &'a [u8],
}

impl<'a> FrameReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn require_len(&self, required: usize) -> Result<(), FrameError> {
        if self.bytes.len() < required {
            return Err(FrameError::TooShort {
                actual: self.bytes.len(),
                required,
            });
        }
        Ok(())
    }

    pub fn read_u8(&self, offset: usize) -> Result<u8, FrameError> {
        self.bytes.get(offset).copied().ok_or(FrameError::TooShort {
            actual: self.bytes.len(),
            required: offset + 1,
        })
    }

    pub fn read_i8(&self, offset: usize) -> Result<i8, FrameError> {
        self.read_u8(offset).map(|b| b as i8)
    }

    pub fn read_u16_le(&self, range: std::ops::Range<usize>) -> Result<u16, FrameError> {
        let bytes = self.read_slice(range)?;
        match bytes {
            [lo, hi] => Ok(u16::from_le_bytes([*lo, *hi])),
            _ => Err(FrameError::TooShort {
                actual: bytes.len(),
                required: 2,
            }),
        }
    }

    pub fn read_i16_le(&self, range: std::ops::Range<usize>) -> Result<i16, FrameError> {
        self.read_u16_le(range).map(|v| v as i16)
    }

    pub fn read_u32_le(&self, range: std::ops::Range<usize>) -> Result<u32, FrameError> {
        let bytes = self.read_slice(range)?;
        match bytes {
            [a, b, c, d] => Ok(u32::from_le_bytes([*a, *b, *c, *d])),
            _ => Err(FrameError::TooShort {
                actual: bytes.len(),
                required: 4,
            }),
        }
    }

    pub fn read_slice(&self, range: std::ops::Range<usize>) -> Result<&'a [u8], FrameError> {
        self.bytes.get(range.clone()).ok_or(FrameError::TooShort {
            actual: self.bytes.len(),
            required: range.end,
        })
    }

    pub fn read_framing_byte(&self) -> Result<u8, FrameError> {
        self.read_u8(layout::FRAMING_BYTE_OFFSET)
    }

    /// Trailing checksum byte.
    pub fn read_checksum(&self) -> Result<u8, FrameError> {
        self.require_len(layout::CHECKSUM_LEN)?;
        self.read_u8(self.bytes.len() - layout::CHECKSUM_LEN)
    }

    /// Every byte covered by the checksum (all but the trailing one).
    pub fn checksummed(&self) -> Result<&'a [u8], FrameError> {
        self.require_len(layout::CHECKSUM_LEN)?;
        self.read_slice(0..self.bytes.len() - layout::CHECKSUM_LEN)
    }
}

/// Wrapping byte sum used as the frame checksum.
///
/// # Examples
/// ```
/// use healthbridge_core::frame::checksum;
///
/// assert_eq!(checksum(&[0xFF, 0x02]), 0x01);
/// ```
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}
