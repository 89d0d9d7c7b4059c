use super::error::FrameError;
use super::layout;
use super::reader::{FrameReader, checksum};

/// A frame that passed length validation.
///
/// Framing byte and checksum are extracted up front; whether they are
/// *correct* is for the decoder to report through its status code.
#[derive(Debug, Clone, Copy)]
pub struct Frame<'a> {
    bytes: &'a [u8],
    framing_byte: u8,
    checksum: u8,
    computed_checksum: u8,
}

impl<'a> Frame<'a> {
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn framing_byte(&self) -> u8 {
        self.framing_byte
    }

    pub fn has_framing_byte(&self) -> bool {
        self.framing_byte == layout::FRAMING_BYTE
    }

    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    pub fn checksum_matches(&self) -> bool {
        self.checksum == self.computed_checksum
    }
}

/// Validate a frame before dispatch.
///
/// Fails fast on empty input, then on input shorter than
/// [`layout::MIN_FRAME_LEN`]. No other property is checked here.
///
/// # Examples
/// ```
/// use healthbridge_core::frame::{FrameError, validate_frame};
///
/// assert_eq!(validate_frame(&[]).unwrap_err(), FrameError::Empty);
/// let frame = validate_frame(&[0xFF; 17]).unwrap();
/// assert!(frame.has_framing_byte());
/// ```
pub fn validate_frame(bytes: &[u8]) -> Result<Frame<'_>, FrameError> {
    let reader = FrameReader::new(bytes);
    if reader.is_empty() {
        return Err(FrameError::Empty);
    }
    reader.require_len(layout::MIN_FRAME_LEN)?;

    let framing_byte = reader.read_framing_byte()?;
    let checksum_byte = reader.read_checksum()?;
    let computed_checksum = checksum(reader.checksummed()?);

    Ok(Frame {
        bytes,
        framing_byte,
        checksum: checksum_byte,
        computed_checksum,
    })
}
