/// Smallest frame the decoding protocol can read a framing byte, checksum and
/// payload header from.
pub const MIN_FRAME_LEN: usize = 17;

pub const FRAMING_BYTE_OFFSET: usize = 0;
pub const FRAMING_BYTE: u8 = 0xFF;

/// The checksum occupies the final byte of every frame.
pub const CHECKSUM_LEN: usize = 1;
