use serde::{Deserialize, Serialize};

pub const STATUS_SUCCESS: i32 = -1;
pub const STATUS_FIRST_BYTE_MISMATCH: i32 = 101;
pub const STATUS_CHECKSUM_MISMATCH: i32 = 102;

/// Classified decoder status code. Never an error on its own.
///
/// # Examples
/// ```
/// use healthbridge_core::decoder::DecodeStatus;
///
/// assert_eq!(DecodeStatus::from_code(-1), DecodeStatus::Success);
/// assert_eq!(DecodeStatus::from_code(7), DecodeStatus::Unknown(7));
/// assert_eq!(DecodeStatus::ChecksumMismatch.code(), 102);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeStatus {
    Success,
    /// First byte was not the framing byte.
    FirstByteMismatch,
    ChecksumMismatch,
    Unknown(i32),
}

impl DecodeStatus {
    pub fn from_code(code: i32) -> Self {
        match code {
            STATUS_SUCCESS => DecodeStatus::Success,
            STATUS_FIRST_BYTE_MISMATCH => DecodeStatus::FirstByteMismatch,
            STATUS_CHECKSUM_MISMATCH => DecodeStatus::ChecksumMismatch,
            other => DecodeStatus::Unknown(other),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            DecodeStatus::Success => STATUS_SUCCESS,
            DecodeStatus::FirstByteMismatch => STATUS_FIRST_BYTE_MISMATCH,
            DecodeStatus::ChecksumMismatch => STATUS_CHECKSUM_MISMATCH,
            DecodeStatus::Unknown(code) => code,
        }
    }

    pub fn is_success(self) -> bool {
        self == DecodeStatus::Success
    }
}
