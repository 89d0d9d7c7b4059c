use thiserror::Error;

/// Errors returned by frame validation and bounded reads.
///
/// # Examples
/// ```
/// use healthbridge_core::frame::FrameError;
///
/// let err = FrameError::TooShort { actual: 4, required: 17 };
/// assert!(err.to_string().contains("less than required 17"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    #[error("received empty data array")]
    Empty,
    #[error("data length {actual} is less than required {required} bytes")]
    TooShort { actual: usize, required: usize },
}
