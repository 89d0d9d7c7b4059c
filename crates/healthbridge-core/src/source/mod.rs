mod jsonl;

pub use jsonl::{CaptureRecord, JsonLinesSource};

use thiserror::Error;

/// One recorded frame addressed to a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameEvent {
    pub device_id: String,
    pub frame: Vec<u8>,
    pub mode: Option<i32>,
}

pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<FrameEvent>, SourceError>;
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("capture parse error (line {line}): {message}")]
    Parse { line: usize, message: String },
}
