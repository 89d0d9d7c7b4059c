use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{FrameEvent, FrameSource, SourceError};

/// One capture line: `{"device_id": "A", "frame": "ff01...", "type": 3}`.
///
/// # Examples
/// ```
/// use healthbridge_core::CaptureRecord;
///
/// let record = CaptureRecord::new("A", &[0xFF, 0x01], None);
/// assert_eq!(record.to_line().unwrap(), r#"{"device_id":"A","frame":"ff01"}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureRecord {
    pub device_id: String,
    /// Frame bytes, hex encoded.
    pub frame: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<i32>,
}

impl CaptureRecord {
    pub fn new(device_id: &str, frame: &[u8], mode: Option<i32>) -> Self {
        Self {
            device_id: device_id.to_string(),
            frame: hex::encode(frame),
            mode,
        }
    }

    pub fn to_line(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Reads frames from a JSON-lines capture. Blank lines are skipped.
pub struct JsonLinesSource<R> {
    reader: R,
    line: usize,
    buf: String,
}

impl JsonLinesSource<BufReader<File>> {
    pub fn open(path: &Path) -> Result<Self, SourceError> {
        let file = File::open(path)?;
        Ok(Self::from_reader(BufReader::new(file)))
    }
}

impl<R: BufRead> JsonLinesSource<R> {
    pub fn from_reader(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }
}

impl<R: BufRead> FrameSource for JsonLinesSource<R> {
    fn next_frame(&mut self) -> Result<Option<FrameEvent>, SourceError> {
        loop {
            self.buf.clear();
            if self.reader.read_line(&mut self.buf)? == 0 {
                return Ok(None);
            }
            self.line += 1;
            let trimmed = self.buf.trim();
            if trimmed.is_empty() {
                continue;
            }
            return parse_record(trimmed, self.line).map(Some);
        }
    }
}

fn parse_record(text: &str, line: usize) -> Result<FrameEvent, SourceError> {
    let record: CaptureRecord = serde_json::from_str(text).map_err(|e| SourceError::Parse {
        line,
        message: e.to_string(),
    })?;
    let frame = hex::decode(record.frame.trim()).map_err(|e| SourceError::Parse {
        line,
        message: format!("invalid frame hex: {e}"),
    })?;
    Ok(FrameEvent {
        device_id: record.device_id,
        frame,
        mode: record.mode,
    })
}
