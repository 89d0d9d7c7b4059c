//! Telemetry frame validation.
//!
//! Frames are opaque to the bridge apart from three facts: a minimum length,
//! a leading framing byte and a trailing checksum byte. Those facts are
//! enough to reject malformed input before any device session is touched.
//!
//! Layered like the rest of the crate:
//! - `layout`: offsets and boundary constants (source of truth)
//! - `reader`: bounded byte access and checksum convention
//! - `parser`: fail-fast validation into a borrowed [`Frame`]
//! - `error`: explicit, actionable errors (actual vs. required length)

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use error::FrameError;
pub use parser::{Frame, validate_frame};
pub use reader::{FrameReader, checksum};
