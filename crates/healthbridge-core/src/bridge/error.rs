use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dispatch::DispatchError;
use crate::frame::FrameError;

pub const CODE_INVALID_ARGUMENT: &str = "INVALID_ARGUMENT";
pub const CODE_EMPTY_DATA: &str = "EMPTY_DATA";
pub const CODE_INSUFFICIENT_DATA: &str = "INSUFFICIENT_DATA";
pub const CODE_SDK_ERROR: &str = "SDK_ERROR";
pub const CODE_INVALID_CALL: &str = "INVALID_CALL";
pub const CODE_NOT_IMPLEMENTED: &str = "NOT_IMPLEMENTED";

/// Errors surfaced to the calling layer, each with a stable code.
///
/// # Examples
/// ```
/// use healthbridge_core::bridge::BridgeError;
///
/// let err = BridgeError::MissingArgument { name: "type" };
/// assert_eq!(err.code(), "INVALID_ARGUMENT");
/// ```
#[derive(Debug, Error)]
pub enum BridgeError {
    #[error("required argument missing: '{name}'")]
    MissingArgument { name: &'static str },
    #[error(transparent)]
    Dispatch(#[from] DispatchError),
    #[error("invalid method call: {0}")]
    InvalidCall(String),
    #[error("method not implemented: {0}")]
    NotImplemented(String),
}

impl BridgeError {
    pub fn code(&self) -> &'static str {
        match self {
            BridgeError::MissingArgument { .. } => CODE_INVALID_ARGUMENT,
            BridgeError::Dispatch(DispatchError::Frame(FrameError::Empty)) => CODE_EMPTY_DATA,
            BridgeError::Dispatch(DispatchError::Frame(FrameError::TooShort { .. })) => {
                CODE_INSUFFICIENT_DATA
            }
            BridgeError::Dispatch(DispatchError::DecodeFailure { .. }) => CODE_SDK_ERROR,
            BridgeError::InvalidCall(_) => CODE_INVALID_CALL,
            BridgeError::NotImplemented(_) => CODE_NOT_IMPLEMENTED,
        }
    }

    pub fn to_reply(&self) -> ErrorReply {
        ErrorReply {
            code: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

/// Wire form of a [`BridgeError`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorReply {
    pub code: String,
    pub message: String,
}
