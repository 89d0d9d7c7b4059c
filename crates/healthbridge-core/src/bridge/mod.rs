//! Method-call bridge.
//!
//! [`HealthBridge`] is the composition root: it owns the session registry
//! (there is no process-global instance) and exposes the operations the
//! application layer calls by name. Arguments arrive optional, as they do
//! over a platform channel; required ones are checked here and reported as
//! `INVALID_ARGUMENT`.
//!
//! Wire form, one JSON object per call:
//!
//! ```json
//! {"method": "splitPackage", "device_id": "A", "data": [255, 1, 2]}
//! ```
//!
//! answered by `{"result": ...}` or `{"error": {"code": ..., "message": ...}}`.

mod error;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::TelemetrySnapshot;
use crate::decoder::DecoderFactory;
use crate::dispatch::{DispatchError, Dispatcher};
use crate::registry::{SessionRegistry, StatusReport, TypeTarget};

pub use error::{
    BridgeError, CODE_EMPTY_DATA, CODE_INSUFFICIENT_DATA, CODE_INVALID_ARGUMENT,
    CODE_INVALID_CALL, CODE_NOT_IMPLEMENTED, CODE_SDK_ERROR, ErrorReply,
};

const METHODS: [&str; 5] = ["initialize", "setType", "splitPackage", "getStatus", "dispose"];

/// A named call with the arguments the caller supplied.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "camelCase")]
pub enum MethodCall {
    Initialize {
        #[serde(rename = "type")]
        mode: Option<i32>,
    },
    SetType {
        #[serde(rename = "type")]
        mode: Option<i32>,
        device_id: Option<String>,
    },
    SplitPackage {
        device_id: Option<String>,
        data: Option<Vec<u8>>,
        #[serde(rename = "type")]
        mode: Option<i32>,
    },
    GetStatus {
        device_id: Option<String>,
    },
    Dispose {
        device_id: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Reply {
    Ack(String),
    Snapshot(Box<TelemetrySnapshot>),
    Status(StatusReport),
}

/// Outcome of one call as written back to the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Envelope {
    Result(Reply),
    Error(ErrorReply),
}

impl From<Result<Reply, BridgeError>> for Envelope {
    fn from(value: Result<Reply, BridgeError>) -> Self {
        match value {
            Ok(reply) => Envelope::Result(reply),
            Err(err) => Envelope::Error(err.to_reply()),
        }
    }
}

pub struct HealthBridge<F: DecoderFactory> {
    dispatcher: Dispatcher<F>,
}

impl<F: DecoderFactory> Clone for HealthBridge<F> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: self.dispatcher.clone(),
        }
    }
}

impl<F: DecoderFactory> HealthBridge<F> {
    pub fn new(factory: F) -> Self {
        Self::from_registry(Arc::new(SessionRegistry::new(factory)))
    }

    pub fn with_default_type(factory: F, default_type: i32) -> Self {
        Self::from_registry(Arc::new(SessionRegistry::with_default_type(
            factory,
            default_type,
        )))
    }

    pub fn from_registry(registry: Arc<SessionRegistry<F>>) -> Self {
        Self {
            dispatcher: Dispatcher::new(registry),
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher<F> {
        &self.dispatcher
    }

    pub fn registry(&self) -> &SessionRegistry<F> {
        self.dispatcher.registry()
    }

    /// Record the mode for lazily created decoders. No session is built.
    pub fn initialize(&self, mode: i32) -> String {
        self.registry().set_default_type(mode);
        info!(mode, "bridge initialized");
        format!("Default type set to {mode}")
    }

    /// Update the default mode and push it to existing decoders: to
    /// `device_id` alone when it has a session, to every session when no id
    /// is given. An id without a session only changes the default.
    pub fn set_type(&self, mode: i32, device_id: Option<&str>) -> String {
        let registry = self.registry();
        registry.set_default_type(mode);
        match device_id {
            Some(device_id) => {
                let updated = registry.propagate_type(mode, TypeTarget::Device(device_id));
                if updated.is_empty() {
                    debug!(device_id, mode, "no session to update, default changed only");
                    format!("Default type set to {mode}; no active session for device {device_id}")
                } else {
                    format!("Type set to {mode} for device {device_id}")
                }
            }
            None => {
                let updated = registry.propagate_type(mode, TypeTarget::All);
                info!(mode, devices = updated.len(), "type updated for all devices");
                format!("Default type set to {mode}")
            }
        }
    }

    pub fn split_package(
        &self,
        device_id: &str,
        data: &[u8],
        mode: Option<i32>,
    ) -> Result<TelemetrySnapshot, DispatchError> {
        self.dispatcher.dispatch(device_id, data, mode)
    }

    pub fn dispose(&self, device_id: Option<&str>) -> String {
        match device_id {
            Some(device_id) => {
                self.registry().dispose(device_id);
                format!("Disposed device {device_id}")
            }
            None => {
                let count = self.registry().dispose_all();
                format!("Disposed all {count} devices")
            }
        }
    }

    pub fn status(&self, device_id: Option<&str>) -> StatusReport {
        self.registry().status(device_id)
    }

    /// Execute a call, checking required arguments first.
    pub fn handle(&self, call: MethodCall) -> Result<Reply, BridgeError> {
        match call {
            MethodCall::Initialize { mode } => {
                let mode = mode.ok_or(BridgeError::MissingArgument { name: "type" })?;
                Ok(Reply::Ack(self.initialize(mode)))
            }
            MethodCall::SetType { mode, device_id } => {
                let mode = mode.ok_or(BridgeError::MissingArgument { name: "type" })?;
                Ok(Reply::Ack(self.set_type(mode, device_id.as_deref())))
            }
            MethodCall::SplitPackage {
                device_id,
                data,
                mode,
            } => {
                let data = data.ok_or(BridgeError::MissingArgument { name: "data" })?;
                let device_id =
                    device_id.ok_or(BridgeError::MissingArgument { name: "device_id" })?;
                let snapshot = self.split_package(&device_id, &data, mode)?;
                Ok(Reply::Snapshot(Box::new(snapshot)))
            }
            MethodCall::GetStatus { device_id } => {
                Ok(Reply::Status(self.status(device_id.as_deref())))
            }
            MethodCall::Dispose { device_id } => {
                Ok(Reply::Ack(self.dispose(device_id.as_deref())))
            }
        }
    }

    /// Parse and execute one JSON call. Never fails; errors become an
    /// [`Envelope::Error`].
    pub fn handle_json(&self, line: &str) -> Envelope {
        parse_call(line).and_then(|call| self.handle(call)).into()
    }
}

/// Parse a wire call, telling unknown methods apart from malformed ones.
pub fn parse_call(line: &str) -> Result<MethodCall, BridgeError> {
    let value: serde_json::Value =
        serde_json::from_str(line).map_err(|e| BridgeError::InvalidCall(e.to_string()))?;
    let method = value
        .get("method")
        .and_then(|m| m.as_str())
        .ok_or_else(|| BridgeError::InvalidCall("missing 'method'".to_string()))?;
    if !METHODS.contains(&method) {
        return Err(BridgeError::NotImplemented(method.to_string()));
    }
    serde_json::from_value(value).map_err(|e| BridgeError::InvalidCall(e.to_string()))
}
