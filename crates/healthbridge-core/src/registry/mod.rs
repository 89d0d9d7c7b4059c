//! Per-device session registry.
//!
//! Maps device ids to [`DeviceSession`]s. The map lock only guards structural
//! changes and lookups; decoders are constructed and driven outside of it, so
//! a slow first frame or a long decode on one device never stalls another.
//!
//! Each map entry is a once-cell slot. The slot is inserted under the write
//! lock, and the decoder is built afterwards through the slot, which
//! guarantees a single construction per device even when several threads see
//! the device for the first time at once.

mod session;
mod status;

use std::collections::HashMap;
use std::sync::atomic::{AtomicI32, AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::decoder::DecoderFactory;

pub use session::{DecoderGuard, DeviceSession};
pub use status::{DeviceStatus, RegistryStatus, StatusReport};

/// Mode applied to new decoders until told otherwise.
pub const DEFAULT_DECODER_TYPE: i32 = 3;

type Slot<D> = Arc<OnceLock<Arc<DeviceSession<D>>>>;

/// Which existing sessions a mode change is pushed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TypeTarget<'a> {
    Device(&'a str),
    All,
}

pub struct SessionRegistry<F: DecoderFactory> {
    factory: F,
    default_type: AtomicI32,
    next_generation: AtomicU64,
    sessions: RwLock<HashMap<String, Slot<F::Decoder>>>,
}

impl<F: DecoderFactory> SessionRegistry<F> {
    pub fn new(factory: F) -> Self {
        Self::with_default_type(factory, DEFAULT_DECODER_TYPE)
    }

    pub fn with_default_type(factory: F, default_type: i32) -> Self {
        Self {
            factory,
            default_type: AtomicI32::new(default_type),
            next_generation: AtomicU64::new(1),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn default_type(&self) -> i32 {
        self.default_type.load(Ordering::Acquire)
    }

    /// Set the mode for decoders created from now on. Existing decoders keep
    /// theirs; see [`SessionRegistry::propagate_type`].
    pub fn set_default_type(&self, mode: i32) {
        self.default_type.store(mode, Ordering::Release);
        debug!(mode, "default decoder type updated");
    }

    /// Return the device's session, creating it on first use.
    ///
    /// `mode` only matters for creation and falls back to the default type.
    /// If the factory panics, the panic propagates and the empty slot is
    /// removed again, so the device stays absent.
    pub fn get_or_create(
        &self,
        device_id: &str,
        mode: Option<i32>,
    ) -> Arc<DeviceSession<F::Decoder>> {
        let slot = self.slot(device_id);
        let _abandoned = AbandonedSlot {
            sessions: &self.sessions,
            device_id,
            slot: &slot,
        };
        slot.get_or_init(|| {
            let mode = mode.unwrap_or_else(|| self.default_type());
            let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
            info!(device_id, mode, generation, "creating decoder session");
            Arc::new(DeviceSession::new(
                device_id,
                generation,
                self.factory.construct(mode),
            ))
        })
        .clone()
    }

    fn slot(&self, device_id: &str) -> Slot<F::Decoder> {
        if let Some(slot) = self.sessions.read().get(device_id) {
            return Arc::clone(slot);
        }
        let mut sessions = self.sessions.write();
        Arc::clone(sessions.entry(device_id.to_string()).or_default())
    }

    /// Existing session, without creating one.
    pub fn get(&self, device_id: &str) -> Option<Arc<DeviceSession<F::Decoder>>> {
        self.sessions
            .read()
            .get(device_id)
            .and_then(|slot| slot.get().cloned())
    }

    /// Push `mode` to existing decoders, each under its own device lock.
    /// Returns the ids that were updated, sorted.
    pub fn propagate_type(&self, mode: i32, target: TypeTarget<'_>) -> Vec<String> {
        let targets: Vec<_> = match target {
            TypeTarget::Device(device_id) => self.get(device_id).into_iter().collect(),
            TypeTarget::All => self.live_sessions().collect(),
        };

        let mut updated: Vec<String> = targets
            .into_iter()
            .map(|session| {
                session.set_mode(mode);
                debug!(device_id = session.device_id(), mode, "decoder type updated");
                session.device_id().to_string()
            })
            .collect();
        updated.sort();
        updated
    }

    /// Remove the device's session. Absent ids are a no-op.
    pub fn dispose(&self, device_id: &str) -> bool {
        let removed = self.sessions.write().remove(device_id);
        match removed {
            Some(_) => {
                info!(device_id, "disposed decoder session");
                true
            }
            None => {
                debug!(device_id, "dispose requested for unknown device");
                false
            }
        }
    }

    /// Empty the registry and return how many sessions were dropped.
    ///
    /// Callers already holding a session keep using it; only new lookups miss.
    pub fn dispose_all(&self) -> usize {
        let drained = std::mem::take(&mut *self.sessions.write());
        let count = drained.len();
        drop(drained);
        info!(count, "disposed all decoder sessions");
        count
    }

    /// Number of devices with a constructed decoder.
    pub fn len(&self) -> usize {
        self.sessions
            .read()
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids of devices with a constructed decoder, sorted. Slots still under
    /// construction are left out.
    pub fn device_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .sessions
            .read()
            .iter()
            .filter(|(_, slot)| slot.get().is_some())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn status(&self, device_id: Option<&str>) -> StatusReport {
        match device_id {
            Some(device_id) => StatusReport::Device(self.device_status(device_id)),
            None => StatusReport::Registry(self.registry_status()),
        }
    }

    pub fn device_status(&self, device_id: &str) -> DeviceStatus {
        match self.get(device_id) {
            Some(session) => DeviceStatus {
                device_id: device_id.to_string(),
                has_instance: true,
                is_processing: session.is_processing(),
                mode: Some(session.mode()),
                generation: Some(session.generation()),
            },
            None => DeviceStatus::absent(device_id),
        }
    }

    pub fn registry_status(&self) -> RegistryStatus {
        let device_ids = self.device_ids();
        let mut processing_devices: Vec<String> = self
            .live_sessions()
            .filter(|session| session.is_processing())
            .map(|session| session.device_id().to_string())
            .collect();
        processing_devices.sort();

        RegistryStatus {
            total_instances: device_ids.len(),
            device_ids,
            processing_devices,
        }
    }

    /// Snapshot of initialized sessions; the map lock is released on return.
    fn live_sessions(&self) -> impl Iterator<Item = Arc<DeviceSession<F::Decoder>>> {
        let sessions: Vec<_> = self
            .sessions
            .read()
            .values()
            .filter_map(|slot| slot.get().cloned())
            .collect();
        sessions.into_iter()
    }
}

/// Removes a slot whose construction never completed, on the way out of
/// [`SessionRegistry::get_or_create`].
struct AbandonedSlot<'a, D> {
    sessions: &'a RwLock<HashMap<String, Slot<D>>>,
    device_id: &'a str,
    slot: &'a Slot<D>,
}

impl<D> Drop for AbandonedSlot<'_, D> {
    fn drop(&mut self) {
        if self.slot.get().is_some() {
            return;
        }
        let mut sessions = self.sessions.write();
        let still_empty = sessions
            .get(self.device_id)
            .is_some_and(|current| Arc::ptr_eq(current, self.slot) && current.get().is_none());
        if still_empty {
            sessions.remove(self.device_id);
            warn!(device_id = self.device_id, "decoder construction failed");
        }
    }
}
