use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use parking_lot::{Mutex, MutexGuard};

use crate::decoder::Decoder;

/// One device's decoder together with its dedicated lock.
///
/// The mutex is the per-device serialization point: at most one decode is in
/// flight per session. `processing` is raised for exactly as long as a
/// [`DecoderGuard`] is alive.
#[derive(Debug)]
pub struct DeviceSession<D> {
    device_id: String,
    generation: u64,
    mode: AtomicI32,
    processing: AtomicBool,
    decoder: Mutex<D>,
}

impl<D: Decoder> DeviceSession<D> {
    pub(crate) fn new(device_id: &str, generation: u64, decoder: D) -> Self {
        Self {
            device_id: device_id.to_string(),
            generation,
            mode: AtomicI32::new(decoder.mode()),
            processing: AtomicBool::new(false),
            decoder: Mutex::new(decoder),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Registry-wide creation counter; a session recreated after disposal
    /// always has a larger generation than the one it replaces.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Mode last applied to the decoder. Readable without waiting on an
    /// in-flight decode.
    pub fn mode(&self) -> i32 {
        self.mode.load(Ordering::Acquire)
    }

    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::Acquire)
    }

    /// Block until this device's decoder is free, then hold it exclusively.
    pub fn lock(&self) -> DecoderGuard<'_, D> {
        let guard = self.decoder.lock();
        self.processing.store(true, Ordering::Release);
        DecoderGuard {
            guard,
            processing: &self.processing,
        }
    }

    /// Change the decoder mode under the device lock, so it never flips
    /// mid-decode. Does not raise `processing`, which covers decodes only.
    pub fn set_mode(&self, mode: i32) {
        let mut decoder = self.decoder.lock();
        decoder.set_mode(mode);
        self.mode.store(mode, Ordering::Release);
    }
}

/// Exclusive access to a session's decoder.
pub struct DecoderGuard<'a, D> {
    guard: MutexGuard<'a, D>,
    processing: &'a AtomicBool,
}

impl<D> Deref for DecoderGuard<'_, D> {
    type Target = D;

    fn deref(&self) -> &D {
        &self.guard
    }
}

impl<D> DerefMut for DecoderGuard<'_, D> {
    fn deref_mut(&mut self) -> &mut D {
        &mut self.guard
    }
}

impl<D> Drop for DecoderGuard<'_, D> {
    fn drop(&mut self) {
        self.processing.store(false, Ordering::Release);
    }
}
