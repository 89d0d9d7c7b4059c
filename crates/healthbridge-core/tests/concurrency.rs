use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use healthbridge_core::decoder::ReferenceFrame;
use healthbridge_core::{
    Decoder, DecoderError, Dispatcher, SessionRegistry, Telemetry, TypeTarget,
};

/// Shared counters observed by every probe decoder of one test.
#[derive(Default)]
struct Probe {
    constructed: AtomicUsize,
    active: AtomicUsize,
    peak: AtomicUsize,
    modes: Mutex<Vec<i32>>,
    /// Decoder mode at entry and exit of every `consume`.
    spans: Mutex<Vec<(i32, i32)>>,
}

struct ProbeDecoder {
    mode: i32,
    probe: Arc<Probe>,
    wait_for_peer: bool,
    telemetry: Telemetry,
}

impl Decoder for ProbeDecoder {
    fn consume(&mut self, _frame: &[u8]) -> Result<i32, DecoderError> {
        let entry_mode = self.mode;
        let now = self.probe.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.probe.peak.fetch_max(now, Ordering::SeqCst);

        if self.wait_for_peer {
            let deadline = Instant::now() + Duration::from_secs(2);
            while self.probe.active.load(Ordering::SeqCst) < 2 && Instant::now() < deadline {
                thread::sleep(Duration::from_millis(1));
            }
            self.probe.peak.fetch_max(self.probe.active.load(Ordering::SeqCst), Ordering::SeqCst);
        } else {
            thread::sleep(Duration::from_millis(5));
        }

        self.telemetry.step_count += 1;
        self.probe
            .spans
            .lock()
            .expect("spans lock")
            .push((entry_mode, self.mode));
        self.probe.active.fetch_sub(1, Ordering::SeqCst);
        Ok(-1)
    }

    fn mode(&self) -> i32 {
        self.mode
    }

    fn set_mode(&mut self, mode: i32) {
        self.mode = mode;
    }

    fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }
}

fn probe_factory(
    probe: &Arc<Probe>,
    wait_for_peer: bool,
) -> impl Fn(i32) -> ProbeDecoder + Send + Sync + use<> {
    let probe = Arc::clone(probe);
    move |mode| {
        probe.constructed.fetch_add(1, Ordering::SeqCst);
        probe.modes.lock().expect("modes lock").push(mode);
        thread::sleep(Duration::from_millis(10));
        ProbeDecoder {
            mode,
            probe: Arc::clone(&probe),
            wait_for_peer,
            telemetry: Telemetry::default(),
        }
    }
}

fn frame() -> Vec<u8> {
    ReferenceFrame::default().encode()
}

#[test]
fn concurrent_first_use_constructs_one_decoder() {
    let probe = Arc::new(Probe::default());
    let registry = Arc::new(SessionRegistry::new(probe_factory(&probe, false)));
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));

    let sessions: Vec<_> = (0..threads)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.get_or_create("A", None)
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|handle| handle.join().expect("worker"))
        .collect();

    assert_eq!(probe.constructed.load(Ordering::SeqCst), 1);
    assert!(sessions.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
    assert_eq!(registry.len(), 1);
}

#[test]
fn same_device_decodes_never_overlap() {
    let probe = Arc::new(Probe::default());
    let registry = Arc::new(SessionRegistry::new(probe_factory(&probe, false)));
    let dispatcher = Dispatcher::new(registry);
    let threads = 6;
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|_| {
            let dispatcher = dispatcher.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..5 {
                    dispatcher.dispatch("A", &frame(), None).expect("dispatch");
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker");
    }

    assert_eq!(probe.peak.load(Ordering::SeqCst), 1);
    let session = dispatcher.registry().get("A").expect("session");
    assert_eq!(session.lock().telemetry().step_count, 30);
}

#[test]
fn different_devices_decode_in_parallel() {
    let probe = Arc::new(Probe::default());
    let registry = Arc::new(SessionRegistry::new(probe_factory(&probe, true)));
    let dispatcher = Dispatcher::new(registry);
    let barrier = Arc::new(Barrier::new(2));

    let handles: Vec<_> = ["A", "B"]
        .into_iter()
        .map(|device_id| {
            let dispatcher = dispatcher.clone();
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                dispatcher.dispatch(device_id, &frame(), None).expect("dispatch")
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker");
    }

    assert_eq!(probe.peak.load(Ordering::SeqCst), 2);
    assert_eq!(probe.constructed.load(Ordering::SeqCst), 2);
}

#[test]
fn lookup_is_not_blocked_by_another_devices_decode() {
    let probe = Arc::new(Probe::default());
    let registry = Arc::new(SessionRegistry::new(probe_factory(&probe, false)));
    let busy = registry.get_or_create("A", None);

    let guard = busy.lock();
    let other = Arc::clone(&registry);
    let handle = thread::spawn(move || {
        let session = other.get_or_create("B", None);
        other.dispose("B");
        session.generation()
    });
    let generation = handle.join().expect("worker");
    assert!(busy.is_processing());
    drop(guard);
    assert!(!busy.is_processing());

    assert!(generation > busy.generation());
    assert_eq!(registry.device_ids(), vec!["A".to_string()]);
}

#[test]
fn set_type_reaches_new_devices() {
    let probe = Arc::new(Probe::default());
    let registry = Arc::new(SessionRegistry::new(probe_factory(&probe, false)));
    let dispatcher = Dispatcher::new(Arc::clone(&registry));

    registry.set_default_type(5);
    let snapshot = dispatcher.dispatch("B", &frame(), None).expect("dispatch");

    assert_eq!(snapshot.mode, 5);
    assert_eq!(*probe.modes.lock().expect("modes lock"), vec![5]);
}

#[test]
fn type_change_waits_for_the_device_lock() {
    let probe = Arc::new(Probe::default());
    let registry = Arc::new(SessionRegistry::new(probe_factory(&probe, false)));
    let session = registry.get_or_create("A", None);

    let guard = session.lock();
    let applied = Arc::new(AtomicBool::new(false));
    let worker = {
        let registry = Arc::clone(&registry);
        let applied = Arc::clone(&applied);
        thread::spawn(move || {
            let updated = registry.propagate_type(7, TypeTarget::All);
            applied.store(true, Ordering::SeqCst);
            updated
        })
    };

    thread::sleep(Duration::from_millis(50));
    assert!(!applied.load(Ordering::SeqCst));
    assert_eq!(session.mode(), 3);
    assert_eq!(guard.mode(), 3);
    drop(guard);

    let updated = worker.join().expect("worker");
    assert_eq!(updated, vec!["A".to_string()]);
    assert!(applied.load(Ordering::SeqCst));
    assert_eq!(session.mode(), 7);
    assert_eq!(session.lock().mode(), 7);
}

#[test]
fn type_changes_never_land_mid_decode() {
    let probe = Arc::new(Probe::default());
    let registry = Arc::new(SessionRegistry::new(probe_factory(&probe, false)));
    let dispatcher = Dispatcher::new(Arc::clone(&registry));
    dispatcher.dispatch("A", &frame(), None).expect("dispatch");

    let decoding = {
        let dispatcher = dispatcher.clone();
        thread::spawn(move || {
            for _ in 0..20 {
                dispatcher.dispatch("A", &frame(), None).expect("dispatch");
            }
        })
    };
    for mode in 10..30 {
        registry.propagate_type(mode, TypeTarget::Device("A"));
        thread::sleep(Duration::from_millis(2));
    }
    decoding.join().expect("decoder thread");

    let spans = probe.spans.lock().expect("spans lock");
    assert_eq!(spans.len(), 21);
    assert!(
        spans.iter().all(|(entry, exit)| entry == exit),
        "mode changed during a decode: {spans:?}"
    );
    assert_eq!(registry.get("A").expect("session").mode(), 29);
}
