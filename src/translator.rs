//! # translator
//!
//! The runtime pipeline: a background worker thread that pulls frames from
//! a source endpoint, rewrites them through a translation table, and pushes
//! the result to a target endpoint — fanning out lifecycle events to
//! registered observers along the way.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use log::{debug, error, warn};

use crate::endpoint::Endpoint;
use crate::errors::ListenerError;
use crate::event::{Event, EventKind};
use crate::fuzzing::FuzzingStrategy;
use crate::table::TranslationTable;

const RECEIVE_TIMEOUT: Duration = Duration::from_millis(100);
const ERROR_BACKOFF: Duration = Duration::from_millis(500);
const STOP_JOIN_TIMEOUT: Duration = Duration::from_secs(5);

type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Default)]
struct Listeners {
    received: Vec<Listener>,
    translated: Vec<Listener>,
    sent: Vec<Listener>,
    unknown: Vec<Listener>,
}

impl Listeners {
    /// Clones the `Listener` handles for `kind` into an owned `Vec` — cheap
    /// (an `Arc` bump per entry) and lets callers fan out without holding
    /// the registry lock across the callbacks.
    fn snapshot(&self, kind: EventKind) -> Vec<Listener> {
        match kind {
            EventKind::Received => self.received.clone(),
            EventKind::Translated => self.translated.clone(),
            EventKind::Sent => self.sent.clone(),
            EventKind::Unknown => self.unknown.clone(),
        }
    }
}

/// Owns a source endpoint, a target endpoint, a translation table, and a
/// fuzzing strategy, and drives the pipeline on a single background
/// OS thread. Generic over the endpoint and fuzzer capability rather than
/// over trait objects, per the concurrency model this crate targets.
pub struct Translator<S, T, F>
where
    S: Endpoint + 'static,
    T: Endpoint + 'static,
    F: FuzzingStrategy + 'static,
{
    source: Arc<S>,
    target: Arc<T>,
    fuzzer: Arc<F>,
    table: Arc<RwLock<TranslationTable>>,
    listeners: Arc<Mutex<Listeners>>,
    worker: Mutex<Option<JoinHandle<()>>>,
    stop_flag: Arc<std::sync::atomic::AtomicBool>,
}

impl<S, T, F> Translator<S, T, F>
where
    S: Endpoint + 'static,
    T: Endpoint + 'static,
    F: FuzzingStrategy + 'static,
{
    pub fn new(source: S, target: T, table: TranslationTable, fuzzer: F) -> Self {
        Self {
            source: Arc::new(source),
            target: Arc::new(target),
            fuzzer: Arc::new(fuzzer),
            table: Arc::new(RwLock::new(table)),
            listeners: Arc::new(Mutex::new(Listeners::default())),
            worker: Mutex::new(None),
            stop_flag: Arc::new(std::sync::atomic::AtomicBool::new(false)),
        }
    }

    /// Registers an observer for `event` (one of `"received"`, `"translated"`,
    /// `"sent"`, `"unknown"`).
    pub fn add_listener(
        &self,
        event: &str,
        callback: impl Fn(&Event) + Send + Sync + 'static,
    ) -> Result<(), ListenerError> {
        let kind = EventKind::parse(event).ok_or_else(|| ListenerError::BadEvent(event.to_string()))?;
        let mut listeners = self.listeners.lock().expect("listener registry lock poisoned");
        let list = match kind {
            EventKind::Received => &mut listeners.received,
            EventKind::Translated => &mut listeners.translated,
            EventKind::Sent => &mut listeners.sent,
            EventKind::Unknown => &mut listeners.unknown,
        };
        list.push(Arc::new(callback));
        Ok(())
    }

    /// Inserts or overwrites a translation entry, visible to the worker's
    /// next lookup.
    pub fn add_translation_entry(&self, entry: crate::entry::TranslationEntry) {
        self.table.write().expect("table lock poisoned").add(entry);
    }

    /// Invokes every observer registered for `kind`, in registration order.
    /// Takes a snapshot of the registry under the lock, then drops the
    /// guard before calling any observer — so a callback that itself calls
    /// `add_listener` doesn't deadlock against the non-reentrant registry
    /// lock, and a slow or blocking observer doesn't hold the lock against
    /// a concurrent producer.
    fn emit(listeners: &Arc<Mutex<Listeners>>, kind: EventKind, event: Event) {
        let snapshot = listeners
            .lock()
            .expect("listener registry lock poisoned")
            .snapshot(kind);
        for cb in &snapshot {
            let result = panic::catch_unwind(AssertUnwindSafe(|| cb(&event)));
            if result.is_err() {
                error!("observer for {kind:?} panicked");
            }
        }
    }

    /// Idempotent: opens both endpoints if needed and spawns the worker if
    /// none is running.
    pub fn start(self: &Arc<Self>) {
        let mut worker = self.worker.lock().expect("worker handle lock poisoned");
        if worker.is_some() {
            return;
        }
        if let Err(e) = self.source.open() {
            error!("failed to open source endpoint: {e}");
            return;
        }
        if let Err(e) = self.target.open() {
            error!("failed to open target endpoint: {e}");
            return;
        }
        self.stop_flag.store(false, std::sync::atomic::Ordering::SeqCst);

        let source = self.source.clone();
        let target = self.target.clone();
        let fuzzer = self.fuzzer.clone();
        let table = self.table.clone();
        let listeners = self.listeners.clone();
        let stop_flag = self.stop_flag.clone();

        *worker = Some(thread::spawn(move || {
            run_worker(source, target, fuzzer, table, listeners, stop_flag);
        }));
    }

    /// Idempotent: signals the worker to stop and waits up to 5 seconds for
    /// it to join. If it hasn't joined by then, it is abandoned (best-effort
    /// teardown) rather than blocked on indefinitely.
    pub fn stop(&self) {
        self.stop_flag.store(true, std::sync::atomic::Ordering::SeqCst);
        let mut worker = self.worker.lock().expect("worker handle lock poisoned");
        let Some(handle) = worker.take() else {
            return;
        };
        let deadline = Instant::now() + STOP_JOIN_TIMEOUT;
        while !handle.is_finished() {
            if Instant::now() >= deadline {
                warn!("worker did not join within timeout, abandoning");
                return;
            }
            thread::sleep(Duration::from_millis(10));
        }
        if let Err(e) = handle.join() {
            error!("worker thread panicked: {e:?}");
        }
    }

    pub fn is_running(&self) -> bool {
        self.worker
            .lock()
            .expect("worker handle lock poisoned")
            .as_ref()
            .is_some_and(|h| !h.is_finished())
    }
}

fn run_worker<S, T, F>(
    source: Arc<S>,
    target: Arc<T>,
    fuzzer: Arc<F>,
    table: Arc<RwLock<TranslationTable>>,
    listeners: Arc<Mutex<Listeners>>,
    stop_flag: Arc<std::sync::atomic::AtomicBool>,
) where
    S: Endpoint + 'static,
    T: Endpoint + 'static,
    F: FuzzingStrategy + 'static,
{
    while !stop_flag.load(std::sync::atomic::Ordering::SeqCst) {
        let msg = match source.receive(Some(RECEIVE_TIMEOUT)) {
            Ok(msg) => msg,
            Err(e) => {
                error!("source endpoint error: {e}");
                thread::sleep(ERROR_BACKOFF);
                continue;
            }
        };

        let Some(msg) = msg else {
            continue;
        };

        Translator::<S, T, F>::emit(
            &listeners,
            EventKind::Received,
            Event {
                kind: EventKind::Received,
                frame: msg.clone(),
                result: None,
            },
        );

        let entry = {
            let table = table.read().expect("table lock poisoned");
            table.get(msg.arbitration_id, msg.is_extended_id).cloned()
        };

        match entry {
            Some(entry) => match entry.apply(&msg) {
                Ok(Some(dst)) => {
                    Translator::<S, T, F>::emit(
                        &listeners,
                        EventKind::Translated,
                        Event {
                            kind: EventKind::Translated,
                            frame: msg.clone(),
                            result: Some(dst.clone()),
                        },
                    );
                    send_and_emit::<S, T, F>(&target, &listeners, dst);
                }
                Ok(None) => {
                    debug!("dropping frame {:#x}: DLC mismatch", msg.arbitration_id);
                }
                Err(e) => {
                    error!("failed to apply translation entry for {:#x}: {e}", msg.arbitration_id);
                }
            },
            None => {
                Translator::<S, T, F>::emit(
                    &listeners,
                    EventKind::Unknown,
                    Event {
                        kind: EventKind::Unknown,
                        frame: msg.clone(),
                        result: None,
                    },
                );
                for out in fuzzer.handle_unknown(&msg) {
                    send_and_emit::<S, T, F>(&target, &listeners, out);
                }
            }
        }
    }
}

fn send_and_emit<S, T, F>(
    target: &Arc<T>,
    listeners: &Arc<Mutex<Listeners>>,
    frame: crate::frame::Frame,
) where
    S: Endpoint + 'static,
    T: Endpoint + 'static,
    F: FuzzingStrategy + 'static,
{
    match target.send(&frame) {
        Ok(()) => {
            Translator::<S, T, F>::emit(
                listeners,
                EventKind::Sent,
                Event {
                    kind: EventKind::Sent,
                    frame: frame.clone(),
                    result: None,
                },
            );
        }
        Err(e) => {
            error!("failed to send frame {:#x}: {e}", frame.arbitration_id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::endpoint::loopback::InMemoryLoopback;
    use crate::entry::TranslationEntry;
    use crate::fuzzing::NullFuzzer;
    use crate::frame::Frame;
    use crate::signal::{Endian, SignalMapping};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn wait_for<F: Fn() -> bool>(pred: F) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while !pred() {
            if Instant::now() >= deadline {
                panic!("condition never became true");
            }
            thread::sleep(Duration::from_millis(5));
        }
    }

    #[test]
    fn identity_scenario_end_to_end() {
        let (source_near, source_far) = InMemoryLoopback::pair();
        let (target_near, target_far) = InMemoryLoopback::pair();

        let mut table = TranslationTable::new();
        table.add(TranslationEntry {
            source_id: 0x100,
            source_is_extended: false,
            target_id: 0x200,
            target_is_extended: false,
            default_payload: vec![],
            signals: vec![SignalMapping {
                src_start_bit: 0,
                length: 64,
                dest_start_bit: 0,
                scale: 1.0,
                offset: 0.0,
                endian: Endian::Little,
                min_value: None,
                max_value: None,
            }],
        });

        let translator = Arc::new(Translator::new(source_far, target_near, table, NullFuzzer));

        let sent_count = Arc::new(AtomicUsize::new(0));
        let sent_count_clone = sent_count.clone();
        translator
            .add_listener("sent", move |_event| {
                sent_count_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        translator.start();
        source_near.open().unwrap();
        target_far.open().unwrap();

        let input = Frame::new(0x100, vec![0xDE, 0xAD, 0xBE, 0xEF, 1, 2, 3, 4], false, 0.0).unwrap();
        source_near.send(&input).unwrap();

        wait_for(|| sent_count.load(Ordering::SeqCst) >= 1);

        let out = target_far.receive(Some(Duration::from_secs(1))).unwrap().unwrap();
        assert_eq!(out.arbitration_id, 0x200);
        assert_eq!(out.data, input.data);

        translator.stop();
        assert!(!translator.is_running());
    }

    #[test]
    fn unknown_frame_emits_unknown_not_sent() {
        let (source_near, source_far) = InMemoryLoopback::pair();
        let (target_near, target_far) = InMemoryLoopback::pair();

        let translator = Arc::new(Translator::new(
            source_far,
            target_near,
            TranslationTable::new(),
            NullFuzzer,
        ));

        let unknown_count = Arc::new(AtomicUsize::new(0));
        let unknown_count_clone = unknown_count.clone();
        translator
            .add_listener("unknown", move |_event| {
                unknown_count_clone.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();

        translator.start();
        source_near.open().unwrap();
        target_far.open().unwrap();

        let input = Frame::new(0x999, vec![0x01], false, 0.0).unwrap();
        source_near.send(&input).unwrap();

        wait_for(|| unknown_count.load(Ordering::SeqCst) >= 1);

        let nothing = target_far.receive(Some(Duration::from_millis(50))).unwrap();
        assert_eq!(nothing, None);

        translator.stop();
    }

    #[test]
    fn start_and_stop_are_idempotent() {
        let (source_near, source_far) = InMemoryLoopback::pair();
        let (target_near, _target_far) = InMemoryLoopback::pair();
        let translator = Arc::new(Translator::new(
            source_far,
            target_near,
            TranslationTable::new(),
            NullFuzzer,
        ));
        source_near.open().unwrap();
        translator.start();
        translator.start();
        assert!(translator.is_running());
        translator.stop();
        translator.stop();
        assert!(!translator.is_running());
    }

    #[test]
    fn add_listener_rejects_unknown_event_name() {
        let (_a, b) = InMemoryLoopback::pair();
        let (c, _d) = InMemoryLoopback::pair();
        let translator = Translator::new(b, c, TranslationTable::new(), NullFuzzer);
        assert!(matches!(
            translator.add_listener("bogus", |_| {}),
            Err(ListenerError::BadEvent(_))
        ));
    }
}
