//! # loopback
//!
//! An in-memory endpoint pair: frames sent on one peer are received on the
//! other. Always available — the reference backend used by the test suite
//! and by callers with no physical bus to hand.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::endpoint::Endpoint;
use crate::errors::EndpointError;
use crate::frame::Frame;

#[derive(Default)]
struct Queue {
    frames: Mutex<VecDeque<Frame>>,
    condvar: Condvar,
}

impl Queue {
    fn push(&self, frame: Frame) {
        self.frames.lock().expect("loopback queue lock poisoned").push_back(frame);
        self.condvar.notify_one();
    }

    fn pop(&self, timeout: Option<Duration>) -> Option<Frame> {
        let mut guard = self.frames.lock().expect("loopback queue lock poisoned");
        match timeout {
            None => {
                while guard.is_empty() {
                    guard = self.condvar.wait(guard).expect("loopback condvar poisoned");
                }
                guard.pop_front()
            }
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                while guard.is_empty() {
                    let now = Instant::now();
                    if now >= deadline {
                        return None;
                    }
                    let (g, result) = self
                        .condvar
                        .wait_timeout(guard, deadline - now)
                        .expect("loopback condvar poisoned");
                    guard = g;
                    if result.timed_out() && guard.is_empty() {
                        return None;
                    }
                }
                guard.pop_front()
            }
        }
    }
}

/// One half of an in-memory loopback pair. Frames sent here are delivered
/// to the peer constructed alongside it via [`InMemoryLoopback::pair`].
pub struct InMemoryLoopback {
    inbox: Arc<Queue>,
    outbox: Arc<Queue>,
    open: AtomicBool,
}

impl InMemoryLoopback {
    /// Builds a connected pair: frames sent on `a` arrive on `b`'s
    /// `receive`, and vice versa.
    pub fn pair() -> (Self, Self) {
        let q1 = Arc::new(Queue::default());
        let q2 = Arc::new(Queue::default());
        let a = Self {
            inbox: q1.clone(),
            outbox: q2.clone(),
            open: AtomicBool::new(false),
        };
        let b = Self {
            inbox: q2,
            outbox: q1,
            open: AtomicBool::new(false),
        };
        (a, b)
    }
}

impl Endpoint for InMemoryLoopback {
    fn open(&self) -> Result<(), EndpointError> {
        self.open.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn close(&self) -> Result<(), EndpointError> {
        self.open.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn receive(&self, timeout: Option<Duration>) -> Result<Option<Frame>, EndpointError> {
        if !self.is_open() {
            return Err(EndpointError::NotOpen);
        }
        Ok(self.inbox.pop(timeout))
    }

    fn send(&self, frame: &Frame) -> Result<(), EndpointError> {
        if !self.is_open() {
            return Err(EndpointError::NotOpen);
        }
        self.outbox.push(frame.clone());
        Ok(())
    }
}
