//! # fuzzing
//!
//! Pluggable strategy invoked on frames with no matching table entry.

use std::collections::HashSet;
use std::sync::Mutex;

use rand::Rng;

use crate::frame::Frame;

/// Strategy invoked once per unknown frame; yields zero or more frames to
/// transmit on the target, in order.
pub trait FuzzingStrategy: Send + Sync {
    fn handle_unknown(&self, frame: &Frame) -> Vec<Frame>;
}

/// No-op strategy: yields nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullFuzzer;

impl FuzzingStrategy for NullFuzzer {
    fn handle_unknown(&self, _frame: &Frame) -> Vec<Frame> {
        Vec::new()
    }
}

/// Bit-flip plus random-payload fuzzer, deduplicated across its own
/// lifetime by `(arbitration_id, payload)`.
pub struct RandomByteFuzzer {
    num_random: usize,
    flip_bits: bool,
    seen: Mutex<HashSet<(u32, Vec<u8>)>>,
}

impl RandomByteFuzzer {
    pub fn new(num_random: usize, flip_bits: bool) -> Self {
        Self {
            num_random,
            flip_bits,
            seen: Mutex::new(HashSet::new()),
        }
    }

    fn try_emit(&self, seen: &mut HashSet<(u32, Vec<u8>)>, id: u32, payload: Vec<u8>) -> Option<Vec<u8>> {
        let key = (id, payload.clone());
        if seen.insert(key) {
            Some(payload)
        } else {
            None
        }
    }
}

impl Default for RandomByteFuzzer {
    fn default() -> Self {
        Self::new(3, true)
    }
}

impl FuzzingStrategy for RandomByteFuzzer {
    fn handle_unknown(&self, frame: &Frame) -> Vec<Frame> {
        let mut out = Vec::new();
        let mut seen = self.seen.lock().expect("fuzzer dedup lock poisoned");

        if self.flip_bits {
            for bit in 0..(8 * frame.data.len()) {
                let mut payload = frame.data.clone();
                payload[bit / 8] ^= 1 << (bit % 8);
                if let Some(payload) = self.try_emit(&mut seen, frame.arbitration_id, payload) {
                    out.push(Frame {
                        arbitration_id: frame.arbitration_id,
                        data: payload,
                        timestamp: frame.timestamp,
                        is_extended_id: frame.is_extended_id,
                    });
                }
            }
        }

        let mut rng = rand::thread_rng();
        for _ in 0..self.num_random {
            let payload: Vec<u8> = (0..frame.data.len()).map(|_| rng.r#gen()).collect();
            if let Some(payload) = self.try_emit(&mut seen, frame.arbitration_id, payload) {
                out.push(Frame {
                    arbitration_id: frame.arbitration_id,
                    data: payload,
                    timestamp: frame.timestamp,
                    is_extended_id: frame.is_extended_id,
                });
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_fuzzer_yields_nothing() {
        let f = Frame::new(0x1, vec![0x00], false, 0.0).unwrap();
        assert!(NullFuzzer.handle_unknown(&f).is_empty());
    }

    #[test]
    fn random_byte_fuzzer_flips_every_bit_once() {
        let fuzzer = RandomByteFuzzer::new(0, true);
        let f = Frame::new(0x1, vec![0x00], false, 0.0).unwrap();
        let out = fuzzer.handle_unknown(&f);
        assert_eq!(out.len(), 8);
        let mut bits: Vec<u8> = out.iter().map(|fr| fr.data[0]).collect();
        bits.sort_unstable();
        assert_eq!(bits, vec![1, 2, 4, 8, 16, 32, 64, 128]);
    }

    #[test]
    fn random_byte_fuzzer_deduplicates_across_calls() {
        let fuzzer = RandomByteFuzzer::new(0, true);
        let f = Frame::new(0x1, vec![0x00], false, 0.0).unwrap();
        let first = fuzzer.handle_unknown(&f);
        let second = fuzzer.handle_unknown(&f);
        assert_eq!(first.len(), 8);
        assert_eq!(second.len(), 0, "same input already seen, must dedupe");
    }
}
