//! # entry
//!
//! A single source-id → target-id rewrite rule.

use crate::errors::MappingError;
use crate::frame::Frame;
use crate::signal::SignalMapping;

/// Rewrites frames matching `source_id`/`source_is_extended` into frames on
/// `target_id`/`target_is_extended`, splicing each [`SignalMapping`] in
/// declaration order — later mappings win bit-for-bit on overlap.
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationEntry {
    pub source_id: u32,
    pub source_is_extended: bool,
    pub target_id: u32,
    pub target_is_extended: bool,
    pub default_payload: Vec<u8>,
    pub signals: Vec<SignalMapping>,
}

impl TranslationEntry {
    /// Builds the target frame for a source frame already known to match
    /// this entry's `(source_id, source_is_extended)`.
    ///
    /// Returns `Ok(None)` when the source payload is too short for one of
    /// the mappings (a DLC mismatch) — this is a benign, silent drop, not an
    /// error. Returns `Err` when a mapping is malformed (bad length, or a
    /// destination window past the 8-byte target payload).
    pub fn apply(&self, src: &Frame) -> Result<Option<Frame>, MappingError> {
        let mut dest = [0u8; 8];
        let fill = self.default_payload.len().min(8);
        dest[..fill].copy_from_slice(&self.default_payload[..fill]);

        for mapping in &self.signals {
            let raw = match mapping.decode(&src.data) {
                Ok(v) => v,
                Err(MappingError::SourceWindowOutOfBounds { .. }) => return Ok(None),
                Err(e) => return Err(e),
            };
            // Identity mappings (scale 1, offset 0, unclamped) bypass the
            // floating-point round-trip: f64 only carries 53 bits of integer
            // precision, which would corrupt a raw 64-bit passthrough signal.
            let enc: i64 = if mapping.scale == 1.0
                && mapping.offset == 0.0
                && mapping.min_value.is_none()
                && mapping.max_value.is_none()
            {
                raw as i64
            } else {
                let phys = raw as f64 * mapping.scale + mapping.offset;
                let clamped = mapping.clamp(phys);
                clamped.round_ties_even() as i64
            };
            mapping.splice(&mut dest, enc as u64)?;
        }

        Ok(Some(Frame {
            arbitration_id: self.target_id,
            data: dest.to_vec(),
            timestamp: src.timestamp,
            is_extended_id: self.target_is_extended,
        }))
    }

    /// True if `frame`'s id and addressing mode match this entry's source.
    pub fn matches(&self, frame: &Frame) -> bool {
        frame.arbitration_id == self.source_id && frame.is_extended_id == self.source_is_extended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Endian;

    fn sig(src: u16, len: u8, dst: u16, scale: f64, offset: f64) -> SignalMapping {
        SignalMapping {
            src_start_bit: src,
            length: len,
            dest_start_bit: dst,
            scale,
            offset,
            endian: Endian::Little,
            min_value: None,
            max_value: None,
        }
    }

    #[test]
    fn identity_passthrough() {
        let entry = TranslationEntry {
            source_id: 0x100,
            source_is_extended: false,
            target_id: 0x200,
            target_is_extended: false,
            default_payload: vec![],
            signals: vec![sig(0, 64, 0, 1.0, 0.0)],
        };
        let src = Frame::new(
            0x100,
            vec![0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x02, 0x03, 0x04],
            false,
            0.0,
        )
        .unwrap();
        let dst = entry.apply(&src).unwrap().unwrap();
        assert_eq!(dst.arbitration_id, 0x200);
        assert_eq!(dst.data, vec![0xDE, 0xAD, 0xBE, 0xEF, 0x01, 0x02, 0x03, 0x04]);
    }

    #[test]
    fn default_fill_with_no_signals() {
        let entry = TranslationEntry {
            source_id: 0x10,
            source_is_extended: false,
            target_id: 0x20,
            target_is_extended: false,
            default_payload: vec![0xAA, 0xBB, 0xCC],
            signals: vec![],
        };
        let src = Frame::new(0x10, vec![0x00], false, 0.0).unwrap();
        let dst = entry.apply(&src).unwrap().unwrap();
        assert_eq!(dst.data, vec![0xAA, 0xBB, 0xCC, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn scaling_and_offset() {
        let entry = TranslationEntry {
            source_id: 0x1,
            source_is_extended: false,
            target_id: 0x2,
            target_is_extended: false,
            default_payload: vec![],
            signals: vec![sig(0, 8, 0, 2.0, 1.0)],
        };
        let src = Frame::new(0x1, vec![0x05], false, 0.0).unwrap();
        let dst = entry.apply(&src).unwrap().unwrap();
        assert_eq!(dst.data[0], 0x0B);
    }

    #[test]
    fn dlc_mismatch_is_a_silent_drop() {
        let entry = TranslationEntry {
            source_id: 0x1,
            source_is_extended: false,
            target_id: 0x2,
            target_is_extended: false,
            default_payload: vec![],
            signals: vec![sig(0, 64, 0, 1.0, 0.0)],
        };
        let src = Frame::new(0x1, vec![0x01], false, 0.0).unwrap();
        assert_eq!(entry.apply(&src).unwrap(), None);
    }

    #[test]
    fn overlapping_signals_bit_level_later_wins() {
        let entry = TranslationEntry {
            source_id: 0x1,
            source_is_extended: false,
            target_id: 0x2,
            target_is_extended: false,
            default_payload: vec![],
            signals: vec![sig(0, 8, 0, 1.0, 0.0), sig(8, 8, 4, 1.0, 0.0)],
        };
        let src = Frame::new(0x1, vec![0xFF, 0x00, 0, 0, 0, 0, 0, 0], false, 0.0).unwrap();
        let dst = entry.apply(&src).unwrap().unwrap();
        assert_eq!(dst.data[0], 0x0F);
        assert_eq!(dst.data[1], 0x00);
    }

    #[test]
    fn timestamp_is_preserved() {
        let entry = TranslationEntry {
            source_id: 0x1,
            source_is_extended: false,
            target_id: 0x2,
            target_is_extended: false,
            default_payload: vec![],
            signals: vec![],
        };
        let src = Frame::new(0x1, vec![], false, 42.5).unwrap();
        let dst = entry.apply(&src).unwrap().unwrap();
        assert_eq!(dst.timestamp, 42.5);
    }
}
