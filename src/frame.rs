//! # frame
//!
//! The immutable value type flowing through the translation pipeline.

use crate::errors::FrameError;

/// A single classical CAN frame.
///
/// Constructed only through [`Frame::new`], which validates that the payload
/// fits within 8 bytes and that the arbitration id fits its addressing mode
/// (11 bits standard, 29 bits extended).
///
/// # Examples
///
/// ```
/// # use can_translator::frame::Frame;
/// let f = Frame::new(0x123, vec![0xDE, 0xAD], false, 0.0).unwrap();
/// assert_eq!(f.arbitration_id, 0x123);
/// assert_eq!(f.data, vec![0xDE, 0xAD]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub arbitration_id: u32,
    pub data: Vec<u8>,
    pub timestamp: f64,
    pub is_extended_id: bool,
}

impl Frame {
    /// Builds a frame, rejecting an oversized payload or an out-of-range
    /// identifier for the declared addressing mode.
    pub fn new(
        arbitration_id: u32,
        data: Vec<u8>,
        is_extended_id: bool,
        timestamp: f64,
    ) -> Result<Self, FrameError> {
        if data.len() > 8 {
            return Err(FrameError::PayloadTooLong { len: data.len() });
        }
        let bits: u8 = if is_extended_id { 29 } else { 11 };
        let max_id: u32 = (1u32 << bits) - 1;
        if arbitration_id > max_id {
            return Err(FrameError::IdOutOfRange {
                id: arbitration_id,
                bits,
            });
        }
        Ok(Self {
            arbitration_id,
            data,
            timestamp,
            is_extended_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_oversized_payload() {
        let data = vec![0u8; 9];
        assert!(matches!(
            Frame::new(0x1, data, false, 0.0),
            Err(FrameError::PayloadTooLong { len: 9 })
        ));
    }

    #[test]
    fn rejects_standard_id_overflow() {
        assert!(matches!(
            Frame::new(0x800, vec![], false, 0.0),
            Err(FrameError::IdOutOfRange { id: 0x800, bits: 11 })
        ));
    }

    #[test]
    fn accepts_extended_id_up_to_29_bits() {
        let f = Frame::new(0x1FFF_FFFF, vec![], true, 1.5).unwrap();
        assert_eq!(f.arbitration_id, 0x1FFF_FFFF);
        assert!(f.is_extended_id);
    }
}
