//! # errors
//!
//! Error taxonomy for the translation engine and runtime.

use thiserror::Error;

/// Errors produced by [`SignalMapping`](crate::signal::SignalMapping) decode/encode
/// and by [`TranslationEntry::apply`](crate::entry::TranslationEntry::apply).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MappingError {
    #[error("signal length {length} out of range (must be 1..=64)")]
    InvalidLength { length: u8 },
    #[error("source window [{start}, {end}) exceeds payload of {payload_bits} bits")]
    SourceWindowOutOfBounds {
        start: u16,
        end: u32,
        payload_bits: u16,
    },
    #[error("destination window [{start}, {end}) exceeds an 8-byte payload")]
    DestWindowOutOfBounds { start: u16, end: u32 },
}

/// Errors produced while looking up or building a [`TranslationTable`](crate::table::TranslationTable).
#[derive(Debug, Error)]
pub enum TableError {
    #[error("table document is malformed: {reason}")]
    BadTable { reason: String },
    #[error("entry for source id {source_id:#x} is invalid: {reason}")]
    BadEntry { source_id: u32, reason: String },
    #[error("signal on source id {source_id:#x} is invalid: {reason}")]
    BadSignal { source_id: u32, reason: String },
    #[error("failed to parse table document")]
    Json(#[from] serde_json::Error),
}

/// Errors produced by a [`crate::endpoint::Endpoint`] implementation.
#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("endpoint is not open")]
    NotOpen,
    #[error("endpoint I/O failure: {0}")]
    Io(String),
}

/// Errors produced by [`crate::translator::Translator::add_listener`].
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("unknown event kind: {0}")]
    BadEvent(String),
}

/// Errors produced while constructing a [`crate::frame::Frame`].
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("payload length {len} exceeds 8 bytes")]
    PayloadTooLong { len: usize },
    #[error("arbitration id {id:#x} does not fit {bits}-bit addressing")]
    IdOutOfRange { id: u32, bits: u8 },
}
