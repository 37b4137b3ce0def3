//! # can_translator
//!
//! A cross-make **CAN bus message translator**: reads classical CAN frames
//! from a source bus, rewrites arbitration ids and re-packs bit-fields of
//! the payload through a [`table::TranslationTable`], and emits the result
//! on a target bus.
//!
//! ## Highlights
//! - **Bit-exact signal mapping**: [`signal::SignalMapping`] decodes and
//!   splices fields at arbitrary, non-byte-aligned bit offsets.
//! - **Declarative tables**: [`table::TranslationTable::from_json_str`] loads
//!   a translation table from the JSON document format.
//! - **Pluggable fuzzing**: [`fuzzing::FuzzingStrategy`] lets unknown frames
//!   be fed to a bit-flip/random-payload strategy instead of being dropped.
//! - **OS-thread runtime**: [`translator::Translator`] drives the pipeline
//!   on a background thread and fans out lifecycle events synchronously.
//! - **In-memory and SocketCAN endpoints**: [`endpoint::loopback::InMemoryLoopback`]
//!   is always available; [`endpoint::raw_socket::RawSocket`] is gated
//!   behind the `raw-socket` feature.

pub mod endpoint;
pub mod entry;
pub mod errors;
pub mod event;
pub mod frame;
pub mod fuzzing;
pub mod signal;
pub mod table;
pub mod translator;
