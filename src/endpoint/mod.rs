//! # endpoint
//!
//! The bus I/O capability the translator runtime is generic over.

pub mod loopback;
#[cfg(feature = "raw-socket")]
pub mod raw_socket;

use std::time::Duration;

use crate::errors::EndpointError;
use crate::frame::Frame;

/// Capability an endpoint must provide: open/close lifecycle plus
/// thread-safe, timed receive and send of a [`Frame`].
///
/// Implementations must let `send` be called concurrently with `receive`.
pub trait Endpoint: Send + Sync {
    fn open(&self) -> Result<(), EndpointError>;
    fn close(&self) -> Result<(), EndpointError>;
    fn is_open(&self) -> bool;

    /// Blocks for at most `timeout`, or indefinitely when `None`, returning
    /// `Ok(None)` on a timeout with nothing received.
    fn receive(&self, timeout: Option<Duration>) -> Result<Option<Frame>, EndpointError>;

    fn send(&self, frame: &Frame) -> Result<(), EndpointError>;
}
