//! # raw_socket
//!
//! Linux SocketCAN backend, gated behind the `raw-socket` feature.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use socketcan::{CanFrame as SckFrame, ExtendedId, Id, Socket, StandardId};
use socketcan::CanSocket;
use socketcan::socket::SocketOptions;

use crate::endpoint::Endpoint;
use crate::errors::EndpointError;
use crate::frame::Frame;

/// A CAN bus endpoint backed by a Linux SocketCAN raw socket.
///
/// The socket handle is held behind an `Arc` rather than locked for the
/// duration of a call: `receive`/`send` each clone the `Arc` under a brief
/// read-lock and then operate on their own clone, so a blocking `receive`
/// never holds anything a concurrent `send` needs — satisfying the
/// endpoint contract that `send` must be reentrant with a concurrent
/// `receive`.
pub struct RawSocket {
    interface: String,
    socket: RwLock<Option<Arc<CanSocket>>>,
}

impl RawSocket {
    pub fn new(interface: impl Into<String>) -> Self {
        Self {
            interface: interface.into(),
            socket: RwLock::new(None),
        }
    }

    fn handle(&self) -> Result<Arc<CanSocket>, EndpointError> {
        self.socket
            .read()
            .expect("raw socket lock poisoned")
            .clone()
            .ok_or(EndpointError::NotOpen)
    }
}

impl Endpoint for RawSocket {
    fn open(&self) -> Result<(), EndpointError> {
        let mut guard = self.socket.write().expect("raw socket lock poisoned");
        if guard.is_some() {
            return Ok(());
        }
        let sock = CanSocket::open(&self.interface).map_err(|e| EndpointError::Io(e.to_string()))?;
        *guard = Some(Arc::new(sock));
        Ok(())
    }

    fn close(&self) -> Result<(), EndpointError> {
        let mut guard = self.socket.write().expect("raw socket lock poisoned");
        *guard = None;
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.socket.read().expect("raw socket lock poisoned").is_some()
    }

    fn receive(&self, timeout: Option<Duration>) -> Result<Option<Frame>, EndpointError> {
        let sock = self.handle()?;
        sock.set_read_timeout(timeout.unwrap_or(Duration::from_secs(3600)))
            .map_err(|e| EndpointError::Io(e.to_string()))?;

        match sock.read_frame() {
            Ok(SckFrame::Data(data_frame)) => {
                let id = match data_frame.id() {
                    Id::Standard(id) => (id.as_raw() as u32, false),
                    Id::Extended(id) => (id.as_raw(), true),
                };
                let frame = Frame::new(id.0, data_frame.data().to_vec(), id.1, 0.0)
                    .map_err(|e| EndpointError::Io(e.to_string()))?;
                Ok(Some(frame))
            }
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {
                Ok(None)
            }
            Err(e) => Err(EndpointError::Io(e.to_string())),
        }
    }

    fn send(&self, frame: &Frame) -> Result<(), EndpointError> {
        let sock = self.handle()?;

        let id: Id = if frame.is_extended_id {
            Id::Extended(
                ExtendedId::new(frame.arbitration_id)
                    .ok_or_else(|| EndpointError::Io("arbitration id out of range".to_string()))?,
            )
        } else {
            Id::Standard(
                StandardId::new(frame.arbitration_id as u16)
                    .ok_or_else(|| EndpointError::Io("arbitration id out of range".to_string()))?,
            )
        };
        let out = SckFrame::new(id, &frame.data)
            .ok_or_else(|| EndpointError::Io("payload too long for a classical frame".to_string()))?;
        sock.write_frame(&out).map_err(|e| EndpointError::Io(e.to_string()))?;
        Ok(())
    }
}
