//! Transport abstraction
//!
//! A [`Transport`] opens [`Handle`]s to a port at a given speed. Sessions never
//! hold a handle across operations: each one is opened, used, and closed
//! inside a single call through an [`OpenHandle`] guard.

use std::time::Duration;

use tracing::{debug, warn};

use super::{matches_marker, Opcode, ProtocolError};

/// Largest chunk requested from the port in one read
pub const READ_CHUNK_SIZE: usize = 64;

/// Parameters for opening a port
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortSettings {
    /// Port identifier (e.g. "/dev/ttyUSB0" or "COM3")
    pub port_name: String,
    /// Line speed
    pub baud_rate: u32,
    /// Upper bound on the time a single read may block
    pub read_timeout: Duration,
}

/// An open connection to the module
pub trait Handle {
    /// Write all bytes to the line
    fn write_all(&mut self, data: &[u8]) -> Result<(), ProtocolError>;

    /// Perform one read bounded by the per-read timeout.
    ///
    /// Returns `Ok(0)` when the timeout elapsed with nothing received.
    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, ProtocolError>;

    /// Release the port. Must be safe to call more than once.
    fn close(&mut self);
}

/// Something that can open handles, e.g. the system serial ports
pub trait Transport {
    /// Handle returned by a successful open
    type Handle: Handle;

    /// Acquire the port. Fails with [`ProtocolError::TransportOpen`].
    fn open(&mut self, settings: &PortSettings) -> Result<Self::Handle, ProtocolError>;
}

/// Outcome of a polling window
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollResult {
    /// The confirmation marker arrived on read number `attempts`
    MarkerFound {
        /// 1-based read count
        attempts: usize,
    },
    /// No marker seen; every non-empty chunk read, in arrival order
    Exhausted(Vec<Vec<u8>>),
}

/// Read up to `max_attempts` times, stopping at the first chunk containing the
/// marker for `opcode`.
///
/// Worst-case blocking time is `max_attempts` times the handle's read timeout.
pub fn poll_for_marker<H: Handle + ?Sized>(
    handle: &mut H,
    opcode: Opcode,
    max_attempts: usize,
) -> Result<PollResult, ProtocolError> {
    let mut chunks = Vec::new();
    let mut buffer = [0u8; READ_CHUNK_SIZE];

    for attempt in 1..=max_attempts {
        let n = handle.read_chunk(&mut buffer)?;
        if n == 0 {
            debug!(attempt, "poll: read timed out with no data");
            continue;
        }

        let chunk = &buffer[..n];
        debug!(attempt, data = %hex::encode(chunk), "poll: received chunk");
        if matches_marker(chunk, opcode) {
            return Ok(PollResult::MarkerFound { attempts: attempt });
        }
        chunks.push(chunk.to_vec());
    }

    warn!(
        ?opcode,
        max_attempts,
        received = %hex::encode(chunks.concat()),
        "poll: no confirmation marker"
    );
    Ok(PollResult::Exhausted(chunks))
}

/// Scoped handle that is closed exactly once, either explicitly or on drop
pub struct OpenHandle<H: Handle> {
    handle: H,
    closed: bool,
}

impl<H: Handle> OpenHandle<H> {
    /// Open a handle on `transport` and wrap it
    pub fn open<T>(transport: &mut T, settings: &PortSettings) -> Result<Self, ProtocolError>
    where
        T: Transport<Handle = H>,
    {
        let handle = transport.open(settings)?;
        debug!(
            port = %settings.port_name,
            baud = settings.baud_rate,
            "port opened"
        );
        Ok(Self {
            handle,
            closed: false,
        })
    }

    /// Write the whole buffer
    pub fn write_all(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        self.handle.write_all(data)
    }

    /// Poll this handle, see [`poll_for_marker`]
    pub fn poll_for_marker(
        &mut self,
        opcode: Opcode,
        max_attempts: usize,
    ) -> Result<PollResult, ProtocolError> {
        poll_for_marker(&mut self.handle, opcode, max_attempts)
    }

    /// One bounded read; `Ok(0)` on timeout
    pub fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, ProtocolError> {
        self.handle.read_chunk(buf)
    }

    /// Close now instead of at end of scope
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if !self.closed {
            self.closed = true;
            self.handle.close();
            debug!("port closed");
        }
    }
}

impl<H: Handle> Drop for OpenHandle<H> {
    fn drop(&mut self) {
        self.release();
    }
}
