//! Command sessions
//!
//! A [`Session`] owns the transport and the working baud rate. Each operation
//! opens the port, exchanges one frame, and closes the port again before
//! returning, whatever the outcome.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::{
    baud::BaudNegotiator,
    serial::SerialTransport,
    transport::{OpenHandle, PollResult, PortSettings, Transport, READ_CHUNK_SIZE},
    Frame, IrCode, ProtocolError, DEFAULT_ADDRESS, DEFAULT_BAUD_RATE, DEFAULT_POLL_ATTEMPTS,
    DEFAULT_TIMEOUT_MS,
};
use crate::remote::KeyLookup;

/// Session configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Serial port name
    pub port_name: String,
    /// Baud rate the module is running at when the session starts
    pub baud_rate: u32,
    /// Per-read timeout in milliseconds
    pub read_timeout_ms: u64,
    /// Reads performed while waiting for a confirmation
    pub poll_attempts: usize,
    /// Module address put in every frame
    pub address: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            port_name: String::new(),
            baud_rate: DEFAULT_BAUD_RATE,
            read_timeout_ms: DEFAULT_TIMEOUT_MS,
            poll_attempts: DEFAULT_POLL_ATTEMPTS,
            address: DEFAULT_ADDRESS,
        }
    }
}

impl SessionConfig {
    /// Defaults for everything but the port
    pub fn new(port_name: impl Into<String>) -> Self {
        Self {
            port_name: port_name.into(),
            ..Self::default()
        }
    }

    /// Per-read timeout
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }
}

/// How an operation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Completion {
    /// Confirmed by the module
    Success,
    /// Failed or never confirmed
    Failure,
}

/// Progress of the most recent operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    /// No operation started yet
    Idle,
    /// Port acquired
    Opened,
    /// Request frame written
    Sent,
    /// Polling for the confirmation marker
    Awaiting,
    /// Operation finished; the port has been released
    Completed(Completion),
}

/// Driver for one module on one port
pub struct Session<T: Transport> {
    transport: T,
    config: SessionConfig,
    /// Only changed by a fully confirmed baud negotiation
    working_baud_rate: u32,
    state: SessionState,
}

impl Session<SerialTransport> {
    /// Session over a system serial port
    pub fn serial(config: SessionConfig) -> Self {
        Self::new(SerialTransport, config)
    }
}

impl<T: Transport> Session<T> {
    /// Session over `transport`, starting at the configured baud rate
    pub fn new(transport: T, config: SessionConfig) -> Self {
        let working_baud_rate = config.baud_rate;
        Self {
            transport,
            config,
            working_baud_rate,
            state: SessionState::Idle,
        }
    }

    /// Settings the session was created with
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// State reached by the most recent operation
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Baud rate used by the next `open`
    pub fn working_baud_rate(&self) -> u32 {
        self.working_baud_rate
    }

    /// Transmit an IR code and wait for the module to confirm it
    pub fn transmit(&mut self, code: IrCode) -> Result<(), ProtocolError> {
        let frame = Frame::ir_transmit(self.config.address, code);
        let result = self.run_command(&frame);
        self.complete(result)
    }

    /// Transmit from hex tokens (`"00FF"`, `"0A"`)
    pub fn transmit_hex(&mut self, user_code: &str, command: &str) -> Result<(), ProtocolError> {
        let code = IrCode::from_hex(user_code, command)?;
        self.transmit(code)
    }

    /// Look up `key` on `remote` and transmit it
    ///
    /// Lookup failures are returned as [`ProtocolError::ConfigLookup`] before
    /// the port is touched.
    pub fn send_key<L: KeyLookup + ?Sized>(
        &mut self,
        lookup: &L,
        remote: &str,
        key: &str,
    ) -> Result<(), ProtocolError> {
        let code = lookup.lookup(remote, key)?;
        debug!(remote, key, ?code, "resolved key");
        self.transmit(code)
    }

    /// Change the module's baud rate, see [`BaudNegotiator`]
    pub fn change_baud_rate(&mut self, target: u32) -> Result<(), ProtocolError> {
        BaudNegotiator::new(self).run(target)
    }

    /// Read whatever the module reports for up to `max_attempts` reads
    ///
    /// The module forwards received IR codes as raw bytes. Silence is not an
    /// error: the result is simply empty.
    pub fn listen(&mut self, max_attempts: usize) -> Result<Vec<Vec<u8>>, ProtocolError> {
        let result = self.capture(max_attempts);
        self.complete(result)
    }

    fn capture(&mut self, max_attempts: usize) -> Result<Vec<Vec<u8>>, ProtocolError> {
        let mut handle = self.open_at(self.working_baud_rate)?;
        self.state = SessionState::Awaiting;

        let mut chunks = Vec::new();
        let mut buffer = [0u8; READ_CHUNK_SIZE];
        for _ in 0..max_attempts {
            let n = handle.read_chunk(&mut buffer)?;
            if n > 0 {
                debug!(data = %hex::encode(&buffer[..n]), "listen: received chunk");
                chunks.push(buffer[..n].to_vec());
            }
        }

        handle.close();
        Ok(chunks)
    }

    /// open -> send -> await confirmation -> close
    ///
    /// Success needs both the write and the marker; the handle guard closes
    /// the port on every early return.
    fn run_command(&mut self, frame: &Frame) -> Result<(), ProtocolError> {
        let mut handle = self.open_at(self.working_baud_rate)?;

        debug!(frame = %frame.to_hex(), "sending frame");
        if let Err(e) = handle.write_all(&frame.encode()) {
            warn!(frame = %frame.to_hex(), "write failed: {}", e);
            return Err(e);
        }
        self.state = SessionState::Sent;

        self.state = SessionState::Awaiting;
        let poll = handle.poll_for_marker(frame.opcode, self.config.poll_attempts);
        handle.close();

        match poll? {
            PollResult::MarkerFound { attempts } => {
                debug!(opcode = ?frame.opcode, attempts, "confirmed");
                Ok(())
            }
            PollResult::Exhausted(chunks) => Err(ProtocolError::ProtocolTimeout {
                opcode: frame.opcode,
                chunks,
            }),
        }
    }

    /// Acquire the port at `baud_rate`
    pub(crate) fn open_at(
        &mut self,
        baud_rate: u32,
    ) -> Result<OpenHandle<T::Handle>, ProtocolError> {
        self.state = SessionState::Idle;
        let settings = PortSettings {
            port_name: self.config.port_name.clone(),
            baud_rate,
            read_timeout: self.config.read_timeout(),
        };
        let handle = OpenHandle::open(&mut self.transport, &settings)?;
        self.state = SessionState::Opened;
        Ok(handle)
    }

    pub(crate) fn set_state(&mut self, state: SessionState) {
        self.state = state;
    }

    /// Record the terminal state of an operation and pass its result through
    pub(crate) fn complete<R>(
        &mut self,
        result: Result<R, ProtocolError>,
    ) -> Result<R, ProtocolError> {
        self.state = SessionState::Completed(match result {
            Ok(_) => Completion::Success,
            Err(_) => Completion::Failure,
        });
        result
    }

    pub(crate) fn commit_baud_rate(&mut self, baud_rate: u32) {
        info!(
            from = self.working_baud_rate,
            to = baud_rate,
            "module baud rate changed"
        );
        self.working_baud_rate = baud_rate;
    }
}
