//! Serial Protocol Communication
//!
//! Implements the YS-IRTM serial protocol: fixed 5-byte request frames
//! (address + opcode + 3 payload bytes) confirmed by the module echoing the
//! opcode's marker byte.

pub mod baud;
mod error;
mod frame;
mod opcode;
pub mod serial;
mod session;
pub mod transport;

pub use baud::{BaudNegotiator, NegotiationPhase};
pub use error::ProtocolError;
pub use frame::{matches_marker, Frame, IrCode};
pub use opcode::{baud_code, supported_baud_rates, Opcode, BAUD_TABLE};
pub use serial::SerialTransport;
pub use session::{Completion, Session, SessionConfig, SessionState};
pub use transport::{poll_for_marker, Handle, PollResult, PortSettings, Transport};

/// Default module address (factory setting)
pub const DEFAULT_ADDRESS: u8 = 0xA1;

/// Default baud rate of the module
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// Default per-read timeout in milliseconds
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Reads performed while waiting for a confirmation
pub const DEFAULT_POLL_ATTEMPTS: usize = 2;

/// Size of an encoded frame
pub const FRAME_LEN: usize = 5;

/// Size of a frame payload
pub const PAYLOAD_LEN: usize = 3;
