//! Protocol errors

use thiserror::Error;

use super::Opcode;
use crate::remote::RemoteError;

/// Errors that can occur while talking to the module
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// The port could not be opened or configured
    #[error("Cannot open serial port {port}: {reason}")]
    TransportOpen {
        /// Port name as given to the transport
        port: String,
        /// Error reported by the system
        reason: String,
    },

    /// A read or write on an open port failed
    #[error("Serial I/O error: {0}")]
    TransportIo(String),

    /// The confirmation marker never arrived
    #[error("No {opcode:?} confirmation after polling ({} chunk(s) received)", .chunks.len())]
    ProtocolTimeout {
        /// Command that went unconfirmed
        opcode: Opcode,
        /// Every non-empty chunk read during the polling window, in arrival order
        chunks: Vec<Vec<u8>>,
    },

    /// Rate not in the module's baud table
    #[error("Unsupported baud rate: {0}")]
    UnsupportedBaudRate(u32),

    /// Frame parts of the wrong size
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Remote or key could not be resolved
    #[error("Key lookup failed: {0}")]
    ConfigLookup(#[from] RemoteError),
}

impl From<std::io::Error> for ProtocolError {
    fn from(e: std::io::Error) -> Self {
        ProtocolError::TransportIo(e.to_string())
    }
}

impl ProtocolError {
    /// Raw bytes collected before a timeout, empty for every other error
    pub fn collected_bytes(&self) -> Vec<u8> {
        match self {
            ProtocolError::ProtocolTimeout { chunks, .. } => chunks.concat(),
            _ => Vec::new(),
        }
    }
}
