//! Protocol opcodes and the baud rate table
//!
//! Defines the operations understood by the module and the one-byte codes it
//! uses for each supported serial speed.

use serde::{Deserialize, Serialize};

/// Operation selector byte sent in the second position of every frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Opcode {
    /// Transmit an NEC code through the IR LED (0xF1)
    IrTransmit,

    /// Change the module's bus address (0xF2)
    SetAddress,

    /// Change the module's serial baud rate (0xF3)
    SetBaud,
}

impl Opcode {
    /// All opcodes known to the protocol
    pub const ALL: [Opcode; 3] = [Opcode::IrTransmit, Opcode::SetAddress, Opcode::SetBaud];

    /// Byte placed in the opcode field of a request frame
    pub fn request_byte(&self) -> u8 {
        match self {
            Opcode::IrTransmit => 0xF1,
            Opcode::SetAddress => 0xF2,
            Opcode::SetBaud => 0xF3,
        }
    }

    /// Byte the module echoes back once the operation has been processed
    ///
    /// The module logs confirmations in lowercase hex, but the byte value is
    /// the same as the request byte.
    pub fn marker_byte(&self) -> u8 {
        self.request_byte()
    }

    /// Look up the opcode for a raw request byte
    pub fn from_byte(byte: u8) -> Option<Opcode> {
        Opcode::ALL.into_iter().find(|op| op.request_byte() == byte)
    }
}

/// Supported baud rates and the code the module expects for each of them
pub const BAUD_TABLE: [(u32, u8); 4] = [(4800, 0x01), (9600, 0x02), (19200, 0x03), (57600, 0x04)];

/// Code for a supported baud rate, `None` if the module cannot run at `rate`
pub fn baud_code(rate: u32) -> Option<u8> {
    BAUD_TABLE
        .iter()
        .find(|(supported, _)| *supported == rate)
        .map(|(_, code)| *code)
}

/// Baud rates the module accepts, slowest first
pub fn supported_baud_rates() -> impl Iterator<Item = u32> {
    BAUD_TABLE.iter().map(|(rate, _)| *rate)
}
