//! Frame encoding/decoding
//!
//! Every request sent to the module is a fixed 5-byte frame:
//! - 1 byte: module address
//! - 1 byte: opcode
//! - 3 bytes: payload (meaning depends on the opcode)
//!
//! For IR transmit the payload is `[user_high, user_low, command]`, for a
//! baud change it is `[baud_code, 0x00, 0x00]`.

use serde::{Deserialize, Serialize};

use super::{Opcode, ProtocolError, FRAME_LEN, PAYLOAD_LEN};

/// A request frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    /// Target module address
    pub address: u8,
    /// Requested operation
    pub opcode: Opcode,
    /// Operation arguments
    pub payload: [u8; PAYLOAD_LEN],
}

impl Frame {
    /// Create a frame from its fields
    pub fn new(address: u8, opcode: Opcode, payload: [u8; PAYLOAD_LEN]) -> Self {
        Self {
            address,
            opcode,
            payload,
        }
    }

    /// Create a frame from an unsized payload, rejecting anything but 3 bytes
    pub fn from_parts(address: u8, opcode: Opcode, payload: &[u8]) -> Result<Self, ProtocolError> {
        let payload: [u8; PAYLOAD_LEN] = payload.try_into().map_err(|_| {
            ProtocolError::InvalidFrame(format!(
                "payload must be {} bytes, got {}",
                PAYLOAD_LEN,
                payload.len()
            ))
        })?;
        Ok(Self::new(address, opcode, payload))
    }

    /// IR transmit request for a key code
    pub fn ir_transmit(address: u8, code: IrCode) -> Self {
        Self::new(
            address,
            Opcode::IrTransmit,
            [code.user_high, code.user_low, code.command],
        )
    }

    /// Baud change request carrying the module's code for the new rate
    pub fn set_baud(address: u8, baud_code: u8) -> Self {
        Self::new(address, Opcode::SetBaud, [baud_code, 0x00, 0x00])
    }

    /// Decode a frame from raw bytes
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() != FRAME_LEN {
            return Err(ProtocolError::InvalidFrame(format!(
                "frame must be {} bytes, got {}",
                FRAME_LEN,
                data.len()
            )));
        }

        let opcode = Opcode::from_byte(data[1]).ok_or_else(|| {
            ProtocolError::InvalidFrame(format!("unknown opcode 0x{:02X}", data[1]))
        })?;

        Self::from_parts(data[0], opcode, &data[2..])
    }

    /// Encode the frame to wire bytes
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut bytes = [0u8; FRAME_LEN];
        bytes[0] = self.address;
        bytes[1] = self.opcode.request_byte();
        bytes[2..].copy_from_slice(&self.payload);
        bytes
    }

    /// Uppercase hex rendering used in logs (`A1F100010A`)
    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.encode())
    }
}

/// Returns true if the confirmation marker for `opcode` occurs anywhere in `response`.
///
/// This is a byte-occurrence test, not a parse of the response shape. A marker
/// value that turns up in line noise will also match.
pub fn matches_marker(response: &[u8], opcode: Opcode) -> bool {
    response.contains(&opcode.marker_byte())
}

/// NEC key code: two user code bytes plus a command byte
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct IrCode {
    /// User code high byte
    pub user_high: u8,
    /// User code low byte
    pub user_low: u8,
    /// Command (key) code
    pub command: u8,
}

impl IrCode {
    /// Split a 16-bit user code into its wire bytes
    pub fn new(user_code: u16, command: u8) -> Self {
        let [user_high, user_low] = user_code.to_be_bytes();
        Self {
            user_high,
            user_low,
            command,
        }
    }

    /// Parse a 4-digit user code token and a 2-digit command token
    pub fn from_hex(user_code: &str, command: &str) -> Result<Self, ProtocolError> {
        let user: [u8; 2] = decode_token(user_code, "user code")?;
        let [command] = decode_token::<1>(command, "command code")?;
        Ok(Self {
            user_high: user[0],
            user_low: user[1],
            command,
        })
    }

    /// Combined 16-bit user code
    pub fn user_code(&self) -> u16 {
        u16::from_be_bytes([self.user_high, self.user_low])
    }
}

fn decode_token<const N: usize>(token: &str, what: &str) -> Result<[u8; N], ProtocolError> {
    let bytes = hex::decode(token.trim())
        .map_err(|e| ProtocolError::InvalidFrame(format!("{} {:?}: {}", what, token, e)))?;
    bytes.try_into().map_err(|bytes: Vec<u8>| {
        ProtocolError::InvalidFrame(format!(
            "{} {:?} must be {} byte(s), got {}",
            what,
            token,
            N,
            bytes.len()
        ))
    })
}
