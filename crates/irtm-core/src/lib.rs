//! # irtm Core Library
//!
//! Protocol engine for YS-IRTM serial infrared transceiver modules.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Frame encoding for the module's address + opcode + payload protocol
//! - Serial transport with bounded, attempt-counted response polling
//! - IR transmit sessions with guaranteed port release
//! - Two-phase baud rate negotiation
//! - YAML remote key tables
//!
//! ## Example
//!
//! ```rust,ignore
//! use irtm_core::prelude::*;
//!
//! let mut session = Session::serial(SessionConfig::new("/dev/ttyUSB0"));
//! session.transmit(IrCode::from_hex("00FF", "0A")?)?;
//!
//! let remotes = RemoteDirectory::new("remotes");
//! session.send_key(&remotes, "living-room-tv", "power")?;
//!
//! session.change_baud_rate(57600)?;
//! ```

pub mod protocol;
pub mod remote;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::protocol::{
        Frame, IrCode, Opcode, ProtocolError, SerialTransport, Session, SessionConfig,
        SessionState,
    };
    pub use crate::remote::{KeyLookup, RemoteDirectory, RemoteError, RemoteTable};
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
