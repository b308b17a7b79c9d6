//! Baud rate negotiation
//!
//! The module acknowledges a speed change only after it has switched, so the
//! confirmation has to be read at the new speed:
//!
//! 1. validate the target against [`BAUD_TABLE`](super::BAUD_TABLE)
//! 2. open at the working rate, send the `SetBaud` frame, close
//! 3. reopen at the target rate, poll for the `SetBaud` marker, close
//! 4. commit the target as the working rate
//!
//! Phases 2 and 3 use two separate handles. The working rate changes only
//! when both phases succeed.

use tracing::{debug, warn};

use super::{
    baud_code,
    session::{Session, SessionState},
    transport::{PollResult, Transport},
    Frame, Opcode, ProtocolError,
};

/// Where a negotiation stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NegotiationPhase {
    /// Checking the target against the baud table
    Validate,
    /// Sending the change request at the current rate
    Request,
    /// Reading the confirmation at the target rate
    Confirm,
    /// New rate committed
    Committed,
    /// Stopped before committing; the working rate is unchanged
    Aborted,
}

/// Two-phase baud change run against a session
pub struct BaudNegotiator<'a, T: Transport> {
    session: &'a mut Session<T>,
    phase: NegotiationPhase,
}

impl<'a, T: Transport> BaudNegotiator<'a, T> {
    /// Negotiator bound to `session`
    pub fn new(session: &'a mut Session<T>) -> Self {
        Self {
            session,
            phase: NegotiationPhase::Validate,
        }
    }

    /// Phase reached by the last run
    pub fn phase(&self) -> NegotiationPhase {
        self.phase
    }

    /// Switch the module to `target` baud
    ///
    /// Fails with [`ProtocolError::UnsupportedBaudRate`] without any I/O when
    /// `target` is not in the table.
    pub fn run(&mut self, target: u32) -> Result<(), ProtocolError> {
        let result = self.negotiate(target);
        if let Err(ref e) = result {
            warn!(to = target, phase = ?self.phase, "baud change aborted: {}", e);
            self.phase = NegotiationPhase::Aborted;
        }
        self.session.complete(result)
    }

    fn negotiate(&mut self, target: u32) -> Result<(), ProtocolError> {
        self.phase = NegotiationPhase::Validate;
        let code = baud_code(target).ok_or(ProtocolError::UnsupportedBaudRate(target))?;
        let frame = Frame::set_baud(self.session.config().address, code);

        self.phase = NegotiationPhase::Request;
        self.request(&frame)?;

        self.phase = NegotiationPhase::Confirm;
        self.confirm(target)?;

        self.session.commit_baud_rate(target);
        self.phase = NegotiationPhase::Committed;
        Ok(())
    }

    /// Send the change request at the current working rate
    fn request(&mut self, frame: &Frame) -> Result<(), ProtocolError> {
        let current = self.session.working_baud_rate();
        let mut handle = self.session.open_at(current)?;

        debug!(frame = %frame.to_hex(), baud = current, "sending baud change");
        handle.write_all(&frame.encode())?;
        self.session.set_state(SessionState::Sent);
        handle.close();
        Ok(())
    }

    /// Reopen at `target` and wait for the module to confirm
    fn confirm(&mut self, target: u32) -> Result<(), ProtocolError> {
        let attempts = self.session.config().poll_attempts;
        let mut handle = self.session.open_at(target)?;
        self.session.set_state(SessionState::Awaiting);

        let poll = handle.poll_for_marker(Opcode::SetBaud, attempts);
        handle.close();

        match poll? {
            PollResult::MarkerFound { attempts } => {
                debug!(baud = target, attempts, "baud change confirmed");
                Ok(())
            }
            PollResult::Exhausted(chunks) => Err(ProtocolError::ProtocolTimeout {
                opcode: Opcode::SetBaud,
                chunks,
            }),
        }
    }
}
