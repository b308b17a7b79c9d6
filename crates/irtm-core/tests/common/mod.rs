//! Scripted transport shared by the integration tests
#![allow(dead_code)]

use irtm_core::protocol::{Handle, PortSettings, ProtocolError, Transport};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

/// One observed transport call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Open { baud: u32 },
    Write(Vec<u8>),
    Read,
    Close,
}

/// Behaviour of the handle returned by one `open`
#[derive(Debug, Clone, Default)]
pub struct OpenScript {
    pub refuse: bool,
    pub fail_write: bool,
    /// Chunks returned by successive reads; silence once exhausted
    pub reads: VecDeque<Vec<u8>>,
}

impl OpenScript {
    pub fn replies(reads: Vec<Vec<u8>>) -> Self {
        Self {
            reads: reads.into(),
            ..Self::default()
        }
    }

    pub fn silent() -> Self {
        Self::default()
    }

    pub fn refuse() -> Self {
        Self {
            refuse: true,
            ..Self::default()
        }
    }

    pub fn broken_write() -> Self {
        Self {
            fail_write: true,
            ..Self::default()
        }
    }
}

#[derive(Default)]
struct MockState {
    calls: Vec<Call>,
    scripts: VecDeque<OpenScript>,
}

/// Transport that replays one [`OpenScript`] per `open` and records every call
#[derive(Default, Clone)]
pub struct MockTransport {
    state: Rc<RefCell<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, script: OpenScript) -> Self {
        self.state.borrow_mut().scripts.push_back(script);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.borrow().calls.clone()
    }

    pub fn count(&self, call: &Call) -> usize {
        self.state.borrow().calls.iter().filter(|c| *c == call).count()
    }

    pub fn reads(&self) -> usize {
        self.count(&Call::Read)
    }

    pub fn closes(&self) -> usize {
        self.count(&Call::Close)
    }

    pub fn opened_at(&self) -> Vec<u32> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Open { baud } => Some(*baud),
                _ => None,
            })
            .collect()
    }

    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.state
            .borrow()
            .calls
            .iter()
            .filter_map(|c| match c {
                Call::Write(bytes) => Some(bytes.clone()),
                _ => None,
            })
            .collect()
    }
}

pub struct MockHandle {
    state: Rc<RefCell<MockState>>,
    script: OpenScript,
}

impl Transport for MockTransport {
    type Handle = MockHandle;

    fn open(&mut self, settings: &PortSettings) -> Result<MockHandle, ProtocolError> {
        let mut state = self.state.borrow_mut();
        state.calls.push(Call::Open {
            baud: settings.baud_rate,
        });
        let script = state.scripts.pop_front().unwrap_or_default();
        if script.refuse {
            return Err(ProtocolError::TransportOpen {
                port: settings.port_name.clone(),
                reason: "No such file or directory".to_string(),
            });
        }
        Ok(MockHandle {
            state: Rc::clone(&self.state),
            script,
        })
    }
}

impl Handle for MockHandle {
    fn write_all(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        self.state.borrow_mut().calls.push(Call::Write(data.to_vec()));
        if self.script.fail_write {
            return Err(ProtocolError::TransportIo("Broken pipe".to_string()));
        }
        Ok(())
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, ProtocolError> {
        self.state.borrow_mut().calls.push(Call::Read);
        let chunk = self.script.reads.pop_front().unwrap_or_default();
        buf[..chunk.len()].copy_from_slice(&chunk);
        Ok(chunk.len())
    }

    fn close(&mut self) {
        self.state.borrow_mut().calls.push(Call::Close);
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("irtm_core=debug")
        .try_init();
}
