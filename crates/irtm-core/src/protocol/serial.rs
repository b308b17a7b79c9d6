//! Serial port handling
//!
//! [`SerialTransport`] opens system serial ports through the `serialport`
//! crate, configured 8N1 without flow control as the module expects.

use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};

use tracing::{debug, warn};

use super::transport::{Handle, PortSettings, Transport};
use super::ProtocolError;

fn configure_port(port: &mut dyn SerialPort) -> Result<(), ProtocolError> {
    port.set_data_bits(serialport::DataBits::Eight)
        .map_err(|e| ProtocolError::TransportIo(e.to_string()))?;
    port.set_parity(serialport::Parity::None)
        .map_err(|e| ProtocolError::TransportIo(e.to_string()))?;
    port.set_stop_bits(serialport::StopBits::One)
        .map_err(|e| ProtocolError::TransportIo(e.to_string()))?;
    port.set_flow_control(serialport::FlowControl::None)
        .map_err(|e| ProtocolError::TransportIo(e.to_string()))?;
    Ok(())
}

/// Opens system serial ports
#[derive(Debug, Default, Clone, Copy)]
pub struct SerialTransport;

impl Transport for SerialTransport {
    type Handle = SerialHandle;

    fn open(&mut self, settings: &PortSettings) -> Result<SerialHandle, ProtocolError> {
        let open_error = |reason: String| ProtocolError::TransportOpen {
            port: settings.port_name.clone(),
            reason,
        };

        let mut port = serialport::new(&settings.port_name, settings.baud_rate)
            .timeout(settings.read_timeout)
            .open()
            .map_err(|e| open_error(e.to_string()))?;
        configure_port(port.as_mut()).map_err(|e| open_error(e.to_string()))?;

        // Drop anything the module sent before we were listening
        if let Err(e) = port.clear(serialport::ClearBuffer::All) {
            warn!("failed to clear buffers on {}: {}", settings.port_name, e);
        }

        Ok(SerialHandle {
            name: settings.port_name.clone(),
            port: Some(port),
        })
    }
}

/// An open system serial port
pub struct SerialHandle {
    name: String,
    port: Option<Box<dyn SerialPort>>,
}

impl SerialHandle {
    fn port(&mut self) -> Result<&mut Box<dyn SerialPort>, ProtocolError> {
        self.port
            .as_mut()
            .ok_or_else(|| ProtocolError::TransportIo(format!("{} is closed", self.name)))
    }
}

impl Handle for SerialHandle {
    fn write_all(&mut self, data: &[u8]) -> Result<(), ProtocolError> {
        let port = self.port()?;
        port.write_all(data)?;
        port.flush()?;
        Ok(())
    }

    fn read_chunk(&mut self, buf: &mut [u8]) -> Result<usize, ProtocolError> {
        match self.port()?.read(buf) {
            Ok(n) => Ok(n),
            Err(ref e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                Ok(0)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn close(&mut self) {
        if self.port.take().is_some() {
            debug!("closed {}", self.name);
        }
    }
}
