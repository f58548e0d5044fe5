//! Actuator command channel
//!
//! The arm and the conveyor share one line oriented channel. It is held
//! behind a single mutex ([`SharedChannel`]) so the control loop and the jog
//! console never interleave writes.
//!
//! A channel that is not connected drops every command with a warning. The
//! hardware connection is independent of the control loop, which keeps
//! running without it.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{trace, warn};
#[cfg(feature = "serial")]
use std::io::Write;
use std::sync::{Arc, Mutex};
use thiserror::Error;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A write-only command channel.
pub trait ActuatorChannel {
    fn is_connected(&self) -> bool;

    /// Write one command, including its trailing newline.
    fn write_line(&mut self, line: &str) -> Result<(), ChannelError>;

    fn flush(&mut self) -> Result<(), ChannelError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The single owning handle to the actuator channel.
#[derive(Clone)]
pub struct SharedChannel(Arc<Mutex<Box<dyn ActuatorChannel + Send>>>);

/// A channel with no hardware behind it.
#[derive(Debug, Default)]
pub struct NullChannel;

/// In-memory channel recording every command written to it.
#[derive(Debug, Clone, Default)]
pub struct MemoryChannel {
    lines: Arc<Mutex<Vec<String>>>,
}

/// Serial port channel.
#[cfg(feature = "serial")]
pub struct SerialChannel {
    port_name: String,
    port: Option<Box<dyn serialport::SerialPort>>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("The actuator channel is not connected")]
    NotConnected,

    #[error("Failed to write to the actuator channel: {0}")]
    WriteError(std::io::Error),

    #[cfg(feature = "serial")]
    #[error("Could not open serial port {0}: {1}")]
    OpenError(String, serialport::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SharedChannel {
    pub fn new<C: ActuatorChannel + Send + 'static>(channel: C) -> Self {
        Self(Arc::new(Mutex::new(Box::new(channel))))
    }

    /// Send one command.
    ///
    /// Returns `true` if the command was written. Disconnection and write
    /// failures are logged and the command is dropped.
    pub fn send(&self, line: &str) -> bool {
        self.send_all(&[line])
    }

    /// Send several commands under one lock, so no other writer can place a
    /// command between them.
    ///
    /// Returns `true` only if every command was written. Writing stops at the
    /// first failure.
    pub fn send_all(&self, lines: &[&str]) -> bool {
        let mut channel = match self.0.lock() {
            Ok(c) => c,
            Err(e) => {
                warn!("Actuator channel lock was poisoned, recovering");
                e.into_inner()
            }
        };

        if !channel.is_connected() {
            for line in lines {
                warn!("Actuator channel not connected, dropped {:?}", line.trim_end());
            }
            return false;
        }

        for line in lines {
            if let Err(e) = channel.write_line(line) {
                warn!("Dropped {:?}: {}", line.trim_end(), e);
                return false;
            }
            trace!("Sent {:?}", line.trim_end());
        }

        match channel.flush() {
            Ok(()) => true,
            Err(e) => {
                warn!("Failed to flush the actuator channel: {}", e);
                false
            }
        }
    }

    pub fn is_connected(&self) -> bool {
        match self.0.lock() {
            Ok(c) => c.is_connected(),
            Err(e) => e.into_inner().is_connected(),
        }
    }
}

impl ActuatorChannel for NullChannel {
    fn is_connected(&self) -> bool {
        false
    }

    fn write_line(&mut self, _line: &str) -> Result<(), ChannelError> {
        Err(ChannelError::NotConnected)
    }

    fn flush(&mut self) -> Result<(), ChannelError> {
        Err(ChannelError::NotConnected)
    }
}

impl MemoryChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every line written so far.
    pub fn lines(&self) -> Vec<String> {
        match self.lines.lock() {
            Ok(l) => l.clone(),
            Err(e) => e.into_inner().clone(),
        }
    }
}

impl ActuatorChannel for MemoryChannel {
    fn is_connected(&self) -> bool {
        true
    }

    fn write_line(&mut self, line: &str) -> Result<(), ChannelError> {
        match self.lines.lock() {
            Ok(mut l) => l.push(line.to_string()),
            Err(e) => e.into_inner().push(line.to_string()),
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }
}

#[cfg(feature = "serial")]
impl SerialChannel {
    /// Open the serial port.
    pub fn open(port_name: &str, baud_rate: u32) -> Result<Self, ChannelError> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(std::time::Duration::from_millis(1000))
            .open()
            .map_err(|e| ChannelError::OpenError(port_name.to_string(), e))?;

        Ok(Self {
            port_name: port_name.to_string(),
            port: Some(port),
        })
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

#[cfg(feature = "serial")]
impl ActuatorChannel for SerialChannel {
    fn is_connected(&self) -> bool {
        self.port.is_some()
    }

    fn write_line(&mut self, line: &str) -> Result<(), ChannelError> {
        let port = self.port.as_mut().ok_or(ChannelError::NotConnected)?;

        if let Err(e) = port.write_all(line.as_bytes()) {
            // Treat a failed write as a lost connection
            warn!("Serial port {} lost: {}", self.port_name, e);
            self.port = None;
            return Err(ChannelError::WriteError(e));
        }

        Ok(())
    }

    fn flush(&mut self) -> Result<(), ChannelError> {
        let port = self.port.as_mut().ok_or(ChannelError::NotConnected)?;
        port.flush().map_err(ChannelError::WriteError)
    }
}
