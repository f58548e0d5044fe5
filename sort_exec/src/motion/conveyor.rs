//! Conveyor command issuing

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::conveyor::{ConveyorCmd, ConveyorDir};
use log::info;

use super::channel::SharedChannel;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct ConveyorDriver {
    channel: SharedChannel,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ConveyorDriver {
    pub fn new(channel: SharedChannel) -> Self {
        Self { channel }
    }

    /// Send a conveyor command, returns `true` if it was written.
    pub fn send(&self, cmd: ConveyorCmd) -> bool {
        info!("Conveyor: {:?}", cmd);
        self.channel.send(cmd.encode())
    }

    pub fn activate(&self) -> bool {
        self.send(ConveyorCmd::Activate)
    }

    pub fn deactivate(&self) -> bool {
        self.send(ConveyorCmd::Deactivate)
    }

    pub fn direction(&self, dir: ConveyorDir) -> bool {
        self.send(ConveyorCmd::Direction(dir))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::motion::channel::MemoryChannel;

    #[test]
    fn test_conveyor_cmds() {
        let mem = MemoryChannel::new();
        let conveyor = ConveyorDriver::new(SharedChannel::new(mem.clone()));

        assert!(conveyor.activate());
        assert!(conveyor.direction(ConveyorDir::Left));
        assert!(conveyor.direction(ConveyorDir::Right));
        assert!(conveyor.deactivate());

        assert_eq!(mem.lines().concat(), "P\nI\nD\nS\n");
    }
}
