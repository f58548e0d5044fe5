//! Arm command issuing
//!
//! The driver tracks the last commanded configuration, which is the only
//! estimate of where the arm is, and turns moves into wire commands.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::arm::{ArmCmd, ArmCmdError, NUM_SERVOS};
use log::{debug, info};
use std::sync::{Arc, Mutex};

use super::{channel::SharedChannel, estimate_duration, ServoAngles, TimingParams};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Issues commands to the arm.
///
/// Clones share the channel and the commanded configuration.
#[derive(Clone)]
pub struct ArmDriver {
    channel: SharedChannel,
    current: Arc<Mutex<ServoAngles>>,
    timing: TimingParams,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ArmDriver {
    /// Create a new driver, assuming the arm starts at `initial`.
    pub fn new(channel: SharedChannel, initial: ServoAngles, timing: TimingParams) -> Self {
        Self {
            channel,
            current: Arc::new(Mutex::new(initial)),
            timing,
        }
    }

    /// The last configuration written to the arm.
    pub fn current(&self) -> ServoAngles {
        match self.current.lock() {
            Ok(c) => *c,
            Err(e) => *e.into_inner(),
        }
    }

    pub fn timing(&self) -> &TimingParams {
        &self.timing
    }

    /// Move all servos at once.
    ///
    /// Returns the estimated time the move takes. An invalid command is
    /// rejected before anything is sent. If the channel drops the command the
    /// commanded configuration is left unchanged.
    ///
    /// Units: seconds
    pub fn move_all(&self, target: &ServoAngles, speed: u8) -> Result<f64, ArmCmdError> {
        let line = ArmCmd::All {
            angles_deg: *target,
            speed,
        }
        .encode()?;

        let from = self.current();
        let duration_s = estimate_duration(&from, target, speed as f64, &self.timing);

        debug!("Arm move {:?} -> {:?}, est. {:.2} s", from, target, duration_s);

        if self.channel.send(&line) {
            self.set_current(|c| *c = *target);
        }

        Ok(duration_s)
    }

    /// Move a single servo (0-based index).
    ///
    /// The speed is set first since the single servo command has no speed
    /// field. Both commands go out under one channel lock. Returns the
    /// estimated duration.
    ///
    /// Units: seconds
    pub fn move_servo(&self, index: usize, angle_deg: f64, speed: u8) -> Result<f64, ArmCmdError> {
        let speed_line = ArmCmd::Speed(speed).encode()?;
        let servo_line = ArmCmd::Servo { index, angle_deg }.encode()?;

        let from = self.current();
        let mut target = from;
        target[index] = angle_deg;
        let duration_s = estimate_duration(&from, &target, speed as f64, &self.timing);

        info!("Servo {} -> {:.1} deg at speed {}", index + 1, angle_deg, speed);

        if self.channel.send_all(&[speed_line.as_str(), servo_line.as_str()]) {
            self.set_current(|c| c[index] = angle_deg);
        }

        Ok(duration_s)
    }

    /// Set the speed used by following single servo moves.
    pub fn set_speed(&self, speed: u8) -> Result<bool, ArmCmdError> {
        let line = ArmCmd::Speed(speed).encode()?;
        Ok(self.channel.send(&line))
    }

    fn set_current<F: FnOnce(&mut [f64; NUM_SERVOS])>(&self, f: F) {
        match self.current.lock() {
            Ok(mut c) => f(&mut c),
            Err(e) => f(&mut e.into_inner()),
        }
    }
}
