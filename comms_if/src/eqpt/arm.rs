//! # Arm Equipment Communications Module
//!
//! The arm controller accepts newline terminated ASCII commands:
//!
//! - `A,{a1},{a2},{a3},{a4},{a5},{a6},{speed}` moves all six servos,
//! - `S,{id},{angle}` moves a single servo,
//! - `V,{speed}` sets the speed used by subsequent moves.
//!
//! Responses from the controller are never parsed.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of servos driven by an all-servo command.
pub const NUM_SERVOS: usize = 6;

/// Physical controller channel for each logical servo index.
///
/// Logical servo `i` (0-based, base first, gripper last) is addressed on the
/// wire as `SERVO_CHANNEL_MAP[i]`.
pub const SERVO_CHANNEL_MAP: [u8; NUM_SERVOS] = [1, 2, 3, 4, 5, 6];

/// Range of angles accepted by the all-servo command.
///
/// Units: degrees
pub const SERVO_RANGE_DEG: (f64, f64) = (0.0, 180.0);

/// Wider range accepted for direct single servo commands.
///
/// Units: degrees
pub const SINGLE_SERVO_RANGE_DEG: (f64, f64) = (0.0, 270.0);

/// Range of speed percentages.
pub const SPEED_RANGE: (u8, u8) = (1, 100);

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A command for the arm controller.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ArmCmd {
    /// Move all servos to the given logical angles.
    All {
        angles_deg: [f64; NUM_SERVOS],
        speed: u8,
    },

    /// Move a single logical servo (0-based).
    Servo { index: usize, angle_deg: f64 },

    /// Set the speed of all servos.
    Speed(u8),
}

/// Reasons an arm command cannot be encoded.
#[derive(Debug, Error, PartialEq)]
pub enum ArmCmdError {
    #[error("Speed {0} is outside of the valid range 1-100")]
    InvalidSpeed(u8),

    #[error("Servo {index} angle {angle_deg} is outside of [{min}, {max}] degrees")]
    AngleOutOfRange {
        index: usize,
        angle_deg: f64,
        min: f64,
        max: f64,
    },

    #[error("There is no servo with index {0}")]
    InvalidServo(usize),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ArmCmd {
    /// Check that the command is within the limits of the controller.
    pub fn validate(&self) -> Result<(), ArmCmdError> {
        match self {
            ArmCmd::All { angles_deg, speed } => {
                check_speed(*speed)?;
                for (index, angle_deg) in angles_deg.iter().enumerate() {
                    check_angle(index, *angle_deg, SERVO_RANGE_DEG)?;
                }
                Ok(())
            }
            ArmCmd::Servo { index, angle_deg } => {
                if *index >= NUM_SERVOS {
                    return Err(ArmCmdError::InvalidServo(*index));
                }
                check_angle(*index, *angle_deg, SINGLE_SERVO_RANGE_DEG)
            }
            ArmCmd::Speed(speed) => check_speed(*speed),
        }
    }

    /// Encode the command into the controller's wire format.
    ///
    /// Angles are sent as whole degrees, the controller does not accept
    /// fractional values.
    pub fn encode(&self) -> Result<String, ArmCmdError> {
        self.validate()?;

        Ok(match self {
            ArmCmd::All { angles_deg, speed } => {
                let mut physical = [0f64; NUM_SERVOS];
                for (i, angle) in angles_deg.iter().enumerate() {
                    physical[SERVO_CHANNEL_MAP[i] as usize - 1] = *angle;
                }

                let angles: Vec<String> = physical
                    .iter()
                    .map(|a| whole_degrees(*a).to_string())
                    .collect();

                format!("A,{},{}\n", angles.join(","), speed)
            }
            ArmCmd::Servo { index, angle_deg } => format!(
                "S,{},{}\n",
                SERVO_CHANNEL_MAP[*index],
                whole_degrees(*angle_deg)
            ),
            ArmCmd::Speed(speed) => format!("V,{}\n", speed),
        })
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn whole_degrees(angle_deg: f64) -> i32 {
    angle_deg.round() as i32
}

fn check_speed(speed: u8) -> Result<(), ArmCmdError> {
    if speed < SPEED_RANGE.0 || speed > SPEED_RANGE.1 {
        Err(ArmCmdError::InvalidSpeed(speed))
    } else {
        Ok(())
    }
}

fn check_angle(index: usize, angle_deg: f64, range: (f64, f64)) -> Result<(), ArmCmdError> {
    if angle_deg.is_finite() && angle_deg >= range.0 && angle_deg <= range.1 {
        Ok(())
    } else {
        Err(ArmCmdError::AngleOutOfRange {
            index,
            angle_deg,
            min: range.0,
            max: range.1,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_encode_all() {
        let cmd = ArmCmd::All {
            angles_deg: [90.0, 45.2, 120.0, 0.0, 180.0, 30.6],
            speed: 50,
        };
        assert_eq!(cmd.encode().unwrap(), "A,90,45,120,0,180,31,50\n");
    }

    #[test]
    fn test_encode_servo_and_speed() {
        let cmd = ArmCmd::Servo {
            index: 5,
            angle_deg: 250.0,
        };
        assert_eq!(cmd.encode().unwrap(), "S,6,250\n");
        assert_eq!(ArmCmd::Speed(100).encode().unwrap(), "V,100\n");
    }

    #[test]
    fn test_invalid_cmds() {
        assert_eq!(ArmCmd::Speed(0).encode(), Err(ArmCmdError::InvalidSpeed(0)));
        assert_eq!(
            ArmCmd::Speed(101).validate(),
            Err(ArmCmdError::InvalidSpeed(101))
        );

        let cmd = ArmCmd::All {
            angles_deg: [90.0, 90.0, 190.0, 90.0, 90.0, 90.0],
            speed: 10,
        };
        assert!(matches!(
            cmd.validate(),
            Err(ArmCmdError::AngleOutOfRange { index: 2, .. })
        ));

        // 200 degrees is only valid on the single servo command
        let cmd = ArmCmd::Servo {
            index: 0,
            angle_deg: 200.0,
        };
        assert!(cmd.validate().is_ok());

        let cmd = ArmCmd::Servo {
            index: 6,
            angle_deg: 10.0,
        };
        assert_eq!(cmd.validate(), Err(ArmCmdError::InvalidServo(6)));
    }
}
