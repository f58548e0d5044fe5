//! # Conveyor Equipment Communications Module
//!
//! The conveyor shares the actuator channel with the arm and accepts single
//! letter commands.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Conveyor belt travel direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConveyorDir {
    Left,
    Right,
}

/// A command for the conveyor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConveyorCmd {
    /// Start the belt.
    Activate,

    /// Stop the belt.
    Deactivate,

    /// Set the belt direction.
    Direction(ConveyorDir),
}

#[derive(Debug, Error, PartialEq)]
#[error("Unrecognised conveyor action \"{0}\", expected one of on, off, left, right")]
pub struct ConveyorParseError(String);

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ConveyorCmd {
    /// Encode the command into the controller's wire format.
    pub fn encode(&self) -> &'static str {
        match self {
            ConveyorCmd::Activate => "P\n",
            ConveyorCmd::Deactivate => "S\n",
            ConveyorCmd::Direction(ConveyorDir::Right) => "D\n",
            ConveyorCmd::Direction(ConveyorDir::Left) => "I\n",
        }
    }
}

impl FromStr for ConveyorCmd {
    type Err = ConveyorParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "on" | "start" => Ok(ConveyorCmd::Activate),
            "off" | "stop" => Ok(ConveyorCmd::Deactivate),
            "left" => Ok(ConveyorCmd::Direction(ConveyorDir::Left)),
            "right" => Ok(ConveyorCmd::Direction(ConveyorDir::Right)),
            other => Err(ConveyorParseError(other.to_string())),
        }
    }
}
