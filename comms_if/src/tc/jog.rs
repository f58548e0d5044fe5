//! # Manual jog telecommands
//!
//! One line typed into the operator console parses into one [`JogCmd`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use crate::eqpt::conveyor::ConveyorCmd;
use structopt::{clap::AppSettings, StructOpt};
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A manual command from the operator console.
#[derive(Debug, Clone, PartialEq, StructOpt)]
#[structopt(
    name = "jog",
    global_setting = AppSettings::AllowNegativeNumbers,
    global_setting = AppSettings::DisableVersion
)]
pub enum JogCmd {
    /// Move all six servos.
    #[structopt(name = "all")]
    All {
        /// Servo angles in degrees, base first and gripper last.
        angles_deg: Vec<f64>,

        /// Speed percentage, 1-100.
        #[structopt(short, long, default_value = "50")]
        speed: u8,
    },

    /// Move a single servo, numbered 1 to 6.
    #[structopt(name = "servo")]
    Servo {
        id: usize,

        /// Angle in degrees, 0-270.
        angle_deg: f64,

        #[structopt(short, long, default_value = "50")]
        speed: u8,
    },

    /// Set the speed of all servos.
    #[structopt(name = "speed")]
    Speed { speed: u8 },

    /// Drive the conveyor: on, off, left or right.
    #[structopt(name = "conveyor")]
    Conveyor { action: ConveyorCmd },

    /// Solve inverse kinematics for a pose and move the arm there.
    #[structopt(name = "ik")]
    Ik {
        x_mm: f64,
        y_mm: f64,
        z_mm: f64,
        roll_deg: f64,
        pitch_deg: f64,
        yaw_deg: f64,

        #[structopt(short, long, default_value = "50")]
        speed: u8,

        /// Only report the solution, do not move.
        #[structopt(long)]
        dry_run: bool,
    },

    /// Print the effector pose for a set of five joint angles.
    #[structopt(name = "fk")]
    Fk { angles_deg: Vec<f64> },

    /// Run a stored movement by name.
    #[structopt(name = "run")]
    Run { name: String },

    /// List the stored movements.
    #[structopt(name = "list")]
    List,

    /// Start the sorting loop if it isn't already running.
    #[structopt(name = "start")]
    Start,

    /// Request the sorting loop to stop.
    #[structopt(name = "stop")]
    Stop,

    /// Stop the loop and exit.
    #[structopt(name = "quit")]
    Quit,
}

#[derive(Debug, Error)]
pub enum JogParseError {
    #[error("Empty command")]
    Empty,

    #[error("{0}")]
    Invalid(structopt::clap::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl JogCmd {
    /// Parse a console line.
    pub fn parse_line(line: &str) -> Result<Self, JogParseError> {
        let words: Vec<&str> = line.split_whitespace().collect();

        if words.is_empty() {
            return Err(JogParseError::Empty);
        }

        JogCmd::from_iter_safe(std::iter::once("jog").chain(words))
            .map_err(JogParseError::Invalid)
    }
}
