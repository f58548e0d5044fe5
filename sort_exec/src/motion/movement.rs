//! Stored movements
//!
//! A movement is an ordered list of steps, each a speed and a full set of
//! servo angles. Movements are stored one per file as JSON lines:
//!
//! ```text
//! {"velocidad": 50, "servos": [90, 120, 60, 90, 90, 30]}
//! {"velocidad": 30, "servos": [90, 100, 80, 90, 90, 30]}
//! ```
//!
//! Parsing never fails as a whole. Each line gives either a step or an error,
//! valid steps are kept and errors are collected in a [`ParseReport`].

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::arm::{NUM_SERVOS, SERVO_RANGE_DEG, SPEED_RANGE};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

use super::{arm::ArmDriver, clock::Clock, ServoAngles};
use crate::ctx::StopFlag;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementStep {
    /// Speed percentage, 1 to 100.
    pub speed: u8,

    /// Servo angles.
    ///
    /// Units: degrees
    pub servos: ServoAngles,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Movement {
    pub name: String,
    pub steps: Vec<MovementStep>,
}

/// Errors found while parsing a movement.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ParseReport {
    pub errors: Vec<MovementParseError>,
}

/// All stored movements, keyed by name.
#[derive(Debug, Default, Clone)]
pub struct MovementLibrary {
    movements: HashMap<String, Movement>,
}

/// Raw line format.
#[derive(Deserialize)]
struct RawStep {
    #[serde(alias = "velocity")]
    velocidad: f64,
    servos: Vec<f64>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Reasons a movement line is rejected. Lines are numbered from 1.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MovementParseError {
    #[error("Line {line}: invalid step: {msg}")]
    InvalidJson { line: usize, msg: String },

    #[error("Line {line}: expected 6 servo angles, found {found}")]
    ServoCount { line: usize, found: usize },

    #[error("Line {line}: speed {value} is outside of 1-100")]
    Velocity { line: usize, value: f64 },

    #[error("Line {line}: servo {index} angle {value} is not a valid angle")]
    Angle { line: usize, index: usize, value: f64 },
}

#[derive(Debug, Error)]
pub enum MovementLoadError {
    #[error("Could not read movement directory {0}: {1}")]
    DirError(String, std::io::Error),

    #[error("Could not read movement file {0}: {1}")]
    FileError(String, std::io::Error),
}

/// How a movement execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecOutcome {
    Completed,

    /// A stop was requested, the number of steps sent before stopping.
    Stopped(usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ParseReport {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

impl MovementLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every `*.txt` file of a directory, named after the file stem.
    ///
    /// Lines that fail to parse are logged and skipped.
    pub fn load_dir<P: AsRef<Path>>(dir: P) -> Result<Self, MovementLoadError> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir)
            .map_err(|e| MovementLoadError::DirError(dir.display().to_string(), e))?;

        let mut lib = Self::new();

        for entry in entries {
            let path = entry
                .map_err(|e| MovementLoadError::DirError(dir.display().to_string(), e))?
                .path();

            if path.extension().and_then(|e| e.to_str()) != Some("txt") {
                continue;
            }

            let name = match path.file_stem().and_then(|s| s.to_str()) {
                Some(n) => n.to_string(),
                None => continue,
            };

            let text = fs::read_to_string(&path)
                .map_err(|e| MovementLoadError::FileError(path.display().to_string(), e))?;

            let (movement, report) = parse_movement(&name, &text);
            if !report.is_clean() {
                warn!(
                    "Movement \"{}\" loaded with {} invalid line(s)",
                    name,
                    report.errors.len()
                );
            }

            lib.insert(movement);
        }

        info!("Loaded {} movement(s) from {}", lib.len(), dir.display());

        Ok(lib)
    }

    pub fn insert(&mut self, movement: Movement) {
        self.movements.insert(movement.name.clone(), movement);
    }

    pub fn get(&self, name: &str) -> Option<&Movement> {
        self.movements.get(name)
    }

    pub fn len(&self) -> usize {
        self.movements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.movements.is_empty()
    }

    /// Movement names in alphabetical order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.movements.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Parse a movement from its JSON lines text.
pub fn parse_movement(name: &str, text: &str) -> (Movement, ParseReport) {
    let mut steps = Vec::new();
    let mut report = ParseReport::default();

    for (i, line) in text.lines().enumerate() {
        let line_num = i + 1;

        if line.trim().is_empty() {
            continue;
        }

        match parse_step(line_num, line) {
            Ok(s) => steps.push(s),
            Err(e) => {
                warn!("Movement \"{}\": {}", name, e);
                report.errors.push(e);
            }
        }
    }

    (
        Movement {
            name: name.to_string(),
            steps,
        },
        report,
    )
}

/// Run a movement step by step on the arm.
///
/// After each step the executor sleeps for the estimated move duration, but
/// never less than `min_step_sleep_s`. The stop flag is checked before each
/// step, a step already sent always runs to completion.
pub fn execute_movement(
    movement: &Movement,
    arm: &ArmDriver,
    clock: &dyn Clock,
    stop: &StopFlag,
    min_step_sleep_s: f64,
) -> ExecOutcome {
    info!(
        "Executing movement \"{}\" ({} steps)",
        movement.name,
        movement.steps.len()
    );

    for (i, step) in movement.steps.iter().enumerate() {
        if stop.is_requested() {
            info!("Movement \"{}\" stopped after {} step(s)", movement.name, i);
            return ExecOutcome::Stopped(i);
        }

        match arm.move_all(&step.servos, step.speed) {
            Ok(duration_s) => {
                debug!("Step {}: waiting {:.2} s", i + 1, duration_s);
                clock.sleep_s(duration_s.max(min_step_sleep_s));
            }
            Err(e) => warn!("Movement \"{}\" step {} skipped: {}", movement.name, i + 1, e),
        }
    }

    ExecOutcome::Completed
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn parse_step(line: usize, text: &str) -> Result<MovementStep, MovementParseError> {
    let raw: RawStep = serde_json::from_str(text).map_err(|e| MovementParseError::InvalidJson {
        line,
        msg: e.to_string(),
    })?;

    if raw.servos.len() != NUM_SERVOS {
        return Err(MovementParseError::ServoCount {
            line,
            found: raw.servos.len(),
        });
    }

    let speed = raw.velocidad.round();
    if !(speed >= SPEED_RANGE.0 as f64 && speed <= SPEED_RANGE.1 as f64) {
        return Err(MovementParseError::Velocity {
            line,
            value: raw.velocidad,
        });
    }

    let mut servos = [0.0; NUM_SERVOS];
    for (index, (dst, value)) in servos.iter_mut().zip(raw.servos).enumerate() {
        if !(value.is_finite() && value >= SERVO_RANGE_DEG.0 && value <= SERVO_RANGE_DEG.1) {
            return Err(MovementParseError::Angle { line, index, value });
        }
        *dst = value;
    }

    Ok(MovementStep {
        speed: speed as u8,
        servos,
    })
}
