//! # Sorting cell library.
//!
//! This library holds everything the `sort_exec` executable runs: the arm's
//! kinematics and inverse kinematics, trajectory generation, motion timing
//! and command issuing, and the pick-sort control loop.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Camera frame sources and classifiers, including the scripted replay camera
pub mod cam;

/// Process context shared between the control loop and the operator console
pub mod ctx;

/// Inverse kinematics solvers - CCD from home and local refinement from a seed
pub mod ik;

/// Operator jog console command handling
pub mod jog;

/// Forward kinematics - DH chain and effector pose
pub mod kin;

/// Motion timing, actuator channel, arm and conveyor drivers, movements
pub mod motion;

/// Executable level parameters
pub mod params;

/// Sorting control - debounce, rule table and the pick-sort loop
pub mod sort_ctrl;

/// Trajectory generation and joint path planning
pub mod traj;
