//! # Communications interface crate.
//!
//! Provides the command encodings and data types shared between the sorting
//! executable and the equipment it drives.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Manual telecommands issued from the operator console
pub mod tc;

/// Command and data definitions for equipment (arm, conveyor, camera)
pub mod eqpt;
