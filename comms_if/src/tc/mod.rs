//! # Telecommand module
//!
//! Telecommands are instructions issued by the operator rather than the
//! control loop.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod jog;
