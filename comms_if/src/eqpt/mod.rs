//! # Equipment Interface
//!
//! This module defines the commands sent to, and the data received from, the
//! sorting cell equipment.

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod arm;
pub mod cam;
pub mod conveyor;
