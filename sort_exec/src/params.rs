//! # Sorting Executable Parameters
//!
//! This module provides parameters for the sorting executable and the arm
//! it drives.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::{
    ik::{CcdParams, CcdSolver, LocalParams, LocalSolver},
    kin::{DhLink, KinChain, NUM_JOINTS},
    motion::{ServoAngles, TimingParams},
};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortExecParams {

    /// Serial port of the arm and conveyor controller
    pub serial_port: String,

    /// Baud rate of the serial port
    pub baud_rate: u32,

    /// Directory of stored movements, relative to the software root
    pub movements_dir: String,

    /// Sorting rule table, relative to the software root
    pub rules_file: String,

    /// Console history file, relative to the software root
    pub history_file: String,
}

/// Arm geometry, solver tuning and timing calibration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArmParams {

    /// DH parameters of each link, base first
    pub links: [DhLink; NUM_JOINTS],

    /// Servo angles the arm is assumed to start at, gripper last
    ///
    /// Units: degrees
    pub start_deg: ServoAngles,

    pub ccd: CcdParams,

    pub local: LocalParams,

    pub timing: TimingParams,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ArmParams {
    pub fn chain(&self) -> KinChain {
        KinChain::new(self.links)
    }

    pub fn ccd_solver(&self) -> CcdSolver {
        CcdSolver::new(self.ccd.clone())
    }

    pub fn local_solver(&self) -> LocalSolver {
        LocalSolver::new(self.local.clone())
    }
}

impl Default for ArmParams {
    fn default() -> Self {
        Self {
            links: *KinChain::default().links(),
            start_deg: [90.0; 6],
            ccd: CcdParams::default(),
            local: LocalParams::default(),
            timing: TimingParams::default(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_arm_params_file() {
        let text = std::fs::read_to_string(
            std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("../params/arm.toml"),
        )
        .unwrap();

        let p: ArmParams = util::params::from_str(&text).unwrap();

        assert_eq!(p.chain(), KinChain::default());
        assert_eq!(p.ccd, CcdParams::default());
        assert_eq!(p.local, LocalParams::default());
        assert_eq!(p.timing, TimingParams::default());
        assert_eq!(p.start_deg, [90.0; 6]);
    }
}
