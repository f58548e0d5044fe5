//! # Jog console
//!
//! Manual control of the cell from the operator console. Commands write
//! through the same shared channel as the control loop, so a jog command sent
//! while the loop is running is interleaved between loop commands, never
//! inside one.
//!
//! Stored movements can be run by hand, but only while the control loop is
//! not running.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::{
    eqpt::arm::{ArmCmdError, NUM_SERVOS},
    tc::jog::JogCmd,
};
use log::{info, warn};
use std::sync::Arc;
use thiserror::Error;

use crate::{
    ctx::ProcessContext,
    ik::{solve_pose, CcdSolver, IkSolution, LocalSolver},
    kin::{JointConfig, KinChain, Pose, NUM_JOINTS},
    motion::{
        arm::ArmDriver,
        conveyor::ConveyorDriver,
        joints_to_servos,
        movement::{execute_movement, ExecOutcome, MovementLibrary},
        ServoAngles,
    },
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Executes jog commands.
pub struct JogConsole {
    ctx: ProcessContext,
    arm: ArmDriver,
    conveyor: ConveyorDriver,
    chain: KinChain,
    ccd: CcdSolver,
    local: LocalSolver,
    movements: Arc<MovementLibrary>,

    /// Units: seconds
    min_step_sleep_s: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Result of a jog command.
#[derive(Debug, Clone, PartialEq)]
pub enum JogOutcome {
    /// An arm move was issued, with its estimated duration in seconds.
    Moved(f64),

    /// A command was sent, `false` if the channel dropped it.
    Sent(bool),

    /// An IK solve, and whether the arm was moved to the solution.
    Solved { solution: IkSolution, moved: bool },

    /// Forward kinematics result.
    Pose(Pose),

    /// A stored movement was run.
    Ran { name: String, outcome: ExecOutcome },

    /// Names of the stored movements.
    Movements(Vec<String>),

    /// The operator wants the control loop started.
    StartLoop,

    /// A stop was requested from the control loop.
    StopRequested,

    /// The operator wants to exit.
    Quit,
}

#[derive(Debug, Error, PartialEq)]
pub enum JogError {
    #[error("Expected {expected} angles, got {found}")]
    WrongAngleCount { expected: usize, found: usize },

    #[error("Servos are numbered 1 to 6, got {0}")]
    InvalidServoId(usize),

    #[error("Invalid arm command: {0}")]
    ArmCmd(#[from] ArmCmdError),

    #[error("No stored movement named \"{0}\"")]
    UnknownMovement(String),

    #[error("Movements cannot be run by hand while the control loop is running")]
    LoopRunning,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl JogConsole {
    pub fn new(
        ctx: ProcessContext,
        arm: ArmDriver,
        chain: KinChain,
        ccd: CcdSolver,
        local: LocalSolver,
        movements: Arc<MovementLibrary>,
        min_step_sleep_s: f64,
    ) -> Self {
        Self {
            conveyor: ConveyorDriver::new(ctx.channel.clone()),
            ctx,
            arm,
            chain,
            ccd,
            local,
            movements,
            min_step_sleep_s,
        }
    }

    /// Execute one command.
    pub fn handle(&self, cmd: JogCmd) -> Result<JogOutcome, JogError> {
        match cmd {
            JogCmd::All { angles_deg, speed } => {
                let servos: ServoAngles = to_array(&angles_deg)?;
                Ok(JogOutcome::Moved(self.arm.move_all(&servos, speed)?))
            }
            JogCmd::Servo { id, angle_deg, speed } => {
                if id == 0 || id > NUM_SERVOS {
                    return Err(JogError::InvalidServoId(id));
                }
                Ok(JogOutcome::Moved(self.arm.move_servo(id - 1, angle_deg, speed)?))
            }
            JogCmd::Speed { speed } => Ok(JogOutcome::Sent(self.arm.set_speed(speed)?)),
            JogCmd::Conveyor { action } => Ok(JogOutcome::Sent(self.conveyor.send(action))),
            JogCmd::Ik {
                x_mm,
                y_mm,
                z_mm,
                roll_deg,
                pitch_deg,
                yaw_deg,
                speed,
                dry_run,
            } => {
                let target = Pose::new(x_mm, y_mm, z_mm, roll_deg, pitch_deg, yaw_deg);
                self.ik(&target, speed, dry_run)
            }
            JogCmd::Fk { angles_deg } => {
                let joints: JointConfig = to_array(&angles_deg)?;
                let pose = self.chain.compute_pose(&joints);
                info!("FK {:?} -> {}", joints, pose);
                Ok(JogOutcome::Pose(pose))
            }
            JogCmd::Run { name } => self.run_movement(name),
            JogCmd::List => Ok(JogOutcome::Movements(
                self.movements.names().into_iter().map(String::from).collect(),
            )),
            JogCmd::Start => Ok(JogOutcome::StartLoop),
            JogCmd::Stop => {
                self.ctx.stop.request();
                Ok(JogOutcome::StopRequested)
            }
            JogCmd::Quit => {
                self.ctx.stop.request();
                Ok(JogOutcome::Quit)
            }
        }
    }

    /// Run a stored movement to completion on this thread.
    ///
    /// A stop left over from the last loop run is cleared first, a stop
    /// requested during the run ends it between steps.
    fn run_movement(&self, name: String) -> Result<JogOutcome, JogError> {
        if self.ctx.loop_active.is_set() {
            return Err(JogError::LoopRunning);
        }

        let movement = self
            .movements
            .get(&name)
            .ok_or_else(|| JogError::UnknownMovement(name.clone()))?;

        self.ctx.stop.clear();

        let outcome = execute_movement(
            movement,
            &self.arm,
            self.ctx.clock.as_ref(),
            &self.ctx.stop,
            self.min_step_sleep_s,
        );

        info!("Manual run of \"{}\" ended: {:?}", name, outcome);

        Ok(JogOutcome::Ran { name, outcome })
    }

    /// Solve for a pose and, if the solve converged, move there keeping the
    /// current gripper angle.
    fn ik(&self, target: &Pose, speed: u8, dry_run: bool) -> Result<JogOutcome, JogError> {
        let solution = solve_pose(&self.chain, target, &self.ccd, &self.local);

        info!(
            "IK for {}: {:?} ({:.3} mm, {:.3} deg, {} iterations)",
            target, solution.joints, solution.pos_err_mm, solution.orient_err_deg, solution.iterations
        );

        if !solution.converged {
            warn!("IK did not converge, the arm was not moved");
            return Ok(JogOutcome::Solved {
                solution,
                moved: false,
            });
        }

        if dry_run {
            return Ok(JogOutcome::Solved {
                solution,
                moved: false,
            });
        }

        let gripper_deg = self.arm.current()[NUM_JOINTS];
        self.arm
            .move_all(&joints_to_servos(&solution.joints, gripper_deg), speed)?;

        Ok(JogOutcome::Solved {
            solution,
            moved: true,
        })
    }
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

fn to_array<const N: usize>(values: &[f64]) -> Result<[f64; N], JogError> {
    let mut a = [0.0; N];
    if values.len() != N {
        return Err(JogError::WrongAngleCount {
            expected: N,
            found: values.len(),
        });
    }
    a.copy_from_slice(values);
    Ok(a)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ctx::StopFlag;
    use crate::ik::{CcdParams, LocalParams};
    use crate::motion::{
        channel::{MemoryChannel, SharedChannel},
        clock::SimClock,
        movement::parse_movement,
        TimingParams,
    };

    const WAVE: &str = r#"{"velocidad": 50, "servos": [90, 120, 60, 90, 90, 30]}
{"velocidad": 30, "servos": [90, 90, 90, 90, 90, 30]}
"#;

    fn console() -> (JogConsole, MemoryChannel, StopFlag) {
        let mem = MemoryChannel::new();
        let channel = SharedChannel::new(mem.clone());
        let ctx = ProcessContext::new(channel.clone(), Arc::new(SimClock::new()));
        let stop = ctx.stop.clone();
        let arm = ArmDriver::new(channel, [90.0; 6], TimingParams::default());

        let mut movements = MovementLibrary::new();
        movements.insert(parse_movement("wave", WAVE).0);
        movements.insert(parse_movement("bin_left", WAVE).0);

        let jog = JogConsole::new(
            ctx,
            arm,
            KinChain::default(),
            CcdSolver::new(CcdParams::default()),
            LocalSolver::new(LocalParams::default()),
            Arc::new(movements),
            0.1,
        );

        (jog, mem, stop)
    }

    fn run(jog: &JogConsole, line: &str) -> Result<JogOutcome, JogError> {
        jog.handle(JogCmd::parse_line(line).unwrap())
    }

    #[test]
    fn test_jog_moves() {
        let (jog, mem, _) = console();

        assert!(matches!(run(&jog, "all 90 120 60 90 90 30 -s 50"), Ok(JogOutcome::Moved(_))));
        assert!(matches!(run(&jog, "servo 6 200"), Ok(JogOutcome::Moved(_))));
        assert_eq!(run(&jog, "speed 20"), Ok(JogOutcome::Sent(true)));
        assert_eq!(run(&jog, "conveyor on"), Ok(JogOutcome::Sent(true)));
        assert_eq!(run(&jog, "conveyor left"), Ok(JogOutcome::Sent(true)));

        assert_eq!(
            mem.lines().concat(),
            "A,90,120,60,90,90,30,50\nV,50\nS,6,200\nV,20\nP\nI\n"
        );
    }

    #[test]
    fn test_jog_errors() {
        let (jog, mem, _) = console();

        assert_eq!(
            run(&jog, "all 90 90 90"),
            Err(JogError::WrongAngleCount {
                expected: 6,
                found: 3
            })
        );
        assert_eq!(run(&jog, "servo 0 90"), Err(JogError::InvalidServoId(0)));
        assert_eq!(run(&jog, "servo 7 90"), Err(JogError::InvalidServoId(7)));
        assert!(matches!(run(&jog, "speed 0"), Err(JogError::ArmCmd(_))));

        assert!(mem.lines().is_empty());
    }

    #[test]
    fn test_jog_fk() {
        let (jog, _, _) = console();

        match run(&jog, "fk 90 90 90 90 90") {
            Ok(JogOutcome::Pose(p)) => {
                assert!(p.position_error(&Pose::new(0.0, 0.0, 483.87, 0.0, 0.0, -90.0)) < 1e-6);
            }
            other => panic!("Unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_jog_ik_keeps_gripper() {
        let (jog, mem, _) = console();
        run(&jog, "servo 6 40").unwrap();

        let target = KinChain::default().compute_pose(&[100.0, 90.0, 90.0, 90.0, 90.0]);
        let line = format!(
            "ik {} {} {} {} {} {} -s 30",
            target.position_mm[0],
            target.position_mm[1],
            target.position_mm[2],
            target.rpy_deg[0],
            target.rpy_deg[1],
            target.rpy_deg[2]
        );

        match run(&jog, &line) {
            Ok(JogOutcome::Solved { solution, moved }) => {
                assert!(solution.converged);
                assert!(moved);
            }
            other => panic!("Unexpected outcome {:?}", other),
        }

        let last = mem.lines().pop().unwrap();
        assert!(last.starts_with("A,"));
        assert!(last.ends_with(",40,30\n"));
    }

    #[test]
    fn test_jog_ik_dry_run() {
        let (jog, mem, _) = console();

        let target = KinChain::default().compute_pose(&[90.0; 5]);
        let out = run(&jog, &format!(
            "ik {} {} {} {} {} {} --dry-run",
            target.position_mm[0],
            target.position_mm[1],
            target.position_mm[2],
            target.rpy_deg[0],
            target.rpy_deg[1],
            target.rpy_deg[2]
        ));

        assert!(matches!(out, Ok(JogOutcome::Solved { moved: false, .. })));
        assert!(mem.lines().is_empty());
    }

    #[test]
    fn test_jog_stop_and_quit() {
        let (jog, _, stop) = console();

        assert_eq!(run(&jog, "start"), Ok(JogOutcome::StartLoop));
        assert!(!stop.is_requested());

        assert_eq!(run(&jog, "stop"), Ok(JogOutcome::StopRequested));
        assert!(stop.is_requested());

        stop.clear();
        assert_eq!(run(&jog, "quit"), Ok(JogOutcome::Quit));
        assert!(stop.is_requested());
    }

    #[test]
    fn test_jog_list() {
        let (jog, _, _) = console();

        assert_eq!(
            run(&jog, "list"),
            Ok(JogOutcome::Movements(vec!["bin_left".into(), "wave".into()]))
        );
    }

    #[test]
    fn test_jog_run_movement() {
        let (jog, mem, stop) = console();

        // Left over from a previous loop run
        stop.request();

        assert_eq!(
            run(&jog, "run wave"),
            Ok(JogOutcome::Ran {
                name: "wave".into(),
                outcome: ExecOutcome::Completed
            })
        );

        assert_eq!(
            mem.lines().concat(),
            "A,90,120,60,90,90,30,50\nA,90,90,90,90,90,30,30\n"
        );
        assert!(jog.ctx.clock.now_s() >= 0.2);
        assert_eq!(jog.arm.current(), [90.0, 90.0, 90.0, 90.0, 90.0, 30.0]);
    }

    #[test]
    fn test_jog_run_refused() {
        let (jog, mem, _) = console();

        assert_eq!(
            run(&jog, "run nothing"),
            Err(JogError::UnknownMovement("nothing".into()))
        );

        let active = jog.ctx.loop_active.hold();
        assert_eq!(run(&jog, "run wave"), Err(JogError::LoopRunning));
        drop(active);

        assert!(mem.lines().is_empty());
        assert!(matches!(run(&jog, "run wave"), Ok(JogOutcome::Ran { .. })));
    }
}
