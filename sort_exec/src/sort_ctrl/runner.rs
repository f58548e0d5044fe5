//! The pick-sort control loop
//!
//! Runs on its own thread until a stop is requested or the camera fails.
//! Whatever the exit path, including a panic, the belt is stopped before the
//! loop returns.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use comms_if::eqpt::cam::Classification;
use log::{error, info, warn};
use serde::Serialize;

use super::{SortAction, SortCtrl};
use crate::cam::{Classifier, FrameSource};
use crate::ctx::ProcessContext;
use crate::motion::{
    arm::ArmDriver,
    conveyor::ConveyorDriver,
    movement::{execute_movement, ExecOutcome, MovementLibrary},
};
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Equipment the loop reads from and commands.
pub struct SortCell<'a> {
    pub camera: &'a mut dyn FrameSource,
    pub classifier: &'a mut dyn Classifier,
    pub arm: &'a ArmDriver,
    pub movements: &'a MovementLibrary,
}

/// Summary of one run of the loop.
#[derive(Debug, Clone, Default, Serialize)]
pub struct LoopSummary {
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    pub objects_processed: u64,
    pub unmatched: u64,
    pub frames_seen: u64,
    pub exit_cause: ExitCause,
}

/// Stops the belt when dropped.
struct ConveyorGuard(ConveyorDriver);

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ExitCause {
    StopRequested,
    CameraFailure(String),
    ControlError(String),
}

/// Why a pick cycle ended early.
enum CycleAbort {
    Stop,
    Camera(String),
    Control(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for ExitCause {
    fn default() -> Self {
        ExitCause::StopRequested
    }
}

impl Drop for ConveyorGuard {
    fn drop(&mut self) {
        info!("Control loop exiting, stopping the conveyor");
        if !self.0.deactivate() {
            error!("Could not send the conveyor stop command");
        }
    }
}

impl From<CycleAbort> for ExitCause {
    fn from(a: CycleAbort) -> Self {
        match a {
            CycleAbort::Stop => ExitCause::StopRequested,
            CycleAbort::Camera(e) => ExitCause::CameraFailure(e),
            CycleAbort::Control(e) => ExitCause::ControlError(e),
        }
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Run the pick-sort loop until it is stopped or the camera fails.
///
/// The stop flag is cleared on entry, so a stop requested before the loop
/// started does not end it.
pub fn run_sort_loop(ctx: &ProcessContext, ctrl: &mut SortCtrl, cell: SortCell) -> LoopSummary {
    ctx.stop.clear();

    let conveyor = ConveyorDriver::new(ctx.channel.clone());
    let _guard = ConveyorGuard(conveyor.clone());

    info!("Control loop started");
    conveyor.activate();

    let mut runner = Runner {
        ctx,
        ctrl,
        cell,
        conveyor,
        summary: LoopSummary {
            started_at: Some(Utc::now()),
            ..Default::default()
        },
    };

    let cause = runner.run();
    runner.ctrl.stop();

    let mut summary = runner.summary;
    summary.exit_cause = cause;
    summary.ended_at = Some(Utc::now());

    info!(
        "Control loop exited ({:?}): {} object(s) sorted, {} unmatched, {} frames",
        summary.exit_cause, summary.objects_processed, summary.unmatched, summary.frames_seen
    );

    summary
}

// ---------------------------------------------------------------------------
// PRIVATE
// ---------------------------------------------------------------------------

struct Runner<'a, 'c> {
    ctx: &'a ProcessContext,
    ctrl: &'a mut SortCtrl,
    cell: SortCell<'c>,
    conveyor: ConveyorDriver,
    summary: LoopSummary,
}

impl<'a, 'c> Runner<'a, 'c> {
    fn run(&mut self) -> ExitCause {
        loop {
            if self.ctx.stop.is_requested() {
                return ExitCause::StopRequested;
            }

            let classification = match self.next_classification() {
                Ok(c) => c,
                Err(e) => return e.into(),
            };

            let action = match self.ctrl.proc(&classification) {
                Ok((a, _)) => a,
                Err(e) => return ExitCause::ControlError(e.to_string()),
            };

            match action {
                SortAction::None => self.ctx.clock.sleep_s(self.ctrl.params.poll_period_s),
                SortAction::Unmatched(_) => self.summary.unmatched += 1,
                SortAction::Process { movement, .. } => {
                    if let Err(e) = self.pick_cycle(&movement) {
                        return e.into();
                    }
                }
            }
        }
    }

    /// Read and classify one frame.
    ///
    /// A label that cannot be parsed is returned as `None`.
    fn next_classification(&mut self) -> Result<Option<Classification>, CycleAbort> {
        let frame = self
            .cell
            .camera
            .read()
            .map_err(|e| {
                error!("Camera read failed: {}", e);
                CycleAbort::Camera(e.to_string())
            })?;

        self.summary.frames_seen += 1;

        let label = self.cell.classifier.classify(&frame);
        match label.parse() {
            Ok(c) => Ok(Some(c)),
            Err(e) => {
                warn!("Ignoring classifier output: {}", e);
                Ok(None)
            }
        }
    }

    fn pick_cycle(&mut self, movement_name: &str) -> Result<(), CycleAbort> {
        let params = self.ctrl.params.clone();
        let movements = self.cell.movements;

        let movement = match movements.get(movement_name) {
            Some(m) => m,
            None => {
                // Unlike a completed pick the belt keeps running and the
                // cycle skips clearing and verification, the object is
                // carried past as if no rule had matched.
                error!("Movement \"{}\" does not exist, object not sorted", movement_name);
                self.summary.unmatched += 1;
                return self
                    .ctrl
                    .abort_cycle()
                    .map_err(|e| CycleAbort::Control(e.to_string()));
            }
        };

        // ---- PROCESSING ----

        self.conveyor.deactivate();

        let outcome = execute_movement(
            movement,
            self.cell.arm,
            self.ctx.clock.as_ref(),
            &self.ctx.stop,
            params.min_step_sleep_s,
        );

        if outcome != ExecOutcome::Completed || self.ctx.stop.is_requested() {
            return Err(CycleAbort::Stop);
        }

        self.summary.objects_processed += 1;

        // ---- CLEARING ----

        self.ctrl
            .begin_clearing()
            .map_err(|e| CycleAbort::Control(e.to_string()))?;
        self.conveyor.activate();

        let start_s = self.ctx.clock.now_s();
        while self.ctx.clock.now_s() - start_s < params.clearing_period_s {
            if self.ctx.stop.is_requested() {
                return Err(CycleAbort::Stop);
            }
            self.next_classification()?;
            self.ctx.clock.sleep_s(params.poll_period_s);
        }

        // ---- VERIFYING ----

        self.ctrl
            .begin_verifying()
            .map_err(|e| CycleAbort::Control(e.to_string()))?;

        let mut empty = 0;
        for _ in 0..params.verify_samples {
            if let Some(Classification::Empty) = self.next_classification()? {
                empty += 1;
            }
            self.ctx.clock.sleep_s(params.verify_interval_s);
        }

        if empty < params.verify_samples {
            warn!(
                "Pick area may not be clear, only {}/{} samples were empty",
                empty, params.verify_samples
            );
        }

        self.ctrl
            .finish_cycle()
            .map_err(|e| CycleAbort::Control(e.to_string()))?;

        self.ctx.clock.sleep_s(params.post_cycle_pause_s);

        Ok(())
    }
}
