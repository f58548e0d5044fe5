//! Main sorting cell executable entry point.
//!
//! # Architecture
//!
//! The executable runs two threads:
//!
//!     - The console (main thread), reading jog commands from the operator
//!     - The pick-sort control loop, started and stopped from the console
//!
//! Both write to the arm and conveyor through one shared channel. The loop
//! is handed everything it uses in a `ProcessContext` when it is started.
//!
//! # Camera
//!
//! Frames come from a label script replayed by `ScriptedCamera`, one label per
//! frame, classified by `ReplayClassifier`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{error, info, warn};
use rustyline::{error::ReadlineError, DefaultEditor};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use structopt::StructOpt;

// Internal
use comms_if::tc::jog::JogCmd;
use sort_lib::{
    cam::{ReplayClassifier, ScriptedCamera},
    ctx::ProcessContext,
    jog::{JogConsole, JogOutcome},
    motion::{
        arm::ArmDriver,
        channel::{NullChannel, SharedChannel},
        clock::{Clock, SimClock, SystemClock},
        movement::MovementLibrary,
    },
    params::{ArmParams, SortExecParams},
    sort_ctrl::{self, LoopSummary, RuleTable, SortCell, SortCtrl, SortCtrlParams},
};
use util::{
    host,
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const PROMPT: &str = "sort $ ";

/// How often a stop is re-requested while waiting for the loop to exit.
const STOP_POLL_PERIOD: Duration = Duration::from_millis(50);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "sort_exec", about = "Conveyor sorting cell executable")]
struct Opts {
    /// Label script replayed as the camera
    #[structopt(parse(from_os_str))]
    script: PathBuf,

    /// Run on a simulated clock, movements and pauses take no real time
    #[structopt(long)]
    fast: bool,

    /// Do not open the serial port, every command is dropped
    #[structopt(long)]
    no_serial: bool,

    /// Start the control loop immediately
    #[structopt(long)]
    autostart: bool,
}

/// Everything needed to start the control loop, cloned for each run.
struct LoopSetup {
    ctx: ProcessContext,
    arm: ArmDriver,
    movements: Arc<MovementLibrary>,
    rules: RuleTable,
    params: SortCtrlParams,
    camera: ScriptedCamera,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let opts = Opts::from_args();

    // ---- EARLY INITIALISATION ----

    let session = Session::new("sort_exec", "sessions").wrap_err("Failed to create the session")?;

    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("Sorting Cell Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let exec_params: SortExecParams =
        util::params::load("sort_exec.toml").wrap_err("Could not load exec params")?;
    let arm_params: ArmParams =
        util::params::load("arm.toml").wrap_err("Could not load arm params")?;
    let sort_ctrl_params: SortCtrlParams =
        util::params::load("sort_ctrl.toml").wrap_err("Could not load sort control params")?;

    info!("Exec parameters loaded");

    let sw_root = host::get_sw_root().wrap_err("Software root is not set")?;

    let rules = RuleTable::load(sw_root.join(&exec_params.rules_file))
        .wrap_err("Could not load the rule table")?;
    let movements = MovementLibrary::load_dir(sw_root.join(&exec_params.movements_dir))
        .wrap_err("Could not load the movement library")?;

    for r in rules.rules() {
        if movements.get(&r.movement).is_none() {
            warn!(
                "Rule {} {} refers to missing movement \"{}\"",
                r.shape, r.color, r.movement
            );
        }
    }

    // ---- INITIALISE EQUIPMENT ----

    info!("Loading camera script from {:?}", opts.script);
    let camera = ScriptedCamera::load(&opts.script).wrap_err("Failed to load the camera script")?;
    info!("Camera script holds {} frames", camera.frames_remaining());

    let channel = open_channel(&exec_params, opts.no_serial);

    let clock: Arc<dyn Clock> = if opts.fast {
        info!("Running on a simulated clock");
        Arc::new(SimClock::new())
    } else {
        Arc::new(SystemClock::new())
    };

    let ctx = ProcessContext::new(channel.clone(), clock);
    let arm = ArmDriver::new(channel, arm_params.start_deg, arm_params.timing);
    let movements = Arc::new(movements);

    let console = JogConsole::new(
        ctx.clone(),
        arm.clone(),
        arm_params.chain(),
        arm_params.ccd_solver(),
        arm_params.local_solver(),
        movements.clone(),
        sort_ctrl_params.min_step_sleep_s,
    );

    let setup = LoopSetup {
        ctx: ctx.clone(),
        arm,
        movements,
        rules,
        params: sort_ctrl_params,
        camera,
    };

    // ---- CONSOLE ----

    let mut rl = DefaultEditor::new().wrap_err("Failed to start the console")?;
    let history_path = sw_root.join(&exec_params.history_file);
    if rl.load_history(&history_path).is_err() {
        info!("No console history found");
    }

    let mut loop_handle: Option<JoinHandle<LoopSummary>> = None;
    let mut num_runs = 0;

    if opts.autostart {
        loop_handle = Some(start_loop(&setup, &session)?);
    }

    loop {
        // Reap a loop which ended on its own, e.g. at the end of the script
        if loop_handle.as_ref().map_or(false, |h| h.is_finished()) {
            if let Some(h) = loop_handle.take() {
                num_runs += 1;
                finish_loop(h, &ctx, &session, num_runs);
            }
        }

        let line = match rl.readline(PROMPT) {
            Ok(l) => l,
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => break,
            Err(e) => {
                error!("Console error: {}", e);
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        if let Err(e) = rl.add_history_entry(line.as_str()) {
            warn!("Could not add to the console history: {}", e);
        }

        let cmd = match JogCmd::parse_line(&line) {
            Ok(c) => c,
            Err(e) => {
                println!("{}", e);
                continue;
            }
        };

        match console.handle(cmd) {
            Ok(JogOutcome::StartLoop) => {
                if loop_handle.is_some() {
                    println!("The control loop is already running");
                } else {
                    loop_handle = Some(start_loop(&setup, &session)?);
                }
            }
            Ok(JogOutcome::StopRequested) => match loop_handle.take() {
                Some(h) => {
                    num_runs += 1;
                    finish_loop(h, &ctx, &session, num_runs);
                }
                None => println!("The control loop is not running"),
            },
            Ok(JogOutcome::Quit) => break,
            Ok(JogOutcome::Moved(t)) => println!("Moving, about {:.2} s", t),
            Ok(JogOutcome::Sent(true)) => println!("Sent"),
            Ok(JogOutcome::Sent(false)) => println!("Not sent, the channel is not connected"),
            Ok(JogOutcome::Solved { solution, moved }) => println!(
                "Joints {:?}, error {:.3} mm / {:.3} deg, converged: {}, moved: {}",
                solution.joints,
                solution.pos_err_mm,
                solution.orient_err_deg,
                solution.converged,
                moved
            ),
            Ok(JogOutcome::Pose(p)) => println!("{}", p),
            Ok(JogOutcome::Ran { name, outcome }) => println!("{}: {:?}", name, outcome),
            Ok(JogOutcome::Movements(names)) => println!("{}", names.join("\n")),
            Err(e) => println!("Error: {}", e),
        }
    }

    // ---- SHUTDOWN ----

    if let Some(h) = loop_handle.take() {
        num_runs += 1;
        finish_loop(h, &ctx, &session, num_runs);
    }

    if let Err(e) = rl.save_history(&history_path) {
        warn!("Could not save the console history: {}", e);
    }

    info!("Exiting");
    session.exit();

    Ok(())
}

/// Open the actuator channel, falling back to a disconnected channel.
fn open_channel(params: &SortExecParams, no_serial: bool) -> SharedChannel {
    if no_serial {
        info!("Serial port disabled, actuator commands will be dropped");
        return SharedChannel::new(NullChannel);
    }

    #[cfg(feature = "serial")]
    {
        use sort_lib::motion::channel::SerialChannel;

        match SerialChannel::open(&params.serial_port, params.baud_rate) {
            Ok(c) => {
                info!("Connected to {} at {} baud", c.port_name(), params.baud_rate);
                return SharedChannel::new(c);
            }
            Err(e) => warn!("{}, continuing without hardware", e),
        }
    }

    #[cfg(not(feature = "serial"))]
    warn!(
        "Built without serial support, {} is not opened",
        params.serial_port
    );

    SharedChannel::new(NullChannel)
}

/// Start the control loop on its own thread.
fn start_loop(setup: &LoopSetup, session: &Session) -> Result<JoinHandle<LoopSummary>, Report> {
    let mut ctrl = SortCtrl::default();
    ctrl.init(
        sort_ctrl::InitData {
            params: setup.params.clone(),
            rules: setup.rules.clone(),
        },
        session,
    )
    .wrap_err("Failed to initialise sort control")?;

    let ctx = setup.ctx.clone();
    let arm = setup.arm.clone();
    let movements = setup.movements.clone();
    let mut camera = setup.camera.clone();

    // Set before spawning so the console never sees a live loop as idle
    let active = setup.ctx.loop_active.hold();

    let handle = thread::Builder::new()
        .name("sort_loop".into())
        .spawn(move || {
            let _active = active;
            let mut classifier = ReplayClassifier;
            sort_ctrl::run_sort_loop(
                &ctx,
                &mut ctrl,
                SortCell {
                    camera: &mut camera,
                    classifier: &mut classifier,
                    arm: &arm,
                    movements: &movements,
                },
            )
        })
        .wrap_err("Failed to spawn the control loop thread")?;

    info!("Control loop thread started");

    Ok(handle)
}

/// Stop the loop, wait for it and save its summary.
fn finish_loop(handle: JoinHandle<LoopSummary>, ctx: &ProcessContext, session: &Session, run: usize) {
    // The loop clears the flag on entry, keep requesting until it is seen
    while !handle.is_finished() {
        ctx.stop.request();
        thread::sleep(STOP_POLL_PERIOD);
    }

    match handle.join() {
        Ok(summary) => {
            println!(
                "Control loop exited: {} sorted, {} unmatched, {} frames ({:?})",
                summary.objects_processed,
                summary.unmatched,
                summary.frames_seen,
                summary.exit_cause
            );
            session.save(format!("loop_summary_{}.json", run), summary);
        }
        Err(_) => error!("The control loop thread panicked"),
    }
}
