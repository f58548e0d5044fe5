//! Control loop tests against a replayed camera and a recording channel.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use comms_if::eqpt::cam::Frame;
use sort_lib::{
    cam::{CamError, Classifier, FrameSource, ReplayClassifier, ScriptedCamera},
    ctx::{ProcessContext, StopFlag},
    motion::{
        arm::ArmDriver,
        channel::{MemoryChannel, SharedChannel},
        clock::SimClock,
        movement::{parse_movement, MovementLibrary},
        TimingParams,
    },
    sort_ctrl::{
        run_sort_loop, ExitCause, InitData, Rule, RuleTable, SortCell, SortCtrl, SortCtrlParams,
        SortState,
    },
};
use util::{module::State, session::Session};

const PICK: &str = r#"{"velocidad": 50, "servos": [90, 120, 60, 90, 90, 30]}
{"velocidad": 50, "servos": [90, 90, 90, 90, 90, 90]}"#;

const PICK_CMDS: [&str; 2] = ["A,90,120,60,90,90,30,50\n", "A,90,90,90,90,90,90,50\n"];

// ---------------------------------------------------------------------------
// HELPERS
// ---------------------------------------------------------------------------

struct Cell {
    mem: MemoryChannel,
    ctx: ProcessContext,
    arm: ArmDriver,
    ctrl: SortCtrl,
    movements: MovementLibrary,
}

fn cell(rules: Vec<Rule>) -> Cell {
    let mem = MemoryChannel::new();
    let channel = SharedChannel::new(mem.clone());
    let ctx = ProcessContext::new(channel.clone(), Arc::new(SimClock::new()));
    let arm = ArmDriver::new(channel, [90.0; 6], TimingParams::default());

    let session = Session::in_dir(std::env::temp_dir().join("sort_loop_test"), "sort_loop").unwrap();
    let mut ctrl = SortCtrl::default();
    ctrl.init(
        InitData {
            params: SortCtrlParams::default(),
            rules: RuleTable::new(rules),
        },
        &session,
    )
    .unwrap();

    let mut movements = MovementLibrary::new();
    movements.insert(parse_movement("pick", PICK).0);

    Cell {
        mem,
        ctx,
        arm,
        ctrl,
        movements,
    }
}

fn rule(shape: &str, color: &str, movement: &str) -> Rule {
    Rule {
        shape: shape.into(),
        color: color.into(),
        movement: movement.into(),
    }
}

fn lines(cmds: &[&str]) -> Vec<String> {
    cmds.iter().map(|s| s.to_string()).collect()
}

/// Camera which requests a stop when a given frame is read.
struct StopAt {
    inner: ScriptedCamera,
    stop: StopFlag,
    frame: usize,
    read: usize,
}

impl FrameSource for StopAt {
    fn read(&mut self) -> Result<Frame, CamError> {
        self.read += 1;
        if self.read == self.frame {
            self.stop.request();
        }
        self.inner.read()
    }
}

/// Classifier which panics on a given frame.
struct PanicAt {
    frame: usize,
    seen: usize,
}

impl Classifier for PanicAt {
    fn classify(&mut self, frame: &Frame) -> String {
        self.seen += 1;
        if self.seen == self.frame {
            panic!("classifier failure");
        }
        ReplayClassifier.classify(frame)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[test]
fn test_camera_failure_while_waiting() {
    let mut c = cell(vec![rule("square", "blue", "pick")]);
    let mut camera = ScriptedCamera::from_script("5: empty;").unwrap();

    let summary = run_sort_loop(
        &c.ctx,
        &mut c.ctrl,
        SortCell {
            camera: &mut camera,
            classifier: &mut ReplayClassifier,
            arm: &c.arm,
            movements: &c.movements,
        },
    );

    assert!(matches!(summary.exit_cause, ExitCause::CameraFailure(_)));
    assert_eq!(summary.frames_seen, 5);
    assert_eq!(c.mem.lines(), lines(&["P\n", "S\n"]));
    assert_eq!(c.ctrl.state(), SortState::Stopped);
}

#[test]
fn test_full_cycle() {
    let mut c = cell(vec![rule("square", "blue", "pick")]);
    let mut camera =
        ScriptedCamera::from_script("2: empty;\n2: square_blue;\n1: empty;\n3: square_blue;\n60: empty;").unwrap();

    let summary = run_sort_loop(
        &c.ctx,
        &mut c.ctrl,
        SortCell {
            camera: &mut camera,
            classifier: &mut ReplayClassifier,
            arm: &c.arm,
            movements: &c.movements,
        },
    );

    assert_eq!(summary.objects_processed, 1);
    assert_eq!(summary.unmatched, 0);
    assert_eq!(summary.frames_seen, 68);
    assert!(matches!(summary.exit_cause, ExitCause::CameraFailure(_)));

    assert_eq!(
        c.mem.lines(),
        lines(&["P\n", "S\n", PICK_CMDS[0], PICK_CMDS[1], "P\n", "S\n"])
    );
    assert_eq!(c.arm.current(), [90.0; 6]);
}

#[test]
fn test_camera_failure_after_pick() {
    let mut c = cell(vec![rule("square", "blue", "pick")]);
    let mut camera = ScriptedCamera::from_script("3: square_blue;\n4: empty;").unwrap();

    let summary = run_sort_loop(
        &c.ctx,
        &mut c.ctrl,
        SortCell {
            camera: &mut camera,
            classifier: &mut ReplayClassifier,
            arm: &c.arm,
            movements: &c.movements,
        },
    );

    assert_eq!(summary.objects_processed, 1);
    assert!(matches!(summary.exit_cause, ExitCause::CameraFailure(_)));

    let cmds = c.mem.lines();
    assert_eq!(cmds.last().map(|s| s.as_str()), Some("S\n"));
    assert_eq!(
        cmds,
        lines(&["P\n", "S\n", PICK_CMDS[0], PICK_CMDS[1], "P\n", "S\n"])
    );
}

#[test]
fn test_unmatched_keeps_belt_running() {
    let mut c = cell(vec![
        rule("square", "blue", "pick"),
        rule("triangle", "green", "ghost"),
    ]);
    let mut camera = ScriptedCamera::from_script(
        "6: circle_red;\n1: empty;\n3: triangle_green;\n2: empty;",
    )
    .unwrap();

    let summary = run_sort_loop(
        &c.ctx,
        &mut c.ctrl,
        SortCell {
            camera: &mut camera,
            classifier: &mut ReplayClassifier,
            arm: &c.arm,
            movements: &c.movements,
        },
    );

    // Two runs of three red circles, then one object with a missing movement
    assert_eq!(summary.unmatched, 3);
    assert_eq!(summary.objects_processed, 0);
    assert_eq!(c.mem.lines(), lines(&["P\n", "S\n"]));
}

#[test]
fn test_stop_before_movement() {
    let mut c = cell(vec![rule("square", "blue", "pick")]);
    let mut camera = StopAt {
        inner: ScriptedCamera::from_script("3: square_blue;\n10: empty;").unwrap(),
        stop: c.ctx.stop.clone(),
        frame: 3,
        read: 0,
    };

    let summary = run_sort_loop(
        &c.ctx,
        &mut c.ctrl,
        SortCell {
            camera: &mut camera,
            classifier: &mut ReplayClassifier,
            arm: &c.arm,
            movements: &c.movements,
        },
    );

    // The stop is seen at the first movement checkpoint, no step is sent
    assert_eq!(summary.exit_cause, ExitCause::StopRequested);
    assert_eq!(summary.objects_processed, 0);
    assert_eq!(c.mem.lines(), lines(&["P\n", "S\n", "S\n"]));
}

#[test]
fn test_stop_while_waiting() {
    let mut c = cell(vec![]);
    let mut camera = StopAt {
        inner: ScriptedCamera::from_script("10: empty;").unwrap(),
        stop: c.ctx.stop.clone(),
        frame: 4,
        read: 0,
    };

    let summary = run_sort_loop(
        &c.ctx,
        &mut c.ctrl,
        SortCell {
            camera: &mut camera,
            classifier: &mut ReplayClassifier,
            arm: &c.arm,
            movements: &c.movements,
        },
    );

    assert_eq!(summary.exit_cause, ExitCause::StopRequested);
    assert_eq!(summary.frames_seen, 4);
    assert_eq!(c.mem.lines(), lines(&["P\n", "S\n"]));
}

#[test]
fn test_stop_flag_cleared_on_entry() {
    let mut c = cell(vec![]);
    c.ctx.stop.request();
    let mut camera = ScriptedCamera::from_script("3: empty;").unwrap();

    let summary = run_sort_loop(
        &c.ctx,
        &mut c.ctrl,
        SortCell {
            camera: &mut camera,
            classifier: &mut ReplayClassifier,
            arm: &c.arm,
            movements: &c.movements,
        },
    );

    assert!(matches!(summary.exit_cause, ExitCause::CameraFailure(_)));
    assert_eq!(summary.frames_seen, 3);
}

#[test]
fn test_conveyor_stopped_on_panic() {
    let mut c = cell(vec![]);
    let mut camera = ScriptedCamera::from_script("10: empty;").unwrap();
    let mut classifier = PanicAt { frame: 2, seen: 0 };

    let result = catch_unwind(AssertUnwindSafe(|| {
        run_sort_loop(
            &c.ctx,
            &mut c.ctrl,
            SortCell {
                camera: &mut camera,
                classifier: &mut classifier,
                arm: &c.arm,
                movements: &c.movements,
            },
        )
    }));

    assert!(result.is_err());
    assert_eq!(c.mem.lines(), lines(&["P\n", "S\n"]));
}

#[test]
fn test_malformed_labels_are_not_objects() {
    let mut c = cell(vec![rule("square", "blue", "pick")]);
    let mut camera =
        ScriptedCamera::from_script("4: square_blue;\n20: empty;").unwrap();

    // Two detections, an unparseable label, then one more detection. Without
    // the reset the third detection would commit the object.
    struct Garble {
        seen: usize,
    }
    impl Classifier for Garble {
        fn classify(&mut self, frame: &Frame) -> String {
            self.seen += 1;
            if self.seen == 3 {
                String::from("???")
            } else {
                ReplayClassifier.classify(frame)
            }
        }
    }

    let summary = run_sort_loop(
        &c.ctx,
        &mut c.ctrl,
        SortCell {
            camera: &mut camera,
            classifier: &mut Garble { seen: 0 },
            arm: &c.arm,
            movements: &c.movements,
        },
    );

    assert_eq!(summary.objects_processed, 0);
    assert_eq!(summary.frames_seen, 24);
    assert_eq!(c.mem.lines(), lines(&["P\n", "S\n"]));
}
