//! Implementations for the SortCtrl state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use comms_if::eqpt::cam::{Classification, ObjectLabel};
use log::{debug, info, warn};
use serde::Serialize;

// Internal
use super::{Debouncer, RuleTable, SortCtrlError, SortCtrlParams};
use util::{module::State, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Sorting control module state
pub struct SortCtrl {
    pub(crate) params: SortCtrlParams,
    rules: RuleTable,

    state: SortState,
    debouncer: Debouncer,
    report: StatusReport,
    initialised: bool,
}

/// Data needed to initialise SortCtrl.
#[derive(Debug, Clone, Default)]
pub struct InitData {
    pub params: SortCtrlParams,
    pub rules: RuleTable,
}

/// Input data to SortCtrl, the classification of one frame.
///
/// `None` means the classifier output could not be parsed.
pub type InputData = Option<Classification>;

/// Status report for SortCtrl processing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatusReport {
    pub state: SortState,

    /// Empty frames seen since the loop started.
    pub empty_frames: u64,

    /// Length of the current run of identical labels.
    pub consistency_count: u32,

    /// Pick cycles completed.
    pub cycles_completed: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SortState {
    WaitingForObject,
    DetectingConsistency,
    ProcessingObject,
    ClearingArea,
    VerifyingEmpty,
    Stopped,
}

/// What the control loop must do after a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SortAction {
    /// Nothing, keep polling.
    None,

    /// Stop the belt and run the named movement.
    Process {
        label: ObjectLabel,
        movement: String,
    },

    /// A consistent object no rule sorts. The belt keeps running.
    Unmatched(ObjectLabel),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for SortState {
    fn default() -> Self {
        SortState::WaitingForObject
    }
}

impl Default for SortCtrl {
    fn default() -> Self {
        let params = SortCtrlParams::default();
        Self {
            debouncer: Debouncer::new(params.consistency_threshold),
            params,
            rules: RuleTable::default(),
            state: SortState::default(),
            report: StatusReport::default(),
            initialised: false,
        }
    }
}

impl State for SortCtrl {
    type InitData = InitData;
    type InitError = SortCtrlError;

    type InputData = InputData;
    type OutputData = SortAction;
    type StatusReport = StatusReport;
    type ProcError = SortCtrlError;

    /// Initialise the SortCtrl module.
    fn init(&mut self, init_data: Self::InitData, session: &Session)
        -> Result<(), Self::InitError>
    {
        init_data.params.validate()?;

        if init_data.rules.is_empty() {
            warn!("No sorting rules loaded, every object will be left on the belt");
        }

        debug!("SortCtrl initialised in session {:?}", session.session_root);

        self.debouncer = Debouncer::new(init_data.params.consistency_threshold);
        self.params = init_data.params;
        self.rules = init_data.rules;
        self.state = SortState::WaitingForObject;
        self.report = StatusReport::default();
        self.initialised = true;

        Ok(())
    }

    /// Process the classification of one frame.
    ///
    /// Frames arriving during a pick cycle are ignored.
    fn proc(&mut self, input_data: &Self::InputData)
        -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError>
    {
        if !self.initialised {
            return Err(SortCtrlError::NotInitialised);
        }

        let action = match self.state {
            SortState::WaitingForObject | SortState::DetectingConsistency => {
                self.detect(input_data.as_ref())
            }
            _ => SortAction::None,
        };

        self.report.state = self.state;
        self.report.consistency_count = self.debouncer.count();

        Ok((action, self.report.clone()))
    }
}

impl SortCtrl {
    pub fn state(&self) -> SortState {
        self.state
    }

    pub fn params(&self) -> &SortCtrlParams {
        &self.params
    }

    pub fn report(&self) -> &StatusReport {
        &self.report
    }

    /// The belt has been restarted after the movement.
    pub fn begin_clearing(&mut self) -> Result<(), SortCtrlError> {
        self.transition("begin clearing", SortState::ProcessingObject, SortState::ClearingArea)
    }

    /// Clearing is over, start sampling the pick area.
    pub fn begin_verifying(&mut self) -> Result<(), SortCtrlError> {
        self.transition("begin verifying", SortState::ClearingArea, SortState::VerifyingEmpty)
    }

    /// Verification is over, wait for the next object.
    pub fn finish_cycle(&mut self) -> Result<(), SortCtrlError> {
        self.transition("finish cycle", SortState::VerifyingEmpty, SortState::WaitingForObject)?;
        self.report.cycles_completed += 1;
        Ok(())
    }

    /// Abandon a cycle before any motion, for example when the movement it
    /// needs does not exist.
    pub fn abort_cycle(&mut self) -> Result<(), SortCtrlError> {
        self.transition("abort cycle", SortState::ProcessingObject, SortState::WaitingForObject)
    }

    /// Enter the terminal state. Valid from any state.
    pub fn stop(&mut self) {
        info!("SortCtrl stopped in state {:?}", self.state);
        self.state = SortState::Stopped;
        self.report.state = self.state;
        self.debouncer.reset();
    }

    /// Detection step of a single frame.
    fn detect(&mut self, classification: Option<&Classification>) -> SortAction {
        let label = match classification {
            Some(Classification::Object(l)) => l,
            Some(Classification::Empty) => {
                self.report.empty_frames += 1;
                if self.report.empty_frames % self.params.empty_log_interval == 0 {
                    info!("{} empty frames so far", self.report.empty_frames);
                }
                self.debouncer.reset();
                self.state = SortState::WaitingForObject;
                return SortAction::None;
            }
            None => {
                self.debouncer.reset();
                self.state = SortState::WaitingForObject;
                return SortAction::None;
            }
        };

        if !self.debouncer.observe(label) {
            debug!("Seen {} ({} consecutive)", label, self.debouncer.count());
            self.state = SortState::DetectingConsistency;
            return SortAction::None;
        }

        info!("Object confirmed: {}", label);
        self.debouncer.reset();

        match self.rules.lookup(label) {
            Some(movement) => {
                info!("Sorting {} with movement \"{}\"", label, movement);
                self.state = SortState::ProcessingObject;
                SortAction::Process {
                    label: label.clone(),
                    movement: movement.to_string(),
                }
            }
            None => {
                warn!("No rule for {}, leaving it on the belt", label);
                self.state = SortState::WaitingForObject;
                SortAction::Unmatched(label.clone())
            }
        }
    }

    fn transition(
        &mut self,
        action: &'static str,
        from: SortState,
        to: SortState,
    ) -> Result<(), SortCtrlError> {
        if self.state != from {
            return Err(SortCtrlError::InvalidTransition {
                action,
                state: self.state,
            });
        }

        debug!("SortCtrl {:?} -> {:?}", from, to);
        self.state = to;
        self.report.state = to;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::sort_ctrl::Rule;

    fn session() -> Session {
        let dir = std::env::temp_dir().join("sort_ctrl_state_test");
        Session::in_dir(&dir, "sort_ctrl_test").unwrap()
    }

    fn ctrl() -> SortCtrl {
        let mut c = SortCtrl::default();
        c.init(
            InitData {
                params: SortCtrlParams::default(),
                rules: RuleTable::new(vec![Rule {
                    shape: "square".into(),
                    color: "blue".into(),
                    movement: "bin_right".into(),
                }]),
            },
            &session(),
        )
        .unwrap();
        c
    }

    fn obj(shape: &str, color: &str) -> InputData {
        Some(Classification::Object(ObjectLabel::new(shape, color)))
    }

    #[test]
    fn test_not_initialised() {
        let mut c = SortCtrl::default();
        assert!(matches!(
            c.proc(&Some(Classification::Empty)),
            Err(SortCtrlError::NotInitialised)
        ));
    }

    #[test]
    fn test_consistency_before_processing() {
        let mut c = ctrl();
        let a = obj("circle", "red");
        let b = obj("square", "blue");

        let actions: Vec<SortAction> = [&a, &a, &b, &b, &b]
            .iter()
            .map(|i| c.proc(i).unwrap().0)
            .collect();

        assert!(actions[..4].iter().all(|a| *a == SortAction::None));
        assert_eq!(
            actions[4],
            SortAction::Process {
                label: ObjectLabel::new("square", "blue"),
                movement: "bin_right".into()
            }
        );
        assert_eq!(c.state(), SortState::ProcessingObject);

        // Frames during the cycle are ignored
        assert_eq!(c.proc(&b).unwrap().0, SortAction::None);
        assert_eq!(c.state(), SortState::ProcessingObject);
    }

    #[test]
    fn test_empty_and_bad_labels_reset() {
        let mut c = ctrl();
        let b = obj("square", "blue");

        c.proc(&b).unwrap();
        c.proc(&b).unwrap();
        assert_eq!(c.state(), SortState::DetectingConsistency);

        let (_, report) = c.proc(&Some(Classification::Empty)).unwrap();
        assert_eq!(report.state, SortState::WaitingForObject);
        assert_eq!(report.empty_frames, 1);
        assert_eq!(report.consistency_count, 0);

        c.proc(&b).unwrap();
        c.proc(&b).unwrap();
        c.proc(&None).unwrap();
        assert_eq!(c.state(), SortState::WaitingForObject);
        assert_eq!(c.report().empty_frames, 1);
    }

    #[test]
    fn test_unmatched() {
        let mut c = ctrl();
        let a = obj("circle", "red");

        c.proc(&a).unwrap();
        c.proc(&a).unwrap();
        let (action, _) = c.proc(&a).unwrap();

        assert_eq!(action, SortAction::Unmatched(ObjectLabel::new("circle", "red")));
        assert_eq!(c.state(), SortState::WaitingForObject);

        // The run starts again from one
        assert_eq!(c.proc(&a).unwrap().1.consistency_count, 1);
    }

    #[test]
    fn test_cycle_transitions() {
        let mut c = ctrl();
        let b = obj("square", "blue");

        assert!(c.begin_clearing().is_err());

        for _ in 0..3 {
            c.proc(&b).unwrap();
        }

        c.begin_clearing().unwrap();
        assert!(c.finish_cycle().is_err());
        c.begin_verifying().unwrap();
        c.finish_cycle().unwrap();

        assert_eq!(c.state(), SortState::WaitingForObject);
        assert_eq!(c.report().cycles_completed, 1);

        c.stop();
        assert_eq!(c.state(), SortState::Stopped);
        assert_eq!(c.proc(&b).unwrap().0, SortAction::None);
    }
}
