//! Camera frame sources and classifiers
//!
//! The control loop only needs two things from the vision side: a blocking
//! read of the next frame, and a label for that frame. Both sit behind traits
//! so a recorded label script can stand in for the camera and the model.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::cam::{Classification, Frame};
use log::debug;
use std::path::Path;
use thiserror::Error;
use util::script_interpreter::{ScriptError, ScriptInterpreter};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A source of camera frames.
pub trait FrameSource {
    /// Block until the next frame is available.
    fn read(&mut self) -> Result<Frame, CamError>;
}

/// Labels a frame.
///
/// The output is the raw label string, which the control loop parses.
pub trait Classifier {
    fn classify(&mut self, frame: &Frame) -> String;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A camera replaying a label script, one label per frame.
///
/// Each frame's payload is its label text.
#[derive(Debug, Clone)]
pub struct ScriptedCamera {
    script: ScriptInterpreter,
    frames_read: usize,
}

/// Classifier for frames produced by a [`ScriptedCamera`].
#[derive(Debug, Default, Clone, Copy)]
pub struct ReplayClassifier;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum CamError {
    #[error("Could not load the camera script: {0}")]
    ScriptError(#[from] ScriptError),

    #[error("The camera script ended after {0} frames")]
    EndOfScript(usize),

    #[error("Could not read a frame from the camera: {0}")]
    ReadFailed(String),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptedCamera {
    pub fn new(script: ScriptInterpreter) -> Self {
        Self {
            script,
            frames_read: 0,
        }
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, CamError> {
        Ok(Self::new(ScriptInterpreter::new(path)?))
    }

    pub fn from_script(script: &str) -> Result<Self, CamError> {
        Ok(Self::new(ScriptInterpreter::from_script(script)?))
    }

    /// Number of frames left before the camera fails.
    pub fn frames_remaining(&self) -> usize {
        self.script.get_num_frames()
    }
}

impl FrameSource for ScriptedCamera {
    fn read(&mut self) -> Result<Frame, CamError> {
        let label = self
            .script
            .next_label()
            .ok_or(CamError::EndOfScript(self.frames_read))?;

        self.frames_read += 1;

        // Underscore form so multi word shapes survive the round trip
        let text = match label {
            Classification::Empty => String::from("empty"),
            Classification::Object(l) => format!("{}_{}", l.shape, l.color),
        };

        Ok(Frame::new(text.into_bytes()))
    }
}

impl Classifier for ReplayClassifier {
    fn classify(&mut self, frame: &Frame) -> String {
        let label = String::from_utf8_lossy(&frame.data).into_owned();
        debug!("Replayed label: {}", label);
        label
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::eqpt::cam::ObjectLabel;

    #[test]
    fn test_scripted_camera() {
        let mut cam = ScriptedCamera::from_script("1: empty;\n2: 0 circle_1 red;").unwrap();
        let mut cls = ReplayClassifier;

        assert_eq!(cam.frames_remaining(), 3);

        let f = cam.read().unwrap();
        assert_eq!(cls.classify(&f), "empty");

        for _ in 0..2 {
            let f = cam.read().unwrap();
            let c: Classification = cls.classify(&f).parse().unwrap();
            assert_eq!(c, Classification::Object(ObjectLabel::new("0 circle", "1 red")));
        }

        assert!(matches!(cam.read(), Err(CamError::EndOfScript(3))));
    }
}
