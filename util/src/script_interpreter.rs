//! # Label script interpreter
//!
//! Label scripts drive replay runs of the sorting loop without a camera. Each
//! statement gives a number of frames and the classifier label those frames
//! carry:
//!
//! ```text
//! 30: empty;
//! 3: circle red;
//! 20: empty;
//! ```
//!
//! Blank lines and anything after a `#` are ignored.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use regex::RegexBuilder;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal
use comms_if::eqpt::cam::{Classification, LabelParseError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A label held for a number of consecutive frames.
#[derive(Debug, Clone, PartialEq)]
struct Segment {
    /// Number of frames remaining in this segment
    frames: u32,

    /// The label these frames carry
    label: Classification,
}

/// A script interpreter.
///
/// After loading use `.next_label` to pull one label per frame.
#[derive(Debug, Clone)]
pub struct ScriptInterpreter {
    script_path: Option<PathBuf>,
    segments: VecDeque<Segment>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ScriptError {
    #[error("Could not find the script at {0:?}")]
    ScriptNotFound(PathBuf),

    #[error("Could not load the script: {0}")]
    ScriptLoadError(std::io::Error),

    #[error("The script is empty (or is so bad it can't be read)")]
    ScriptEmpty,

    #[error("Script contains an invalid frame count: {0}")]
    InvalidCount(String),

    #[error("Script contains an invalid label at statement {0}: {1}")]
    InvalidLabel(usize, LabelParseError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ScriptInterpreter {
    /// Create a new interpreter from the given script path.
    pub fn new<P: AsRef<Path>>(script_path: P) -> Result<Self, ScriptError> {
        let path = PathBuf::from(script_path.as_ref());

        if !path.exists() {
            return Err(ScriptError::ScriptNotFound(path));
        }

        let script = fs::read_to_string(&path).map_err(ScriptError::ScriptLoadError)?;

        let mut si = Self::from_script(&script)?;
        si.script_path = Some(path);

        Ok(si)
    }

    /// Create a new interpreter from the text of a script.
    pub fn from_script(script: &str) -> Result<Self, ScriptError> {
        let mut segments = VecDeque::new();

        // Strip comments before matching so a `;` inside one is ignored
        let stripped: String = script
            .lines()
            .map(|l| l.split('#').next().unwrap_or(""))
            .collect::<Vec<_>>()
            .join("\n");

        let re = RegexBuilder::new(r"^\s*(\S+)\s*:\s*([^;]*);")
            .multi_line(true)
            .build()
            .map_err(|e| ScriptError::InvalidCount(e.to_string()))?;

        for (idx, cap) in re.captures_iter(&stripped).enumerate() {
            let count_str = cap.get(1).map(|m| m.as_str()).unwrap_or("");
            let frames: u32 = count_str
                .parse()
                .map_err(|_| ScriptError::InvalidCount(count_str.to_string()))?;

            let label: Classification = cap
                .get(2)
                .map(|m| m.as_str())
                .unwrap_or("")
                .parse()
                .map_err(|e| ScriptError::InvalidLabel(idx + 1, e))?;

            if frames > 0 {
                segments.push_back(Segment { frames, label });
            }
        }

        if segments.is_empty() {
            return Err(ScriptError::ScriptEmpty);
        }

        Ok(ScriptInterpreter {
            script_path: None,
            segments,
        })
    }

    /// Get the label of the next frame, or `None` once the script is over.
    pub fn next_label(&mut self) -> Option<Classification> {
        let front = self.segments.front_mut()?;
        let label = front.label.clone();

        front.frames -= 1;
        if front.frames == 0 {
            self.segments.pop_front();
        }

        Some(label)
    }

    /// Get the number of frames left in the script
    pub fn get_num_frames(&self) -> usize {
        self.segments.iter().map(|s| s.frames as usize).sum()
    }

    /// Path the script was loaded from, if any
    pub fn script_path(&self) -> Option<&Path> {
        self.script_path.as_deref()
    }
}
