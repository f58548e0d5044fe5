//! Sorting rules
//!
//! A rule maps a shape and color pair to the name of a stored movement. The
//! table is stored as a JSON array:
//!
//! ```text
//! [
//!     {"shape": "circle", "color": "red", "movement": "bin_left"},
//!     {"shape": "square", "color": "blue", "movement": "bin_right"}
//! ]
//! ```

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::cam::ObjectLabel;
use log::info;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub shape: String,
    pub color: String,
    pub movement: String,
}

/// Ordered rules, the first matching rule wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleTable {
    rules: Vec<Rule>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum RuleTableError {
    #[error("Could not read the rule table: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Could not parse the rule table: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Rule {0} has an empty field")]
    EmptyField(usize),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl RuleTable {
    pub fn new(rules: Vec<Rule>) -> Self {
        Self { rules }
    }

    pub fn from_json(json: &str) -> Result<Self, RuleTableError> {
        let table: Self = serde_json::from_str(json)?;

        for (i, r) in table.rules.iter().enumerate() {
            if r.shape.trim().is_empty() || r.color.trim().is_empty() || r.movement.trim().is_empty() {
                return Err(RuleTableError::EmptyField(i));
            }
        }

        Ok(table)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, RuleTableError> {
        let table = Self::from_json(&std::fs::read_to_string(path.as_ref())?)?;
        info!(
            "Loaded {} sorting rule(s) from {}",
            table.len(),
            path.as_ref().display()
        );
        Ok(table)
    }

    /// Name of the movement sorting the given object, if any rule matches.
    ///
    /// Shape and color must match exactly.
    pub fn lookup(&self, label: &ObjectLabel) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.shape == label.shape && r.color == label.color)
            .map(|r| r.movement.as_str())
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
