//! # Camera Equipment Communications Module
//!
//! Frames are acquired from the pick area camera and handed to a classifier,
//! which labels each frame either as empty or with the shape and colour of
//! the object in view.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{serde::ts_milliseconds, DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Labels a classifier may return for a frame with nothing in it.
pub const EMPTY_LABELS: [&str; 2] = ["empty", "vacio_vacio"];

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// An individual frame from the camera
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Frame {
    /// UTC timestamp at which the frame was acquired
    #[serde(with = "ts_milliseconds")]
    pub timestamp: DateTime<Utc>,

    /// Raw pixel data
    pub data: Vec<u8>,
}

/// Shape and colour of a detected object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectLabel {
    pub shape: String,
    pub color: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Result of classifying a single frame.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    /// Nothing in the pick area.
    Empty,

    /// An object was detected.
    Object(ObjectLabel),
}

#[derive(Debug, Error, PartialEq)]
pub enum LabelParseError {
    #[error("Classifier returned a blank label")]
    Blank,

    #[error("Label \"{0}\" is not of the form \"<shape> <color>\" or \"<shape>_<color>\"")]
    Malformed(String),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Frame {
    /// Create a new frame stamped with the current time.
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            timestamp: Utc::now(),
            data,
        }
    }
}

impl ObjectLabel {
    pub fn new<S: Into<String>, C: Into<String>>(shape: S, color: C) -> Self {
        Self {
            shape: shape.into(),
            color: color.into(),
        }
    }
}

impl fmt::Display for ObjectLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.shape, self.color)
    }
}

impl Classification {
    pub fn is_empty(&self) -> bool {
        matches!(self, Classification::Empty)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Classification::Empty => write!(f, "empty"),
            Classification::Object(l) => write!(f, "{}", l),
        }
    }
}

impl FromStr for Classification {
    type Err = LabelParseError;

    /// Parse a classifier label.
    ///
    /// The underscore form splits on the first underscore, so multi word
    /// shapes must use the space form.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s.trim();

        if label.is_empty() {
            return Err(LabelParseError::Blank);
        }

        if EMPTY_LABELS.iter().any(|e| e.eq_ignore_ascii_case(label)) {
            return Ok(Classification::Empty);
        }

        let (shape, color) = if label.contains('_') {
            label.split_once('_')
        } else {
            label.split_once(char::is_whitespace)
        }
        .ok_or_else(|| LabelParseError::Malformed(label.to_string()))?;

        let (shape, color) = (shape.trim(), color.trim());

        if shape.is_empty() || color.is_empty() {
            return Err(LabelParseError::Malformed(label.to_string()));
        }

        Ok(Classification::Object(ObjectLabel::new(shape, color)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_parse_empty() {
        assert_eq!("empty".parse(), Ok(Classification::Empty));
        assert_eq!("vacio_vacio".parse(), Ok(Classification::Empty));
        assert_eq!(" EMPTY\n".parse(), Ok(Classification::Empty));
    }

    #[test]
    fn test_parse_object() {
        assert_eq!(
            "circle red".parse(),
            Ok(Classification::Object(ObjectLabel::new("circle", "red")))
        );
        assert_eq!(
            "square_blue".parse(),
            Ok(Classification::Object(ObjectLabel::new("square", "blue")))
        );
        assert_eq!(
            "0 circle_1 red".parse(),
            Ok(Classification::Object(ObjectLabel::new("0 circle", "1 red")))
        );
    }

    #[test]
    fn test_parse_bad() {
        assert_eq!("  ".parse::<Classification>(), Err(LabelParseError::Blank));
        assert!(matches!(
            "circle".parse::<Classification>(),
            Err(LabelParseError::Malformed(_))
        ));
        assert!(matches!(
            "circle_".parse::<Classification>(),
            Err(LabelParseError::Malformed(_))
        ));
    }

    #[test]
    fn test_display() {
        let c = Classification::Object(ObjectLabel::new("triangle", "green"));
        assert_eq!(c.to_string(), "triangle green");
        assert_eq!(c.to_string().parse(), Ok(c));
    }
}
